pub mod batch;
pub mod clock;
pub mod poll;
pub mod relay;
pub mod sampler;
pub mod stop;

pub use batch::{SummaryReport, SummarySettings, run_summary};
pub use clock::{Clock, SystemClock, TokioClock};
pub use poll::{PollController, PollSettings, TickOutcome};
pub use relay::{RelayReport, RelaySettings, run_relay};
pub use sampler::{SamplerSettings, run_sampler};
pub use stop::{StopHandle, StopSignal, stop_pair};
