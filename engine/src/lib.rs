pub mod aggregate;
pub mod cadence;
pub mod delta;
pub mod error;
pub mod history;

pub use aggregate::{Bucket, EmptyWindow, MinuteBucketer, WindowAccumulator, WindowStats};
pub use cadence::{Cadence, CadencePhase, until_next_minute};
pub use delta::{DeltaEngine, next_record};
pub use error::EngineError;
pub use history::History;
