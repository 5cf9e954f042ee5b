pub mod reading;
pub mod record;

pub use reading::ChannelReading;
pub use record::{Direction, MinuteKey, Record, RenderZone, Sample};
