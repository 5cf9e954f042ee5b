pub mod logger;

pub use logger::{LogFormat, TraceId, init_logger};
