pub mod config;
pub mod device;
pub mod error;
pub mod preview;
pub mod readout;
pub mod recorder;
pub mod runner;
pub mod sink;
pub mod source;
