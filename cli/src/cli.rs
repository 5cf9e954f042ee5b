use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "velocity", version, about = "Per-minute delta and velocity recorder")]
pub struct Cli {
    #[clap(subcommand)]
    pub mode: Mode,
}

#[derive(Debug, Subcommand)]
pub enum Mode {
    /// Poll a spot price once per minute and append rows to a CSV
    Price(PriceArgs),

    /// Stream the EEG headset, serve the latest channels over HTTP and
    /// record the per-minute channel mean
    Relay(RelayArgs),

    /// Record for a fixed number of minutes, then write a summary CSV
    Summarize(SummarizeArgs),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Price(_) => "price",
            Mode::Relay(_) => "relay",
            Mode::Summarize(_) => "summarize",
        }
    }
}

#[derive(Debug, Args)]
pub struct PriceArgs {
    /// Output CSV (appended to if it exists)
    #[clap(long)]
    pub output: Option<PathBuf>,

    /// Price API base URL
    #[clap(long)]
    pub url: Option<String>,

    #[clap(long)]
    pub coin: Option<String>,

    #[clap(long)]
    pub currency: Option<String>,

    /// Wait after a failed fetch
    #[clap(long)]
    pub backoff_secs: Option<u64>,

    /// In-memory history length
    #[clap(long)]
    pub retention: Option<usize>,

    /// Also serve the HTTP readout on this port
    #[clap(long)]
    pub http_port: Option<u16>,
}

#[derive(Debug, Args)]
pub struct RelayArgs {
    #[clap(long)]
    pub bind: Option<String>,

    #[clap(long)]
    pub port: Option<u16>,

    /// Append per-minute channel means to this CSV
    #[clap(long)]
    pub output: Option<PathBuf>,

    /// Device poll interval in milliseconds
    #[clap(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub sample_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SummarizeArgs {
    /// Run length in minutes
    #[clap(value_parser = clap::value_parser!(u32).range(1..))]
    pub minutes: u32,

    /// Output CSV (overwritten)
    pub output: Option<PathBuf>,
}
