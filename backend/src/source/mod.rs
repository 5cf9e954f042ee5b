pub mod channel_mean;
pub mod coingecko;

use async_trait::async_trait;
use thiserror::Error;

pub use channel_mean::ChannelMeanSource;
pub use coingecko::CoinGeckoSource;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no data: {0}")]
    NoData(&'static str),
}

/// Upstream that yields one scalar per cadence tick.
///
/// Non-finite values are passed through; the delta engine rejects them.
#[async_trait]
pub trait SampleSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<f64, FetchError>;
}
