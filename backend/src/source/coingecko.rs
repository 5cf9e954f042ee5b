use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{FetchError, SampleSource};

/// `{"bitcoin": {"usd": 64123.5}}`
pub type PriceEnvelope = HashMap<String, HashMap<String, f64>>;

/// Spot price from the CoinGecko `simple/price` endpoint.
#[derive(Clone)]
pub struct CoinGeckoSource {
    http: Client,
    url: String,
    coin: String,
    currency: String,
}

impl CoinGeckoSource {
    pub fn new(url: String, coin: String, currency: String) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            coin,
            currency,
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/simple/price?ids={}&vs_currencies={}",
            self.url, self.coin, self.currency
        )
    }
}

/// Pulls `coin.currency` out of the envelope. A zero or negative price is
/// treated as a failed fetch.
pub fn extract_price(envelope: &PriceEnvelope, coin: &str, currency: &str) -> Result<f64, FetchError> {
    let price = envelope
        .get(coin)
        .and_then(|quotes| quotes.get(currency))
        .copied()
        .ok_or_else(|| FetchError::InvalidResponse(format!("missing {coin}.{currency}")))?;

    if price <= 0.0 {
        return Err(FetchError::InvalidResponse(format!(
            "non-positive price {price} for {coin}.{currency}"
        )));
    }

    Ok(price)
}

#[async_trait]
impl SampleSource for CoinGeckoSource {
    fn name(&self) -> &str {
        "coingecko"
    }

    #[instrument(skip(self), fields(coin = %self.coin, currency = %self.currency), level = "debug")]
    async fn fetch(&self) -> Result<f64, FetchError> {
        let resp = self
            .http
            .get(self.endpoint())
            .send()
            .await?
            .error_for_status()?;

        let envelope: PriceEnvelope = resp.json().await?;
        let price = extract_price(&envelope, &self.coin, &self.currency)?;

        debug!(price, "coingecko price fetched");
        Ok(price)
    }
}
