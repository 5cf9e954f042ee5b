use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use corelib::RenderZone;
use engine::EmptyWindow;
use thiserror::Error;

use crate::sink::FirstRow;

pub const DEFAULT_PRICE_OUTPUT: &str = "btc_velocity.csv";
pub const DEFAULT_SUMMARY_OUTPUT: &str = "muse_data.csv";
pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Recorder settings resolved from the environment.
///
/// Command-line flags override individual fields per subcommand.
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    /// CSV written by the live price poller.
    pub price_output: PathBuf,

    /// CSV written by the batch summarizer.
    pub summary_output: PathBuf,

    // =========================
    // Cadence
    // =========================
    /// Wait after a failed fetch before the next attempt.
    pub backoff: Duration,

    /// Fetches slower than this are logged on the `performance` target.
    pub slow_fetch: Duration,

    /// Device poll interval of the live relay.
    pub sample_every: Duration,

    // =========================
    // Series
    // =========================
    /// In-memory history length. The CSV is never trimmed.
    pub retention: usize,

    /// Clock face used when rendering minute keys.
    pub zone: RenderZone,

    /// How the first row of a session renders its delta/velocity fields.
    pub first_row: FirstRow,

    /// What an aggregation window without finite readings produces.
    pub empty_window: EmptyWindow,

    // =========================
    // Upstreams
    // =========================
    pub coingecko_url: String,
    pub coin_id: String,
    pub vs_currency: String,

    /// Device command sent after the session is prepared (`p61` = high-res).
    pub board_config: Option<String>,

    // =========================
    // Readout
    // =========================
    pub bind: String,
    pub port: u16,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            price_output: PathBuf::from(DEFAULT_PRICE_OUTPUT),
            summary_output: PathBuf::from(DEFAULT_SUMMARY_OUTPUT),
            backoff: Duration::from_secs(60),
            slow_fetch: Duration::from_secs(5),
            sample_every: Duration::from_millis(100),
            retention: engine::history::DEFAULT_RETENTION,
            zone: RenderZone::Local,
            first_row: FirstRow::Blank,
            empty_window: EmptyWindow::Zero,
            coingecko_url: DEFAULT_COINGECKO_URL.to_string(),
            coin_id: "bitcoin".to_string(),
            vs_currency: "usd".to_string(),
            board_config: Some("p61".to_string()),
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl RecorderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let mut cfg = Self::default();

        if let Some(v) = get("VELOCITY_OUTPUT") {
            cfg.price_output = PathBuf::from(v);
        }
        if let Some(v) = get("VELOCITY_SUMMARY_OUTPUT") {
            cfg.summary_output = PathBuf::from(v);
        }
        if let Some(v) = get("VELOCITY_BACKOFF_SECS") {
            cfg.backoff = Duration::from_secs(parse("VELOCITY_BACKOFF_SECS", &v)?);
        }
        if let Some(v) = get("VELOCITY_SLOW_FETCH_MS") {
            cfg.slow_fetch = Duration::from_millis(parse("VELOCITY_SLOW_FETCH_MS", &v)?);
        }
        if let Some(v) = get("VELOCITY_SAMPLE_MS") {
            let ms: u64 = parse("VELOCITY_SAMPLE_MS", &v)?;
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    name: "VELOCITY_SAMPLE_MS",
                    reason: "must be greater than zero".into(),
                });
            }
            cfg.sample_every = Duration::from_millis(ms);
        }
        if let Some(v) = get("VELOCITY_RETENTION") {
            cfg.retention = parse("VELOCITY_RETENTION", &v)?;
        }
        if let Some(v) = get("VELOCITY_TIMEZONE") {
            cfg.zone = parse("VELOCITY_TIMEZONE", &v)?;
        }
        if let Some(v) = get("VELOCITY_FIRST_ROW") {
            cfg.first_row = parse("VELOCITY_FIRST_ROW", &v)?;
        }
        if let Some(v) = get("VELOCITY_EMPTY_WINDOW") {
            cfg.empty_window = parse("VELOCITY_EMPTY_WINDOW", &v)?;
        }
        if let Some(v) = get("COINGECKO_URL") {
            cfg.coingecko_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("COINGECKO_COIN") {
            cfg.coin_id = v;
        }
        if let Some(v) = get("COINGECKO_CURRENCY") {
            cfg.vs_currency = v;
        }
        if let Some(v) = lookup("VELOCITY_BOARD_CONFIG") {
            // an explicitly empty value disables the config command
            let v = v.trim().to_string();
            cfg.board_config = (!v.is_empty()).then_some(v);
        }
        if let Some(v) = get("VELOCITY_BIND") {
            cfg.bind = v;
        }
        if let Some(v) = get("VELOCITY_PORT") {
            cfg.port = parse("VELOCITY_PORT", &v)?;
        }

        Ok(cfg)
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
