use engine::EngineError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::device::DeviceSessionError;
use crate::recorder::RecordError;
use crate::sink::PersistenceError;

/// Fatal errors of a run. Each class has its own process exit status.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    DeviceSession(#[from] DeviceSessionError),

    #[error("need at least {need} points for changes, got {got}")]
    InsufficientData { got: usize, need: usize },

    #[error("readout server failed: {0}")]
    Server(#[source] std::io::Error),

    #[error("fetch client setup failed: {0}")]
    Source(#[from] crate::source::FetchError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<RecordError> for AppError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::Engine(e) => AppError::Engine(e),
            RecordError::Persistence(e) => AppError::Persistence(e),
        }
    }
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Engine(_) | AppError::Task(_) => 1,
            AppError::Config(_) => 2,
            AppError::Persistence(_) => 3,
            AppError::DeviceSession(_) => 4,
            AppError::InsufficientData { .. } => 5,
            AppError::Server(_) => 6,
            AppError::Source(_) => 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceError;

    #[test]
    fn each_error_class_has_its_own_exit_code() {
        let errors = [
            AppError::Engine(EngineError::InvalidSample(f64::NAN)),
            AppError::Config(ConfigError::Invalid {
                name: "X",
                reason: "bad".into(),
            }),
            AppError::Persistence(PersistenceError::Write {
                path: "out.csv".into(),
                source: std::io::Error::other("disk full"),
            }),
            AppError::DeviceSession(DeviceSessionError {
                stage: "prepare",
                source: DeviceError::NotStreaming,
            }),
            AppError::InsufficientData { got: 1, need: 2 },
            AppError::Server(std::io::Error::other("bind")),
            AppError::Source(crate::source::FetchError::NoData("x")),
        ];

        let codes: Vec<_> = errors.iter().map(AppError::exit_code).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn record_errors_keep_their_class() {
        let e: AppError = RecordError::Persistence(PersistenceError::Open {
            path: "x".into(),
            source: std::io::Error::other("denied"),
        })
        .into();
        assert_eq!(e.exit_code(), 3);
    }

    #[test]
    fn insufficient_data_message() {
        let e = AppError::InsufficientData { got: 1, need: 2 };
        assert_eq!(e.to_string(), "need at least 2 points for changes, got 1");
    }
}
