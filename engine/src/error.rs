use corelib::MinuteKey;
use thiserror::Error;

use crate::cadence::CadencePhase;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid sample: {0} is not finite")]
    InvalidSample(f64),

    #[error("change from {previous} to {current} is not representable")]
    NonFiniteChange { previous: f64, current: f64 },

    #[error("out-of-order sample: minute {current:?} precedes last recorded minute {previous:?}")]
    OutOfOrder {
        previous: MinuteKey,
        current: MinuteKey,
    },

    #[error("illegal cadence transition {from} -> {to}")]
    IllegalTransition {
        from: CadencePhase,
        to: CadencePhase,
    },
}
