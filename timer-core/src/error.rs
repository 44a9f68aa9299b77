use thiserror::Error;

use crate::countdown::{Phase, PickerField};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StopwatchError {
    #[error("Stopwatch is already running")]
    AlreadyRunning,

    #[error("Stopwatch is not running")]
    NotRunning,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("Cannot {op} while timer is {phase}")]
    InvalidTransition { op: &'static str, phase: Phase },

    #[error("Timer duration must be greater than zero")]
    ZeroDuration,

    #[error("{field} value {value} is out of range 0..={max}")]
    OutOfRange {
        field: PickerField,
        value: u32,
        max: u32,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldClockError {
    #[error("Unsupported timezone: {0}")]
    UnknownTimezone(String),

    #[error("City not in catalog: {0}")]
    UnknownCity(String),
}

pub type TimerResult<T> = std::result::Result<T, TimerError>;
