//! Engine error taxonomy

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a single evaluator call
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid parameter '{field}': {reason}")]
    #[diagnostic(
        code(tra::engine::invalid_parameter),
        help("Fix the value in the parameter file and re-run")
    )]
    InvalidParameter { field: String, reason: String },

    #[error("no input: {what}")]
    #[diagnostic(code(tra::engine::empty_input))]
    EmptyInput { what: String },

    #[error("analysis cancelled")]
    #[diagnostic(code(tra::engine::cancelled))]
    Cancelled,

    #[error("analysis exceeded the {limit_ms} ms time limit")]
    #[diagnostic(
        code(tra::engine::timed_out),
        help("Lower the iteration count or raise --timeout")
    )]
    TimedOut { limit_ms: u128 },
}

impl EngineError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn empty(what: impl Into<String>) -> Self {
        EngineError::EmptyInput { what: what.into() }
    }

    /// Serializable tag for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            EngineError::EmptyInput { .. } => ErrorKind::EmptyInput,
            EngineError::Cancelled => ErrorKind::Cancelled,
            EngineError::TimedOut { .. } => ErrorKind::TimedOut,
        }
    }

    /// Whether the whole run has to stop (as opposed to one evaluator failing)
    pub fn is_interruption(&self) -> bool {
        matches!(self, EngineError::Cancelled | EngineError::TimedOut { .. })
    }
}

/// Error category carried in failure markers of an analysis record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameter,
    EmptyInput,
    Cancelled,
    TimedOut,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidParameter => write!(f, "invalid_parameter"),
            ErrorKind::EmptyInput => write!(f, "empty_input"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::TimedOut => write!(f, "timed_out"),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Reject NaN/infinite inputs up front
pub(crate) fn require_finite(field: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::invalid(field, format!("must be a finite number, got {}", value)))
    }
}

/// Require `value` to lie within [0, 1]
pub(crate) fn require_unit_interval(field: &str, value: f64) -> EngineResult<()> {
    require_finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::invalid(
            field,
            format!("must be between 0 and 1, got {}", value),
        ));
    }
    Ok(())
}
