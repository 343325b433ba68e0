//! Error types for the scripting boundary

use std::error::Error as StdError;
use std::sync::Arc;

/// Result type for script operations
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Errors raised to script code
///
/// Every variant is catchable by the script that triggered it; nothing here
/// tears down the `State`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScriptError {
    /// A native function received an unusable argument
    #[error("bad argument #{position} ({message})")]
    Argument {
        /// 1-based argument position
        position: usize,
        /// What was wrong with it
        message: String,
    },

    /// Operation not supported by the operand
    #[error("{0}")]
    Runtime(String),

    /// Error value produced by host code
    #[error("{0}")]
    Host(Arc<dyn StdError + Send + Sync>),
}

impl ScriptError {
    /// Wrap a host error
    pub fn host<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        ScriptError::Host(Arc::new(error))
    }

    /// Argument error at a 1-based position
    pub fn argument(position: usize, message: impl Into<String>) -> Self {
        ScriptError::Argument {
            position,
            message: message.into(),
        }
    }

    /// Inspect a host error by concrete type
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            ScriptError::Host(error) => error.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<String> for ScriptError {
    fn from(s: String) -> Self {
        ScriptError::Runtime(s)
    }
}

impl From<&str> for ScriptError {
    fn from(s: &str) -> Self {
        ScriptError::Runtime(s.to_string())
    }
}
