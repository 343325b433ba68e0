//! Bridge errors
//!
//! Every error here is raised at the operator call that caused it and
//! reaches the script as a catchable [`ScriptError::Host`]; callers on the
//! host side recover the variant with [`ScriptError::downcast_ref`].

use rivet_sdk::ScriptError;
use rivet_types::ReflectError;
use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised by proxy operators, conversions and host calls
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BridgeError {
    /// Operand has the wrong structural kind for the operator
    #[error("bad argument #{position}: expected {expected}, got {got}")]
    ArgumentKind {
        /// 1-based argument position
        position: usize,
        /// What the operator needs
        expected: String,
        /// What it received
        got: String,
    },

    /// Dereference of a nil pointer, or use of a nil map or channel
    #[error("cannot dereference nil pointer")]
    NilDereference,

    /// Mutation of a location that cannot be assigned
    #[error("cannot assign to {0}")]
    NotSettable(String),

    /// Script value not coercible to the host type
    #[error("cannot convert {from} to {to}")]
    Conversion {
        /// Script-side type name
        from: String,
        /// Host type name
        to: String,
    },

    /// Index outside `[0, len)`
    #[error("index {index} out of range [0, {len})")]
    Bounds {
        /// Requested index
        index: i64,
        /// Number of elements
        len: usize,
    },

    /// Send on a closed channel, or close of a closed channel
    #[error("{op} closed channel")]
    ClosedChannel {
        /// `"send on"` or `"close of"`
        op: &'static str,
    },

    /// Assignment to a name the struct does not expose
    #[error("type {ty} has no field {name}")]
    UnknownField {
        /// Struct type name
        ty: String,
        /// Requested name
        name: String,
    },

    /// Value reached through a hidden location
    #[error("cannot expose value of type {0}")]
    Inaccessible(String),

    /// Failure reported by a host function
    #[error("{0}")]
    Call(String),

    /// Any other reflection failure
    #[error(transparent)]
    Reflect(ReflectError),
}

impl From<ReflectError> for BridgeError {
    fn from(error: ReflectError) -> Self {
        match error {
            ReflectError::NilPointer | ReflectError::NilValue(_) => BridgeError::NilDereference,
            ReflectError::NotSettable(what) => BridgeError::NotSettable(what),
            ReflectError::NotAssignable { from, to } => BridgeError::Conversion { from, to },
            ReflectError::OutOfRange { index, len } => BridgeError::Bounds {
                index: index as i64,
                len,
            },
            ReflectError::ClosedChannel { op } => BridgeError::ClosedChannel { op },
            ReflectError::Call(message) => BridgeError::Call(message),
            other => BridgeError::Reflect(other),
        }
    }
}

impl From<BridgeError> for ScriptError {
    fn from(error: BridgeError) -> Self {
        ScriptError::host(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_types::Kind;

    #[test]
    fn test_reflect_mapping() {
        assert_eq!(
            BridgeError::from(ReflectError::NilPointer),
            BridgeError::NilDereference
        );
        assert_eq!(
            BridgeError::from(ReflectError::NilValue(Kind::Map)),
            BridgeError::NilDereference
        );
        assert_eq!(
            BridgeError::from(ReflectError::OutOfRange { index: 3, len: 3 }),
            BridgeError::Bounds { index: 3, len: 3 }
        );
        assert!(matches!(
            BridgeError::from(ReflectError::InvalidLength { len: 2, cap: 1 }),
            BridgeError::Reflect(_)
        ));
    }

    #[test]
    fn test_script_error_roundtrip() {
        let err: ScriptError = BridgeError::ClosedChannel { op: "close of" }.into();
        assert_eq!(err.to_string(), "close of closed channel");
        assert_eq!(
            err.downcast_ref::<BridgeError>(),
            Some(&BridgeError::ClosedChannel { op: "close of" })
        );
    }
}
