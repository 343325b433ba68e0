//! Reflection errors

use thiserror::Error;

use crate::ty::Kind;

/// Result type for reflection operations
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Errors raised by operations on host types and values
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReflectError {
    /// Operation is not defined for the value's kind
    #[error("reflect: call of {op} on {kind} value")]
    WrongKind {
        /// Operation name
        op: &'static str,
        /// Kind of the receiver
        kind: Kind,
    },

    /// Dereference of a nil pointer
    #[error("reflect: nil pointer dereference")]
    NilPointer,

    /// Use of a nil map, channel, function or interface
    #[error("reflect: use of nil {0}")]
    NilValue(Kind),

    /// Mutation of a location that cannot be assigned
    #[error("reflect: {0} value is not settable")]
    NotSettable(String),

    /// Taking the address of a value that has no location
    #[error("reflect: {0} value is not addressable")]
    NotAddressable(String),

    /// Storing a value into a location of an incompatible type
    #[error("reflect: value of type {from} is not assignable to type {to}")]
    NotAssignable {
        /// Source type
        from: String,
        /// Destination type
        to: String,
    },

    /// Element or field index outside `[0, len)`
    #[error("reflect: index {index} out of range [0, {len})")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Number of elements
        len: usize,
    },

    /// Slice created with a length larger than its capacity
    #[error("reflect: slice length {len} exceeds capacity {cap}")]
    InvalidLength {
        /// Requested length
        len: usize,
        /// Requested capacity
        cap: usize,
    },

    /// Map key whose type cannot be hashed
    #[error("reflect: unhashable map key of type {0}")]
    Unhashable(String),

    /// Send on, or close of, a closed channel
    #[error("{op} closed channel")]
    ClosedChannel {
        /// `"send on"` or `"close of"`
        op: &'static str,
    },

    /// Stored data does not have the shape its type describes
    #[error("reflect: value data does not match type {0}")]
    DataMismatch(String),

    /// A declared type was defined twice
    #[error("type {0} is already defined")]
    AlreadyDefined(String),

    /// Wrong number of arguments for a host function
    #[error("reflect: function expects {expected} arguments, got {got}")]
    ArgumentCount {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Failure reported by a host function body
    #[error("{0}")]
    Call(String),
}
