//! Rivet Host Types
//!
//! Runtime descriptions of host types and reflected host values: the
//! metadata the bridge inspects to decide how a value is exposed to scripts.

#![warn(missing_docs)]

pub mod channel;
pub mod error;
mod fmt;
pub mod func;
pub mod id;
pub mod ty;
pub mod value;

pub use channel::Channel;
pub use error::{ReflectError, ReflectResult};
pub use func::HostFunc;
pub use id::TypeId;
pub use ty::{Field, HostType, Kind, Method, MethodSets, Shape, Signature};
pub use value::{Data, HostValue, MapKey, Slot};
