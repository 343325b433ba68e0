//! Rivet - host values for an embedded scripting runtime
//!
//! The bridge lets script code read, mutate, compare, iterate and call
//! values owned by the host program without copying them. Each host value
//! crosses over as a proxy: a userdata box holding the value plus a
//! metatable generated once per host type and cached per `State`.
//!
//! # Overview
//!
//! - [`make_proxy`] exposes a host value
//! - [`make_type_constructor`] exposes a host type as a callable
//!   constructor
//! - [`to_host`] converts a script value back to a host type
//! - [`configure`] sets the field tag key and alias policy before first use
//!
//! # Example
//!
//! ```ignore
//! use rivet::{make_proxy, make_type_constructor};
//! use rivet_sdk::State;
//! use rivet_types::{Field, HostType, HostValue};
//!
//! let person = HostType::structure("Person", vec![Field::new("Name", HostType::string())]);
//! let state = State::new();
//! state.set_global("Person", make_type_constructor(&state, &person));
//!
//! let tim = HostValue::alloc(&person);
//! state.set_global("tim", make_proxy(&state, tim)?);
//! ```

#![warn(missing_docs)]

pub(crate) mod adaptors;
pub mod cache;
pub mod config;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod function;
pub(crate) mod generate;
pub mod proxy;

pub use adaptors::PROTECTION_MARKER;
pub use cache::MetatableCache;
pub use config::BridgeConfig;
pub use convert::to_host;
pub use descriptor::{AccessPath, AdaptorKind, Descriptor, Members};
pub use error::{BridgeError, BridgeResult};
pub use function::wrap_func;
pub use proxy::{configure, make_proxy, make_type_constructor};
