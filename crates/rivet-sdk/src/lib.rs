//! Rivet SDK - the scripting runtime boundary
//!
//! This crate provides the types the bridge programs against: dynamic
//! script values, userdata boxes with metatables, native functions, and a
//! `State` that owns a registry and dispatches script operators.
//!
//! # Example
//!
//! ```ignore
//! use rivet_sdk::{args, NativeFunction, ScriptValue, State};
//!
//! let state = State::new();
//! state.set_global("double", NativeFunction::new("double", |_, argv| {
//!     let n: f64 = args::check(&argv, 1)?;
//!     Ok(vec![ScriptValue::from(n * 2.0)])
//! }));
//! ```

#![warn(missing_docs)]

pub mod args;
pub mod convert;
pub mod error;
pub mod function;
pub mod state;
pub mod userdata;
pub mod value;

pub use convert::FromScript;
pub use error::{ScriptError, ScriptResult};
pub use function::{NativeFn, NativeFunction};
pub use state::{RegistryValue, State};
pub use userdata::{MetaHook, Metatable, UserData};
pub use value::{ScriptValue, TableRef};
