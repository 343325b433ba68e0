//! Native functions callable from script code

use std::fmt;
use std::sync::Arc;

use crate::error::ScriptResult;
use crate::state::State;
use crate::value::ScriptValue;

/// Signature of a native function body
pub type NativeFn =
    dyn Fn(&State, Vec<ScriptValue>) -> ScriptResult<Vec<ScriptValue>> + Send + Sync;

/// A named, shareable native function
///
/// Takes the arguments as passed by the caller and returns any number of
/// results. Missing arguments are simply absent from the vector.
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    /// Create a native function
    pub fn new<F>(name: impl AsRef<str>, func: F) -> Self
    where
        F: Fn(&State, Vec<ScriptValue>) -> ScriptResult<Vec<ScriptValue>> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.as_ref()),
            func: Arc::new(func),
        }
    }

    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function
    pub fn call(&self, state: &State, args: Vec<ScriptValue>) -> ScriptResult<Vec<ScriptValue>> {
        (self.func)(state, args)
    }

    /// Whether two handles refer to the same function
    pub fn same(&self, other: &NativeFunction) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.func) as *const () as usize
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}
