//! Host functions

use std::fmt;
use std::sync::Arc;

use crate::error::{ReflectError, ReflectResult};
use crate::ty::{HostType, Signature};
use crate::value::HostValue;

type Callback = dyn Fn(&[HostValue]) -> ReflectResult<Vec<HostValue>> + Send + Sync;

/// A callable host function with a typed signature
///
/// Methods are stored as functions whose first parameter is the receiver.
#[derive(Clone)]
pub struct HostFunc {
    ty: HostType,
    signature: Signature,
    callback: Arc<Callback>,
}

impl HostFunc {
    /// Create a function with fixed arity
    pub fn new<F>(params: Vec<HostType>, results: Vec<HostType>, callback: F) -> Self
    where
        F: Fn(&[HostValue]) -> ReflectResult<Vec<HostValue>> + Send + Sync + 'static,
    {
        Self::build(params, results, false, Arc::new(callback))
    }

    /// Create a variadic function; the last parameter must be a slice type
    pub fn variadic<F>(params: Vec<HostType>, results: Vec<HostType>, callback: F) -> Self
    where
        F: Fn(&[HostValue]) -> ReflectResult<Vec<HostValue>> + Send + Sync + 'static,
    {
        Self::build(params, results, true, Arc::new(callback))
    }

    fn build(
        params: Vec<HostType>,
        results: Vec<HostType>,
        variadic: bool,
        callback: Arc<Callback>,
    ) -> Self {
        let ty = HostType::func(params.clone(), results.clone(), variadic);
        Self {
            ty,
            signature: Signature {
                params,
                results,
                variadic,
            },
            callback,
        }
    }

    /// Function type
    pub fn ty(&self) -> &HostType {
        &self.ty
    }

    /// Parameter and result types
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Identity of the underlying closure
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.callback) as *const () as usize
    }

    /// Invoke the function
    ///
    /// Arguments must match the parameter list exactly; variadic trailing
    /// arguments are passed packed in the final slice.
    pub fn call(&self, args: &[HostValue]) -> ReflectResult<Vec<HostValue>> {
        let params = &self.signature.params;
        if args.len() != params.len() {
            return Err(ReflectError::ArgumentCount {
                expected: params.len(),
                got: args.len(),
            });
        }
        for (arg, param) in args.iter().zip(params) {
            if !arg.ty().assignable_to(param) {
                return Err(ReflectError::NotAssignable {
                    from: arg.ty().to_string(),
                    to: param.to_string(),
                });
            }
        }
        (self.callback)(args)
    }
}

impl fmt::Debug for HostFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFunc({} @ {:#x})", self.ty, self.addr())
    }
}
