//! Host functions as native script functions

use rivet_sdk::{NativeFunction, ScriptError, ScriptValue, State};
use rivet_types::{HostFunc, HostValue, Signature};

use crate::convert::to_host;
use crate::error::{BridgeError, BridgeResult};
use crate::proxy::to_script;

/// Wrap a host function so scripts can call it
///
/// Each argument is converted to its parameter type; results come back
/// through [`crate::make_proxy`].
pub fn wrap_func(name: &str, func: HostFunc) -> NativeFunction {
    NativeFunction::new(name, move |state, args| {
        call(state, &func, &args).map_err(ScriptError::from)
    })
}

fn call(state: &State, func: &HostFunc, args: &[ScriptValue]) -> BridgeResult<Vec<ScriptValue>> {
    let host_args = convert_args(func.signature(), args)?;
    let results = func.call(&host_args)?;
    results
        .into_iter()
        .map(|value| to_script(state, value))
        .collect()
}

/// Convert script arguments to the parameter list; absent arguments are
/// nil and variadic trailing arguments are packed into the last slice
fn convert_args(sig: &Signature, args: &[ScriptValue]) -> BridgeResult<Vec<HostValue>> {
    let fixed = match (sig.variadic, sig.params.len()) {
        (true, n) if n > 0 => n - 1,
        (_, n) => n,
    };
    let mut out = Vec::with_capacity(sig.params.len());
    for (i, param) in sig.params[..fixed].iter().enumerate() {
        out.push(to_host(rivet_sdk::args::arg(args, i + 1), param)?);
    }
    if fixed < sig.params.len() {
        let slice_ty = &sig.params[fixed];
        let elem = slice_ty.elem().ok_or_else(|| BridgeError::Conversion {
            from: "variadic arguments".to_string(),
            to: slice_ty.to_string(),
        })?;
        let rest = args
            .iter()
            .skip(fixed)
            .map(|arg| to_host(arg, elem))
            .collect::<BridgeResult<Vec<_>>>()?;
        let packed = HostValue::make_slice(slice_ty, 0, 0)?.append(&rest)?;
        out.push(packed);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_types::{HostType, ReflectError};

    fn sum_func() -> HostFunc {
        let ints = HostType::slice_of(&HostType::int64());
        HostFunc::variadic(
            vec![HostType::string(), ints],
            vec![HostType::string()],
            |args| {
                let prefix = args[0].as_string().unwrap_or_default();
                let rest = &args[1];
                let mut total = 0;
                for i in 0..rest.len()? {
                    total += rest.index(i)?.as_int().unwrap_or(0);
                }
                Ok(vec![HostValue::from(format!("{}{}", prefix, total))])
            },
        )
    }

    #[test]
    fn test_variadic_packing() {
        let state = State::new();
        let f = wrap_func("sum", sum_func());
        let out = f
            .call(
                &state,
                vec![
                    ScriptValue::from("total="),
                    ScriptValue::from(1i64),
                    ScriptValue::from(2i64),
                    ScriptValue::from(3i64),
                ],
            )
            .unwrap();
        assert_eq!(out[0].as_str(), Some("total=6"));

        let out = f.call(&state, vec![ScriptValue::from("none=")]).unwrap();
        assert_eq!(out[0].as_str(), Some("none=0"));
    }

    #[test]
    fn test_missing_argument_is_nil() {
        let state = State::new();
        let f = wrap_func("sum", sum_func());
        let err = f.call(&state, vec![]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BridgeError>(),
            Some(BridgeError::Conversion { .. })
        ));
    }

    #[test]
    fn test_host_failure_is_call_error() {
        let state = State::new();
        let fail = HostFunc::new(vec![], vec![], |_| {
            Err(ReflectError::Call("disk full".to_string()))
        });
        let err = wrap_func("fail", fail).call(&state, vec![]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<BridgeError>(),
            Some(&BridgeError::Call("disk full".to_string()))
        );
    }
}
