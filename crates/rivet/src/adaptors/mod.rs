//! Kind Adaptors
//!
//! Each adaptor installs the operator hooks for one structural kind. Hooks
//! receive the operands exactly as the `State` dispatches them: the proxy
//! first, then the key, value or second operand. They take no cache lock,
//! so a hook may block (a channel send, for example) without holding up
//! other proxies.

pub(crate) mod array;
pub(crate) mod channel;
pub(crate) mod map;
pub(crate) mod pointer;
pub(crate) mod slice;
pub(crate) mod structs;
pub(crate) mod type_proxy;

use std::sync::Arc;

use rivet_sdk::args::arg;
use rivet_sdk::{MetaHook, Metatable, NativeFunction, ScriptResult, ScriptValue, State};
use rivet_types::{HostType, HostValue, Kind};

use crate::descriptor::{AdaptorKind, Members};
use crate::error::{BridgeError, BridgeResult};

/// Returned by `getmetatable` in place of a proxy's hook table
pub const PROTECTION_MARKER: &str = "rivet: metatable is protected";

/// Build the metatable shared by every proxy of `ty`
pub(crate) fn metatable(
    ty: &HostType,
    kind: AdaptorKind,
    deref: bool,
    members: &Arc<Members>,
) -> Metatable {
    let mut mt = Metatable::new(ty.to_string()).protect(PROTECTION_MARKER);
    mt.set_hook(
        MetaHook::ToString,
        operator("__tostring", |_, args| {
            Ok(ScriptValue::from(check_value(args, 1)?.to_string()))
        }),
    );
    match kind {
        AdaptorKind::Struct => structs::install(&mut mt, deref, members),
        AdaptorKind::Pointer => pointer::install(&mut mt, members),
        AdaptorKind::Slice => slice::install(&mut mt, members),
        AdaptorKind::Array => array::install(&mut mt, deref, members),
        AdaptorKind::Map => map::install(&mut mt, members),
        AdaptorKind::Chan => channel::install(&mut mt, members),
        AdaptorKind::Default => install_default(&mut mt, members),
    }
    if deref {
        pointer::install_deref(&mut mt);
    }
    mt
}

/// Named scalars, interfaces and other kinds without structure: behaviors
/// only, identity equality
fn install_default(mt: &mut Metatable, members: &Arc<Members>) {
    let m = members.clone();
    mt.set_hook(
        MetaHook::Index,
        operator("__index", move |_, args| {
            check_value(args, 1)?;
            Ok(behavior_or_nil(&m, name_key(args, 2)?))
        }),
    );
    mt.set_hook(
        MetaHook::Eq,
        operator("__eq", |_, args| {
            let (a, b) = (check_value(args, 1)?, check_value(args, 2)?);
            Ok(ScriptValue::from(a.slot().same(b.slot())))
        }),
    );
}

// ============================================================================
// Hook helpers
// ============================================================================

/// Native function for a single-result operator
pub(crate) fn operator<F>(name: &str, f: F) -> NativeFunction
where
    F: Fn(&State, &[ScriptValue]) -> BridgeResult<ScriptValue> + Send + Sync + 'static,
{
    NativeFunction::new(name, move |state, args| -> ScriptResult<Vec<ScriptValue>> {
        Ok(vec![f(state, &args)?])
    })
}

/// Host value boxed in the proxy at `position`
pub(crate) fn check_value(args: &[ScriptValue], position: usize) -> BridgeResult<&HostValue> {
    let value = arg(args, position);
    value
        .as_userdata()
        .and_then(|ud| ud.downcast_ref::<HostValue>())
        .ok_or_else(|| BridgeError::ArgumentKind {
            position,
            expected: "host value".to_string(),
            got: value.type_name().to_string(),
        })
}

/// Host value at `position`, which must be of `kind`
pub(crate) fn check_kind(
    args: &[ScriptValue],
    position: usize,
    kind: Kind,
) -> BridgeResult<&HostValue> {
    let value = check_value(args, position)?;
    if value.kind() != kind {
        return Err(BridgeError::ArgumentKind {
            position,
            expected: kind.name().to_string(),
            got: value.ty().to_string(),
        });
    }
    Ok(value)
}

/// String key at `position`
pub(crate) fn name_key(args: &[ScriptValue], position: usize) -> BridgeResult<&str> {
    let key = arg(args, position);
    key.as_str().ok_or_else(|| BridgeError::ArgumentKind {
        position,
        expected: "string".to_string(),
        got: key.type_name().to_string(),
    })
}

/// Key of a sequence operator
pub(crate) enum SequenceKey<'a> {
    /// Element index
    Index(i64),
    /// Behavior name
    Name(&'a str),
}

/// Integral number or string key at `position`
pub(crate) fn sequence_key(args: &[ScriptValue], position: usize) -> BridgeResult<SequenceKey<'_>> {
    match arg(args, position) {
        ScriptValue::Number(n) if n.fract() == 0.0 && n.is_finite() => {
            Ok(SequenceKey::Index(*n as i64))
        }
        ScriptValue::String(s) => Ok(SequenceKey::Name(s)),
        other => Err(BridgeError::ArgumentKind {
            position,
            expected: "integer index".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

/// Integer index at `position`, for writes
pub(crate) fn index_key(args: &[ScriptValue], position: usize) -> BridgeResult<i64> {
    match sequence_key(args, position)? {
        SequenceKey::Index(i) => Ok(i),
        SequenceKey::Name(_) => Err(BridgeError::ArgumentKind {
            position,
            expected: "integer index".to_string(),
            got: "string".to_string(),
        }),
    }
}

/// `index` as a position in `[0, len)`
pub(crate) fn bounds(index: i64, len: usize) -> BridgeResult<usize> {
    if index >= 0 && (index as u64) < len as u64 {
        Ok(index as usize)
    } else {
        Err(BridgeError::Bounds { index, len })
    }
}

/// Behavior bound to `name`, or nil
pub(crate) fn behavior_or_nil(members: &Members, name: &str) -> ScriptValue {
    members
        .behavior(name)
        .map(|f| ScriptValue::Function(f.clone()))
        .unwrap_or_default()
}

/// Same length and structurally equal elements
pub(crate) fn elements_equal(a: &HostValue, b: &HostValue) -> BridgeResult<bool> {
    let len = a.len()?;
    if len != b.len()? {
        return Ok(false);
    }
    for i in 0..len {
        if !a.index(i)?.structural_eq(&b.index(i)?) {
            return Ok(false);
        }
    }
    Ok(true)
}
