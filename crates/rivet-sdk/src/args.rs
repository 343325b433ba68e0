//! Argument checks for native functions
//!
//! Positions are 1-based, as scripts count them. Every failure is a
//! catchable [`ScriptError::Argument`].

use crate::convert::{from_script_at, FromScript};
use crate::error::{ScriptError, ScriptResult};
use crate::value::ScriptValue;

static NIL: ScriptValue = ScriptValue::Nil;

/// Argument at `position`, nil when absent
pub fn arg(args: &[ScriptValue], position: usize) -> &ScriptValue {
    position
        .checked_sub(1)
        .and_then(|i| args.get(i))
        .unwrap_or(&NIL)
}

/// Required argument of type `T`
pub fn check<T: FromScript>(args: &[ScriptValue], position: usize) -> ScriptResult<T> {
    from_script_at(arg(args, position), position)
}

/// Optional argument of type `T`; nil or absent yields `default`
pub fn opt<T: FromScript>(args: &[ScriptValue], position: usize, default: T) -> ScriptResult<T> {
    match arg(args, position) {
        ScriptValue::Nil => Ok(default),
        value => from_script_at(value, position),
    }
}

/// Raise an argument error unless `condition` holds
pub fn arg_check(condition: bool, position: usize, message: impl Into<String>) -> ScriptResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ScriptError::argument(position, message))
    }
}
