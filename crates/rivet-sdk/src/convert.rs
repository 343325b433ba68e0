//! Traits for converting between script values and Rust types.
//!
//! Implement [`FromScript`] to let native functions receive a Rust type as
//! an argument via [`crate::args::check`].

use std::sync::Arc;

use crate::error::{ScriptError, ScriptResult};
use crate::userdata::UserData;
use crate::value::ScriptValue;

/// Convert from a ScriptValue to a Rust type.
pub trait FromScript: Sized {
    /// Script-visible name of the expected type, used in argument errors
    const EXPECTED: &'static str;

    /// Convert, returning `None` when the value has the wrong type
    fn from_script(value: &ScriptValue) -> Option<Self>;
}

impl FromScript for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_script(value: &ScriptValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromScript for f64 {
    const EXPECTED: &'static str = "number";

    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Number(n) => Some(*n),
            ScriptValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromScript for i64 {
    const EXPECTED: &'static str = "number";

    fn from_script(value: &ScriptValue) -> Option<Self> {
        let n = f64::from_script(value)?;
        (n.fract() == 0.0 && n.is_finite()).then_some(n as i64)
    }
}

impl FromScript for String {
    const EXPECTED: &'static str = "string";

    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::String(s) => Some(s.to_string()),
            ScriptValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl FromScript for Arc<UserData> {
    const EXPECTED: &'static str = "userdata";

    fn from_script(value: &ScriptValue) -> Option<Self> {
        value.as_userdata().cloned()
    }
}

impl FromScript for ScriptValue {
    const EXPECTED: &'static str = "value";

    fn from_script(value: &ScriptValue) -> Option<Self> {
        Some(value.clone())
    }
}

/// Build the argument error for a value of the wrong type
pub(crate) fn type_error<T: FromScript>(position: usize, got: &ScriptValue) -> ScriptError {
    let got = if got.is_nil() { "no value" } else { got.type_name() };
    ScriptError::argument(position, format!("{} expected, got {}", T::EXPECTED, got))
}

/// Convert, raising an argument error at `position` on mismatch
pub fn from_script_at<T: FromScript>(value: &ScriptValue, position: usize) -> ScriptResult<T> {
    T::from_script(value).ok_or_else(|| type_error::<T>(position, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_coercions() {
        assert_eq!(f64::from_script(&ScriptValue::from("2.5")), Some(2.5));
        assert_eq!(i64::from_script(&ScriptValue::from(3.0)), Some(3));
        assert_eq!(i64::from_script(&ScriptValue::from(3.5)), None);
        assert_eq!(String::from_script(&ScriptValue::from(true)), None);
    }

    #[test]
    fn test_type_error_message() {
        let err = from_script_at::<i64>(&ScriptValue::Nil, 2).unwrap_err();
        assert_eq!(err.to_string(), "bad argument #2 (number expected, got no value)");
    }
}
