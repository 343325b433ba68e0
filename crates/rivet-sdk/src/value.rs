//! ScriptValue - dynamic values as seen by script code

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{ScriptError, ScriptResult};
use crate::function::NativeFunction;
use crate::userdata::UserData;

/// A dynamically typed script value
///
/// Tables, functions and userdata are reference types: cloning a value
/// clones the handle, not the referent.
#[derive(Clone, Default)]
pub enum ScriptValue {
    /// `nil`
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// Number (double precision)
    Number(f64),
    /// Immutable string
    String(Arc<str>),
    /// Table
    Table(TableRef),
    /// Native function
    Function(NativeFunction),
    /// Boxed host data with an optional metatable
    UserData(Arc<UserData>),
}

impl ScriptValue {
    /// String value
    pub fn string(s: impl AsRef<str>) -> Self {
        ScriptValue::String(Arc::from(s.as_ref()))
    }

    /// Script-visible type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Table(_) => "table",
            ScriptValue::Function(_) => "function",
            ScriptValue::UserData(_) => "userdata",
        }
    }

    /// Check if value is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    /// Everything except `nil` and `false` is true
    pub fn truthy(&self) -> bool {
        !matches!(self, ScriptValue::Nil | ScriptValue::Bool(false))
    }

    /// Get as boolean if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as number if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as table if this is a table
    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            ScriptValue::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Get as function if this is a function
    pub fn as_function(&self) -> Option<&NativeFunction> {
        match self {
            ScriptValue::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get as userdata if this is userdata
    pub fn as_userdata(&self) -> Option<&Arc<UserData>> {
        match self {
            ScriptValue::UserData(u) => Some(u),
            _ => None,
        }
    }

    /// Primitive equality: value equality for scalars, identity for
    /// reference types; no metamethods involved
    pub fn raw_equal(&self, other: &ScriptValue) -> bool {
        match (self, other) {
            (ScriptValue::Nil, ScriptValue::Nil) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Number(a), ScriptValue::Number(b)) => a == b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Table(a), ScriptValue::Table(b)) => a.same(b),
            (ScriptValue::Function(a), ScriptValue::Function(b)) => a.same(b),
            (ScriptValue::UserData(a), ScriptValue::UserData(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn addr(&self) -> usize {
        match self {
            ScriptValue::Table(t) => Arc::as_ptr(&t.0) as usize,
            ScriptValue::Function(f) => f.addr(),
            ScriptValue::UserData(u) => Arc::as_ptr(u) as usize,
            _ => 0,
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Nil => write!(f, "Nil"),
            ScriptValue::Bool(b) => write!(f, "Bool({})", b),
            ScriptValue::Number(n) => write!(f, "Number({})", n),
            ScriptValue::String(s) => write!(f, "String({:?})", s),
            ScriptValue::Table(_) => write!(f, "Table({:#x})", self.addr()),
            ScriptValue::Function(func) => write!(f, "Function({})", func.name()),
            ScriptValue::UserData(u) => write!(f, "UserData({})", u.type_label()),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        ScriptValue::Number(n)
    }
}

impl From<i64> for ScriptValue {
    fn from(n: i64) -> Self {
        ScriptValue::Number(n as f64)
    }
}

impl From<usize> for ScriptValue {
    fn from(n: usize) -> Self {
        ScriptValue::Number(n as f64)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::string(s)
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::String(Arc::from(s))
    }
}

impl From<NativeFunction> for ScriptValue {
    fn from(f: NativeFunction) -> Self {
        ScriptValue::Function(f)
    }
}

impl From<TableRef> for ScriptValue {
    fn from(t: TableRef) -> Self {
        ScriptValue::Table(t)
    }
}

// ============================================================================
// Tables
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TableKey {
    Bool(bool),
    Number(u64),
    String(Arc<str>),
    Ref(usize),
}

impl TableKey {
    fn from_value(value: &ScriptValue) -> ScriptResult<Self> {
        Ok(match value {
            ScriptValue::Nil => return Err(ScriptError::from("table index is nil")),
            ScriptValue::Bool(b) => TableKey::Bool(*b),
            ScriptValue::Number(n) if n.is_nan() => {
                return Err(ScriptError::from("table index is NaN"))
            }
            ScriptValue::Number(n) => TableKey::Number(if *n == 0.0 { 0 } else { n.to_bits() }),
            ScriptValue::String(s) => TableKey::String(s.clone()),
            other => TableKey::Ref(other.addr()),
        })
    }
}

/// Shared handle to a script table
#[derive(Clone, Default)]
pub struct TableRef(Arc<RwLock<FxHashMap<TableKey, (ScriptValue, ScriptValue)>>>);

impl TableRef {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence table `{v1, v2, ...}`
    pub fn from_sequence(items: impl IntoIterator<Item = ScriptValue>) -> Self {
        let table = Self::new();
        for (i, item) in items.into_iter().enumerate() {
            let _ = table.raw_set(ScriptValue::from(i + 1), item);
        }
        table
    }

    /// Read a field without metamethods; missing keys read as nil
    pub fn raw_get(&self, key: &ScriptValue) -> ScriptValue {
        match TableKey::from_value(key) {
            Ok(k) => self
                .0
                .read()
                .get(&k)
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
            Err(_) => ScriptValue::Nil,
        }
    }

    /// Write a field without metamethods; assigning nil removes the key
    pub fn raw_set(&self, key: ScriptValue, value: ScriptValue) -> ScriptResult<()> {
        let k = TableKey::from_value(&key)?;
        let mut map = self.0.write();
        if value.is_nil() {
            map.remove(&k);
        } else {
            map.insert(k, (key, value));
        }
        Ok(())
    }

    /// `raw_set` with a string key, which always converts
    pub(crate) fn set_named(&self, name: &str, value: ScriptValue) {
        let key = TableKey::String(Arc::from(name));
        let mut map = self.0.write();
        if value.is_nil() {
            map.remove(&key);
        } else {
            map.insert(key, (ScriptValue::from(name), value));
        }
    }

    /// Border of the sequence part: largest `n` with `t[1..=n]` all non-nil
    pub fn len(&self) -> usize {
        let map = self.0.read();
        let mut n = 0usize;
        while map.contains_key(&TableKey::Number(((n + 1) as f64).to_bits())) {
            n += 1;
        }
        n
    }

    /// Whether the sequence part is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All `(key, value)` pairs, in no particular order
    pub fn pairs(&self) -> Vec<(ScriptValue, ScriptValue)> {
        self.0.read().values().cloned().collect()
    }

    /// Whether two handles refer to the same table
    pub fn same(&self, other: &TableRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableRef({:#x})", Arc::as_ptr(&self.0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!ScriptValue::Nil.truthy());
        assert!(!ScriptValue::Bool(false).truthy());
        assert!(ScriptValue::Number(0.0).truthy());
        assert!(ScriptValue::from("").truthy());
    }

    #[test]
    fn test_raw_equal() {
        assert!(ScriptValue::from("a").raw_equal(&ScriptValue::from("a")));
        assert!(!ScriptValue::from(1i64).raw_equal(&ScriptValue::from("1")));
        let t = TableRef::new();
        assert!(ScriptValue::from(t.clone()).raw_equal(&ScriptValue::from(t)));
        assert!(!ScriptValue::from(TableRef::new()).raw_equal(&ScriptValue::from(TableRef::new())));
    }

    #[test]
    fn test_table_sequence_and_nil_removal() {
        let t = TableRef::from_sequence(vec![ScriptValue::from(1i64), ScriptValue::from(2i64)]);
        assert_eq!(t.len(), 2);
        t.raw_set(ScriptValue::from(2i64), ScriptValue::Nil).unwrap();
        assert_eq!(t.len(), 1);
        assert!(t.raw_get(&ScriptValue::from(2i64)).is_nil());
        assert!(t.raw_set(ScriptValue::Nil, ScriptValue::from(true)).is_err());
    }
}
