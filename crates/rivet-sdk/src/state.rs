//! State - one embedding of the scripting runtime
//!
//! Owns the registry (host-side storage keyed by string, invisible to
//! scripts) and the global table, and implements operator dispatch: each
//! operator applies to primitive operands directly and otherwise defers to
//! the operand's metatable.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{ScriptError, ScriptResult};
use crate::userdata::{MetaHook, UserData};
use crate::value::{ScriptValue, TableRef};

/// Registry entry
pub type RegistryValue = Arc<dyn Any + Send + Sync>;

/// A scripting runtime instance
#[derive(Default)]
pub struct State {
    registry: RwLock<FxHashMap<String, RegistryValue>>,
    globals: TableRef,
}

impl State {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Read a registry entry
    pub fn registry_get(&self, key: &str) -> Option<RegistryValue> {
        self.registry.read().get(key).cloned()
    }

    /// Write a registry entry, replacing any previous one
    pub fn registry_set(&self, key: impl Into<String>, value: RegistryValue) {
        self.registry.write().insert(key.into(), value);
    }

    /// Read a registry entry, creating it first if absent
    pub fn registry_get_or_insert_with<F>(&self, key: &str, init: F) -> RegistryValue
    where
        F: FnOnce() -> RegistryValue,
    {
        if let Some(value) = self.registry_get(key) {
            return value;
        }
        self.registry
            .write()
            .entry(key.to_string())
            .or_insert_with(init)
            .clone()
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Global table
    pub fn globals(&self) -> &TableRef {
        &self.globals
    }

    /// Bind a global name
    pub fn set_global(&self, name: &str, value: impl Into<ScriptValue>) {
        self.globals.set_named(name, value.into());
    }

    /// Read a global name; unbound names read as nil
    pub fn global(&self, name: &str) -> ScriptValue {
        self.globals.raw_get(&ScriptValue::from(name))
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn hook_call(
        &self,
        ud: &Arc<UserData>,
        hook: MetaHook,
        args: Vec<ScriptValue>,
    ) -> Option<ScriptResult<Vec<ScriptValue>>> {
        let func = ud.metatable()?.hook(hook)?.clone();
        Some(func.call(self, args))
    }

    fn first(results: ScriptResult<Vec<ScriptValue>>) -> ScriptResult<ScriptValue> {
        Ok(results?.into_iter().next().unwrap_or_default())
    }

    /// `target[key]`
    pub fn index(&self, target: &ScriptValue, key: impl Into<ScriptValue>) -> ScriptResult<ScriptValue> {
        let key = key.into();
        match target {
            ScriptValue::Table(t) => Ok(t.raw_get(&key)),
            ScriptValue::UserData(ud) => {
                match self.hook_call(ud, MetaHook::Index, vec![target.clone(), key]) {
                    Some(results) => Self::first(results),
                    None => Err(operand_error("index", target)),
                }
            }
            _ => Err(operand_error("index", target)),
        }
    }

    /// `target[key] = value`
    pub fn set_index(
        &self,
        target: &ScriptValue,
        key: impl Into<ScriptValue>,
        value: impl Into<ScriptValue>,
    ) -> ScriptResult<()> {
        let (key, value) = (key.into(), value.into());
        match target {
            ScriptValue::Table(t) => t.raw_set(key, value),
            ScriptValue::UserData(ud) => {
                match self.hook_call(ud, MetaHook::NewIndex, vec![target.clone(), key, value]) {
                    Some(results) => results.map(|_| ()),
                    None => Err(operand_error("index", target)),
                }
            }
            _ => Err(operand_error("index", target)),
        }
    }

    /// `#target`
    pub fn len(&self, target: &ScriptValue) -> ScriptResult<ScriptValue> {
        match target {
            ScriptValue::String(s) => Ok(ScriptValue::from(s.len())),
            ScriptValue::Table(t) => Ok(ScriptValue::from(t.len())),
            ScriptValue::UserData(ud) => match self.hook_call(ud, MetaHook::Len, vec![target.clone()]) {
                Some(results) => Self::first(results),
                None => Err(operand_error("get length of", target)),
            },
            _ => Err(operand_error("get length of", target)),
        }
    }

    /// `a == b`
    ///
    /// Two distinct userdata consult the first operand's `Eq` hook, and only
    /// when both carry the same metatable.
    pub fn equals(&self, a: &ScriptValue, b: &ScriptValue) -> ScriptResult<bool> {
        if a.raw_equal(b) {
            return Ok(true);
        }
        let (ScriptValue::UserData(x), ScriptValue::UserData(y)) = (a, b) else {
            return Ok(false);
        };
        let same_metatable = match (x.metatable(), y.metatable()) {
            (Some(mx), Some(my)) => Arc::ptr_eq(mx, my),
            _ => false,
        };
        if !same_metatable {
            return Ok(false);
        }
        match self.hook_call(x, MetaHook::Eq, vec![a.clone(), b.clone()]) {
            Some(results) => Ok(Self::first(results)?.truthy()),
            None => Ok(false),
        }
    }

    /// `f(args...)`
    pub fn call(&self, f: &ScriptValue, args: Vec<ScriptValue>) -> ScriptResult<Vec<ScriptValue>> {
        match f {
            ScriptValue::Function(func) => func.call(self, args),
            ScriptValue::UserData(ud) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(f.clone());
                full.extend(args);
                self.hook_call(ud, MetaHook::Call, full)
                    .unwrap_or_else(|| Err(operand_error("call", f)))
            }
            _ => Err(operand_error("call", f)),
        }
    }

    /// `target:name(args...)`
    pub fn call_method(
        &self,
        target: &ScriptValue,
        name: &str,
        args: Vec<ScriptValue>,
    ) -> ScriptResult<Vec<ScriptValue>> {
        let method = self.index(target, name)?;
        if method.is_nil() {
            return Err(ScriptError::Runtime(format!(
                "attempt to call a nil value (method '{}')",
                name
            )));
        }
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(target.clone());
        full.extend(args);
        self.call(&method, full)
    }

    /// `tostring(v)`
    pub fn tostring(&self, v: &ScriptValue) -> ScriptResult<String> {
        Ok(match v {
            ScriptValue::Nil => "nil".to_string(),
            ScriptValue::Bool(b) => b.to_string(),
            ScriptValue::Number(n) => format_number(*n),
            ScriptValue::String(s) => s.to_string(),
            ScriptValue::Table(_) => format!("table: {:#x}", v.addr()),
            ScriptValue::Function(_) => format!("function: {:#x}", v.addr()),
            ScriptValue::UserData(ud) => match self.hook_call(ud, MetaHook::ToString, vec![v.clone()]) {
                Some(results) => {
                    let result = Self::first(results)?;
                    match result.as_str() {
                        Some(s) => s.to_string(),
                        None => return Err(ScriptError::from("'__tostring' must return a string")),
                    }
                }
                None => format!("{}: {:#x}", ud.type_label(), v.addr()),
            },
        })
    }

    /// `a ^ b`
    pub fn pow(&self, a: &ScriptValue, b: &ScriptValue) -> ScriptResult<ScriptValue> {
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            return Ok(ScriptValue::Number(x.powf(y)));
        }
        for operand in [a, b] {
            if let ScriptValue::UserData(ud) = operand {
                if let Some(results) = self.hook_call(ud, MetaHook::Pow, vec![a.clone(), b.clone()]) {
                    return Self::first(results);
                }
            }
        }
        let culprit = if a.as_number().is_none() { a } else { b };
        Err(operand_error("perform arithmetic on", culprit))
    }

    /// `-v`
    pub fn unm(&self, v: &ScriptValue) -> ScriptResult<ScriptValue> {
        match v {
            ScriptValue::Number(n) => Ok(ScriptValue::Number(-n)),
            ScriptValue::UserData(ud) => match self.hook_call(ud, MetaHook::Unm, vec![v.clone(), v.clone()]) {
                Some(results) => Self::first(results),
                None => Err(operand_error("perform arithmetic on", v)),
            },
            _ => Err(operand_error("perform arithmetic on", v)),
        }
    }

    /// `getmetatable(v)`
    ///
    /// Protected metatables yield their marker instead of the hook table.
    pub fn get_metatable(&self, v: &ScriptValue) -> ScriptValue {
        let Some(mt) = v.as_userdata().and_then(|ud| ud.metatable()) else {
            return ScriptValue::Nil;
        };
        if let Some(marker) = mt.protection() {
            return ScriptValue::from(marker);
        }
        let table = TableRef::new();
        for (hook, func) in mt.hooks() {
            let _ = table.raw_set(ScriptValue::from(hook.name()), ScriptValue::Function(func.clone()));
        }
        ScriptValue::Table(table)
    }
}

fn operand_error(op: &str, v: &ScriptValue) -> ScriptError {
    ScriptError::Runtime(format!("attempt to {} a {} value", op, v.type_name()))
}

/// Integral numbers print without a fractional part
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
