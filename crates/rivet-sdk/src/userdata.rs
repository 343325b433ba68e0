//! Userdata boxes and metatables
//!
//! A [`UserData`] carries an opaque host payload. Its [`Metatable`] decides
//! what script operators do with it: every operator the `State` dispatches
//! looks up the matching [`MetaHook`] and calls it with the operands.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::function::NativeFunction;

/// Operator slots of a metatable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaHook {
    /// `v[k]`, called with `(v, k)`
    Index,
    /// `v[k] = x`, called with `(v, k, x)`
    NewIndex,
    /// `#v`, called with `(v)`
    Len,
    /// `a == b`, called with `(a, b)`
    Eq,
    /// `v(...)`, called with `(v, ...)`
    Call,
    /// `tostring(v)`, called with `(v)`
    ToString,
    /// `a ^ b`, called with `(a, b)`
    Pow,
    /// `-v`, called with `(v, v)`
    Unm,
}

impl MetaHook {
    /// Conventional metamethod name
    pub fn name(self) -> &'static str {
        match self {
            MetaHook::Index => "__index",
            MetaHook::NewIndex => "__newindex",
            MetaHook::Len => "__len",
            MetaHook::Eq => "__eq",
            MetaHook::Call => "__call",
            MetaHook::ToString => "__tostring",
            MetaHook::Pow => "__pow",
            MetaHook::Unm => "__unm",
        }
    }
}

/// Operator bindings shared by all userdata of one kind
#[derive(Clone)]
pub struct Metatable {
    name: String,
    hooks: FxHashMap<MetaHook, NativeFunction>,
    protection: Option<String>,
}

impl Metatable {
    /// Create an empty metatable
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: FxHashMap::default(),
            protection: None,
        }
    }

    /// Bind a hook, builder style
    pub fn with_hook(mut self, hook: MetaHook, func: NativeFunction) -> Self {
        self.hooks.insert(hook, func);
        self
    }

    /// Bind a hook
    pub fn set_hook(&mut self, hook: MetaHook, func: NativeFunction) {
        self.hooks.insert(hook, func);
    }

    /// Hide the hook table behind a marker value
    pub fn protect(mut self, marker: impl Into<String>) -> Self {
        self.protection = Some(marker.into());
        self
    }

    /// Metatable name, usually the host type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound hook, if any
    pub fn hook(&self, hook: MetaHook) -> Option<&NativeFunction> {
        self.hooks.get(&hook)
    }

    /// Whether a hook is bound
    pub fn has_hook(&self, hook: MetaHook) -> bool {
        self.hooks.contains_key(&hook)
    }

    /// Marker returned instead of the hook table, if protected
    pub fn protection(&self) -> Option<&str> {
        self.protection.as_deref()
    }

    pub(crate) fn hooks(&self) -> impl Iterator<Item = (&MetaHook, &NativeFunction)> {
        self.hooks.iter()
    }
}

impl fmt::Debug for Metatable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooks: Vec<_> = self.hooks.keys().map(|h| h.name()).collect();
        hooks.sort_unstable();
        f.debug_struct("Metatable")
            .field("name", &self.name)
            .field("hooks", &hooks)
            .field("protected", &self.protection.is_some())
            .finish()
    }
}

/// Opaque host payload boxed for script code
pub struct UserData {
    payload: Box<dyn Any + Send + Sync>,
    metatable: Option<Arc<Metatable>>,
}

impl UserData {
    /// Box a payload with an optional metatable
    pub fn new<T>(payload: T, metatable: Option<Arc<Metatable>>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            payload: Box::new(payload),
            metatable,
        }
    }

    /// Borrow the payload as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Whether the payload is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Attached metatable
    pub fn metatable(&self) -> Option<&Arc<Metatable>> {
        self.metatable.as_ref()
    }

    /// Metatable name, or `"userdata"` without one
    pub fn type_label(&self) -> &str {
        self.metatable.as_ref().map_or("userdata", |mt| mt.name())
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserData")
            .field("metatable", &self.metatable)
            .finish_non_exhaustive()
    }
}
