//! Descriptors
//!
//! A [`Descriptor`] is everything the bridge knows about one host type: which
//! adaptor serves it, the member tables the adaptor reads, and the metatable
//! attached to every proxy of that type. Descriptors are built once per
//! type by the cache and never change afterwards.

use std::sync::Arc;

use rivet_sdk::{Metatable, NativeFunction};
use rivet_types::{HostType, Kind, Shape};
use rustc_hash::FxHashMap;

use crate::adaptors;
use crate::config::BridgeConfig;
use crate::generate;

/// Structural adaptor serving a host type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdaptorKind {
    /// Structs and pointers to structs
    Struct,
    /// Pointers to anything but structs and arrays
    Pointer,
    /// Slices
    Slice,
    /// Arrays and pointers to arrays
    Array,
    /// Maps
    Map,
    /// Channels
    Chan,
    /// Everything else: named scalars, interfaces
    Default,
}

/// Field indices locating a field from the root struct
///
/// Embedded pointers along the path are followed when the path is walked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPath(Vec<usize>);

impl AccessPath {
    /// Path of the root itself
    pub fn root() -> Self {
        Self::default()
    }

    /// This path extended by one field index
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        AccessPath(path)
    }

    /// Indices from the root outward
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Embedding depth plus one
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Name tables of a descriptor
#[derive(Debug, Default)]
pub struct Members {
    pub(crate) fields: FxHashMap<String, AccessPath>,
    pub(crate) methods: FxHashMap<String, NativeFunction>,
    pub(crate) ptr_methods: FxHashMap<String, NativeFunction>,
}

impl Members {
    /// Field registered under `name`
    pub fn field(&self, name: &str) -> Option<&AccessPath> {
        self.fields.get(name)
    }

    /// Behavior registered under `name`, pointer-bound first
    pub fn behavior(&self, name: &str) -> Option<&NativeFunction> {
        self.ptr_methods
            .get(name)
            .or_else(|| self.methods.get(name))
    }

    /// Number of registered field names
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Whether `name` is bound in the value-bound table
    pub fn has_value_behavior(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Whether `name` is bound in the pointer-bound table
    pub fn has_pointer_behavior(&self, name: &str) -> bool {
        self.ptr_methods.contains_key(name)
    }
}

/// Generated proxy description for one host type
#[derive(Debug)]
pub struct Descriptor {
    ty: HostType,
    kind: AdaptorKind,
    deref: bool,
    members: Arc<Members>,
    metatable: Arc<Metatable>,
}

impl Descriptor {
    /// Run the generator and adaptor setup for `ty`
    pub(crate) fn generate(ty: &HostType, config: &BridgeConfig) -> Self {
        let (kind, deref, base) = select(ty);

        let mut members = Members::default();
        match kind {
            AdaptorKind::Slice => adaptors::slice::builtins(&mut members.methods),
            AdaptorKind::Chan => adaptors::channel::builtins(&mut members.methods),
            _ => {}
        }
        if kind == AdaptorKind::Struct {
            members.fields = generate::fields(&base, config);
        }
        let methods = base.methods();
        generate::behaviors(&methods.value, &mut members.methods, config);
        if deref {
            generate::behaviors(&methods.pointer, &mut members.ptr_methods, config);
        }

        let members = Arc::new(members);
        let metatable = Arc::new(adaptors::metatable(ty, kind, deref, &members));
        Self {
            ty: ty.clone(),
            kind,
            deref,
            members,
            metatable,
        }
    }

    /// Host type this descriptor serves
    pub fn ty(&self) -> &HostType {
        &self.ty
    }

    /// Adaptor kind
    pub fn kind(&self) -> AdaptorKind {
        self.kind
    }

    /// Whether proxies support dereference-read and dereference-assign
    pub fn has_deref(&self) -> bool {
        self.deref
    }

    /// Field and behavior tables
    pub fn members(&self) -> &Members {
        &self.members
    }

    /// Metatable attached to every proxy of this type
    pub fn metatable(&self) -> &Arc<Metatable> {
        &self.metatable
    }
}

/// Adaptor, dereference support and the type whose members are exposed
fn select(ty: &HostType) -> (AdaptorKind, bool, HostType) {
    match ty.shape() {
        Shape::Pointer(elem) => {
            let kind = match elem.kind() {
                Kind::Struct => AdaptorKind::Struct,
                Kind::Array => AdaptorKind::Array,
                _ => AdaptorKind::Pointer,
            };
            (kind, true, elem.clone())
        }
        Shape::Struct(_) => (AdaptorKind::Struct, false, ty.clone()),
        Shape::Slice(_) => (AdaptorKind::Slice, false, ty.clone()),
        Shape::Array(..) => (AdaptorKind::Array, false, ty.clone()),
        Shape::Map(..) => (AdaptorKind::Map, false, ty.clone()),
        Shape::Chan(_) => (AdaptorKind::Chan, false, ty.clone()),
        _ => (AdaptorKind::Default, false, ty.clone()),
    }
}
