//! Host type descriptions
//!
//! A [`HostType`] is the identity the bridge keys its descriptor caches by.
//! Named types receive a fresh identity every time they are declared. Basic
//! types and unnamed composites (pointers, slices, arrays, maps, channels,
//! functions) are interned, so building `*Person` twice yields the same
//! `HostType`.
//!
//! Named types are declared first and defined afterwards, which lets a
//! struct refer to a pointer to itself:
//!
//! ```rust,ignore
//! let person = HostType::declare("Person");
//! person.define(
//!     Shape::Struct(vec![
//!         Field::new("Name", HostType::string()),
//!         Field::new("Friend", HostType::pointer_to(&person)),
//!     ]),
//!     MethodSets::new(),
//! )?;
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{ReflectError, ReflectResult};
use crate::func::HostFunc;
use crate::id::TypeId;

// ============================================================================
// Kind
// ============================================================================

/// Structural category of a host type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Declared but not yet defined
    Invalid,
    /// `bool`
    Bool,
    /// `int` (64-bit)
    Int,
    /// `int8`
    Int8,
    /// `int16`
    Int16,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint` (64-bit)
    Uint,
    /// `uint8`
    Uint8,
    /// `uint16`
    Uint16,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `float32`
    Float32,
    /// `float64`
    Float64,
    /// `string`
    String,
    /// Struct with named fields
    Struct,
    /// Pointer to an element
    Pointer,
    /// Growable view over a backing array
    Slice,
    /// Fixed-length array
    Array,
    /// Hash map
    Map,
    /// Channel
    Chan,
    /// Function
    Func,
    /// Empty interface, holds a value of any type
    Interface,
}

impl Kind {
    /// Signed integer kinds
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Kind::Int | Kind::Int8 | Kind::Int16 | Kind::Int32 | Kind::Int64
        )
    }

    /// Unsigned integer kinds
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Kind::Uint | Kind::Uint8 | Kind::Uint16 | Kind::Uint32 | Kind::Uint64
        )
    }

    /// Floating point kinds
    pub fn is_float(self) -> bool {
        matches!(self, Kind::Float32 | Kind::Float64)
    }

    /// Any integer or float kind
    pub fn is_numeric(self) -> bool {
        self.is_signed() || self.is_unsigned() || self.is_float()
    }

    /// Kinds whose values are bool, numeric or string
    pub fn is_scalar(self) -> bool {
        self == Kind::Bool || self == Kind::String || self.is_numeric()
    }

    /// Kinds whose zero value is nil
    pub fn is_nillable(self) -> bool {
        matches!(
            self,
            Kind::Pointer | Kind::Slice | Kind::Map | Kind::Chan | Kind::Func | Kind::Interface
        )
    }

    /// Lowercase kind name
    pub fn name(self) -> &'static str {
        match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::String => "string",
            Kind::Struct => "struct",
            Kind::Pointer => "ptr",
            Kind::Slice => "slice",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Chan => "chan",
            Kind::Func => "func",
            Kind::Interface => "interface",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Fields, signatures and methods
// ============================================================================

/// A struct field declaration
#[derive(Debug, Clone)]
pub struct Field {
    /// Declared field name
    pub name: String,
    /// Field type
    pub ty: HostType,
    /// Annotations as `(key, value)` pairs
    pub tags: Vec<(String, String)>,
    /// Whether the field is an embedded (composed) member
    pub embedded: bool,
    /// Whether the field is visible outside its declaring package
    pub exported: bool,
}

impl Field {
    /// Create an exported, non-embedded field
    pub fn new(name: impl Into<String>, ty: HostType) -> Self {
        Self {
            name: name.into(),
            ty,
            tags: Vec::new(),
            embedded: false,
            exported: true,
        }
    }

    /// Create an embedded field named after its type (pointer stripped)
    pub fn embedded(ty: HostType) -> Self {
        let base = match ty.shape() {
            Shape::Pointer(elem) => elem.clone(),
            _ => ty.clone(),
        };
        let mut field = Self::new(base.to_string(), ty);
        field.embedded = true;
        field
    }

    /// Attach an annotation
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Mark the field as not exported
    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }

    /// Look up an annotation value by key
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Function signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Parameter types; a method's receiver comes first
    pub params: Vec<HostType>,
    /// Result types
    pub results: Vec<HostType>,
    /// Whether the last parameter is a slice that absorbs trailing arguments
    pub variadic: bool,
}

/// A method attached to a named type
#[derive(Debug, Clone)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Implementation; the receiver is the first argument
    pub func: HostFunc,
    /// Whether the method is visible outside its declaring package
    pub exported: bool,
}

impl Method {
    /// Create an exported method
    pub fn new(name: impl Into<String>, func: HostFunc) -> Self {
        Self {
            name: name.into(),
            func,
            exported: true,
        }
    }

    /// Mark the method as not exported
    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }
}

/// Value-receiver and pointer-receiver method sets of a named type
#[derive(Debug, Clone, Default)]
pub struct MethodSets {
    /// Methods callable on `T`
    pub value: Vec<Method>,
    /// Methods callable only on `*T`
    pub pointer: Vec<Method>,
}

impl MethodSets {
    /// Empty method sets
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value-receiver method
    pub fn with_value(mut self, method: Method) -> Self {
        self.value.push(method);
        self
    }

    /// Add a pointer-receiver method
    pub fn with_pointer(mut self, method: Method) -> Self {
        self.pointer.push(method);
        self
    }
}

// ============================================================================
// Shape
// ============================================================================

/// Structure of a host type
#[derive(Debug, Clone)]
pub enum Shape {
    /// Declared, not yet defined
    Undefined,
    /// Bool, numeric or string
    Scalar(Kind),
    /// Struct fields in declaration order
    Struct(Vec<Field>),
    /// Pointer to element
    Pointer(HostType),
    /// Slice of element
    Slice(HostType),
    /// Array of element with fixed length
    Array(HostType, usize),
    /// Map from key to element
    Map(HostType, HostType),
    /// Channel of element
    Chan(HostType),
    /// Function
    Func(Signature),
    /// Empty interface
    Interface,
}

impl Shape {
    /// Kind of this shape
    pub fn kind(&self) -> Kind {
        match self {
            Shape::Undefined => Kind::Invalid,
            Shape::Scalar(kind) => *kind,
            Shape::Struct(_) => Kind::Struct,
            Shape::Pointer(_) => Kind::Pointer,
            Shape::Slice(_) => Kind::Slice,
            Shape::Array(..) => Kind::Array,
            Shape::Map(..) => Kind::Map,
            Shape::Chan(_) => Kind::Chan,
            Shape::Func(_) => Kind::Func,
            Shape::Interface => Kind::Interface,
        }
    }
}

// ============================================================================
// HostType
// ============================================================================

struct TypeDef {
    id: TypeId,
    name: Option<String>,
    shape: OnceCell<Shape>,
    methods: OnceCell<MethodSets>,
}

/// Identity and description of a host type
///
/// Cloning is cheap; equality and hashing use the type's identity only.
/// Type descriptions live for the rest of the process.
#[derive(Clone)]
pub struct HostType(Arc<TypeDef>);

static UNDEFINED: Shape = Shape::Undefined;
static NO_METHODS: Lazy<MethodSets> = Lazy::new(MethodSets::default);

#[derive(PartialEq, Eq, Hash)]
enum InternKey {
    Scalar(Kind),
    Pointer(TypeId),
    Slice(TypeId),
    Array(TypeId, usize),
    Map(TypeId, TypeId),
    Chan(TypeId),
    Func(Vec<TypeId>, Vec<TypeId>, bool),
    Interface,
}

static INTERNED: Lazy<Mutex<FxHashMap<InternKey, HostType>>> = Lazy::new(Default::default);

fn intern(key: InternKey, shape: impl FnOnce() -> Shape) -> HostType {
    INTERNED
        .lock()
        .entry(key)
        .or_insert_with(|| HostType::with_shape(None, shape()))
        .clone()
}

impl HostType {
    fn with_shape(name: Option<String>, shape: Shape) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(shape);
        HostType(Arc::new(TypeDef {
            id: TypeId::next(),
            name,
            shape: cell,
            methods: OnceCell::new(),
        }))
    }

    // ------------------------------------------------------------------------
    // Named types
    // ------------------------------------------------------------------------

    /// Declare a named type whose shape is supplied later by [`define`](Self::define)
    pub fn declare(name: impl Into<String>) -> Self {
        HostType(Arc::new(TypeDef {
            id: TypeId::next(),
            name: Some(name.into()),
            shape: OnceCell::new(),
            methods: OnceCell::new(),
        }))
    }

    /// Define a declared type's shape and method sets
    pub fn define(&self, shape: Shape, methods: MethodSets) -> ReflectResult<()> {
        self.0
            .shape
            .set(shape)
            .map_err(|_| ReflectError::AlreadyDefined(self.to_string()))?;
        self.0
            .methods
            .set(methods)
            .map_err(|_| ReflectError::AlreadyDefined(self.to_string()))
    }

    /// Declare and define a named type without methods
    pub fn named(name: impl Into<String>, shape: Shape) -> Self {
        Self::with_shape(Some(name.into()), shape)
    }

    /// Declare and define a named struct type without methods
    pub fn structure(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::named(name, Shape::Struct(fields))
    }

    // ------------------------------------------------------------------------
    // Interned types
    // ------------------------------------------------------------------------

    /// Basic type of the given scalar kind
    ///
    /// Non-scalar kinds yield the empty interface type.
    pub fn scalar(kind: Kind) -> Self {
        if !kind.is_scalar() {
            return Self::any();
        }
        intern(InternKey::Scalar(kind), || Shape::Scalar(kind))
    }

    /// `bool`
    pub fn bool() -> Self {
        Self::scalar(Kind::Bool)
    }

    /// `int`
    pub fn int() -> Self {
        Self::scalar(Kind::Int)
    }

    /// `int32`
    pub fn int32() -> Self {
        Self::scalar(Kind::Int32)
    }

    /// `int64`
    pub fn int64() -> Self {
        Self::scalar(Kind::Int64)
    }

    /// `uint8`
    pub fn uint8() -> Self {
        Self::scalar(Kind::Uint8)
    }

    /// `uint`
    pub fn uint() -> Self {
        Self::scalar(Kind::Uint)
    }

    /// `float32`
    pub fn float32() -> Self {
        Self::scalar(Kind::Float32)
    }

    /// `float64`
    pub fn float64() -> Self {
        Self::scalar(Kind::Float64)
    }

    /// `string`
    pub fn string() -> Self {
        Self::scalar(Kind::String)
    }

    /// The empty interface
    pub fn any() -> Self {
        intern(InternKey::Interface, || Shape::Interface)
    }

    /// `*elem`
    pub fn pointer_to(elem: &HostType) -> Self {
        intern(InternKey::Pointer(elem.id()), || Shape::Pointer(elem.clone()))
    }

    /// `[]elem`
    pub fn slice_of(elem: &HostType) -> Self {
        intern(InternKey::Slice(elem.id()), || Shape::Slice(elem.clone()))
    }

    /// `[len]elem`
    pub fn array_of(elem: &HostType, len: usize) -> Self {
        intern(InternKey::Array(elem.id(), len), || {
            Shape::Array(elem.clone(), len)
        })
    }

    /// `map[key]elem`
    pub fn map_of(key: &HostType, elem: &HostType) -> Self {
        intern(InternKey::Map(key.id(), elem.id()), || {
            Shape::Map(key.clone(), elem.clone())
        })
    }

    /// `chan elem`
    pub fn chan_of(elem: &HostType) -> Self {
        intern(InternKey::Chan(elem.id()), || Shape::Chan(elem.clone()))
    }

    /// `func(params...) (results...)`
    pub fn func(params: Vec<HostType>, results: Vec<HostType>, variadic: bool) -> Self {
        let key = InternKey::Func(
            params.iter().map(HostType::id).collect(),
            results.iter().map(HostType::id).collect(),
            variadic,
        );
        intern(key, || {
            Shape::Func(Signature {
                params,
                results,
                variadic,
            })
        })
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Type identity
    pub fn id(&self) -> TypeId {
        self.0.id
    }

    /// Declared name for named types
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Whether the type has a shape
    pub fn is_defined(&self) -> bool {
        self.0.shape.get().is_some()
    }

    /// Structure of the type
    pub fn shape(&self) -> &Shape {
        self.0.shape.get().unwrap_or(&UNDEFINED)
    }

    /// Kind of the type
    pub fn kind(&self) -> Kind {
        self.shape().kind()
    }

    /// Method sets; empty for unnamed types
    pub fn methods(&self) -> &MethodSets {
        self.0.methods.get().unwrap_or(&NO_METHODS)
    }

    /// Struct fields; empty for non-struct types
    pub fn fields(&self) -> &[Field] {
        match self.shape() {
            Shape::Struct(fields) => fields,
            _ => &[],
        }
    }

    /// Element type of pointers, slices, arrays, maps and channels
    pub fn elem(&self) -> Option<&HostType> {
        match self.shape() {
            Shape::Pointer(elem)
            | Shape::Slice(elem)
            | Shape::Array(elem, _)
            | Shape::Map(_, elem)
            | Shape::Chan(elem) => Some(elem),
            _ => None,
        }
    }

    /// Key type of maps
    pub fn key(&self) -> Option<&HostType> {
        match self.shape() {
            Shape::Map(key, _) => Some(key),
            _ => None,
        }
    }

    /// Length of array types
    pub fn array_len(&self) -> Option<usize> {
        match self.shape() {
            Shape::Array(_, len) => Some(*len),
            _ => None,
        }
    }

    /// Signature of function types
    pub fn signature(&self) -> Option<&Signature> {
        match self.shape() {
            Shape::Func(sig) => Some(sig),
            _ => None,
        }
    }

    /// Whether a value of this type may be stored in a location of `target`
    pub fn assignable_to(&self, target: &HostType) -> bool {
        self == target || target.kind() == Kind::Interface
    }
}

impl PartialEq for HostType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for HostType {}

impl Hash for HostType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return f.write_str(name);
        }
        match self.shape() {
            Shape::Undefined => f.write_str("<undefined>"),
            Shape::Scalar(kind) => f.write_str(kind.name()),
            Shape::Struct(fields) => {
                f.write_str("struct {")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, " {} {}", field.name, field.ty)?;
                }
                f.write_str(" }")
            }
            Shape::Pointer(elem) => write!(f, "*{}", elem),
            Shape::Slice(elem) => write!(f, "[]{}", elem),
            Shape::Array(elem, len) => write!(f, "[{}]{}", len, elem),
            Shape::Map(key, elem) => write!(f, "map[{}]{}", key, elem),
            Shape::Chan(elem) => write!(f, "chan {}", elem),
            Shape::Func(sig) => {
                f.write_str("func(")?;
                for (i, param) in sig.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if sig.variadic && i + 1 == sig.params.len() {
                        write!(f, "...{}", param.elem().unwrap_or(param))?;
                    } else {
                        write!(f, "{}", param)?;
                    }
                }
                f.write_str(")")?;
                match sig.results.as_slice() {
                    [] => Ok(()),
                    [single] => write!(f, " {}", single),
                    many => {
                        f.write_str(" (")?;
                        for (i, result) in many.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{}", result)?;
                        }
                        f.write_str(")")
                    }
                }
            }
            Shape::Interface => f.write_str("interface {}"),
        }
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostType({})", self)
    }
}
