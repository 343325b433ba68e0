//! Reflected host values
//!
//! Host memory is modelled as [`Slot`]s: shared, lock-protected cells that
//! pointers, slice elements and struct fields refer to. A [`HostValue`]
//! pairs a slot with its [`HostType`] and tracks whether the location may be
//! assigned, the same way a reflected value does in a language with runtime
//! reflection:
//!
//! - values built with [`HostValue::new`] are copies and are not addressable
//! - dereferencing a pointer, indexing a slice, or reaching a field through
//!   an addressable struct yields an addressable location
//! - fields that are not exported are read-only, whatever their path

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;

use crate::channel::Channel;
use crate::error::{ReflectError, ReflectResult};
use crate::func::HostFunc;
use crate::ty::{HostType, Kind, Shape};

// ============================================================================
// Storage
// ============================================================================

/// A shared storage location
///
/// Cloning a slot aliases the same location.
#[derive(Clone)]
pub struct Slot(Arc<RwLock<Data>>);

impl Slot {
    /// Allocate a location holding `data`
    pub fn new(data: Data) -> Self {
        Slot(Arc::new(RwLock::new(data)))
    }

    /// Borrow the stored data
    pub fn read(&self) -> RwLockReadGuard<'_, Data> {
        self.0.read()
    }

    /// Copy the stored data out
    pub fn load(&self) -> Data {
        self.0.read().clone()
    }

    /// Replace the stored data
    pub fn store(&self, data: Data) {
        *self.0.write() = data;
    }

    /// Assign `data` in place
    ///
    /// Struct and array contents are written into the existing element
    /// slots, so locations already handed out for a field or element keep
    /// aliasing this one.
    pub fn assign(&self, data: Data) {
        let data = {
            let current = self.0.read();
            match (&*current, data) {
                (Data::Struct(dst), Data::Struct(src)) | (Data::Array(dst), Data::Array(src))
                    if dst.len() == src.len() =>
                {
                    for (slot, incoming) in dst.iter().zip(src) {
                        slot.assign(incoming.load());
                    }
                    return;
                }
                (_, data) => data,
            }
        };
        self.store(data);
    }

    /// Address of the location, used for identity comparisons
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Whether two slots alias the same location
    pub fn same(&self, other: &Slot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({:#x})", self.addr())
    }
}

/// Slice header: a window onto a shared backing array
#[derive(Debug, Clone)]
pub struct SliceData {
    backing: Arc<RwLock<Vec<Slot>>>,
    offset: usize,
    len: usize,
    cap: usize,
}

impl SliceData {
    fn element(&self, index: usize) -> Option<Slot> {
        if index >= self.len {
            return None;
        }
        self.backing.read().get(self.offset + index).cloned()
    }

    fn same_window(&self, other: &SliceData) -> bool {
        Arc::ptr_eq(&self.backing, &other.backing)
            && self.offset == other.offset
            && self.len == other.len
    }
}

/// Map entry keeping the original key data next to its value
#[derive(Debug, Clone)]
pub struct MapEntry {
    /// Key as stored
    pub key: Data,
    /// Associated value
    pub value: Data,
}

/// Shared map storage
#[derive(Debug, Clone)]
pub struct MapRef(Arc<RwLock<FxHashMap<MapKey, MapEntry>>>);

impl MapRef {
    fn new() -> Self {
        MapRef(Arc::new(RwLock::new(FxHashMap::default())))
    }

    /// Whether two references share the same map
    pub fn same(&self, other: &MapRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

/// Hashable projection of a map key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    /// Boolean key
    Bool(bool),
    /// Signed integer key
    Int(i64),
    /// Unsigned integer key
    Uint(u64),
    /// Float key, by bit pattern with negative zero folded into zero
    Float(u64),
    /// String key
    String(String),
    /// Pointer, channel or other reference key, by address
    Addr(usize),
    /// Struct or array key, element-wise
    Composite(Vec<MapKey>),
    /// Nil interface key
    Nil,
}

impl MapKey {
    /// Project data onto a hashable key
    pub fn from_data(ty: &HostType, data: &Data) -> ReflectResult<MapKey> {
        Ok(match data {
            Data::Bool(b) => MapKey::Bool(*b),
            Data::Int(i) => MapKey::Int(*i),
            Data::Uint(u) => MapKey::Uint(*u),
            Data::Float(x) => MapKey::Float(if *x == 0.0 { 0 } else { x.to_bits() }),
            Data::String(s) => MapKey::String(s.clone()),
            Data::Pointer(target) => MapKey::Addr(target.as_ref().map_or(0, Slot::addr)),
            Data::Chan(chan) => {
                MapKey::Addr(chan.as_ref().map_or(0, |c| Arc::as_ptr(c) as usize))
            }
            Data::Struct(slots) | Data::Array(slots) => {
                let mut keys = Vec::with_capacity(slots.len());
                for (i, slot) in slots.iter().enumerate() {
                    let elem_ty = match ty.shape() {
                        Shape::Struct(fields) => fields.get(i).map(|f| f.ty.clone()),
                        _ => ty.elem().cloned(),
                    }
                    .ok_or_else(|| ReflectError::DataMismatch(ty.to_string()))?;
                    keys.push(MapKey::from_data(&elem_ty, &slot.load())?);
                }
                MapKey::Composite(keys)
            }
            Data::Interface(Some(inner)) => MapKey::from_data(inner.ty(), &inner.data())?,
            Data::Interface(None) => MapKey::Nil,
            Data::Slice(_) | Data::Map(_) | Data::Func(_) => {
                return Err(ReflectError::Unhashable(ty.to_string()))
            }
        })
    }
}

/// Contents of a storage location
///
/// Cloning follows value semantics: structs and arrays are copied element by
/// element into fresh locations, while pointers, slices, maps, channels and
/// functions keep referring to the same storage.
#[derive(Debug)]
pub enum Data {
    /// `bool`
    Bool(bool),
    /// Any signed integer, wrapped to its width
    Int(i64),
    /// Any unsigned integer, wrapped to its width
    Uint(u64),
    /// `float32` or `float64`
    Float(f64),
    /// `string`
    String(String),
    /// Struct fields in declaration order
    Struct(Vec<Slot>),
    /// Pointer target, `None` for nil
    Pointer(Option<Slot>),
    /// Slice header, `None` for nil
    Slice(Option<SliceData>),
    /// Array elements
    Array(Vec<Slot>),
    /// Map storage, `None` for nil
    Map(Option<MapRef>),
    /// Channel, `None` for nil
    Chan(Option<Arc<Channel>>),
    /// Function, `None` for nil
    Func(Option<HostFunc>),
    /// Dynamic value held by an interface, `None` for nil
    Interface(Option<Box<HostValue>>),
}

fn copy_slots(slots: &[Slot]) -> Vec<Slot> {
    slots.iter().map(|slot| Slot::new(slot.load())).collect()
}

impl Clone for Data {
    fn clone(&self) -> Self {
        match self {
            Data::Bool(b) => Data::Bool(*b),
            Data::Int(i) => Data::Int(*i),
            Data::Uint(u) => Data::Uint(*u),
            Data::Float(x) => Data::Float(*x),
            Data::String(s) => Data::String(s.clone()),
            Data::Struct(slots) => Data::Struct(copy_slots(slots)),
            Data::Pointer(target) => Data::Pointer(target.clone()),
            Data::Slice(slice) => Data::Slice(slice.clone()),
            Data::Array(slots) => Data::Array(copy_slots(slots)),
            Data::Map(map) => Data::Map(map.clone()),
            Data::Chan(chan) => Data::Chan(chan.clone()),
            Data::Func(func) => Data::Func(func.clone()),
            Data::Interface(inner) => Data::Interface(inner.clone()),
        }
    }
}

impl Data {
    /// Zero value for a type
    pub fn zero(ty: &HostType) -> Data {
        match ty.shape() {
            Shape::Scalar(Kind::Bool) => Data::Bool(false),
            Shape::Scalar(Kind::String) => Data::String(String::new()),
            Shape::Scalar(kind) if kind.is_signed() => Data::Int(0),
            Shape::Scalar(kind) if kind.is_unsigned() => Data::Uint(0),
            Shape::Scalar(_) => Data::Float(0.0),
            Shape::Struct(fields) => Data::Struct(
                fields
                    .iter()
                    .map(|field| Slot::new(Data::zero(&field.ty)))
                    .collect(),
            ),
            Shape::Pointer(_) => Data::Pointer(None),
            Shape::Slice(_) => Data::Slice(None),
            Shape::Array(elem, len) => {
                Data::Array((0..*len).map(|_| Slot::new(Data::zero(elem))).collect())
            }
            Shape::Map(..) => Data::Map(None),
            Shape::Chan(_) => Data::Chan(None),
            Shape::Func(_) => Data::Func(None),
            Shape::Interface | Shape::Undefined => Data::Interface(None),
        }
    }

    /// Whether this is the nil value of a nillable kind
    pub fn is_nil(&self) -> bool {
        matches!(
            self,
            Data::Pointer(None)
                | Data::Slice(None)
                | Data::Map(None)
                | Data::Chan(None)
                | Data::Func(None)
                | Data::Interface(None)
        )
    }
}

// ============================================================================
// HostValue
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    addressable: bool,
    read_only: bool,
}

/// A typed host value, possibly aliasing a host location
#[derive(Clone)]
pub struct HostValue {
    ty: HostType,
    slot: Slot,
    flags: Flags,
}

impl HostValue {
    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    /// Wrap data as a non-addressable value of type `ty`
    pub fn new(ty: HostType, data: Data) -> Self {
        Self {
            ty,
            slot: Slot::new(data),
            flags: Flags::default(),
        }
    }

    /// Zero value of `ty`
    pub fn zero(ty: &HostType) -> Self {
        Self::new(ty.clone(), Data::zero(ty))
    }

    /// Addressable value living in an existing host location
    pub fn from_slot(ty: HostType, slot: Slot) -> Self {
        Self {
            ty,
            slot,
            flags: Flags {
                addressable: true,
                read_only: false,
            },
        }
    }

    /// Allocate a zero `ty` and return a `*ty` pointing at it
    pub fn alloc(ty: &HostType) -> Self {
        let target = Slot::new(Data::zero(ty));
        Self::new(HostType::pointer_to(ty), Data::Pointer(Some(target)))
    }

    /// Copy `value` into a fresh location and return a pointer to it
    pub fn new_pointer(value: &HostValue) -> Self {
        let target = Slot::new(value.data());
        Self::new(HostType::pointer_to(&value.ty), Data::Pointer(Some(target)))
    }

    /// Pointer to this value's location
    pub fn address_of(&self) -> ReflectResult<HostValue> {
        if !self.flags.addressable {
            return Err(ReflectError::NotAddressable(self.ty.to_string()));
        }
        Ok(Self::new(
            HostType::pointer_to(&self.ty),
            Data::Pointer(Some(self.slot.clone())),
        ))
    }

    /// `make([]T, len, cap)`
    pub fn make_slice(ty: &HostType, len: usize, cap: usize) -> ReflectResult<HostValue> {
        let elem = match ty.shape() {
            Shape::Slice(elem) => elem,
            _ => return Err(wrong_kind("make_slice", ty)),
        };
        if len > cap {
            return Err(ReflectError::InvalidLength { len, cap });
        }
        let backing = (0..cap).map(|_| Slot::new(Data::zero(elem))).collect();
        Ok(Self::new(
            ty.clone(),
            Data::Slice(Some(SliceData {
                backing: Arc::new(RwLock::new(backing)),
                offset: 0,
                len,
                cap,
            })),
        ))
    }

    /// `make(map[K]V)`
    pub fn make_map(ty: &HostType) -> ReflectResult<HostValue> {
        if ty.kind() != Kind::Map {
            return Err(wrong_kind("make_map", ty));
        }
        Ok(Self::new(ty.clone(), Data::Map(Some(MapRef::new()))))
    }

    /// `make(chan T, buffer)`
    pub fn make_chan(ty: &HostType, buffer: usize) -> ReflectResult<HostValue> {
        if ty.kind() != Kind::Chan {
            return Err(wrong_kind("make_chan", ty));
        }
        Ok(Self::new(
            ty.clone(),
            Data::Chan(Some(Arc::new(Channel::new(buffer)))),
        ))
    }

    /// Function value
    pub fn from_func(func: HostFunc) -> Self {
        Self::new(func.ty().clone(), Data::Func(Some(func)))
    }

    /// Box a value into an interface-typed value
    pub fn into_interface(self) -> HostValue {
        if self.kind() == Kind::Interface {
            return self;
        }
        Self::new(
            HostType::any(),
            Data::Interface(Some(Box::new(self.detached()))),
        )
    }

    /// Non-addressable copy of this value
    pub fn detached(&self) -> HostValue {
        Self::new(self.ty.clone(), self.data())
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Static type
    pub fn ty(&self) -> &HostType {
        &self.ty
    }

    /// Kind of the static type
    pub fn kind(&self) -> Kind {
        self.ty.kind()
    }

    /// Backing location
    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    /// Whether the value denotes a host location
    pub fn can_addr(&self) -> bool {
        self.flags.addressable
    }

    /// Whether the location may be assigned
    pub fn can_set(&self) -> bool {
        self.flags.addressable && !self.flags.read_only
    }

    /// Whether the value may be handed out (not reached through a hidden field)
    pub fn can_interface(&self) -> bool {
        !self.flags.read_only
    }

    /// Borrow the stored data
    pub fn read(&self) -> RwLockReadGuard<'_, Data> {
        self.slot.read()
    }

    /// Copy of the stored data
    pub fn data(&self) -> Data {
        self.slot.load()
    }

    /// Whether the value is nil
    pub fn is_nil(&self) -> bool {
        self.read().is_nil()
    }

    /// Address of the pointed-to location, channel, map or function
    pub fn pointer(&self) -> Option<usize> {
        match &*self.read() {
            Data::Pointer(target) => target.as_ref().map(Slot::addr),
            Data::Chan(chan) => chan.as_ref().map(|c| Arc::as_ptr(c) as usize),
            Data::Map(map) => map.as_ref().map(MapRef::addr),
            Data::Func(func) => func.as_ref().map(HostFunc::addr),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Scalars
    // ------------------------------------------------------------------------

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match &*self.read() {
            Data::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload of signed kinds
    pub fn as_int(&self) -> Option<i64> {
        match &*self.read() {
            Data::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer payload of unsigned kinds
    pub fn as_uint(&self) -> Option<u64> {
        match &*self.read() {
            Data::Uint(u) => Some(*u),
            _ => None,
        }
    }

    /// Numeric payload widened to `f64`
    pub fn as_float(&self) -> Option<f64> {
        match &*self.read() {
            Data::Float(x) => Some(*x),
            Data::Int(i) => Some(*i as f64),
            Data::Uint(u) => Some(*u as f64),
            _ => None,
        }
    }

    /// String payload
    pub fn as_string(&self) -> Option<String> {
        match &*self.read() {
            Data::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------------

    /// Store `value` into this location
    pub fn set(&self, value: &HostValue) -> ReflectResult<()> {
        if !self.can_set() {
            return Err(ReflectError::NotSettable(self.ty.to_string()));
        }
        let data = assignment_data(&self.ty, value)?;
        self.slot.assign(data);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Pointers and interfaces
    // ------------------------------------------------------------------------

    /// Pointed-to location, or the dynamic value of an interface
    pub fn elem(&self) -> ReflectResult<HostValue> {
        match self.ty.shape() {
            Shape::Pointer(elem) => match &*self.read() {
                Data::Pointer(Some(target)) => Ok(HostValue {
                    ty: elem.clone(),
                    slot: target.clone(),
                    flags: Flags {
                        addressable: true,
                        read_only: self.flags.read_only,
                    },
                }),
                Data::Pointer(None) => Err(ReflectError::NilPointer),
                _ => Err(ReflectError::DataMismatch(self.ty.to_string())),
            },
            Shape::Interface => match &*self.read() {
                Data::Interface(Some(inner)) => Ok((**inner).clone()),
                Data::Interface(None) => Err(ReflectError::NilValue(Kind::Interface)),
                _ => Err(ReflectError::DataMismatch(self.ty.to_string())),
            },
            _ => Err(wrong_kind("elem", &self.ty)),
        }
    }

    /// Follow one pointer, or return the value itself
    pub fn indirect(&self) -> ReflectResult<HostValue> {
        if self.kind() == Kind::Pointer {
            self.elem()
        } else {
            Ok(self.clone())
        }
    }

    // ------------------------------------------------------------------------
    // Structs
    // ------------------------------------------------------------------------

    /// Field `index` of a struct
    pub fn field(&self, index: usize) -> ReflectResult<HostValue> {
        let fields = match self.ty.shape() {
            Shape::Struct(fields) => fields,
            _ => return Err(wrong_kind("field", &self.ty)),
        };
        let def = fields.get(index).ok_or(ReflectError::OutOfRange {
            index,
            len: fields.len(),
        })?;
        let slot = match &*self.read() {
            Data::Struct(slots) => slots.get(index).cloned(),
            _ => None,
        }
        .ok_or_else(|| ReflectError::DataMismatch(self.ty.to_string()))?;
        Ok(HostValue {
            ty: def.ty.clone(),
            slot,
            flags: Flags {
                addressable: self.flags.addressable,
                read_only: self.flags.read_only || !def.exported,
            },
        })
    }

    /// Field reached by a path of field indices, following the root pointer
    /// and any embedded pointers along the way
    pub fn field_by_path(&self, path: &[usize]) -> ReflectResult<HostValue> {
        let mut current = self.indirect()?;
        for (depth, &index) in path.iter().enumerate() {
            if depth > 0 {
                current = current.indirect()?;
            }
            current = current.field(index)?;
        }
        Ok(current)
    }

    // ------------------------------------------------------------------------
    // Sequences
    // ------------------------------------------------------------------------

    /// Length of slices, arrays, maps, strings and channel buffers
    pub fn len(&self) -> ReflectResult<usize> {
        match &*self.read() {
            Data::Slice(slice) => Ok(slice.as_ref().map_or(0, |s| s.len)),
            Data::Array(slots) => Ok(slots.len()),
            Data::Map(map) => Ok(map.as_ref().map_or(0, |m| m.0.read().len())),
            Data::String(s) => Ok(s.len()),
            Data::Chan(chan) => Ok(chan.as_ref().map_or(0, |c| c.len())),
            _ => Err(wrong_kind("len", &self.ty)),
        }
    }

    /// Whether `len` is zero
    pub fn is_empty(&self) -> ReflectResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Capacity of slices, arrays and channels
    pub fn cap(&self) -> ReflectResult<usize> {
        match &*self.read() {
            Data::Slice(slice) => Ok(slice.as_ref().map_or(0, |s| s.cap)),
            Data::Array(slots) => Ok(slots.len()),
            Data::Chan(chan) => Ok(chan.as_ref().map_or(0, |c| c.capacity())),
            _ => Err(wrong_kind("cap", &self.ty)),
        }
    }

    /// Element `index` of a slice or array
    pub fn index(&self, index: usize) -> ReflectResult<HostValue> {
        let elem_ty = match self.ty.shape() {
            Shape::Slice(elem) | Shape::Array(elem, _) => elem.clone(),
            _ => return Err(wrong_kind("index", &self.ty)),
        };
        let (slot, addressable) = match &*self.read() {
            Data::Slice(slice) => {
                let len = slice.as_ref().map_or(0, |s| s.len);
                let slot = slice
                    .as_ref()
                    .and_then(|s| s.element(index))
                    .ok_or(ReflectError::OutOfRange { index, len })?;
                (slot, true)
            }
            Data::Array(slots) => {
                let slot = slots.get(index).cloned().ok_or(ReflectError::OutOfRange {
                    index,
                    len: slots.len(),
                })?;
                (slot, self.flags.addressable)
            }
            _ => return Err(ReflectError::DataMismatch(self.ty.to_string())),
        };
        Ok(HostValue {
            ty: elem_ty,
            slot,
            flags: Flags {
                addressable,
                read_only: self.flags.read_only,
            },
        })
    }

    /// `append(s, values...)`
    ///
    /// Writes in place when the backing array has room; otherwise copies into
    /// a new backing array with at least double the capacity.
    pub fn append(&self, values: &[HostValue]) -> ReflectResult<HostValue> {
        let elem = match self.ty.shape() {
            Shape::Slice(elem) => elem,
            _ => return Err(wrong_kind("append", &self.ty)),
        };
        let mut incoming = Vec::with_capacity(values.len());
        for value in values {
            incoming.push(assignment_data(elem, value)?);
        }
        let current = match &*self.read() {
            Data::Slice(slice) => slice.clone(),
            _ => return Err(ReflectError::DataMismatch(self.ty.to_string())),
        };
        let (len, cap) = current.as_ref().map_or((0, 0), |s| (s.len, s.cap));
        let needed = len + incoming.len();

        if let Some(slice) = current.as_ref().filter(|s| needed <= s.cap) {
            let backing = slice.backing.read();
            for (i, data) in incoming.into_iter().enumerate() {
                backing[slice.offset + len + i].assign(data);
            }
            return Ok(Self::new(
                self.ty.clone(),
                Data::Slice(Some(SliceData {
                    backing: slice.backing.clone(),
                    offset: slice.offset,
                    len: needed,
                    cap: slice.cap,
                })),
            ));
        }

        let new_cap = needed.max(cap * 2);
        let mut slots = Vec::with_capacity(new_cap);
        if let Some(slice) = &current {
            let backing = slice.backing.read();
            slots.extend(copy_slots(&backing[slice.offset..slice.offset + len]));
        }
        slots.extend(incoming.into_iter().map(Slot::new));
        while slots.len() < new_cap {
            slots.push(Slot::new(Data::zero(elem)));
        }
        Ok(Self::new(
            self.ty.clone(),
            Data::Slice(Some(SliceData {
                backing: Arc::new(RwLock::new(slots)),
                offset: 0,
                len: needed,
                cap: new_cap,
            })),
        ))
    }

    // ------------------------------------------------------------------------
    // Maps
    // ------------------------------------------------------------------------

    fn map_parts(&self) -> ReflectResult<(&HostType, &HostType, Option<MapRef>)> {
        let (key_ty, elem_ty) = match self.ty.shape() {
            Shape::Map(key, elem) => (key, elem),
            _ => return Err(wrong_kind("map access", &self.ty)),
        };
        let map = match &*self.read() {
            Data::Map(map) => map.clone(),
            _ => return Err(ReflectError::DataMismatch(self.ty.to_string())),
        };
        Ok((key_ty, elem_ty, map))
    }

    fn map_key(key_ty: &HostType, key: &HostValue) -> ReflectResult<(MapKey, Data)> {
        let data = assignment_data(key_ty, key)?;
        Ok((MapKey::from_data(key_ty, &data)?, data))
    }

    /// Value stored under `key`, if any
    pub fn map_get(&self, key: &HostValue) -> ReflectResult<Option<HostValue>> {
        let (key_ty, elem_ty, map) = self.map_parts()?;
        let (hash_key, _) = Self::map_key(key_ty, key)?;
        let Some(map) = map else {
            return Ok(None);
        };
        let found = map.0.read().get(&hash_key).map(|entry| entry.value.clone());
        Ok(found.map(|data| Self::new(elem_ty.clone(), data)))
    }

    /// Store `value` under `key`
    pub fn map_insert(&self, key: &HostValue, value: &HostValue) -> ReflectResult<()> {
        let (key_ty, elem_ty, map) = self.map_parts()?;
        let map = map.ok_or(ReflectError::NilValue(Kind::Map))?;
        let (hash_key, key_data) = Self::map_key(key_ty, key)?;
        let value = assignment_data(elem_ty, value)?;
        map.0.write().insert(
            hash_key,
            MapEntry {
                key: key_data,
                value,
            },
        );
        Ok(())
    }

    /// Remove `key`; removing from a nil map is a no-op
    pub fn map_remove(&self, key: &HostValue) -> ReflectResult<()> {
        let (key_ty, _, map) = self.map_parts()?;
        let (hash_key, _) = Self::map_key(key_ty, key)?;
        if let Some(map) = map {
            map.0.write().remove(&hash_key);
        }
        Ok(())
    }

    /// All entries as `(key, value)` pairs, in no particular order
    pub fn map_entries(&self) -> ReflectResult<Vec<(HostValue, HostValue)>> {
        let (key_ty, elem_ty, map) = self.map_parts()?;
        let Some(map) = map else {
            return Ok(Vec::new());
        };
        let entries = map
            .0
            .read()
            .values()
            .map(|entry| {
                (
                    Self::new(key_ty.clone(), entry.key.clone()),
                    Self::new(elem_ty.clone(), entry.value.clone()),
                )
            })
            .collect();
        Ok(entries)
    }

    // ------------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------------

    fn channel(&self) -> ReflectResult<(&HostType, Arc<Channel>)> {
        let elem = match self.ty.shape() {
            Shape::Chan(elem) => elem,
            _ => return Err(wrong_kind("channel operation", &self.ty)),
        };
        match &*self.read() {
            Data::Chan(Some(chan)) => Ok((elem, chan.clone())),
            Data::Chan(None) => Err(ReflectError::NilValue(Kind::Chan)),
            _ => Err(ReflectError::DataMismatch(self.ty.to_string())),
        }
    }

    /// Blocking send
    pub fn send(&self, value: &HostValue) -> ReflectResult<()> {
        let (elem, chan) = self.channel()?;
        let data = assignment_data(elem, value)?;
        chan.send(data)
    }

    /// Blocking receive; `None` once the channel is closed and drained
    pub fn recv(&self) -> ReflectResult<Option<HostValue>> {
        let (elem, chan) = self.channel()?;
        Ok(chan.receive().map(|data| Self::new(elem.clone(), data)))
    }

    /// Close the channel
    pub fn close(&self) -> ReflectResult<()> {
        let (_, chan) = self.channel()?;
        chan.close()
    }

    // ------------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------------

    /// Underlying function of a func value
    pub fn func(&self) -> ReflectResult<HostFunc> {
        match &*self.read() {
            Data::Func(Some(func)) => Ok(func.clone()),
            Data::Func(None) => Err(ReflectError::NilValue(Kind::Func)),
            _ => Err(wrong_kind("call", &self.ty)),
        }
    }

    /// Call a func value
    pub fn call(&self, args: &[HostValue]) -> ReflectResult<Vec<HostValue>> {
        self.func()?.call(args)
    }

    // ------------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------------

    /// Same location for pointers, same storage for maps, channels,
    /// functions and slices; same type required
    pub fn same_reference(&self, other: &HostValue) -> bool {
        if self.ty != other.ty {
            return false;
        }
        if self.kind() == Kind::Slice {
            return data_eq(&self.data(), &other.data());
        }
        self.pointer() == other.pointer()
    }

    /// Deep comparison: same type and equal contents, with references
    /// compared by identity
    pub fn structural_eq(&self, other: &HostValue) -> bool {
        self.ty == other.ty && data_eq(&self.data(), &other.data())
    }
}

fn data_eq(a: &Data, b: &Data) -> bool {
    match (a, b) {
        (Data::Bool(x), Data::Bool(y)) => x == y,
        (Data::Int(x), Data::Int(y)) => x == y,
        (Data::Uint(x), Data::Uint(y)) => x == y,
        (Data::Float(x), Data::Float(y)) => x == y,
        (Data::String(x), Data::String(y)) => x == y,
        (Data::Struct(xs), Data::Struct(ys)) | (Data::Array(xs), Data::Array(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| data_eq(&x.load(), &y.load()))
        }
        (Data::Pointer(x), Data::Pointer(y)) => match (x, y) {
            (Some(x), Some(y)) => x.same(y),
            (None, None) => true,
            _ => false,
        },
        (Data::Slice(x), Data::Slice(y)) => match (x, y) {
            (Some(x), Some(y)) => x.same_window(y),
            (None, None) => true,
            _ => false,
        },
        (Data::Map(x), Data::Map(y)) => match (x, y) {
            (Some(x), Some(y)) => x.same(y),
            (None, None) => true,
            _ => false,
        },
        (Data::Chan(x), Data::Chan(y)) => match (x, y) {
            (Some(x), Some(y)) => Arc::ptr_eq(x, y),
            (None, None) => true,
            _ => false,
        },
        (Data::Func(x), Data::Func(y)) => match (x, y) {
            (Some(x), Some(y)) => x.addr() == y.addr(),
            (None, None) => true,
            _ => false,
        },
        (Data::Interface(x), Data::Interface(y)) => match (x, y) {
            (Some(x), Some(y)) => x.structural_eq(y),
            (None, None) => true,
            _ => false,
        },
        _ => false,
    }
}

/// Data to store into a location of type `target`, boxing into an
/// interface when the target is one
fn assignment_data(target: &HostType, value: &HostValue) -> ReflectResult<Data> {
    if !value.ty.assignable_to(target) {
        return Err(ReflectError::NotAssignable {
            from: value.ty.to_string(),
            to: target.to_string(),
        });
    }
    if target.kind() == Kind::Interface && value.kind() != Kind::Interface {
        return Ok(Data::Interface(Some(Box::new(value.detached()))));
    }
    Ok(value.data())
}

fn wrong_kind(op: &'static str, ty: &HostType) -> ReflectError {
    ReflectError::WrongKind {
        op,
        kind: ty.kind(),
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostValue")
            .field("ty", &self.ty)
            .field("value", &format_args!("{}", self))
            .field("addressable", &self.flags.addressable)
            .finish()
    }
}

// ============================================================================
// Conversions from Rust scalars
// ============================================================================

macro_rules! impl_from_scalar {
    ($($rust:ty => $kind:ident as $variant:ident($conv:ty)),* $(,)?) => {
        $(
            impl From<$rust> for HostValue {
                fn from(value: $rust) -> Self {
                    HostValue::new(HostType::scalar(Kind::$kind), Data::$variant(value as $conv))
                }
            }
        )*
    };
}

impl_from_scalar! {
    i8 => Int8 as Int(i64),
    i16 => Int16 as Int(i64),
    i32 => Int32 as Int(i64),
    i64 => Int64 as Int(i64),
    isize => Int as Int(i64),
    u8 => Uint8 as Uint(u64),
    u16 => Uint16 as Uint(u64),
    u32 => Uint32 as Uint(u64),
    u64 => Uint64 as Uint(u64),
    usize => Uint as Uint(u64),
    f32 => Float32 as Float(f64),
    f64 => Float64 as Float(f64),
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::new(HostType::bool(), Data::Bool(value))
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::new(HostType::string(), Data::String(value.to_string()))
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::new(HostType::string(), Data::String(value))
    }
}
