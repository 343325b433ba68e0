//! Default formatting of host values
//!
//! Follows the conventions of a `%v` verb: structs print as `{a b}`,
//! sequences as `[a b]`, maps as `map[k:v]` with sorted keys, and a
//! top-level pointer to a composite as `&{...}`. Nested pointers, channels
//! and functions print as addresses; nil references print as `<nil>`.

use std::fmt::{self, Write};
use std::sync::Arc;

use crate::ty::{HostType, Shape};
use crate::value::{Data, HostValue, Slot};

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_data(f, self.ty(), &self.data(), 0)
    }
}

fn write_float(f: &mut dyn Write, x: f64) -> fmt::Result {
    if x.is_nan() {
        f.write_str("NaN")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "+Inf" } else { "-Inf" })
    } else if x.fract() == 0.0 && x.abs() < 1e21 {
        write!(f, "{}", x as i128)
    } else if x.abs() >= 1e21 || x.abs() < 1e-4 {
        write!(f, "{:e}", x)
    } else {
        write!(f, "{}", x)
    }
}

fn write_slots(
    f: &mut dyn Write,
    types: &mut dyn Iterator<Item = HostType>,
    slots: &[Slot],
    depth: usize,
) -> fmt::Result {
    for (i, (slot, ty)) in slots.iter().zip(types).enumerate() {
        if i > 0 {
            f.write_char(' ')?;
        }
        write_data(f, &ty, &slot.load(), depth + 1)?;
    }
    Ok(())
}

fn write_data(f: &mut dyn Write, ty: &HostType, data: &Data, depth: usize) -> fmt::Result {
    match data {
        Data::Bool(b) => write!(f, "{}", b),
        Data::Int(i) => write!(f, "{}", i),
        Data::Uint(u) => write!(f, "{}", u),
        Data::Float(x) => write_float(f, *x),
        Data::String(s) => f.write_str(s),
        Data::Struct(slots) => {
            f.write_char('{')?;
            let mut types = ty.fields().iter().map(|field| field.ty.clone());
            write_slots(f, &mut types, slots, depth)?;
            f.write_char('}')
        }
        Data::Array(slots) => {
            let elem = ty.elem().cloned().unwrap_or_else(HostType::any);
            f.write_char('[')?;
            write_slots(f, &mut std::iter::repeat(elem), slots, depth)?;
            f.write_char(']')
        }
        Data::Slice(_) => {
            let value = HostValue::new(ty.clone(), data.clone());
            let elem = ty.elem().cloned().unwrap_or_else(HostType::any);
            let len = value.len().unwrap_or(0);
            f.write_char('[')?;
            for i in 0..len {
                if i > 0 {
                    f.write_char(' ')?;
                }
                match value.index(i) {
                    Ok(item) => write_data(f, &elem, &item.data(), depth + 1)?,
                    Err(_) => break,
                }
            }
            f.write_char(']')
        }
        Data::Map(map) => {
            let value = HostValue::new(ty.clone(), Data::Map(map.clone()));
            let mut entries = Vec::new();
            for (key, item) in value.map_entries().unwrap_or_default() {
                let mut k = String::new();
                let mut v = String::new();
                write_data(&mut k, key.ty(), &key.data(), depth + 1)?;
                write_data(&mut v, item.ty(), &item.data(), depth + 1)?;
                entries.push((k, v));
            }
            entries.sort();
            f.write_str("map[")?;
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_char(' ')?;
                }
                write!(f, "{}:{}", k, v)?;
            }
            f.write_char(']')
        }
        Data::Pointer(None)
        | Data::Chan(None)
        | Data::Func(None)
        | Data::Interface(None) => f.write_str("<nil>"),
        Data::Pointer(Some(target)) => {
            let elem = ty.elem().cloned().unwrap_or_else(HostType::any);
            let composite = matches!(
                elem.shape(),
                Shape::Struct(_) | Shape::Array(..) | Shape::Slice(_) | Shape::Map(..)
            );
            if depth == 0 && composite {
                f.write_char('&')?;
                write_data(f, &elem, &target.load(), depth + 1)
            } else {
                write!(f, "{:#x}", target.addr())
            }
        }
        Data::Chan(Some(chan)) => write!(f, "{:#x}", Arc::as_ptr(chan) as usize),
        Data::Func(Some(func)) => write!(f, "{:#x}", func.addr()),
        Data::Interface(Some(inner)) => write_data(f, inner.ty(), &inner.data(), depth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::{Field, MethodSets};

    fn person_type() -> HostType {
        let person = HostType::declare("Person");
        person
            .define(
                Shape::Struct(vec![
                    Field::new("Name", HostType::string()),
                    Field::new("Friend", HostType::pointer_to(&person)),
                ]),
                MethodSets::new(),
            )
            .unwrap();
        person
    }

    #[test]
    fn test_struct_and_pointer_formatting() {
        let person = person_type();
        let ptr = HostValue::alloc(&person);
        ptr.elem()
            .unwrap()
            .field(0)
            .unwrap()
            .set(&HostValue::from("Tim"))
            .unwrap();
        assert_eq!(ptr.elem().unwrap().to_string(), "{Tim <nil>}");
        assert_eq!(ptr.to_string(), "&{Tim <nil>}");

        let other = HostValue::alloc(&person);
        other.elem().unwrap().field(1).unwrap().set(&ptr).unwrap();
        let text = other.to_string();
        assert!(text.starts_with("&{ 0x"), "{}", text);
    }

    #[test]
    fn test_sequence_and_map_formatting() {
        let ints = HostType::slice_of(&HostType::int64());
        let slice = HostValue::make_slice(&ints, 0, 0)
            .unwrap()
            .append(&[HostValue::from(1i64), HostValue::from(2i64)])
            .unwrap();
        assert_eq!(slice.to_string(), "[1 2]");
        assert_eq!(HostValue::zero(&ints).to_string(), "[]");

        let ty = HostType::map_of(&HostType::string(), &HostType::int64());
        let map = HostValue::make_map(&ty).unwrap();
        map.map_insert(&HostValue::from("b"), &HostValue::from(2i64))
            .unwrap();
        map.map_insert(&HostValue::from("a"), &HostValue::from(1i64))
            .unwrap();
        assert_eq!(map.to_string(), "map[a:1 b:2]");
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(HostValue::from(3.0f64).to_string(), "3");
        assert_eq!(HostValue::from(1.5f64).to_string(), "1.5");
    }

    #[test]
    fn test_nested_pointer_prints_address() {
        let ptr = HostValue::alloc(&HostType::int());
        assert!(ptr.to_string().starts_with("0x"));
    }
}
