//! Value Converter
//!
//! Maps a dynamic script value onto a statically typed host value. The
//! reverse direction is [`crate::make_proxy`].

use rivet_sdk::ScriptValue;
use rivet_types::{Data, HostType, HostValue, Kind};

use crate::error::{BridgeError, BridgeResult};

/// Convert a script value to a host value of type `target`
///
/// Proxy payloads are copied out, so the result never aliases the proxy's
/// location unless the value is itself a reference.
pub fn to_host(value: &ScriptValue, target: &HostType) -> BridgeResult<HostValue> {
    let kind = target.kind();
    match value {
        ScriptValue::Nil if kind.is_nillable() => Ok(HostValue::zero(target)),
        ScriptValue::Bool(b) => match kind {
            Kind::Bool => Ok(HostValue::new(target.clone(), Data::Bool(*b))),
            Kind::Interface => Ok(HostValue::from(*b).into_interface()),
            _ => Err(mismatch(value, target)),
        },
        ScriptValue::Number(n) => match kind {
            _ if kind.is_numeric() => Ok(HostValue::new(target.clone(), numeric(kind, *n))),
            Kind::Interface => Ok(HostValue::from(*n).into_interface()),
            _ => Err(mismatch(value, target)),
        },
        ScriptValue::String(s) => match kind {
            Kind::String => Ok(HostValue::new(target.clone(), Data::String(s.to_string()))),
            _ if kind.is_numeric() => match s.trim().parse::<f64>() {
                Ok(n) => Ok(HostValue::new(target.clone(), numeric(kind, n))),
                Err(_) => Err(mismatch(value, target)),
            },
            Kind::Interface => Ok(HostValue::from(s.as_ref()).into_interface()),
            _ => Err(mismatch(value, target)),
        },
        ScriptValue::UserData(ud) => match ud.downcast_ref::<HostValue>() {
            Some(payload) => unwrap_proxy(payload, target),
            None => Err(BridgeError::Conversion {
                from: ud.type_label().to_string(),
                to: target.to_string(),
            }),
        },
        _ => Err(mismatch(value, target)),
    }
}

fn unwrap_proxy(payload: &HostValue, target: &HostType) -> BridgeResult<HostValue> {
    if payload.ty().assignable_to(target) {
        let value = payload.detached();
        return Ok(if target.kind() == Kind::Interface {
            value.into_interface()
        } else {
            value
        });
    }
    // receiver auto-dereference
    if payload.kind() == Kind::Pointer {
        if let Some(elem) = payload.ty().elem() {
            if elem.assignable_to(target) {
                return Ok(payload.elem()?.detached());
            }
        }
    }
    Err(BridgeError::Conversion {
        from: payload.ty().to_string(),
        to: target.to_string(),
    })
}

/// Numeric data for `kind`, wrapping integers to the kind's width and
/// truncating fractions toward zero
fn numeric(kind: Kind, n: f64) -> Data {
    let signed = n.trunc() as i128 as i64;
    match kind {
        Kind::Int8 => Data::Int(signed as i8 as i64),
        Kind::Int16 => Data::Int(signed as i16 as i64),
        Kind::Int32 => Data::Int(signed as i32 as i64),
        Kind::Int | Kind::Int64 => Data::Int(signed),
        Kind::Uint8 => Data::Uint(signed as u8 as u64),
        Kind::Uint16 => Data::Uint(signed as u16 as u64),
        Kind::Uint32 => Data::Uint(signed as u32 as u64),
        Kind::Uint | Kind::Uint64 => Data::Uint(if n >= 0.0 {
            n.trunc() as u64
        } else {
            signed as u64
        }),
        Kind::Float32 => Data::Float(n as f32 as f64),
        _ => Data::Float(n),
    }
}

fn mismatch(value: &ScriptValue, target: &HostType) -> BridgeError {
    BridgeError::Conversion {
        from: value.type_name().to_string(),
        to: target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rivet_sdk::{NativeFunction, TableRef, UserData};
    use rivet_types::Field;

    #[test]
    fn test_numbers_wrap_and_truncate() {
        let v = to_host(&ScriptValue::from(300.0), &HostType::uint8()).unwrap();
        assert_eq!(v.as_uint(), Some(44));
        let v = to_host(&ScriptValue::from(-2.7), &HostType::int32()).unwrap();
        assert_eq!(v.as_int(), Some(-2));
        let v = to_host(&ScriptValue::from(2.5), &HostType::float32()).unwrap();
        assert_eq!(v.as_float(), Some(2.5));
    }

    #[test]
    fn test_numeric_strings() {
        let v = to_host(&ScriptValue::from(" 42 "), &HostType::int64()).unwrap();
        assert_eq!(v.as_int(), Some(42));
        assert!(matches!(
            to_host(&ScriptValue::from("forty"), &HostType::int64()),
            Err(BridgeError::Conversion { .. })
        ));
    }

    #[test]
    fn test_nil_targets() {
        let ptr = HostType::pointer_to(&HostType::int());
        assert!(to_host(&ScriptValue::Nil, &ptr).unwrap().is_nil());
        assert_eq!(
            to_host(&ScriptValue::Nil, &HostType::string()).unwrap_err(),
            BridgeError::Conversion {
                from: "nil".to_string(),
                to: "string".to_string()
            }
        );
    }

    #[test]
    fn test_interface_targets_box_values() {
        let v = to_host(&ScriptValue::from("hi"), &HostType::any()).unwrap();
        assert_eq!(v.kind(), Kind::Interface);
        assert_eq!(v.elem().unwrap().as_string().as_deref(), Some("hi"));
        let v = to_host(&ScriptValue::from(1.5), &HostType::any()).unwrap();
        assert_eq!(v.elem().unwrap().ty(), &HostType::float64());
    }

    #[test]
    fn test_tables_and_functions_are_rejected() {
        let table = ScriptValue::from(TableRef::new());
        let func = ScriptValue::from(NativeFunction::new("f", |_, _| Ok(vec![])));
        let point = HostType::structure("Point", vec![Field::new("X", HostType::int())]);
        assert!(to_host(&table, &point).is_err());
        assert!(to_host(&func, &HostType::any()).is_err());
    }

    #[test]
    fn test_proxy_unwrap_and_auto_deref() {
        let point = HostType::structure("Point", vec![Field::new("X", HostType::int())]);
        let ptr = HostValue::alloc(&point);
        let ud = ScriptValue::UserData(Arc::new(UserData::new(ptr.clone(), None)));

        let same = to_host(&ud, ptr.ty()).unwrap();
        assert!(same.same_reference(&ptr));

        let copy = to_host(&ud, &point).unwrap();
        assert_eq!(copy.ty(), &point);
        assert!(!copy.can_set());

        let nil = ScriptValue::UserData(Arc::new(UserData::new(
            HostValue::zero(ptr.ty()),
            None,
        )));
        assert_eq!(
            to_host(&nil, &point).unwrap_err(),
            BridgeError::NilDereference
        );
        assert!(to_host(&ud, &HostType::int()).is_err());
    }

    #[test]
    fn test_type_proxy_is_rejected() {
        let ud = ScriptValue::UserData(Arc::new(UserData::new(HostType::int(), None)));
        assert!(matches!(
            to_host(&ud, &HostType::any()),
            Err(BridgeError::Conversion { .. })
        ));
    }
}
