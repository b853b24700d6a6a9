use super::{invalid, Options};
use crate::{schema::BuiltinType, stmt::Value, Result};

use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

pub(super) fn to_bool(value: Value, ty: &BuiltinType) -> Result<bool> {
    match value {
        Value::Bool(v) => Ok(v),
        Value::I32(v @ (0 | 1)) => Ok(v == 1),
        Value::I64(v @ (0 | 1)) => Ok(v == 1),
        Value::String(ref s) => match s.as_str() {
            "true" | "TRUE" | "1" => Ok(true),
            "false" | "FALSE" | "0" => Ok(false),
            _ => Err(invalid(&value, ty)),
        },
        value => Err(invalid(&value, ty)),
    }
}

pub(super) fn to_int(value: Value, ty: &BuiltinType) -> Result<i64> {
    let v = match &value {
        Value::I32(v) => *v as i64,
        Value::I64(v) => *v,
        Value::F64(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => *v as i64,
        Value::Decimal(v) if v.fract().is_zero() => v.to_i64().ok_or_else(|| invalid(&value, ty))?,
        Value::String(s) => s.trim().parse().map_err(|_| invalid(&value, ty))?,
        _ => return Err(invalid(&value, ty)),
    };

    let (min, max) = match ty {
        BuiltinType::UInt8 => (0, u8::MAX as i64),
        BuiltinType::Int16 => (i16::MIN as i64, i16::MAX as i64),
        BuiltinType::Int32 => (i32::MIN as i64, i32::MAX as i64),
        _ => (i64::MIN, i64::MAX),
    };

    if v < min || v > max {
        return Err(invalid(&value, ty));
    }

    Ok(v)
}

pub(super) fn to_f64(value: Value, ty: &BuiltinType) -> Result<f64> {
    match &value {
        Value::F64(v) => Ok(*v),
        Value::I32(v) => Ok(*v as f64),
        Value::I64(v) => Ok(*v as f64),
        Value::Decimal(v) => v.to_f64().ok_or_else(|| invalid(&value, ty)),
        Value::String(s) => s.trim().parse().map_err(|_| invalid(&value, ty)),
        _ => Err(invalid(&value, ty)),
    }
}

pub(super) fn to_string(value: Value, ty: &BuiltinType) -> Result<String> {
    match value {
        Value::String(v) => Ok(v),
        Value::Uuid(v) => Ok(v.to_string()),
        value => Err(invalid(&value, ty)),
    }
}

pub(super) fn to_uuid(value: Value, ty: &BuiltinType) -> Result<Uuid> {
    match &value {
        Value::Uuid(v) => Ok(*v),
        Value::String(s) => Uuid::parse_str(s).map_err(|_| invalid(&value, ty)),
        _ => Err(invalid(&value, ty)),
    }
}

// Codecs shared by every dialect table.

pub(super) fn bool_native(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_bool(value, ty).map(Value::Bool)
}

pub(super) fn bool_as_int(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_bool(value, ty).map(|v| Value::I64(v as i64))
}

/// Integers are bound as `I32` up to `Int32`, `I64` above.
pub(super) fn int_native(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    let v = to_int(value, ty)?;
    Ok(match ty {
        BuiltinType::Int64 => Value::I64(v),
        _ => Value::I32(v as i32),
    })
}

pub(super) fn int_as_i64(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_int(value, ty).map(Value::I64)
}

pub(super) fn double(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_f64(value, ty).map(Value::F64)
}

pub(super) fn string(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_string(value, ty).map(Value::String)
}

pub(super) fn uuid_as_text(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_uuid(value, ty).map(|v| Value::String(v.to_string()))
}

pub(super) fn uuid_from_any(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_uuid(value, ty).map(Value::Uuid)
}

pub(super) fn int_from_any(value: Value, ty: &BuiltinType, options: &Options) -> Result<Value> {
    int_native(value, ty, options)
}
