use super::{invalid, Options};
use crate::{schema::BuiltinType, stmt::Value, Error, Result};

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses any numeric value into a decimal without validation.
fn parse(value: &Value, ty: &BuiltinType) -> Result<Decimal> {
    match value {
        Value::Decimal(v) => Ok(*v),
        Value::I32(v) => Ok(Decimal::from(*v)),
        Value::I64(v) => Ok(Decimal::from(*v)),
        // Shortest round-trip text keeps `12.3` from turning into `12.2999..`
        Value::F64(v) if v.is_finite() => {
            Decimal::from_str(&v.to_string()).map_err(|_| invalid(value, ty))
        }
        Value::String(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map_err(|_| invalid(value, ty)),
        _ => Err(invalid(value, ty)),
    }
}

/// Validates a decimal against the declared precision and scale and returns
/// it rescaled to the declared scale. Values with more digits than declared
/// are rejected, never rounded.
pub(super) fn validate(value: Value, ty: &BuiltinType) -> Result<Decimal> {
    let decimal = parse(&value, ty)?;

    let BuiltinType::Decimal { precision, scale } = ty else {
        return Ok(decimal);
    };

    let Some(precision) = *precision else {
        return Ok(decimal.normalize());
    };

    let scale = scale.unwrap_or(0);
    let normalized = decimal.normalize();

    let integer_digits = {
        let integer = normalized.abs().trunc();
        if integer.is_zero() {
            0
        } else {
            integer.to_string().len() as u32
        }
    };

    if normalized.scale() > scale || integer_digits > precision.saturating_sub(scale) {
        return Err(Error::invalid_decimal(
            decimal.to_string(),
            precision,
            scale,
        ));
    }

    let mut rescaled = normalized;
    rescaled.rescale(scale);
    Ok(rescaled)
}

/// Converts a stored value back to a decimal carrying the declared scale.
fn read(value: Value, ty: &BuiltinType) -> Result<Decimal> {
    let mut decimal = parse(&value, ty)?;

    if let BuiltinType::Decimal { precision, scale } = ty {
        match (precision, scale) {
            (_, Some(scale)) => decimal.rescale(*scale),
            (Some(_), None) => decimal.rescale(0),
            (None, None) => {}
        }
    }

    Ok(decimal)
}

pub(super) fn decimal_native(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    validate(value, ty).map(Value::Decimal)
}

pub(super) fn decimal_as_text(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    validate(value, ty).map(|v| Value::String(v.to_string()))
}

pub(super) fn decimal_from_any(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    read(value, ty).map(Value::Decimal)
}
