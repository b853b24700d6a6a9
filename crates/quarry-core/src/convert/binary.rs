use super::{invalid, Options};
use crate::{schema::BuiltinType, stmt::Value, Result};

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Accepts raw bytes, base64 text, or a byte stream.
fn to_bytes(value: Value, ty: &BuiltinType) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(v) => Ok(v),
        Value::String(ref s) => STANDARD.decode(s.trim()).map_err(|_| invalid(&value, ty)),
        Value::Stream(stream) => stream.read_to_end(),
        value => Err(invalid(&value, ty)),
    }
}

/// Every supported dialect binds binary data as a byte array.
pub(super) fn binary(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_bytes(value, ty).map(Value::Bytes)
}
