use super::{binary::binary, decimal::*, scalar::*, temporal::*, Codec, TypeTable};
use crate::{schema::BuiltinType, Dialect};

/// HANA binds decimals and temporal values as text in its canonical
/// formats. Timestamps carry seven fractional digits.
#[derive(Debug, Clone, Copy)]
pub struct HanaTypes;

impl TypeTable for HanaTypes {
    fn dialect(&self) -> Dialect {
        Dialect::Hana
    }

    fn codec(&self, ty: &BuiltinType) -> Codec {
        use BuiltinType::*;

        match ty {
            Boolean => Codec::new(bool_native, bool_native),
            UInt8 | Int16 | Int32 | Int64 => Codec::new(int_native, int_from_any),
            Double => Codec::new(double, double),
            Decimal { .. } => Codec::new(decimal_as_text, decimal_from_any),
            String { .. } | LargeString => Codec::new(string, string),
            Binary { .. } | LargeBinary => Codec::new(binary, binary),
            Uuid => Codec::new(uuid_as_text, uuid_from_any),
            Date => Codec::new(date_as_text, date_from_any),
            Time => Codec::new(time_as_text, time_from_any),
            DateTime => Codec::new(datetime_as_text, timestamp_from_any),
            Timestamp { .. } => Codec::new(timestamp_as_text, timestamp_from_any),
        }
    }
}
