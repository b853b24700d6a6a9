use super::{binary::binary, decimal::*, scalar::*, temporal::*, Codec, TypeTable};
use crate::{schema::BuiltinType, Dialect};

/// SQLite has no native boolean, decimal, UUID or temporal storage. Booleans
/// are integers. Decimals are text in a TEXT column, so no digit passes
/// through a double. Temporal values are ISO 8601 text.
#[derive(Debug, Clone, Copy)]
pub struct SqliteTypes;

impl TypeTable for SqliteTypes {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn codec(&self, ty: &BuiltinType) -> Codec {
        use BuiltinType::*;

        match ty {
            Boolean => Codec::new(bool_as_int, bool_native),
            UInt8 | Int16 | Int32 | Int64 => Codec::new(int_as_i64, int_from_any),
            Double => Codec::new(double, double),
            Decimal { .. } => Codec::new(decimal_as_text, decimal_from_any),
            String { .. } | LargeString => Codec::new(string, string),
            Binary { .. } | LargeBinary => Codec::new(binary, binary),
            Uuid => Codec::new(uuid_as_text, uuid_from_any),
            Date => Codec::new(date_as_text, date_from_any),
            Time => Codec::new(time_as_text, time_from_any),
            DateTime => Codec::new(datetime_as_iso, timestamp_from_any),
            Timestamp { .. } => Codec::new(timestamp_as_iso, timestamp_from_any),
        }
    }
}
