use super::{binary::binary, decimal::*, scalar::*, temporal::*, Codec, TypeTable};
use crate::{schema::BuiltinType, Dialect};

/// PostgreSQL binds native values for every type except UUID, which is kept
/// as text so keys compare the same way on every dialect.
#[derive(Debug, Clone, Copy)]
pub struct PostgresqlTypes;

impl TypeTable for PostgresqlTypes {
    fn dialect(&self) -> Dialect {
        Dialect::Postgresql
    }

    fn codec(&self, ty: &BuiltinType) -> Codec {
        use BuiltinType::*;

        match ty {
            Boolean => Codec::new(bool_native, bool_native),
            UInt8 | Int16 | Int32 | Int64 => Codec::new(int_native, int_from_any),
            Double => Codec::new(double, double),
            Decimal { .. } => Codec::new(decimal_native, decimal_from_any),
            String { .. } | LargeString => Codec::new(string, string),
            Binary { .. } | LargeBinary => Codec::new(binary, binary),
            Uuid => Codec::new(uuid_as_text, uuid_from_any),
            Date => Codec::new(date_native, date_from_any),
            Time => Codec::new(time_native, time_from_any),
            DateTime => Codec::new(datetime_native, timestamp_from_any),
            Timestamp { .. } => Codec::new(timestamp_native, timestamp_from_any),
        }
    }
}
