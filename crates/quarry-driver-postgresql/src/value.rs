use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres_types::{to_sql_checked, IsNull, ToSql, Type};
use quarry_core::stmt::Value as CoreValue;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use tokio_postgres::{types::private::BytesMut, Row};

type BoxError = Box<dyn std::error::Error + Sync + Send>;

#[derive(Debug)]
pub struct Value(CoreValue);

impl From<CoreValue> for Value {
    fn from(value: CoreValue) -> Self {
        Self(value)
    }
}

impl Value {
    pub fn into_inner(self) -> CoreValue {
        self.0
    }

    /// Reads one column of a row in the form closest to its PostgreSQL type.
    pub fn from_sql(row: &Row, index: usize) -> Result<Self, tokio_postgres::Error> {
        let ty = row.columns()[index].type_().clone();

        let value = match ty {
            Type::BOOL => row.try_get::<_, Option<bool>>(index)?.map(CoreValue::Bool),
            Type::INT2 => row
                .try_get::<_, Option<i16>>(index)?
                .map(|v| CoreValue::I32(v as i32)),
            Type::INT4 => row.try_get::<_, Option<i32>>(index)?.map(CoreValue::I32),
            Type::INT8 => row.try_get::<_, Option<i64>>(index)?.map(CoreValue::I64),
            Type::FLOAT4 => row
                .try_get::<_, Option<f32>>(index)?
                .map(|v| CoreValue::F64(v as f64)),
            Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.map(CoreValue::F64),
            Type::NUMERIC => row.try_get::<_, Option<Decimal>>(index)?.map(CoreValue::Decimal),
            Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(index)?.map(CoreValue::Bytes),
            Type::DATE => row.try_get::<_, Option<NaiveDate>>(index)?.map(CoreValue::Date),
            Type::TIME => row.try_get::<_, Option<NaiveTime>>(index)?.map(CoreValue::Time),
            Type::TIMESTAMP => row
                .try_get::<_, Option<NaiveDateTime>>(index)?
                .map(CoreValue::Timestamp),
            Type::TIMESTAMPTZ => row
                .try_get::<_, Option<DateTime<Utc>>>(index)?
                .map(|v| CoreValue::Timestamp(v.naive_utc())),
            Type::UUID => row.try_get::<_, Option<uuid::Uuid>>(index)?.map(CoreValue::Uuid),
            // Expands arrive as JSON documents and are parsed above the driver
            Type::JSON | Type::JSONB => row
                .try_get::<_, Option<serde_json::Value>>(index)?
                .map(|v| CoreValue::String(v.to_string())),
            _ => row.try_get::<_, Option<String>>(index)?.map(CoreValue::String),
        };

        Ok(Value(value.unwrap_or_default()))
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match &self.0 {
            CoreValue::Null => Ok(IsNull::Yes),
            CoreValue::Bool(value) => value.to_sql(ty, out),
            CoreValue::I32(value) => int_to_sql(*value as i64, ty, out),
            CoreValue::I64(value) => int_to_sql(*value, ty, out),
            CoreValue::F64(value) => match *ty {
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*value)?.to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            CoreValue::Decimal(value) => match *ty {
                Type::FLOAT4 | Type::FLOAT8 => value
                    .to_f64()
                    .ok_or_else(|| format!("decimal {value} does not fit a float"))?
                    .to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            CoreValue::String(value) => match *ty {
                Type::UUID => uuid::Uuid::parse_str(value)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(value)?.to_sql(ty, out),
                _ => value.as_str().to_sql(ty, out),
            },
            CoreValue::Bytes(value) => value.to_sql(ty, out),
            CoreValue::Date(value) => value.to_sql(ty, out),
            CoreValue::Time(value) => value.to_sql(ty, out),
            CoreValue::Timestamp(value) => match *ty {
                Type::TIMESTAMPTZ => value.and_utc().to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            CoreValue::Uuid(value) => match *ty {
                Type::UUID => value.to_sql(ty, out),
                _ => value.to_string().to_sql(ty, out),
            },
            value => Err(format!("cannot bind a {} to a PostgreSQL parameter", value.kind()).into()),
        }
    }

    // Conversions are picked per target type in `to_sql`
    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Binds an integer to whatever numeric column it was compared with or
/// stored into, failing when it does not fit.
fn int_to_sql(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(value).to_sql(ty, out),
        Type::BOOL => (value != 0).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => value.to_string().to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}
