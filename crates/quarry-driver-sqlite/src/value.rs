use quarry_core::stmt::Value as CoreValue;
use rusqlite::{
    types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef},
    Row,
};

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

    /// Reads one column of a row as stored. Typing happens above the driver.
    pub fn from_sql(row: &Row<'_>, index: usize) -> rusqlite::Result<Self> {
        let core_value = match row.get::<_, SqlValue>(index)? {
            SqlValue::Null => CoreValue::Null,
            SqlValue::Integer(value) => CoreValue::I64(value),
            SqlValue::Real(value) => CoreValue::F64(value),
            SqlValue::Text(value) => CoreValue::String(value),
            SqlValue::Blob(value) => CoreValue::Bytes(value),
        };

        Ok(Value(core_value))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use CoreValue::*;

        let output = match &self.0 {
            Null => ToSqlOutput::Owned(SqlValue::Null),
            Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(*v as i64)),
            I32(v) => ToSqlOutput::Owned(SqlValue::Integer(*v as i64)),
            I64(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            F64(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            String(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(&v[..])),
            Decimal(v) => ToSqlOutput::Owned(SqlValue::Text(v.to_string())),
            Uuid(v) => ToSqlOutput::Owned(SqlValue::Text(v.to_string())),
            Date(v) => ToSqlOutput::Owned(SqlValue::Text(v.format("%Y-%m-%d").to_string())),
            Time(v) => ToSqlOutput::Owned(SqlValue::Text(v.format("%H:%M:%S").to_string())),
            Timestamp(v) => ToSqlOutput::Owned(SqlValue::Text(v.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())),
            value => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    format!("cannot bind a {} to a SQLite parameter", value.kind()).into(),
                ))
            }
        };

        Ok(output)
    }
}
