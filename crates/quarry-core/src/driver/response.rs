use crate::{stmt::ValueStream, Result};

/// What a backend returns for one operation.
#[derive(Debug)]
pub struct Response {
    pub rows: Rows,
}

#[derive(Debug)]
pub enum Rows {
    /// Rows written or deleted
    Count(u64),

    /// Rows read. Each row is a `Value::List` of storage values in
    /// select-list order.
    Values(ValueStream),
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
        }
    }

    pub fn value_stream(values: impl Into<ValueStream>) -> Self {
        Self {
            rows: Rows::Values(values.into()),
        }
    }
}

impl Rows {
    /// Affected rows. A value stream is drained and its rows counted, which
    /// is what `RETURNING` statements report.
    pub async fn into_count(self) -> Result<u64> {
        match self {
            Rows::Count(count) => Ok(count),
            Rows::Values(values) => Ok(values.collect().await?.len() as u64),
        }
    }

    pub fn into_values(self) -> Result<ValueStream> {
        match self {
            Self::Values(values) => Ok(values),
            Self::Count(count) => crate::bail!("expected rows; got affected count {count}"),
        }
    }
}
