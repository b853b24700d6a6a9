use super::Operation;
use crate::stmt::{LockWait, Value};

#[derive(Debug, Clone)]
pub struct QuerySql {
    /// SQL text with dialect placeholders
    pub sql: String,

    /// Storage values, one per placeholder
    pub params: Vec<Value>,

    /// When true, the statement produces rows (a query or `RETURNING`)
    pub ret: bool,

    /// Lock wait policy of a locking read. Drivers use it to tell a lock
    /// conflict from a lock timeout.
    pub lock: Option<LockWait>,
}

impl QuerySql {
    pub fn new(sql: impl Into<String>, params: Vec<Value>, ret: bool) -> QuerySql {
        QuerySql {
            sql: sql.into(),
            params,
            ret,
            lock: None,
        }
    }
}

impl From<QuerySql> for Operation {
    fn from(value: QuerySql) -> Self {
        Self::QuerySql(value)
    }
}
