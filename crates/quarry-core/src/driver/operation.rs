mod query_sql;
pub use query_sql::QuerySql;

mod transaction;
pub use transaction::Transaction;

#[derive(Debug, Clone)]
pub enum Operation {
    /// Execute a SQL statement
    QuerySql(QuerySql),

    /// Begin, commit or roll back a transaction
    Transaction(Transaction),
}

impl Operation {
    pub fn is_query_sql(&self) -> bool {
        matches!(self, Operation::QuerySql(_))
    }

    pub fn as_query_sql(&self) -> Option<&QuerySql> {
        match self {
            Operation::QuerySql(query) => Some(query),
            _ => None,
        }
    }
}
