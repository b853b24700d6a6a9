use super::operation::Transaction;

use std::borrow::Cow;

/// Manages transaction nesting depth and generates the correct SQL for
/// `BEGIN`/`SAVEPOINT`, `COMMIT`/`RELEASE SAVEPOINT`, and
/// `ROLLBACK`/`ROLLBACK TO SAVEPOINT` based on the current nesting level.
///
/// Each SQL driver embeds one of these and calls `start`, `commit`, or
/// `rollback` to obtain the SQL to execute.
#[derive(Debug)]
pub struct TransactionManager {
    depth: u32,
    begin_stmt: &'static str,
}

impl TransactionManager {
    fn with_begin(begin_stmt: &'static str) -> Self {
        Self {
            depth: 0,
            begin_stmt,
        }
    }

    /// Create a `TransactionManager` configured for SQLite. `IMMEDIATE`
    /// takes the write lock up front so concurrent writers fail with
    /// `SQLITE_BUSY` at `BEGIN` rather than mid-operation.
    pub fn sqlite() -> Self {
        Self::with_begin("BEGIN IMMEDIATE")
    }

    /// Create a `TransactionManager` configured for PostgreSQL.
    pub fn postgresql() -> Self {
        Self::with_begin("BEGIN")
    }

    /// Returns the SQL to begin a transaction or create a savepoint, and
    /// increments the nesting depth.
    pub fn start(&mut self) -> Cow<'static, str> {
        let sql = if self.depth == 0 {
            Cow::Borrowed(self.begin_stmt)
        } else {
            Cow::Owned(format!("SAVEPOINT sp_{}", self.depth))
        };
        self.depth += 1;
        sql
    }

    /// Returns `true` while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    /// Returns the SQL to apply an operation, updating the nesting depth.
    pub fn apply(&mut self, op: Transaction) -> crate::Result<Cow<'static, str>> {
        match op {
            Transaction::Start => Ok(self.start()),
            _ if self.depth == 0 => crate::bail!("no transaction is open"),
            Transaction::Commit => Ok(self.commit()),
            Transaction::Rollback => Ok(self.rollback()),
        }
    }

    /// Returns the SQL to commit the current transaction or release a
    /// savepoint, and decrements the nesting depth.
    pub fn commit(&mut self) -> Cow<'static, str> {
        self.depth -= 1;
        if self.depth == 0 {
            Cow::Borrowed("COMMIT")
        } else {
            Cow::Owned(format!("RELEASE SAVEPOINT sp_{}", self.depth))
        }
    }

    /// Returns the SQL to roll back the current transaction or savepoint, and
    /// decrements the nesting depth.
    ///
    /// For nested transactions this is `ROLLBACK TO SAVEPOINT sp_N`. The
    /// savepoint stays in place until the outer `COMMIT` or `ROLLBACK`.
    pub fn rollback(&mut self) -> Cow<'static, str> {
        self.depth -= 1;
        if self.depth == 0 {
            Cow::Borrowed("ROLLBACK")
        } else {
            Cow::Owned(format!("ROLLBACK TO SAVEPOINT sp_{}", self.depth))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_uses_savepoints() {
        let mut tm = TransactionManager::postgresql();
        assert_eq!(tm.apply(Transaction::Start).unwrap(), "BEGIN");
        assert_eq!(tm.apply(Transaction::Start).unwrap(), "SAVEPOINT sp_1");
        assert_eq!(
            tm.apply(Transaction::Rollback).unwrap(),
            "ROLLBACK TO SAVEPOINT sp_1"
        );
        assert_eq!(tm.apply(Transaction::Commit).unwrap(), "COMMIT");
        assert!(!tm.in_transaction());
    }

    #[test]
    fn commit_without_begin_fails() {
        let mut tm = TransactionManager::sqlite();
        assert!(tm.apply(Transaction::Commit).is_err());
    }
}
