use super::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Start a transaction, or a savepoint when one is already open
    Start,

    /// Commit the innermost transaction or release its savepoint
    Commit,

    /// Roll back the innermost transaction or savepoint
    Rollback,
}

impl From<Transaction> for Operation {
    fn from(value: Transaction) -> Self {
        Self::Transaction(value)
    }
}
