mod capability;
pub use capability::Capability;

mod response;
pub use response::{Response, Rows};

pub mod operation;
pub use operation::Operation;

mod transaction_manager;
pub use transaction_manager::TransactionManager;

use crate::{async_trait, Dialect, Schema};

use std::fmt::Debug;

/// Opens connections to one backend.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    fn dialect(&self) -> Dialect;

    /// Describes the driver's capability, which informs the planner.
    fn capability(&self) -> &'static Capability;

    /// Opens a new connection.
    async fn connect(&self) -> crate::Result<Box<dyn Connection>>;

    /// Upper bound on open connections, `None` for the pool default.
    fn max_connections(&self) -> Option<usize> {
        None
    }
}

/// A single backend connection.
///
/// Statements on one connection never interleave: the coordinator holds
/// the connection for the whole logical operation.
#[async_trait]
pub trait Connection: Debug + Send + 'static {
    fn capability(&self) -> &'static Capability;

    /// Executes a database operation
    async fn exec(&mut self, op: Operation) -> crate::Result<Response>;

    /// `true` while a transaction opened on this connection is still
    /// pending. The pool discards such connections instead of reusing them.
    fn in_transaction(&self) -> bool {
        false
    }

    /// Creates a table for every persisted entity. Test fixtures only.
    async fn push_schema(&mut self, schema: &Schema) -> crate::Result<()>;
}
