mod builder;
pub use builder::Builder;

mod connect;
pub use connect::Connect;

mod pool;
pub use pool::{Pool, PoolConfig, PoolConnection, Timeouts};

use crate::{engine::Engine, transaction::Transaction, Context, Outcome, Result};

use quarry_core::{
    driver::Capability,
    stmt::{self, ValueRecord, ValueStream},
    Schema,
};
use std::{sync::Arc, time::Duration};

/// Shared state between all `Db` clones.
pub(crate) struct Shared {
    pub(crate) engine: Engine,
    pub(crate) pool: Pool,
}

/// A database handle.
///
/// Every logical operation checks a connection out of the pool, holds it for
/// its whole duration and hands it back when done. Cloning is cheap; clones
/// share the model, the plan cache and the pool.
#[derive(Clone)]
pub struct Db {
    pub(crate) shared: Arc<Shared>,

    /// Request context applied to every operation run through this handle
    pub(crate) cx: Context,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// A handle that runs operations under `cx`, sharing everything else.
    pub fn with_context(&self, cx: Context) -> Db {
        Db {
            shared: self.shared.clone(),
            cx,
        }
    }

    pub fn context(&self) -> &Context {
        &self.cx
    }

    /// Executes one logical operation.
    ///
    /// Writes run inside a single transaction: either every planned
    /// statement takes effect or none does.
    pub async fn exec(&self, stmt: impl Into<stmt::Statement>) -> Result<Outcome> {
        let mut connection = self.shared.pool.get().await?;
        self.shared
            .engine
            .exec(&mut **connection, &self.cx, stmt.into())
            .await
    }

    /// Executes a select and returns every row.
    pub async fn select(&self, select: stmt::Select) -> Result<Vec<ValueRecord>> {
        Ok(self.exec(select).await?.rows)
    }

    /// Executes a select and returns its rows lazily.
    ///
    /// The stream holds its pooled connection until it is drained or
    /// dropped. It can be read once.
    pub async fn stream(&self, select: stmt::Select) -> Result<ValueStream> {
        let mut connection = self.shared.pool.get().await?;
        let schema = self.shared.engine.schema();

        let mut rows = self
            .shared
            .engine
            .query(&mut **connection, &self.cx, &schema, select)
            .await?;

        Ok(ValueStream::from_stream(async_stream::stream! {
            let _connection = connection;

            while let Some(row) = rows.next().await {
                yield row;
            }
        }))
    }

    /// Executes one logical operation, giving up after `timeout`.
    ///
    /// A connection interrupted mid-statement is closed instead of going
    /// back to the pool; the backend rolls back whatever it had open.
    pub async fn exec_with_timeout(&self, stmt: impl Into<stmt::Statement>, timeout: Duration) -> Result<Outcome> {
        let mut connection = self.shared.pool.get().await?;

        let exec = self.shared.engine.exec(&mut **connection, &self.cx, stmt.into());

        match tokio::time::timeout(timeout, exec).await {
            Ok(outcome) => outcome,
            Err(_) => {
                drop(connection.detach());
                tracing::warn!(?timeout, "operation timed out; connection discarded");
                Err(quarry_core::err!("operation timed out after {timeout:?}"))
            }
        }
    }

    /// Begins a transaction on a connection pinned until it ends.
    pub async fn transaction(&mut self) -> Result<Transaction<'_>> {
        Transaction::begin(self).await
    }

    /// Compiles a select without running it.
    pub fn to_sql(&self, select: &stmt::Select) -> Result<String> {
        Ok(self.shared.engine.to_sql(&self.cx, select)?.sql)
    }

    /// Replaces the model. Operations already running keep the model they
    /// started with; compiled plans are dropped.
    pub fn reload_model(&self, schema: Schema) {
        self.shared.engine.reload(schema);
    }

    /// Creates a table for every persisted entity.
    pub async fn push_schema(&self) -> Result<()> {
        let schema = self.shared.engine.schema();
        let mut connection = self.shared.pool.get().await?;
        connection.push_schema(&schema).await
    }

    pub fn schema(&self) -> Arc<Schema> {
        self.shared.engine.schema()
    }

    pub fn capability(&self) -> &'static Capability {
        self.shared.pool.capability()
    }

    pub fn pool(&self) -> &Pool {
        &self.shared.pool
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("engine", &self.shared.engine)
            .field("context", &self.cx)
            .finish()
    }
}
