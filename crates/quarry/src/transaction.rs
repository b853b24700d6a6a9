use crate::{db::PoolConnection, engine::Engine, Context, Outcome, Result};

use quarry_core::{
    driver::{operation, Connection, Response},
    stmt::{self, ValueRecord},
};

/// An active database transaction.
///
/// Borrows `&mut Db` for its lifetime, preventing concurrent use of the
/// same Db handle while a transaction is open. Every operation run through
/// it uses the same pinned connection; each write becomes a savepoint, so a
/// failed write leaves the work before it intact.
///
/// If dropped without calling [`commit`](Self::commit) or
/// [`rollback`](Self::rollback), the transaction is automatically rolled back.
pub struct Transaction<'db> {
    _db: &'db mut crate::Db,

    engine: Engine,

    cx: Context,

    /// `Option` so that `Drop` can move it into a spawned task.
    connection: Option<PoolConnection>,

    /// Whether commit or rollback has been called.
    finished: bool,

    /// A savepoint cannot roll back from its synchronous `drop`; it records
    /// the request here and the next operation issues it first.
    pending_savepoint_rollback: bool,
}

impl<'db> Transaction<'db> {
    pub(crate) async fn begin(db: &'db mut crate::Db) -> Result<Transaction<'db>> {
        let engine = db.shared.engine.clone();
        let cx = db.cx.clone();
        let mut connection = db.shared.pool.get().await?;

        connection.exec(operation::Transaction::Start.into()).await?;

        tracing::debug!("transaction started");

        Ok(Transaction {
            _db: db,
            engine,
            cx,
            connection: Some(connection),
            finished: false,
            pending_savepoint_rollback: false,
        })
    }

    /// Executes one logical operation inside the transaction.
    pub async fn exec(&mut self, stmt: impl Into<stmt::Statement>) -> Result<Outcome> {
        self.flush_pending().await?;

        let Some(connection) = self.connection.as_mut() else {
            quarry_core::bail!("transaction already finished");
        };

        self.engine.exec(&mut ***connection, &self.cx, stmt.into()).await
    }

    pub async fn select(&mut self, select: stmt::Select) -> Result<Vec<ValueRecord>> {
        Ok(self.exec(select).await?.rows)
    }

    /// Commit the transaction.
    pub async fn commit(mut self) -> Result<()> {
        self.op(operation::Transaction::Commit).await?;
        self.finished = true;
        Ok(())
    }

    /// Roll back the transaction.
    pub async fn rollback(mut self) -> Result<()> {
        self.op(operation::Transaction::Rollback).await?;
        self.finished = true;
        Ok(())
    }

    /// Create a savepoint within this transaction.
    pub async fn savepoint(&mut self) -> Result<Savepoint<'_, 'db>> {
        self.op(operation::Transaction::Start).await?;
        Ok(Savepoint {
            transaction: self,
            released: false,
        })
    }

    async fn op(&mut self, op: operation::Transaction) -> Result<Response> {
        self.flush_pending().await?;
        self.connection()?.exec(op.into()).await
    }

    /// Rolls back a dropped savepoint that is still pending its rollback.
    async fn flush_pending(&mut self) -> Result<()> {
        if std::mem::take(&mut self.pending_savepoint_rollback) {
            self.connection()?
                .exec(operation::Transaction::Rollback.into())
                .await?;
        }

        Ok(())
    }

    fn connection(&mut self) -> Result<&mut PoolConnection> {
        self.connection
            .as_mut()
            .ok_or_else(|| quarry_core::err!("transaction already finished"))
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        if let Some(mut connection) = self.connection.take() {
            tracing::debug!("transaction dropped; rolling back");

            tokio::spawn(async move {
                let connection: &mut dyn Connection = &mut **connection;
                if let Err(err) = connection.exec(operation::Transaction::Rollback.into()).await {
                    tracing::warn!(error = %err, "rollback of dropped transaction failed");
                }
            });
        }
    }
}

/// A savepoint within a transaction.
///
/// If dropped without calling [`release`](Self::release) or
/// [`rollback`](Self::rollback), the savepoint is automatically rolled back.
pub struct Savepoint<'a, 'db> {
    transaction: &'a mut Transaction<'db>,
    released: bool,
}

impl Savepoint<'_, '_> {
    pub async fn exec(&mut self, stmt: impl Into<stmt::Statement>) -> Result<Outcome> {
        self.transaction.exec(stmt).await
    }

    /// Keeps the savepoint's changes as part of the transaction.
    pub async fn release(mut self) -> Result<()> {
        self.transaction.op(operation::Transaction::Commit).await?;
        self.released = true;
        Ok(())
    }

    /// Undoes all work since the savepoint was created.
    pub async fn rollback(mut self) -> Result<()> {
        self.transaction.op(operation::Transaction::Rollback).await?;
        self.released = true;
        Ok(())
    }
}

impl Drop for Savepoint<'_, '_> {
    fn drop(&mut self) {
        if !self.released {
            self.transaction.pending_savepoint_rollback = true;
        }
    }
}
