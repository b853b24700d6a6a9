//! Connection pooling for database connections.

use std::ops::{Deref, DerefMut};

pub use deadpool::managed::Timeouts;
use quarry_core::driver::{Capability, Connection, Driver};

/// Get the default maximum size of a pool, which is `cpu_core_count * 2`
/// including logical cores (Hyper-Threading).
fn get_default_pool_max_size() -> usize {
    deadpool::managed::PoolConfig::default().max_size
}

/// Configuration for connection pool behavior.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: usize,
    pub timeouts: Timeouts,
}

impl PoolConfig {
    /// Creates a new pool configuration with default settings.
    pub fn new() -> Self {
        Self {
            max_size: get_default_pool_max_size(),
            timeouts: Default::default(),
        }
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// How long `get` waits for a free connection before failing.
    pub fn wait_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeouts.wait = Some(timeout);
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection pool that manages database connections.
#[derive(Debug)]
pub struct Pool {
    inner: deadpool::managed::Pool<Manager>,
    capability: &'static Capability,
}

impl Pool {
    /// Creates a new connection pool from the given driver.
    pub async fn new(driver: impl Driver, config: &PoolConfig) -> crate::Result<Self> {
        let capability = driver.capability();

        // A driver bound to a single embedded database file may cap the pool
        // below the configured size.
        let max_size = match driver.max_connections() {
            Some(max_connections) => max_connections.min(config.max_size),
            None => config.max_size,
        };

        let inner = deadpool::managed::Pool::builder(Manager {
            driver: Box::new(driver),
        })
        .runtime(deadpool::Runtime::Tokio1)
        .max_size(max_size)
        .timeouts(config.timeouts)
        .build()
        .map_err(quarry_core::Error::connection_pool)?;

        // Open one connection up front so a bad URL fails at startup.
        drop(inner.get().await.map_err(pool_error)?);

        Ok(Self { inner, capability })
    }

    /// Retrieves a connection from the pool.
    pub async fn get(&self) -> crate::Result<PoolConnection> {
        let connection = self.inner.get().await.map_err(pool_error)?;
        Ok(PoolConnection { inner: connection })
    }

    /// Returns the database driver's capabilities.
    pub fn capability(&self) -> &'static Capability {
        self.capability
    }

    /// Number of idle connections ready for reuse.
    pub fn available(&self) -> usize {
        self.inner.status().available
    }

    /// Number of open connections, idle or in use.
    pub fn size(&self) -> usize {
        self.inner.status().size
    }
}

/// Driver failures while opening a connection keep their own kind.
fn pool_error(err: deadpool::managed::PoolError<crate::Error>) -> crate::Error {
    match err {
        deadpool::managed::PoolError::Backend(err) => err,
        err => quarry_core::Error::connection_pool(err),
    }
}

#[derive(Debug)]
struct Manager {
    driver: Box<dyn Driver>,
}

impl deadpool::managed::Manager for Manager {
    type Type = Box<dyn Connection>;
    type Error = crate::Error;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.driver.connect().await
    }

    async fn recycle(
        &self,
        obj: &mut Self::Type,
        _metrics: &deadpool::managed::Metrics,
    ) -> deadpool::managed::RecycleResult<Self::Error> {
        // A caller dropped mid-operation leaves its transaction open.
        if obj.in_transaction() {
            tracing::debug!("discarding connection with an open transaction");
            return Err(deadpool::managed::RecycleError::Message(
                "connection returned with an open transaction".into(),
            ));
        }

        Ok(())
    }
}

/// A connection retrieved from a pool.
///
/// When dropped, the connection is returned to the pool for reuse.
pub struct PoolConnection {
    inner: deadpool::managed::Object<Manager>,
}

impl PoolConnection {
    /// Removes the connection from the pool. It is closed once dropped and
    /// never handed to another caller.
    pub fn detach(self) -> Box<dyn Connection> {
        deadpool::managed::Object::take(self.inner)
    }
}

impl Deref for PoolConnection {
    type Target = Box<dyn Connection>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PoolConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl std::fmt::Debug for PoolConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConnection")
            .field("connection", &**self.inner)
            .finish()
    }
}
