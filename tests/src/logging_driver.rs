use quarry::driver::{Capability, Connection, Driver, Operation, Response};
use quarry_core::{async_trait, Dialect, Result, Schema};
use std::sync::{Arc, Mutex};

/// A driver wrapper that logs every operation its connections execute.
#[derive(Debug)]
pub struct LoggingDriver {
    inner: Box<dyn Driver>,

    /// Log of all operations executed through this driver
    /// Using Arc<Mutex> for thread-safe access from tests
    ops_log: Arc<Mutex<Vec<Operation>>>,
}

impl LoggingDriver {
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self {
            inner: driver,
            ops_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get a handle to access the operations log
    pub fn ops_log_handle(&self) -> Arc<Mutex<Vec<Operation>>> {
        self.ops_log.clone()
    }
}

#[async_trait]
impl Driver for LoggingDriver {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn capability(&self) -> &'static Capability {
        self.inner.capability()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(LoggingConnection {
            inner: self.inner.connect().await?,
            ops_log: self.ops_log_handle(),
        }))
    }

    fn max_connections(&self) -> Option<usize> {
        self.inner.max_connections()
    }
}

#[derive(Debug)]
pub struct LoggingConnection {
    /// The underlying connection that actually executes operations
    inner: Box<dyn Connection>,

    ops_log: Arc<Mutex<Vec<Operation>>>,
}

#[async_trait]
impl Connection for LoggingConnection {
    fn capability(&self) -> &'static Capability {
        self.inner.capability()
    }

    async fn exec(&mut self, operation: Operation) -> Result<Response> {
        // Logged before running so failed statements show up too
        self.ops_log
            .lock()
            .expect("Failed to acquire ops log lock")
            .push(operation.clone());

        self.inner.exec(operation).await
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    async fn push_schema(&mut self, schema: &Schema) -> Result<()> {
        self.inner.push_schema(schema).await
    }
}
