use crate::{exec_log::ExecLog, logging_driver::LoggingDriver, Setup};

use quarry::{db, driver::Capability, driver::Operation, Db, Schema};
use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

/// State of one scenario run against one backend.
///
/// Tests use `#[test]` and drive their own current-thread runtime, so the
/// runtime outlives everything the test spawned. Driver operations are
/// always logged for assertions.
pub struct DbTest {
    setup: Box<dyn Setup>,
    ops_log: Arc<Mutex<Vec<Operation>>>,
}

impl DbTest {
    /// Runs `test_fn` to completion on a fresh runtime.
    pub fn run<F>(setup: Box<dyn Setup>, test_fn: F)
    where
        F: for<'a> FnOnce(&'a mut DbTest) -> Pin<Box<dyn Future<Output = ()> + 'a>>,
    {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create Tokio runtime");

        let _exclusive = setup.exclusive();

        let mut test = DbTest {
            setup,
            ops_log: Arc::new(Mutex::new(Vec::new())),
        };

        runtime.block_on(test_fn(&mut test));
    }

    /// Connects with default settings and creates the tables of `schema`.
    pub async fn setup_db(&mut self, schema: Schema) -> Db {
        self.setup_db_with(schema, |_| {}).await
    }

    /// Like [`setup_db`](Self::setup_db), letting the test adjust the
    /// builder first.
    pub async fn setup_db_with(&mut self, schema: Schema, configure: impl FnOnce(&mut db::Builder)) -> Db {
        self.try_setup_db_with(schema, configure).await.unwrap()
    }

    pub async fn try_setup_db_with(
        &mut self,
        schema: Schema,
        configure: impl FnOnce(&mut db::Builder),
    ) -> quarry::Result<Db> {
        let mut builder = Db::builder();
        configure(&mut builder);

        let driver = LoggingDriver::new(self.setup.driver());
        self.ops_log = driver.ops_log_handle();

        let db = builder.build(driver, schema).await?;
        db.push_schema().await?;

        Ok(db)
    }

    /// Operations sent since setup or the last `clear`
    pub fn log(&self) -> ExecLog {
        ExecLog::new(self.ops_log.clone())
    }

    pub fn capability(&self) -> &'static Capability {
        self.setup.capability()
    }
}
