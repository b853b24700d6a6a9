#[macro_use]
mod macros;

pub mod db;
mod db_test;
mod exec_log;
pub mod fixtures;
mod logging_driver;
pub mod prelude;

// Re-export for use in macros - needs to be public for macro expansion
pub use db_test::DbTest;
pub use exec_log::ExecLog;
pub use logging_driver::{LoggingConnection, LoggingDriver};

use quarry::driver::{Capability, Driver};

/// A backend the scenarios run against.
pub trait Setup: Send + Sync + 'static {
    /// A fresh driver. Every test gets its own.
    fn driver(&self) -> Box<dyn Driver>;

    fn capability(&self) -> &'static Capability;

    /// Held for the duration of a test. Backends shared between tests use
    /// it to run one test at a time.
    fn exclusive(&self) -> Option<std::sync::MutexGuard<'static, ()>> {
        None
    }
}
