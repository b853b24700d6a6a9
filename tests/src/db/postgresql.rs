use quarry::{
    db::Connect,
    driver::{Capability, Driver},
};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::Setup;

/// Tests share one database and recreate their tables on setup, so they run
/// one at a time.
static EXCLUSIVE: Mutex<()> = Mutex::new(());

pub struct SetupPostgreSQL {
    url: String,
}

impl SetupPostgreSQL {
    pub fn new() -> Self {
        let url = std::env::var("QUARRY_TEST_POSTGRESQL_URL")
            .unwrap_or_else(|_| "postgresql://localhost:5432/quarry_test".to_string());

        Self { url }
    }
}

impl Default for SetupPostgreSQL {
    fn default() -> Self {
        Self::new()
    }
}

impl Setup for SetupPostgreSQL {
    fn driver(&self) -> Box<dyn Driver> {
        Box::new(Connect::new(&self.url).expect("postgresql driver"))
    }

    fn capability(&self) -> &'static Capability {
        &Capability::POSTGRESQL
    }

    fn exclusive(&self) -> Option<MutexGuard<'static, ()>> {
        // A failed test must not block the rest
        Some(EXCLUSIVE.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
