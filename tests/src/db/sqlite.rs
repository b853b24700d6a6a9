use quarry::{
    db::Connect,
    driver::{Capability, Driver},
};

use crate::Setup;

/// A private in-memory database per test.
pub struct SetupSqlite;

impl Setup for SetupSqlite {
    fn driver(&self) -> Box<dyn Driver> {
        Box::new(Connect::new("sqlite::memory:").expect("sqlite driver"))
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }
}
