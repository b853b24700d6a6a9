mod config;
pub use config::Config;

mod context;
pub use context::Context;

pub mod db;
pub use db::Db;

mod engine;
pub use engine::Outcome;

mod transaction;
pub use transaction::Transaction;

pub use quarry_core::{
    bail, err, schema, stmt, Dialect, Error, Result, Schema,
};

pub use quarry_core::driver;
