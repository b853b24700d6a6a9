//! Common imports for test files
//!
//! This module provides a convenient way to import frequently used items
//! in test files with `use tests::prelude::*;`

pub use crate::fixtures::*;

// Re-export core test infrastructure
pub use crate::DbTest;

// Re-export macros
pub use crate::tests;

pub use quarry::{
    stmt::{Column, Delete, Entry, Expr, Insert, LockWait, OrderBy, Path, Select, Update, Value, ValueRecord},
    Context, Db, Outcome,
};
