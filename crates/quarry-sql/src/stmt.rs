mod create_table;
pub use create_table::{ColumnDef, CreateTable};

mod delete;
pub use delete::Delete;

mod drop_table;
pub use drop_table::DropTable;

mod expr;
pub use expr::{Expr, ExprArg, ExprColumn, ExprFunc, ExprJson, TypedValue};

mod insert;
pub use insert::{Insert, InsertSource, Upsert};

mod select;
pub use select::{
    Join, JoinKind, Limit, Lock, OrderByExpr, Select, SelectItem, TableFactor, TableWithJoins,
};

mod update;
pub use update::{Assignment, Update};

pub use quarry_core::{
    schema::BuiltinType,
    stmt::{BinaryOp, Direction, LockMode, LockWait, Value},
};

/// A flat, join-explicit SQL statement. Every column reference names its
/// source alias; no model paths remain.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    Delete(Delete),
    DropTable(DropTable),
    Insert(Insert),
    Select(Select),
    Update(Update),
}

impl Statement {
    pub fn is_select(&self) -> bool {
        matches!(self, Statement::Select(_))
    }

    /// Returns `true` if executing the statement yields rows.
    pub fn returns_rows(&self) -> bool {
        match self {
            Statement::Select(_) => true,
            Statement::Insert(insert) => !insert.returning.is_empty(),
            _ => false,
        }
    }
}
