use super::{Expr, Select, Statement};

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub source: InsertSource,

    /// Columns returned for each inserted row
    pub returning: Vec<String>,

    /// When set, rows whose key already exists are updated instead
    pub upsert: Option<Upsert>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Select(Box<Select>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    /// Conflict target, the table's primary key
    pub keys: Vec<String>,

    /// Columns overwritten from the incoming row on conflict
    pub update_columns: Vec<String>,
}

impl Insert {
    pub fn values(table: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Expr>>) -> Insert {
        Insert {
            table: table.into(),
            columns,
            source: InsertSource::Values(rows),
            returning: vec![],
            upsert: None,
        }
    }

    /// Single-row template whose cells are argument slots `0..columns.len()`.
    /// Serialized repeatedly with [`Serializer::serialize_batch`].
    ///
    /// [`Serializer::serialize_batch`]: crate::Serializer::serialize_batch
    pub fn template(table: impl Into<String>, columns: Vec<String>) -> Insert {
        let row = (0..columns.len()).map(Expr::arg).collect();
        Insert::values(table, columns, vec![row])
    }

    pub fn rows(&self) -> Option<&[Vec<Expr>]> {
        match &self.source {
            InsertSource::Values(rows) => Some(rows),
            InsertSource::Select(_) => None,
        }
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Statement::Insert(value)
    }
}
