use super::*;

/// A caller-facing statement, one variant per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Upsert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    /// The entity the statement targets, for single-entity statements.
    pub fn entity(&self) -> Option<&str> {
        match self {
            Statement::Select(select) => select.from.as_entity(),
            Statement::Insert(insert) | Statement::Upsert(insert) => Some(&insert.into),
            Statement::Update(update) => Some(&update.entity),
            Statement::Delete(delete) => Some(&delete.from),
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Statement::Select(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Upsert(_) => "UPSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
        }
    }
}
