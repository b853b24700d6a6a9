use super::{Expr, Statement};

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    /// Qualified entity name
    pub from: String,

    /// Rows to delete. `None` deletes every row.
    pub filter: Option<Expr>,
}

impl Delete {
    pub fn from(entity: impl Into<String>) -> Delete {
        Delete {
            from: entity.into(),
            filter: None,
        }
    }

    pub fn filter(mut self, expr: impl Into<Expr>) -> Delete {
        self.filter = Some(match self.filter.take() {
            Some(existing) => Expr::and(existing, expr),
            None => expr.into(),
        });
        self
    }
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Statement::Delete(value)
    }
}
