use super::{Entry, EntryValue, Expr, Statement};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Qualified entity name
    pub entity: String,

    pub filter: Option<Expr>,

    /// Values to assign, possibly with nested composition children
    pub data: Entry,

    /// Assignments computed from expressions, e.g. `stock = stock - 1`
    pub with: IndexMap<String, Expr>,
}

impl Update {
    pub fn entity(entity: impl Into<String>) -> Update {
        Update {
            entity: entity.into(),
            filter: None,
            data: Entry::new(),
            with: IndexMap::new(),
        }
    }

    pub fn filter(mut self, expr: impl Into<Expr>) -> Update {
        self.filter = Some(match self.filter.take() {
            Some(existing) => Expr::and(existing, expr),
            None => expr.into(),
        });
        self
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<EntryValue>) -> Update {
        self.data.insert(name, value);
        self
    }

    pub fn data(mut self, data: Entry) -> Update {
        self.data = data;
        self
    }

    pub fn with(mut self, name: impl Into<String>, expr: impl Into<Expr>) -> Update {
        self.with.insert(name.into(), expr.into());
        self
    }
}

impl From<Update> for Statement {
    fn from(value: Update) -> Self {
        Statement::Update(value)
    }
}
