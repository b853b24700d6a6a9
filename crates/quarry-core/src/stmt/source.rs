use super::{Expr, Select};

/// What a select reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Entity { name: String, alias: Option<String> },
    Join(Box<Join>),

    /// Derived table
    Select { select: Box<Select>, alias: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left: Source,
    pub right: Source,
    pub kind: JoinKind,
    pub on: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
}

impl Source {
    pub fn entity(name: impl Into<String>) -> Source {
        Source::Entity {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Source {
        Source::Entity {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    pub fn derived(select: Select, alias: impl Into<String>) -> Source {
        Source::Select {
            select: Box::new(select),
            alias: alias.into(),
        }
    }

    pub fn join(self, right: impl Into<Source>, kind: JoinKind, on: impl Into<Expr>) -> Source {
        Source::Join(Box::new(Join {
            left: self,
            right: right.into(),
            kind,
            on: on.into(),
        }))
    }

    pub fn inner_join(self, right: impl Into<Source>, on: impl Into<Expr>) -> Source {
        self.join(right, JoinKind::Inner, on)
    }

    pub fn left_join(self, right: impl Into<Source>, on: impl Into<Expr>) -> Source {
        self.join(right, JoinKind::Left, on)
    }

    /// Entity name when reading from a single entity.
    pub fn as_entity(&self) -> Option<&str> {
        match self {
            Source::Entity { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for Source {
    fn from(value: &str) -> Self {
        Source::entity(value)
    }
}

impl From<String> for Source {
    fn from(value: String) -> Self {
        Source::entity(value)
    }
}
