use super::{Direction, Expr, LockMode, LockWait};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Option<TableWithJoins>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Limit>,
    pub lock: Option<Lock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableWithJoins {
    pub relation: TableFactor,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    Table { name: String, alias: Option<String> },
    Derived { query: Box<Select>, alias: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub relation: TableFactor,
    pub on: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Limit {
    pub rows: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lock {
    pub mode: LockMode,

    /// Columns for `FOR UPDATE OF`. Empty locks whole rows.
    pub columns: Vec<Expr>,

    pub wait: LockWait,
}

impl Select {
    pub fn from_table(name: impl Into<String>, alias: Option<String>) -> Select {
        Select {
            from: Some(TableWithJoins {
                relation: TableFactor::Table {
                    name: name.into(),
                    alias,
                },
                joins: vec![],
            }),
            ..Select::default()
        }
    }

    pub fn item(mut self, expr: impl Into<Expr>, alias: Option<String>) -> Select {
        self.items.push(SelectItem {
            expr: expr.into(),
            alias,
        });
        self
    }

    /// Adds a predicate, AND-ed with the existing filter.
    pub fn and_filter(&mut self, expr: Expr) {
        self.filter = Some(match self.filter.take() {
            Some(existing) => Expr::and_all([existing, expr]),
            None => expr,
        });
    }

    pub fn add_join(&mut self, join: Join) {
        if let Some(from) = &mut self.from {
            from.joins.push(join);
        }
    }
}

impl TableFactor {
    pub fn table(name: impl Into<String>, alias: impl Into<String>) -> TableFactor {
        TableFactor::Table {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name by which columns of this factor are qualified.
    pub fn alias(&self) -> &str {
        match self {
            TableFactor::Table { name, alias } => alias.as_deref().unwrap_or(name),
            TableFactor::Derived { alias, .. } => alias,
        }
    }
}
