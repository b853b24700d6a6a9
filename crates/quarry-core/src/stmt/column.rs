use super::{Expr, Limit, OrderBy, Path};

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Any expression, including plain and dotted references.
    Expr { expr: Expr, alias: Option<String> },

    /// Nested target rows of an association.
    Expand(Expand),

    /// Target columns spliced into the parent row.
    Inline(Inline),

    /// Every persisted, non-virtual element of the source.
    Wildcard { excluding: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expand {
    pub path: Path,

    /// Requested columns. Empty means all.
    pub columns: Vec<Column>,

    /// Name of the nested field, defaults to the last path segment.
    pub alias: Option<String>,

    pub order_by: Vec<OrderBy>,

    pub limit: Option<Limit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inline {
    pub path: Path,

    /// Requested target columns. Empty means all.
    pub columns: Vec<Column>,
}

impl Column {
    pub fn path(path: impl Into<Path>) -> Column {
        Column::Expr {
            expr: Expr::Ref(path.into()),
            alias: None,
        }
    }

    pub fn expr(expr: impl Into<Expr>) -> Column {
        Column::Expr {
            expr: expr.into(),
            alias: None,
        }
    }

    pub fn aliased(expr: impl Into<Expr>, alias: impl Into<String>) -> Column {
        Column::Expr {
            expr: expr.into(),
            alias: Some(alias.into()),
        }
    }

    pub fn wildcard() -> Column {
        Column::Wildcard { excluding: vec![] }
    }

    pub fn excluding<I, S>(names: I) -> Column
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Column::Wildcard {
            excluding: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn expand(path: impl Into<Path>, columns: impl IntoIterator<Item = Column>) -> Column {
        Column::Expand(Expand {
            path: path.into(),
            columns: columns.into_iter().collect(),
            alias: None,
            order_by: vec![],
            limit: None,
        })
    }

    pub fn inline(path: impl Into<Path>, columns: impl IntoIterator<Item = Column>) -> Column {
        Column::Inline(Inline {
            path: path.into(),
            columns: columns.into_iter().collect(),
        })
    }
}

impl Expand {
    pub fn alias(mut self, alias: impl Into<String>) -> Expand {
        self.alias = Some(alias.into());
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Expand {
        self.order_by.push(order_by);
        self
    }

    pub fn limit(mut self, rows: u64) -> Expand {
        self.limit.get_or_insert_with(Limit::default).rows = Some(Expr::from(rows as i64));
        self
    }

    /// Name of the nested field in the result row.
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.path.last())
    }
}

impl From<Expand> for Column {
    fn from(value: Expand) -> Self {
        Column::Expand(value)
    }
}

impl From<&str> for Column {
    fn from(value: &str) -> Self {
        if value == "*" {
            Column::wildcard()
        } else {
            Column::path(value)
        }
    }
}

impl From<Expr> for Column {
    fn from(value: Expr) -> Self {
        Column::expr(value)
    }
}
