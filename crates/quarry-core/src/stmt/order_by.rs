use super::{Expr, Path};

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl OrderBy {
    pub fn asc(expr: impl Into<Path>) -> OrderBy {
        OrderBy {
            expr: Expr::Ref(expr.into()),
            direction: Direction::Asc,
        }
    }

    pub fn desc(expr: impl Into<Path>) -> OrderBy {
        OrderBy {
            expr: Expr::Ref(expr.into()),
            direction: Direction::Desc,
        }
    }
}

impl From<&str> for OrderBy {
    fn from(value: &str) -> Self {
        OrderBy::asc(value)
    }
}

impl From<Expr> for OrderBy {
    fn from(value: Expr) -> Self {
        OrderBy {
            expr: value,
            direction: Direction::Asc,
        }
    }
}
