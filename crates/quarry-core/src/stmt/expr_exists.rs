use super::{Expr, Path, Select};

#[derive(Debug, Clone, PartialEq)]
pub struct ExprExists {
    pub target: ExistsTarget,
    pub negate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExistsTarget {
    /// Association path, optionally filtered on any segment
    Path(Path),

    /// Arbitrary sub-select
    Select(Box<Select>),
}

impl Expr {
    /// `exists <path>`
    pub fn exists(path: impl Into<Path>) -> Expr {
        Expr::Exists(ExprExists {
            target: ExistsTarget::Path(path.into()),
            negate: false,
        })
    }

    pub fn not_exists(path: impl Into<Path>) -> Expr {
        Expr::Exists(ExprExists {
            target: ExistsTarget::Path(path.into()),
            negate: true,
        })
    }

    pub fn exists_select(select: Select) -> Expr {
        Expr::Exists(ExprExists {
            target: ExistsTarget::Select(Box::new(select)),
            negate: false,
        })
    }
}
