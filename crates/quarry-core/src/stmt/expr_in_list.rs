use super::Expr;

#[derive(Debug, Clone, PartialEq)]
pub struct ExprInList {
    pub expr: Box<Expr>,

    /// An `Expr::List`, a list value, an argument slot, or a sub-select
    pub list: Box<Expr>,

    pub negate: bool,
}

impl Expr {
    pub fn in_list(expr: impl Into<Expr>, list: impl Into<Expr>) -> Expr {
        Expr::InList(ExprInList {
            expr: Box::new(expr.into()),
            list: Box::new(list.into()),
            negate: false,
        })
    }

    pub fn not_in_list(expr: impl Into<Expr>, list: impl Into<Expr>) -> Expr {
        Expr::InList(ExprInList {
            expr: Box::new(expr.into()),
            list: Box::new(list.into()),
            negate: true,
        })
    }
}
