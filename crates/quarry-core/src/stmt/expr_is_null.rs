use super::Expr;

#[derive(Debug, Clone, PartialEq)]
pub struct ExprIsNull {
    pub expr: Box<Expr>,
    pub negate: bool,
}

impl Expr {
    pub fn is_null(expr: impl Into<Expr>) -> Expr {
        Expr::IsNull(ExprIsNull {
            expr: Box::new(expr.into()),
            negate: false,
        })
    }

    pub fn is_not_null(expr: impl Into<Expr>) -> Expr {
        Expr::IsNull(ExprIsNull {
            expr: Box::new(expr.into()),
            negate: true,
        })
    }
}
