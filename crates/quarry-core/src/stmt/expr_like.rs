use super::Expr;

#[derive(Debug, Clone, PartialEq)]
pub struct ExprLike {
    pub expr: Box<Expr>,
    pub pattern: Box<Expr>,
    pub negate: bool,
}

impl Expr {
    pub fn like(expr: impl Into<Expr>, pattern: impl Into<Expr>) -> Expr {
        Expr::Like(ExprLike {
            expr: Box::new(expr.into()),
            pattern: Box::new(pattern.into()),
            negate: false,
        })
    }
}
