use super::Expr;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Limit {
    pub rows: Option<Expr>,
    pub offset: Option<Expr>,
}
