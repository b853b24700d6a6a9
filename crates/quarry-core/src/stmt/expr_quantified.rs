use super::{Expr, Path};

/// `any`/`all` over a to-many association.
///
/// The predicate is evaluated in the scope of the association target.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprQuantified {
    pub quantifier: Quantifier,
    pub path: Path,
    pub predicate: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
}

impl Expr {
    pub fn any(path: impl Into<Path>, predicate: impl Into<Expr>) -> Expr {
        Expr::Quantified(ExprQuantified {
            quantifier: Quantifier::Any,
            path: path.into(),
            predicate: Box::new(predicate.into()),
        })
    }

    pub fn all(path: impl Into<Path>, predicate: impl Into<Expr>) -> Expr {
        Expr::Quantified(ExprQuantified {
            quantifier: Quantifier::All,
            path: path.into(),
            predicate: Box::new(predicate.into()),
        })
    }
}
