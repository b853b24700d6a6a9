use super::Expr;

/// A function call by portable name.
///
/// Names are matched case-insensitively against the portable function set
/// and translated per dialect. Unknown names are emitted upper-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprFunc {
    pub name: String,
    pub args: Vec<Expr>,
}

const AGGREGATES: &[&str] = &["count", "countdistinct", "sum", "avg", "min", "max"];

impl ExprFunc {
    pub fn is_aggregate(&self) -> bool {
        AGGREGATES
            .iter()
            .any(|name| self.name.eq_ignore_ascii_case(name))
    }
}

impl Expr {
    pub fn func(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Func(ExprFunc {
            name: name.into(),
            args: args.into_iter().collect(),
        })
    }

    /// `count(*)` when `arg` is `None`
    pub fn count(arg: Option<Expr>) -> Expr {
        Expr::func("count", arg)
    }
}
