use super::*;

/// A dialect-neutral expression tree.
///
/// References are unresolved paths; the engine resolves them against the
/// model before any SQL is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to an element, possibly through associations
    Ref(Path),

    /// Literal value, always bound as a parameter
    Value(Value),

    /// Positional argument slot, filled at execution time
    Arg(usize),

    /// Raw SQL fragment. Internal use only, never built from user input.
    Raw(String),

    Func(ExprFunc),

    List(Vec<Expr>),

    /// Scalar sub-select
    Stmt(Box<Select>),

    BinaryOp(ExprBinaryOp),

    And(Vec<Expr>),

    Or(Vec<Expr>),

    Not(Box<Expr>),

    IsNull(ExprIsNull),

    InList(ExprInList),

    Like(ExprLike),

    Exists(ExprExists),

    /// `any` / `all` over the rows of a to-many association
    Quantified(ExprQuantified),
}

impl Expr {
    /// Reference to a dotted path.
    pub fn r#ref(path: impl Into<Path>) -> Expr {
        Expr::Ref(path.into())
    }

    pub fn value(value: impl Into<Value>) -> Expr {
        Expr::Value(value.into())
    }

    pub fn null() -> Expr {
        Expr::Value(Value::Null)
    }

    pub fn arg(index: usize) -> Expr {
        Expr::Arg(index)
    }

    pub fn raw(sql: impl Into<String>) -> Expr {
        Expr::Raw(sql.into())
    }

    pub fn list(items: impl IntoIterator<Item = impl Into<Expr>>) -> Expr {
        Expr::List(items.into_iter().map(Into::into).collect())
    }

    pub fn and(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        match (lhs.into(), rhs.into()) {
            (Expr::And(mut lhs), Expr::And(rhs)) => {
                lhs.extend(rhs);
                Expr::And(lhs)
            }
            (Expr::And(mut lhs), rhs) => {
                lhs.push(rhs);
                Expr::And(lhs)
            }
            (lhs, Expr::And(mut rhs)) => {
                rhs.insert(0, lhs);
                Expr::And(rhs)
            }
            (lhs, rhs) => Expr::And(vec![lhs, rhs]),
        }
    }

    pub fn or(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        match (lhs.into(), rhs.into()) {
            (Expr::Or(mut lhs), Expr::Or(rhs)) => {
                lhs.extend(rhs);
                Expr::Or(lhs)
            }
            (Expr::Or(mut lhs), rhs) => {
                lhs.push(rhs);
                Expr::Or(lhs)
            }
            (lhs, rhs) => Expr::Or(vec![lhs, rhs]),
        }
    }

    pub fn not(expr: impl Into<Expr>) -> Expr {
        Expr::Not(Box::new(expr.into()))
    }

    pub fn stmt(select: Select) -> Expr {
        Expr::Stmt(Box::new(select))
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Expr::Value(_))
    }

    pub fn is_value_null(&self) -> bool {
        matches!(self, Expr::Value(Value::Null))
    }

    pub fn as_ref_path(&self) -> Option<&Path> {
        match self {
            Expr::Ref(path) => Some(path),
            _ => None,
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Value(value)
    }
}

impl From<Path> for Expr {
    fn from(value: Path) -> Self {
        Expr::Ref(value)
    }
}

impl From<Select> for Expr {
    fn from(value: Select) -> Self {
        Expr::stmt(value)
    }
}

macro_rules! impl_from_literal {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Value(value.into())
                }
            }
        )*
    };
}

impl_from_literal!(
    bool,
    i32,
    i64,
    f64,
    String,
    rust_decimal::Decimal,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime
);

/// String literals are values. Use [`Expr::r#ref`] for references.
impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Value(value.into())
    }
}
