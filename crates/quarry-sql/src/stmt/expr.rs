use super::{BinaryOp, BuiltinType, Select, Statement, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column of a source, `qualifier.name`
    Column(ExprColumn),

    /// Literal, always bound as a parameter
    Value(TypedValue),

    /// Argument slot filled at execution time
    Arg(ExprArg),

    /// The active locale, bound as a parameter
    Locale,

    /// SQL fragment copied verbatim. Never built from caller input.
    Raw(String),

    /// Portable function call, translated by the flavor
    Func(ExprFunc),

    BinaryOp {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
    },

    And(Vec<Expr>),

    Or(Vec<Expr>),

    Not(Box<Expr>),

    IsNull {
        expr: Box<Expr>,
        negate: bool,
    },

    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negate: bool,
    },

    InSubquery {
        expr: Box<Expr>,
        query: Box<Select>,
        negate: bool,
    },

    Exists {
        query: Box<Select>,
        negate: bool,
    },

    /// Scalar sub-select
    Subquery(Box<Select>),

    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
    },

    /// Row value, `(a, b)`
    Tuple(Vec<Expr>),

    /// `*`, only as a `count` argument
    Star,

    /// Nested rows rendered as one JSON column
    Json(Box<ExprJson>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprColumn {
    pub qualifier: Option<String>,
    pub name: String,
}

/// A literal with the type of the column it is compared against or stored
/// into. The type drives the storage conversion of the bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub value: Value,
    pub ty: Option<BuiltinType>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprArg {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprFunc {
    /// Portable (lower case) or native function name
    pub name: String,
    pub args: Vec<Expr>,
}

/// Expand of an association into a JSON value.
///
/// `query` selects the target rows; every item carries an alias that becomes
/// the JSON key. Items that are themselves `Expr::Json` nest.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprJson {
    pub query: Select,

    /// `true` renders an array of objects, `false` a single object or null
    pub to_many: bool,

    /// Element type of each item of `query`, by position. Decimal and binary
    /// items are rendered as text inside the document.
    pub types: Vec<Option<BuiltinType>>,
}

impl Expr {
    pub fn column(qualifier: impl Into<String>, name: impl Into<String>) -> Expr {
        Expr::Column(ExprColumn {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        })
    }

    pub fn bare_column(name: impl Into<String>) -> Expr {
        Expr::Column(ExprColumn {
            qualifier: None,
            name: name.into(),
        })
    }

    pub fn value(value: impl Into<Value>) -> Expr {
        Expr::Value(TypedValue {
            value: value.into(),
            ty: None,
        })
    }

    pub fn typed(value: impl Into<Value>, ty: Option<BuiltinType>) -> Expr {
        Expr::Value(TypedValue {
            value: value.into(),
            ty,
        })
    }

    pub fn arg(index: usize) -> Expr {
        Expr::Arg(ExprArg { index })
    }

    pub fn raw(sql: impl Into<String>) -> Expr {
        Expr::Raw(sql.into())
    }

    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Func(ExprFunc {
            name: name.into(),
            args,
        })
    }

    pub fn binary_op(lhs: impl Into<Expr>, op: BinaryOp, rhs: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            lhs: Box::new(lhs.into()),
            op,
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn eq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Eq, rhs)
    }

    /// Conjunction of `exprs`. Nested `And`s are flattened; a single operand
    /// is returned as is.
    pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        let mut operands = vec![];
        for expr in exprs {
            match expr {
                Expr::And(nested) => operands.extend(nested),
                expr => operands.push(expr),
            }
        }

        if operands.len() == 1 {
            operands.remove(0)
        } else {
            Expr::And(operands)
        }
    }

    pub fn or_all(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        let mut operands: Vec<_> = exprs.into_iter().collect();

        if operands.len() == 1 {
            operands.remove(0)
        } else {
            Expr::Or(operands)
        }
    }

    pub fn is_null(expr: impl Into<Expr>) -> Expr {
        Expr::IsNull {
            expr: Box::new(expr.into()),
            negate: false,
        }
    }

    pub fn exists(query: Select, negate: bool) -> Expr {
        Expr::Exists {
            query: Box::new(query),
            negate,
        }
    }

    pub fn in_subquery(expr: impl Into<Expr>, query: Select) -> Expr {
        Expr::InSubquery {
            expr: Box::new(expr.into()),
            query: Box::new(query),
            negate: false,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Expr::Json(_))
    }

    pub fn as_column(&self) -> Option<&ExprColumn> {
        match self {
            Expr::Column(column) => Some(column),
            _ => None,
        }
    }
}

impl From<ExprColumn> for Expr {
    fn from(value: ExprColumn) -> Self {
        Expr::Column(value)
    }
}

impl From<TypedValue> for Expr {
    fn from(value: TypedValue) -> Self {
        Expr::Value(value)
    }
}

impl From<Select> for Expr {
    fn from(value: Select) -> Self {
        Expr::Subquery(Box::new(value))
    }
}

impl From<ExprJson> for Expr {
    fn from(value: ExprJson) -> Self {
        Expr::Json(Box::new(value))
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Self {
        Statement::Select(value)
    }
}
