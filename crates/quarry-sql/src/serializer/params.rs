use super::{Formatter, ToSql};

use crate::stmt::{ExprArg, TypedValue};

/// Source of a bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    /// Literal from the statement
    Value(TypedValue),

    /// Argument slot, filled per execution
    Arg(ExprArg),

    /// The active locale
    Locale,
}

pub trait Params {
    fn push(&mut self, bind: Bind) -> Placeholder;
}

/// 1-based position of a bound parameter
pub struct Placeholder(pub usize);

impl Params for Vec<Bind> {
    fn push(&mut self, bind: Bind) -> Placeholder {
        self.push(bind);
        Placeholder(self.len())
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: super::Params>(self, f: &mut Formatter<'_, P>) {
        f.serializer.flavor.placeholder(self.0, f.dst);
    }
}

impl Bind {
    pub fn as_arg(&self) -> Option<usize> {
        match self {
            Bind::Arg(arg) => Some(arg.index),
            _ => None,
        }
    }
}
