#[macro_use]
mod fmt;
use fmt::ToSql;

mod delim;
use delim::{Comma, Delimited};

mod flavor;
pub use flavor::{Flavor, Function, Hana, JsonEncoding, JsonExpand, JsonField, LockTarget, Postgresql, Sqlite, UpsertSyntax};

mod ident;
use ident::Ident;

mod params;
pub use params::{Bind, Params, Placeholder};

// Fragment serializers
mod expr;
mod function;
mod statement;

use crate::stmt::{Insert, Statement};

use quarry_core::Dialect;

/// Serialize a statement to a SQL string
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'a> {
    /// The database flavor handles the differences between SQL dialects and
    /// supported features.
    flavor: &'a dyn Flavor,
}

/// Output of serialization: SQL text plus one bind source per placeholder, in
/// placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub binds: Vec<Bind>,

    /// Statements that must run first on the same transaction (for example a
    /// lock timeout setting).
    pub preamble: Vec<String>,
}

struct Formatter<'a, P> {
    /// Handle to the serializer
    serializer: &'a Serializer<'a>,

    /// Where to write the serialized SQL
    dst: &'a mut String,

    /// Where to store parameters
    params: &'a mut P,

    /// Added to every argument slot; set per row by batch serialization
    arg_offset: usize,

    preamble: &'a mut Vec<String>,
}

impl Serializer<'static> {
    pub fn sqlite() -> Serializer<'static> {
        Serializer { flavor: &Sqlite }
    }

    pub fn postgresql() -> Serializer<'static> {
        Serializer {
            flavor: &Postgresql,
        }
    }

    pub fn hana() -> Serializer<'static> {
        Serializer { flavor: &Hana }
    }

    pub fn for_dialect(dialect: Dialect) -> Serializer<'static> {
        match dialect {
            Dialect::Sqlite => Serializer::sqlite(),
            Dialect::Postgresql => Serializer::postgresql(),
            Dialect::Hana => Serializer::hana(),
        }
    }
}

impl<'a> Serializer<'a> {
    pub fn new(flavor: &'a dyn Flavor) -> Serializer<'a> {
        Serializer { flavor }
    }

    pub fn flavor(&self) -> &'a dyn Flavor {
        self.flavor
    }

    pub fn dialect(&self) -> Dialect {
        self.flavor.dialect()
    }

    pub fn serialize(&self, stmt: &Statement) -> Compiled {
        let mut sql = String::new();
        let mut binds = vec![];
        let mut preamble = vec![];

        let mut fmt = Formatter {
            serializer: self,
            dst: &mut sql,
            params: &mut binds,
            arg_offset: 0,
            preamble: &mut preamble,
        };

        stmt.to_sql(&mut fmt);

        tracing::trace!(dialect = %self.dialect(), sql = %sql, "serialized statement");

        Compiled {
            sql,
            binds,
            preamble,
        }
    }

    /// Serializes a single-row insert template for `rows` rows. Argument slot
    /// `i` of row `r` binds as `Arg(r * columns + i)`.
    pub fn serialize_batch(&self, insert: &Insert, rows: usize) -> Compiled {
        let mut sql = String::new();
        let mut binds = vec![];
        let mut preamble = vec![];

        let mut fmt = Formatter {
            serializer: self,
            dst: &mut sql,
            params: &mut binds,
            arg_offset: 0,
            preamble: &mut preamble,
        };

        statement::insert_batch(insert, rows, &mut fmt);

        Compiled {
            sql,
            binds,
            preamble,
        }
    }
}

impl<P: Params> Formatter<'_, P> {
    /// Serializes into a separate buffer. Parameters are still pushed in
    /// order, so the returned text must be emitted after anything already
    /// written and before anything written later.
    fn capture(&mut self, f: impl FnOnce(&mut Formatter<'_, P>)) -> String {
        let mut buf = String::new();
        let mut nested = Formatter {
            serializer: self.serializer,
            dst: &mut buf,
            params: &mut *self.params,
            arg_offset: self.arg_offset,
            preamble: &mut *self.preamble,
        };
        f(&mut nested);
        buf
    }

    fn flavor(&self) -> &dyn Flavor {
        self.serializer.flavor
    }
}
