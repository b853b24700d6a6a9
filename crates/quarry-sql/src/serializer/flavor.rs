mod hana;
pub use hana::Hana;

mod postgresql;
pub use postgresql::Postgresql;

mod sqlite;
pub use sqlite::Sqlite;

use crate::stmt::{BuiltinType, LockMode, LockWait};

use quarry_core::Dialect;
use std::borrow::Cow;
use std::fmt;

/// Everything that differs between SQL dialects.
///
/// The statement walk is shared; it calls into the flavor for identifier
/// quoting, placeholders, pagination, locking, function names, upsert syntax,
/// JSON expansion and column types. Fragments passed in are already
/// serialized.
pub trait Flavor: fmt::Debug + Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Upper-cased keyword check
    fn is_reserved(&self, upper: &str) -> bool;

    /// Returns `true` if `ident` can be written without quotes and still
    /// resolve to the same name.
    fn is_safe_ident(&self, ident: &str) -> bool {
        is_plain_word(ident) && !self.is_reserved(&ident.to_ascii_uppercase())
    }

    fn quote(&self, ident: &str, dst: &mut String) {
        if self.is_safe_ident(ident) {
            dst.push_str(ident);
        } else {
            dst.push('"');
            dst.push_str(&ident.replace('"', "\"\""));
            dst.push('"');
        }
    }

    fn quoted(&self, ident: &str) -> String {
        let mut dst = String::new();
        self.quote(ident, &mut dst);
        dst
    }

    /// Writes the placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize, dst: &mut String);

    /// Pagination clause from serialized row count and offset.
    fn paginate(&self, rows: Option<&str>, offset: Option<&str>) -> Option<String>;

    /// Locking clause, `None` when the dialect cannot express it.
    fn lock_clause(&self, mode: LockMode, wait: LockWait, targets: &[LockTarget]) -> Option<String>;

    /// Statement that must run before a locking read on the same transaction.
    fn lock_preamble(&self, _wait: LockWait) -> Option<String> {
        None
    }

    /// Dialect override for a portable function name.
    fn function(&self, _name: &str) -> Option<Function> {
        None
    }

    /// Native upsert syntax. `None` means the caller emulates upsert with
    /// delete followed by insert.
    fn native_upsert(&self) -> Option<UpsertSyntax>;

    /// Whether `VALUES (..), (..)` inserts several rows at once. Otherwise
    /// rows are combined with `UNION ALL` over [`Flavor::dual_table`].
    fn multi_row_insert(&self) -> bool {
        true
    }

    /// One-row table for selects without a source
    fn dual_table(&self) -> Option<&'static str> {
        None
    }

    /// Wraps the serialized inner query of an expand into a JSON column.
    fn json_expand(&self, expand: &JsonExpand<'_>) -> String;

    /// Column type for `CREATE TABLE`.
    fn column_type(&self, ty: &BuiltinType, auto_increment: bool) -> String;

    /// `true` if an auto-increment column already declares the primary key.
    fn identity_is_primary_key(&self) -> bool {
        false
    }

    /// Translation of a portable function name.
    fn translate_function(&self, name: &str) -> Function {
        self.function(name)
            .unwrap_or_else(|| super::function::common(name))
    }
}

/// How a function call is written.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// `NAME(arg, ..)`
    Call(Cow<'static, str>),

    /// Text with `{N}` replaced by argument `N` and `{*}` by all arguments,
    /// comma separated
    Template(&'static str),

    /// Arguments joined by an operator
    Infix(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertSyntax {
    /// `INSERT .. ON CONFLICT (keys) DO UPDATE SET ..`
    OnConflict,

    /// `UPSERT .. VALUES (..) WITH PRIMARY KEY`
    UpsertWithPrimaryKey,
}

/// Serialized lock target column
#[derive(Debug, Clone)]
pub struct LockTarget {
    /// Quoted source alias
    pub qualifier: String,

    /// Quoted, qualified column
    pub column: String,
}

#[derive(Debug)]
pub struct JsonExpand<'a> {
    /// Serialized inner query
    pub inner: &'a str,

    pub fields: &'a [JsonField],

    pub to_many: bool,
}

#[derive(Debug)]
pub struct JsonField {
    /// Output key, also the inner query's column alias
    pub key: String,

    pub encoding: JsonEncoding,
}

/// How an inner column is carried in the JSON document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonEncoding {
    /// As the backend's native JSON value
    Plain,

    /// The inner column is itself JSON
    Nested,

    /// As a string, so numbers wider than a double keep every digit
    Text,

    /// As hex text; JSON has no byte type
    Hex,
}

impl JsonEncoding {
    pub(crate) fn of(nested: bool, ty: Option<&BuiltinType>) -> JsonEncoding {
        match ty {
            _ if nested => JsonEncoding::Nested,
            Some(BuiltinType::Decimal { .. }) => JsonEncoding::Text,
            Some(BuiltinType::Binary { .. } | BuiltinType::LargeBinary) => JsonEncoding::Hex,
            _ => JsonEncoding::Plain,
        }
    }
}

/// Alias of the derived table inside a JSON expand
pub(crate) const JSON_ALIAS: &str = "_json_";

/// Words shared by the supported dialects' reserved lists
pub(crate) const COMMON_RESERVED: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CHECK", "COLLATE",
    "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END",
    "EXCEPT", "EXISTS", "FALSE", "FOR", "FOREIGN", "FROM", "FULL", "GROUP", "HAVING", "IN",
    "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NATURAL",
    "NOT", "NULL", "OF", "OFFSET", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES",
    "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TO", "TRUE", "UNION", "UNIQUE", "UPDATE",
    "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_plain_word(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Single-quoted string literal for internal, constant text.
pub(crate) fn string_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
