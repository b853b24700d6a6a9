//! Per-type, per-dialect value conversion.
//!
//! Every builtin type has exactly one encode and one decode function per
//! dialect, collected in a [`TypeTable`]. The emitter binds literals through
//! the same table the deep-write planner uses to validate payloads.

mod binary;
mod decimal;
mod scalar;
mod temporal;

mod hana;
pub use hana::HanaTypes;

mod postgresql;
pub use postgresql::PostgresqlTypes;

mod sqlite;
pub use sqlite::SqliteTypes;

use crate::{schema::BuiltinType, stmt::Value, Dialect, Error, Result};
use std::fmt;

/// Default number of fractional-second digits kept on read
pub const DEFAULT_TIMESTAMP_PRECISION: u8 = 3;

/// Largest supported fractional-second precision
pub const MAX_TIMESTAMP_PRECISION: u8 = 7;

pub type EncodeFn = fn(Value, &BuiltinType, &Options) -> Result<Value>;
pub type DecodeFn = fn(Value, &BuiltinType, &Options) -> Result<Value>;

/// Encode/decode pair for one builtin type on one dialect.
#[derive(Clone, Copy)]
pub struct Codec {
    pub encode: EncodeFn,
    pub decode: DecodeFn,
}

/// Conversion settings shared by every codec.
#[derive(Debug, Clone)]
pub struct Options {
    /// Fractional-second digits kept when reading timestamps without an
    /// explicit precision
    pub timestamp_precision: u8,
}

/// The per-dialect conversion table. A new backend implements this next to
/// its SQL flavor.
pub trait TypeTable: fmt::Debug + Send + Sync + 'static {
    fn dialect(&self) -> Dialect;

    fn codec(&self, ty: &BuiltinType) -> Codec;
}

/// Converts values between their typed form and the storage form of one
/// dialect.
#[derive(Debug, Clone)]
pub struct Registry {
    table: &'static dyn TypeTable,
    options: Options,
}

static SQLITE: SqliteTypes = SqliteTypes;
static POSTGRESQL: PostgresqlTypes = PostgresqlTypes;
static HANA: HanaTypes = HanaTypes;

impl Registry {
    pub fn new(dialect: Dialect) -> Registry {
        let table: &'static dyn TypeTable = match dialect {
            Dialect::Sqlite => &SQLITE,
            Dialect::Postgresql => &POSTGRESQL,
            Dialect::Hana => &HANA,
        };

        Registry::with_table(table)
    }

    pub fn with_table(table: &'static dyn TypeTable) -> Registry {
        Registry {
            table,
            options: Options::default(),
        }
    }

    /// Sets the default fractional-second precision used on read.
    pub fn with_timestamp_precision(mut self, precision: u8) -> Result<Registry> {
        if precision > MAX_TIMESTAMP_PRECISION {
            return Err(Error::invalid_type(
                format!("timestamp precision {precision}"),
                format!("a precision between 0 and {MAX_TIMESTAMP_PRECISION}"),
            ));
        }

        self.options.timestamp_precision = precision;
        Ok(self)
    }

    pub fn dialect(&self) -> Dialect {
        self.table.dialect()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Validates `value` against `ty` and converts it to the value bound for
    /// the dialect.
    pub fn to_storage(&self, value: Value, ty: &BuiltinType) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::List(items) => items
                .into_iter()
                .map(|item| self.to_storage(item, ty))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            value => (self.table.codec(ty).encode)(value, ty, &self.options),
        }
    }

    /// Converts a value read from the dialect back to its typed form.
    pub fn from_storage(&self, value: Value, ty: &BuiltinType) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            value => (self.table.codec(ty).decode)(value, ty, &self.options).inspect_err(|err| {
                tracing::debug!(
                    dialect = ?self.table.dialect(),
                    %ty,
                    error = %err,
                    "stored value does not decode to its element type"
                );
            }),
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            timestamp_precision: DEFAULT_TIMESTAMP_PRECISION,
        }
    }
}

impl Codec {
    pub const fn new(encode: EncodeFn, decode: DecodeFn) -> Codec {
        Codec { encode, decode }
    }
}

/// Converts `value` to the storage form of `dialect` with default options.
pub fn to_storage(value: Value, ty: &BuiltinType, dialect: Dialect) -> Result<Value> {
    Registry::new(dialect).to_storage(value, ty)
}

/// Converts a stored value of `dialect` back to its typed form with default
/// options.
pub fn from_storage(value: Value, ty: &BuiltinType, dialect: Dialect) -> Result<Value> {
    Registry::new(dialect).from_storage(value, ty)
}

fn invalid(value: &Value, ty: &BuiltinType) -> Error {
    let described = match value {
        Value::String(s) => format!("string {s:?}"),
        Value::I32(v) => format!("integer {v}"),
        Value::I64(v) => format!("integer {v}"),
        Value::F64(v) => format!("double {v}"),
        Value::Decimal(v) => format!("decimal {v}"),
        value => value.kind().to_string(),
    };

    Error::invalid_type(described, ty.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_out_of_range() {
        let err = Registry::new(Dialect::Sqlite)
            .with_timestamp_precision(8)
            .unwrap_err();
        assert!(err.is_invalid_type());
    }

    #[test]
    fn null_passes_through() {
        for dialect in [Dialect::Sqlite, Dialect::Postgresql, Dialect::Hana] {
            let registry = Registry::new(dialect);
            assert_eq!(
                registry.to_storage(Value::Null, &BuiltinType::Int32).unwrap(),
                Value::Null
            );
            assert_eq!(
                registry
                    .from_storage(Value::Null, &BuiltinType::timestamp())
                    .unwrap(),
                Value::Null
            );
        }
    }

    #[test]
    fn stored_text_that_is_not_a_decimal_fails_to_decode() {
        let err = from_storage(
            Value::from("12,5"),
            &BuiltinType::decimal(5, 2),
            Dialect::Sqlite,
        )
        .unwrap_err();
        assert!(err.is_invalid_type(), "{err}");
    }

    #[test]
    fn invalid_type_message() {
        let err = to_storage(Value::from("abc"), &BuiltinType::Int32, Dialect::Sqlite).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid type: cannot convert string \"abc\" to Int32"
        );
    }
}
