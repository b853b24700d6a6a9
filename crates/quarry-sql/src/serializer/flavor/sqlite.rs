use super::{
    string_literal, Flavor, Function, JsonEncoding, JsonExpand, LockTarget, UpsertSyntax,
    COMMON_RESERVED, JSON_ALIAS,
};
use crate::stmt::{BuiltinType, LockMode, LockWait};

use quarry_core::Dialect;

/// The embedded engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

const RESERVED: &[&str] = &[
    "ABORT", "AUTOINCREMENT", "CONFLICT", "ESCAPE", "GLOB", "INDEX", "ISNULL", "NOTNULL",
    "PRAGMA", "REGEXP", "REPLACE", "TRANSACTION",
];

impl Flavor for Sqlite {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn is_reserved(&self, upper: &str) -> bool {
        COMMON_RESERVED.contains(&upper) || RESERVED.contains(&upper)
    }

    fn placeholder(&self, index: usize, dst: &mut String) {
        dst.push('?');
        dst.push_str(&index.to_string());
    }

    fn paginate(&self, rows: Option<&str>, offset: Option<&str>) -> Option<String> {
        match (rows, offset) {
            (Some(rows), Some(offset)) => Some(format!("LIMIT {rows} OFFSET {offset}")),
            (Some(rows), None) => Some(format!("LIMIT {rows}")),
            // OFFSET is only valid after LIMIT
            (None, Some(offset)) => Some(format!("LIMIT -1 OFFSET {offset}")),
            (None, None) => None,
        }
    }

    fn lock_clause(&self, mode: LockMode, wait: LockWait, _: &[LockTarget]) -> Option<String> {
        tracing::warn!(?mode, ?wait, "sqlite has no row locks; lock clause dropped");
        None
    }

    fn function(&self, name: &str) -> Option<Function> {
        Some(match name {
            "contains" => Function::Template("instr({0}, {1}) > 0"),
            "startswith" => Function::Template("instr({0}, {1}) = 1"),
            "endswith" => Function::Template("substr({0}, -length({1})) = {1}"),
            "indexof" => Function::Template("(instr({0}, {1}) - 1)"),
            "substring" => Function::Call("SUBSTR".into()),
            "year" => Function::Template("CAST(strftime('%Y', {0}) AS INTEGER)"),
            "month" => Function::Template("CAST(strftime('%m', {0}) AS INTEGER)"),
            "day" => Function::Template("CAST(strftime('%d', {0}) AS INTEGER)"),
            "hour" => Function::Template("CAST(strftime('%H', {0}) AS INTEGER)"),
            "minute" => Function::Template("CAST(strftime('%M', {0}) AS INTEGER)"),
            "second" => Function::Template("CAST(strftime('%S', {0}) AS INTEGER)"),
            "now" => Function::Template("strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"),
            "current_date" => Function::Template("date('now')"),
            "ceiling" => {
                Function::Template("(CAST({0} AS INTEGER) + ({0} > CAST({0} AS INTEGER)))")
            }
            "floor" => {
                Function::Template("(CAST({0} AS INTEGER) - ({0} < CAST({0} AS INTEGER)))")
            }
            _ => return None,
        })
    }

    fn native_upsert(&self) -> Option<UpsertSyntax> {
        Some(UpsertSyntax::OnConflict)
    }

    fn json_expand(&self, expand: &JsonExpand<'_>) -> String {
        let alias = self.quoted(JSON_ALIAS);
        let fields = expand
            .fields
            .iter()
            .map(|field| {
                let column = format!("{alias}.{}", self.quoted(&field.key));
                // nested expands arrive as text and must be re-parsed
                let value = match field.encoding {
                    JsonEncoding::Plain => column,
                    JsonEncoding::Nested => format!("json({column})"),
                    JsonEncoding::Text => format!("CAST({column} AS TEXT)"),
                    JsonEncoding::Hex => format!("hex({column})"),
                };
                format!("{}, {value}", string_literal(&field.key))
            })
            .collect::<Vec<_>>()
            .join(", ");

        if expand.to_many {
            format!(
                "(SELECT coalesce(json_group_array(json_object({fields})), '[]') FROM ({}) AS {alias})",
                expand.inner
            )
        } else {
            format!(
                "(SELECT json_object({fields}) FROM ({}) AS {alias})",
                expand.inner
            )
        }
    }

    fn column_type(&self, ty: &BuiltinType, auto_increment: bool) -> String {
        use BuiltinType::*;

        if auto_increment {
            return "INTEGER PRIMARY KEY AUTOINCREMENT".to_string();
        }

        match ty {
            Boolean => "BOOLEAN".to_string(),
            UInt8 | Int16 | Int32 | Int64 => "INTEGER".to_string(),
            Double => "REAL".to_string(),
            // NUMERIC affinity would round through a double
            Decimal { .. } => "TEXT".to_string(),
            String { length: Some(n) } => format!("NVARCHAR({n})"),
            String { length: None } => "NVARCHAR(5000)".to_string(),
            LargeString => "TEXT".to_string(),
            Binary { .. } | LargeBinary => "BLOB".to_string(),
            Uuid => "NVARCHAR(36)".to_string(),
            // TEXT affinity keeps the ISO strings byte for byte
            Date | Time | DateTime | Timestamp { .. } => "TEXT".to_string(),
        }
    }

    fn identity_is_primary_key(&self) -> bool {
        true
    }
}
