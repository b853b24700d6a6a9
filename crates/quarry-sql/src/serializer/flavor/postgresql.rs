use super::{
    is_plain_word, string_literal, Flavor, Function, JsonEncoding, JsonExpand, LockTarget, UpsertSyntax,
    COMMON_RESERVED, JSON_ALIAS,
};
use crate::stmt::{BuiltinType, LockMode, LockWait};

use quarry_core::Dialect;

/// The server relational engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgresql;

const RESERVED: &[&str] = &[
    "ANALYSE", "ANALYZE", "ARRAY", "ASYMMETRIC", "BOTH", "CURRENT_USER", "DEFERRABLE", "DO",
    "FETCH", "GRANT", "INITIALLY", "LATERAL", "LEADING", "ONLY", "PLACING", "RETURNING",
    "SESSION_USER", "SOME", "SYMMETRIC", "TRAILING", "USER", "VARIADIC", "WINDOW",
];

impl Flavor for Postgresql {
    fn dialect(&self) -> Dialect {
        Dialect::Postgresql
    }

    fn is_reserved(&self, upper: &str) -> bool {
        COMMON_RESERVED.contains(&upper) || RESERVED.contains(&upper)
    }

    /// Unquoted names fold to lower case, so anything with an upper-case
    /// letter needs quotes.
    fn is_safe_ident(&self, ident: &str) -> bool {
        is_plain_word(ident)
            && !ident.chars().any(|c| c.is_ascii_uppercase())
            && !self.is_reserved(&ident.to_ascii_uppercase())
    }

    fn placeholder(&self, index: usize, dst: &mut String) {
        dst.push('$');
        dst.push_str(&index.to_string());
    }

    fn paginate(&self, rows: Option<&str>, offset: Option<&str>) -> Option<String> {
        match (rows, offset) {
            (Some(rows), Some(offset)) => Some(format!("LIMIT {rows} OFFSET {offset}")),
            (Some(rows), None) => Some(format!("LIMIT {rows}")),
            (None, Some(offset)) => Some(format!("OFFSET {offset}")),
            (None, None) => None,
        }
    }

    /// `FOR UPDATE OF` takes source aliases, not columns.
    fn lock_clause(&self, mode: LockMode, wait: LockWait, targets: &[LockTarget]) -> Option<String> {
        let mut clause = match mode {
            LockMode::Update => "FOR UPDATE".to_string(),
            LockMode::Share => "FOR SHARE".to_string(),
        };

        let mut qualifiers: Vec<&str> = vec![];
        for target in targets {
            if !qualifiers.contains(&target.qualifier.as_str()) {
                qualifiers.push(&target.qualifier);
            }
        }

        if !qualifiers.is_empty() {
            clause.push_str(" OF ");
            clause.push_str(&qualifiers.join(", "));
        }

        match wait {
            LockWait::NoWait => clause.push_str(" NOWAIT"),
            LockWait::SkipLocked => clause.push_str(" SKIP LOCKED"),
            LockWait::Block | LockWait::Timeout(_) => {}
        }

        Some(clause)
    }

    fn lock_preamble(&self, wait: LockWait) -> Option<String> {
        match wait {
            LockWait::Timeout(ms) => Some(format!("SET LOCAL lock_timeout = '{ms}ms'")),
            _ => None,
        }
    }

    fn function(&self, name: &str) -> Option<Function> {
        Some(match name {
            "contains" => Function::Template("strpos({0}, {1}) > 0"),
            "startswith" => Function::Template("starts_with({0}, {1})"),
            "endswith" => Function::Template("right({0}, length({1})) = {1}"),
            "indexof" => Function::Template("(strpos({0}, {1}) - 1)"),
            "substring" => Function::Call("SUBSTR".into()),
            "year" => Function::Template("CAST(EXTRACT(YEAR FROM {0}) AS INTEGER)"),
            "month" => Function::Template("CAST(EXTRACT(MONTH FROM {0}) AS INTEGER)"),
            "day" => Function::Template("CAST(EXTRACT(DAY FROM {0}) AS INTEGER)"),
            "hour" => Function::Template("CAST(EXTRACT(HOUR FROM {0}) AS INTEGER)"),
            "minute" => Function::Template("CAST(EXTRACT(MINUTE FROM {0}) AS INTEGER)"),
            "second" => Function::Template("CAST(FLOOR(EXTRACT(SECOND FROM {0})) AS INTEGER)"),
            "now" => Function::Template("(now() AT TIME ZONE 'UTC')"),
            "current_date" => Function::Template("CURRENT_DATE"),
            "ceiling" => Function::Call("CEIL".into()),
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
                let value = match field.encoding {
                    JsonEncoding::Plain | JsonEncoding::Nested => column,
                    JsonEncoding::Text => format!("{column}::text"),
                    JsonEncoding::Hex => format!("encode({column}, 'hex')"),
                };
                format!("{}, {value}", string_literal(&field.key))
            })
            .collect::<Vec<_>>()
            .join(", ");

        if expand.to_many {
            format!(
                "(SELECT coalesce(json_agg(json_build_object({fields})), '[]'::json) FROM ({}) AS {alias})",
                expand.inner
            )
        } else {
            format!(
                "(SELECT json_build_object({fields}) FROM ({}) AS {alias})",
                expand.inner
            )
        }
    }

    fn column_type(&self, ty: &BuiltinType, auto_increment: bool) -> String {
        use BuiltinType::*;

        if auto_increment {
            return "BIGINT GENERATED BY DEFAULT AS IDENTITY".to_string();
        }

        match ty {
            Boolean => "BOOLEAN".to_string(),
            UInt8 | Int16 => "SMALLINT".to_string(),
            Int32 => "INTEGER".to_string(),
            Int64 => "BIGINT".to_string(),
            Double => "DOUBLE PRECISION".to_string(),
            Decimal {
                precision: Some(p),
                scale,
            } => format!("DECIMAL({p}, {})", scale.unwrap_or(0)),
            Decimal { precision: None, .. } => "DECIMAL".to_string(),
            String { length: Some(n) } => format!("VARCHAR({n})"),
            String { length: None } => "VARCHAR(5000)".to_string(),
            LargeString => "TEXT".to_string(),
            Binary { .. } | LargeBinary => "BYTEA".to_string(),
            Uuid => "VARCHAR(36)".to_string(),
            Date => "DATE".to_string(),
            Time => "TIME".to_string(),
            DateTime => "TIMESTAMP(0)".to_string(),
            Timestamp { .. } => "TIMESTAMP".to_string(),
        }
    }
}
