use super::{
    is_plain_word, Flavor, Function, JsonEncoding, JsonExpand, LockTarget, UpsertSyntax, COMMON_RESERVED,
    JSON_ALIAS,
};
use crate::stmt::{BuiltinType, LockMode, LockWait};

use quarry_core::Dialect;

/// The enterprise analytical engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Hana;

const RESERVED: &[&str] = &[
    "CURRENT_UTCDATE", "CURRENT_UTCTIMESTAMP", "DUMMY", "MINUS", "NOWAIT", "ROWNUM", "TOP",
    "UPSERT", "WAIT",
];

/// Row count standing in for "no limit" when only an offset is given
const UNBOUNDED_ROWS: &str = "2147483647";

impl Flavor for Hana {
    fn dialect(&self) -> Dialect {
        Dialect::Hana
    }

    fn is_reserved(&self, upper: &str) -> bool {
        COMMON_RESERVED.contains(&upper) || RESERVED.contains(&upper)
    }

    /// Unquoted names fold to upper case.
    fn is_safe_ident(&self, ident: &str) -> bool {
        is_plain_word(ident)
            && !ident.chars().any(|c| c.is_ascii_lowercase())
            && !self.is_reserved(ident)
    }

    fn placeholder(&self, _index: usize, dst: &mut String) {
        dst.push('?');
    }

    fn paginate(&self, rows: Option<&str>, offset: Option<&str>) -> Option<String> {
        match (rows, offset) {
            (Some(rows), Some(offset)) => Some(format!("LIMIT {rows} OFFSET {offset}")),
            (Some(rows), None) => Some(format!("LIMIT {rows}")),
            (None, Some(offset)) => Some(format!("LIMIT {UNBOUNDED_ROWS} OFFSET {offset}")),
            (None, None) => None,
        }
    }

    fn lock_clause(&self, mode: LockMode, wait: LockWait, targets: &[LockTarget]) -> Option<String> {
        let mut clause = match mode {
            LockMode::Update => "FOR UPDATE".to_string(),
            LockMode::Share => "FOR SHARE LOCK".to_string(),
        };

        if !targets.is_empty() {
            let columns: Vec<_> = targets.iter().map(|target| target.column.as_str()).collect();
            clause.push_str(" OF ");
            clause.push_str(&columns.join(", "));
        }

        match wait {
            LockWait::Block => {}
            LockWait::NoWait => clause.push_str(" NOWAIT"),
            // WAIT takes whole seconds
            LockWait::Timeout(ms) => clause.push_str(&format!(" WAIT {}", ms.div_ceil(1000))),
            LockWait::SkipLocked => clause.push_str(" IGNORE LOCKED"),
        }

        Some(clause)
    }

    fn function(&self, name: &str) -> Option<Function> {
        Some(match name {
            "contains" => Function::Template("LOCATE({0}, {1}) > 0"),
            "startswith" => Function::Template("LOCATE({0}, {1}) = 1"),
            "endswith" => Function::Template("RIGHT({0}, LENGTH({1})) = {1}"),
            "indexof" => Function::Template("(LOCATE({0}, {1}) - 1)"),
            "year" => Function::Call("YEAR".into()),
            "month" => Function::Call("MONTH".into()),
            "day" => Function::Call("DAYOFMONTH".into()),
            "hour" => Function::Call("HOUR".into()),
            "minute" => Function::Call("MINUTE".into()),
            "second" => Function::Template("TO_INTEGER(SECOND({0}))"),
            "now" => Function::Template("CURRENT_UTCTIMESTAMP"),
            "current_date" => Function::Template("CURRENT_UTCDATE"),
            "ceiling" => Function::Call("CEIL".into()),
            _ => return None,
        })
    }

    fn native_upsert(&self) -> Option<UpsertSyntax> {
        Some(UpsertSyntax::UpsertWithPrimaryKey)
    }

    fn multi_row_insert(&self) -> bool {
        false
    }

    fn dual_table(&self) -> Option<&'static str> {
        Some("DUMMY")
    }

    fn json_expand(&self, expand: &JsonExpand<'_>) -> String {
        let alias = self.quoted(JSON_ALIAS);
        let fields = expand
            .fields
            .iter()
            .map(|field| {
                let key = self.quoted(&field.key);
                match field.encoding {
                    JsonEncoding::Plain => format!("{alias}.{key}"),
                    JsonEncoding::Nested => format!("JSON_QUERY({alias}.{key}, '$') AS {key}"),
                    JsonEncoding::Text => format!("TO_NVARCHAR({alias}.{key}) AS {key}"),
                    JsonEncoding::Hex => format!("BINTOHEX({alias}.{key}) AS {key}"),
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let options = if expand.to_many {
            ""
        } else {
            " ('arraywrap'='no')"
        };

        format!(
            "(SELECT {fields} FROM ({}) AS {alias} FOR JSON{options})",
            expand.inner
        )
    }

    fn column_type(&self, ty: &BuiltinType, auto_increment: bool) -> String {
        use BuiltinType::*;

        if auto_increment {
            return "BIGINT GENERATED BY DEFAULT AS IDENTITY".to_string();
        }

        match ty {
            Boolean => "BOOLEAN".to_string(),
            UInt8 => "TINYINT".to_string(),
            Int16 => "SMALLINT".to_string(),
            Int32 => "INTEGER".to_string(),
            Int64 => "BIGINT".to_string(),
            Double => "DOUBLE".to_string(),
            Decimal {
                precision: Some(p),
                scale,
            } => format!("DECIMAL({p}, {})", scale.unwrap_or(0)),
            Decimal { precision: None, .. } => "DECIMAL".to_string(),
            String { length: Some(n) } => format!("NVARCHAR({n})"),
            String { length: None } => "NVARCHAR(5000)".to_string(),
            LargeString => "NCLOB".to_string(),
            Binary { length: Some(n) } => format!("VARBINARY({n})"),
            Binary { length: None } => "VARBINARY(5000)".to_string(),
            LargeBinary => "BLOB".to_string(),
            Uuid => "NVARCHAR(36)".to_string(),
            Date => "DATE".to_string(),
            Time => "TIME".to_string(),
            DateTime => "SECONDDATE".to_string(),
            Timestamp { .. } => "TIMESTAMP".to_string(),
        }
    }
}
