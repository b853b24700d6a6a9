use quarry_core::{
    convert::Registry,
    schema::BuiltinType,
    stmt::{Value, ValueRecord},
    Result,
};

/// Output layout of a compiled select, in the order the caller asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Shape {
    pub(crate) fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Field {
    pub(crate) name: String,

    /// Index of the column in the emitted select list
    pub(crate) position: usize,

    pub(crate) kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldKind {
    Scalar(Option<BuiltinType>),

    /// Rows of an expand, delivered as one JSON column
    Json { to_many: bool, fields: Vec<Field> },
}

impl Field {
    pub(crate) fn scalar(name: impl Into<String>, ty: Option<BuiltinType>) -> Field {
        Field {
            name: name.into(),
            position: 0,
            kind: FieldKind::Scalar(ty),
        }
    }

    pub(crate) fn scalar_ty(&self) -> Option<BuiltinType> {
        match &self.kind {
            FieldKind::Scalar(ty) => ty.clone(),
            FieldKind::Json { .. } => None,
        }
    }
}

impl Shape {
    /// Turns one driver row, a list of storage values in select-list order,
    /// into a record.
    pub(crate) fn decode(&self, registry: &Registry, row: Value) -> Result<Value> {
        let mut columns = match row {
            Value::List(columns) => columns,
            other => quarry_core::bail!("expected a row; got {}", other.kind()),
        };

        let mut record = ValueRecord::with_capacity(self.fields.len());

        for field in &self.fields {
            let value = match columns.get_mut(field.position) {
                Some(value) => std::mem::replace(value, Value::Null),
                None => quarry_core::bail!(
                    "row has {} columns; `{}` expected at {}",
                    columns.len(),
                    field.name,
                    field.position
                ),
            };

            record.insert(&field.name, decode_field(registry, field, value)?);
        }

        Ok(Value::Record(record))
    }
}

fn decode_field(registry: &Registry, field: &Field, value: Value) -> Result<Value> {
    match &field.kind {
        FieldKind::Scalar(None) => Ok(value),
        FieldKind::Scalar(Some(ty)) => registry.from_storage(value, ty),
        FieldKind::Json { to_many, fields } => {
            let json = match value {
                Value::Null => return Ok(if *to_many { Value::List(vec![]) } else { Value::Null }),
                Value::String(text) => serde_json::from_str(&text)?,
                other => quarry_core::bail!(
                    "expand `{}` expected JSON text; got {}",
                    field.name,
                    other.kind()
                ),
            };

            decode_json(registry, &field.name, fields, Value::from_json(json), *to_many)
        }
    }
}

/// Decodes the nested value of an expand. Objects are re-keyed in requested
/// field order.
fn decode_json(
    registry: &Registry,
    name: &str,
    fields: &[Field],
    value: Value,
    to_many: bool,
) -> Result<Value> {
    match (value, to_many) {
        (Value::Null, false) => Ok(Value::Null),
        (Value::Null, true) => Ok(Value::List(vec![])),
        (Value::List(rows), true) => rows
            .into_iter()
            .map(|row| decode_object(registry, name, fields, row))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        // A to-one expand may arrive wrapped in a single-element array
        (Value::List(mut rows), false) if rows.len() <= 1 => match rows.pop() {
            Some(row) => decode_object(registry, name, fields, row),
            None => Ok(Value::Null),
        },
        (row @ Value::Record(_), false) => decode_object(registry, name, fields, row),
        (other, _) => quarry_core::bail!("expand `{name}` has unexpected {}", other.kind()),
    }
}

fn decode_object(registry: &Registry, name: &str, fields: &[Field], row: Value) -> Result<Value> {
    let Value::Record(mut object) = row else {
        quarry_core::bail!("expand `{name}` expected an object; got {}", row.kind());
    };

    let mut record = ValueRecord::with_capacity(fields.len());

    for field in fields {
        let value = object.fields.shift_remove(&field.name).unwrap_or(Value::Null);

        let value = match &field.kind {
            FieldKind::Json { to_many, fields } => {
                // Backends that cannot nest JSON deliver the inner document as text
                let value = match value {
                    Value::String(text) => Value::from_json(serde_json::from_str(&text)?),
                    value => value,
                };
                decode_json(registry, &field.name, fields, value, *to_many)?
            }
            FieldKind::Scalar(Some(BuiltinType::Binary { .. } | BuiltinType::LargeBinary)) => {
                decode_field(registry, field, unhex(&field.name, value)?)?
            }
            FieldKind::Scalar(_) => decode_field(registry, field, value)?,
        };

        record.insert(&field.name, value);
    }

    Ok(Value::Record(record))
}

/// Binary columns travel through JSON as hex text.
fn unhex(name: &str, value: Value) -> Result<Value> {
    match value {
        Value::String(text) => match hex::decode(&text) {
            Ok(bytes) => Ok(Value::Bytes(bytes)),
            Err(err) => quarry_core::bail!("expand field `{name}` is not hex encoded: {err}"),
        },
        value => Ok(value),
    }
}
