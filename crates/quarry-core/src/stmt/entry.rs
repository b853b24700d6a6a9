use super::Value;
use crate::Result;

use indexmap::IndexMap;
use serde_json::Value as Json;

/// A write payload: an ordered map of element name to value, possibly
/// nesting composition children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    pub fields: IndexMap<String, EntryValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    Value(Value),

    /// A to-one child
    One(Entry),

    /// To-many children
    Many(Vec<Entry>),
}

impl Entry {
    pub fn new() -> Entry {
        Entry::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<EntryValue>) -> Entry {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<EntryValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&EntryValue> {
        self.fields.get(name)
    }

    /// The scalar value of a field, if it holds one.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(EntryValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<EntryValue> {
        self.fields.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryValue)> + '_ {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds an entry from a JSON object.
    ///
    /// Nested objects become to-one children, arrays of objects become
    /// to-many children. Any other array is kept as a list value.
    pub fn from_json(json: Json) -> Result<Entry> {
        let Json::Object(map) = json else {
            crate::bail!("write payload must be a JSON object; got {json}");
        };

        let mut entry = Entry::new();

        for (name, value) in map {
            let value = match value {
                Json::Object(_) => EntryValue::One(Entry::from_json(value)?),
                Json::Array(items) if items.iter().all(Json::is_object) && !items.is_empty() => {
                    EntryValue::Many(
                        items
                            .into_iter()
                            .map(Entry::from_json)
                            .collect::<Result<_>>()?,
                    )
                }
                value => EntryValue::Value(Value::from_json(value)),
            };

            entry.fields.insert(name, value);
        }

        Ok(entry)
    }

    /// Parses every item of a JSON array (or a single object) into entries.
    pub fn many_from_json(json: Json) -> Result<Vec<Entry>> {
        match json {
            Json::Array(items) => items.into_iter().map(Entry::from_json).collect(),
            json => Ok(vec![Entry::from_json(json)?]),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for EntryValue {
                fn from(value: $ty) -> Self {
                    EntryValue::Value(value.into())
                }
            }
        )*
    };
}

impl_from_value!(
    Value,
    bool,
    i32,
    i64,
    f64,
    &str,
    String,
    rust_decimal::Decimal,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    Vec<u8>
);

impl From<Entry> for EntryValue {
    fn from(value: Entry) -> Self {
        EntryValue::One(value)
    }
}

impl From<Vec<Entry>> for EntryValue {
    fn from(value: Vec<Entry>) -> Self {
        EntryValue::Many(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_json() {
        let entry = Entry::from_json(json!({
            "ID": 1,
            "title": "A",
            "author": { "ID": 7 },
            "chapters": [{ "no": 1 }, { "no": 2 }],
            "tags": ["x", "y"],
            "empty": [],
        }))
        .unwrap();

        assert_eq!(entry.value("ID"), Some(&Value::I64(1)));
        assert!(matches!(entry.get("author"), Some(EntryValue::One(_))));
        assert!(matches!(entry.get("chapters"), Some(EntryValue::Many(c)) if c.len() == 2));
        assert!(matches!(entry.get("tags"), Some(EntryValue::Value(Value::List(_)))));
        assert!(matches!(entry.get("empty"), Some(EntryValue::Value(Value::List(l))) if l.is_empty()));
    }

    #[test]
    fn rejects_scalars() {
        assert!(Entry::from_json(json!(1)).is_err());
    }
}
