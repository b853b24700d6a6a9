use super::Value;

use indexmap::IndexMap;
use std::ops;

/// Named values in order. Rows are returned as records.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValueRecord {
    pub fields: IndexMap<String, Value>,
}

impl ValueRecord {
    pub fn new() -> ValueRecord {
        ValueRecord::default()
    }

    pub fn with_capacity(capacity: usize) -> ValueRecord {
        ValueRecord {
            fields: IndexMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> ValueRecord {
        self.insert(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }
}

impl ops::Index<&str> for ValueRecord {
    type Output = Value;

    fn index(&self, index: &str) -> &Self::Output {
        self.fields.get(index).unwrap_or(&Value::Null)
    }
}

impl FromIterator<(String, Value)> for ValueRecord {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        ValueRecord {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValueRecord {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
