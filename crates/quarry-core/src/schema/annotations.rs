use indexmap::IndexMap;
use serde_json::Value as Json;

/// Entity or element is not backed by a table/column. Accepted in write
/// payloads and silently dropped.
pub const PERSISTENCE_SKIP: &str = "@cds.persistence.skip";

/// Marks an element as searchable (`true`) or excluded from search (`false`).
pub const SEARCH: &str = "@cds.search";

/// Annotation lookup by name.
///
/// The core only interprets [`PERSISTENCE_SKIP`] and [`SEARCH`]; everything
/// else (ranges, formats, enums) is kept for external validation layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    values: IndexMap<String, Json>,
}

impl Annotations {
    pub fn get(&self, name: &str) -> Option<&Json> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Json>) {
        self.values.insert(name.into(), value.into());
    }

    /// `true` when the annotation is present and not explicitly `false` or `null`.
    pub fn is_set(&self, name: &str) -> bool {
        !matches!(self.get(name), None | Some(Json::Bool(false)) | Some(Json::Null))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Json)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
