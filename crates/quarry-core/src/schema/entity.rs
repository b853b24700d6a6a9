use super::{Annotations, Association, Element, PERSISTENCE_SKIP, SEARCH};
use crate::{Error, Result};
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct Entity {
    /// Qualified name, e.g. `sap.capire.bookshop.Books`
    pub name: String,

    /// Name of the backing table
    pub table: String,

    /// Elements in declaration order
    pub elements: IndexMap<String, Element>,

    /// Names of the key elements, in declaration order
    pub keys: Vec<String>,

    /// Name of the generated texts entity when any element is localized
    pub texts: Option<String>,

    pub annotations: Annotations,
}

impl Entity {
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.get(name)
    }

    /// Looks up an element, failing with `UnknownReference`.
    pub fn expect_element(&self, name: &str) -> Result<&Element> {
        self.element(name)
            .ok_or_else(|| Error::unknown_reference(name, name, &self.name))
    }

    pub fn association(&self, name: &str) -> Option<&Association> {
        self.element(name).and_then(Element::association)
    }

    pub fn key_elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.keys.iter().filter_map(|key| self.elements.get(key))
    }

    /// Elements backed by a table column, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &Element> + '_ {
        self.elements.values().filter(|element| element.is_column())
    }

    /// Composition elements whose target is persisted.
    pub fn compositions(&self) -> impl Iterator<Item = (&Element, &Association)> + '_ {
        self.elements.values().filter_map(|element| match element.association() {
            Some(association) if association.composition && !element.persistence_skip() => {
                Some((element, association))
            }
            _ => None,
        })
    }

    pub fn persistence_skip(&self) -> bool {
        self.annotations.is_set(PERSISTENCE_SKIP)
    }

    pub fn is_localized(&self) -> bool {
        self.texts.is_some()
    }

    /// Elements searched by a `search` clause. Annotated elements win; without
    /// any annotation every string column is searched.
    pub fn searchable(&self) -> Vec<&Element> {
        let annotated: Vec<_> = self
            .elements
            .values()
            .filter(|element| element.annotations.get(SEARCH).is_some())
            .collect();

        if annotated.is_empty() {
            self.columns()
                .filter(|element| element.builtin().map(|ty| ty.is_string()).unwrap_or(false))
                .filter(|element| !element.key)
                .collect()
        } else {
            annotated
                .into_iter()
                .filter(|element| element.annotations.is_set(SEARCH))
                .collect()
        }
    }
}
