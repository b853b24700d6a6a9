mod annotations;
pub use annotations::{Annotations, PERSISTENCE_SKIP, SEARCH};

mod association;
pub use association::{Association, AssociationOn, Cardinality, KeyPair};

mod builder;
pub use builder::{Builder, ElementDef, EntityBuilder};

mod element;
pub use element::{AutoStrategy, Calculated, Element, ElementTy};

mod entity;
pub use entity::Entity;

mod ty;
pub use ty::{BuiltinType, TypeDef, TypeRef};

use crate::{Error, Result};
use indexmap::IndexMap;

/// Immutable model metadata: every entity, its elements, and the named
/// types they were declared with.
///
/// A `Schema` is produced once by [`Builder::build`] and shared behind an
/// `Arc` for the lifetime of every plan compiled against it.
#[derive(Debug, Default)]
pub struct Schema {
    /// Entities in declaration order, keyed by qualified name.
    pub entities: IndexMap<String, Entity>,

    /// Named types, kept for introspection. Elements already carry their
    /// resolved builtin type.
    pub types: IndexMap<String, TypeDef>,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Looks up an entity by qualified name.
    pub fn entity(&self, name: &str) -> Result<&Entity> {
        self.entities
            .get(name)
            .ok_or_else(|| Error::unknown_reference(name, name, "model"))
    }

    pub fn get_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Target entity of an association element.
    pub fn target_of(&self, association: &Association) -> Result<&Entity> {
        self.entity(&association.target)
    }

    /// Entities that are persisted as tables.
    pub fn tables(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities
            .values()
            .filter(|entity| !entity.persistence_skip())
    }
}
