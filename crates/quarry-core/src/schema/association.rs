use crate::stmt::Expr;

/// A typed reference from one entity to another.
#[derive(Debug, Clone)]
pub struct Association {
    /// Qualified name of the target entity
    pub target: String,

    pub cardinality: Cardinality,

    /// Compositions own their targets: target rows are written and deleted
    /// together with the source row.
    pub composition: bool,

    /// How source and target rows are matched.
    pub on: AssociationOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// Join condition of an association.
///
/// Key-based forms are a list of pairs meaning `source.<source> =
/// target.<target>` for every pair.
#[derive(Debug, Clone)]
pub enum AssociationOn {
    /// Managed association: the foreign key elements live on the source
    /// entity and reference the target's keys.
    ForeignKey(Vec<KeyPair>),

    /// The target holds a managed association (`via`) back to the source;
    /// pairs reference the source keys from the target's foreign keys.
    Backlink { via: String, pairs: Vec<KeyPair> },

    /// Unmanaged association with an explicit condition. `$self` refers to the
    /// source row, the association's own name to the target row.
    Condition(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// Element on the source entity
    pub source: String,

    /// Element on the target entity
    pub target: String,
}

impl Association {
    pub fn is_to_many(&self) -> bool {
        matches!(self.cardinality, Cardinality::ToMany)
    }

    pub fn is_to_one(&self) -> bool {
        matches!(self.cardinality, Cardinality::ToOne)
    }

    /// Key pairs for key-based associations, `None` for explicit conditions.
    pub fn key_pairs(&self) -> Option<&[KeyPair]> {
        match &self.on {
            AssociationOn::ForeignKey(pairs) => Some(pairs),
            AssociationOn::Backlink { pairs, .. } => Some(pairs),
            AssociationOn::Condition(_) => None,
        }
    }

    /// `true` when the foreign key elements live on the source entity. The
    /// target row must then exist (or have its key materialized) before the
    /// source row is written.
    pub fn is_foreign_key(&self) -> bool {
        matches!(self.on, AssociationOn::ForeignKey(_))
    }

    pub fn is_backlink(&self) -> bool {
        matches!(self.on, AssociationOn::Backlink { .. })
    }
}
