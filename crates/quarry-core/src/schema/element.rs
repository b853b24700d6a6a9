use super::{Annotations, Association, BuiltinType, PERSISTENCE_SKIP};
use crate::stmt::Expr;

#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,

    pub ty: ElementTy,

    /// True if the element is part of the entity key
    pub key: bool,

    /// Virtual elements are accepted in payloads but never persisted or
    /// selected by a wildcard.
    pub is_virtual: bool,

    /// Values are read through the entity's texts table for the active locale
    pub localized: bool,

    pub not_null: bool,

    /// Specified if and how quarry should populate this element for new rows
    pub auto: Option<AutoStrategy>,

    /// Set on foreign key elements generated for a managed association; names
    /// the association.
    pub foreign_key_of: Option<String>,

    pub annotations: Annotations,
}

#[derive(Debug, Clone)]
pub enum ElementTy {
    Primitive(BuiltinType),
    Association(Association),
    Calculated(Calculated),
}

/// An element computed from other elements of the same entity on read.
#[derive(Debug, Clone)]
pub struct Calculated {
    pub expr: Expr,
    pub ty: BuiltinType,
}

/// How quarry should populate a key for new rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoStrategy {
    /// A v4 UUID generated while planning the insert
    Uuid,

    /// Generated by the backend when the row is inserted
    Increment,
}

impl Element {
    /// The builtin type of a primitive or calculated element.
    pub fn builtin(&self) -> Option<&BuiltinType> {
        match &self.ty {
            ElementTy::Primitive(ty) => Some(ty),
            ElementTy::Calculated(calculated) => Some(&calculated.ty),
            ElementTy::Association(_) => None,
        }
    }

    pub fn association(&self) -> Option<&Association> {
        match &self.ty {
            ElementTy::Association(association) => Some(association),
            _ => None,
        }
    }

    pub fn calculated(&self) -> Option<&Calculated> {
        match &self.ty {
            ElementTy::Calculated(calculated) => Some(calculated),
            _ => None,
        }
    }

    pub fn is_association(&self) -> bool {
        matches!(self.ty, ElementTy::Association(_))
    }

    pub fn is_composition(&self) -> bool {
        self.association().map(|a| a.composition).unwrap_or(false)
    }

    pub fn persistence_skip(&self) -> bool {
        self.annotations.is_set(PERSISTENCE_SKIP)
    }

    /// `true` for elements backed by a table column.
    pub fn is_column(&self) -> bool {
        matches!(self.ty, ElementTy::Primitive(_)) && !self.is_virtual && !self.persistence_skip()
    }

    pub fn is_auto_increment(&self) -> bool {
        matches!(self.auto, Some(AutoStrategy::Increment))
    }
}
