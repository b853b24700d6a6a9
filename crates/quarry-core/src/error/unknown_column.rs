use super::Error;

/// A write payload names a column the entity does not have (strict mode).
#[derive(Debug)]
pub(super) struct UnknownColumnError {
    entity: Box<str>,
    column: Box<str>,
}

impl std::error::Error for UnknownColumnError {}

impl core::fmt::Display for UnknownColumnError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "unknown column `{}` in entity `{}`",
            self.column, self.entity
        )
    }
}

impl Error {
    pub fn unknown_column(entity: impl Into<String>, column: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnknownColumn(UnknownColumnError {
            entity: entity.into().into(),
            column: column.into().into(),
        }))
    }

    /// Returns `true` if this error is an unknown column error.
    pub fn is_unknown_column(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::UnknownColumn(_))
    }
}
