use super::Error;

/// A unique or primary-key constraint rejected an insert.
#[derive(Debug)]
pub(super) struct EntityAlreadyExistsError {
    message: Box<str>,
}

impl std::error::Error for EntityAlreadyExistsError {}

impl core::fmt::Display for EntityAlreadyExistsError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "entity already exists: {}", self.message)
    }
}

impl Error {
    /// Creates an entity-already-exists error from a backend constraint message.
    pub fn entity_already_exists(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::EntityAlreadyExists(
            EntityAlreadyExistsError {
                message: message.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is an entity-already-exists error.
    pub fn is_entity_already_exists(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::EntityAlreadyExists(_))
    }
}
