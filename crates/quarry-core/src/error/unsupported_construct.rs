use super::Error;

/// The query uses a construct that cannot be compiled.
///
/// Raised for structural rules such as a to-many path used outside an
/// aggregate or quantifier, `expand` on a non-association, or a wildcard
/// over a join whose sources share column names.
#[derive(Debug)]
pub(super) struct UnsupportedConstructError {
    message: Box<str>,
}

impl std::error::Error for UnsupportedConstructError {}

impl core::fmt::Display for UnsupportedConstructError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unsupported construct: {}", self.message)
    }
}

impl Error {
    pub fn unsupported_construct(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnsupportedConstruct(
            UnsupportedConstructError {
                message: message.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is an unsupported construct error.
    pub fn is_unsupported_construct(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::UnsupportedConstruct(_))
    }
}
