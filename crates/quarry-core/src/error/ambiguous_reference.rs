use super::Error;

/// A bare identifier matched elements of more than one joined source.
#[derive(Debug)]
pub(super) struct AmbiguousReferenceError {
    name: Box<str>,
    sources: Vec<String>,
}

impl std::error::Error for AmbiguousReferenceError {}

impl core::fmt::Display for AmbiguousReferenceError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "ambiguous reference `{}`: found in {}",
            self.name,
            self.sources.join(", ")
        )
    }
}

impl Error {
    /// Creates an ambiguous reference error naming every source the
    /// identifier was found in.
    pub fn ambiguous_reference(name: impl Into<String>, sources: Vec<String>) -> Error {
        Error::from(super::ErrorKind::AmbiguousReference(
            AmbiguousReferenceError {
                name: name.into().into(),
                sources,
            },
        ))
    }

    /// Returns `true` if this error is an ambiguous reference error.
    pub fn is_ambiguous_reference(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::AmbiguousReference(_))
    }
}
