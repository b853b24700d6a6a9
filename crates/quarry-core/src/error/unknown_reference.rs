use super::Error;

/// A path segment has no matching element.
#[derive(Debug)]
pub(super) struct UnknownReferenceError {
    path: Box<str>,
    segment: Box<str>,
    scope: Box<str>,
}

impl std::error::Error for UnknownReferenceError {}

impl core::fmt::Display for UnknownReferenceError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if *self.path == *self.segment {
            write!(f, "unknown reference `{}` in `{}`", self.segment, self.scope)
        } else {
            write!(
                f,
                "unknown reference `{}`: `{}` is not an element of `{}`",
                self.path, self.segment, self.scope
            )
        }
    }
}

impl Error {
    /// Creates an unknown reference error. `path` is the full dotted
    /// reference, `segment` the one that failed, `scope` the entity (or
    /// query source) it was looked up in.
    pub fn unknown_reference(
        path: impl Into<String>,
        segment: impl Into<String>,
        scope: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::UnknownReference(UnknownReferenceError {
            path: path.into().into(),
            segment: segment.into().into(),
            scope: scope.into().into(),
        }))
    }

    /// Returns `true` if this error is an unknown reference error.
    pub fn is_unknown_reference(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::UnknownReference(_))
    }
}
