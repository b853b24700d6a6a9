use super::Error;

/// A value cannot be converted to the element's declared type, or a type
/// declaration cannot be resolved.
#[derive(Debug)]
pub(super) struct InvalidTypeError {
    value: Box<str>,
    expected: Box<str>,
}

impl std::error::Error for InvalidTypeError {}

impl core::fmt::Display for InvalidTypeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid type: cannot convert {} to {}", self.value, self.expected)
    }
}

impl Error {
    /// Creates an invalid type error. `value` is a short description of the
    /// offending input, `expected` names the target type.
    pub fn invalid_type(value: impl Into<String>, expected: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidType(InvalidTypeError {
            value: value.into().into(),
            expected: expected.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid type error.
    pub fn is_invalid_type(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::InvalidType(_))
    }
}
