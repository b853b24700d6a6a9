use super::Error;

/// A decimal value does not fit the declared precision and scale.
#[derive(Debug)]
pub(super) struct InvalidDecimalError {
    value: Box<str>,
    precision: u32,
    scale: u32,
}

impl std::error::Error for InvalidDecimalError {}

impl core::fmt::Display for InvalidDecimalError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "invalid decimal `{}`: does not fit Decimal({}, {})",
            self.value, self.precision, self.scale
        )
    }
}

impl Error {
    /// Creates an invalid decimal error.
    pub fn invalid_decimal(value: impl Into<String>, precision: u32, scale: u32) -> Error {
        Error::from(super::ErrorKind::InvalidDecimal(InvalidDecimalError {
            value: value.into().into(),
            precision,
            scale,
        }))
    }

    /// Returns `true` if this error is an invalid decimal error.
    pub fn is_invalid_decimal(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::InvalidDecimal(_))
    }
}
