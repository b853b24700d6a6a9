use super::Error;

/// Several errors collected across the statements of one logical operation.
#[derive(Debug)]
pub(super) struct MultipleErrors {
    pub(super) errors: Vec<Error>,
}

impl std::error::Error for MultipleErrors {}

impl core::fmt::Display for MultipleErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("MULTIPLE_ERRORS: ")?;

        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            core::fmt::Display::fmt(err, f)?;
        }

        Ok(())
    }
}

impl Error {
    /// Combines collected errors. A single error is returned as is.
    ///
    /// # Panics
    ///
    /// Panics if `errors` is empty.
    pub fn multiple(mut errors: Vec<Error>) -> Error {
        assert!(!errors.is_empty(), "no errors to combine");

        if errors.len() == 1 {
            return errors.remove(0);
        }

        Error::from(super::ErrorKind::MultipleErrors(MultipleErrors { errors }))
    }

    /// Returns `true` if this error aggregates several errors.
    pub fn is_multiple(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::MultipleErrors(_))
    }

    /// The aggregated errors, empty unless this is a `MULTIPLE_ERRORS`.
    pub fn sub_errors(&self) -> &[Error] {
        match self.root_kind() {
            super::ErrorKind::MultipleErrors(err) => &err.errors,
            _ => &[],
        }
    }
}
