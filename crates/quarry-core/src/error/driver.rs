use super::Error;
use crate::Dialect;

/// Backend failure without a stable mapping into the taxonomy. Tagged with the
/// dialect that produced it.
#[derive(Debug)]
pub(super) struct DriverError {
    dialect: Dialect,
    inner: Box<dyn std::error::Error + Send + Sync>,
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "[{}] ", self.dialect)?;
        core::fmt::Display::fmt(&self.inner, f)?;
        let mut source = self.inner.source();
        while let Some(err) = source {
            write!(f, ": {}", err)?;
            source = err.source();
        }
        Ok(())
    }
}

impl Error {
    /// Creates an error from a driver error.
    ///
    /// Driver crates call this only after trying the stable mappings
    /// (constraint violations, lock failures).
    pub fn driver(dialect: Dialect, err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::from(super::ErrorKind::Driver(DriverError {
            dialect,
            inner: Box::new(err),
        }))
    }

    /// Returns `true` if this error is a pass-through driver error.
    pub fn is_driver(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::Driver(_))
    }

    /// The dialect that produced a pass-through driver error.
    pub fn dialect(&self) -> Option<Dialect> {
        match self.root_kind() {
            super::ErrorKind::Driver(err) => Some(err.dialect),
            super::ErrorKind::Lock(err) => Some(err.dialect),
            _ => None,
        }
    }
}
