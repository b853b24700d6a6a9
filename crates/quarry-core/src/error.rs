mod adhoc;
mod ambiguous_reference;
mod circular_composition;
mod connection_pool;
mod driver;
mod entity_already_exists;
mod invalid_decimal;
mod invalid_type;
mod lock;
mod multiple_errors;
mod unknown_column;
mod unknown_reference;
mod unsupported_construct;

use adhoc::AdhocError;
use ambiguous_reference::AmbiguousReferenceError;
use circular_composition::CircularCompositionError;
use connection_pool::ConnectionPoolError;
use driver::DriverError;
use entity_already_exists::EntityAlreadyExistsError;
use invalid_decimal::InvalidDecimalError;
use invalid_type::InvalidTypeError;
use lock::LockError;
use multiple_errors::MultipleErrors;
use std::sync::Arc;
use unknown_column::UnknownColumnError;
use unknown_reference::UnknownReferenceError;
use unsupported_construct::UnsupportedConstructError;

/// Return early with an ad-hoc error built from format arguments.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Build an ad-hoc error from format arguments.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error that can occur in Quarry.
///
/// Every error carries a machine-readable kind (see [`Error::kind_name`]) and a
/// human-readable message (its `Display` output).
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

impl Error {
    /// Adds context to this error.
    ///
    /// Context is displayed in reverse order: the most recently added context is shown first,
    /// followed by earlier context, ending with the root cause.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let kind = match consequent.inner {
            Some(inner) => match Arc::try_unwrap(inner) {
                Ok(inner) => {
                    assert!(
                        inner.cause.is_none(),
                        "consequent error must not already have a cause"
                    );
                    inner.kind
                }
                Err(shared) => ErrorKind::Adhoc(AdhocError::new(shared.kind.to_string())),
            },
            None => ErrorKind::Unknown,
        };

        Error {
            inner: Some(Arc::new(ErrorInner {
                kind,
                cause: Some(self),
            })),
        }
    }

    /// The root cause at the end of the context chain.
    pub fn root(&self) -> &Error {
        self.chain().last().unwrap_or(self)
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }

    /// The kind of the root cause, used by the `is_*` predicates so that
    /// context added on the way up does not hide the original failure.
    fn root_kind(&self) -> &ErrorKind {
        self.root().kind()
    }

    /// Machine-readable name of the root error kind.
    pub fn kind_name(&self) -> &'static str {
        use ErrorKind::*;

        match self.root_kind() {
            Adhoc(_) | Anyhow(_) | Unknown => "Error",
            AmbiguousReference(_) => "AmbiguousReference",
            CircularComposition(_) => "CircularComposition",
            ConnectionPool(_) => "ConnectionPool",
            Driver(_) => "Driver",
            EntityAlreadyExists(_) => "EntityAlreadyExists",
            InvalidDecimal(_) => "InvalidDecimal",
            InvalidType(_) => "InvalidType",
            Lock(err) if err.timeout => "LockTimeout",
            Lock(_) => "LockConflict",
            MultipleErrors(_) => "MULTIPLE_ERRORS",
            UnknownColumn(_) => "UnknownColumn",
            UnknownReference(_) => "UnknownReference",
            UnsupportedConstruct(_) => "UnsupportedConstruct",
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Driver(err) => Some(err),
            ErrorKind::ConnectionPool(err) => Some(err),
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            let Some(ref inner) = self.inner else {
                return f.debug_struct("Error").field("kind", &"None").finish();
            };
            f.debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish()
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Adhoc(AdhocError),
    AmbiguousReference(AmbiguousReferenceError),
    CircularComposition(CircularCompositionError),
    ConnectionPool(ConnectionPoolError),
    Driver(DriverError),
    EntityAlreadyExists(EntityAlreadyExistsError),
    InvalidDecimal(InvalidDecimalError),
    InvalidType(InvalidTypeError),
    Lock(LockError),
    MultipleErrors(MultipleErrors),
    UnknownColumn(UnknownColumnError),
    UnknownReference(UnknownReferenceError),
    UnsupportedConstruct(UnsupportedConstructError),
    Unknown,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            AmbiguousReference(err) => core::fmt::Display::fmt(err, f),
            CircularComposition(err) => core::fmt::Display::fmt(err, f),
            ConnectionPool(err) => core::fmt::Display::fmt(err, f),
            Driver(err) => core::fmt::Display::fmt(err, f),
            EntityAlreadyExists(err) => core::fmt::Display::fmt(err, f),
            InvalidDecimal(err) => core::fmt::Display::fmt(err, f),
            InvalidType(err) => core::fmt::Display::fmt(err, f),
            Lock(err) => core::fmt::Display::fmt(err, f),
            MultipleErrors(err) => core::fmt::Display::fmt(err, f),
            UnknownColumn(err) => core::fmt::Display::fmt(err, f),
            UnknownReference(err) => core::fmt::Display::fmt(err, f),
            UnsupportedConstruct(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown quarry error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Some(Arc::new(ErrorInner { kind, cause: None })),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

/// Trait for types that can be converted into an Error.
pub trait IntoError {
    /// Converts this type into an Error.
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}
