use super::Error;
use crate::Dialect;

/// A row lock could not be acquired.
#[derive(Debug)]
pub(super) struct LockError {
    /// `true` when the lock was waited for and the wait elapsed, `false` when
    /// the lock policy asked to fail immediately.
    pub(super) timeout: bool,
    pub(super) dialect: Dialect,
    message: Box<str>,
}

impl std::error::Error for LockError {}

impl core::fmt::Display for LockError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.timeout {
            write!(f, "[{}] lock wait timed out: {}", self.dialect, self.message)
        } else {
            write!(f, "[{}] resource already locked: {}", self.dialect, self.message)
        }
    }
}

impl Error {
    /// The lock is held by another transaction and the caller asked not to wait.
    pub fn lock_conflict(dialect: Dialect, message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Lock(LockError {
            timeout: false,
            dialect,
            message: message.into().into(),
        }))
    }

    /// The lock was still held when the requested wait elapsed.
    pub fn lock_timeout(dialect: Dialect, message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Lock(LockError {
            timeout: true,
            dialect,
            message: message.into().into(),
        }))
    }

    /// Returns `true` for both lock conflicts and lock timeouts.
    pub fn is_locked(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::Lock(_))
    }

    pub fn is_lock_conflict(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::Lock(err) if !err.timeout)
    }

    pub fn is_lock_timeout(&self) -> bool {
        matches!(self.root_kind(), super::ErrorKind::Lock(err) if err.timeout)
    }
}
