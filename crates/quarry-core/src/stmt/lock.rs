use super::Path;

/// `forUpdate` / `forShareLock` request.
#[derive(Debug, Clone, PartialEq)]
pub struct Lock {
    pub mode: LockMode,

    /// Columns to lock. Empty locks the whole row.
    pub columns: Vec<Path>,

    pub wait: LockWait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Update,
    Share,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockWait {
    /// Wait until the lock is released
    Block,

    /// Wait up to the given number of milliseconds, then fail
    Timeout(u64),

    /// Fail immediately if the row is locked
    NoWait,

    /// Skip locked rows
    SkipLocked,
}

impl Lock {
    pub fn new(mode: LockMode, wait: LockWait) -> Lock {
        Lock {
            mode,
            columns: vec![],
            wait,
        }
    }

    pub fn of(mut self, column: impl Into<Path>) -> Lock {
        self.columns.push(column.into());
        self
    }
}

impl LockWait {
    /// `wait` expressed in milliseconds. Zero fails immediately.
    pub fn millis(ms: u64) -> LockWait {
        if ms == 0 {
            LockWait::NoWait
        } else {
            LockWait::Timeout(ms)
        }
    }
}
