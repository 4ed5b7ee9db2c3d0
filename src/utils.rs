use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shorthand for `.read().unwrap()` / `.write().unwrap()` — every lock
/// in this crate is process-local and never expected to be poisoned,
/// so unwrapping a poison error here would only hide a prior panic.
pub trait HandyRwLock<T> {
    fn rl(&self) -> RwLockReadGuard<'_, T>;
    fn wl(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> HandyRwLock<T> for RwLock<T> {
    fn rl(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap()
    }

    fn wl(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap()
    }
}
