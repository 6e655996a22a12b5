#![allow(unused_macros)]

/// Helper macro for reading locked items
///
/// Poisoned locks surface as [`crate::Error::LockError`] through `?`.
///
/// ```rust, ignore
///  let entries = read_lock!(self.entries);
///  let entry = entries.get(selector).cloned();
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock.read().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for writing to locked items
///
/// Poisoned locks surface as [`crate::Error::LockError`] through `?`.
///
/// ```rust, ignore
///  let mut entries = write_lock!(self.entries);
///  entries.insert(selector, entry);
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock.write().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for reading locked items that can never be left half-written
///
/// Recovers the guard from a poisoned lock instead of failing. Only use this for
/// slots whose writers perform a single assignment.
///
/// ```rust, ignore
///  let value = read_lock_infallible!(self.slot).clone();
/// ```
macro_rules! read_lock_infallible {
    ($rwlock:expr) => {
        $rwlock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for writing to locked items that can never be left half-written
///
/// ```rust, ignore
///  *write_lock_infallible!(self.slot) = Some(value);
/// ```
macro_rules! write_lock_infallible {
    ($rwlock:expr) => {
        $rwlock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}
