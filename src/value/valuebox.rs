//! Last-write-wins capture slot.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    RwLock,
};

use crate::value::Value;

/// Uniform container for the most recently captured argument.
///
/// A `ValueBox` starts empty, and every [`store`](Self::store) overwrites whatever it
/// held before, regardless of the kind of the previous value. No history is kept: only
/// the latest capture is observable.
///
/// # Thread Safety
///
/// Stores and reads are guarded by an [`RwLock`], so a reader never observes a torn
/// value even when several threads invoke the intercepted selector at once. Racing
/// writers are ordered only by lock acquisition; the last one to acquire wins.
///
/// # Examples
///
/// ```rust
/// use argspy::{Value, ValueBox};
///
/// let slot = ValueBox::new();
/// assert_eq!(slot.read(), None);
///
/// slot.store(Value::I32(42));
/// slot.store(Value::from("now a string"));
/// assert_eq!(slot.read(), Some(Value::from("now a string")));
/// assert_eq!(slot.capture_count(), 2);
///
/// slot.clear();
/// assert!(slot.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ValueBox {
    slot: RwLock<Option<Value>>,
    captures: AtomicUsize,
}

impl ValueBox {
    /// Creates an empty box.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value`, overwriting any prior content.
    pub fn store(&self, value: Value) {
        let mut slot = write_lock_infallible!(self.slot);
        *slot = Some(value);
        self.captures.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns the last stored value, or `None` if nothing was stored since creation
    /// or the last [`clear`](Self::clear).
    #[must_use]
    pub fn read(&self) -> Option<Value> {
        read_lock_infallible!(self.slot).clone()
    }

    /// Resets the box to empty and the capture counter to zero.
    pub fn clear(&self) {
        let mut slot = write_lock_infallible!(self.slot);
        *slot = None;
        self.captures.store(0, Ordering::Release);
    }

    /// Returns `true` if no value is currently held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read_lock_infallible!(self.slot).is_none()
    }

    /// Number of stores since creation or the last [`clear`](Self::clear).
    #[must_use]
    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::Acquire)
    }
}
