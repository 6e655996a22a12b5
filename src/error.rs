use thiserror::Error;

use crate::{
    dispatch::{Selector, TargetId},
    spy::SpyKey,
    value::{Value, ValueKind},
};

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure is reported synchronously at the point of the offending operation and
/// nothing is retried. A misconfigured spy fails loudly at install time instead of
/// silently reporting "no capture" later.
///
/// # Error Categories
///
/// ## Installation Errors
/// - [`Error::InvalidArgumentIndex`] - Capture index is negative or not below the arity
/// - [`Error::UnknownSelector`] - Target neither implements nor can resolve the selector
/// - [`Error::InstallationConflict`] - Dispatch slot was changed behind the spy's back
/// - [`Error::DuplicateSpy`] - Second spy on the same key under the reject policy
///
/// ## Query Errors
/// - [`Error::SpyDisposed`] - The handle was disposed (explicitly, by drop or teardown)
/// - [`Error::SpyDisplaced`] - A newer spy replaced this one on the same key
/// - [`Error::NothingCaptured`] - An argument was required but no call was observed
/// - [`Error::UnexpectedCall`] - A call was observed where none was expected
///
/// ## Dispatch Errors
/// - [`Error::ArityMismatch`] - Message sent with the wrong number of arguments
/// - [`Error::ValueConversion`] - Captured value has a different kind than requested
/// - [`Error::Method`] - Raised by a method implementation
///
/// ## Lifecycle Errors
/// - [`Error::TeardownFailed`] - Bulk teardown could not restore every dispatch slot
/// - [`Error::LockError`] - A lock guarding a method table was poisoned
///
/// # Examples
///
/// ```rust
/// use argspy::{Class, Error, Selector, SpyOptions, SpyRegistry, Value};
///
/// let class = Class::builder("Thermostat")
///     .method(Selector::parse("setTarget:"), |_| Ok(Value::Void))
///     .build();
/// let thermostat = class.instantiate();
/// let registry = SpyRegistry::new();
///
/// match registry.install_spy(&thermostat, &Selector::parse("setTarget:"), 3, SpyOptions::new()) {
///     Err(Error::InvalidArgumentIndex { index, arity, .. }) => {
///         assert_eq!((index, arity), (3, 1));
///     }
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The requested capture index is outside `[0, arity)`.
    ///
    /// Raised by `install_spy` before anything is installed.
    #[error("Argument index {index} is out of range for {selector} (arity {arity})")]
    InvalidArgumentIndex {
        /// The selector the spy was requested for
        selector: Selector,
        /// The index that was requested
        index: isize,
        /// The declared arity of the selector
        arity: usize,
    },

    /// The target does not implement the selector and cannot resolve it dynamically.
    #[error("{target} does not respond to {selector}")]
    UnknownSelector {
        /// Human readable description of the receiver
        target: String,
        /// The selector that could not be found
        selector: Selector,
    },

    /// A message was sent with a different number of arguments than its selector declares.
    #[error("{selector} expects {expected} argument(s), got {found}")]
    ArityMismatch {
        /// The selector that was sent
        selector: Selector,
        /// The declared arity
        expected: usize,
        /// The number of arguments supplied
        found: usize,
    },

    /// The dispatch slot no longer holds the state the interceptor expected.
    ///
    /// Another party replaced or removed the method while the spy was installed (or
    /// between lookup and install). The foreign entry is left in place.
    #[error("Dispatch entry for {selector} on {target} was changed by another party")]
    InstallationConflict {
        /// The target whose dispatch table conflicted
        target: TargetId,
        /// The selector whose slot conflicted
        selector: Selector,
    },

    /// A spy is already active on this key and the registry rejects duplicates.
    #[error("A spy is already installed on {selector} for {target}")]
    DuplicateSpy {
        /// The target that already carries a spy
        target: TargetId,
        /// The selector that is already intercepted
        selector: Selector,
    },

    /// The spy handle has been disposed and can no longer be queried.
    #[error("Spy on {selector} has been disposed")]
    SpyDisposed {
        /// The selector the spy was installed on
        selector: Selector,
    },

    /// The spy handle was replaced by a newer spy on the same target and selector.
    #[error("Spy on {selector} was displaced by a newer spy on the same target")]
    SpyDisplaced {
        /// The selector the spy was installed on
        selector: Selector,
    },

    /// An argument was requested but the intercepted selector has not been called yet.
    #[error("Argument {index} of {selector} has yet to be captured")]
    NothingCaptured {
        /// The intercepted selector
        selector: Selector,
        /// The captured argument position
        index: usize,
    },

    /// A call was observed on a spy that was expected to stay silent.
    #[error("Expected no call to {selector}, but argument {index} captured {value}")]
    UnexpectedCall {
        /// The intercepted selector
        selector: Selector,
        /// The captured argument position
        index: usize,
        /// The value that was captured
        value: Value,
    },

    /// A value could not be converted to the requested Rust type.
    #[error("Cannot convert {source_kind} value to {target_type}")]
    ValueConversion {
        /// The kind of the value being converted
        source_kind: ValueKind,
        /// The requested Rust type
        target_type: &'static str,
    },

    /// An error raised by a method implementation while handling a message.
    #[error("{0}")]
    Method(String),

    /// Bulk teardown removed every spy but could not restore some dispatch slots.
    #[error("Teardown could not restore {} dispatch entr(ies): {}", .0.len(), join_keys(.0))]
    TeardownFailed(Vec<SpyKey>),

    /// Failed to lock target.
    ///
    /// A lock guarding a method table or property store was poisoned by a panic
    /// in another thread.
    #[error("Failed to lock target")]
    LockError,
}

fn join_keys(keys: &[SpyKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
