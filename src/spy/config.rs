//! Spy and registry configuration.
//!
//! - [`SpyOptions`]: Per-spy behaviour passed to `install_spy`
//! - [`RegistryConfig`]: Registry-wide policy
//! - [`DuplicatePolicy`]: What happens when a key already carries a spy

use crate::value::Value;

/// Options for a single spy.
///
/// The defaults observe without changing behaviour: the original implementation runs
/// and its result is returned to the caller, and the spy is removed by bulk teardown.
///
/// # Examples
///
/// ```rust
/// use argspy::{SpyOptions, Value};
///
/// let observe = SpyOptions::new();
/// assert!(!observe.suppress_original);
///
/// let stubbed = SpyOptions::new().suppress_original(Value::Bool(true)).persistent();
/// assert!(stubbed.suppress_original);
/// assert_eq!(stubbed.stub_result, Value::Bool(true));
/// assert!(stubbed.persistent);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpyOptions {
    /// Skip the original implementation and return [`stub_result`](Self::stub_result)
    /// instead. The argument is still captured.
    pub suppress_original: bool,

    /// Value returned to the caller while the original is suppressed (default: `Void`).
    /// Ignored unless `suppress_original` is set.
    pub stub_result: Value,

    /// Keep the spy installed across [`crate::SpyRegistry::teardown_all_spies`].
    /// Persistent spies are only removed by disposing their handle.
    pub persistent: bool,
}

impl SpyOptions {
    /// Creates observe-only options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppresses the original implementation and answers every call with `stub`.
    #[must_use]
    pub fn suppress_original(mut self, stub: impl Into<Value>) -> Self {
        self.suppress_original = true;
        self.stub_result = stub.into();
        self
    }

    /// Opts the spy out of bulk teardown.
    #[must_use]
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub(crate) fn stub(&self) -> Option<Value> {
        self.suppress_original.then(|| self.stub_result.clone())
    }
}

/// Behaviour when a spy is installed on a key that already carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Uninstall the existing spy and install the new one. The old handle reports
    /// [`crate::Error::SpyDisplaced`] from then on.
    #[default]
    Replace,
    /// Refuse the second install with [`crate::Error::DuplicateSpy`].
    Reject,
}

/// Configuration for a [`crate::SpyRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryConfig {
    /// Policy applied on duplicate installs (default: [`DuplicatePolicy::Replace`])
    pub duplicate_policy: DuplicatePolicy,
}

impl RegistryConfig {
    /// Configuration that rejects duplicate installs.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
        }
    }

    /// Sets the duplicate install policy.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}
