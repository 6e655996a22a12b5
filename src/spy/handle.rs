//! The spy handle returned to test code.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Weak,
    },
};

use log::warn;
use strum::Display;

use crate::{
    dispatch::{Selector, TargetId},
    spy::{interceptor::Interceptor, matcher::ArgumentDescriptor, registry::RegistryInner},
    value::{Value, ValueBox},
    Error, Result,
};

/// Registry key: one target plus one selector.
///
/// At most one spy is active per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpyKey {
    target: TargetId,
    selector: Selector,
}

impl SpyKey {
    /// Creates a key.
    #[must_use]
    pub fn new(target: TargetId, selector: Selector) -> Self {
        Self { target, selector }
    }

    /// The spied-on target.
    #[must_use]
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// The intercepted selector.
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

impl fmt::Display for SpyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.selector, self.target)
    }
}

/// Lifecycle state of a spy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum SpyStatus {
    /// Installed and capturing.
    Active = 0,
    /// Uninstalled by `dispose`, drop, or bulk teardown.
    Disposed = 1,
    /// Replaced by a newer spy on the same key.
    Displaced = 2,
}

impl SpyStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SpyStatus::Active,
            1 => SpyStatus::Disposed,
            _ => SpyStatus::Displaced,
        }
    }
}

/// State shared between a handle and its registry entry.
pub(crate) struct SpyState {
    pub(crate) key: SpyKey,
    pub(crate) descriptor: ArgumentDescriptor,
    pub(crate) value_box: Arc<ValueBox>,
    pub(crate) interceptor: Interceptor,
    pub(crate) persistent: bool,
    status: AtomicU8,
}

impl SpyState {
    pub(crate) fn new(
        key: SpyKey,
        descriptor: ArgumentDescriptor,
        value_box: Arc<ValueBox>,
        interceptor: Interceptor,
        persistent: bool,
    ) -> Self {
        Self {
            key,
            descriptor,
            value_box,
            interceptor,
            persistent,
            status: AtomicU8::new(SpyStatus::Active as u8),
        }
    }

    pub(crate) fn status(&self) -> SpyStatus {
        SpyStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Moves an active spy to `to` and uninstalls its interceptor.
    ///
    /// Returns `Ok(false)` if the spy had already left the active state. The status
    /// changes even when uninstalling conflicts.
    pub(crate) fn retire(&self, to: SpyStatus) -> Result<bool> {
        if self
            .status
            .compare_exchange(
                SpyStatus::Active as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Ok(false);
        }
        self.interceptor.uninstall()?;
        Ok(true)
    }
}

/// Handle to an installed spy.
///
/// Returned by [`crate::SpyRegistry::install_spy`]. The handle observes one argument
/// of one selector on one target. It only reads the capture slot; querying never
/// triggers a call.
///
/// # Lifecycle
///
/// - [`dispose`](Self::dispose) uninstalls the interceptor and marks the handle inert
/// - Dropping the handle disposes it
/// - Bulk teardown disposes every non-persistent spy
/// - Installing another spy on the same target and selector displaces this one
///
/// Once inert, queries fail with [`Error::SpyDisposed`] or [`Error::SpyDisplaced`]
/// instead of returning stale captures.
///
/// # Examples
///
/// ```rust
/// use argspy::{Class, Error, Selector, SpyOptions, SpyRegistry, Value};
///
/// let class = Class::builder("Account")
///     .method(Selector::parse("deposit:"), |_| Ok(Value::Void))
///     .build();
/// let account = class.instantiate();
/// let registry = SpyRegistry::new();
/// let deposit = Selector::parse("deposit:");
///
/// let spy = registry.install_spy(&account, &deposit, 0, SpyOptions::new())?;
/// assert_eq!(spy.captured_value()?, None);
///
/// account.send(&deposit, &[Value::I64(100)])?;
/// account.send(&deposit, &[Value::I64(25)])?;
/// assert_eq!(spy.argument()?, Value::I64(25));
/// assert_eq!(spy.capture_count()?, 2);
///
/// spy.dispose()?;
/// assert!(matches!(spy.captured_value(), Err(Error::SpyDisposed { .. })));
/// # Ok::<(), argspy::Error>(())
/// ```
#[must_use = "dropping the handle uninstalls the spy"]
pub struct SpyHandle {
    state: Arc<SpyState>,
    registry: Weak<RegistryInner>,
}

impl SpyHandle {
    pub(crate) fn new(state: Arc<SpyState>, registry: Weak<RegistryInner>) -> Self {
        Self { state, registry }
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state.status() {
            SpyStatus::Active => Ok(()),
            SpyStatus::Disposed => Err(Error::SpyDisposed {
                selector: self.state.key.selector.clone(),
            }),
            SpyStatus::Displaced => Err(Error::SpyDisplaced {
                selector: self.state.key.selector.clone(),
            }),
        }
    }

    /// Returns the most recently captured argument, or `None` if the selector has not
    /// been called since installation or the last [`reset`](Self::reset).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SpyDisposed`] or [`Error::SpyDisplaced`] once the handle is inert.
    pub fn captured_value(&self) -> Result<Option<Value>> {
        self.ensure_active()?;
        Ok(self.state.value_box.read())
    }

    /// Returns the most recently captured argument.
    ///
    /// # Errors
    ///
    /// - [`Error::NothingCaptured`] if no call has been observed
    /// - [`Error::SpyDisposed`] or [`Error::SpyDisplaced`] once the handle is inert
    pub fn argument(&self) -> Result<Value> {
        self.captured_value()?.ok_or_else(|| Error::NothingCaptured {
            selector: self.state.key.selector.clone(),
            index: self.state.descriptor.index(),
        })
    }

    /// Clears the capture slot while leaving the spy installed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SpyDisposed`] or [`Error::SpyDisplaced`] once the handle is inert.
    pub fn reset(&self) -> Result<()> {
        self.ensure_active()?;
        self.state.value_box.clear();
        Ok(())
    }

    /// Number of calls observed since installation or the last reset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SpyDisposed`] or [`Error::SpyDisplaced`] once the handle is inert.
    pub fn capture_count(&self) -> Result<usize> {
        self.ensure_active()?;
        Ok(self.state.value_box.capture_count())
    }

    /// Returns `true` if at least one call was observed since installation or the last
    /// reset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SpyDisposed`] or [`Error::SpyDisplaced`] once the handle is inert.
    pub fn was_called(&self) -> Result<bool> {
        Ok(self.capture_count()? > 0)
    }

    /// Fails if any call was observed since installation or the last reset.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedCall`] carrying the captured value
    /// - [`Error::SpyDisposed`] or [`Error::SpyDisplaced`] once the handle is inert
    pub fn assert_not_called(&self) -> Result<()> {
        match self.captured_value()? {
            None => Ok(()),
            Some(value) => Err(Error::UnexpectedCall {
                selector: self.state.key.selector.clone(),
                index: self.state.descriptor.index(),
                value,
            }),
        }
    }

    /// Uninstalls the interceptor, removes the registry entry and marks the handle
    /// inert. Later calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstallationConflict`] if another party replaced the dispatch
    /// entry in the meantime. The handle is inert afterwards regardless.
    pub fn dispose(&self) -> Result<()> {
        if let Some(registry) = self.registry.upgrade() {
            registry.forget(&self.state);
        }
        self.state.retire(SpyStatus::Disposed)?;
        Ok(())
    }

    /// The intercepted selector.
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.state.key.selector
    }

    /// The captured argument position.
    #[must_use]
    pub fn argument_index(&self) -> usize {
        self.state.descriptor.index()
    }

    /// Full description of the captured argument.
    #[must_use]
    pub fn descriptor(&self) -> &ArgumentDescriptor {
        &self.state.descriptor
    }

    /// The spied-on target.
    #[must_use]
    pub fn target_id(&self) -> TargetId {
        self.state.key.target
    }

    /// The registry key of this spy.
    #[must_use]
    pub fn key(&self) -> &SpyKey {
        &self.state.key
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> SpyStatus {
        self.state.status()
    }

    /// Returns `true` while the spy is installed and queryable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status() == SpyStatus::Active
    }

    /// Returns `true` if the spy survives bulk teardown.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.state.persistent
    }
}

impl fmt::Debug for SpyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpyHandle")
            .field("key", &self.state.key)
            .field("index", &self.state.descriptor.index())
            .field("status", &self.state.status())
            .field("persistent", &self.state.persistent)
            .finish()
    }
}

impl Drop for SpyHandle {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            warn!("failed to dispose spy {}: {err}", self.state.key);
        }
    }
}
