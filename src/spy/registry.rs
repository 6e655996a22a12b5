//! Installation registry.
//!
//! Tracks every active spy by [`SpyKey`] so a second install on the same key can be
//! detected and so all spies can be torn down in bulk between test cases.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use dashmap::DashMap;
use log::{debug, warn};

use crate::{
    dispatch::{Selector, Target},
    spy::{
        config::{DuplicatePolicy, RegistryConfig, SpyOptions},
        handle::{SpyHandle, SpyKey, SpyState, SpyStatus},
        interceptor::Interceptor,
        matcher::resolve,
    },
    value::ValueBox,
    Error, Result,
};

pub(crate) struct RegistryInner {
    config: RegistryConfig,
    entries: DashMap<SpyKey, Arc<SpyState>>,
}

impl RegistryInner {
    /// Drops the entry for `state` if it is still the one registered under its key.
    pub(crate) fn forget(&self, state: &Arc<SpyState>) {
        self.entries
            .remove_if(&state.key, |_, current| Arc::ptr_eq(current, state));
    }
}

/// Registry of installed spies.
///
/// Cloning a registry yields another handle to the same set of spies. Handles keep
/// only a weak reference back, so dropping every registry clone does not uninstall
/// anything by itself; the handles still own their interceptors.
///
/// For suites that prefer ambient state, [`SpyRegistry::global`] returns a
/// process-wide instance used by the free functions [`install_spy`] and
/// [`teardown_all_spies`].
///
/// # Examples
///
/// ```rust
/// use argspy::{Class, Selector, SpyOptions, SpyRegistry, Value};
///
/// let class = Class::builder("Logger")
///     .method(Selector::parse("log:"), |_| Ok(Value::Void))
///     .build();
/// let logger = class.instantiate();
/// let registry = SpyRegistry::new();
///
/// let spy = registry.install_spy(&logger, &Selector::parse("log:"), 0, SpyOptions::new())?;
/// logger.send(&Selector::parse("log:"), &[Value::from("started")])?;
///
/// assert_eq!(registry.teardown_all_spies()?, 1);
/// assert!(!spy.is_active());
/// # Ok::<(), argspy::Error>(())
/// ```
#[derive(Clone)]
pub struct SpyRegistry {
    inner: Arc<RegistryInner>,
}

impl SpyRegistry {
    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates an empty registry with `config`.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                entries: DashMap::new(),
            }),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static SpyRegistry {
        static GLOBAL: OnceLock<SpyRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SpyRegistry::new)
    }

    /// The registry configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Installs a spy capturing argument `argument_index` of `selector` on `target`.
    ///
    /// The request is validated before any state changes, so a failed validation
    /// leaves both the target and the registry untouched. If the key already carries a
    /// spy, the configured [`DuplicatePolicy`] decides whether it is displaced or the
    /// install is rejected.
    ///
    /// # Arguments
    ///
    /// * `target` - An `&Arc<Object>` for one instance or an `&Arc<Class>` for every
    ///   instance reaching the class dispatch path
    /// * `selector` - The selector to intercept
    /// * `argument_index` - Zero-based position of the captured argument
    /// * `options` - Suppression and persistence settings
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgumentIndex`] if the index is negative or not below the arity
    /// - [`Error::UnknownSelector`] if the target does not respond to `selector`
    /// - [`Error::DuplicateSpy`] if the key is taken and the policy is `Reject`, or if
    ///   another registry already has a spy on the same slot
    /// - [`Error::InstallationConflict`] if a displaced spy or the new install found
    ///   its slot changed by another party
    pub fn install_spy<'a>(
        &self,
        target: impl Into<Target<'a>>,
        selector: &Selector,
        argument_index: isize,
        options: SpyOptions,
    ) -> Result<SpyHandle> {
        let target = target.into();
        let descriptor = resolve(target, selector, argument_index)?;
        let key = SpyKey::new(target.id(), selector.clone());

        let existing = self.inner.entries.get(&key).map(|e| Arc::clone(e.value()));
        if let Some(existing) = existing {
            match self.inner.config.duplicate_policy {
                DuplicatePolicy::Reject => {
                    return Err(Error::DuplicateSpy {
                        target: key.target(),
                        selector: selector.clone(),
                    })
                }
                DuplicatePolicy::Replace => {
                    self.inner.forget(&existing);
                    existing.retire(SpyStatus::Displaced)?;
                    debug!("displaced spy {key}");
                }
            }
        }

        let value_box = Arc::new(ValueBox::new());
        let interceptor =
            Interceptor::install(target, &descriptor, Arc::clone(&value_box), &options)?;
        let state = Arc::new(SpyState::new(
            key.clone(),
            descriptor,
            value_box,
            interceptor,
            options.persistent,
        ));
        self.inner.entries.insert(key, Arc::clone(&state));

        Ok(SpyHandle::new(state, Arc::downgrade(&self.inner)))
    }

    /// Uninstalls every non-persistent spy and purges its entry.
    ///
    /// Every spy is torn down even if some fail to restore their dispatch slot; those
    /// are reported together afterwards.
    ///
    /// # Returns
    ///
    /// The number of spies removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TeardownFailed`] listing the keys whose dispatch slot had been
    /// changed by another party.
    pub fn teardown_all_spies(&self) -> Result<usize> {
        let keys: Vec<SpyKey> = self
            .inner
            .entries
            .iter()
            .filter(|entry| !entry.value().persistent)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        let mut failed = Vec::new();
        for key in keys {
            let Some((key, state)) = self
                .inner
                .entries
                .remove_if(&key, |_, state| !state.persistent)
            else {
                continue;
            };
            removed += 1;
            if let Err(err) = state.retire(SpyStatus::Disposed) {
                warn!("teardown could not restore {key}: {err}");
                failed.push(key);
            }
        }

        debug!(
            "teardown removed {removed} spies, {} persistent remain",
            self.inner.entries.len()
        );

        if failed.is_empty() {
            Ok(removed)
        } else {
            Err(Error::TeardownFailed(failed))
        }
    }

    /// Number of active spies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns `true` if no spy is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Returns `true` if a spy is active on `selector` for `target`.
    pub fn is_installed<'a>(&self, target: impl Into<Target<'a>>, selector: &Selector) -> bool {
        let key = SpyKey::new(target.into().id(), selector.clone());
        self.inner.entries.contains_key(&key)
    }

    /// Keys of every active spy, sorted.
    #[must_use]
    pub fn installed_keys(&self) -> Vec<SpyKey> {
        let mut keys: Vec<SpyKey> = self
            .inner
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }
}

impl Default for SpyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SpyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpyRegistry")
            .field("config", &self.inner.config)
            .field("spies", &self.inner.entries.len())
            .finish()
    }
}

/// Installs a spy in the process-wide registry.
///
/// See [`SpyRegistry::install_spy`].
///
/// # Errors
///
/// Same as [`SpyRegistry::install_spy`].
pub fn install_spy<'a>(
    target: impl Into<Target<'a>>,
    selector: &Selector,
    argument_index: isize,
    options: SpyOptions,
) -> Result<SpyHandle> {
    SpyRegistry::global().install_spy(target, selector, argument_index, options)
}

/// Tears down every non-persistent spy in the process-wide registry.
///
/// Intended to run between test cases. See [`SpyRegistry::teardown_all_spies`].
///
/// # Errors
///
/// Same as [`SpyRegistry::teardown_all_spies`].
pub fn teardown_all_spies() -> Result<usize> {
    SpyRegistry::global().teardown_all_spies()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test::{accumulator_class, SET_VALUE, VALUE},
        value::Value,
    };

    #[test]
    fn test_invalid_index_leaves_registry_unchanged() {
        let object = accumulator_class().instantiate();
        let registry = SpyRegistry::new();

        let err = registry
            .install_spy(&object, &SET_VALUE, 1, SpyOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentIndex { .. }));
        assert!(registry.is_empty());
        assert!(!registry.is_installed(&object, &SET_VALUE));
    }

    #[test]
    fn test_replace_displaces_previous() -> Result<()> {
        let object = accumulator_class().instantiate();
        let registry = SpyRegistry::new();

        let first = registry.install_spy(&object, &SET_VALUE, 0, SpyOptions::new())?;
        let second = registry.install_spy(&object, &SET_VALUE, 0, SpyOptions::new())?;
        assert_eq!(registry.len(), 1);

        object.send(&SET_VALUE, &[Value::I32(8)])?;
        assert!(matches!(first.captured_value(), Err(Error::SpyDisplaced { .. })));
        assert_eq!(second.captured_value()?, Some(Value::I32(8)));
        assert_eq!(object.send(&VALUE, &[])?, Value::I32(8));

        drop(first);
        assert!(registry.is_installed(&object, &SET_VALUE));
        assert_eq!(second.capture_count()?, 1);
        Ok(())
    }

    #[test]
    fn test_reject_policy() -> Result<()> {
        let object = accumulator_class().instantiate();
        let registry = SpyRegistry::with_config(RegistryConfig::strict());

        let first = registry.install_spy(&object, &SET_VALUE, 0, SpyOptions::new())?;
        let err = registry
            .install_spy(&object, &SET_VALUE, 0, SpyOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSpy { .. }));
        assert!(first.is_active());
        Ok(())
    }

    #[test]
    fn test_second_registry_cannot_stack() -> Result<()> {
        let object = accumulator_class().instantiate();
        let first = SpyRegistry::new();
        let second = SpyRegistry::new();

        let spy = first.install_spy(&object, &SET_VALUE, 0, SpyOptions::new())?;
        let err = second
            .install_spy(&object, &SET_VALUE, 0, SpyOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSpy { .. }));
        assert!(second.is_empty());
        assert!(spy.is_active());

        spy.dispose()?;
        assert!(object.method_table().is_empty()?);

        let spy = second.install_spy(&object, &SET_VALUE, 0, SpyOptions::new())?;
        object.send(&SET_VALUE, &[Value::I32(12)])?;
        assert_eq!(spy.argument()?, Value::I32(12));
        Ok(())
    }

    #[test]
    fn test_global_and_local_teardown_restore_original() -> Result<()> {
        let object = accumulator_class().instantiate();
        let local = SpyRegistry::new();

        let global_spy = install_spy(&object, &SET_VALUE, 0, SpyOptions::new())?;
        let err = local
            .install_spy(&object, &SET_VALUE, 0, SpyOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSpy { .. }));

        teardown_all_spies()?;
        assert!(!global_spy.is_active());
        assert!(object.method_table().is_empty()?);
        assert_eq!(object.send(&SET_VALUE, &[Value::I32(1)])?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn test_teardown_skips_persistent() -> Result<()> {
        let class = accumulator_class();
        let object = class.instantiate();
        let registry = SpyRegistry::new();

        let transient = registry.install_spy(&object, &SET_VALUE, 0, SpyOptions::new())?;
        let pinned =
            registry.install_spy(&class, &SET_VALUE, 0, SpyOptions::new().persistent())?;

        assert_eq!(registry.teardown_all_spies()?, 1);
        assert!(matches!(transient.captured_value(), Err(Error::SpyDisposed { .. })));
        assert!(pinned.is_active());
        assert_eq!(registry.installed_keys(), vec![pinned.key().clone()]);

        object.send(&SET_VALUE, &[Value::I32(2)])?;
        assert_eq!(pinned.argument()?, Value::I32(2));
        Ok(())
    }

    #[test]
    fn test_teardown_reports_conflicts() -> Result<()> {
        let first = accumulator_class().instantiate();
        let second = accumulator_class().instantiate();
        let registry = SpyRegistry::new();

        let hijacked = registry.install_spy(&first, &SET_VALUE, 0, SpyOptions::new())?;
        let clean = registry.install_spy(&second, &SET_VALUE, 0, SpyOptions::new())?;
        first.define_method(SET_VALUE.clone(), |_| Ok(Value::Null))?;

        match registry.teardown_all_spies() {
            Err(Error::TeardownFailed(keys)) => assert_eq!(keys, vec![hijacked.key().clone()]),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(registry.is_empty());
        assert!(!hijacked.is_active());
        assert!(!clean.is_active());
        assert!(second.method_table().is_empty()?);
        Ok(())
    }
}
