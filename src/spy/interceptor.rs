//! Dispatch slot interception.
//!
//! An [`Interceptor`] swaps one dispatch slot for a trampoline that records an
//! argument before forwarding the call, and puts the original slot back on
//! [`Interceptor::uninstall`].
//!
//! # Forwarding
//!
//! What the trampoline forwards to depends on what the slot held at install time:
//!
//! | Target | Slot before install | Forwards to |
//! |--------|---------------------|-------------|
//! | instance or class | an entry | that entry's implementation |
//! | instance | empty | the class dispatch path of the receiver |
//! | class | empty, resolvable | the resolver's implementation |
//!
//! Uninstalling puts back exactly the prior slot state, including "empty".

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};

use log::{debug, trace};

use crate::{
    dispatch::{Invocation, MethodEntry, MethodImpl, MethodTable, Selector, Target, TargetId},
    spy::{matcher::ArgumentDescriptor, SpyOptions},
    value::{Value, ValueBox},
    Error, Result,
};

enum Forward {
    Entry(MethodImpl),
    Inherited,
}

impl Forward {
    fn call(&self, invocation: &Invocation<'_>) -> Result<Value> {
        match self {
            Forward::Entry(implementation) => implementation(invocation),
            Forward::Inherited => invocation.receiver().class().dispatch(invocation),
        }
    }
}

/// An installed capture hook on one dispatch slot.
///
/// The interceptor holds only a weak reference to the table it patched, so it never
/// keeps its target alive. The trampoline it installs shares the spy's [`ValueBox`].
///
/// Installation and uninstallation must not race with live calls to the same
/// selector on the same target.
pub struct Interceptor {
    target: TargetId,
    selector: Selector,
    table: Weak<MethodTable>,
    installed: Arc<MethodEntry>,
    prior: Option<Arc<MethodEntry>>,
    uninstalled: AtomicBool,
}

impl Interceptor {
    /// Installs a capture trampoline for `descriptor` on `target`.
    ///
    /// # Arguments
    ///
    /// * `target` - The instance or class whose slot is patched
    /// * `descriptor` - Which selector and argument to capture
    /// * `value_box` - Where captured arguments are stored
    /// * `options` - Suppression settings
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateSpy`] if the slot already holds a spy trampoline, whichever
    ///   registry installed it
    /// - [`Error::UnknownSelector`] if the selector can no longer be answered
    /// - [`Error::InstallationConflict`] if the slot changed between lookup and install
    /// - [`Error::LockError`] if the method table lock was poisoned
    pub fn install(
        target: Target<'_>,
        descriptor: &ArgumentDescriptor,
        value_box: Arc<ValueBox>,
        options: &SpyOptions,
    ) -> Result<Self> {
        let selector = descriptor.selector().clone();
        let table = target.method_table();
        let prior = table.get(&selector)?;
        if prior.as_ref().is_some_and(|entry| entry.is_interceptor()) {
            return Err(Error::DuplicateSpy {
                target: target.id(),
                selector,
            });
        }

        let forward = match (&prior, target) {
            (Some(entry), _) => Forward::Entry(entry.implementation().clone()),
            (None, Target::Instance(_)) => Forward::Inherited,
            (None, Target::Type(class)) => match class.resolve_dynamic(&selector) {
                Some(implementation) => Forward::Entry(implementation),
                None => {
                    return Err(Error::UnknownSelector {
                        target: target.describe(),
                        selector,
                    })
                }
            },
        };
        let signature = target
            .lookup(&selector)?
            .and_then(|entry| entry.signature().cloned());

        let trampoline =
            Self::trampoline(descriptor.clone(), value_box, forward, options.stub());
        let installed = Arc::new(MethodEntry::interceptor(trampoline, signature));

        let swapped =
            table.compare_and_swap(&selector, prior.as_ref(), Some(Arc::clone(&installed)))?;
        if !swapped {
            return Err(Error::InstallationConflict {
                target: target.id(),
                selector,
            });
        }

        debug!(
            "installed interceptor for argument {} of {} on {}",
            descriptor.index(),
            selector,
            target.describe()
        );

        Ok(Self {
            target: target.id(),
            selector,
            table: Arc::downgrade(table),
            installed,
            prior,
            uninstalled: AtomicBool::new(false),
        })
    }

    fn trampoline(
        descriptor: ArgumentDescriptor,
        value_box: Arc<ValueBox>,
        forward: Forward,
        stub: Option<Value>,
    ) -> MethodImpl {
        Arc::new(move |invocation: &Invocation<'_>| {
            if let Some(value) = descriptor.extract(invocation.args()) {
                trace!(
                    "{} on {}: captured argument {} = {}",
                    descriptor.selector(),
                    invocation.receiver().id(),
                    descriptor.index(),
                    value
                );
                value_box.store(value);
            }

            match &stub {
                Some(result) => Ok(result.clone()),
                None => forward.call(invocation),
            }
        })
    }

    /// Restores the slot to its state before installation.
    ///
    /// Calling this again after a successful uninstall does nothing. If the target has
    /// been dropped there is nothing to restore and the call succeeds.
    ///
    /// # Errors
    ///
    /// - [`Error::InstallationConflict`] if the slot no longer holds this interceptor's
    ///   trampoline; the foreign entry is left in place
    /// - [`Error::LockError`] if the method table lock was poisoned
    pub fn uninstall(&self) -> Result<()> {
        if self.uninstalled.load(Ordering::Acquire) {
            return Ok(());
        }

        let Some(table) = self.table.upgrade() else {
            self.uninstalled.store(true, Ordering::Release);
            return Ok(());
        };

        let restored =
            table.compare_and_swap(&self.selector, Some(&self.installed), self.prior.clone())?;
        if !restored {
            return Err(Error::InstallationConflict {
                target: self.target,
                selector: self.selector.clone(),
            });
        }

        self.uninstalled.store(true, Ordering::Release);
        debug!("uninstalled interceptor for {} on {}", self.selector, self.target);
        Ok(())
    }

    /// Returns `true` until [`uninstall`](Self::uninstall) has succeeded.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        !self.uninstalled.load(Ordering::Acquire)
    }

    /// The patched target.
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

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("target", &self.target)
            .field("selector", &self.selector)
            .field("had_prior", &self.prior.is_some())
            .field("installed", &self.is_installed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch::Class,
        spy::matcher::resolve,
        test::{accumulator_class, SET_VALUE, VALUE},
    };

    fn intercept(
        target: Target<'_>,
        index: isize,
        options: &SpyOptions,
    ) -> Result<(Interceptor, Arc<ValueBox>)> {
        let descriptor = resolve(target, &SET_VALUE, index)?;
        let value_box = Arc::new(ValueBox::new());
        let interceptor =
            Interceptor::install(target, &descriptor, Arc::clone(&value_box), options)?;
        Ok((interceptor, value_box))
    }

    #[test]
    fn test_capture_and_forward() -> Result<()> {
        let object = accumulator_class().instantiate();
        let (interceptor, value_box) = intercept(Target::from(&object), 0, &SpyOptions::new())?;

        assert_eq!(object.send(&SET_VALUE, &[Value::I32(42)])?, Value::Bool(true));
        assert_eq!(value_box.read(), Some(Value::I32(42)));
        assert_eq!(object.send(&VALUE, &[])?, Value::I32(42));

        interceptor.uninstall()?;
        assert!(!interceptor.is_installed());
        assert!(object.method_table().is_empty()?);
        Ok(())
    }

    #[test]
    fn test_suppression_skips_original() -> Result<()> {
        let object = accumulator_class().instantiate();
        let options = SpyOptions::new().suppress_original(Value::Bool(false));
        let (_interceptor, value_box) = intercept(Target::from(&object), 0, &options)?;

        assert_eq!(object.send(&SET_VALUE, &[Value::I32(9)])?, Value::Bool(false));
        assert_eq!(value_box.read(), Some(Value::I32(9)));
        assert_eq!(object.property("value")?, None);
        Ok(())
    }

    #[test]
    fn test_uninstall_restores_exact_entry() -> Result<()> {
        let class = accumulator_class();
        let before = class.method_table().get(&SET_VALUE)?.expect("defined");

        let (interceptor, _) = intercept(Target::from(&class), 0, &SpyOptions::new())?;
        let patched = class.method_table().get(&SET_VALUE)?.expect("patched");
        assert!(!Arc::ptr_eq(&patched, &before));

        interceptor.uninstall()?;
        interceptor.uninstall()?;
        let restored = class.method_table().get(&SET_VALUE)?.expect("restored");
        assert!(Arc::ptr_eq(&restored, &before));
        Ok(())
    }

    #[test]
    fn test_conflict_leaves_foreign_entry() -> Result<()> {
        let object = accumulator_class().instantiate();
        let (interceptor, _) = intercept(Target::from(&object), 0, &SpyOptions::new())?;

        object.define_method(SET_VALUE.clone(), |_| Ok(Value::Null))?;
        let err = interceptor.uninstall().unwrap_err();
        assert!(matches!(err, Error::InstallationConflict { .. }));
        assert!(interceptor.is_installed());
        assert_eq!(object.send(&SET_VALUE, &[Value::I32(1)])?, Value::Null);
        Ok(())
    }

    #[test]
    fn test_refuses_to_stack_on_trampoline() -> Result<()> {
        let object = accumulator_class().instantiate();
        let (first, value_box) = intercept(Target::from(&object), 0, &SpyOptions::new())?;
        assert!(object.method_table().get(&SET_VALUE)?.unwrap().is_interceptor());

        let err = intercept(Target::from(&object), 0, &SpyOptions::new()).unwrap_err();
        assert!(matches!(err, Error::DuplicateSpy { .. }));

        object.send(&SET_VALUE, &[Value::I32(6)])?;
        assert_eq!(value_box.capture_count(), 1);
        first.uninstall()?;
        assert!(object.method_table().is_empty()?);
        Ok(())
    }

    #[test]
    fn test_dropped_target_uninstalls_trivially() -> Result<()> {
        let object = accumulator_class().instantiate();
        let (interceptor, _) = intercept(Target::from(&object), 0, &SpyOptions::new())?;
        drop(object);

        interceptor.uninstall()?;
        assert!(!interceptor.is_installed());
        Ok(())
    }

    #[test]
    fn test_resolved_method_on_class() -> Result<()> {
        let class = Class::builder("Lazy")
            .resolver(|sel| {
                (sel.name() == "setValue:").then(|| {
                    Arc::new(|inv: &Invocation<'_>| Ok(inv.arg(0).cloned().unwrap_or_default()))
                        as MethodImpl
                })
            })
            .build();
        let object = class.instantiate();
        let (interceptor, value_box) = intercept(Target::from(&class), 0, &SpyOptions::new())?;

        assert_eq!(object.send(&SET_VALUE, &[Value::from("x")])?, Value::from("x"));
        assert_eq!(value_box.read(), Some(Value::from("x")));

        interceptor.uninstall()?;
        assert!(!class.method_table().contains(&SET_VALUE)?);
        assert!(class.responds_to(&SET_VALUE)?);
        Ok(())
    }
}
