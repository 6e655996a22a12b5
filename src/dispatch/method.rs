//! Method implementations, call records and dispatch tables.
//!
//! - [`Invocation`]: The live call record handed to an implementation
//! - [`MethodImpl`]: Type alias for method implementation closures
//! - [`MethodSignature`]: Optional declared parameter and return kinds
//! - [`MethodEntry`]: One slot of a dispatch table
//! - [`MethodTable`]: Selector to entry mapping owned by a class or an instance

use std::{collections::HashMap, fmt, sync::Arc, sync::RwLock};

use crate::{
    dispatch::{Object, Selector},
    value::{Value, ValueKind},
    Result,
};

/// A single live invocation of a selector on a receiver.
///
/// The invocation borrows its arguments from the caller and is only valid for the
/// duration of the call. Implementations that need an argument later must clone it.
///
/// # Examples
///
/// ```rust
/// use argspy::{Class, Selector, Value};
///
/// let class = Class::builder("Calculator")
///     .method(Selector::parse("add:to:"), |inv| {
///         let a = inv.arg(0).and_then(Value::as_i64).unwrap_or_default();
///         let b = inv.arg(1).and_then(Value::as_i64).unwrap_or_default();
///         Ok(Value::I64(a + b))
///     })
///     .build();
///
/// let calc = class.instantiate();
/// let sum = calc.send(&Selector::parse("add:to:"), &[Value::I64(2), Value::I64(3)])?;
/// assert_eq!(sum, Value::I64(5));
/// # Ok::<(), argspy::Error>(())
/// ```
pub struct Invocation<'a> {
    receiver: &'a Object,
    selector: &'a Selector,
    args: &'a [Value],
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(receiver: &'a Object, selector: &'a Selector, args: &'a [Value]) -> Self {
        Self {
            receiver,
            selector,
            args,
        }
    }

    /// The object the message was sent to.
    #[must_use]
    pub fn receiver(&self) -> &'a Object {
        self.receiver
    }

    /// The selector being invoked.
    #[must_use]
    pub fn selector(&self) -> &'a Selector {
        self.selector
    }

    /// All arguments in positional order.
    #[must_use]
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// The argument at `index`, if present.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("receiver", &self.receiver.id())
            .field("selector", &self.selector)
            .field("args", &self.args)
            .finish()
    }
}

/// Type alias for method implementations.
///
/// Implementations receive the [`Invocation`] and return the method's result, or an
/// error that is propagated to the sender unchanged.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so objects can be messaged from any thread.
pub type MethodImpl = Arc<dyn Fn(&Invocation<'_>) -> Result<Value> + Send + Sync>;

/// Declared parameter and return kinds of a method.
///
/// Signatures are optional metadata. Dispatch never rejects an argument because its
/// kind differs from the declaration; spies report what was actually passed.
///
/// # Examples
///
/// ```rust
/// use argspy::{MethodSignature, ValueKind};
///
/// let sig = MethodSignature::new(vec![ValueKind::Str, ValueKind::I32]).returns(ValueKind::Bool);
/// assert_eq!(sig.param(1), Some(ValueKind::I32));
/// assert_eq!(sig.return_kind(), Some(ValueKind::Bool));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MethodSignature {
    params: Vec<ValueKind>,
    returns: Option<ValueKind>,
}

impl MethodSignature {
    /// Creates a signature with the given parameter kinds and no declared return kind.
    #[must_use]
    pub fn new(params: Vec<ValueKind>) -> Self {
        Self {
            params,
            returns: None,
        }
    }

    /// Sets the declared return kind.
    #[must_use]
    pub fn returns(mut self, kind: ValueKind) -> Self {
        self.returns = Some(kind);
        self
    }

    /// Declared kind of the parameter at `index`.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<ValueKind> {
        self.params.get(index).copied()
    }

    /// All declared parameter kinds.
    #[must_use]
    pub fn params(&self) -> &[ValueKind] {
        &self.params
    }

    /// Declared return kind, if any.
    #[must_use]
    pub fn return_kind(&self) -> Option<ValueKind> {
        self.returns
    }
}

/// One slot in a [`MethodTable`].
///
/// Entries are shared as `Arc<MethodEntry>`; the identity of that `Arc` is what an
/// interceptor remembers as the expected state of a slot. Entries installed by an
/// interceptor are marked, so a slot that already carries a spy is recognised no
/// matter which registry installed it.
pub struct MethodEntry {
    implementation: MethodImpl,
    signature: Option<MethodSignature>,
    intercepting: bool,
}

impl MethodEntry {
    /// Creates an entry from an implementation and optional signature.
    #[must_use]
    pub fn new(implementation: MethodImpl, signature: Option<MethodSignature>) -> Self {
        Self {
            implementation,
            signature,
            intercepting: false,
        }
    }

    pub(crate) fn interceptor(
        implementation: MethodImpl,
        signature: Option<MethodSignature>,
    ) -> Self {
        Self {
            implementation,
            signature,
            intercepting: true,
        }
    }

    /// Returns `true` if this entry is a spy trampoline.
    #[must_use]
    pub fn is_interceptor(&self) -> bool {
        self.intercepting
    }

    /// The implementation closure.
    #[must_use]
    pub fn implementation(&self) -> &MethodImpl {
        &self.implementation
    }

    /// The declared signature, if any.
    #[must_use]
    pub fn signature(&self) -> Option<&MethodSignature> {
        self.signature.as_ref()
    }

    /// Runs the implementation for `invocation`.
    pub fn invoke(&self, invocation: &Invocation<'_>) -> Result<Value> {
        (self.implementation)(invocation)
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("signature", &self.signature)
            .field("intercepting", &self.intercepting)
            .finish_non_exhaustive()
    }
}

/// Selector to implementation mapping.
///
/// Every [`crate::Class`] owns one table, and every [`crate::Object`] owns one for
/// per-instance overrides. Lookups clone the entry `Arc` and release the lock before
/// the implementation runs, so implementations may freely send further messages or
/// redefine methods.
#[derive(Debug, Default)]
pub struct MethodTable {
    entries: RwLock<HashMap<Selector, Arc<MethodEntry>>>,
}

impl MethodTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: HashMap<Selector, Arc<MethodEntry>>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns the entry bound to `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the table lock was poisoned.
    pub fn get(&self, selector: &Selector) -> Result<Option<Arc<MethodEntry>>> {
        Ok(read_lock!(self.entries).get(selector).cloned())
    }

    /// Binds `entry` to `selector`, returning the previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the table lock was poisoned.
    pub fn insert(
        &self,
        selector: Selector,
        entry: Arc<MethodEntry>,
    ) -> Result<Option<Arc<MethodEntry>>> {
        Ok(write_lock!(self.entries).insert(selector, entry))
    }

    /// Unbinds `selector`, returning the removed entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the table lock was poisoned.
    pub fn remove(&self, selector: &Selector) -> Result<Option<Arc<MethodEntry>>> {
        Ok(write_lock!(self.entries).remove(selector))
    }

    /// Atomically replaces the slot for `selector` if it still holds `expected`.
    ///
    /// `expected == None` means the slot must currently be empty; `replacement == None`
    /// empties the slot. Entries are compared by `Arc` identity.
    ///
    /// # Returns
    ///
    /// `true` if the slot matched and was replaced, `false` if it was left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the table lock was poisoned.
    pub fn compare_and_swap(
        &self,
        selector: &Selector,
        expected: Option<&Arc<MethodEntry>>,
        replacement: Option<Arc<MethodEntry>>,
    ) -> Result<bool> {
        let mut entries = write_lock!(self.entries);

        let matches = match (entries.get(selector), expected) {
            (None, None) => true,
            (Some(current), Some(expected)) => Arc::ptr_eq(current, expected),
            _ => false,
        };
        if !matches {
            return Ok(false);
        }

        match replacement {
            Some(entry) => {
                entries.insert(selector.clone(), entry);
            }
            None => {
                entries.remove(selector);
            }
        }
        Ok(true)
    }

    /// Returns `true` if `selector` has an entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the table lock was poisoned.
    pub fn contains(&self, selector: &Selector) -> Result<bool> {
        Ok(read_lock!(self.entries).contains_key(selector))
    }

    /// Number of bound selectors.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the table lock was poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(read_lock!(self.entries).len())
    }

    /// Returns `true` if no selector is bound.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the table lock was poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(read_lock!(self.entries).is_empty())
    }
}
