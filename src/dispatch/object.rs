//! Classes, instances and spy targets.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use crate::{
    dispatch::{
        method::{Invocation, MethodEntry, MethodImpl, MethodSignature, MethodTable},
        Selector,
    },
    value::Value,
    Error, Result,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Process-unique identity of a [`Class`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// Process-unique identity of an [`Object`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// Type alias for dynamic method resolvers.
///
/// A resolver is consulted when a class has no table entry for a selector. It returns
/// an implementation for selectors the class can answer on demand, or `None`.
pub type MethodResolver = Arc<dyn Fn(&Selector) -> Option<MethodImpl> + Send + Sync>;

/// A named type with a mutable dispatch table.
///
/// Classes are shared as `Arc<Class>` and instantiated with [`Class::instantiate`].
/// Methods can be defined at build time through [`ClassBuilder`] or later through
/// [`Class::define_method`]. Selectors without a table entry fall back to the optional
/// [`MethodResolver`].
///
/// # Examples
///
/// ```rust
/// use argspy::{Class, Selector, Value};
///
/// let counter = Class::builder("Counter")
///     .method(Selector::parse("increment"), |inv| {
///         let next = inv.receiver().property("count")?.and_then(|v| v.as_i64()).unwrap_or(0) + 1;
///         inv.receiver().set_property("count", Value::I64(next))?;
///         Ok(Value::I64(next))
///     })
///     .build();
///
/// let c = counter.instantiate();
/// c.send(&Selector::parse("increment"), &[])?;
/// assert_eq!(c.send(&Selector::parse("increment"), &[])?, Value::I64(2));
/// # Ok::<(), argspy::Error>(())
/// ```
pub struct Class {
    id: ClassId,
    name: String,
    methods: Arc<MethodTable>,
    resolver: Option<MethodResolver>,
}

impl Class {
    /// Starts building a class with the given name.
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    /// Returns the class identity.
    #[must_use]
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Returns the class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a new instance with no per-instance overrides.
    #[must_use]
    pub fn instantiate(self: &Arc<Self>) -> Arc<Object> {
        Arc::new(Object {
            id: ObjectId(next_id()),
            class: Arc::clone(self),
            methods: Arc::new(MethodTable::new()),
            properties: RwLock::new(HashMap::new()),
        })
    }

    /// Binds `implementation` to `selector`, replacing any existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the method table lock was poisoned.
    pub fn define_method<F>(&self, selector: Selector, implementation: F) -> Result<()>
    where
        F: Fn(&Invocation<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.insert(
            selector,
            Arc::new(MethodEntry::new(Arc::new(implementation), None)),
        )?;
        Ok(())
    }

    /// Removes the table entry for `selector`.
    ///
    /// The resolver, if any, may still answer the selector afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the method table lock was poisoned.
    pub fn remove_method(&self, selector: &Selector) -> Result<()> {
        self.methods.remove(selector)?;
        Ok(())
    }

    /// Returns `true` if instances of this class answer `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the method table lock was poisoned.
    pub fn responds_to(&self, selector: &Selector) -> Result<bool> {
        Ok(self.lookup(selector)?.is_some())
    }

    /// Finds the entry that would handle `selector`: the table entry if present,
    /// otherwise a fresh entry from the resolver. Nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the method table lock was poisoned.
    pub fn lookup(&self, selector: &Selector) -> Result<Option<Arc<MethodEntry>>> {
        if let Some(entry) = self.methods.get(selector)? {
            return Ok(Some(entry));
        }
        Ok(self
            .resolve_dynamic(selector)
            .map(|implementation| Arc::new(MethodEntry::new(implementation, None))))
    }

    /// Asks the resolver for an implementation of `selector`.
    #[must_use]
    pub fn resolve_dynamic(&self, selector: &Selector) -> Option<MethodImpl> {
        self.resolver.as_ref().and_then(|resolve| resolve(selector))
    }

    /// Runs `invocation` through the class dispatch path (table, then resolver).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSelector`] if neither the table nor the resolver
    /// answers the selector, or whatever the implementation returns.
    pub fn dispatch(&self, invocation: &Invocation<'_>) -> Result<Value> {
        match self.lookup(invocation.selector())? {
            Some(entry) => entry.invoke(invocation),
            None => Err(Error::UnknownSelector {
                target: format!("instance of {}", self.name),
                selector: invocation.selector().clone(),
            }),
        }
    }

    pub(crate) fn method_table(&self) -> &Arc<MethodTable> {
        &self.methods
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Builder for [`Class`].
///
/// ```rust
/// use argspy::{Class, MethodSignature, Selector, Value, ValueKind};
///
/// let class = Class::builder("Echo")
///     .method_with_signature(
///         Selector::parse("echo:"),
///         MethodSignature::new(vec![ValueKind::Str]).returns(ValueKind::Str),
///         |inv| Ok(inv.arg(0).cloned().unwrap_or(Value::Null)),
///     )
///     .resolver(|sel| {
///         (sel.name() == "ping").then(|| {
///             std::sync::Arc::new(|_: &argspy::Invocation<'_>| Ok(Value::from("pong"))) as argspy::MethodImpl
///         })
///     })
///     .build();
///
/// let echo = class.instantiate();
/// assert_eq!(echo.send(&Selector::parse("ping"), &[])?, Value::from("pong"));
/// # Ok::<(), argspy::Error>(())
/// ```
pub struct ClassBuilder {
    name: String,
    methods: HashMap<Selector, Arc<MethodEntry>>,
    resolver: Option<MethodResolver>,
}

impl ClassBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
            resolver: None,
        }
    }

    /// Adds a method.
    #[must_use]
    pub fn method<F>(self, selector: Selector, implementation: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.add_entry(selector, Arc::new(implementation), None)
    }

    /// Adds a method with declared parameter kinds.
    #[must_use]
    pub fn method_with_signature<F>(
        self,
        selector: Selector,
        signature: MethodSignature,
        implementation: F,
    ) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.add_entry(selector, Arc::new(implementation), Some(signature))
    }

    /// Sets the dynamic resolver consulted for selectors without a table entry.
    #[must_use]
    pub fn resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Selector) -> Option<MethodImpl> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Finishes the class.
    #[must_use]
    pub fn build(self) -> Arc<Class> {
        Arc::new(Class {
            id: ClassId(next_id()),
            name: self.name,
            methods: Arc::new(MethodTable::from_entries(self.methods)),
            resolver: self.resolver,
        })
    }

    fn add_entry(
        mut self,
        selector: Selector,
        implementation: MethodImpl,
        signature: Option<MethodSignature>,
    ) -> Self {
        self.methods.insert(
            selector,
            Arc::new(MethodEntry::new(implementation, signature)),
        );
        self
    }
}

/// An instance of a [`Class`].
///
/// Messages are sent with [`Object::send`], which is the single entry point through
/// which spies observe calls. Lookup order:
///
/// 1. The instance's own method table (per-instance overrides)
/// 2. The class method table
/// 3. The class resolver
///
/// Objects also carry a small property store so method implementations can keep
/// state without external synchronization.
pub struct Object {
    id: ObjectId,
    class: Arc<Class>,
    methods: Arc<MethodTable>,
    properties: RwLock<HashMap<String, Value>>,
}

impl Object {
    /// Returns the object identity.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Returns the object's class.
    #[must_use]
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Sends `selector` with `args` to this object.
    ///
    /// # Errors
    ///
    /// - [`Error::ArityMismatch`] if `args.len()` differs from the selector's arity
    /// - [`Error::UnknownSelector`] if nothing answers the selector
    /// - any error returned by the implementation
    pub fn send(&self, selector: &Selector, args: &[Value]) -> Result<Value> {
        if args.len() != selector.arity() {
            return Err(Error::ArityMismatch {
                selector: selector.clone(),
                expected: selector.arity(),
                found: args.len(),
            });
        }

        let invocation = Invocation::new(self, selector, args);
        match self.methods.get(selector)? {
            Some(entry) => entry.invoke(&invocation),
            None => self.class.dispatch(&invocation),
        }
    }

    /// Binds a per-instance implementation of `selector`, shadowing the class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the method table lock was poisoned.
    pub fn define_method<F>(&self, selector: Selector, implementation: F) -> Result<()>
    where
        F: Fn(&Invocation<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.insert(
            selector,
            Arc::new(MethodEntry::new(Arc::new(implementation), None)),
        )?;
        Ok(())
    }

    /// Removes the per-instance implementation of `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the method table lock was poisoned.
    pub fn remove_method(&self, selector: &Selector) -> Result<()> {
        self.methods.remove(selector)?;
        Ok(())
    }

    /// Finds the entry that would handle `selector` on this object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if a method table lock was poisoned.
    pub fn lookup(&self, selector: &Selector) -> Result<Option<Arc<MethodEntry>>> {
        match self.methods.get(selector)? {
            Some(entry) => Ok(Some(entry)),
            None => self.class.lookup(selector),
        }
    }

    /// Returns `true` if this object answers `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if a method table lock was poisoned.
    pub fn responds_to(&self, selector: &Selector) -> Result<bool> {
        Ok(self.lookup(selector)?.is_some())
    }

    /// Reads a property.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the property lock was poisoned.
    pub fn property(&self, name: &str) -> Result<Option<Value>> {
        Ok(read_lock!(self.properties).get(name).cloned())
    }

    /// Writes a property, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the property lock was poisoned.
    pub fn set_property(&self, name: impl Into<String>, value: Value) -> Result<Option<Value>> {
        Ok(write_lock!(self.properties).insert(name.into(), value))
    }

    pub(crate) fn method_table(&self) -> &Arc<MethodTable> {
        &self.methods
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("class", &self.class.name)
            .finish_non_exhaustive()
    }
}

/// Identity of a spy target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetId {
    /// A single object.
    Instance(ObjectId),
    /// A class; covers every instance without its own override.
    Type(ClassId),
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Instance(id) => write!(f, "{id}"),
            TargetId::Type(id) => write!(f, "{id}"),
        }
    }
}

/// Something a spy can be installed on.
///
/// Spies only borrow the target while installing; afterwards they hold a weak
/// reference to its method table and never keep the target alive.
///
/// An instance target intercepts messages sent to that one object. A type target
/// intercepts messages reaching the class dispatch path, i.e. messages sent to any
/// instance of the class that has no per-instance override of the selector.
#[derive(Clone, Copy, Debug)]
pub enum Target<'a> {
    /// A single object.
    Instance(&'a Arc<Object>),
    /// Every instance of a class.
    Type(&'a Arc<Class>),
}

impl Target<'_> {
    /// Returns the identity of the target.
    #[must_use]
    pub fn id(&self) -> TargetId {
        match self {
            Target::Instance(object) => TargetId::Instance(object.id()),
            Target::Type(class) => TargetId::Type(class.id()),
        }
    }

    /// Human readable description used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Target::Instance(object) => format!("{} ({})", object.id(), object.class().name()),
            Target::Type(class) => format!("class {}", class.name()),
        }
    }

    /// Finds the entry that currently answers `selector` for this target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if a method table lock was poisoned.
    pub fn lookup(&self, selector: &Selector) -> Result<Option<Arc<MethodEntry>>> {
        match self {
            Target::Instance(object) => object.lookup(selector),
            Target::Type(class) => class.lookup(selector),
        }
    }

    pub(crate) fn method_table(&self) -> &Arc<MethodTable> {
        match self {
            Target::Instance(object) => object.method_table(),
            Target::Type(class) => class.method_table(),
        }
    }
}

impl<'a> From<&'a Arc<Object>> for Target<'a> {
    fn from(object: &'a Arc<Object>) -> Self {
        Target::Instance(object)
    }
}

impl<'a> From<&'a Arc<Class>> for Target<'a> {
    fn from(class: &'a Arc<Class>) -> Self {
        Target::Type(class)
    }
}
