//! Argument-capturing spies.
//!
//! A spy patches one dispatch slot of a target so that every message sent through
//! that slot has one of its arguments recorded before the call proceeds. Test code
//! reads the capture through a [`SpyHandle`].
//!
//! # Architecture
//!
//! ```text
//! install_spy(target, selector, index, options)
//!   ├── matcher::resolve       validate index and selector, no side effects
//!   ├── DuplicatePolicy        displace or reject an existing spy on the key
//!   ├── Interceptor::install   swap the slot for a capturing trampoline
//!   └── SpyRegistry            record (target, selector) -> spy
//!
//! target.send(selector, args)
//!   └── trampoline
//!         ├── ValueBox::store(args[index])
//!         └── forward to the original, or return the stub result
//! ```
//!
//! # Key Components
//!
//! - [`SpyRegistry`]: Owns the install table, bulk teardown, duplicate policy
//! - [`SpyHandle`]: Query, reset and dispose one spy
//! - [`Interceptor`]: Installs and restores one dispatch slot
//! - [`ArgumentDescriptor`] / [`resolve`]: Capture request validation
//! - [`SpyOptions`] / [`RegistryConfig`]: Configuration
//!
//! # Type-level spies
//!
//! Installing on an `&Arc<Class>` patches the class method table. Every instance that
//! reaches the class dispatch path is observed, i.e. every instance without its own
//! override of the selector. An instance-level spy and a type-level spy on the same
//! selector live on different keys, so both capture from a single call.
//!
//! # Example
//!
//! ```rust
//! use argspy::{Class, Selector, SpyOptions, SpyRegistry, Value};
//!
//! let set_value = Selector::parse("setValue:");
//! let class = Class::builder("Widget")
//!     .method(set_value.clone(), |_| Ok(Value::Void))
//!     .build();
//! let widget = class.instantiate();
//!
//! let registry = SpyRegistry::new();
//! let spy = registry.install_spy(&widget, &set_value, 0, SpyOptions::new())?;
//!
//! widget.send(&set_value, &[Value::I32(42)])?;
//! assert_eq!(spy.captured_value()?, Some(Value::I32(42)));
//!
//! registry.teardown_all_spies()?;
//! # Ok::<(), argspy::Error>(())
//! ```

mod config;
mod handle;
mod interceptor;
mod matcher;
mod registry;

pub use config::{DuplicatePolicy, RegistryConfig, SpyOptions};
pub use handle::{SpyHandle, SpyKey, SpyStatus};
pub use interceptor::Interceptor;
pub use matcher::{resolve, ArgumentDescriptor};
pub use registry::{install_spy, teardown_all_spies, SpyRegistry};
