//! Dynamic message dispatch.
//!
//! This module provides the object model spies attach to. Objects are sent messages
//! identified by a [`Selector`]; each message is resolved at call time through a chain
//! of mutable [`MethodTable`]s, which is what lets an interceptor replace an entry
//! while the program is running and put it back afterwards.
//!
//! # Key Components
//!
//! - [`Class`] / [`ClassBuilder`]: Named types with a method table and optional resolver
//! - [`Object`]: Instances with per-instance overrides and a property store
//! - [`Selector`]: Method identity (name plus arity)
//! - [`Invocation`]: The call record seen by implementations
//! - [`MethodTable`] / [`MethodEntry`]: The mutable dispatch slots
//! - [`Target`] / [`TargetId`]: What a spy can be installed on
//!
//! # Lookup Order
//!
//! ```text
//! Object::send(selector, args)
//!   ├── arity check
//!   ├── instance table  ── hit ──> invoke
//!   ├── class table     ── hit ──> invoke
//!   ├── class resolver  ── hit ──> invoke
//!   └── Error::UnknownSelector
//! ```
//!
//! # Example
//!
//! ```rust
//! use argspy::{Class, Selector, Value};
//!
//! let greeter = Class::builder("Greeter")
//!     .method(Selector::parse("greet:"), |inv| {
//!         let name = inv.arg(0).and_then(Value::as_str).unwrap_or("stranger");
//!         Ok(Value::from(format!("hello, {name}")))
//!     })
//!     .build();
//!
//! let g = greeter.instantiate();
//! let reply = g.send(&Selector::parse("greet:"), &[Value::from("ada")])?;
//! assert_eq!(reply, Value::from("hello, ada"));
//! # Ok::<(), argspy::Error>(())
//! ```

mod method;
mod object;
mod selector;

pub use method::{Invocation, MethodEntry, MethodImpl, MethodSignature, MethodTable};
pub use object::{Class, ClassBuilder, ClassId, MethodResolver, Object, ObjectId, Target, TargetId};
pub use selector::Selector;
