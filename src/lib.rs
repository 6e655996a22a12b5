// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! # argspy
//!
//! Argument-capturing spies for dynamically dispatched objects under test.
//!
//! A spy is installed on a target (one object, or every instance of a class) for one
//! selector and one argument position. Every message sent through that selector, by
//! whatever caller, has the argument recorded before the call proceeds as usual.
//! Test code then asserts on the most recent capture.
//!
//! ## Features
//!
//! - **Runtime dispatch model** - Classes and objects with mutable method tables
//! - **Non-invasive capture** - The original implementation keeps running and its
//!   result is returned unchanged, unless suppression is requested
//! - **Fail-loud lifecycle** - Bad indices and unknown selectors fail at install
//!   time; disposed and displaced handles refuse queries
//! - **Bulk teardown** - One call removes every leaked spy between test cases
//! - **Thread-safe captures** - Concurrent callers never produce torn reads
//!
//! ## Quick Start
//!
//! ```rust
//! use argspy::prelude::*;
//!
//! let set_value = Selector::parse("setValue:");
//! let class = Class::builder("Slider")
//!     .method(set_value.clone(), |inv| {
//!         inv.receiver().set_property("value", inv.args()[0].clone())?;
//!         Ok(Value::Void)
//!     })
//!     .build();
//! let slider = class.instantiate();
//!
//! let registry = SpyRegistry::new();
//! let spy = registry.install_spy(&slider, &set_value, 0, SpyOptions::new())?;
//!
//! slider.send(&set_value, &[Value::I32(42)])?;
//! assert_eq!(spy.captured_value()?, Some(Value::I32(42)));
//!
//! slider.send(&set_value, &[Value::I32(7)])?;
//! assert_eq!(spy.captured_value()?, Some(Value::I32(7)));
//! assert_eq!(slider.property("value")?, Some(Value::I32(7)));
//!
//! spy.dispose()?;
//! assert!(matches!(spy.captured_value(), Err(Error::SpyDisposed { .. })));
//! # Ok::<(), argspy::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`dispatch`] - Selectors, classes, objects and their method tables
//! - [`value`] - The tagged [`Value`] passed through dispatch and the [`ValueBox`]
//!   capture slot
//! - [`spy`] - Matcher, interceptor, handle and registry
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger. Installs,
//! uninstalls, displacement and teardown are logged at `debug`, every captured call at
//! `trace`, and a handle that fails to uninstall on drop at `warn`.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result`]. See [`Error`] for the categories.

#![doc(html_no_source)]
#![deny(missing_docs)]

#[macro_use]
pub(crate) mod macros;

pub(crate) mod error;

/// Shared fixtures used by unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use argspy::prelude::*;
///
/// let registry = SpyRegistry::new();
/// assert!(registry.is_empty());
/// ```
pub mod prelude;

/// Dynamic message dispatch: selectors, classes, objects and method tables.
pub mod dispatch;

/// Argument-capturing spies: matcher, interceptor, handle and registry.
pub mod spy;

/// Runtime values and the capture slot.
pub mod value;

/// `argspy` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `argspy` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

pub use dispatch::{
    Class, ClassBuilder, ClassId, Invocation, MethodEntry, MethodImpl, MethodResolver,
    MethodSignature, MethodTable, Object, ObjectId, Selector, Target, TargetId,
};
pub use spy::{
    install_spy, teardown_all_spies, ArgumentDescriptor, DuplicatePolicy, Interceptor,
    RegistryConfig, SpyHandle, SpyKey, SpyOptions, SpyRegistry, SpyStatus,
};
pub use value::{ObjectRef, Value, ValueBox, ValueKind};
