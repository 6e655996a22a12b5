//! # argspy Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! argspy library. Import this module to get quick access to everything needed to
//! build targets and spy on them.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all argspy operations
pub use crate::Error;

/// The result type used throughout argspy
pub use crate::Result;

// ================================================================================================
// Dispatch
// ================================================================================================

/// Classes, objects and selectors
pub use crate::dispatch::{Class, ClassBuilder, Object, Selector};

/// Method implementations and signatures
pub use crate::dispatch::{Invocation, MethodImpl, MethodSignature};

/// Spy targets
pub use crate::dispatch::{Target, TargetId};

// ================================================================================================
// Values
// ================================================================================================

/// Runtime values
pub use crate::value::{ObjectRef, Value, ValueKind};

// ================================================================================================
// Spies
// ================================================================================================

/// Installing and querying spies
pub use crate::spy::{SpyHandle, SpyOptions, SpyRegistry, SpyStatus};

/// Registry configuration
pub use crate::spy::{DuplicatePolicy, RegistryConfig};

/// Process-wide registry shortcuts
pub use crate::spy::{install_spy, teardown_all_spies};
