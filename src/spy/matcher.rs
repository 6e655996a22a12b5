//! Call signature matching.
//!
//! Validates a capture request against the target before anything is installed, and
//! produces the [`ArgumentDescriptor`] the interceptor uses to pick the argument out
//! of each live invocation.

use crate::{
    dispatch::{Selector, Target},
    value::{Value, ValueKind},
    Error, Result,
};

/// Describes which argument of a selector a spy captures.
///
/// Produced by [`resolve`]; the index is always below the selector's arity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentDescriptor {
    selector: Selector,
    index: usize,
    arity: usize,
    expected_kind: Option<ValueKind>,
}

impl ArgumentDescriptor {
    /// The selector being captured.
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Zero-based argument position.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Declared arity of the selector.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Declared kind of the captured position, when the method carries a signature.
    #[must_use]
    pub fn expected_kind(&self) -> Option<ValueKind> {
        self.expected_kind
    }

    /// Picks the described argument out of a live argument list.
    #[must_use]
    pub fn extract(&self, args: &[Value]) -> Option<Value> {
        args.get(self.index).cloned()
    }
}

/// Validates `argument_index` for `selector` on `target`.
///
/// The index is checked first, then whether the target answers the selector through
/// its method tables or its class resolver. Nothing is mutated; resolving through a
/// resolver does not cache the result.
///
/// # Arguments
///
/// * `target` - The instance or class the spy will be installed on
/// * `selector` - The intercepted selector
/// * `argument_index` - Zero-based argument position; negative values are rejected
///
/// # Errors
///
/// - [`Error::InvalidArgumentIndex`] if `argument_index` is negative or `>= arity`
/// - [`Error::UnknownSelector`] if the target does not respond to `selector`
/// - [`Error::LockError`] if a method table lock was poisoned
///
/// # Examples
///
/// ```rust
/// use argspy::{spy::resolve, Class, Selector, Target, Value};
///
/// let class = Class::builder("Store")
///     .method(Selector::parse("put:at:"), |_| Ok(Value::Void))
///     .build();
///
/// let descriptor = resolve(Target::from(&class), &Selector::parse("put:at:"), 1)?;
/// assert_eq!(descriptor.index(), 1);
/// assert_eq!(descriptor.arity(), 2);
/// assert!(resolve(Target::from(&class), &Selector::parse("put:at:"), -1).is_err());
/// # Ok::<(), argspy::Error>(())
/// ```
pub fn resolve(
    target: Target<'_>,
    selector: &Selector,
    argument_index: isize,
) -> Result<ArgumentDescriptor> {
    let arity = selector.arity();
    let index = usize::try_from(argument_index)
        .ok()
        .filter(|index| *index < arity)
        .ok_or_else(|| Error::InvalidArgumentIndex {
            selector: selector.clone(),
            index: argument_index,
            arity,
        })?;

    let Some(entry) = target.lookup(selector)? else {
        return Err(Error::UnknownSelector {
            target: target.describe(),
            selector: selector.clone(),
        });
    };

    Ok(ArgumentDescriptor {
        selector: selector.clone(),
        index,
        arity,
        expected_kind: entry.signature().and_then(|sig| sig.param(index)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch::{Class, Invocation, MethodImpl, MethodSignature},
        test::{accumulator_class, SET_VALUE, VALUE},
    };
    use std::sync::Arc;

    #[test]
    fn test_resolve_valid_index() -> Result<()> {
        let class = accumulator_class();
        let object = class.instantiate();

        let descriptor = resolve(Target::from(&object), &SET_VALUE, 0)?;
        assert_eq!(descriptor.selector(), &*SET_VALUE);
        assert_eq!(descriptor.index(), 0);
        assert_eq!(descriptor.arity(), 1);
        assert_eq!(descriptor.expected_kind(), Some(ValueKind::I32));
        Ok(())
    }

    #[test]
    fn test_index_out_of_range() {
        let class = accumulator_class();

        for index in [-1, 1, 7] {
            let err = resolve(Target::from(&class), &SET_VALUE, index).unwrap_err();
            assert!(
                matches!(err, Error::InvalidArgumentIndex { index: i, arity: 1, .. } if i == index),
                "index {index}: {err:?}"
            );
        }

        let err = resolve(Target::from(&class), &VALUE, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentIndex { arity: 0, .. }));
    }

    #[test]
    fn test_index_checked_before_selector() {
        let class = accumulator_class();
        let err = resolve(Target::from(&class), &Selector::parse("missing:"), 4).unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentIndex { .. }));
    }

    #[test]
    fn test_unknown_selector() {
        let class = accumulator_class();
        let err = resolve(Target::from(&class), &Selector::parse("missing:"), 0).unwrap_err();
        assert!(matches!(err, Error::UnknownSelector { .. }));
    }

    #[test]
    fn test_resolvable_selector_is_known() -> Result<()> {
        let class = Class::builder("Proxy")
            .resolver(|sel| {
                (sel.name() == "forward:")
                    .then(|| Arc::new(|_: &Invocation<'_>| Ok(Value::Void)) as MethodImpl)
            })
            .build();

        let descriptor = resolve(Target::from(&class), &Selector::parse("forward:"), 0)?;
        assert_eq!(descriptor.expected_kind(), None);
        assert!(class.lookup(&Selector::parse("forward:"))?.is_some());
        Ok(())
    }

    #[test]
    fn test_extract_argument() {
        let class = Class::builder("Pair")
            .method_with_signature(
                Selector::parse("left:right:"),
                MethodSignature::new(vec![ValueKind::Str, ValueKind::F64]),
                |_| Ok(Value::Void),
            )
            .build();
        let descriptor = resolve(Target::from(&class), &Selector::parse("left:right:"), 1)
            .expect("resolvable");

        assert_eq!(descriptor.expected_kind(), Some(ValueKind::F64));
        assert_eq!(
            descriptor.extract(&[Value::from("l"), Value::F64(0.5)]),
            Some(Value::F64(0.5))
        );
        assert_eq!(descriptor.extract(&[]), None);
    }
}
