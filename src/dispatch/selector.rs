//! Method identity.

use std::{fmt, sync::Arc};

/// Identity of a method: its name plus the number of arguments it takes.
///
/// Selectors are independent of any implementation. Two classes that both answer
/// `setValue:` share the same selector, and a selector with the same name but a
/// different arity is a different method.
///
/// Keyword selectors can be parsed with [`Selector::parse`], which derives the arity
/// from the number of `:` separators:
///
/// | Selector | Arity |
/// |----------|-------|
/// | `count` | 0 |
/// | `setValue:` | 1 |
/// | `setValue:forKey:` | 2 |
///
/// # Examples
///
/// ```rust
/// use argspy::Selector;
///
/// let sel = Selector::parse("setValue:forKey:");
/// assert_eq!(sel.name(), "setValue:forKey:");
/// assert_eq!(sel.arity(), 2);
/// assert_eq!(sel, Selector::new("setValue:forKey:", 2));
/// assert_eq!(sel.to_string(), "setValue:forKey:/2");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector {
    name: Arc<str>,
    arity: usize,
}

impl Selector {
    /// Creates a selector from an explicit name and arity.
    ///
    /// # Arguments
    ///
    /// * `name` - The method name
    /// * `arity` - The number of arguments the method takes
    pub fn new(name: impl AsRef<str>, arity: usize) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            arity,
        }
    }

    /// Parses a keyword selector, counting one argument per `:`.
    ///
    /// # Arguments
    ///
    /// * `keyword` - The selector text, e.g. `"insertObject:atIndex:"`
    pub fn parse(keyword: &str) -> Self {
        let arity = keyword.bytes().filter(|b| *b == b':').count();
        Self::new(keyword, arity)
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arity() {
        assert_eq!(Selector::parse("count").arity(), 0);
        assert_eq!(Selector::parse("setValue:").arity(), 1);
        assert_eq!(Selector::parse("insertObject:atIndex:").arity(), 2);
    }

    #[test]
    fn test_arity_is_part_of_identity() {
        assert_ne!(Selector::new("set", 1), Selector::new("set", 2));
        assert_eq!(Selector::new("set", 1), Selector::new(String::from("set"), 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(Selector::new("setValue", 1).to_string(), "setValue/1");
    }
}
