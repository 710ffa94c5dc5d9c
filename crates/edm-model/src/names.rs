//! Identifier and qualified-name rules

use regex::Regex;
use std::sync::LazyLock;

/// Longest allowed simple identifier
pub const MAX_NAME_LENGTH: usize = 128;

/// Longest allowed namespace
pub const MAX_NAMESPACE_LENGTH: usize = 511;

static SIMPLE_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{Nl}_][\p{L}\p{Nl}\p{Nd}\p{Mn}\p{Mc}\p{Pc}\p{Cf}]*$")
        .expect("simple identifier pattern is valid")
});

/// Whether `name` has the syntax of a simple identifier (length is not checked)
#[must_use]
pub fn is_simple_identifier(name: &str) -> bool {
    SIMPLE_IDENTIFIER.is_match(name)
}

/// Whether `namespace` is a dot-separated sequence of simple identifiers within length
#[must_use]
pub fn is_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace.len() <= MAX_NAMESPACE_LENGTH
        && namespace.split('.').all(is_simple_identifier)
}

/// Whether `name` is `Namespace.Name`
#[must_use]
pub fn is_qualified_name(name: &str) -> bool {
    split_qualified(name).is_some_and(|(ns, simple)| is_namespace(ns) && is_simple_identifier(simple))
}

/// Split `Namespace.Name` at the last dot
#[must_use]
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once('.')
}

/// Join a namespace and a simple name
#[must_use]
pub fn qualify(namespace: &str, name: &str) -> String {
    format!("{namespace}.{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_identifiers() {
        assert!(is_simple_identifier("Customer"));
        assert!(is_simple_identifier("_private1"));
        assert!(is_simple_identifier("Straße"));
        assert!(!is_simple_identifier("1abc"));
        assert!(!is_simple_identifier("has space"));
        assert!(!is_simple_identifier("a.b"));
        assert!(!is_simple_identifier(""));
    }

    #[test]
    fn test_namespaces() {
        assert!(is_namespace("Org.Example"));
        assert!(is_namespace("Single"));
        assert!(!is_namespace("Org..Example"));
        assert!(!is_namespace(".Org"));
        assert!(!is_namespace(&"a".repeat(MAX_NAMESPACE_LENGTH + 1)));
    }

    #[test]
    fn test_qualified_names() {
        assert!(is_qualified_name("Org.Example.Customer"));
        assert!(!is_qualified_name("Customer"));
        assert_eq!(
            split_qualified("Org.Example.Customer"),
            Some(("Org.Example", "Customer"))
        );
        assert_eq!(qualify("NS", "Person"), "NS.Person");
    }
}
