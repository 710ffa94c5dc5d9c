//! Outcome of binding a name to model elements

use edm_model::{EdmError, EdmErrorCode};
use std::fmt;

/// Result of looking up a qualified name
///
/// Computed per query from the current match list, never cached, so it
/// always reflects elements added since the previous lookup.
pub enum Binding<'m, T> {
    NotFound,
    Resolved(&'m T),
    /// Several matches in lookup order; the first one provides the shape
    Ambiguous(Vec<&'m T>),
}

impl<'m, T> Binding<'m, T> {
    /// Build a binding from matches in lookup order
    pub fn from_matches(mut matches: Vec<&'m T>) -> Self {
        match matches.len() {
            0 => Self::NotFound,
            1 => Self::Resolved(matches.remove(0)),
            _ => Self::Ambiguous(matches),
        }
    }

    /// The single match, if exactly one
    pub fn resolved(&self) -> Option<&'m T> {
        match self {
            Self::Resolved(t) => Some(*t),
            _ => None,
        }
    }

    /// The resolved match, or the first of several
    pub fn first(&self) -> Option<&'m T> {
        match self {
            Self::NotFound => None,
            Self::Resolved(t) => Some(*t),
            Self::Ambiguous(matches) => matches.first().copied(),
        }
    }

    /// Every match
    pub fn candidates(&self) -> Vec<&'m T> {
        match self {
            Self::NotFound => Vec::new(),
            Self::Resolved(t) => vec![*t],
            Self::Ambiguous(matches) => matches.clone(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Keep only matches `f` maps to a `U`, re-deriving the outcome
    pub fn filter_map<U>(self, f: impl FnMut(&'m T) -> Option<&'m U>) -> Binding<'m, U> {
        Binding::from_matches(self.candidates().into_iter().filter_map(f).collect())
    }

    /// Errors of the binding itself: one `AmbiguousElementBinding` when ambiguous
    pub fn errors(&self, name: &str) -> Vec<EdmError> {
        match self {
            Self::Ambiguous(matches) => vec![EdmError::new(
                EdmErrorCode::AmbiguousElementBinding,
                format!("'{name}' binds to {} elements", matches.len()),
            )],
            _ => Vec::new(),
        }
    }
}

impl<T> Clone for Binding<'_, T> {
    fn clone(&self) -> Self {
        match self {
            Self::NotFound => Self::NotFound,
            Self::Resolved(t) => Self::Resolved(*t),
            Self::Ambiguous(matches) => Self::Ambiguous(matches.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Binding<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("NotFound"),
            Self::Resolved(t) => f.debug_tuple("Resolved").field(t).finish(),
            Self::Ambiguous(matches) => f.debug_tuple("Ambiguous").field(matches).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_matches() {
        let (a, b) = (1, 2);
        assert!(Binding::<i32>::from_matches(vec![]).is_not_found());
        assert_eq!(Binding::from_matches(vec![&a]).resolved(), Some(&1));

        let ambiguous = Binding::from_matches(vec![&a, &b]);
        assert!(ambiguous.is_ambiguous());
        assert_eq!(ambiguous.first(), Some(&1));
        assert_eq!(ambiguous.candidates().len(), 2);
    }

    #[test]
    fn test_ambiguous_reports_exactly_one_error() {
        let (a, b, c) = ("x", "y", "z");
        let binding = Binding::from_matches(vec![&a, &b, &c]);
        let errors = binding.errors("NS.Thing");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, EdmErrorCode::AmbiguousElementBinding);

        let resolved = Binding::from_matches(vec![&a]);
        assert!(resolved.errors("NS.Thing").is_empty());
    }

    #[test]
    fn test_filter_map_rederives_outcome() {
        let values = [1, 2, 3];
        let binding = Binding::from_matches(values.iter().collect());
        let even = binding.filter_map(|v| if v % 2 == 0 { Some(v) } else { None });
        assert_eq!(even.resolved(), Some(&2));
    }
}
