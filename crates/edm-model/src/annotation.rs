//! Vocabulary annotations and the direct-value annotation store

use crate::element::NodeId;
use crate::expression::Expression;
use crate::location::SourceLocation;
use crate::target::TargetPath;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Opaque value attached directly to a model node
pub type AnnotationValue = Arc<dyn Any + Send + Sync>;

/// Key of a direct annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationKey {
    /// Namespace-qualified name, e.g. an attribute from a foreign XML namespace
    Named { namespace: String, name: String },
    /// Keyed by the stored value's Rust type
    Typed(TypeId),
}

impl AnnotationKey {
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Direct annotations keyed by owning node and annotation key
///
/// Setting a value replaces any previous one; setting `None` removes it.
/// Per owner, annotations keep their first insertion order.
#[derive(Clone, Default)]
pub struct DirectAnnotationStore {
    entries: HashMap<NodeId, Vec<(AnnotationKey, AnnotationValue)>>,
}

impl DirectAnnotationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, owner: NodeId, key: AnnotationKey, value: Option<AnnotationValue>) {
        match value {
            Some(value) => {
                let slot = self.entries.entry(owner).or_default();
                match slot.iter_mut().find(|(k, _)| *k == key) {
                    Some(existing) => existing.1 = value,
                    None => slot.push((key, value)),
                }
            }
            None => {
                if let Some(slot) = self.entries.get_mut(&owner) {
                    slot.retain(|(k, _)| *k != key);
                    if slot.is_empty() {
                        self.entries.remove(&owner);
                    }
                }
            }
        }
    }

    pub fn get(&self, owner: NodeId, key: &AnnotationKey) -> Option<&AnnotationValue> {
        self.entries
            .get(&owner)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Every annotation on `owner`
    pub fn annotations(
        &self,
        owner: NodeId,
    ) -> impl Iterator<Item = (&AnnotationKey, &AnnotationValue)> {
        self.entries
            .get(&owner)
            .into_iter()
            .flatten()
            .map(|(k, v)| (k, v))
    }

    pub fn count(&self, owner: NodeId) -> usize {
        self.entries.get(&owner).map_or(0, Vec::len)
    }

    pub fn owners(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for DirectAnnotationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectAnnotationStore")
            .field("owners", &self.entries.len())
            .field(
                "annotations",
                &self.entries.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

/// Whether an annotation is written inside its target or in an `Annotations` block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SerializationLocation {
    Inline,
    #[default]
    OutOfLine,
}

/// Term applied to a target with a value expression
#[derive(Debug, Clone)]
pub struct VocabularyAnnotation {
    pub id: NodeId,
    pub target: TargetPath,

    /// Qualified term name, bound lazily
    pub term: String,
    pub qualifier: Option<String>,
    pub value: Expression,
    pub serialization_location: SerializationLocation,

    /// Schema an out-of-line annotation is written into
    pub home_namespace: Option<String>,
    pub location: Option<SourceLocation>,
}

impl VocabularyAnnotation {
    /// Create a new out-of-line annotation
    pub fn new(target: TargetPath, term: impl Into<String>, value: Expression) -> Self {
        Self {
            id: NodeId::next(),
            target,
            term: term.into(),
            qualifier: None,
            value,
            serialization_location: SerializationLocation::OutOfLine,
            home_namespace: None,
            location: None,
        }
    }

    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    #[must_use]
    pub fn inline(mut self) -> Self {
        self.serialization_location = SerializationLocation::Inline;
        self
    }

    #[must_use]
    pub fn with_home_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.home_namespace = Some(namespace.into());
        self
    }

    pub fn is_inline(&self) -> bool {
        self.serialization_location == SerializationLocation::Inline
    }
}
