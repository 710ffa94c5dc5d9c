//! The model: schema elements, annotations, labeled elements and references
//!
//! A model never rejects a well-typed element. Two elements with the same
//! qualified name are both kept; the binding layer reports them as an
//! ambiguous binding and validation reports `AlreadyDefined`.

use crate::annotation::{
    AnnotationKey, AnnotationValue, DirectAnnotationStore, VocabularyAnnotation,
};
use crate::container::EntityContainer;
use crate::element::{NodeId, SchemaElement};
use crate::expression::{LabelHandle, LabeledElement, LabeledElementArena};
use crate::types::CoreModel;
use crate::version::EdmVersion;
use crate::{ContractError, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Namespace declared by a model, with its optional alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNamespace {
    pub namespace: String,
    pub alias: Option<String>,
}

/// `edmx:Include` of a referenced document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceInclude {
    pub namespace: String,
    pub alias: Option<String>,
}

/// `edmx:IncludeAnnotations` of a referenced document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeAnnotations {
    pub term_namespace: String,
    pub qualifier: Option<String>,
    pub target_namespace: Option<String>,
}

/// `edmx:Reference` to another CSDL document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReference {
    pub uri: String,
    pub includes: Vec<ReferenceInclude>,
    pub include_annotations: Vec<IncludeAnnotations>,
}

impl DocumentReference {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            includes: Vec::new(),
            include_annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_include(mut self, namespace: impl Into<String>, alias: Option<&str>) -> Self {
        self.includes.push(ReferenceInclude {
            namespace: namespace.into(),
            alias: alias.map(str::to_string),
        });
        self
    }
}

/// In-memory EDM model
#[derive(Debug, Clone)]
pub struct Model {
    version: EdmVersion,
    core: &'static CoreModel,
    elements: Vec<SchemaElement>,
    name_index: HashMap<String, Vec<usize>>,
    namespaces: Vec<SchemaNamespace>,
    vocabulary_annotations: Vec<VocabularyAnnotation>,
    direct_annotations: DirectAnnotationStore,
    labeled_elements: LabeledElementArena,
    references: Vec<Arc<Model>>,
    document_references: Vec<DocumentReference>,
}

impl Model {
    /// Create an empty model for `version`
    pub fn new(version: EdmVersion) -> Self {
        Self {
            version,
            core: CoreModel::instance(),
            elements: Vec::new(),
            name_index: HashMap::new(),
            namespaces: Vec::new(),
            vocabulary_annotations: Vec::new(),
            direct_annotations: DirectAnnotationStore::new(),
            labeled_elements: LabeledElementArena::new(),
            references: Vec::new(),
            document_references: Vec::new(),
        }
    }

    pub fn version(&self) -> EdmVersion {
        self.version
    }

    pub fn set_version(&mut self, version: EdmVersion) {
        self.version = version;
    }

    /// The shared built-in core model
    pub fn core(&self) -> &'static CoreModel {
        self.core
    }

    /// Add a schema element; duplicate names are kept
    pub fn add_element(&mut self, element: impl Into<SchemaElement>) -> Result<NodeId> {
        let element = element.into();
        if element.name().is_empty() {
            return Err(ContractError::EmptyName { what: "element name" });
        }
        if element.namespace().is_empty() {
            return Err(ContractError::EmptyName { what: "element namespace" });
        }

        let full_name = element.full_name();
        let id = element.id();
        self.declare_namespace(element.namespace(), None);

        let slot = self.name_index.entry(full_name.clone()).or_default();
        if !slot.is_empty() {
            debug!(name = %full_name, count = slot.len() + 1, "duplicate element name");
        }
        slot.push(self.elements.len());
        self.elements.push(element);
        trace!(name = %full_name, "element added");
        Ok(id)
    }

    /// Record a namespace, setting its alias if one is given
    pub fn declare_namespace(&mut self, namespace: &str, alias: Option<&str>) {
        match self.namespaces.iter_mut().find(|n| n.namespace == namespace) {
            Some(existing) => {
                if alias.is_some() {
                    existing.alias = alias.map(str::to_string);
                }
            }
            None => self.namespaces.push(SchemaNamespace {
                namespace: namespace.to_string(),
                alias: alias.map(str::to_string),
            }),
        }
    }

    /// Declared namespaces in order of first appearance
    pub fn namespaces(&self) -> &[SchemaNamespace] {
        &self.namespaces
    }

    /// Namespace for a declared alias
    pub fn namespace_for_alias(&self, alias: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|n| n.alias.as_deref() == Some(alias))
            .map(|n| n.namespace.as_str())
    }

    pub fn elements(&self) -> &[SchemaElement] {
        &self.elements
    }

    /// Elements declared in this model under `qualified_name`, in insertion order
    pub fn declared(&self, qualified_name: &str) -> impl Iterator<Item = &SchemaElement> {
        self.name_index
            .get(qualified_name)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.elements.get(i))
    }

    /// Like [`Model::declared`] but rejects an empty name
    pub fn find_declared(&self, qualified_name: &str) -> Result<Vec<&SchemaElement>> {
        if qualified_name.is_empty() {
            return Err(ContractError::EmptyName { what: "lookup name" });
        }
        Ok(self.declared(qualified_name).collect())
    }

    pub fn element_by_id(&self, id: NodeId) -> Option<&SchemaElement> {
        self.elements.iter().find(|e| e.id() == id)
    }

    /// Elements declared in `namespace`
    pub fn elements_in(&self, namespace: &str) -> impl Iterator<Item = &SchemaElement> {
        let namespace = namespace.to_string();
        self.elements
            .iter()
            .filter(move |e| e.namespace() == namespace)
    }

    pub fn entity_containers(&self) -> impl Iterator<Item = &EntityContainer> {
        self.elements.iter().filter_map(SchemaElement::as_container)
    }

    /// First declared entity container
    pub fn entity_container(&self) -> Option<&EntityContainer> {
        self.entity_containers().next()
    }

    /// Add a vocabulary annotation
    pub fn add_vocabulary_annotation(&mut self, annotation: VocabularyAnnotation) -> Result<NodeId> {
        if annotation.term.is_empty() {
            return Err(ContractError::EmptyName { what: "annotation term" });
        }
        if let Some(ns) = annotation.home_namespace.as_deref() {
            self.declare_namespace(ns, None);
        }
        let id = annotation.id;
        self.vocabulary_annotations.push(annotation);
        Ok(id)
    }

    pub fn vocabulary_annotations(&self) -> &[VocabularyAnnotation] {
        &self.vocabulary_annotations
    }

    /// Set (or with `None`, remove) a named direct annotation on `owner`
    pub fn set_annotation_value(
        &mut self,
        owner: NodeId,
        namespace: &str,
        name: &str,
        value: Option<AnnotationValue>,
    ) -> Result<()> {
        let key = named_key(namespace, name)?;
        self.direct_annotations.set(owner, key, value);
        Ok(())
    }

    /// Named direct annotation on `owner`
    pub fn annotation_value(
        &self,
        owner: NodeId,
        namespace: &str,
        name: &str,
    ) -> Result<Option<&AnnotationValue>> {
        let key = named_key(namespace, name)?;
        Ok(self.direct_annotations.get(owner, &key))
    }

    /// Named direct annotation downcast to `T`
    ///
    /// Fails when a value exists under the key but has a different type.
    pub fn annotation_value_as<T: Any>(
        &self,
        owner: NodeId,
        namespace: &str,
        name: &str,
    ) -> Result<Option<&T>> {
        match self.annotation_value(owner, namespace, name)? {
            None => Ok(None),
            Some(value) => (**value).downcast_ref::<T>().map(Some).ok_or_else(|| {
                ContractError::AnnotationTypeMismatch {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    expected: std::any::type_name::<T>(),
                }
            }),
        }
    }

    /// Set (or with `None`, remove) a direct annotation keyed by its Rust type
    pub fn set_typed_annotation<T: Any + Send + Sync>(&mut self, owner: NodeId, value: Option<T>) {
        let value = value.map(|v| Arc::new(v) as AnnotationValue);
        self.direct_annotations
            .set(owner, AnnotationKey::Typed(TypeId::of::<T>()), value);
    }

    pub fn typed_annotation<T: Any>(&self, owner: NodeId) -> Option<&T> {
        self.direct_annotations
            .get(owner, &AnnotationKey::Typed(TypeId::of::<T>()))
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    pub fn direct_annotations(&self) -> &DirectAnnotationStore {
        &self.direct_annotations
    }

    pub fn labeled_elements(&self) -> &LabeledElementArena {
        &self.labeled_elements
    }

    /// Store a labeled element and return its handle
    pub fn add_labeled_element(&mut self, element: LabeledElement) -> LabelHandle {
        self.labeled_elements.insert(element)
    }

    /// Make the elements of another model visible to lookups in this one
    pub fn add_reference(&mut self, model: Arc<Model>) {
        debug!(elements = model.elements.len(), "referenced model added");
        self.references.push(model);
    }

    pub fn references(&self) -> &[Arc<Model>] {
        &self.references
    }

    /// Record an `edmx:Reference`; written back out by the CSDL writer
    pub fn add_document_reference(&mut self, reference: DocumentReference) {
        self.document_references.push(reference);
    }

    pub fn document_references(&self) -> &[DocumentReference] {
        &self.document_references
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(EdmVersion::LATEST)
    }
}

fn named_key(namespace: &str, name: &str) -> Result<AnnotationKey> {
    if namespace.is_empty() {
        return Err(ContractError::EmptyName { what: "annotation namespace" });
    }
    if name.is_empty() {
        return Err(ContractError::EmptyName { what: "annotation name" });
    }
    Ok(AnnotationKey::named(namespace, name))
}
