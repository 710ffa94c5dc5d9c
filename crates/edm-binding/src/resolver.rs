//! Name lookup across a model and its referenced models

use crate::binding::Binding;
use crate::types::{AbstractType, ResolvedType};
use edm_model::names::{qualify, split_qualified};
use edm_model::{
    ComplexType, EdmType, EntityContainer, EntityType, EnumType, Model, Operation, SchemaElement,
    StructuredType, Term, TypeReference,
};
use std::collections::HashSet;
use tracing::trace;

/// Read-only view resolving names against a model
///
/// Lookups visit the model itself first and then every transitively
/// referenced model once, so reference graphs may contain cycles.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'m> {
    model: &'m Model,
}

impl<'m> Resolver<'m> {
    /// Create a new resolver over `model`
    pub fn new(model: &'m Model) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    /// The model and every transitively referenced model, each once
    pub fn visible_models(&self) -> Vec<&'m Model> {
        let mut visited: HashSet<*const Model> = HashSet::new();
        let mut ordered = Vec::new();
        let mut stack = vec![self.model];

        while let Some(model) = stack.pop() {
            if !visited.insert(std::ptr::from_ref(model)) {
                continue;
            }
            ordered.push(model);
            for reference in model.references().iter().rev() {
                stack.push(reference.as_ref());
            }
        }
        ordered
    }

    /// Replace a leading alias with its namespace
    pub fn normalize(&self, name: &str) -> String {
        if let Some((prefix, simple)) = split_qualified(name) {
            for model in self.visible_models() {
                if let Some(namespace) = model.namespace_for_alias(prefix) {
                    return qualify(namespace, simple);
                }
            }
        }
        name.to_string()
    }

    /// Whether any visible model declares `namespace`
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.visible_models()
            .iter()
            .any(|m| m.namespaces().iter().any(|n| n.namespace == namespace))
    }

    /// Every element named `name`, local model first
    pub fn find_elements(&self, name: &str) -> Vec<&'m SchemaElement> {
        let name = self.normalize(name);
        let matches: Vec<&'m SchemaElement> = self
            .visible_models()
            .into_iter()
            .flat_map(|model| model.declared(&name).collect::<Vec<_>>())
            .collect();
        if matches.len() > 1 {
            trace!(name = %name, count = matches.len(), "ambiguous element binding");
        }
        matches
    }

    pub fn find_element(&self, name: &str) -> Binding<'m, SchemaElement> {
        Binding::from_matches(self.find_elements(name))
    }

    /// Entity, complex, enum or type definition (including custom type elements)
    pub fn find_type(&self, name: &str) -> Binding<'m, SchemaElement> {
        Binding::from_matches(
            self.find_elements(name)
                .into_iter()
                .filter(|e| e.kind().is_type())
                .collect(),
        )
    }

    pub fn find_structured_type(&self, name: &str) -> Binding<'m, StructuredType> {
        self.find_type(name).filter_map(SchemaElement::as_structured)
    }

    pub fn find_entity_type(&self, name: &str) -> Binding<'m, EntityType> {
        self.find_type(name).filter_map(SchemaElement::as_entity_type)
    }

    pub fn find_complex_type(&self, name: &str) -> Binding<'m, ComplexType> {
        self.find_type(name).filter_map(SchemaElement::as_complex_type)
    }

    pub fn find_enum_type(&self, name: &str) -> Binding<'m, EnumType> {
        self.find_type(name).filter_map(SchemaElement::as_enum_type)
    }

    pub fn find_term(&self, name: &str) -> Binding<'m, Term> {
        self.find_element(name).filter_map(SchemaElement::as_term)
    }

    pub fn find_container(&self, name: &str) -> Binding<'m, EntityContainer> {
        self.find_element(name).filter_map(SchemaElement::as_container)
    }

    /// Overload group: every action or function named `name`
    pub fn find_operations(&self, name: &str) -> Vec<&'m Operation> {
        self.find_elements(name)
            .into_iter()
            .filter_map(SchemaElement::as_operation)
            .collect()
    }

    /// Overload group as a binding; more than one overload is ambiguous
    pub fn find_operation(&self, name: &str) -> Binding<'m, Operation> {
        Binding::from_matches(self.find_operations(name))
    }

    /// First entity container, local model first
    pub fn entity_container(&self) -> Option<&'m EntityContainer> {
        self.visible_models()
            .into_iter()
            .find_map(|model| model.entity_container())
    }

    /// Resolve the type a reference names; ambiguous names take the first match
    pub fn resolve_type(&self, type_ref: &TypeReference) -> ResolvedType<'m> {
        match type_ref.ty() {
            EdmType::Primitive(kind) => ResolvedType::Primitive(*kind),
            EdmType::Named(name) => self.resolve_type_name(name),
            EdmType::Collection(element) => {
                ResolvedType::Collection(Box::new(self.resolve_type(element)))
            }
            EdmType::EntityReference(name) => match self.find_entity_type(name).first() {
                Some(entity) => ResolvedType::EntityReference(entity),
                None => ResolvedType::Unresolved(format!("Ref({name})")),
            },
        }
    }

    /// Resolve a qualified type name
    pub fn resolve_type_name(&self, name: &str) -> ResolvedType<'m> {
        let parsed = EdmType::parse(name);
        if !matches!(parsed, EdmType::Named(_)) {
            return self.resolve_type(&TypeReference::new(parsed, true));
        }
        if let Some(abstract_type) = AbstractType::from_name(name) {
            return ResolvedType::Abstract(abstract_type);
        }
        match self.find_type(name).first() {
            Some(SchemaElement::EntityType(e)) => ResolvedType::Entity(e),
            Some(SchemaElement::ComplexType(c)) => ResolvedType::Complex(c),
            Some(SchemaElement::EnumType(e)) => ResolvedType::Enum(e),
            Some(SchemaElement::TypeDefinition(d)) => ResolvedType::Definition(d),
            Some(other) => ResolvedType::Opaque(other),
            None => ResolvedType::Unresolved(name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{EdmVersion, PrimitiveKind};
    use std::sync::Arc;

    fn model_with(elements: Vec<SchemaElement>) -> Model {
        let mut model = Model::new(EdmVersion::V401);
        for element in elements {
            model.add_element(element).unwrap();
        }
        model
    }

    #[test]
    fn test_find_element_resolved_and_missing() {
        let model = model_with(vec![EntityType::new("NS", "Customer").into()]);
        let resolver = Resolver::new(&model);

        assert!(resolver.find_element("NS.Customer").is_resolved());
        assert!(resolver.find_element("NS.Missing").is_not_found());
    }

    #[test]
    fn test_duplicates_bind_ambiguously_with_first_shape() {
        let mut model = model_with(vec![
            EntityType::new("NS", "Dup").with_key(["A"]).into(),
            EntityType::new("NS", "Dup").with_key(["B"]).into(),
        ]);
        {
            let binding = Resolver::new(&model).find_entity_type("NS.Dup");
            assert!(binding.is_ambiguous());
            assert_eq!(binding.first().map(|e| e.key[0].name.as_str()), Some("A"));
            assert_eq!(binding.errors("NS.Dup").len(), 1);
        }

        model
            .add_element(EntityType::new("NS", "Dup").with_key(["C"]))
            .unwrap();
        let binding = Resolver::new(&model).find_entity_type("NS.Dup");
        assert_eq!(binding.candidates().len(), 3);
        assert_eq!(binding.first().map(|e| e.key[0].name.as_str()), Some("A"));
    }

    #[test]
    fn test_referenced_models_are_searched() {
        let referenced = Arc::new(model_with(vec![ComplexType::new("Ref", "Address").into()]));
        let mut model = Model::default();
        model.add_reference(Arc::clone(&referenced));

        let resolver = Resolver::new(&model);
        assert!(resolver.find_complex_type("Ref.Address").is_resolved());
        assert_eq!(resolver.visible_models().len(), 2);
    }

    #[test]
    fn test_lookup_reflects_later_additions() {
        let mut model = Model::default();
        assert!(Resolver::new(&model).find_type("NS.Late").is_not_found());

        model.add_element(EntityType::new("NS", "Late")).unwrap();
        assert!(Resolver::new(&model).find_type("NS.Late").is_resolved());
    }

    #[test]
    fn test_alias_normalization() {
        let mut model = model_with(vec![EntityType::new("Org.Example", "Person").into()]);
        model.declare_namespace("Org.Example", Some("self"));

        let resolver = Resolver::new(&model);
        assert_eq!(resolver.normalize("self.Person"), "Org.Example.Person");
        assert!(resolver.find_entity_type("self.Person").is_resolved());
    }

    #[test]
    fn test_resolve_type_reference() {
        let model = model_with(vec![EntityType::new("NS", "Order").into()]);
        let resolver = Resolver::new(&model);

        let collection = TypeReference::collection(TypeReference::named("NS.Order", false));
        assert!(matches!(
            resolver.resolve_type(&collection),
            ResolvedType::Collection(inner) if matches!(*inner, ResolvedType::Entity(_))
        ));
        assert!(matches!(
            resolver.resolve_type(&TypeReference::primitive(PrimitiveKind::Int32, true)),
            ResolvedType::Primitive(PrimitiveKind::Int32)
        ));
        assert!(resolver
            .resolve_type(&TypeReference::named("NS.Nope", true))
            .is_unresolved());
        assert!(matches!(
            resolver.resolve_type_name("Edm.Untyped"),
            ResolvedType::Abstract(AbstractType::Untyped)
        ));
    }

    #[test]
    fn test_overload_group() {
        let model = model_with(vec![
            Operation::function("NS", "F").into(),
            Operation::function("NS", "F")
                .with_parameter("x", TypeReference::primitive(PrimitiveKind::Int32, true))
                .into(),
            EntityType::new("NS", "E").into(),
        ]);
        let resolver = Resolver::new(&model);
        assert_eq!(resolver.find_operations("NS.F").len(), 2);
        assert!(resolver.find_operation("NS.F").is_ambiguous());
        assert!(resolver.find_operations("NS.E").is_empty());
    }
}
