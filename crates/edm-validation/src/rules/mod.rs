//! Validation rule catalog
//!
//! Each rule is a plain function over one element kind. A [`RuleSet`] holds
//! the rules whose version gate admits the EDM version being validated and
//! drives the walk over the model, visiting every element once.

mod annotations;
mod containers;
mod keys;
mod model;
mod names;
mod navigation;
mod operations;
mod properties;
mod scalars;
mod structured;
mod terms;

use crate::engine::ValidationContext;
use edm_model::{
    ComplexType, ContainerElement, EdmVersion, EntityContainer, EntityType, EnumType, Model,
    NavigationProperty, Operation, Property, SchemaElement, StructuralProperty, StructuredType,
    Term, TypeDefinition, VocabularyAnnotation,
};
use std::fmt;
use tracing::trace;

/// Rule body, tagged with the element kind it inspects
#[derive(Clone, Copy)]
pub enum Check {
    Model(for<'m> fn(&mut ValidationContext<'m>, &'m Model)),
    /// Any schema element, custom elements included
    Element(for<'m> fn(&mut ValidationContext<'m>, &'m SchemaElement)),
    /// Entity and complex types alike
    Structured(for<'m> fn(&mut ValidationContext<'m>, &'m StructuredType)),
    EntityType(for<'m> fn(&mut ValidationContext<'m>, &'m EntityType)),
    ComplexType(for<'m> fn(&mut ValidationContext<'m>, &'m ComplexType)),
    StructuralProperty(
        for<'m> fn(&mut ValidationContext<'m>, &'m StructuredType, &'m StructuralProperty),
    ),
    NavigationProperty(
        for<'m> fn(&mut ValidationContext<'m>, &'m StructuredType, &'m NavigationProperty),
    ),
    EnumType(for<'m> fn(&mut ValidationContext<'m>, &'m EnumType)),
    TypeDefinition(for<'m> fn(&mut ValidationContext<'m>, &'m TypeDefinition)),
    Term(for<'m> fn(&mut ValidationContext<'m>, &'m Term)),
    Operation(for<'m> fn(&mut ValidationContext<'m>, &'m Operation)),
    EntityContainer(for<'m> fn(&mut ValidationContext<'m>, &'m EntityContainer)),
    ContainerElement(
        for<'m> fn(&mut ValidationContext<'m>, &'m EntityContainer, &'m ContainerElement),
    ),
    Annotation(for<'m> fn(&mut ValidationContext<'m>, &'m VocabularyAnnotation)),
}

impl Check {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Model(_) => "model",
            Self::Element(_) => "element",
            Self::Structured(_) => "structured type",
            Self::EntityType(_) => "entity type",
            Self::ComplexType(_) => "complex type",
            Self::StructuralProperty(_) => "structural property",
            Self::NavigationProperty(_) => "navigation property",
            Self::EnumType(_) => "enum type",
            Self::TypeDefinition(_) => "type definition",
            Self::Term(_) => "term",
            Self::Operation(_) => "operation",
            Self::EntityContainer(_) => "entity container",
            Self::ContainerElement(_) => "container element",
            Self::Annotation(_) => "vocabulary annotation",
        }
    }
}

/// A named rule with an optional version gate
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,

    /// First version the rule applies to
    pub since: Option<EdmVersion>,

    /// Last version the rule applies to
    pub until: Option<EdmVersion>,
    pub check: Check,
}

impl Rule {
    pub const fn new(name: &'static str, check: Check) -> Self {
        Self {
            name,
            since: None,
            until: None,
            check,
        }
    }

    #[must_use]
    pub const fn since(mut self, version: EdmVersion) -> Self {
        self.since = Some(version);
        self
    }

    #[must_use]
    pub const fn until(mut self, version: EdmVersion) -> Self {
        self.until = Some(version);
        self
    }

    /// Whether the gate admits `version`
    pub fn applies_to(&self, version: EdmVersion) -> bool {
        self.since.is_none_or(|since| version >= since)
            && self.until.is_none_or(|until| version <= until)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("kind", &self.check.kind_name())
            .field("since", &self.since)
            .field("until", &self.until)
            .finish()
    }
}

/// Every rule known to the validator, in the order they run
#[rustfmt::skip]
fn catalog() -> Vec<Rule> {
    use Check as C;
    vec![
        // Model
        Rule::new("single_entity_container", C::Model(model::single_entity_container)),
        Rule::new("namespace_names", C::Model(names::namespace_names)),
        Rule::new("labeled_element_expressions", C::Model(model::labeled_element_expressions)),
        // Names and duplicates
        Rule::new("element_names", C::Element(names::element_name)),
        Rule::new("unique_element_names", C::Element(model::unique_element_names)),
        // Structured types
        Rule::new("entity_base_type", C::EntityType(structured::entity_base_type)),
        Rule::new("complex_base_type", C::ComplexType(structured::complex_base_type)),
        Rule::new("property_names", C::Structured(names::property_names)),
        Rule::new("unique_property_names", C::Structured(structured::unique_property_names)),
        Rule::new("member_name_not_type_name", C::Structured(structured::member_name_not_type_name)),
        // Keys
        Rule::new("key_properties_exist", C::EntityType(keys::key_properties_exist)),
        Rule::new("key_properties_not_nullable", C::EntityType(keys::key_properties_not_nullable)),
        Rule::new("key_properties_scalar", C::EntityType(keys::key_properties_scalar)),
        Rule::new("enum_key_properties", C::EntityType(keys::enum_key_properties))
            .until(EdmVersion::V4),
        Rule::new("key_not_redefined", C::EntityType(keys::key_not_redefined)),
        // Structural properties
        Rule::new("property_type_resolves", C::StructuralProperty(properties::property_type_resolves)),
        Rule::new("property_facets_applicable", C::StructuralProperty(properties::property_facets_applicable)),
        // Navigation properties
        Rule::new("navigation_target_type", C::NavigationProperty(navigation::navigation_target_type)),
        Rule::new("navigation_partner", C::NavigationProperty(navigation::navigation_partner)),
        Rule::new("referential_constraints", C::NavigationProperty(navigation::referential_constraints)),
        Rule::new("principal_multiplicity", C::NavigationProperty(navigation::principal_multiplicity)),
        Rule::new("containment_source_from_one", C::NavigationProperty(navigation::containment_source_from_one))
            .until(EdmVersion::V4),
        Rule::new("containment_source_from_one_or_optional", C::NavigationProperty(navigation::containment_source_from_one_or_optional))
            .since(EdmVersion::V401),
        Rule::new("recursive_containment", C::NavigationProperty(navigation::recursive_containment)),
        Rule::new("indirect_containment", C::NavigationProperty(navigation::indirect_containment)),
        // Enums and type definitions
        Rule::new("enum_member_names", C::EnumType(names::member_names)),
        Rule::new("enum_underlying_type", C::EnumType(scalars::enum_underlying_type)),
        Rule::new("enum_member_values", C::EnumType(scalars::enum_member_values)),
        Rule::new("unique_enum_members", C::EnumType(scalars::unique_enum_members)),
        Rule::new("type_definition_underlying_type", C::TypeDefinition(scalars::type_definition_underlying_type)),
        Rule::new("type_definition_facets", C::TypeDefinition(scalars::type_definition_facets)),
        // Terms
        Rule::new("term_type_resolves", C::Term(terms::term_type_resolves)),
        Rule::new("base_term_resolves", C::Term(terms::base_term_resolves)),
        // Operations
        Rule::new("parameter_names", C::Operation(names::parameter_names)),
        Rule::new("operation_types_resolve", C::Operation(operations::operation_types_resolve)),
        Rule::new("bound_operation_parameters", C::Operation(operations::bound_operation_parameters)),
        Rule::new("function_return_type", C::Operation(operations::function_return_type)),
        Rule::new("unique_parameter_names", C::Operation(operations::unique_parameter_names)),
        Rule::new("entity_set_path", C::Operation(operations::entity_set_path)),
        Rule::new("unbound_function_return_types", C::Operation(operations::unbound_function_return_types)),
        Rule::new("duplicate_overloads", C::Operation(operations::duplicate_overloads)),
        // Containers
        Rule::new("container_extends", C::EntityContainer(containers::container_extends)),
        Rule::new("unique_container_members", C::EntityContainer(containers::unique_container_members)),
        Rule::new("container_member_names", C::ContainerElement(names::container_member_name)),
        Rule::new("entity_set_type", C::ContainerElement(containers::entity_set_type)),
        Rule::new("navigation_property_bindings", C::ContainerElement(containers::navigation_property_bindings)),
        Rule::new("operation_import", C::ContainerElement(containers::operation_import)),
        // Vocabulary annotations
        Rule::new("annotation_target", C::Annotation(annotations::annotation_target)),
        Rule::new("annotation_term", C::Annotation(annotations::annotation_term)),
        Rule::new("unique_annotations", C::Annotation(annotations::unique_annotations)),
        Rule::new("annotation_qualifier", C::Annotation(annotations::annotation_qualifier)),
        Rule::new("term_applicability", C::Annotation(annotations::term_applicability)),
        Rule::new("annotation_expression", C::Annotation(annotations::annotation_expression)),
        Rule::new("annotation_type", C::Annotation(annotations::annotation_type)),
    ]
}

/// Rules selected for one EDM version
#[derive(Debug, Clone)]
pub struct RuleSet {
    version: EdmVersion,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Catalog filtered by version gate
    pub fn for_version(version: EdmVersion) -> Self {
        let rules = catalog()
            .into_iter()
            .filter(|rule| rule.applies_to(version))
            .collect();
        Self { version, rules }
    }

    /// Whether any version's catalog has a rule called `name`
    pub fn knows(name: &str) -> bool {
        catalog().iter().any(|rule| rule.name == name)
    }

    pub fn version(&self) -> EdmVersion {
        self.version
    }

    /// Remove the rule called `name`; false if it was not selected
    pub fn disable(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.name != name);
        before != self.rules.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule to the context's model
    pub fn run<'m>(&self, context: &mut ValidationContext<'m>) {
        let model = context.model();

        for rule in &self.rules {
            if let Check::Model(check) = rule.check {
                check(context, model);
            }
        }
        for element in model.elements() {
            self.visit_element(context, element);
        }
        for annotation in model.vocabulary_annotations() {
            for rule in &self.rules {
                if let Check::Annotation(check) = rule.check {
                    check(context, annotation);
                }
            }
        }
    }

    fn visit_element<'m>(&self, context: &mut ValidationContext<'m>, element: &'m SchemaElement) {
        let before = context.error_count();
        for rule in &self.rules {
            match (rule.check, element) {
                (Check::Element(check), _) => check(context, element),
                (Check::Structured(check), SchemaElement::EntityType(entity)) => {
                    check(context, &entity.structure);
                }
                (Check::Structured(check), SchemaElement::ComplexType(complex)) => {
                    check(context, &complex.structure);
                }
                (Check::EntityType(check), SchemaElement::EntityType(entity)) => {
                    check(context, entity);
                }
                (Check::ComplexType(check), SchemaElement::ComplexType(complex)) => {
                    check(context, complex);
                }
                (Check::EnumType(check), SchemaElement::EnumType(enum_type)) => {
                    check(context, enum_type);
                }
                (Check::TypeDefinition(check), SchemaElement::TypeDefinition(definition)) => {
                    check(context, definition);
                }
                (Check::Term(check), SchemaElement::Term(term)) => check(context, term),
                (Check::Operation(check), SchemaElement::Operation(operation)) => {
                    check(context, operation);
                }
                (Check::EntityContainer(check), SchemaElement::EntityContainer(container)) => {
                    check(context, container);
                }
                _ => {}
            }
        }

        if let Some(structure) = element.as_structured() {
            for property in &structure.properties {
                self.visit_property(context, structure, property);
            }
        }
        if let SchemaElement::EntityContainer(container) = element {
            for member in &container.elements {
                for rule in &self.rules {
                    if let Check::ContainerElement(check) = rule.check {
                        check(context, container, member);
                    }
                }
            }
        }
        trace!(
            element = %element.full_name(),
            errors = context.error_count() - before,
            "validated element"
        );
    }

    fn visit_property<'m>(
        &self,
        context: &mut ValidationContext<'m>,
        owner: &'m StructuredType,
        property: &'m Property,
    ) {
        for rule in &self.rules {
            match (rule.check, property) {
                (Check::StructuralProperty(check), Property::Structural(p)) => {
                    check(context, owner, p);
                }
                (Check::NavigationProperty(check), Property::Navigation(p)) => {
                    check(context, owner, p);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_names_are_unique() {
        let rules = catalog();
        for (i, rule) in rules.iter().enumerate() {
            assert!(
                rules[..i].iter().all(|other| other.name != rule.name),
                "duplicate rule name {}",
                rule.name
            );
        }
    }

    #[test]
    fn test_version_gates() {
        let v4 = RuleSet::for_version(EdmVersion::V4);
        let v401 = RuleSet::for_version(EdmVersion::V401);

        assert!(v4.contains("containment_source_from_one"));
        assert!(!v4.contains("containment_source_from_one_or_optional"));
        assert!(v4.contains("enum_key_properties"));

        assert!(!v401.contains("containment_source_from_one"));
        assert!(v401.contains("containment_source_from_one_or_optional"));
        assert!(!v401.contains("enum_key_properties"));

        assert_eq!(v4.version(), EdmVersion::V4);
        assert!(v4.contains("single_entity_container") && v401.contains("single_entity_container"));
    }

    #[test]
    fn test_disable() {
        let mut rules = RuleSet::for_version(EdmVersion::V401);
        let count = rules.len();
        assert!(rules.disable("annotation_type"));
        assert!(!rules.disable("annotation_type"));
        assert_eq!(rules.len(), count - 1);
        assert!(RuleSet::knows("annotation_type"));
        assert!(!RuleSet::knows("no_such_rule"));
    }

    #[test]
    fn test_rule_gate() {
        let rule = Rule::new("r", Check::Model(model::single_entity_container)).since(EdmVersion::V401);
        assert!(!rule.applies_to(EdmVersion::V4));
        assert!(rule.applies_to(EdmVersion::V401));
        assert!(format!("{rule:?}").contains("model"));
    }
}
