//! Annotation target resolution
//!
//! A target that cannot be bound becomes a [`BadTarget`] whose kind follows
//! the shape of the path, so callers still know what was meant.

use crate::binding::Binding;
use crate::resolver::Resolver;
use edm_model::names::split_qualified;
use edm_model::{
    ContainerElement, EdmError, EdmErrorCode, EdmType, EntityContainer, EnumMember, EnumType,
    Operation, Parameter, Property, SchemaElement, StructuredType, TargetPath,
};
use std::fmt;
use tracing::trace;

/// What an unresolved target was expected to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadTargetKind {
    Element,
    Property,
    EntitySet,
    EnumMember,
    Operation,
    Parameter,
}

impl BadTargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Element => "element",
            Self::Property => "property",
            Self::EntitySet => "entity set",
            Self::EnumMember => "enum member",
            Self::Operation => "operation",
            Self::Parameter => "parameter",
        }
    }
}

impl fmt::Display for BadTargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder for a target that did not bind
#[derive(Debug, Clone)]
pub struct BadTarget {
    pub kind: BadTargetKind,
    pub path: String,
    pub errors: Vec<EdmError>,
}

impl BadTarget {
    fn new(kind: BadTargetKind, path: &TargetPath) -> Self {
        let path = path.to_string();
        let error = EdmError::new(
            EdmErrorCode::BadUnresolvedTarget,
            format!("cannot resolve {kind} target '{path}'"),
        );
        Self {
            kind,
            path,
            errors: vec![error],
        }
    }
}

/// Element an annotation target path binds to
#[derive(Debug, Clone)]
pub enum ResolvedTarget<'m> {
    /// A schema namespace
    Schema(String),
    Element(&'m SchemaElement),
    Property {
        owner: &'m StructuredType,
        property: &'m Property,
    },
    EnumMember {
        owner: &'m EnumType,
        member: &'m EnumMember,
    },
    ContainerElement {
        container: &'m EntityContainer,
        element: &'m ContainerElement,
    },
    /// Operation selected by signature; ambiguous when several overloads remain
    Operation(Binding<'m, Operation>),
    /// Overload group named without a signature
    OperationGroup(Vec<&'m Operation>),
    Parameter {
        operation: &'m Operation,
        parameter: &'m Parameter,
    },
    /// Several non-operation elements share the name
    Ambiguous(Vec<&'m SchemaElement>),
    Bad(BadTarget),
}

impl<'m> ResolvedTarget<'m> {
    pub fn is_bad(&self) -> bool {
        matches!(self, Self::Bad(_))
    }

    /// Errors carried by the target itself
    pub fn errors(&self, path: &TargetPath) -> Vec<EdmError> {
        match self {
            Self::Bad(bad) => bad.errors.clone(),
            Self::Operation(binding) => binding.errors(&path.to_string()),
            Self::Ambiguous(matches) => Binding::from_matches(matches.clone()).errors(&path.to_string()),
            _ => Vec::new(),
        }
    }

    /// Operation view; an ambiguous selection exposes its first candidate
    pub fn operation(&self) -> Option<&'m Operation> {
        match self {
            Self::Operation(binding) => binding.first(),
            Self::OperationGroup(group) => group.first().copied(),
            Self::Element(element) => (*element).as_operation(),
            Self::Parameter { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Name matched against a term's `AppliesTo` list
    pub fn applies_to_name(&self) -> Option<&'static str> {
        match self {
            Self::Schema(_) => Some("Schema"),
            Self::Element(element) => Some(element.kind().as_str()),
            Self::Property { property, .. } => Some(match property {
                Property::Structural(_) => "Property",
                Property::Navigation(_) => "NavigationProperty",
            }),
            Self::EnumMember { .. } => Some("Member"),
            Self::ContainerElement { element, .. } => Some(element.kind_name()),
            Self::Operation(binding) => binding.first().map(|op| op.kind.as_str()),
            Self::OperationGroup(group) => group.first().map(|op| op.kind.as_str()),
            Self::Parameter { .. } => Some("Parameter"),
            Self::Ambiguous(_) | Self::Bad(_) => None,
        }
    }

    /// Identity of a single bound element
    pub fn element_id(&self) -> Option<edm_model::NodeId> {
        match self {
            Self::Element(element) => Some(element.id()),
            Self::Property { property, .. } => Some(property.id()),
            Self::EnumMember { member, .. } => Some(member.id),
            Self::ContainerElement { element, .. } => Some(element.id()),
            Self::Operation(Binding::Resolved(op)) => Some(op.id),
            Self::Parameter { parameter, .. } => Some(parameter.id),
            _ => None,
        }
    }
}

impl<'m> Resolver<'m> {
    /// Rewrite aliases inside a type name, including `Collection(..)` and `Ref(..)`
    pub fn normalize_type_name(&self, name: &str) -> String {
        match EdmType::parse(name) {
            EdmType::Primitive(kind) => kind.to_string(),
            EdmType::Named(name) => self.normalize(&name),
            EdmType::EntityReference(name) => format!("Ref({})", self.normalize(&name)),
            EdmType::Collection(element) => {
                format!("Collection({})", self.normalize_type_name(&element.type_name()))
            }
        }
    }

    /// Overloads whose parameter types equal `signature`, else the whole group
    pub fn select_overloads(&self, name: &str, signature: Option<&[String]>) -> Vec<&'m Operation> {
        let group = self.find_operations(name);
        let Some(signature) = signature else {
            return group;
        };
        let wanted: Vec<String> = signature
            .iter()
            .map(|t| self.normalize_type_name(t))
            .collect();
        let exact: Vec<&'m Operation> = group
            .iter()
            .copied()
            .filter(|op| {
                let declared: Vec<String> = op
                    .signature()
                    .iter()
                    .map(|t| self.normalize_type_name(t))
                    .collect();
                declared == wanted
            })
            .collect();
        if exact.is_empty() {
            trace!(operation = %name, "no overload matches signature, using whole group");
            group
        } else {
            exact
        }
    }

    /// Bind an annotation target path
    pub fn resolve_target(&self, path: &TargetPath) -> ResolvedTarget<'m> {
        match path {
            TargetPath::Element(name) => self.resolve_element_target(path, name),
            TargetPath::Member { owner, member } => self.resolve_member_target(path, owner, member),
            TargetPath::Operation { name, signature } => {
                let candidates = self.select_overloads(name, signature.as_deref());
                if candidates.is_empty() {
                    return ResolvedTarget::Bad(BadTarget::new(BadTargetKind::Operation, path));
                }
                ResolvedTarget::Operation(Binding::from_matches(candidates))
            }
            TargetPath::Parameter {
                operation,
                signature,
                parameter,
            } => {
                let candidates = self.select_overloads(operation, signature.as_deref());
                candidates
                    .first()
                    .and_then(|op| op.parameter(parameter).map(|p| (*op, p)))
                    .map_or_else(
                        || ResolvedTarget::Bad(BadTarget::new(BadTargetKind::Parameter, path)),
                        |(operation, parameter)| ResolvedTarget::Parameter {
                            operation,
                            parameter,
                        },
                    )
            }
        }
    }

    fn resolve_element_target(&self, path: &TargetPath, name: &str) -> ResolvedTarget<'m> {
        let matches = self.find_elements(name);
        if matches.len() > 1 && matches.iter().all(|e| e.kind().is_operation()) {
            return ResolvedTarget::OperationGroup(
                matches.into_iter().filter_map(SchemaElement::as_operation).collect(),
            );
        }
        match Binding::from_matches(matches) {
            Binding::Resolved(element) => ResolvedTarget::Element(element),
            Binding::Ambiguous(matches) => ResolvedTarget::Ambiguous(matches),
            Binding::NotFound => {
                let namespace = self.normalize(name);
                if self.has_namespace(&namespace) {
                    ResolvedTarget::Schema(namespace)
                } else {
                    ResolvedTarget::Bad(BadTarget::new(BadTargetKind::Element, path))
                }
            }
        }
    }

    fn resolve_member_target(&self, path: &TargetPath, owner: &str, member: &str) -> ResolvedTarget<'m> {
        let bad = |kind| ResolvedTarget::Bad(BadTarget::new(kind, path));
        let Some(element) = self.find_element(owner).first() else {
            return bad(BadTargetKind::Property);
        };

        match element {
            SchemaElement::EntityContainer(container) => {
                let found = self
                    .find_container_element(container, member)
                    .unwrap_or_else(|_| container.find_element(member));
                found.map_or_else(
                    || bad(BadTargetKind::EntitySet),
                    |element| ResolvedTarget::ContainerElement { container, element },
                )
            }
            SchemaElement::EntityType(_) | SchemaElement::ComplexType(_) => {
                let Some(structure) = element.as_structured() else {
                    return bad(BadTargetKind::Property);
                };
                self.resolve_property_path(structure, member).map_or_else(
                    || bad(BadTargetKind::Property),
                    |property| ResolvedTarget::Property {
                        owner: structure,
                        property,
                    },
                )
            }
            SchemaElement::EnumType(enum_type) => enum_type.member(member).map_or_else(
                || bad(BadTargetKind::EnumMember),
                |m| ResolvedTarget::EnumMember {
                    owner: enum_type,
                    member: m,
                },
            ),
            SchemaElement::Operation(_) => {
                let group = self.find_operations(owner);
                group
                    .iter()
                    .find_map(|op| op.parameter(member).map(|p| (*op, p)))
                    .map_or_else(
                        || bad(BadTargetKind::Parameter),
                        |(operation, parameter)| ResolvedTarget::Parameter {
                            operation,
                            parameter,
                        },
                    )
            }
            _ => bad(BadTargetKind::Property),
        }
    }

    /// Namespace a target path belongs to, for grouping out-of-line annotations
    pub fn target_namespace(&self, path: &TargetPath) -> String {
        let owner = self.normalize(path.owner());
        if matches!(path, TargetPath::Element(_)) && self.has_namespace(&owner) {
            return owner;
        }
        split_qualified(&owner).map_or(owner.clone(), |(namespace, _)| namespace.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{
        EntitySet, EntityType, Model, Multiplicity, NavigationProperty, PrimitiveKind,
        StructuralProperty, TypeReference,
    };

    fn model() -> Model {
        let mut model = Model::default();
        model.declare_namespace("NS", None);
        model
            .add_element(
                EntityType::new("NS", "Person")
                    .with_key(["Id"])
                    .with_property(StructuralProperty::new(
                        "Id",
                        TypeReference::primitive(PrimitiveKind::Int32, false),
                    ))
                    .with_property(NavigationProperty::new("Friends", "NS.Person", Multiplicity::Many)),
            )
            .unwrap();
        model
            .add_element(EnumType::new("NS", "Color").with_member("Red", None))
            .unwrap();
        model
            .add_element(
                EntityContainer::new("NS", "Container")
                    .with_element(EntitySet::new("People", "NS.Person")),
            )
            .unwrap();
        model
            .add_element(
                Operation::function("NS", "Find")
                    .with_parameter("name", TypeReference::primitive(PrimitiveKind::String, true))
                    .with_return_type(TypeReference::named("NS.Person", true)),
            )
            .unwrap();
        model
            .add_element(
                Operation::function("NS", "Find")
                    .with_parameter("id", TypeReference::primitive(PrimitiveKind::Int32, true))
                    .with_return_type(TypeReference::named("NS.Person", true)),
            )
            .unwrap();
        model
    }

    fn resolve<'a>(model: &'a Model, text: &str) -> ResolvedTarget<'a> {
        Resolver::new(model).resolve_target(&TargetPath::parse(text).unwrap())
    }

    #[test]
    fn test_member_targets() {
        let model = model();
        assert!(matches!(resolve(&model, "NS.Person/Id"), ResolvedTarget::Property { .. }));
        assert!(matches!(
            resolve(&model, "NS.Person/Friends"),
            ResolvedTarget::Property { property: Property::Navigation(_), .. }
        ));
        assert!(matches!(resolve(&model, "NS.Color/Red"), ResolvedTarget::EnumMember { .. }));
        assert!(matches!(
            resolve(&model, "NS.Container/People"),
            ResolvedTarget::ContainerElement { .. }
        ));
        assert!(matches!(resolve(&model, "NS"), ResolvedTarget::Schema(ref ns) if ns == "NS"));
    }

    #[test]
    fn test_bad_target_kind_follows_path_shape() {
        let model = model();
        let kind = |text: &str| match resolve(&model, text) {
            ResolvedTarget::Bad(bad) => Some(bad.kind),
            _ => None,
        };
        assert_eq!(kind("NS.Container/Nope"), Some(BadTargetKind::EntitySet));
        assert_eq!(kind("NS.Person/Nope"), Some(BadTargetKind::Property));
        assert_eq!(kind("NS.Missing/Nope"), Some(BadTargetKind::Property));
        assert_eq!(kind("NS.Color/Blue"), Some(BadTargetKind::EnumMember));
        assert_eq!(kind("NS.Missing(Edm.String)"), Some(BadTargetKind::Operation));
        assert_eq!(kind("NS.Find(Edm.String)/nope"), Some(BadTargetKind::Parameter));
        assert_eq!(kind("NS.Missing"), Some(BadTargetKind::Element));
    }

    #[test]
    fn test_signature_selects_overload() {
        let model = model();
        match resolve(&model, "NS.Find(Edm.Int32)") {
            ResolvedTarget::Operation(binding) => {
                assert_eq!(binding.resolved().unwrap().parameters[0].name, "id");
            }
            other => panic!("unexpected target {other:?}"),
        }
        assert!(matches!(
            resolve(&model, "NS.Find(Edm.Int32)/id"),
            ResolvedTarget::Parameter { parameter, .. } if parameter.name == "id"
        ));
        assert!(matches!(resolve(&model, "NS.Find"), ResolvedTarget::OperationGroup(ref g) if g.len() == 2));
    }

    #[test]
    fn test_unmatched_signature_is_ambiguous_over_group() {
        let model = model();
        let path = TargetPath::parse("NS.Find(Edm.Guid)").unwrap();
        let target = Resolver::new(&model).resolve_target(&path);
        assert!(matches!(target, ResolvedTarget::Operation(ref b) if b.is_ambiguous()));
        assert_eq!(target.errors(&path).len(), 1);
        assert_eq!(target.operation().unwrap().parameters[0].name, "name");
    }

    #[test]
    fn test_target_namespace() {
        let model = model();
        let resolver = Resolver::new(&model);
        let namespace = |text: &str| resolver.target_namespace(&TargetPath::parse(text).unwrap());
        assert_eq!(namespace("NS.Person/Id"), "NS");
        assert_eq!(namespace("NS"), "NS");
        assert_eq!(namespace("NS.Find(Edm.Int32)/id"), "NS");
    }
}
