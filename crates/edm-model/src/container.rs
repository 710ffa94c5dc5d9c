//! Entity containers and their members
#![allow(clippy::return_self_not_must_use)] // Fluent setters are designed for chaining.

use crate::element::NodeId;
use crate::location::SourceLocation;
use crate::names::qualify;
use crate::operation::OperationKind;

/// Path/target pair routing a navigation property to an entity set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationPropertyBinding {
    pub path: String,
    pub target: String,
}

/// Entity set
#[derive(Debug, Clone)]
pub struct EntitySet {
    pub id: NodeId,
    pub name: String,

    /// Qualified entity type name
    pub entity_type: String,
    pub navigation_bindings: Vec<NavigationPropertyBinding>,
    pub include_in_service_document: bool,
    pub location: Option<SourceLocation>,
}

impl EntitySet {
    /// Create a new entity set
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            entity_type: entity_type.into(),
            navigation_bindings: Vec::new(),
            include_in_service_document: true,
            location: None,
        }
    }

    pub fn with_binding(mut self, path: impl Into<String>, target: impl Into<String>) -> Self {
        self.navigation_bindings.push(NavigationPropertyBinding {
            path: path.into(),
            target: target.into(),
        });
        self
    }
}

/// Singleton
#[derive(Debug, Clone)]
pub struct Singleton {
    pub id: NodeId,
    pub name: String,
    pub entity_type: String,
    pub navigation_bindings: Vec<NavigationPropertyBinding>,
    pub location: Option<SourceLocation>,
}

impl Singleton {
    /// Create a new singleton
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            entity_type: entity_type.into(),
            navigation_bindings: Vec::new(),
            location: None,
        }
    }

    pub fn with_binding(mut self, path: impl Into<String>, target: impl Into<String>) -> Self {
        self.navigation_bindings.push(NavigationPropertyBinding {
            path: path.into(),
            target: target.into(),
        });
        self
    }
}

/// Action or function import
#[derive(Debug, Clone)]
pub struct OperationImport {
    pub id: NodeId,
    pub kind: OperationKind,
    pub name: String,

    /// Qualified name of the imported operation
    pub operation: String,
    pub entity_set: Option<String>,
    pub include_in_service_document: bool,
    pub location: Option<SourceLocation>,
}

impl OperationImport {
    /// Create a new import
    pub fn new(kind: OperationKind, name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            kind,
            name: name.into(),
            operation: operation.into(),
            entity_set: None,
            include_in_service_document: false,
            location: None,
        }
    }

    pub fn with_entity_set(mut self, entity_set: impl Into<String>) -> Self {
        self.entity_set = Some(entity_set.into());
        self
    }
}

/// Member of an entity container
#[derive(Debug, Clone)]
pub enum ContainerElement {
    EntitySet(EntitySet),
    Singleton(Singleton),
    OperationImport(OperationImport),
}

impl ContainerElement {
    pub fn id(&self) -> NodeId {
        match self {
            Self::EntitySet(e) => e.id,
            Self::Singleton(e) => e.id,
            Self::OperationImport(e) => e.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::EntitySet(e) => &e.name,
            Self::Singleton(e) => &e.name,
            Self::OperationImport(e) => &e.name,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::EntitySet(e) => e.location.as_ref(),
            Self::Singleton(e) => e.location.as_ref(),
            Self::OperationImport(e) => e.location.as_ref(),
        }
    }

    /// Element kind name as used in CSDL
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::EntitySet(_) => "EntitySet",
            Self::Singleton(_) => "Singleton",
            Self::OperationImport(import) => match import.kind {
                OperationKind::Action => "ActionImport",
                OperationKind::Function => "FunctionImport",
            },
        }
    }

    /// Entity type served by a set or singleton
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Self::EntitySet(e) => Some(&e.entity_type),
            Self::Singleton(e) => Some(&e.entity_type),
            Self::OperationImport(_) => None,
        }
    }
}

impl From<EntitySet> for ContainerElement {
    fn from(set: EntitySet) -> Self {
        Self::EntitySet(set)
    }
}

impl From<Singleton> for ContainerElement {
    fn from(singleton: Singleton) -> Self {
        Self::Singleton(singleton)
    }
}

impl From<OperationImport> for ContainerElement {
    fn from(import: OperationImport) -> Self {
        Self::OperationImport(import)
    }
}

/// Entity container; `extends` names another container whose members it inherits
#[derive(Debug, Clone)]
pub struct EntityContainer {
    pub id: NodeId,
    pub namespace: String,
    pub name: String,
    pub extends: Option<String>,
    pub elements: Vec<ContainerElement>,
    pub location: Option<SourceLocation>,
}

impl EntityContainer {
    /// Create a new container
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            namespace: namespace.into(),
            name: name.into(),
            extends: None,
            elements: Vec::new(),
            location: None,
        }
    }

    pub fn with_extends(mut self, extends: impl Into<String>) -> Self {
        self.extends = Some(extends.into());
        self
    }

    pub fn with_element(mut self, element: impl Into<ContainerElement>) -> Self {
        self.elements.push(element.into());
        self
    }

    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    /// Declared member by name
    pub fn find_element(&self, name: &str) -> Option<&ContainerElement> {
        self.elements.iter().find(|e| e.name() == name)
    }

    pub fn entity_sets(&self) -> impl Iterator<Item = &EntitySet> {
        self.elements.iter().filter_map(|e| match e {
            ContainerElement::EntitySet(set) => Some(set),
            _ => None,
        })
    }

    pub fn singletons(&self) -> impl Iterator<Item = &Singleton> {
        self.elements.iter().filter_map(|e| match e {
            ContainerElement::Singleton(singleton) => Some(singleton),
            _ => None,
        })
    }

    pub fn operation_imports(&self) -> impl Iterator<Item = &OperationImport> {
        self.elements.iter().filter_map(|e| match e {
            ContainerElement::OperationImport(import) => Some(import),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_members() {
        let container = EntityContainer::new("NS", "Service")
            .with_element(EntitySet::new("Customers", "NS.Customer").with_binding("Orders", "Orders"))
            .with_element(Singleton::new("Me", "NS.Customer"))
            .with_element(OperationImport::new(OperationKind::Function, "Top", "NS.Top"));

        assert_eq!(container.full_name(), "NS.Service");
        assert_eq!(container.entity_sets().count(), 1);
        assert_eq!(container.singletons().count(), 1);
        assert_eq!(container.operation_imports().count(), 1);
        assert_eq!(
            container.find_element("Top").map(ContainerElement::kind_name),
            Some("FunctionImport")
        );
        assert_eq!(
            container.find_element("Me").and_then(ContainerElement::entity_type),
            Some("NS.Customer")
        );
    }

    #[test]
    fn test_singleton_bindings() {
        let singleton = Singleton::new("Me", "NS.Customer")
            .with_binding("Orders", "Orders")
            .with_binding("Friends", "NS.Other/People");

        assert_eq!(
            singleton.navigation_bindings,
            vec![
                NavigationPropertyBinding {
                    path: "Orders".to_string(),
                    target: "Orders".to_string(),
                },
                NavigationPropertyBinding {
                    path: "Friends".to_string(),
                    target: "NS.Other/People".to_string(),
                },
            ]
        );
    }
}
