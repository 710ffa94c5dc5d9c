//! Entity container `Extends` chains
//!
//! A container inherits the members of the container it extends. The chain
//! is walked with a visited set so self-referential or mutually referential
//! chains are reported instead of looping.

use crate::resolver::Resolver;
use crate::{Error, Result};
use edm_model::{ContainerElement, EntityContainer, EntitySet, Singleton};
use std::collections::HashSet;
use tracing::debug;

impl<'m> Resolver<'m> {
    /// Bound container named by `Extends`
    pub fn extended_container(&self, container: &EntityContainer) -> Option<&'m EntityContainer> {
        let name = container.extends.as_deref()?;
        self.find_container(name).first()
    }

    /// `container` followed by the containers it extends
    pub fn container_chain(
        &self,
        container: &'m EntityContainer,
    ) -> Result<Vec<&'m EntityContainer>> {
        let mut chain = vec![container];
        let mut visited = HashSet::from([container.id]);
        let mut current = container;

        while let Some(parent) = self.extended_container(current) {
            if !visited.insert(parent.id) {
                let mut names: Vec<String> = chain.iter().map(|c| c.full_name()).collect();
                names.push(parent.full_name());
                debug!(container = %container.full_name(), chain = ?names, "cyclic container extends");
                return Err(Error::CyclicContainer {
                    container: container.full_name(),
                    chain: names,
                });
            }
            chain.push(parent);
            current = parent;
        }
        Ok(chain)
    }

    /// Declared and inherited members; a declared member hides an inherited one of the same name
    pub fn container_elements(
        &self,
        container: &'m EntityContainer,
    ) -> Result<Vec<&'m ContainerElement>> {
        let chain = self.container_chain(container)?;
        let mut seen = HashSet::new();
        Ok(chain
            .into_iter()
            .flat_map(|c| c.elements.iter())
            .filter(|e| seen.insert(e.name()))
            .collect())
    }

    /// Member by name, including inherited members
    pub fn find_container_element(
        &self,
        container: &'m EntityContainer,
        name: &str,
    ) -> Result<Option<&'m ContainerElement>> {
        let chain = self.container_chain(container)?;
        Ok(chain.into_iter().find_map(|c| c.find_element(name)))
    }

    /// Entity set by name in the default container
    ///
    /// A cyclic chain falls back to the container's own members.
    pub fn find_entity_set(&self, name: &str) -> Option<&'m EntitySet> {
        let container = self.entity_container()?;
        let element = match self.find_container_element(container, name) {
            Ok(element) => element,
            Err(_) => container.find_element(name),
        };
        match element? {
            ContainerElement::EntitySet(set) => Some(set),
            _ => None,
        }
    }

    /// Singleton by name in the default container
    pub fn find_singleton(&self, name: &str) -> Option<&'m Singleton> {
        let container = self.entity_container()?;
        let element = match self.find_container_element(container, name) {
            Ok(element) => element,
            Err(_) => container.find_element(name),
        };
        match element? {
            ContainerElement::Singleton(singleton) => Some(singleton),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::Model;

    #[test]
    fn test_self_extends_is_cyclic() {
        let mut model = Model::default();
        model
            .add_element(
                EntityContainer::new("Namespace", "Self")
                    .with_extends("Namespace.Self")
                    .with_element(EntitySet::new("Things", "Namespace.Thing")),
            )
            .unwrap();
        let resolver = Resolver::new(&model);
        let container = resolver.find_container("Namespace.Self").first().unwrap();

        let err = resolver.container_elements(container).unwrap_err();
        assert!(matches!(err, Error::CyclicContainer { ref container, .. } if container == "Namespace.Self"));
        assert!(resolver.find_entity_set("Things").is_some());
    }

    #[test]
    fn test_mutual_extends_is_cyclic() {
        let mut model = Model::default();
        model
            .add_element(EntityContainer::new("NS", "A").with_extends("NS.B"))
            .unwrap();
        model
            .add_element(EntityContainer::new("NS", "B").with_extends("NS.A"))
            .unwrap();
        let resolver = Resolver::new(&model);
        let a = resolver.find_container("NS.A").first().unwrap();

        assert!(resolver.container_chain(a).is_err());
    }

    #[test]
    fn test_inherited_members() {
        let mut model = Model::default();
        model
            .add_element(
                EntityContainer::new("NS", "Derived")
                    .with_extends("NS.Base")
                    .with_element(EntitySet::new("Orders", "NS.Order")),
            )
            .unwrap();
        model
            .add_element(
                EntityContainer::new("NS", "Base")
                    .with_element(EntitySet::new("Orders", "NS.OldOrder"))
                    .with_element(Singleton::new("Settings", "NS.Settings")),
            )
            .unwrap();
        let resolver = Resolver::new(&model);
        let derived = resolver.find_container("NS.Derived").first().unwrap();

        let elements = resolver.container_elements(derived).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].entity_type(), Some("NS.Order"));
        assert!(resolver
            .find_container_element(derived, "Settings")
            .unwrap()
            .is_some());
        assert!(resolver.find_singleton("Settings").is_some());
    }
}
