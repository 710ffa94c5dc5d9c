//! Base type chains, inherited properties and entity keys

use crate::resolver::Resolver;
use crate::{Error, Result};
use edm_model::{EntityType, Property, PropertyRef, StructuralProperty, StructuredType};
use std::collections::HashSet;
use tracing::debug;

impl<'m> Resolver<'m> {
    /// Bound base type; an ambiguous base name takes its first match
    pub fn base_type(&self, ty: &StructuredType) -> Option<&'m StructuredType> {
        let name = ty.base_type.as_deref()?;
        self.find_structured_type(name).first()
    }

    /// `ty` followed by its ancestors, most derived first
    ///
    /// Fails when the chain revisits a type.
    pub fn base_chain(&self, ty: &'m StructuredType) -> Result<Vec<&'m StructuredType>> {
        let (chain, cyclic) = self.walk_base_chain(ty);
        if cyclic {
            debug!(type_name = %ty.full_name(), "cyclic base type chain");
            return Err(Error::CyclicBaseType {
                type_name: ty.full_name(),
            });
        }
        Ok(chain)
    }

    /// Like [`Resolver::base_chain`] but stops before a revisit
    fn walk_base_chain(&self, ty: &'m StructuredType) -> (Vec<&'m StructuredType>, bool) {
        let mut chain = vec![ty];
        let mut visited = HashSet::from([ty.id]);
        let mut current = ty;

        while let Some(base) = self.base_type(current) {
            if !visited.insert(base.id) {
                return (chain, true);
            }
            chain.push(base);
            current = base;
        }
        (chain, false)
    }

    pub fn has_cyclic_base(&self, ty: &'m StructuredType) -> bool {
        self.walk_base_chain(ty).1
    }

    /// Whether `ty` is `base` or derives from it
    pub fn is_derived_from(&self, ty: &'m StructuredType, base: &StructuredType) -> bool {
        self.walk_base_chain(ty).0.iter().any(|t| t.id == base.id)
    }

    /// Declared and inherited properties, base type properties first
    pub fn all_properties(&self, ty: &'m StructuredType) -> Vec<&'m Property> {
        let (chain, _) = self.walk_base_chain(ty);
        chain
            .iter()
            .rev()
            .flat_map(|t| t.properties.iter())
            .collect()
    }

    /// Property by name, searching the most derived type first
    pub fn find_property(&self, ty: &'m StructuredType, name: &str) -> Option<&'m Property> {
        let (chain, _) = self.walk_base_chain(ty);
        chain.into_iter().find_map(|t| t.declared_property(name))
    }

    /// Walk a `/`-separated property path through structured properties
    ///
    /// Segments containing a dot are type casts to a derived type.
    pub fn resolve_property_path(
        &self,
        ty: &'m StructuredType,
        path: &str,
    ) -> Option<&'m Property> {
        let mut current = ty;
        let mut found = None;
        for segment in path.split('/') {
            if segment.contains('.') {
                current = self.find_structured_type(segment).first()?;
                continue;
            }
            let property = self.find_property(current, segment)?;
            found = Some(property);
            if let Some(next) = self.property_structure(property) {
                current = next;
            }
        }
        found
    }

    /// Structured type a property's value has, if any
    pub fn property_structure(&self, property: &Property) -> Option<&'m StructuredType> {
        match property {
            Property::Structural(p) => self.resolve_type(&p.type_ref).element().as_structured(),
            Property::Navigation(p) => self.find_structured_type(&p.target_type).first(),
        }
    }

    /// Bound base entity type
    pub fn base_entity_type(&self, entity: &EntityType) -> Option<&'m EntityType> {
        let name = entity.structure.base_type.as_deref()?;
        self.find_entity_type(name).first()
    }

    /// `entity` followed by its entity ancestors, stopping before a revisit
    pub fn entity_chain(&self, entity: &'m EntityType) -> Vec<&'m EntityType> {
        let mut chain = vec![entity];
        let mut visited = HashSet::from([entity.structure.id]);
        let mut current = entity;
        while let Some(base) = self.base_entity_type(current) {
            if !visited.insert(base.structure.id) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }

    /// Key in force for `entity` and the type declaring it
    pub fn declared_key(&self, entity: &'m EntityType) -> Option<(&'m EntityType, &'m [PropertyRef])> {
        self.entity_chain(entity)
            .into_iter()
            .find(|e| !e.key.is_empty())
            .map(|e| (e, e.key.as_slice()))
    }

    pub fn has_key(&self, entity: &'m EntityType) -> bool {
        self.declared_key(entity).is_some()
    }

    /// Structural properties named by the key in force; unknown names are skipped
    pub fn key_properties(&self, entity: &'m EntityType) -> Vec<&'m StructuralProperty> {
        let Some((_, key)) = self.declared_key(entity) else {
            return Vec::new();
        };
        key.iter()
            .filter_map(|key_ref| {
                self.resolve_property_path(&entity.structure, &key_ref.name)
                    .and_then(Property::as_structural)
            })
            .collect()
    }
}
