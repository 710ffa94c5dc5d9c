//! Entity container and container member rules

use crate::engine::ValidationContext;
use edm_binding::Resolver;
use edm_model::{
    ContainerElement, EdmErrorCode, EntityContainer, NavigationPropertyBinding, OperationImport,
    Property,
};

pub(crate) fn container_extends<'m>(
    context: &mut ValidationContext<'m>,
    container: &'m EntityContainer,
) {
    let Some(extends) = container.extends.as_deref() else {
        return;
    };
    let resolver = context.resolver();
    if resolver.find_container(extends).is_not_found() {
        context.report(
            EdmErrorCode::BadUnresolvedEntityContainer,
            format!(
                "container '{extends}' extended by '{}' cannot be resolved",
                container.full_name()
            ),
            container.location.as_ref(),
        );
        return;
    }
    if let Err(err) = resolver.container_chain(container) {
        context.report_all([err.to_edm_error()], container.location.as_ref());
    }
}

pub(crate) fn unique_container_members<'m>(
    context: &mut ValidationContext<'m>,
    container: &'m EntityContainer,
) {
    for (i, member) in container.elements.iter().enumerate() {
        if container.elements[..i].iter().any(|m| m.name() == member.name()) {
            context.report(
                EdmErrorCode::AlreadyDefined,
                format!(
                    "'{}' is already defined in container '{}'",
                    member.name(),
                    container.full_name()
                ),
                member.location(),
            );
        }
    }
}

/// Sets and singletons serve an entity type; sets also need a key
pub(crate) fn entity_set_type<'m>(
    context: &mut ValidationContext<'m>,
    _container: &'m EntityContainer,
    member: &'m ContainerElement,
) {
    let Some(type_name) = member.entity_type() else {
        return;
    };
    let resolved = context.resolver().resolve_type_name(type_name);
    if let Some(name) = resolved.unresolved_name() {
        context.report(
            EdmErrorCode::BadUnresolvedType,
            format!(
                "type '{name}' of {} '{}' cannot be resolved",
                member.kind_name(),
                member.name()
            ),
            member.location(),
        );
        return;
    }
    let Some(entity) = resolved.as_entity() else {
        context.report(
            EdmErrorCode::EntitySetTypeMustBeEntityType,
            format!(
                "type '{type_name}' of {} '{}' is not an entity type",
                member.kind_name(),
                member.name()
            ),
            member.location(),
        );
        return;
    };
    if matches!(member, ContainerElement::EntitySet(_)) && !context.resolver().has_key(entity) {
        context.report(
            EdmErrorCode::EntitySetTypeHasNoKeys,
            format!(
                "entity set '{}' uses '{}', which has no key",
                member.name(),
                entity.full_name()
            ),
            member.location(),
        );
    }
}

pub(crate) fn navigation_property_bindings<'m>(
    context: &mut ValidationContext<'m>,
    container: &'m EntityContainer,
    member: &'m ContainerElement,
) {
    let (Some(type_name), bindings) = (member.entity_type(), member_bindings(member)) else {
        return;
    };
    let resolver = context.resolver();
    let Some(entity) = resolver.resolve_type_name(type_name).as_entity() else {
        return;
    };

    for binding in bindings {
        let is_navigation = matches!(
            resolver.resolve_property_path(&entity.structure, &binding.path),
            Some(Property::Navigation(_))
        );
        if !is_navigation {
            context.report(
                EdmErrorCode::BadUnresolvedNavigationPropertyPath,
                format!(
                    "binding path '{}' of '{}' does not name a navigation property of '{}'",
                    binding.path,
                    member.name(),
                    entity.full_name()
                ),
                member.location(),
            );
        }
        if !binding_target_resolves(resolver, container, binding) {
            context.report(
                EdmErrorCode::BadUnresolvedEntitySet,
                format!(
                    "binding target '{}' of '{}' cannot be resolved",
                    binding.target,
                    member.name()
                ),
                member.location(),
            );
        }
    }
}

fn member_bindings(member: &ContainerElement) -> &[NavigationPropertyBinding] {
    match member {
        ContainerElement::EntitySet(set) => &set.navigation_bindings,
        ContainerElement::Singleton(singleton) => &singleton.navigation_bindings,
        ContainerElement::OperationImport(_) => &[],
    }
}

/// Member by name, tolerating a cyclic `Extends` chain
fn find_member<'m>(
    resolver: Resolver<'m>,
    container: &'m EntityContainer,
    name: &str,
) -> Option<&'m ContainerElement> {
    resolver
        .find_container_element(container, name)
        .unwrap_or_else(|_| container.find_element(name))
}

/// Targets are `Set`, `NS.Container/Set` or a containment path `Set/Nav`
fn binding_target_resolves<'m>(
    resolver: Resolver<'m>,
    container: &'m EntityContainer,
    binding: &NavigationPropertyBinding,
) -> bool {
    let mut segments = binding.target.split('/');
    let Some(first) = segments.next() else {
        return false;
    };
    let (container, name) = if first.contains('.') {
        let Some(other) = resolver.find_container(first).first() else {
            return false;
        };
        let Some(name) = segments.next() else {
            return false;
        };
        (other, name)
    } else {
        (container, first)
    };

    let Some(member) = find_member(resolver, container, name) else {
        return false;
    };
    let Some(type_name) = member.entity_type() else {
        return false;
    };
    let rest: Vec<&str> = segments.collect();
    if rest.is_empty() {
        return true;
    }
    resolver
        .resolve_type_name(type_name)
        .as_entity()
        .and_then(|entity| resolver.resolve_property_path(&entity.structure, &rest.join("/")))
        .is_some_and(|property| matches!(property, Property::Navigation(_)))
}

/// Imports name an unbound operation of their own kind
pub(crate) fn operation_import<'m>(
    context: &mut ValidationContext<'m>,
    container: &'m EntityContainer,
    member: &'m ContainerElement,
) {
    let ContainerElement::OperationImport(import) = member else {
        return;
    };
    let resolver = context.resolver();
    let operations = resolver.find_operations(&import.operation);

    let problem = if operations.is_empty() {
        Some((
            EdmErrorCode::BadUnresolvedOperation,
            format!("operation '{}' cannot be resolved", import.operation),
        ))
    } else if !operations.iter().any(|op| op.kind == import.kind) {
        Some((
            EdmErrorCode::OperationImportKindMismatch,
            format!(
                "'{}' imports '{}', which has no overload of kind {}",
                import.name,
                import.operation,
                import.kind.as_str()
            ),
        ))
    } else if !operations
        .iter()
        .any(|op| op.kind == import.kind && !op.is_bound)
    {
        Some((
            EdmErrorCode::OperationImportCannotImportBoundOperation,
            format!(
                "'{}' imports bound operation '{}'",
                import.name, import.operation
            ),
        ))
    } else {
        None
    };
    if let Some((code, message)) = problem {
        context.report(code, message, import.location.as_ref());
    }

    import_entity_set(context, container, import);
}

fn import_entity_set<'m>(
    context: &mut ValidationContext<'m>,
    container: &'m EntityContainer,
    import: &'m OperationImport,
) {
    let Some(entity_set) = import.entity_set.as_deref() else {
        return;
    };
    let found = find_member(context.resolver(), container, entity_set);
    if !matches!(found, Some(ContainerElement::EntitySet(_))) {
        context.report(
            EdmErrorCode::BadUnresolvedEntitySet,
            format!(
                "entity set '{entity_set}' of '{}' cannot be resolved",
                import.name
            ),
            import.location.as_ref(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::{
        ComplexType, EntitySet, EntityType, Model, Multiplicity, NavigationProperty, Operation, OperationKind,
        PrimitiveKind, SchemaElement, Singleton, StructuralProperty, TypeReference,
    };

    fn run(model: &Model) -> Vec<EdmErrorCode> {
        let mut context = ValidationContext::new(model, model.version());
        for element in model.elements() {
            if let SchemaElement::EntityContainer(container) = element {
                container_extends(&mut context, container);
                unique_container_members(&mut context, container);
                for member in &container.elements {
                    entity_set_type(&mut context, container, member);
                    navigation_property_bindings(&mut context, container, member);
                    operation_import(&mut context, container, member);
                }
            }
        }
        context.into_errors().into_iter().map(|e| e.code).collect()
    }

    fn base_model() -> Model {
        let mut model = Model::default();
        model
            .add_element(
                EntityType::new("NS", "Customer")
                    .with_property(StructuralProperty::new(
                        "Id",
                        TypeReference::primitive(PrimitiveKind::Int32, false),
                    ))
                    .with_property(NavigationProperty::new(
                        "Orders",
                        "NS.Order",
                        Multiplicity::Many,
                    ))
                    .with_key(["Id"]),
            )
            .unwrap();
        model
            .add_element(
                EntityType::new("NS", "Order")
                    .with_property(StructuralProperty::new(
                        "Id",
                        TypeReference::primitive(PrimitiveKind::Int32, false),
                    ))
                    .with_key(["Id"]),
            )
            .unwrap();
        model
    }

    #[test]
    fn test_valid_container() {
        let mut model = base_model();
        model
            .add_element(
                Operation::function("NS", "TopCustomers").with_return_type(
                    TypeReference::collection(TypeReference::named("NS.Customer", false)),
                ),
            )
            .unwrap();
        model
            .add_element(
                EntityContainer::new("NS", "Service")
                    .with_element(
                        EntitySet::new("Customers", "NS.Customer").with_binding("Orders", "Orders"),
                    )
                    .with_element(EntitySet::new("Orders", "NS.Order"))
                    .with_element(
                        Singleton::new("Me", "NS.Customer")
                            .with_binding("Orders", "NS.Service/Orders"),
                    )
                    .with_element(
                        OperationImport::new(OperationKind::Function, "Top", "NS.TopCustomers")
                            .with_entity_set("Customers"),
                    ),
            )
            .unwrap();
        assert!(run(&model).is_empty());
    }

    #[test]
    fn test_unresolved_and_cyclic_extends() {
        let mut model = base_model();
        model
            .add_element(EntityContainer::new("NS", "Loop").with_extends("NS.Loop"))
            .unwrap();
        model
            .add_element(EntityContainer::new("NS", "Orphan").with_extends("NS.Nowhere"))
            .unwrap();
        assert_eq!(
            run(&model),
            vec![
                EdmErrorCode::BadCyclicEntityContainer,
                EdmErrorCode::BadUnresolvedEntityContainer
            ]
        );
    }

    #[test]
    fn test_member_problems() {
        let mut model = base_model();
        model.add_element(ComplexType::new("NS", "Address")).unwrap();
        model.add_element(EntityType::new("NS", "Keyless")).unwrap();
        model
            .add_element(
                EntityContainer::new("NS", "Service")
                    .with_element(EntitySet::new("A", "NS.Missing"))
                    .with_element(EntitySet::new("B", "NS.Address"))
                    .with_element(EntitySet::new("C", "NS.Keyless"))
                    .with_element(Singleton::new("D", "NS.Keyless"))
                    .with_element(Singleton::new("D", "NS.Customer")),
            )
            .unwrap();
        assert_eq!(
            run(&model),
            vec![
                EdmErrorCode::AlreadyDefined,
                EdmErrorCode::BadUnresolvedType,
                EdmErrorCode::EntitySetTypeMustBeEntityType,
                EdmErrorCode::EntitySetTypeHasNoKeys
            ]
        );
    }

    #[test]
    fn test_navigation_binding_problems() {
        let mut model = base_model();
        model
            .add_element(
                EntityContainer::new("NS", "Service")
                    .with_element(
                        EntitySet::new("Customers", "NS.Customer")
                            .with_binding("Id", "Orders")
                            .with_binding("Orders", "Nowhere"),
                    )
                    .with_element(EntitySet::new("Orders", "NS.Order")),
            )
            .unwrap();
        assert_eq!(
            run(&model),
            vec![
                EdmErrorCode::BadUnresolvedNavigationPropertyPath,
                EdmErrorCode::BadUnresolvedEntitySet
            ]
        );
    }

    #[test]
    fn test_operation_import_problems() {
        let mut model = base_model();
        model
            .add_element(
                Operation::action("NS", "Reset")
                    .bound(true)
                    .with_parameter("it", TypeReference::named("NS.Customer", false)),
            )
            .unwrap();
        model
            .add_element(
                Operation::function("NS", "Count")
                    .with_return_type(TypeReference::primitive(PrimitiveKind::Int32, false)),
            )
            .unwrap();
        model
            .add_element(
                EntityContainer::new("NS", "Service")
                    .with_element(OperationImport::new(
                        OperationKind::Action,
                        "Missing",
                        "NS.Missing",
                    ))
                    .with_element(OperationImport::new(OperationKind::Action, "Reset", "NS.Reset"))
                    .with_element(OperationImport::new(OperationKind::Action, "Count", "NS.Count"))
                    .with_element(
                        OperationImport::new(OperationKind::Function, "CountAll", "NS.Count")
                            .with_entity_set("Nothing"),
                    ),
            )
            .unwrap();
        assert_eq!(
            run(&model),
            vec![
                EdmErrorCode::BadUnresolvedOperation,
                EdmErrorCode::OperationImportCannotImportBoundOperation,
                EdmErrorCode::OperationImportKindMismatch,
                EdmErrorCode::BadUnresolvedEntitySet
            ]
        );
    }
}
