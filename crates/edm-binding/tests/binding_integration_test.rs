//! Integration tests for edm-binding crate
//!
//! These tests exercise name binding over models assembled the way a reader
//! would build them: duplicates, overloads and cross-model references.

use std::sync::Arc;

use anyhow::{Context, Result};
use edm_binding::{Binding, ResolvedTarget, Resolver};
use edm_model::{
    EdmErrorCode, EntityType, Model, Operation, PrimitiveKind, StructuralProperty, TargetPath,
    TypeReference,
};

/// Three `Function` overloads, none carrying a return type
fn overloaded_functions() -> Result<Model> {
    let mut model = Model::default();
    model.declare_namespace("DefaultNamespace", None);
    model.add_element(
        EntityType::new("DefaultNamespace", "Entity")
            .with_key(["Id"])
            .with_property(StructuralProperty::new(
                "Id",
                TypeReference::primitive(PrimitiveKind::Int32, false),
            )),
    )?;

    let string = || TypeReference::primitive(PrimitiveKind::String, true);
    let entity_ref = || TypeReference::entity_reference("DefaultNamespace.Entity", true);
    model.add_element(
        Operation::function("DefaultNamespace", "Function")
            .with_parameter("P1", string())
            .with_parameter("P2", entity_ref()),
    )?;
    model.add_element(
        Operation::function("DefaultNamespace", "Function")
            .with_parameter("Q1", string())
            .with_parameter("Q2", entity_ref()),
    )?;
    model.add_element(
        Operation::function("DefaultNamespace", "Function")
            .with_parameter("R1", TypeReference::primitive(PrimitiveKind::Int32, true)),
    )?;
    Ok(model)
}

#[test]
fn test_signature_target_on_overloads_is_ambiguous() -> Result<()> {
    let model = overloaded_functions()?;
    let resolver = Resolver::new(&model);
    let path =
        TargetPath::parse("DefaultNamespace.Function(Edm.String, Ref(DefaultNamespace.Entity))")?;

    let target = resolver.resolve_target(&path);
    let ResolvedTarget::Operation(binding) = &target else {
        panic!("expected an operation target, got {target:?}");
    };
    assert!(binding.is_ambiguous());
    assert_eq!(binding.candidates().len(), 2);

    let first = binding.first().context("overload group is empty")?;
    assert!(first.return_type.is_none());
    assert_eq!(first.parameters[0].name, "P1");

    let errors = target.errors(&path);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, EdmErrorCode::AmbiguousElementBinding);
    Ok(())
}

#[test]
fn test_ambiguity_is_independent_of_insertion_order() -> Result<()> {
    let first = EntityType::new("NS", "Thing").with_key(["A"]);
    let second = EntityType::new("NS", "Thing").with_key(["B"]);

    let mut forward = Model::default();
    forward.add_element(first.clone())?;
    forward.add_element(second.clone())?;

    let mut reversed = Model::default();
    reversed.add_element(second)?;
    reversed.add_element(first)?;

    for model in [&mut forward, &mut reversed] {
        assert!(Resolver::new(model).find_entity_type("NS.Thing").is_ambiguous());
        model.add_element(EntityType::new("NS", "Thing").with_key(["C"]))?;
        let binding = Resolver::new(model).find_entity_type("NS.Thing");
        assert!(binding.is_ambiguous());
        assert_eq!(binding.errors("NS.Thing").len(), 1);
    }
    Ok(())
}

#[test]
fn test_reference_graph_with_cycle() -> Result<()> {
    let mut shared = Model::default();
    shared.add_element(EntityType::new("Shared", "Base"))?;
    let shared = Arc::new(shared);

    let mut middle = Model::default();
    middle.add_reference(Arc::clone(&shared));
    middle.add_element(EntityType::new("Middle", "Derived").with_base_type("Shared.Base"))?;
    let middle = Arc::new(middle);

    let mut top = Model::default();
    top.add_reference(Arc::clone(&middle));
    top.add_reference(Arc::clone(&shared));

    let resolver = Resolver::new(&top);
    assert_eq!(resolver.visible_models().len(), 3);

    let derived = resolver
        .find_structured_type("Middle.Derived")
        .first()
        .context("Middle.Derived is not visible")?;
    let base = resolver
        .find_structured_type("Shared.Base")
        .first()
        .context("Shared.Base is not visible")?;
    assert!(resolver.is_derived_from(derived, base));
    assert!(matches!(resolver.find_type("Shared.Base"), Binding::Resolved(_)));
    Ok(())
}
