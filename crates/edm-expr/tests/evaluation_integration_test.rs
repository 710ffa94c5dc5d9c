//! Integration tests for edm-expr crate
//!
//! These tests evaluate and type-check expressions against small models,
//! with caller supplied native functions.

use anyhow::Result;
use edm_binding::Resolver;
use edm_expr::{
    Error, EvaluationContext, Evaluator, FunctionRegistry, StructuredValue, TypeChecker, Value,
};
use edm_model::{
    ComplexType, EdmErrorCode, Expression, Model, Operation, PrimitiveKind, StructuralProperty,
    TypeReference,
};

fn pricing_model() -> Model {
    let mut model = Model::default();
    model
        .add_element(
            ComplexType::new("Shop", "Price")
                .with_property(StructuralProperty::new(
                    "Amount",
                    TypeReference::primitive(PrimitiveKind::Decimal, false),
                ))
                .with_property(StructuralProperty::new(
                    "Currency",
                    TypeReference::primitive(PrimitiveKind::String, false),
                )),
        )
        .unwrap();
    model
        .add_element(
            Operation::function("Shop", "Discount")
                .with_parameter("percent", TypeReference::primitive(PrimitiveKind::Int32, false))
                .with_return_type(TypeReference::primitive(PrimitiveKind::Int32, false)),
        )
        .unwrap();
    model
}

#[test]
fn test_custom_function_with_path_arguments() -> Result<()> {
    let model = pricing_model();
    let mut functions = FunctionRegistry::with_canonical_functions();
    functions.register("Shop.Discount", |args: &[Value]| match args {
        [Value::Integer(percent)] => Ok(Value::Integer(100 - percent)),
        _ => Err(Error::FunctionFailed {
            function: "Shop.Discount".to_string(),
            reason: "expected a percentage".to_string(),
        }),
    });
    let evaluator = Evaluator::new(&model, &functions);

    let order = StructuredValue::new(Some("Shop.Order".to_string()))
        .with_property("Percent", Value::Integer(15))
        .with_property("Code", Value::from("SUMMER"));
    let context = EvaluationContext::with_current(Value::from(order));

    let expression = Expression::apply("Shop.Discount", vec![Expression::path("Percent")]);
    assert_eq!(evaluator.evaluate(&expression, &context)?, Value::Integer(85));

    let label = Expression::apply(
        "odata.concat",
        vec![Expression::string("code: "), Expression::path("Code")],
    );
    assert_eq!(evaluator.evaluate(&label, &context)?, Value::from("code: SUMMER"));
    Ok(())
}

#[test]
fn test_record_evaluates_and_type_checks() -> Result<()> {
    let model = pricing_model();
    let functions = FunctionRegistry::new();
    let evaluator = Evaluator::new(&model, &functions);
    let checker = TypeChecker::new(Resolver::new(&model));
    let price_type = TypeReference::named("Shop.Price", false);

    let price = Expression::record(
        Some(price_type.clone()),
        [
            ("Amount", Expression::integer(10)),
            ("Currency", Expression::string("EUR")),
        ],
    );
    assert!(checker.check(&price, &price_type, None).is_empty());

    let value = evaluator.evaluate(&price, &EvaluationContext::new())?;
    let record = value.as_structured().expect("record value");
    assert_eq!(record.type_name.as_deref(), Some("Shop.Price"));
    assert_eq!(record.property("Currency"), Some(&Value::from("EUR")));
    Ok(())
}

#[test]
fn test_function_argument_checks() {
    let model = pricing_model();
    let checker = TypeChecker::new(Resolver::new(&model));
    let int = TypeReference::primitive(PrimitiveKind::Int32, false);

    let wrong_arity = Expression::apply("Shop.Discount", vec![]);
    let errors = checker.check(&wrong_arity, &int, None);
    assert_eq!(errors[0].code, EdmErrorCode::FunctionArgumentsMismatch);

    let wrong_argument = Expression::apply("Shop.Discount", vec![Expression::string("ten")]);
    let errors = checker.check(&wrong_argument, &int, None);
    assert_eq!(
        errors[0].code,
        EdmErrorCode::ExpressionPrimitiveKindNotValidForAssertedType
    );

    let wrong_result = checker.check(
        &Expression::apply("Shop.Discount", vec![Expression::integer(5)]),
        &TypeReference::primitive(PrimitiveKind::Boolean, false),
        None,
    );
    assert_eq!(
        wrong_result[0].code,
        EdmErrorCode::ExpressionNotValidForTheAssertedType
    );
}

#[test]
fn test_evaluation_failures_map_to_diagnostics() {
    let model = Model::default();
    let functions = FunctionRegistry::new();
    let evaluator = Evaluator::new(&model, &functions);

    let err = evaluator
        .evaluate(&Expression::label_reference("Missing"), &EvaluationContext::new())
        .unwrap_err();
    let errors = err.to_edm_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, EdmErrorCode::BadUnresolvedLabeledElement);
}
