//! Integration tests for edm-validation crate
//!
//! These tests read CSDL documents with edm-csdl and validate the resulting
//! models end to end.

use anyhow::Result;
use edm_binding::Resolver;
use edm_csdl::{CsdlReader, CsdlWriter, WriterSettings};
use edm_model::{EdmErrorCode, EdmVersion, Model};
use edm_validation::{ValidationConfig, ValidationEngine, ValidationReport, ValidationResult};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn parse(text: &str) -> Result<Model> {
    let outcome = CsdlReader::default().read(&[text])?;
    assert!(outcome.is_clean(), "{:?}", outcome.errors);
    Ok(outcome.model)
}

fn validate(model: &Model) -> Result<ValidationResult> {
    Ok(ValidationEngine::new().validate(model)?)
}

fn document(version: &str, schema: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx Version="{version}" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
  <edmx:DataServices>
    <Schema Namespace="NS" xmlns="http://docs.oasis-open.org/odata/ns/edm">
{schema}
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#
    )
}

const SHOP: &str = r#"      <EntityType Name="Customer">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
        <Property Name="Name" Type="Edm.String" MaxLength="100"/>
        <NavigationProperty Name="Orders" Type="Collection(NS.Order)" Partner="Customer"/>
      </EntityType>
      <EntityType Name="Order">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
        <Property Name="CustomerId" Type="Edm.Int32" Nullable="false"/>
        <NavigationProperty Name="Customer" Type="NS.Customer" Nullable="false" Partner="Orders">
          <ReferentialConstraint Property="CustomerId" ReferencedProperty="Id"/>
        </NavigationProperty>
      </EntityType>
      <Function Name="TopCustomers">
        <Parameter Name="count" Type="Edm.Int32" Nullable="false"/>
        <ReturnType Type="Collection(NS.Customer)"/>
      </Function>
      <Term Name="Description" Type="Edm.String"/>
      <EntityContainer Name="Shop">
        <EntitySet Name="Customers" EntityType="NS.Customer">
          <NavigationPropertyBinding Path="Orders" Target="Orders"/>
        </EntitySet>
        <EntitySet Name="Orders" EntityType="NS.Order">
          <NavigationPropertyBinding Path="Customer" Target="Customers"/>
        </EntitySet>
        <FunctionImport Name="TopCustomers" Function="NS.TopCustomers" EntitySet="Customers"/>
      </EntityContainer>
      <Annotations Target="NS.Customer">
        <Annotation Term="NS.Description" String="A customer of the shop"/>
      </Annotations>"#;

#[test]
fn test_clean_document_validates_and_round_trips() -> Result<()> {
    init_tracing();
    let model = parse(&document("4.01", SHOP))?;

    let result = validate(&model)?;
    assert!(result.is_valid, "{:?}", result.errors);
    assert_eq!(result.version, EdmVersion::V401);

    let writer = CsdlWriter::new(WriterSettings::default());
    let first = writer.write(&model)?;
    let reparsed = parse(&first[0].text)?;
    let second = writer.write(&reparsed)?;
    assert_eq!(first[0].text, second[0].text);
    assert!(validate(&reparsed)?.is_valid);
    Ok(())
}

const CONTAINMENT: &str = r#"      <EntityType Name="Order">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
        <NavigationProperty Name="Lines" Type="Collection(NS.Line)" ContainsTarget="true" Partner="Order"/>
      </EntityType>
      <EntityType Name="Line">
        <Key><PropertyRef Name="No"/></Key>
        <Property Name="No" Type="Edm.Int32" Nullable="false"/>
        <NavigationProperty Name="Order" {source}/>
      </EntityType>"#;

/// `source` holds the attributes of the back-pointing navigation property
fn containment(version: &str, source: &str) -> String {
    document(version, &CONTAINMENT.replace("{source}", source))
}

#[test]
fn test_containment_source_many_is_rejected() -> Result<()> {
    init_tracing();
    let code = EdmErrorCode::NavigationPropertyWithNonRecursiveContainmentSourceMustBeFromOne;

    for version in ["4.0", "4.01"] {
        let model = parse(&containment(version, r#"Type="Collection(NS.Order)""#))?;
        let result = validate(&model)?;
        assert_eq!(result.errors_with_code(code).count(), 1, "version {version}");
    }
    Ok(())
}

#[test]
fn test_optional_containment_source_depends_on_version() -> Result<()> {
    init_tracing();
    let code = EdmErrorCode::NavigationPropertyWithNonRecursiveContainmentSourceMustBeFromOne;

    let v4 = validate(&parse(&containment("4.0", r#"Type="NS.Order""#))?)?;
    assert!(v4.has_code(code));

    let v401 = validate(&parse(&containment("4.01", r#"Type="NS.Order""#))?)?;
    assert!(v401.is_valid, "{:?}", v401.errors);

    let source = r#"Type="NS.Order" Nullable="false""#;
    let required = validate(&parse(&containment("4.0", source))?)?;
    assert!(required.is_valid, "{:?}", required.errors);
    Ok(())
}

#[test]
fn test_recursive_containment_requires_optional_source() -> Result<()> {
    init_tracing();
    let folders = |nullable: &str| {
        document(
            "4.01",
            &format!(
                r#"      <EntityType Name="Folder">
        <Key><PropertyRef Name="Id"/></Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
        <NavigationProperty Name="Children" Type="Collection(NS.Folder)" ContainsTarget="true" Partner="Parent"/>
        <NavigationProperty Name="Parent" Type="NS.Folder" Nullable="{nullable}"/>
      </EntityType>"#
            ),
        )
    };

    let required = validate(&parse(&folders("false"))?)?;
    assert_eq!(
        required
            .errors
            .iter()
            .map(|e| e.code)
            .collect::<Vec<_>>(),
        vec![EdmErrorCode::NavigationPropertyWithRecursiveContainmentSourceMustBeFromZeroOrOne]
    );

    let optional = validate(&parse(&folders("true"))?)?;
    assert!(optional.is_valid, "{:?}", optional.errors);
    Ok(())
}

#[test]
fn test_self_extending_container_is_cyclic() -> Result<()> {
    init_tracing();
    let model = parse(&document(
        "4.01",
        r#"      <EntityContainer Name="Self" Extends="NS.Self"/>"#,
    ))?;

    let resolver = Resolver::new(&model);
    let container = model.entity_container().expect("container");
    let err = resolver.container_elements(container).unwrap_err();
    assert!(matches!(err, edm_binding::Error::CyclicContainer { .. }));

    let result = validate(&model)?;
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code, EdmErrorCode::BadCyclicEntityContainer);
    Ok(())
}

#[test]
fn test_integer_constant_out_of_range() -> Result<()> {
    init_tracing();
    let model = parse(&document(
        "4.0",
        r#"      <ComplexType Name="Point"/>
      <Term Name="Offset" Type="Edm.SByte"/>
      <Annotations Target="NS.Point">
        <Annotation Term="NS.Offset" Int="-129"/>
      </Annotations>"#,
    ))?;

    let result = validate(&model)?;
    assert_eq!(
        result.errors.iter().map(|e| e.code).collect::<Vec<_>>(),
        vec![EdmErrorCode::IntegerConstantValueOutOfRange]
    );
    Ok(())
}

#[test]
fn test_unresolved_type_is_reported_once() -> Result<()> {
    init_tracing();
    let outcome = CsdlReader::default().read(&[document(
        "4.01",
        r#"      <EntityType Name="Gadget">
        <Key><PropertyRef Name="Code"/></Key>
        <Property Name="Code" Type="NS.Missing" Nullable="false"/>
      </EntityType>
      <EntityContainer Name="Store">
        <EntitySet Name="Gadgets" EntityType="NS.Gadget"/>
      </EntityContainer>"#,
    )
    .as_str()])?;
    assert_eq!(outcome.errors.len(), 1);

    let result = validate(&outcome.model)?;
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    assert_eq!(result.errors[0].code, EdmErrorCode::BadUnresolvedType);
    assert!(result.errors[0].location.is_some());
    Ok(())
}

#[test]
fn test_report_for_broken_model() -> Result<()> {
    init_tracing();
    let model = parse(&document(
        "4.0",
        r#"      <EntityType Name="Keyless">
        <Property Name="Name" Type="Edm.String"/>
      </EntityType>
      <EntityType Name="Twice">
        <Key><PropertyRef Name="Id"/><PropertyRef Name="Other"/></Key>
        <Property Name="Id" Type="Edm.Int32"/>
      </EntityType>
      <EntityContainer Name="Store">
        <EntitySet Name="Things" EntityType="NS.Keyless"/>
      </EntityContainer>"#,
    ))?;

    let result = validate(&model)?;
    let report = ValidationReport::from_result(&result);
    assert_eq!(report.total, 3);
    assert_eq!(report.count(EdmErrorCode::InvalidKey), 2);
    assert_eq!(report.count(EdmErrorCode::EntitySetTypeHasNoKeys), 1);
    assert_eq!(
        report.summary(),
        "EDM 4.0: 3 errors (2 InvalidKey, 1 EntitySetTypeHasNoKeys)"
    );
    Ok(())
}

#[test]
fn test_version_override_and_disabled_rules() -> Result<()> {
    init_tracing();
    let model = parse(&containment("4.01", r#"Type="NS.Order""#))?;
    assert!(validate(&model)?.is_valid);

    let strict = ValidationEngine::with_config(ValidationConfig::for_version(EdmVersion::V4));
    let result = strict.validate(&model)?;
    assert_eq!(result.version, EdmVersion::V4);
    assert!(!result.is_valid);

    let relaxed = ValidationEngine::with_config(
        ValidationConfig::for_version(EdmVersion::V4).disable("containment_source_from_one"),
    );
    assert!(relaxed.validate(&model)?.is_valid);
    Ok(())
}
