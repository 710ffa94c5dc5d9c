//! CSDL document reader
//!
//! Reading happens in two phases. Every document of a unit is first turned
//! into provisional model elements; names are stored as written (with
//! aliases rewritten) and each reference is remembered. Once all documents
//! are in, a single resolution pass binds labeled element references and
//! checks every remembered reference through the binding resolver.

use crate::settings::ReaderSettings;
use crate::syntax::{self, EDM_NAMESPACE, EDMX_NAMESPACE, XmlElement};
use crate::{ParseFailure, Result};
use edm_binding::Resolver;
use edm_model::{
    ComplexType, Constant, ConstantKind, ContainerElement, CoreModel, DocumentReference,
    EdmError, EdmErrorCode, EdmType, EdmVersion, EntityContainer, EntitySet, EntityType,
    EnumMember, EnumType, Expression, Facets, IfExpression, IncludeAnnotations, LabeledElement,
    LabeledElementReference, MaxLength, Model, Multiplicity, NavigationProperty,
    NavigationPropertyBinding, NodeId, OnDeleteAction, Operation, OperationImport, OperationKind,
    Parameter, PathExpression, Property, PropertyRef, PropertyValue, RecordExpression,
    ReferenceInclude, ReferentialConstraint, ReturnType, Scale, SchemaElement, Singleton,
    SourceLocation, Srid, StructuralProperty, StructuredType, TargetPath, Term, TypeAssertion,
    TypeDefinition, TypeReference, VocabularyAnnotation,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

const CSDL_NAMESPACES: [&str; 2] = [EDM_NAMESPACE, EDMX_NAMESPACE];
const FACET_ATTRIBUTES: [&str; 5] = ["MaxLength", "Precision", "Scale", "Unicode", "SRID"];

/// Result of a successful read
#[derive(Debug)]
pub struct ParseOutcome {
    pub model: Model,

    /// References that did not bind; the model is still usable
    pub errors: Vec<EdmError>,
}

impl ParseOutcome {
    /// Whether every reference bound
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Reads CSDL documents into a [`Model`]
#[derive(Debug, Clone, Default)]
pub struct CsdlReader {
    settings: ReaderSettings,
    references: Vec<Arc<Model>>,
}

impl CsdlReader {
    /// Create a reader with the given settings
    pub fn new(settings: ReaderSettings) -> Self {
        Self {
            settings,
            references: Vec::new(),
        }
    }

    /// Make an already built model visible to the documents being read
    #[must_use]
    pub fn with_reference(mut self, model: Arc<Model>) -> Self {
        self.references.push(model);
        self
    }

    /// Read one parse unit
    ///
    /// Fails only for structural problems; unresolved references are
    /// returned in [`ParseOutcome::errors`].
    pub fn read(&self, documents: &[&str]) -> Result<ParseOutcome> {
        let mut errors = Vec::new();
        let mut roots = Vec::new();

        for (index, text) in documents.iter().enumerate() {
            let source = self.settings.source_name(index);
            debug!(document = index, source = source.unwrap_or("<unnamed>"), "parsing CSDL document");
            match syntax::parse_document(text, source) {
                Ok(root) => roots.push(root),
                Err(error) => errors.push(error),
            }
        }

        let version = self.unit_version(&roots, &mut errors);
        let mut builder = UnitBuilder::new(Model::new(version));
        for reference in &self.references {
            builder.model.add_reference(Arc::clone(reference));
        }
        for root in &roots {
            builder.read_document(root);
        }

        errors.append(&mut builder.errors);
        if !errors.is_empty() {
            debug!(errors = errors.len(), "CSDL read failed");
            return Err(ParseFailure { errors }.into());
        }

        let UnitBuilder {
            model, deferred, ..
        } = builder;
        let mut unresolved = bind_labeled_references(&model);
        unresolved.extend(resolve_deferred(&model, &deferred));
        debug!(
            elements = model.elements().len(),
            annotations = model.vocabulary_annotations().len(),
            deferred = deferred.len(),
            unresolved = unresolved.len(),
            "CSDL read finished"
        );
        Ok(ParseOutcome {
            model,
            errors: unresolved,
        })
    }

    /// The single version shared by every document of the unit
    fn unit_version(&self, roots: &[XmlElement], errors: &mut Vec<EdmError>) -> EdmVersion {
        let mut unit: Option<(EdmVersion, &SourceLocation)> = None;
        for root in roots {
            let version = match document_version(root) {
                Ok(Some(version)) => version,
                Ok(None) => self.settings.default_version,
                Err(error) => {
                    errors.push(error);
                    continue;
                }
            };
            match unit {
                None => unit = Some((version, &root.location)),
                Some((first, first_location)) if first != version => {
                    errors.push(
                        EdmError::new(
                            EdmErrorCode::IncompatibleVersions,
                            format!(
                                "document version {version} differs from version {first} declared at {first_location}"
                            ),
                        )
                        .at(root.location()),
                    );
                }
                Some(_) => {}
            }
        }
        unit.map_or(self.settings.default_version, |(version, _)| version)
    }
}

/// `Version` of an `edmx:Edmx` root, `None` for a bare schema
fn document_version(root: &XmlElement) -> std::result::Result<Option<EdmVersion>, EdmError> {
    if root.is(EDMX_NAMESPACE, "Edmx") {
        let text = root.attribute("Version").ok_or_else(|| {
            EdmError::new(EdmErrorCode::MissingAttribute, "edmx:Edmx requires a Version")
                .at(root.location())
        })?;
        return text.parse().map(Some).map_err(|_| {
            EdmError::new(
                EdmErrorCode::InvalidVersionNumber,
                format!("unsupported CSDL version '{text}'"),
            )
            .at(root.location())
        });
    }
    if root.is(EDM_NAMESPACE, "Schema") {
        return Ok(None);
    }
    Err(EdmError::new(
        EdmErrorCode::UnexpectedXmlElement,
        format!("unexpected document element '{}'", root.name),
    )
    .at(root.location()))
}

/// Reference remembered for the resolution pass
#[derive(Debug, Clone)]
enum Deferred {
    Type(String),
    Term(String),
    Operation(String),
    Container(String),
    Target(TargetPath),
}

#[derive(Debug, Clone)]
struct DeferredReference {
    reference: Deferred,
    location: SourceLocation,
}

/// Builds one model from the documents of a parse unit
struct UnitBuilder {
    model: Model,

    /// Alias to namespace, per document
    aliases: HashMap<String, String>,
    errors: Vec<EdmError>,
    deferred: Vec<DeferredReference>,
}

impl UnitBuilder {
    fn new(model: Model) -> Self {
        Self {
            model,
            aliases: HashMap::new(),
            errors: Vec::new(),
            deferred: Vec::new(),
        }
    }

    fn read_document(&mut self, root: &XmlElement) {
        self.aliases.clear();
        if root.is(EDM_NAMESPACE, "Schema") {
            self.collect_schema_alias(root);
            self.read_schema(root);
        } else if root.is(EDMX_NAMESPACE, "Edmx") {
            self.read_edmx(root);
        }
        trace!(source = ?root.location.source, "document read");
    }

    fn read_edmx(&mut self, root: &XmlElement) {
        self.check_attributes(root, &["Version"]);

        // aliases are document scoped and may be used before their declaration
        for child in &root.children {
            if child.is(EDMX_NAMESPACE, "Reference") {
                for include in child.children.iter().filter(|c| c.is(EDMX_NAMESPACE, "Include")) {
                    if let (Some(namespace), Some(alias)) =
                        (include.attribute("Namespace"), include.attribute("Alias"))
                    {
                        self.aliases.insert(alias.to_string(), namespace.to_string());
                    }
                }
            } else if child.is(EDMX_NAMESPACE, "DataServices") {
                for schema in &child.children {
                    self.collect_schema_alias(schema);
                }
            }
        }

        let mut data_services = 0;
        for child in &root.children {
            if child.is(EDMX_NAMESPACE, "Reference") {
                self.read_reference(child);
            } else if child.is(EDMX_NAMESPACE, "DataServices") {
                data_services += 1;
                self.check_attributes(child, &[]);
                for schema in &child.children {
                    if schema.is(EDM_NAMESPACE, "Schema") {
                        self.read_schema(schema);
                    } else {
                        self.unexpected_element(schema);
                    }
                }
            } else {
                self.unexpected_element(child);
            }
        }
        if data_services != 1 {
            self.error(
                EdmErrorCode::UnexpectedXmlElement,
                format!("edmx:Edmx must contain one edmx:DataServices, found {data_services}"),
                root,
            );
        }
    }

    fn collect_schema_alias(&mut self, schema: &XmlElement) {
        if let (Some(namespace), Some(alias)) =
            (schema.attribute("Namespace"), schema.attribute("Alias"))
        {
            self.aliases.insert(alias.to_string(), namespace.to_string());
        }
    }

    fn read_reference(&mut self, el: &XmlElement) {
        self.check_attributes(el, &["Uri"]);
        let Some(uri) = self.required(el, "Uri") else {
            return;
        };
        let mut reference = DocumentReference::new(uri);
        for child in &el.children {
            if child.is(EDMX_NAMESPACE, "Include") {
                self.check_attributes(child, &["Namespace", "Alias"]);
                if let Some(namespace) = self.required(child, "Namespace") {
                    reference.includes.push(ReferenceInclude {
                        namespace: namespace.to_string(),
                        alias: child.attribute("Alias").map(str::to_string),
                    });
                }
            } else if child.is(EDMX_NAMESPACE, "IncludeAnnotations") {
                self.check_attributes(child, &["TermNamespace", "Qualifier", "TargetNamespace"]);
                if let Some(term_namespace) = self.required(child, "TermNamespace") {
                    reference.include_annotations.push(IncludeAnnotations {
                        term_namespace: term_namespace.to_string(),
                        qualifier: child.attribute("Qualifier").map(str::to_string),
                        target_namespace: child.attribute("TargetNamespace").map(str::to_string),
                    });
                }
            } else if child.is(EDM_NAMESPACE, "Annotation") {
                trace!("skipping annotation on edmx:Reference");
            } else {
                self.unexpected_element(child);
            }
        }
        if !self.model.document_references().contains(&reference) {
            self.model.add_document_reference(reference);
        }
    }

    fn read_schema(&mut self, el: &XmlElement) {
        self.check_attributes(el, &["Namespace", "Alias"]);
        let Some(namespace) = self.required(el, "Namespace") else {
            return;
        };
        debug!(namespace, "reading schema");
        self.model.declare_namespace(namespace, el.attribute("Alias"));

        for child in &el.children {
            if !self.expect_edm(child) {
                continue;
            }
            match child.name.as_str() {
                "EntityType" => self.read_entity_type(namespace, child),
                "ComplexType" => self.read_complex_type(namespace, child),
                "EnumType" => self.read_enum_type(namespace, child),
                "TypeDefinition" => self.read_type_definition(namespace, child),
                "Term" => self.read_term(namespace, child),
                "Action" => self.read_operation(namespace, OperationKind::Action, child),
                "Function" => self.read_operation(namespace, OperationKind::Function, child),
                "EntityContainer" => self.read_container(namespace, child),
                "Annotations" => self.read_annotations_block(namespace, child),
                "Annotation" => self.read_inline_annotation(child, TargetPath::element(namespace)),
                _ => self.unexpected_element(child),
            }
        }
    }

    // -- types --------------------------------------------------------------

    fn read_entity_type(&mut self, namespace: &str, el: &XmlElement) {
        self.check_attributes(el, &["Name", "BaseType", "Abstract", "OpenType", "HasStream"]);
        let Some(name) = self.required(el, "Name") else {
            return;
        };
        let mut entity = EntityType::new(namespace, name);
        self.read_structure(&mut entity.structure, el);
        entity.has_stream = self.bool_attr(el, "HasStream", false);

        let full_name = entity.full_name();
        for child in &el.children {
            if !self.expect_edm(child) {
                continue;
            }
            match child.name.as_str() {
                "Key" => entity.key.extend(self.read_key(child)),
                "Property" | "NavigationProperty" | "Annotation" => {
                    self.read_structure_child(&mut entity.structure, &full_name, child);
                }
                _ => self.unexpected_element(child),
            }
        }
        self.add(entity, el);
    }

    fn read_complex_type(&mut self, namespace: &str, el: &XmlElement) {
        self.check_attributes(el, &["Name", "BaseType", "Abstract", "OpenType"]);
        let Some(name) = self.required(el, "Name") else {
            return;
        };
        let mut complex = ComplexType::new(namespace, name);
        self.read_structure(&mut complex.structure, el);

        let full_name = complex.full_name();
        for child in &el.children {
            if !self.expect_edm(child) {
                continue;
            }
            match child.name.as_str() {
                "Property" | "NavigationProperty" | "Annotation" => {
                    self.read_structure_child(&mut complex.structure, &full_name, child);
                }
                _ => self.unexpected_element(child),
            }
        }
        self.add(complex, el);
    }

    fn read_structure(&mut self, structure: &mut StructuredType, el: &XmlElement) {
        structure.location = Some(el.location.clone());
        structure.is_abstract = self.bool_attr(el, "Abstract", false);
        structure.is_open = self.bool_attr(el, "OpenType", false);
        if let Some(base) = el.attribute("BaseType") {
            let base = self.normalize_name(base);
            self.defer(Deferred::Type(base.clone()), el);
            structure.base_type = Some(base);
        }
        self.direct_annotations(el, structure.id);
    }

    fn read_structure_child(
        &mut self,
        structure: &mut StructuredType,
        owner: &str,
        child: &XmlElement,
    ) {
        match child.name.as_str() {
            "Property" => {
                if let Some(property) = self.read_property(owner, child) {
                    structure.properties.push(Property::Structural(property));
                }
            }
            "NavigationProperty" => {
                if let Some(property) = self.read_navigation_property(owner, child) {
                    structure.properties.push(Property::Navigation(property));
                }
            }
            _ => self.read_inline_annotation(child, TargetPath::element(owner)),
        }
    }

    fn read_key(&mut self, el: &XmlElement) -> Vec<PropertyRef> {
        self.check_attributes(el, &[]);
        let mut key = Vec::new();
        for child in &el.children {
            if !child.is(EDM_NAMESPACE, "PropertyRef") {
                self.unexpected_element(child);
                continue;
            }
            self.check_attributes(child, &["Name", "Alias"]);
            if let Some(name) = self.required(child, "Name") {
                key.push(PropertyRef {
                    name: name.to_string(),
                    alias: child.attribute("Alias").map(str::to_string),
                });
            }
        }
        key
    }

    fn read_property(&mut self, owner: &str, el: &XmlElement) -> Option<StructuralProperty> {
        self.check_attributes(
            el,
            &[
                "Name", "Type", "Nullable", "MaxLength", "Precision", "Scale", "Unicode", "SRID",
                "DefaultValue",
            ],
        );
        let name = self.required(el, "Name")?;
        let type_ref = self.type_reference(el, true)?;
        let mut property = StructuralProperty::new(name, type_ref);
        property.default_value = el.attribute("DefaultValue").map(str::to_string);
        property.location = Some(el.location.clone());
        self.direct_annotations(el, property.id);
        self.read_member_annotations(el, &TargetPath::member(owner, name));
        Some(property)
    }

    fn read_navigation_property(
        &mut self,
        owner: &str,
        el: &XmlElement,
    ) -> Option<NavigationProperty> {
        self.check_attributes(
            el,
            &["Name", "Type", "Nullable", "Partner", "ContainsTarget"],
        );
        let name = self.required(el, "Name")?;
        let type_name = self.required(el, "Type")?;
        let type_name = self.normalize_type(type_name);
        let nullable = self.bool_attr(el, "Nullable", true);

        let type_ref = TypeReference::parse(&type_name, nullable);
        let multiplicity = if type_ref.is_collection() {
            Multiplicity::Many
        } else if nullable {
            Multiplicity::ZeroOrOne
        } else {
            Multiplicity::One
        };
        let target = type_ref.element_type().type_name();
        self.defer(Deferred::Type(target.clone()), el);

        let mut property = NavigationProperty::new(name, target, multiplicity);
        property.partner = el.attribute("Partner").map(str::to_string);
        property.contains_target = self.bool_attr(el, "ContainsTarget", false);
        property.location = Some(el.location.clone());
        self.direct_annotations(el, property.id);

        let target_path = TargetPath::member(owner, name);
        for child in &el.children {
            if !self.expect_edm(child) {
                continue;
            }
            match child.name.as_str() {
                "ReferentialConstraint" => {
                    self.check_attributes(child, &["Property", "ReferencedProperty"]);
                    let dependent = self.required(child, "Property");
                    let principal = self.required(child, "ReferencedProperty");
                    if let (Some(dependent), Some(principal)) = (dependent, principal) {
                        property.referential_constraints.push(ReferentialConstraint {
                            property: dependent.to_string(),
                            referenced_property: principal.to_string(),
                        });
                    }
                    self.skip_nested_annotations(child);
                }
                "OnDelete" => {
                    self.check_attributes(child, &["Action"]);
                    if let Some(action) = self.required(child, "Action") {
                        match OnDeleteAction::parse(action) {
                            Some(action) => property.on_delete = Some(action),
                            None => self.invalid_value(child, "Action", action),
                        }
                    }
                    self.skip_nested_annotations(child);
                }
                "Annotation" => self.read_inline_annotation(child, target_path.clone()),
                _ => self.unexpected_element(child),
            }
        }
        Some(property)
    }

    fn read_enum_type(&mut self, namespace: &str, el: &XmlElement) {
        self.check_attributes(el, &["Name", "UnderlyingType", "IsFlags"]);
        let Some(name) = self.required(el, "Name") else {
            return;
        };
        let mut enum_type = EnumType::new(namespace, name);
        if let Some(underlying) = el.attribute("UnderlyingType") {
            enum_type.underlying_type = self.normalize_type(underlying);
        }
        enum_type.is_flags = self.bool_attr(el, "IsFlags", false);
        enum_type.location = Some(el.location.clone());
        self.direct_annotations(el, enum_type.id);

        let full_name = enum_type.full_name();
        for child in &el.children {
            if !self.expect_edm(child) {
                continue;
            }
            match child.name.as_str() {
                "Member" => {
                    if let Some(member) = self.read_enum_member(&full_name, child) {
                        enum_type.members.push(member);
                    }
                }
                "Annotation" => self.read_inline_annotation(child, TargetPath::element(&full_name)),
                _ => self.unexpected_element(child),
            }
        }
        self.add(enum_type, el);
    }

    fn read_enum_member(&mut self, owner: &str, el: &XmlElement) -> Option<EnumMember> {
        self.check_attributes(el, &["Name", "Value"]);
        let name = self.required(el, "Name")?;
        let value = match el.attribute("Value") {
            None => None,
            Some(text) => match text.trim().parse::<i64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    self.invalid_value(el, "Value", text);
                    None
                }
            },
        };
        let mut member = EnumMember::new(name, value);
        member.location = Some(el.location.clone());
        self.direct_annotations(el, member.id);
        self.read_member_annotations(el, &TargetPath::member(owner, name));
        Some(member)
    }

    fn read_type_definition(&mut self, namespace: &str, el: &XmlElement) {
        let mut allowed = vec!["Name", "UnderlyingType"];
        allowed.extend(FACET_ATTRIBUTES);
        self.check_attributes(el, &allowed);
        let (Some(name), Some(underlying)) =
            (self.required(el, "Name"), self.required(el, "UnderlyingType"))
        else {
            return;
        };
        let underlying = self.normalize_type(underlying);
        let mut definition = TypeDefinition::new(namespace, name, underlying);
        definition.facets = self.facets(el);
        if let Some(kind) = CoreModel::instance().primitive(&definition.underlying_type) {
            if let Some(facet) = definition.facets.first_inapplicable(kind) {
                self.error(
                    EdmErrorCode::UnexpectedXmlAttribute,
                    format!("facet {facet} is not applicable to {kind}"),
                    el,
                );
            }
        }
        definition.location = Some(el.location.clone());
        self.direct_annotations(el, definition.id);
        let full_name = definition.full_name();
        self.read_member_annotations(el, &TargetPath::element(full_name));
        self.add(definition, el);
    }

    fn read_term(&mut self, namespace: &str, el: &XmlElement) {
        let mut allowed = vec!["Name", "Type", "BaseTerm", "DefaultValue", "AppliesTo", "Nullable"];
        allowed.extend(FACET_ATTRIBUTES);
        self.check_attributes(el, &allowed);
        let Some(name) = self.required(el, "Name") else {
            return;
        };
        let Some(type_ref) = self.type_reference(el, true) else {
            return;
        };
        let mut term = Term::new(namespace, name, type_ref);
        if let Some(base) = el.attribute("BaseTerm") {
            let base = self.normalize_name(base);
            self.defer(Deferred::Term(base.clone()), el);
            term.base_term = Some(base);
        }
        term.default_value = el.attribute("DefaultValue").map(str::to_string);
        term.applies_to = el
            .attribute("AppliesTo")
            .map(|kinds| kinds.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        term.location = Some(el.location.clone());
        self.direct_annotations(el, term.id);
        let full_name = term.full_name();
        self.read_member_annotations(el, &TargetPath::element(full_name));
        self.add(term, el);
    }

    // -- operations ---------------------------------------------------------

    fn read_operation(&mut self, namespace: &str, kind: OperationKind, el: &XmlElement) {
        let allowed: &[&str] = match kind {
            OperationKind::Action => &["Name", "IsBound", "EntitySetPath"],
            OperationKind::Function => &["Name", "IsBound", "IsComposable", "EntitySetPath"],
        };
        self.check_attributes(el, allowed);
        let Some(name) = self.required(el, "Name") else {
            return;
        };
        let mut operation = match kind {
            OperationKind::Action => Operation::action(namespace, name),
            OperationKind::Function => Operation::function(namespace, name),
        };
        operation.is_bound = self.bool_attr(el, "IsBound", false);
        if kind == OperationKind::Function {
            operation.is_composable = self.bool_attr(el, "IsComposable", false);
        }
        operation.entity_set_path = el.attribute("EntitySetPath").map(str::to_string);
        operation.location = Some(el.location.clone());
        self.direct_annotations(el, operation.id);

        for child in &el.children {
            if !self.expect_edm(child) {
                continue;
            }
            match child.name.as_str() {
                "Parameter" => {
                    if let Some(parameter) = self.read_parameter(child) {
                        operation.parameters.push(parameter);
                    }
                }
                "ReturnType" => {
                    if operation.return_type.is_some() {
                        self.unexpected_element(child);
                    } else {
                        operation.return_type = self.read_return_type(child);
                    }
                }
                "Annotation" => {}
                _ => self.unexpected_element(child),
            }
        }

        // annotation targets need the full signature
        let target = operation_target(&operation);
        for child in el.children.iter().filter(|c| c.is(EDM_NAMESPACE, "Annotation")) {
            self.read_inline_annotation(child, target.clone());
        }
        for child in el.children.iter().filter(|c| c.is(EDM_NAMESPACE, "Parameter")) {
            if let Some(parameter) = child.attribute("Name") {
                let path = parameter_target(&operation, parameter);
                self.read_member_annotations(child, &path);
            }
        }
        self.add(operation, el);
    }

    fn read_parameter(&mut self, el: &XmlElement) -> Option<Parameter> {
        let mut allowed = vec!["Name", "Type", "Nullable"];
        allowed.extend(FACET_ATTRIBUTES);
        self.check_attributes(el, &allowed);
        let name = self.required(el, "Name")?;
        let type_ref = self.type_reference(el, true)?;
        let mut parameter = Parameter::new(name, type_ref);
        parameter.location = Some(el.location.clone());
        self.direct_annotations(el, parameter.id);
        Some(parameter)
    }

    fn read_return_type(&mut self, el: &XmlElement) -> Option<ReturnType> {
        let mut allowed = vec!["Type", "Nullable"];
        allowed.extend(FACET_ATTRIBUTES);
        self.check_attributes(el, &allowed);
        let type_ref = self.type_reference(el, true)?;
        let mut return_type = ReturnType::new(type_ref);
        return_type.location = Some(el.location.clone());
        self.direct_annotations(el, return_type.id);
        self.skip_nested_annotations(el);
        Some(return_type)
    }

    // -- containers ---------------------------------------------------------

    fn read_container(&mut self, namespace: &str, el: &XmlElement) {
        self.check_attributes(el, &["Name", "Extends"]);
        let Some(name) = self.required(el, "Name") else {
            return;
        };
        let mut container = EntityContainer::new(namespace, name);
        if let Some(extends) = el.attribute("Extends") {
            let extends = self.normalize_name(extends);
            self.defer(Deferred::Container(extends.clone()), el);
            container.extends = Some(extends);
        }
        container.location = Some(el.location.clone());
        self.direct_annotations(el, container.id);

        let full_name = container.full_name();
        for child in &el.children {
            if !self.expect_edm(child) {
                continue;
            }
            let element = match child.name.as_str() {
                "EntitySet" => self.read_entity_set(child).map(ContainerElement::from),
                "Singleton" => self.read_singleton(child).map(ContainerElement::from),
                "ActionImport" => self
                    .read_operation_import(OperationKind::Action, child)
                    .map(ContainerElement::from),
                "FunctionImport" => self
                    .read_operation_import(OperationKind::Function, child)
                    .map(ContainerElement::from),
                "Annotation" => {
                    self.read_inline_annotation(child, TargetPath::element(&full_name));
                    None
                }
                _ => {
                    self.unexpected_element(child);
                    None
                }
            };
            if let Some(element) = element {
                self.read_nested_annotations(child, &TargetPath::member(&full_name, element.name()));
                container.elements.push(element);
            }
        }
        self.add(container, el);
    }

    fn read_entity_set(&mut self, el: &XmlElement) -> Option<EntitySet> {
        self.check_attributes(el, &["Name", "EntityType", "IncludeInServiceDocument"]);
        let name = self.required(el, "Name")?;
        let entity_type = self.required(el, "EntityType")?;
        let entity_type = self.normalize_name(entity_type);
        self.defer(Deferred::Type(entity_type.clone()), el);
        let mut set = EntitySet::new(name, entity_type);
        set.include_in_service_document = self.bool_attr(el, "IncludeInServiceDocument", true);
        set.navigation_bindings = self.read_navigation_bindings(el);
        set.location = Some(el.location.clone());
        self.direct_annotations(el, set.id);
        Some(set)
    }

    fn read_singleton(&mut self, el: &XmlElement) -> Option<Singleton> {
        self.check_attributes(el, &["Name", "Type", "Nullable"]);
        let name = self.required(el, "Name")?;
        let entity_type = self.required(el, "Type")?;
        let entity_type = self.normalize_name(entity_type);
        self.defer(Deferred::Type(entity_type.clone()), el);
        let mut singleton = Singleton::new(name, entity_type);
        singleton.navigation_bindings = self.read_navigation_bindings(el);
        singleton.location = Some(el.location.clone());
        self.direct_annotations(el, singleton.id);
        Some(singleton)
    }

    fn read_navigation_bindings(&mut self, el: &XmlElement) -> Vec<NavigationPropertyBinding> {
        let mut bindings = Vec::new();
        for child in &el.children {
            if !self.expect_edm(child) {
                continue;
            }
            match child.name.as_str() {
                "NavigationPropertyBinding" => {
                    self.check_attributes(child, &["Path", "Target"]);
                    let path = self.required(child, "Path");
                    let target = self.required(child, "Target");
                    if let (Some(path), Some(target)) = (path, target) {
                        bindings.push(NavigationPropertyBinding {
                            path: self.normalize_path(path),
                            target: self.normalize_name(target),
                        });
                    }
                }
                "Annotation" => {}
                _ => self.unexpected_element(child),
            }
        }
        bindings
    }

    fn read_operation_import(
        &mut self,
        kind: OperationKind,
        el: &XmlElement,
    ) -> Option<OperationImport> {
        let (operation_attr, allowed): (&str, &[&str]) = match kind {
            OperationKind::Action => ("Action", &["Name", "Action", "EntitySet"]),
            OperationKind::Function => (
                "Function",
                &["Name", "Function", "EntitySet", "IncludeInServiceDocument"],
            ),
        };
        self.check_attributes(el, allowed);
        let name = self.required(el, "Name")?;
        let operation = self.required(el, operation_attr)?;
        let operation = self.normalize_name(operation);
        self.defer(Deferred::Operation(operation.clone()), el);

        let mut import = OperationImport::new(kind, name, operation);
        import.entity_set = el.attribute("EntitySet").map(|set| self.normalize_name(set));
        if kind == OperationKind::Function {
            import.include_in_service_document =
                self.bool_attr(el, "IncludeInServiceDocument", false);
        }
        import.location = Some(el.location.clone());
        self.direct_annotations(el, import.id);
        for child in &el.children {
            if !child.is(EDM_NAMESPACE, "Annotation") {
                self.unexpected_element(child);
            }
        }
        Some(import)
    }

    // -- annotations --------------------------------------------------------

    fn read_annotations_block(&mut self, namespace: &str, el: &XmlElement) {
        self.check_attributes(el, &["Target", "Qualifier"]);
        let Some(text) = self.required(el, "Target") else {
            return;
        };
        let target = match TargetPath::parse(text) {
            Ok(target) => self.normalize_target(target),
            Err(error) => {
                self.error(EdmErrorCode::InvalidAttributeValue, error.to_string(), el);
                return;
            }
        };
        self.defer(Deferred::Target(target.clone()), el);
        let qualifier = el.attribute("Qualifier");

        for child in &el.children {
            if !child.is(EDM_NAMESPACE, "Annotation") {
                self.unexpected_element(child);
                continue;
            }
            if let Some(mut annotation) = self.read_annotation(child, target.clone()) {
                if annotation.qualifier.is_none() {
                    annotation.qualifier = qualifier.map(str::to_string);
                }
                annotation.home_namespace = Some(namespace.to_string());
                self.push_annotation(annotation, child);
            }
        }
    }

    fn read_inline_annotation(&mut self, el: &XmlElement, target: TargetPath) {
        if let Some(annotation) = self.read_annotation(el, target) {
            self.push_annotation(annotation.inline(), el);
        }
    }

    /// Inline annotations of an element that has no other children
    fn read_member_annotations(&mut self, el: &XmlElement, target: &TargetPath) {
        for child in &el.children {
            if child.is(EDM_NAMESPACE, "Annotation") {
                self.read_inline_annotation(child, target.clone());
            } else {
                self.unexpected_element(child);
            }
        }
    }

    /// Inline annotations of an element whose other children were already read
    fn read_nested_annotations(&mut self, el: &XmlElement, target: &TargetPath) {
        for child in el.children.iter().filter(|c| c.is(EDM_NAMESPACE, "Annotation")) {
            self.read_inline_annotation(child, target.clone());
        }
    }

    fn read_annotation(&mut self, el: &XmlElement, target: TargetPath) -> Option<VocabularyAnnotation> {
        let term = self.required(el, "Term")?;
        let term = self.normalize_name(term);
        self.defer(Deferred::Term(term.clone()), el);
        let value = self.read_value(el, &["Term", "Qualifier"]);
        let mut annotation = VocabularyAnnotation::new(target, term, value);
        annotation.qualifier = el.attribute("Qualifier").map(str::to_string);
        annotation.location = Some(el.location.clone());
        Some(annotation)
    }

    fn push_annotation(&mut self, annotation: VocabularyAnnotation, el: &XmlElement) {
        if let Err(error) = self.model.add_vocabulary_annotation(annotation) {
            self.error(EdmErrorCode::InvalidAttributeValue, error.to_string(), el);
        }
    }

    fn skip_nested_annotations(&mut self, el: &XmlElement) {
        for child in &el.children {
            if child.is(EDM_NAMESPACE, "Annotation") {
                trace!(element = %el.name, "skipping nested annotation");
            } else {
                self.unexpected_element(child);
            }
        }
    }

    // -- expressions --------------------------------------------------------

    /// Value of an element that takes one expression as attribute shorthand or child
    fn read_value(&mut self, el: &XmlElement, fixed: &[&str]) -> Expression {
        let mut values = Vec::new();
        for attribute in el.attributes.iter().filter(|a| a.namespace.is_none()) {
            if fixed.contains(&attribute.name.as_str()) {
                continue;
            }
            match ConstantKind::from_element_name(&attribute.name) {
                Some(kind) if kind != ConstantKind::Null => {
                    values.push(Expression::Constant(Constant::parse(kind, &attribute.value)));
                }
                _ if attribute.name == "Path" => {
                    values.push(Expression::Path(PathExpression::parse(
                        &self.normalize_path(&attribute.value),
                    )));
                }
                _ => self.error(
                    EdmErrorCode::UnexpectedXmlAttribute,
                    format!("unexpected attribute '{}' on {}", attribute.name, el.name),
                    el,
                ),
            }
        }
        self.check_foreign_attributes(el);

        for child in &el.children {
            if child.is(EDM_NAMESPACE, "Annotation") {
                trace!(element = %el.name, "skipping nested annotation");
                continue;
            }
            if let Some(value) = self.read_expression(child) {
                values.push(value);
            }
        }

        if values.len() > 1 {
            self.error(
                EdmErrorCode::UnexpectedXmlElement,
                format!("{} takes a single value, found {}", el.name, values.len()),
                el,
            );
        }
        values.into_iter().next().unwrap_or_else(Expression::null)
    }

    fn read_expression(&mut self, el: &XmlElement) -> Option<Expression> {
        if !self.expect_edm(el) {
            return None;
        }
        if let Some(kind) = ConstantKind::from_element_name(&el.name) {
            self.check_attributes(el, &[]);
            self.skip_nested_annotations(el);
            return Some(match kind {
                ConstantKind::Null => Expression::null(),
                kind => Expression::Constant(Constant::parse(kind, &el.text)),
            });
        }

        match el.name.as_str() {
            "Path" => {
                self.check_attributes(el, &[]);
                Some(Expression::Path(PathExpression::parse(&self.normalize_path(&el.text))))
            }
            "Record" => {
                self.check_attributes(el, &["Type"]);
                let declared_type = el
                    .attribute("Type")
                    .map(|name| TypeReference::parse(&self.normalize_type(name), true));
                let mut properties = Vec::new();
                for child in &el.children {
                    if child.is(EDM_NAMESPACE, "PropertyValue") {
                        if let Some(property) = self.required(child, "Property") {
                            properties.push(PropertyValue {
                                property: property.to_string(),
                                value: self.read_value(child, &["Property"]),
                            });
                        }
                    } else if !child.is(EDM_NAMESPACE, "Annotation") {
                        self.unexpected_element(child);
                    }
                }
                Some(Expression::Record(RecordExpression {
                    declared_type,
                    properties,
                }))
            }
            "Collection" => {
                self.check_attributes(el, &[]);
                let elements = self.read_operands(el);
                Some(Expression::collection(elements))
            }
            "Cast" | "IsOf" => {
                let mut allowed = vec!["Type"];
                allowed.extend(FACET_ATTRIBUTES);
                self.check_attributes(el, &allowed);
                let asserted_type = self.type_reference(el, true)?;
                let operand = self.single_operand(el)?;
                let assertion = Box::new(TypeAssertion {
                    operand,
                    asserted_type,
                });
                Some(if el.name == "Cast" {
                    Expression::Cast(assertion)
                } else {
                    Expression::IsType(assertion)
                })
            }
            "If" => {
                self.check_attributes(el, &[]);
                let operands = self.read_operands(el);
                let count = operands.len();
                let mut operands = operands.into_iter();
                match (operands.next(), operands.next(), operands.next()) {
                    (Some(test), Some(if_true), Some(if_false)) if count == 3 => {
                        Some(Expression::If(Box::new(IfExpression {
                            test,
                            if_true,
                            if_false,
                        })))
                    }
                    _ => {
                        self.error(
                            EdmErrorCode::UnexpectedXmlElement,
                            format!("If takes three operands, found {count}"),
                            el,
                        );
                        None
                    }
                }
            }
            "Apply" => {
                self.check_attributes(el, &["Function"]);
                let function = self.required(el, "Function")?;
                let function = self.normalize_name(function);
                let arguments = self.read_operands(el);
                Some(Expression::apply(function, arguments))
            }
            "LabeledElement" => {
                let name = self.required(el, "Name")?;
                let value = self.read_value(el, &["Name"]);
                let handle = self
                    .model
                    .add_labeled_element(LabeledElement::new(name, value));
                Some(Expression::LabeledElement(handle))
            }
            "LabeledElementReference" => {
                self.check_attributes(el, &[]);
                Some(Expression::label_reference(self.normalize_name(&el.text)))
            }
            _ => {
                self.unexpected_element(el);
                None
            }
        }
    }

    fn read_operands(&mut self, el: &XmlElement) -> Vec<Expression> {
        el.children
            .iter()
            .filter(|child| !child.is(EDM_NAMESPACE, "Annotation"))
            .filter_map(|child| self.read_expression(child))
            .collect()
    }

    fn single_operand(&mut self, el: &XmlElement) -> Option<Expression> {
        let operands = self.read_operands(el);
        if operands.len() != 1 {
            self.error(
                EdmErrorCode::UnexpectedXmlElement,
                format!("{} takes one operand, found {}", el.name, operands.len()),
                el,
            );
            return None;
        }
        operands.into_iter().next()
    }

    // -- attributes ---------------------------------------------------------

    fn type_reference(&mut self, el: &XmlElement, nullable_default: bool) -> Option<TypeReference> {
        let name = self.required(el, "Type")?;
        let name = self.normalize_type(name);
        let nullable = self.bool_attr(el, "Nullable", nullable_default);
        let type_ref = TypeReference::parse(&name, nullable);
        if !matches!(type_ref.element_type().ty(), EdmType::Primitive(_)) {
            self.defer(Deferred::Type(name), el);
        }
        let facets = self.facets(el);
        match type_ref.clone().with_facets(facets) {
            Ok(type_ref) => Some(type_ref),
            Err(error) => {
                self.error(EdmErrorCode::UnexpectedXmlAttribute, error.to_string(), el);
                Some(type_ref)
            }
        }
    }

    fn facets(&mut self, el: &XmlElement) -> Facets {
        Facets {
            max_length: self.parsed_attr(el, "MaxLength", MaxLength::parse),
            precision: self.parsed_attr(el, "Precision", |t| t.parse().ok()),
            scale: self.parsed_attr(el, "Scale", Scale::parse),
            unicode: self.parsed_attr(el, "Unicode", parse_bool),
            srid: self.parsed_attr(el, "SRID", Srid::parse),
        }
    }

    fn parsed_attr<T>(
        &mut self,
        el: &XmlElement,
        name: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let text = el.attribute(name)?;
        let value = parse(text.trim());
        if value.is_none() {
            self.invalid_value(el, name, text);
        }
        value
    }

    fn bool_attr(&mut self, el: &XmlElement, name: &str, default: bool) -> bool {
        self.parsed_attr(el, name, parse_bool).unwrap_or(default)
    }

    fn required<'e>(&mut self, el: &'e XmlElement, name: &str) -> Option<&'e str> {
        let value = el.attribute(name);
        if value.is_none() {
            self.error(
                EdmErrorCode::MissingAttribute,
                format!("{} requires the {name} attribute", el.name),
                el,
            );
        }
        value
    }

    /// Unprefixed attributes must be known; foreign ones are kept as direct annotations
    fn check_attributes(&mut self, el: &XmlElement, allowed: &[&str]) {
        for attribute in el.attributes.iter().filter(|a| a.namespace.is_none()) {
            if !allowed.contains(&attribute.name.as_str()) {
                self.error(
                    EdmErrorCode::UnexpectedXmlAttribute,
                    format!("unexpected attribute '{}' on {}", attribute.name, el.name),
                    el,
                );
            }
        }
        self.check_foreign_attributes(el);
    }

    fn check_foreign_attributes(&mut self, el: &XmlElement) {
        for attribute in &el.attributes {
            if attribute
                .namespace
                .as_deref()
                .is_some_and(|ns| CSDL_NAMESPACES.contains(&ns))
            {
                self.error(
                    EdmErrorCode::UnexpectedXmlAttribute,
                    format!("unexpected qualified attribute '{}' on {}", attribute.name, el.name),
                    el,
                );
            }
        }
    }

    fn direct_annotations(&mut self, el: &XmlElement, owner: NodeId) {
        for attribute in el.foreign_attributes(&CSDL_NAMESPACES) {
            let Some(namespace) = attribute.namespace.as_deref() else {
                continue;
            };
            let value = Arc::new(attribute.value.clone());
            if let Err(error) =
                self.model
                    .set_annotation_value(owner, namespace, &attribute.name, Some(value))
            {
                self.error(EdmErrorCode::InvalidAttributeValue, error.to_string(), el);
            }
        }
    }

    // -- names --------------------------------------------------------------

    fn normalize_name(&self, name: &str) -> String {
        let name = name.trim();
        if let Some(namespace) = self.aliases.get(name) {
            return namespace.clone();
        }
        match name.rsplit_once('.') {
            Some((prefix, simple)) => match self.aliases.get(prefix) {
                Some(namespace) => format!("{namespace}.{simple}"),
                None => name.to_string(),
            },
            None => name.to_string(),
        }
    }

    fn normalize_type(&self, name: &str) -> String {
        let name = name.trim();
        if let Some(inner) = strip_wrapper(name, "Collection") {
            return format!("Collection({})", self.normalize_type(inner));
        }
        if let Some(inner) = strip_wrapper(name, "Ref") {
            return format!("Ref({})", self.normalize_name(inner));
        }
        self.normalize_name(name)
    }

    /// Rewrite aliases in type cast segments
    fn normalize_path(&self, path: &str) -> String {
        path.trim()
            .split('/')
            .map(|segment| {
                if segment.contains('.') {
                    self.normalize_name(segment)
                } else {
                    segment.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    fn normalize_target(&self, target: TargetPath) -> TargetPath {
        let signature = |signature: Option<Vec<String>>| {
            signature.map(|types| types.iter().map(|t| self.normalize_type(t)).collect())
        };
        match target {
            TargetPath::Element(name) => TargetPath::Element(self.normalize_name(&name)),
            TargetPath::Member { owner, member } => TargetPath::Member {
                owner: self.normalize_name(&owner),
                member,
            },
            TargetPath::Operation { name, signature: s } => TargetPath::Operation {
                name: self.normalize_name(&name),
                signature: signature(s),
            },
            TargetPath::Parameter {
                operation,
                signature: s,
                parameter,
            } => TargetPath::Parameter {
                operation: self.normalize_name(&operation),
                signature: signature(s),
                parameter,
            },
        }
    }

    // -- bookkeeping --------------------------------------------------------

    fn add(&mut self, element: impl Into<SchemaElement>, el: &XmlElement) {
        if let Err(error) = self.model.add_element(element) {
            self.error(EdmErrorCode::InvalidAttributeValue, error.to_string(), el);
        }
    }

    fn defer(&mut self, reference: Deferred, el: &XmlElement) {
        self.deferred.push(DeferredReference {
            reference,
            location: el.location.clone(),
        });
    }

    fn expect_edm(&mut self, el: &XmlElement) -> bool {
        if el.namespace.as_deref() == Some(EDM_NAMESPACE) {
            true
        } else {
            self.unexpected_element(el);
            false
        }
    }

    fn unexpected_element(&mut self, el: &XmlElement) {
        let qualified = match el.namespace.as_deref() {
            Some(namespace) => format!("{{{namespace}}}{}", el.name),
            None => el.name.clone(),
        };
        self.error(
            EdmErrorCode::UnexpectedXmlElement,
            format!("unexpected element '{qualified}'"),
            el,
        );
    }

    fn invalid_value(&mut self, el: &XmlElement, name: &str, value: &str) {
        self.error(
            EdmErrorCode::InvalidAttributeValue,
            format!("invalid value '{value}' for {name} on {}", el.name),
            el,
        );
    }

    fn error(&mut self, code: EdmErrorCode, message: impl Into<String>, el: &XmlElement) {
        self.errors
            .push(EdmError::new(code, message).at(el.location()));
    }
}

/// Target path of an operation overload, with its full signature
pub(crate) fn operation_target(operation: &Operation) -> TargetPath {
    TargetPath::operation(operation.full_name(), operation.signature())
}

/// Target path of a parameter of an operation overload
pub(crate) fn parameter_target(operation: &Operation, parameter: &str) -> TargetPath {
    TargetPath::Parameter {
        operation: operation.full_name(),
        signature: Some(operation.signature()),
        parameter: parameter.to_string(),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn strip_wrapper<'a>(text: &'a str, wrapper: &str) -> Option<&'a str> {
    text.strip_prefix(wrapper)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// Bind every labeled element reference by unique name
fn bind_labeled_references(model: &Model) -> Vec<EdmError> {
    let mut errors = Vec::new();
    let mut bind = |expression: &Expression, location: Option<&SourceLocation>| {
        let mut stack = vec![expression];
        while let Some(expression) = stack.pop() {
            if let Expression::LabeledElementReference(reference) = expression {
                if reference.target().is_none() && !bind_reference(model, reference) {
                    errors.push(
                        EdmError::new(
                            EdmErrorCode::BadUnresolvedLabeledElement,
                            format!("labeled element '{}' does not bind", reference.name()),
                        )
                        .at(location),
                    );
                }
            }
            stack.extend(expression.children());
        }
    };

    for annotation in model.vocabulary_annotations() {
        bind(&annotation.value, annotation.location.as_ref());
    }
    for (_, element) in model.labeled_elements().iter() {
        bind(&element.expression, None);
    }
    errors
}

fn bind_reference(model: &Model, reference: &LabeledElementReference) -> bool {
    let labels = model.labeled_elements();
    let mut candidates = labels.find_by_name(reference.name());
    if candidates.is_empty() {
        if let Some((_, simple)) = reference.name().rsplit_once('.') {
            candidates = labels.find_by_name(simple);
        }
    }
    match candidates.as_slice() {
        [handle] => reference.bind(*handle).is_ok(),
        _ => false,
    }
}

/// Check every remembered reference against the finished model
fn resolve_deferred(model: &Model, deferred: &[DeferredReference]) -> Vec<EdmError> {
    let resolver = Resolver::new(model);
    let mut errors = Vec::new();
    for DeferredReference {
        reference,
        location,
    } in deferred
    {
        let location = Some(location);
        match reference {
            Deferred::Type(name) => {
                if let Some(missing) = resolver.resolve_type_name(name).unresolved_name() {
                    errors.push(
                        EdmError::new(
                            EdmErrorCode::BadUnresolvedType,
                            format!("type '{missing}' could not be found"),
                        )
                        .at(location),
                    );
                }
            }
            Deferred::Term(name) => {
                if resolver.find_term(name).is_not_found() {
                    errors.push(
                        EdmError::new(
                            EdmErrorCode::BadUnresolvedTerm,
                            format!("term '{name}' could not be found"),
                        )
                        .at(location),
                    );
                }
            }
            Deferred::Operation(name) => {
                if resolver.find_operations(name).is_empty() {
                    errors.push(
                        EdmError::new(
                            EdmErrorCode::BadUnresolvedOperation,
                            format!("operation '{name}' could not be found"),
                        )
                        .at(location),
                    );
                }
            }
            Deferred::Container(name) => {
                if resolver.find_container(name).is_not_found() {
                    errors.push(
                        EdmError::new(
                            EdmErrorCode::BadUnresolvedEntityContainer,
                            format!("entity container '{name}' could not be found"),
                        )
                        .at(location),
                    );
                }
            }
            Deferred::Target(path) => {
                let resolved = resolver.resolve_target(path);
                if resolved.is_bad() {
                    errors.extend(
                        resolved
                            .errors(path)
                            .into_iter()
                            .map(|error| error.at(location)),
                    );
                }
            }
        }
    }
    trace!(checked = deferred.len(), unresolved = errors.len(), "resolution pass");
    errors
}
