//! CSDL document writer

use crate::reader::{operation_target, parameter_target};
use crate::settings::WriterSettings;
use crate::syntax::{self, EDM_NAMESPACE, EDMX_NAMESPACE, XmlNode};
use crate::{Error, Result, SerializationFailure};
use edm_binding::Resolver;
use edm_model::names::{is_namespace, is_qualified_name, is_simple_identifier};
use edm_model::{
    AnnotationKey, ComplexType, ConstantKind, ContainerElement, DocumentReference, EdmError,
    EdmErrorCode, EntityContainer, EntityType, EnumType, Expression, Facets, LabeledElementArena,
    Model, Multiplicity, NavigationProperty, NodeId, Operation, OperationKind, PrimitiveKind,
    Property, SchemaElement, SourceLocation, StructuralProperty, StructuredType, Term,
    TypeDefinition, TypeReference, VocabularyAnnotation,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// One written CSDL document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsdlDocument {
    /// Namespace of the schema the document carries
    pub namespace: String,
    pub text: String,
}

/// Writes a [`Model`] as CSDL, one document per namespace
#[derive(Debug, Clone, Default)]
pub struct CsdlWriter {
    settings: WriterSettings,
}

impl CsdlWriter {
    /// Create a writer with the given settings
    pub fn new(settings: WriterSettings) -> Self {
        Self { settings }
    }

    /// Write every namespace of `model`
    ///
    /// Fails without producing any document when a name cannot be written.
    pub fn write(&self, model: &Model) -> Result<Vec<CsdlDocument>> {
        let errors = blocking_errors(model);
        if !errors.is_empty() {
            debug!(errors = errors.len(), "model cannot be written as CSDL");
            return Err(SerializationFailure { errors }.into());
        }

        let version = self.settings.version.unwrap_or_else(|| model.version());
        let placement = Placement::new(model);
        let mut documents = Vec::new();
        for schema in model.namespaces() {
            let mut document = DocumentBuilder::new(model, &placement);
            let root = document.edmx(version.as_str(), &schema.namespace, schema.alias.as_deref());
            let text = syntax::render(&root, self.settings.indent).map_err(Error::Output)?;
            trace!(namespace = %schema.namespace, bytes = text.len(), "schema written");
            documents.push(CsdlDocument {
                namespace: schema.namespace.clone(),
                text,
            });
        }
        debug!(documents = documents.len(), %version, "CSDL written");
        Ok(documents)
    }
}

/// Names that CSDL cannot express
fn blocking_errors(model: &Model) -> Vec<EdmError> {
    let mut checker = NameChecker::default();
    for schema in model.namespaces() {
        if !is_namespace(&schema.namespace) {
            checker.push(
                EdmErrorCode::NamespaceNameMustBeValid,
                format!("namespace '{}' is not a valid namespace name", schema.namespace),
                None,
            );
        }
    }

    for element in model.elements() {
        let location = element.location();
        checker.simple_name(element.name(), location);
        match element {
            SchemaElement::EntityType(EntityType { structure, .. })
            | SchemaElement::ComplexType(ComplexType { structure }) => {
                checker.structure(structure);
            }
            SchemaElement::EnumType(enum_type) => {
                checker.type_name(&enum_type.underlying_type, location);
                for member in &enum_type.members {
                    checker.simple_name(&member.name, member.location.as_ref());
                }
            }
            SchemaElement::TypeDefinition(definition) => {
                checker.type_name(&definition.underlying_type, location);
            }
            SchemaElement::Term(term) => {
                checker.type_reference(&term.type_ref, location);
                if let Some(base) = &term.base_term {
                    checker.type_name(base, location);
                }
            }
            SchemaElement::Operation(operation) => {
                for parameter in &operation.parameters {
                    checker.simple_name(&parameter.name, parameter.location.as_ref());
                    checker.type_reference(&parameter.type_ref, parameter.location.as_ref());
                }
                if let Some(return_type) = &operation.return_type {
                    checker.type_reference(&return_type.type_ref, return_type.location.as_ref());
                }
            }
            SchemaElement::EntityContainer(container) => {
                for member in &container.elements {
                    checker.simple_name(member.name(), member.location());
                    if let Some(entity_type) = member.entity_type() {
                        checker.type_name(entity_type, member.location());
                    }
                }
            }
            SchemaElement::Custom(_) => {}
        }
    }
    checker.errors
}

#[derive(Default)]
struct NameChecker {
    errors: Vec<EdmError>,
}

impl NameChecker {
    fn structure(&mut self, structure: &StructuredType) {
        if let Some(base) = &structure.base_type {
            self.type_name(base, structure.location.as_ref());
        }
        for property in &structure.properties {
            self.simple_name(property.name(), property.location());
            match property {
                Property::Structural(p) => self.type_reference(&p.type_ref, p.location.as_ref()),
                Property::Navigation(p) => self.type_name(&p.target_type, p.location.as_ref()),
            }
        }
    }

    fn simple_name(&mut self, name: &str, location: Option<&SourceLocation>) {
        if !is_simple_identifier(name) {
            self.push(
                EdmErrorCode::ElementNameMustBeSimpleIdentifier,
                format!("'{name}' is not a simple identifier"),
                location,
            );
        }
    }

    fn type_reference(&mut self, type_ref: &TypeReference, location: Option<&SourceLocation>) {
        if let Some(name) = type_ref.element_type().named_type() {
            self.type_name(name, location);
        }
    }

    fn type_name(&mut self, name: &str, location: Option<&SourceLocation>) {
        if !is_qualified_name(name) {
            self.push(
                EdmErrorCode::ReferencedTypeMustHaveValidName,
                format!("referenced name '{name}' is not a qualified name"),
                location,
            );
        }
    }

    fn push(&mut self, code: EdmErrorCode, message: String, location: Option<&SourceLocation>) {
        self.errors.push(EdmError::new(code, message).at(location));
    }
}

/// Where each vocabulary annotation is written
struct Placement<'m> {
    /// Inline annotations by target
    inline: HashMap<String, Vec<&'m VocabularyAnnotation>>,

    /// Out-of-line annotations by home namespace, grouped by target in first-appearance order
    blocks: HashMap<String, Vec<(String, Vec<&'m VocabularyAnnotation>)>>,
}

impl<'m> Placement<'m> {
    fn new(model: &'m Model) -> Self {
        let declared = declared_targets(model);
        let resolver = Resolver::new(model);
        let namespaces: HashSet<&str> = model
            .namespaces()
            .iter()
            .map(|schema| schema.namespace.as_str())
            .collect();
        let fallback = model
            .namespaces()
            .first()
            .map(|schema| schema.namespace.clone())
            .unwrap_or_default();

        let mut inline: HashMap<String, Vec<&VocabularyAnnotation>> = HashMap::new();
        let mut blocks: HashMap<String, Vec<(String, Vec<&VocabularyAnnotation>)>> = HashMap::new();
        for annotation in model.vocabulary_annotations() {
            let target = annotation.target.to_string();
            if annotation.is_inline() && declared.contains(&target) {
                inline.entry(target).or_default().push(annotation);
                continue;
            }

            let home = annotation
                .home_namespace
                .clone()
                .unwrap_or_else(|| resolver.target_namespace(&annotation.target));
            let home = if namespaces.contains(home.as_str()) {
                home
            } else {
                fallback.clone()
            };
            let groups = blocks.entry(home).or_default();
            match groups.iter_mut().find(|(t, _)| *t == target) {
                Some((_, group)) => group.push(annotation),
                None => groups.push((target, vec![annotation])),
            }
        }
        Self { inline, blocks }
    }
}

/// Target paths of everything the model declares
fn declared_targets(model: &Model) -> HashSet<String> {
    let mut targets: HashSet<String> = model
        .namespaces()
        .iter()
        .map(|schema| schema.namespace.clone())
        .collect();
    for element in model.elements() {
        let full_name = element.full_name();
        match element {
            SchemaElement::EntityType(EntityType { structure, .. })
            | SchemaElement::ComplexType(ComplexType { structure }) => {
                for property in &structure.properties {
                    targets.insert(format!("{full_name}/{}", property.name()));
                }
            }
            SchemaElement::EnumType(enum_type) => {
                for member in &enum_type.members {
                    targets.insert(format!("{full_name}/{}", member.name));
                }
            }
            SchemaElement::Operation(operation) => {
                targets.insert(operation_target(operation).to_string());
                for parameter in &operation.parameters {
                    targets.insert(parameter_target(operation, &parameter.name).to_string());
                }
                continue;
            }
            SchemaElement::EntityContainer(container) => {
                for member in &container.elements {
                    targets.insert(format!("{full_name}/{}", member.name()));
                }
            }
            SchemaElement::TypeDefinition(_) | SchemaElement::Term(_) => {}
            SchemaElement::Custom(_) => continue,
        }
        targets.insert(full_name);
    }
    targets
}

/// Builds the element tree of one document
struct DocumentBuilder<'a, 'm> {
    model: &'m Model,
    placement: &'a Placement<'m>,

    /// Foreign namespaces used by direct annotations, in first-use order
    prefixes: Vec<String>,

    /// Inline targets already written
    written: HashSet<String>,
}

impl<'a, 'm> DocumentBuilder<'a, 'm> {
    fn new(model: &'m Model, placement: &'a Placement<'m>) -> Self {
        Self {
            model,
            placement,
            prefixes: Vec::new(),
            written: HashSet::new(),
        }
    }

    fn edmx(&mut self, version: &str, namespace: &str, alias: Option<&str>) -> XmlNode {
        let schema = self.schema(namespace, alias);

        let mut root = XmlNode::new("edmx:Edmx")
            .attr("Version", version)
            .attr("xmlns:edmx", EDMX_NAMESPACE);
        for (index, foreign) in self.prefixes.iter().enumerate() {
            root = root.attr(format!("xmlns:ns{}", index + 1), foreign.as_str());
        }
        for reference in self.model.document_references() {
            root.push(reference_node(reference));
        }
        root.child(XmlNode::new("edmx:DataServices").child(schema))
    }

    fn schema(&mut self, namespace: &str, alias: Option<&str>) -> XmlNode {
        let mut schema = XmlNode::new("Schema")
            .attr("xmlns", EDM_NAMESPACE)
            .attr("Namespace", namespace)
            .attr_opt("Alias", alias);

        let model = self.model;
        for element in model.elements_in(namespace) {
            let node = match element {
                SchemaElement::EntityType(entity) => self.entity_type(entity),
                SchemaElement::ComplexType(complex) => self.complex_type(complex),
                SchemaElement::EnumType(enum_type) => self.enum_type(enum_type),
                SchemaElement::TypeDefinition(definition) => self.type_definition(definition),
                SchemaElement::Term(term) => self.term(term),
                SchemaElement::Operation(operation) => self.operation(operation),
                SchemaElement::EntityContainer(container) => self.container(container),
                SchemaElement::Custom(custom) => {
                    trace!(name = %custom.name, "custom element has no CSDL form");
                    continue;
                }
            };
            schema.push(node);
        }

        self.inline_annotations(&mut schema, namespace.to_string());

        if let Some(groups) = self.placement.blocks.get(namespace) {
            for (target, annotations) in groups {
                let mut block = XmlNode::new("Annotations").attr("Target", target.as_str());
                for annotation in annotations {
                    block.push(annotation_node(self.model.labeled_elements(), annotation));
                }
                schema.push(block);
            }
        }
        schema
    }

    // -- types --------------------------------------------------------------

    fn entity_type(&mut self, entity: &EntityType) -> XmlNode {
        let structure = &entity.structure;
        let mut node = self
            .structure_header("EntityType", structure)
            .flag("HasStream", entity.has_stream, false);
        node = self.direct_annotations(node, structure.id);
        if !entity.key.is_empty() {
            let mut key = XmlNode::new("Key");
            for property_ref in &entity.key {
                key.push(
                    XmlNode::new("PropertyRef")
                        .attr("Name", property_ref.name.as_str())
                        .attr_opt("Alias", property_ref.alias.as_deref()),
                );
            }
            node.push(key);
        }
        self.structure_body(node, structure)
    }

    fn complex_type(&mut self, complex: &ComplexType) -> XmlNode {
        let structure = &complex.structure;
        let node = self.structure_header("ComplexType", structure);
        let node = self.direct_annotations(node, structure.id);
        self.structure_body(node, structure)
    }

    fn structure_header(&self, kind: &str, structure: &StructuredType) -> XmlNode {
        XmlNode::new(kind)
            .attr("Name", structure.name.as_str())
            .attr_opt("BaseType", structure.base_type.as_deref())
            .flag("Abstract", structure.is_abstract, false)
            .flag("OpenType", structure.is_open, false)
    }

    fn structure_body(&mut self, mut node: XmlNode, structure: &StructuredType) -> XmlNode {
        let full_name = structure.full_name();
        for property in &structure.properties {
            let child = match property {
                Property::Structural(p) => self.structural_property(p),
                Property::Navigation(p) => self.navigation_property(p),
            };
            let child = self.with_inline(child, format!("{full_name}/{}", property.name()));
            node.push(child);
        }
        self.inline_annotations(&mut node, full_name);
        node
    }

    fn structural_property(&mut self, property: &StructuralProperty) -> XmlNode {
        let node = typed(XmlNode::new("Property").attr("Name", property.name.as_str()), &property.type_ref)
            .attr_opt("DefaultValue", property.default_value.as_deref());
        self.direct_annotations(node, property.id)
    }

    fn navigation_property(&mut self, property: &NavigationProperty) -> XmlNode {
        let type_name = match property.multiplicity {
            Multiplicity::Many => format!("Collection({})", property.target_type),
            Multiplicity::One | Multiplicity::ZeroOrOne => property.target_type.clone(),
        };
        let mut node = XmlNode::new("NavigationProperty")
            .attr("Name", property.name.as_str())
            .attr("Type", type_name);
        if property.multiplicity == Multiplicity::One {
            node = node.attr("Nullable", "false");
        }
        node = node
            .attr_opt("Partner", property.partner.as_deref())
            .flag("ContainsTarget", property.contains_target, false);
        node = self.direct_annotations(node, property.id);

        for constraint in &property.referential_constraints {
            node.push(
                XmlNode::new("ReferentialConstraint")
                    .attr("Property", constraint.property.as_str())
                    .attr("ReferencedProperty", constraint.referenced_property.as_str()),
            );
        }
        if let Some(action) = property.on_delete {
            node.push(XmlNode::new("OnDelete").attr("Action", action.as_str()));
        }
        node
    }

    fn enum_type(&mut self, enum_type: &EnumType) -> XmlNode {
        let mut node = XmlNode::new("EnumType").attr("Name", enum_type.name.as_str());
        if enum_type.underlying_type != PrimitiveKind::Int32.qualified_name() {
            node = node.attr("UnderlyingType", enum_type.underlying_type.as_str());
        }
        node = node.flag("IsFlags", enum_type.is_flags, false);
        node = self.direct_annotations(node, enum_type.id);

        let full_name = enum_type.full_name();
        for member in &enum_type.members {
            let child = XmlNode::new("Member")
                .attr("Name", member.name.as_str())
                .attr_opt("Value", member.value.map(|v| v.to_string()));
            let child = self.direct_annotations(child, member.id);
            let child = self.with_inline(child, format!("{full_name}/{}", member.name));
            node.push(child);
        }
        self.inline_annotations(&mut node, full_name);
        node
    }

    fn type_definition(&mut self, definition: &TypeDefinition) -> XmlNode {
        let node = XmlNode::new("TypeDefinition")
            .attr("Name", definition.name.as_str())
            .attr("UnderlyingType", definition.underlying_type.as_str());
        let node = with_facets(node, &definition.facets);
        let node = self.direct_annotations(node, definition.id);
        self.with_inline(node, definition.full_name())
    }

    fn term(&mut self, term: &Term) -> XmlNode {
        let mut node = typed(XmlNode::new("Term").attr("Name", term.name.as_str()), &term.type_ref)
            .attr_opt("BaseTerm", term.base_term.as_deref())
            .attr_opt("DefaultValue", term.default_value.as_deref());
        if !term.applies_to.is_empty() {
            node = node.attr("AppliesTo", term.applies_to.join(" "));
        }
        let node = self.direct_annotations(node, term.id);
        self.with_inline(node, term.full_name())
    }

    // -- operations ---------------------------------------------------------

    fn operation(&mut self, operation: &Operation) -> XmlNode {
        let (kind, composable) = match operation.kind {
            OperationKind::Action => ("Action", false),
            OperationKind::Function => ("Function", operation.is_composable),
        };
        let node = XmlNode::new(kind)
            .attr("Name", operation.name.as_str())
            .flag("IsBound", operation.is_bound, false)
            .flag("IsComposable", composable, false)
            .attr_opt("EntitySetPath", operation.entity_set_path.as_deref());
        let mut node = self.direct_annotations(node, operation.id);

        for parameter in &operation.parameters {
            let child = typed(
                XmlNode::new("Parameter").attr("Name", parameter.name.as_str()),
                &parameter.type_ref,
            );
            let child = self.direct_annotations(child, parameter.id);
            let target = parameter_target(operation, &parameter.name).to_string();
            node.push(self.with_inline(child, target));
        }
        if let Some(return_type) = &operation.return_type {
            let child = typed(XmlNode::new("ReturnType"), &return_type.type_ref);
            node.push(self.direct_annotations(child, return_type.id));
        }
        self.with_inline(node, operation_target(operation).to_string())
    }

    // -- containers ---------------------------------------------------------

    fn container(&mut self, container: &EntityContainer) -> XmlNode {
        let node = XmlNode::new("EntityContainer")
            .attr("Name", container.name.as_str())
            .attr_opt("Extends", container.extends.as_deref());
        let mut node = self.direct_annotations(node, container.id);

        let full_name = container.full_name();
        for member in &container.elements {
            let child = match member {
                ContainerElement::EntitySet(set) => {
                    let mut child = XmlNode::new("EntitySet")
                        .attr("Name", set.name.as_str())
                        .attr("EntityType", set.entity_type.as_str())
                        .flag("IncludeInServiceDocument", set.include_in_service_document, true);
                    child = self.direct_annotations(child, set.id);
                    for binding in &set.navigation_bindings {
                        child.push(binding_node(&binding.path, &binding.target));
                    }
                    child
                }
                ContainerElement::Singleton(singleton) => {
                    let mut child = XmlNode::new("Singleton")
                        .attr("Name", singleton.name.as_str())
                        .attr("Type", singleton.entity_type.as_str());
                    child = self.direct_annotations(child, singleton.id);
                    for binding in &singleton.navigation_bindings {
                        child.push(binding_node(&binding.path, &binding.target));
                    }
                    child
                }
                ContainerElement::OperationImport(import) => {
                    let (kind, attribute) = match import.kind {
                        OperationKind::Action => ("ActionImport", "Action"),
                        OperationKind::Function => ("FunctionImport", "Function"),
                    };
                    let mut child = XmlNode::new(kind)
                        .attr("Name", import.name.as_str())
                        .attr(attribute, import.operation.as_str())
                        .attr_opt("EntitySet", import.entity_set.as_deref());
                    if import.kind == OperationKind::Function {
                        child = child.flag(
                            "IncludeInServiceDocument",
                            import.include_in_service_document,
                            false,
                        );
                    }
                    self.direct_annotations(child, import.id)
                }
            };
            node.push(self.with_inline(child, format!("{full_name}/{}", member.name())));
        }
        self.inline_annotations(&mut node, full_name);
        node
    }

    // -- annotations --------------------------------------------------------

    fn with_inline(&mut self, mut node: XmlNode, target: String) -> XmlNode {
        self.inline_annotations(&mut node, target);
        node
    }

    /// Append the inline annotations of `target`, once per target
    fn inline_annotations(&mut self, node: &mut XmlNode, target: String) {
        let placement = self.placement;
        let Some(annotations) = placement.inline.get(&target) else {
            return;
        };
        if !self.written.insert(target) {
            return;
        }
        for annotation in annotations {
            node.push(annotation_node(self.model.labeled_elements(), annotation));
        }
    }

    /// Foreign-namespace string annotations as prefixed attributes
    fn direct_annotations(&mut self, mut node: XmlNode, owner: NodeId) -> XmlNode {
        let model = self.model;
        let store = model.direct_annotations();
        for (key, value) in store.annotations(owner) {
            let AnnotationKey::Named { namespace, name } = key else {
                continue;
            };
            let Some(text) = value.downcast_ref::<String>() else {
                trace!(%namespace, %name, "direct annotation is not a string, not written");
                continue;
            };
            let index = match self.prefixes.iter().position(|p| p == namespace) {
                Some(index) => index,
                None => {
                    self.prefixes.push(namespace.clone());
                    self.prefixes.len() - 1
                }
            };
            node = node.attr(format!("ns{}:{name}", index + 1), text.as_str());
        }
        node
    }
}

fn reference_node(reference: &DocumentReference) -> XmlNode {
    let mut node = XmlNode::new("edmx:Reference").attr("Uri", reference.uri.as_str());
    for include in &reference.includes {
        node.push(
            XmlNode::new("edmx:Include")
                .attr("Namespace", include.namespace.as_str())
                .attr_opt("Alias", include.alias.as_deref()),
        );
    }
    for include in &reference.include_annotations {
        node.push(
            XmlNode::new("edmx:IncludeAnnotations")
                .attr("TermNamespace", include.term_namespace.as_str())
                .attr_opt("Qualifier", include.qualifier.as_deref())
                .attr_opt("TargetNamespace", include.target_namespace.as_deref()),
        );
    }
    node
}

fn binding_node(path: &str, target: &str) -> XmlNode {
    XmlNode::new("NavigationPropertyBinding")
        .attr("Path", path)
        .attr("Target", target)
}

/// `Type`, `Nullable` and facet attributes of a type reference
fn typed(node: XmlNode, type_ref: &TypeReference) -> XmlNode {
    let element = type_ref.element_type();
    let node = node
        .attr("Type", type_ref.type_name())
        .flag("Nullable", element.nullable(), true);
    with_facets(node, element.facets())
}

fn with_facets(node: XmlNode, facets: &Facets) -> XmlNode {
    node.attr_opt("MaxLength", facets.max_length.map(|v| v.to_string()))
        .attr_opt("Precision", facets.precision.map(|v| v.to_string()))
        .attr_opt("Scale", facets.scale.map(|v| v.to_string()))
        .attr_opt("Unicode", facets.unicode.map(|v| v.to_string()))
        .attr_opt("SRID", facets.srid.map(|v| v.to_string()))
}

fn annotation_node(labels: &LabeledElementArena, annotation: &VocabularyAnnotation) -> XmlNode {
    let node = XmlNode::new("Annotation")
        .attr("Term", annotation.term.as_str())
        .attr_opt("Qualifier", annotation.qualifier.as_deref());
    // a bare annotation reads back as Null
    if annotation.value == Expression::null() {
        return node;
    }
    with_value(labels, node, &annotation.value)
}

/// Attach a value, in attribute form when it has one
fn with_value(labels: &LabeledElementArena, node: XmlNode, value: &Expression) -> XmlNode {
    match value {
        Expression::Constant(constant) if constant.kind() != ConstantKind::Null => {
            node.attr(constant.kind().element_name(), constant.literal())
        }
        Expression::Path(path) => node.attr("Path", path.path()),
        other => node.child(expression_node(labels, other)),
    }
}

fn expression_node(labels: &LabeledElementArena, expression: &Expression) -> XmlNode {
    let operands = |name: &str, operands: &[&Expression]| {
        let mut node = XmlNode::new(name);
        for operand in operands {
            node.push(expression_node(labels, operand));
        }
        node
    };

    match expression {
        Expression::Constant(constant) => match constant.kind() {
            ConstantKind::Null => XmlNode::new("Null"),
            kind => XmlNode::new(kind.element_name()).with_text(constant.literal()),
        },
        Expression::Path(path) => XmlNode::new("Path").with_text(path.path()),
        Expression::Record(record) => {
            let mut node = XmlNode::new("Record")
                .attr_opt("Type", record.declared_type.as_ref().map(TypeReference::type_name));
            for property in &record.properties {
                node.push(with_value(
                    labels,
                    XmlNode::new("PropertyValue").attr("Property", property.property.as_str()),
                    &property.value,
                ));
            }
            node
        }
        Expression::Collection(collection) => {
            let elements: Vec<&Expression> = collection.elements.iter().collect();
            operands("Collection", &elements)
        }
        Expression::Cast(assertion) | Expression::IsType(assertion) => {
            let name = if matches!(expression, Expression::Cast(_)) {
                "Cast"
            } else {
                "IsOf"
            };
            let node = XmlNode::new(name).attr("Type", assertion.asserted_type.type_name());
            with_facets(node, assertion.asserted_type.element_type().facets())
                .child(expression_node(labels, &assertion.operand))
        }
        Expression::If(conditional) => operands(
            "If",
            &[&conditional.test, &conditional.if_true, &conditional.if_false],
        ),
        Expression::Apply(application) => {
            let arguments: Vec<&Expression> = application.arguments.iter().collect();
            operands("Apply", &arguments).attr("Function", application.function.as_str())
        }
        Expression::LabeledElement(handle) => match labels.get(*handle) {
            Some(label) => with_value(
                labels,
                XmlNode::new("LabeledElement").attr("Name", label.name.as_str()),
                &label.expression,
            ),
            None => {
                trace!(handle = handle.index(), "labeled element outside the model arena");
                XmlNode::new("Null")
            }
        },
        Expression::LabeledElementReference(reference) => {
            XmlNode::new("LabeledElementReference").with_text(reference.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CsdlReader;
    use edm_model::{EdmVersion, LabeledElement, MaxLength, TargetPath};
    use std::sync::Arc;

    fn write(model: &Model) -> Vec<CsdlDocument> {
        CsdlWriter::new(WriterSettings {
            version: None,
            indent: 0,
        })
        .write(model)
        .unwrap()
    }

    fn customer_model() -> Model {
        let mut model = Model::new(EdmVersion::V4);
        model
            .add_element(
                EntityType::new("NS", "Customer")
                    .with_key(["Id"])
                    .with_property(StructuralProperty::new(
                        "Id",
                        TypeReference::primitive(PrimitiveKind::Int32, false),
                    ))
                    .with_property(StructuralProperty::new(
                        "Name",
                        TypeReference::primitive(PrimitiveKind::String, true)
                            .with_max_length(MaxLength::Bounded(40))
                            .unwrap(),
                    )),
            )
            .unwrap();
        model
    }

    #[test]
    fn test_write_elides_defaults() {
        let documents = write(&customer_model());
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].namespace, "NS");

        let text = &documents[0].text;
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains(r#"<edmx:Edmx Version="4.0""#));
        assert!(text.contains(r#"<EntityType Name="Customer"><Key><PropertyRef Name="Id"/></Key>"#));
        assert!(text.contains(r#"<Property Name="Id" Type="Edm.Int32" Nullable="false"/>"#));
        assert!(text.contains(r#"<Property Name="Name" Type="Edm.String" MaxLength="40"/>"#));
        assert!(!text.contains("Abstract"));
        assert!(!text.contains("OpenType"));
    }

    #[test]
    fn test_invalid_names_block_serialization() {
        let mut model = customer_model();
        model
            .add_element(
                ComplexType::new("NS", "Bad Name").with_base_type("NotQualified"),
            )
            .unwrap();

        let err = CsdlWriter::default().write(&model).unwrap_err();
        let codes: Vec<_> = err.errors().iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                EdmErrorCode::ElementNameMustBeSimpleIdentifier,
                EdmErrorCode::ReferencedTypeMustHaveValidName,
            ]
        );
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_annotation_placement() {
        let mut model = customer_model();
        model
            .add_vocabulary_annotation(
                VocabularyAnnotation::new(
                    TargetPath::member("NS.Customer", "Name"),
                    "Core.Description",
                    Expression::string("display name"),
                )
                .inline(),
            )
            .unwrap();
        model
            .add_vocabulary_annotation(
                VocabularyAnnotation::new(
                    TargetPath::element("NS.Customer"),
                    "Core.LongDescription",
                    Expression::path("Name"),
                )
                .with_qualifier("Tablet"),
            )
            .unwrap();
        model
            .add_vocabulary_annotation(
                VocabularyAnnotation::new(
                    TargetPath::element("Other.Thing"),
                    "Core.Description",
                    Expression::null(),
                )
                .inline(),
            )
            .unwrap();

        let documents = write(&model);
        let text = &documents[0].text;
        assert!(text.contains(
            r#"<Property Name="Name" Type="Edm.String" MaxLength="40"><Annotation Term="Core.Description" String="display name"/></Property>"#
        ));
        assert!(text.contains(
            r#"<Annotations Target="NS.Customer"><Annotation Term="Core.LongDescription" Qualifier="Tablet" Path="Name"/></Annotations>"#
        ));
        // undeclared inline targets fall back to a block in the first document
        assert!(text.contains(
            r#"<Annotations Target="Other.Thing"><Annotation Term="Core.Description"/></Annotations>"#
        ));
    }

    #[test]
    fn test_foreign_direct_annotations_are_prefixed() {
        let mut model = customer_model();
        let id = model.elements()[0].id();
        model
            .set_annotation_value(id, "urn:extra", "origin", Some(Arc::new("crm".to_string())))
            .unwrap();
        model
            .set_annotation_value(id, "urn:extra", "weight", Some(Arc::new(3_u32)))
            .unwrap();

        let text = &write(&model)[0].text;
        assert!(text.contains(r#"xmlns:ns1="urn:extra""#));
        assert!(text.contains(r#"<EntityType Name="Customer" ns1:origin="crm">"#));
        assert!(!text.contains("weight"));
    }

    #[test]
    fn test_labeled_element_written_from_arena() {
        let mut model = customer_model();
        let handle = model.add_labeled_element(LabeledElement::new("Answer", Expression::integer(42)));
        model
            .add_vocabulary_annotation(VocabularyAnnotation::new(
                TargetPath::element("NS.Customer"),
                "Core.Rank",
                Expression::collection(vec![
                    Expression::LabeledElement(handle),
                    Expression::label_reference("Answer"),
                ]),
            ))
            .unwrap();

        let text = &write(&model)[0].text;
        assert!(text.contains(
            r#"<Collection><LabeledElement Name="Answer" Int="42"/><LabeledElementReference>Answer</LabeledElementReference></Collection>"#
        ));
    }

    #[test]
    fn test_written_documents_read_back() {
        let mut model = customer_model();
        model.declare_namespace("NS", Some("Self"));
        let first = write(&model);
        let texts: Vec<&str> = first.iter().map(|d| d.text.as_str()).collect();

        let outcome = CsdlReader::default().read(&texts).unwrap();
        assert!(outcome.is_clean(), "{:?}", outcome.errors);
        assert_eq!(outcome.model.namespace_for_alias("Self"), Some("NS"));
        assert_eq!(write(&outcome.model), first);
    }
}
