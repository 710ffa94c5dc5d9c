//! Annotation expression tree
//!
//! Labeled elements live in an arena owned by the model and are referred to
//! by [`LabelHandle`]. A [`LabeledElementReference`] names a label and is
//! bound to a handle exactly once, after the whole model has been read, so
//! references may appear before the labels they point at.

use crate::constant::Constant;
use crate::error::{EdmError, EdmErrorCode};
use crate::location::SourceLocation;
use crate::types::TypeReference;
use crate::{ContractError, Result};
use std::fmt;
use std::sync::OnceLock;

/// Handle to a labeled element in a model's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelHandle(usize);

impl LabelHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Named sub-expression that may be referenced elsewhere
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledElement {
    pub name: String,
    pub expression: Expression,
    pub location: Option<SourceLocation>,
}

impl LabeledElement {
    pub fn new(name: impl Into<String>, expression: Expression) -> Self {
        Self {
            name: name.into(),
            expression,
            location: None,
        }
    }
}

/// Arena of labeled elements
#[derive(Debug, Clone, Default)]
pub struct LabeledElementArena {
    elements: Vec<LabeledElement>,
}

impl LabeledElementArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: LabeledElement) -> LabelHandle {
        self.elements.push(element);
        LabelHandle(self.elements.len() - 1)
    }

    pub fn get(&self, handle: LabelHandle) -> Option<&LabeledElement> {
        self.elements.get(handle.0)
    }

    /// Every label declared with `name`
    pub fn find_by_name(&self, name: &str) -> Vec<LabelHandle> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.name == name)
            .map(|(i, _)| LabelHandle(i))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LabelHandle, &LabeledElement)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (LabelHandle(i), e))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Reference to a labeled element by name, bound once
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledElementReference {
    name: String,
    target: OnceLock<LabelHandle>,
}

impl LabeledElementReference {
    /// Create an unbound reference
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: OnceLock::new(),
        }
    }

    /// Create a reference already bound to `handle`
    pub fn bound(name: impl Into<String>, handle: LabelHandle) -> Self {
        let target = OnceLock::new();
        let _ = target.set(handle);
        Self {
            name: name.into(),
            target,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Option<LabelHandle> {
        self.target.get().copied()
    }

    /// Bind to a label; binding twice is a contract violation
    pub fn bind(&self, handle: LabelHandle) -> Result<()> {
        self.target
            .set(handle)
            .map_err(|_| ContractError::LabeledElementAlreadyBound {
                name: self.name.clone(),
            })
    }
}

/// Property value inside a record expression
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub property: String,
    pub value: Expression,
}

/// Record construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordExpression {
    /// Declared structured type, when given
    pub declared_type: Option<TypeReference>,
    pub properties: Vec<PropertyValue>,
}

impl RecordExpression {
    pub fn property(&self, name: &str) -> Option<&Expression> {
        self.properties
            .iter()
            .find(|p| p.property == name)
            .map(|p| &p.value)
    }
}

/// Collection construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionExpression {
    pub declared_type: Option<TypeReference>,
    pub elements: Vec<Expression>,
}

/// Path relative to the annotated element, segments separated by `/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    pub segments: Vec<String>,
}

impl PathExpression {
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path.split('/').map(str::to_string).collect(),
        }
    }

    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

/// Operand plus asserted type, shared by `Cast` and `IsOf`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAssertion {
    pub operand: Expression,
    pub asserted_type: TypeReference,
}

/// Conditional expression
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpression {
    pub test: Expression,
    pub if_true: Expression,
    pub if_false: Expression,
}

/// Client-side function application
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionApplication {
    /// Qualified function name
    pub function: String,
    pub arguments: Vec<Expression>,
}

/// Kind tag of an expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    Constant,
    Record,
    Collection,
    Path,
    Cast,
    IsType,
    If,
    Apply,
    LabeledElement,
    LabeledElementReference,
}

impl fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Annotation expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Constant),
    Record(RecordExpression),
    Collection(CollectionExpression),
    Path(PathExpression),
    Cast(Box<TypeAssertion>),
    IsType(Box<TypeAssertion>),
    If(Box<IfExpression>),
    Apply(FunctionApplication),
    /// Declaration site of a label stored in the model's arena
    LabeledElement(LabelHandle),
    LabeledElementReference(LabeledElementReference),
}

impl Expression {
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Self::Constant(_) => ExpressionKind::Constant,
            Self::Record(_) => ExpressionKind::Record,
            Self::Collection(_) => ExpressionKind::Collection,
            Self::Path(_) => ExpressionKind::Path,
            Self::Cast(_) => ExpressionKind::Cast,
            Self::IsType(_) => ExpressionKind::IsType,
            Self::If(_) => ExpressionKind::If,
            Self::Apply(_) => ExpressionKind::Apply,
            Self::LabeledElement(_) => ExpressionKind::LabeledElement,
            Self::LabeledElementReference(_) => ExpressionKind::LabeledElementReference,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Constant(Constant::String(value.into()))
    }

    pub fn integer(value: i64) -> Self {
        Self::Constant(Constant::Integer(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::Constant(Constant::Boolean(value))
    }

    pub fn null() -> Self {
        Self::Constant(Constant::Null)
    }

    pub fn path(path: &str) -> Self {
        Self::Path(PathExpression::parse(path))
    }

    pub fn cast(operand: Expression, asserted_type: TypeReference) -> Self {
        Self::Cast(Box::new(TypeAssertion {
            operand,
            asserted_type,
        }))
    }

    pub fn is_type(operand: Expression, asserted_type: TypeReference) -> Self {
        Self::IsType(Box::new(TypeAssertion {
            operand,
            asserted_type,
        }))
    }

    pub fn if_else(test: Expression, if_true: Expression, if_false: Expression) -> Self {
        Self::If(Box::new(IfExpression {
            test,
            if_true,
            if_false,
        }))
    }

    pub fn apply(function: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Self::Apply(FunctionApplication {
            function: function.into(),
            arguments,
        })
    }

    pub fn record<I, S>(declared_type: Option<TypeReference>, properties: I) -> Self
    where
        I: IntoIterator<Item = (S, Expression)>,
        S: Into<String>,
    {
        Self::Record(RecordExpression {
            declared_type,
            properties: properties
                .into_iter()
                .map(|(name, value)| PropertyValue {
                    property: name.into(),
                    value,
                })
                .collect(),
        })
    }

    pub fn collection(elements: Vec<Expression>) -> Self {
        Self::Collection(CollectionExpression {
            declared_type: None,
            elements,
        })
    }

    pub fn label_reference(name: impl Into<String>) -> Self {
        Self::LabeledElementReference(LabeledElementReference::new(name))
    }

    /// Direct children; labeled elements are not followed
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Self::Record(record) => record.properties.iter().map(|p| &p.value).collect(),
            Self::Collection(collection) => collection.elements.iter().collect(),
            Self::Cast(assertion) | Self::IsType(assertion) => vec![&assertion.operand],
            Self::If(cond) => vec![&cond.test, &cond.if_true, &cond.if_false],
            Self::Apply(apply) => apply.arguments.iter().collect(),
            Self::Constant(_)
            | Self::Path(_)
            | Self::LabeledElement(_)
            | Self::LabeledElementReference(_) => Vec::new(),
        }
    }

    /// Structural problems of this node and everything beneath it
    ///
    /// A node with a bad descendant is itself bad. Problems that need the
    /// rest of the model (unknown types, functions, paths) are reported by
    /// validation instead.
    pub fn errors(&self) -> Vec<EdmError> {
        let mut errors = Vec::new();
        self.collect_errors(&mut errors);
        errors
    }

    pub fn is_bad(&self) -> bool {
        !self.errors().is_empty()
    }

    fn collect_errors(&self, errors: &mut Vec<EdmError>) {
        match self {
            Self::Constant(constant) => errors.extend(constant.error()),
            Self::Path(path) => {
                if path.segments.iter().any(String::is_empty) {
                    errors.push(EdmError::new(
                        EdmErrorCode::PathIsNotValidForTheGivenContext,
                        format!("path '{}' has an empty segment", path.path()),
                    ));
                }
            }
            Self::Apply(apply) if apply.function.is_empty() => {
                errors.push(EdmError::new(
                    EdmErrorCode::BadUnresolvedOperation,
                    "function application without a function name",
                ));
            }
            Self::LabeledElementReference(reference) if reference.target().is_none() => {
                errors.push(EdmError::new(
                    EdmErrorCode::BadUnresolvedLabeledElement,
                    format!("labeled element '{}' is not bound", reference.name()),
                ));
            }
            _ => {}
        }
        for child in self.children() {
            child.collect_errors(errors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::ConstantKind;
    use crate::types::PrimitiveKind;

    #[test]
    fn test_label_reference_binds_once() {
        let mut arena = LabeledElementArena::new();
        let handle = arena.insert(LabeledElement::new("Label1", Expression::integer(1)));

        let reference = LabeledElementReference::new("Label1");
        assert!(reference.target().is_none());
        reference.bind(handle).unwrap();
        assert_eq!(reference.target(), Some(handle));

        let err = reference.bind(handle).unwrap_err();
        assert!(matches!(err, ContractError::LabeledElementAlreadyBound { .. }));
    }

    #[test]
    fn test_arena_lookup_by_name() {
        let mut arena = LabeledElementArena::new();
        let a = arena.insert(LabeledElement::new("A", Expression::null()));
        arena.insert(LabeledElement::new("B", Expression::null()));
        let a2 = arena.insert(LabeledElement::new("A", Expression::null()));

        assert_eq!(arena.find_by_name("A"), vec![a, a2]);
        assert!(arena.find_by_name("C").is_empty());
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_bad_child_makes_parent_bad() {
        let good = Expression::if_else(
            Expression::boolean(true),
            Expression::string("a"),
            Expression::string("b"),
        );
        assert!(!good.is_bad());

        let bad = Expression::collection(vec![
            Expression::integer(1),
            Expression::Constant(Constant::parse(ConstantKind::Integer, "abc")),
        ]);
        let errors = bad.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, EdmErrorCode::InvalidInteger);
    }

    #[test]
    fn test_unbound_reference_is_bad() {
        let expr = Expression::cast(
            Expression::label_reference("Missing"),
            TypeReference::primitive(PrimitiveKind::String, true),
        );
        assert_eq!(
            expr.errors()[0].code,
            EdmErrorCode::BadUnresolvedLabeledElement
        );
    }

    #[test]
    fn test_path_segments() {
        let path = PathExpression::parse("Address/City");
        assert_eq!(path.segments, vec!["Address", "City"]);
        assert_eq!(path.path(), "Address/City");
        assert!(Expression::path("A//B").is_bad());
    }
}
