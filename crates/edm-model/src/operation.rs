//! Actions and functions

use crate::element::NodeId;
use crate::location::SourceLocation;
use crate::names::qualify;
use crate::types::TypeReference;

/// Action or function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Action,
    Function,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Action => "Action",
            Self::Function => "Function",
        }
    }
}

/// Operation parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    pub id: NodeId,
    pub name: String,
    pub type_ref: TypeReference,
    pub location: Option<SourceLocation>,
}

impl Parameter {
    /// Create a new parameter
    pub fn new(name: impl Into<String>, type_ref: TypeReference) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            type_ref,
            location: None,
        }
    }
}

/// Operation return type
#[derive(Debug, Clone)]
pub struct ReturnType {
    pub id: NodeId,
    pub type_ref: TypeReference,
    pub location: Option<SourceLocation>,
}

impl ReturnType {
    pub fn new(type_ref: TypeReference) -> Self {
        Self {
            id: NodeId::next(),
            type_ref,
            location: None,
        }
    }
}

/// Action or function declaration; overloads share a qualified name
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: NodeId,
    pub kind: OperationKind,
    pub namespace: String,
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<ReturnType>,
    pub is_bound: bool,
    pub entity_set_path: Option<String>,

    /// Functions only
    pub is_composable: bool,
    pub location: Option<SourceLocation>,
}

impl Operation {
    fn new(kind: OperationKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            kind,
            namespace: namespace.into(),
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
            is_bound: false,
            entity_set_path: None,
            is_composable: false,
            location: None,
        }
    }

    /// Create a new action
    pub fn action(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(OperationKind::Action, namespace, name)
    }

    /// Create a new function
    pub fn function(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(OperationKind::Function, namespace, name)
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, type_ref: TypeReference) -> Self {
        self.parameters.push(Parameter::new(name, type_ref));
        self
    }

    #[must_use]
    pub fn with_return_type(mut self, type_ref: TypeReference) -> Self {
        self.return_type = Some(ReturnType::new(type_ref));
        self
    }

    #[must_use]
    pub fn bound(mut self, is_bound: bool) -> Self {
        self.is_bound = is_bound;
        self
    }

    #[must_use]
    pub fn composable(mut self, is_composable: bool) -> Self {
        self.is_composable = is_composable;
        self
    }

    #[must_use]
    pub fn with_entity_set_path(mut self, path: impl Into<String>) -> Self {
        self.entity_set_path = Some(path.into());
        self
    }

    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    /// First parameter of a bound operation
    pub fn binding_parameter(&self) -> Option<&Parameter> {
        if self.is_bound {
            self.parameters.first()
        } else {
            None
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Parameter type names in declaration order
    pub fn signature(&self) -> Vec<String> {
        self.parameters
            .iter()
            .map(|p| p.type_ref.type_name())
            .collect()
    }

    pub fn return_type_ref(&self) -> Option<&TypeReference> {
        self.return_type.as_ref().map(|r| &r.type_ref)
    }
}
