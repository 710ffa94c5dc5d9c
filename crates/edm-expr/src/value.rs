//! Values produced by evaluating annotation expressions

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use edm_model::{Constant, PrimitiveKind, TypeReference};
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

/// Record value with its properties in construction order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuredValue {
    /// Qualified type name, when the record declared one
    pub type_name: Option<String>,
    pub properties: Vec<(String, Value)>,
}

impl StructuredValue {
    pub fn new(type_name: Option<String>) -> Self {
        Self {
            type_name,
            properties: Vec::new(),
        }
    }

    /// Add a property value
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.push((name.into(), value));
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// Evaluated expression value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Binary(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
    DateTimeOffset(DateTime<FixedOffset>),
    Decimal(Decimal),
    Duration(TimeDelta),
    Floating(f64),
    Guid(Uuid),
    Integer(i64),
    String(String),
    TimeOfDay(NaiveTime),
    Structured(StructuredValue),
    Collection(Vec<Value>),
}

impl Value {
    /// Value of a well-formed constant; malformed constants have none
    pub fn from_constant(constant: &Constant) -> Option<Self> {
        Some(match constant {
            Constant::Binary(b) => Self::Binary(b.clone()),
            Constant::Boolean(b) => Self::Boolean(*b),
            Constant::Date(d) => Self::Date(*d),
            Constant::DateTimeOffset(d) => Self::DateTimeOffset(*d),
            Constant::Decimal(d) => Self::Decimal(*d),
            Constant::Duration(d) => Self::Duration(*d),
            Constant::Floating(f) => Self::Floating(*f),
            Constant::Guid(g) => Self::Guid(*g),
            Constant::Integer(i) => Self::Integer(*i),
            Constant::String(s) => Self::String(s.clone()),
            Constant::TimeOfDay(t) => Self::TimeOfDay(*t),
            Constant::Null => Self::Null,
            Constant::Malformed { .. } => return None,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&StructuredValue> {
        match self {
            Self::Structured(s) => Some(s),
            _ => None,
        }
    }

    /// Natural primitive kind of a scalar value
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Self::Binary(_) => PrimitiveKind::Binary,
            Self::Boolean(_) => PrimitiveKind::Boolean,
            Self::Date(_) => PrimitiveKind::Date,
            Self::DateTimeOffset(_) => PrimitiveKind::DateTimeOffset,
            Self::Decimal(_) => PrimitiveKind::Decimal,
            Self::Duration(_) => PrimitiveKind::Duration,
            Self::Floating(_) => PrimitiveKind::Double,
            Self::Guid(_) => PrimitiveKind::Guid,
            Self::Integer(_) => PrimitiveKind::Int64,
            Self::String(_) => PrimitiveKind::String,
            Self::TimeOfDay(_) => PrimitiveKind::TimeOfDay,
            Self::Null | Self::Structured(_) | Self::Collection(_) => return None,
        })
    }

    /// Short description used in error messages
    pub fn type_description(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Structured(s) => s.type_name.clone().unwrap_or_else(|| "record".to_string()),
            Self::Collection(_) => "collection".to_string(),
            other => other
                .primitive_kind()
                .map_or_else(String::new, |kind| kind.to_string()),
        }
    }

    /// Static type of a scalar value, when it has one
    pub fn type_reference(&self) -> Option<TypeReference> {
        match self {
            Self::Structured(s) => s
                .type_name
                .as_ref()
                .map(|name| TypeReference::named(name.clone(), false)),
            other => other
                .primitive_kind()
                .map(|kind| TypeReference::primitive(kind, false)),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<StructuredValue> for Value {
    fn from(value: StructuredValue) -> Self {
        Self::Structured(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Floating(v) => write!(f, "{v}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::String(s) => f.write_str(s),
            Self::Guid(g) => write!(f, "{g}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTimeOffset(d) => write!(f, "{}", d.to_rfc3339()),
            Self::TimeOfDay(t) => write!(f, "{t}"),
            Self::Duration(d) => f.write_str(&edm_model::constant::format_duration(*d)),
            Self::Binary(b) => write!(f, "binary[{}]", b.len()),
            Self::Structured(s) => {
                write!(f, "{{")?;
                for (i, (name, value)) in s.properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
            Self::Collection(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_model::ConstantKind;

    #[test]
    fn test_from_constant() {
        assert_eq!(
            Value::from_constant(&Constant::Integer(7)),
            Some(Value::Integer(7))
        );
        assert_eq!(Value::from_constant(&Constant::Null), Some(Value::Null));
        assert!(Value::from_constant(&Constant::parse(ConstantKind::Integer, "x")).is_none());
    }

    #[test]
    fn test_structured_value() {
        let value = StructuredValue::new(Some("NS.Address".to_string()))
            .with_property("City", Value::from("Oslo"));
        assert_eq!(value.property("City").and_then(Value::as_str), Some("Oslo"));
        assert!(value.property("Street").is_none());
        assert_eq!(Value::from(value).type_description(), "NS.Address");
    }

    #[test]
    fn test_display() {
        let items = Value::Collection(vec![Value::Integer(1), Value::from("a"), Value::Null]);
        assert_eq!(items.to_string(), "[1, a, null]");
    }
}
