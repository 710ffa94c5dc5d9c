//! Annotation target paths
//!
//! Supported forms:
//! - `Namespace.Element` (also used for a schema namespace)
//! - `Namespace.Element/Member`
//! - `Namespace.Operation(Type1,Type2)` with an optional signature
//! - `Namespace.Operation(Type1)/Parameter`

use crate::{ContractError, Result};
use std::fmt;

/// Parsed annotation target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetPath {
    /// Schema element or, failing that, a schema namespace
    Element(String),
    /// Property, enum member, container member or unqualified operation parameter
    Member { owner: String, member: String },
    Operation {
        name: String,
        signature: Option<Vec<String>>,
    },
    Parameter {
        operation: String,
        signature: Option<Vec<String>>,
        parameter: String,
    },
}

impl TargetPath {
    pub fn element(name: impl Into<String>) -> Self {
        Self::Element(name.into())
    }

    pub fn member(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self::Member {
            owner: owner.into(),
            member: member.into(),
        }
    }

    pub fn operation<I, S>(name: impl Into<String>, signature: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Operation {
            name: name.into(),
            signature: Some(signature.into_iter().map(Into::into).collect()),
        }
    }

    /// Qualified name of the element the path starts from
    pub fn owner(&self) -> &str {
        match self {
            Self::Element(name) => name,
            Self::Member { owner, .. } => owner,
            Self::Operation { name, .. } => name,
            Self::Parameter { operation, .. } => operation,
        }
    }

    /// Parse a `Target` attribute value
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let invalid = |reason: &str| ContractError::InvalidTargetPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };

        if text.is_empty() {
            return Err(invalid("target is empty"));
        }

        if let Some(open) = text.find('(') {
            let close = matching_paren(text, open).ok_or_else(|| invalid("unbalanced parentheses"))?;
            let name = text[..open].trim();
            if name.is_empty() {
                return Err(invalid("missing operation name"));
            }
            let signature = split_signature(&text[open + 1..close]);
            let rest = &text[close + 1..];
            return match rest.strip_prefix('/') {
                None if rest.is_empty() => Ok(Self::Operation {
                    name: name.to_string(),
                    signature: Some(signature),
                }),
                Some(parameter) if !parameter.is_empty() && !parameter.contains('/') => {
                    Ok(Self::Parameter {
                        operation: name.to_string(),
                        signature: Some(signature),
                        parameter: parameter.to_string(),
                    })
                }
                _ => Err(invalid("unexpected text after signature")),
            };
        }

        match text.split_once('/') {
            Some((owner, member)) => {
                if owner.is_empty() || member.is_empty() || member.contains('/') {
                    return Err(invalid("expected Owner/Member"));
                }
                Ok(Self::member(owner, member))
            }
            None => Ok(Self::element(text)),
        }
    }
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0_usize;
    for (i, ch) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_signature(inner: &str) -> Vec<String> {
    let compact: String = inner.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut current = String::new();
    for ch in compact.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(name) => f.write_str(name),
            Self::Member { owner, member } => write!(f, "{owner}/{member}"),
            Self::Operation { name, signature } => {
                f.write_str(name)?;
                if let Some(signature) = signature {
                    write!(f, "({})", signature.join(","))?;
                }
                Ok(())
            }
            Self::Parameter {
                operation,
                signature,
                parameter,
            } => {
                f.write_str(operation)?;
                if let Some(signature) = signature {
                    write!(f, "({})", signature.join(","))?;
                }
                write!(f, "/{parameter}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_element_and_member() {
        assert_eq!(
            TargetPath::parse("NS.Customer").unwrap(),
            TargetPath::element("NS.Customer")
        );
        assert_eq!(
            TargetPath::parse("NS.Customer/Name").unwrap(),
            TargetPath::member("NS.Customer", "Name")
        );
    }

    #[test]
    fn test_parse_operation_signature() {
        let target =
            TargetPath::parse("DefaultNamespace.Function(Edm.String, Ref(DefaultNamespace.Entity))")
                .unwrap();
        assert_eq!(
            target,
            TargetPath::operation(
                "DefaultNamespace.Function",
                ["Edm.String", "Ref(DefaultNamespace.Entity)"]
            )
        );
        assert_eq!(
            target.to_string(),
            "DefaultNamespace.Function(Edm.String,Ref(DefaultNamespace.Entity))"
        );
    }

    #[test]
    fn test_parse_parameter_target() {
        let target = TargetPath::parse("NS.Act(NS.Customer,Collection(Edm.Int32))/count").unwrap();
        match &target {
            TargetPath::Parameter {
                operation,
                signature,
                parameter,
            } => {
                assert_eq!(operation, "NS.Act");
                assert_eq!(
                    signature.as_deref(),
                    Some(&["NS.Customer".to_string(), "Collection(Edm.Int32)".to_string()][..])
                );
                assert_eq!(parameter, "count");
            }
            other => panic!("unexpected target {other:?}"),
        }
        assert_eq!(target.owner(), "NS.Act");
    }

    #[test]
    fn test_empty_signature() {
        let target = TargetPath::parse("NS.Reset()").unwrap();
        assert_eq!(
            target,
            TargetPath::Operation {
                name: "NS.Reset".to_string(),
                signature: Some(Vec::new())
            }
        );
        assert_eq!(target.to_string(), "NS.Reset()");
    }

    #[test]
    fn test_reject_malformed_targets() {
        assert!(TargetPath::parse("").is_err());
        assert!(TargetPath::parse("NS.F(Edm.String").is_err());
        assert!(TargetPath::parse("NS.F(Edm.String)x").is_err());
        assert!(TargetPath::parse("NS.C/a/b").is_err());
        assert!(TargetPath::parse("/Name").is_err());
    }
}
