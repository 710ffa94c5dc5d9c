//! XML syntax layer
//!
//! A small owned element tree over `quick-xml`: documents are read into
//! [`XmlElement`] nodes carrying resolved namespaces and source locations,
//! and written from [`XmlNode`] trees.

use edm_model::{EdmError, EdmErrorCode, SourceLocation};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use quick_xml::Writer;

/// EDMX wrapper namespace
pub const EDMX_NAMESPACE: &str = "http://docs.oasis-open.org/odata/ns/edmx";

/// CSDL element namespace
pub const EDM_NAMESPACE: &str = "http://docs.oasis-open.org/odata/ns/edm";

/// Reserved `xml:` prefix namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Attribute with its resolved namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// `None` for unprefixed attributes
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// Element of a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,

    /// Concatenated character data, trimmed
    pub text: String,
    pub location: SourceLocation,
}

impl XmlElement {
    fn new(namespace: Option<String>, name: String, location: SourceLocation) -> Self {
        Self {
            namespace,
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
            location,
        }
    }

    /// Whether this is `name` in `namespace`
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.name == name
    }

    /// Unprefixed attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Attributes in a namespace other than the given ones
    pub fn foreign_attributes<'a>(
        &'a self,
        own: &'a [&'a str],
    ) -> impl Iterator<Item = &'a XmlAttribute> + 'a {
        self.attributes.iter().filter(move |a| {
            a.namespace
                .as_deref()
                .is_some_and(|ns| ns != XML_NAMESPACE && !own.contains(&ns))
        })
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        Some(&self.location)
    }
}

/// Byte offset to line/column conversion
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn location(&self, offset: usize, source: Option<&str>) -> SourceLocation {
        let line = self.starts.partition_point(|&start| start <= offset);
        let line_start = self.starts.get(line.saturating_sub(1)).copied().unwrap_or(0);
        let location = SourceLocation::new(line, offset - line_start + 1);
        match source {
            Some(source) => location.with_source(source),
            None => location,
        }
    }
}

fn xml_error(message: impl Into<String>, location: SourceLocation) -> EdmError {
    EdmError::new(EdmErrorCode::XmlError, message).at(Some(&location))
}

fn owned_namespace(resolved: &ResolveResult<'_>) -> std::result::Result<Option<String>, String> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(String::from_utf8_lossy(ns).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(prefix)
        )),
    }
}

/// Parse `text` into its root element
///
/// Fails with a single `XmlError` diagnostic when the input is not
/// well-formed XML.
pub fn parse_document(text: &str, source: Option<&str>) -> Result<XmlElement, EdmError> {
    let index = LineIndex::new(text);
    let mut reader = NsReader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let before = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
        let skipped = text
            .get(before..)
            .map_or(0, |rest| rest.len() - rest.trim_start().len());
        let here = index.location(before.saturating_add(skipped), source);

        let (resolved, event) = match reader.read_resolved_event() {
            Ok(pair) => pair,
            Err(e) => return Err(xml_error(e.to_string(), here)),
        };
        let namespace = owned_namespace(&resolved);

        match event {
            Event::Start(start) | Event::Empty(start)
                if root.is_some() && stack.is_empty() =>
            {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                return Err(xml_error(
                    format!("unexpected element '{name}' after the document element"),
                    here,
                ));
            }
            Event::Start(start) => {
                let namespace = namespace.map_err(|m| xml_error(m, here.clone()))?;
                let element = read_element(&reader, &start, namespace, here)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let namespace = namespace.map_err(|m| xml_error(m, here.clone()))?;
                let element = read_element(&reader, &start, namespace, here)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(xml_error("unbalanced end tag", here));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(content) => {
                let content = content
                    .unescape()
                    .map_err(|e| xml_error(e.to_string(), here.clone()))?;
                match stack.last_mut() {
                    Some(element) => element.text.push_str(&content),
                    None if content.trim().is_empty() => {}
                    None => return Err(xml_error("text outside the document element", here)),
                }
            }
            Event::CData(content) => {
                if let Some(element) = stack.last_mut() {
                    element.text.push_str(&String::from_utf8_lossy(&content));
                }
            }
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(xml_error(
            format!("element '{}' is not closed", open.name),
            open.location.clone(),
        ));
    }
    let end = index.location(text.len(), source);
    root.ok_or_else(|| xml_error("document has no root element", end))
}

fn read_element(
    reader: &NsReader<&[u8]>,
    start: &BytesStart<'_>,
    namespace: Option<String>,
    location: SourceLocation,
) -> Result<XmlElement, EdmError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut element = XmlElement::new(namespace, name, location);

    for attribute in start.attributes() {
        let attribute: Attribute<'_> =
            attribute.map_err(|e| xml_error(e.to_string(), element.location.clone()))?;
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attribute.key);
        let namespace =
            owned_namespace(&resolved).map_err(|m| xml_error(m, element.location.clone()))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| xml_error(e.to_string(), element.location.clone()))?;
        element.attributes.push(XmlAttribute {
            namespace,
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value: value.into_owned(),
        });
    }
    Ok(element)
}

/// Element to be written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Qualified name as written, e.g. `edmx:Edmx`
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: Option<String>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Append an attribute when `value` is present
    #[must_use]
    pub fn attr_opt(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// Append `name="true|false"` unless it equals the default
    #[must_use]
    pub fn flag(self, name: &str, value: bool, default: bool) -> Self {
        if value == default {
            self
        } else {
            self.attr(name, value.to_string())
        }
    }

    #[must_use]
    pub fn child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn push(&mut self, child: XmlNode) {
        self.children.push(child);
    }
}

/// Render a document with an XML declaration; `indent` of 0 writes compact output
pub fn render(root: &XmlNode, indent: usize) -> Result<String, String> {
    let mut writer = if indent == 0 {
        Writer::new(Vec::new())
    } else {
        Writer::new_with_indent(Vec::new(), b' ', indent)
    };
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| e.to_string())?;
    write_node(&mut writer, root)?;
    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), String> {
    let mut start = BytesStart::new(node.name.as_str());
    for (name, value) in &node.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if node.children.is_empty() && node.text.is_none() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| e.to_string());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| e.to_string())?;
    if let Some(text) = &node.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| e.to_string())?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name.as_str())))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolves_namespaces() {
        let text = r#"<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0">
  <edmx:DataServices>
    <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" xmlns:x="urn:x" Namespace="NS" x:Tag="a&amp;b"/>
  </edmx:DataServices>
</edmx:Edmx>"#;
        let root = parse_document(text, Some("doc.xml")).unwrap();
        assert!(root.is(EDMX_NAMESPACE, "Edmx"));
        assert_eq!(root.attribute("Version"), Some("4.0"));

        let schema = &root.children[0].children[0];
        assert!(schema.is(EDM_NAMESPACE, "Schema"));
        assert_eq!(schema.attribute("Namespace"), Some("NS"));
        let foreign: Vec<_> = schema.foreign_attributes(&[EDM_NAMESPACE]).collect();
        assert_eq!(foreign.len(), 1);
        assert_eq!(foreign[0].namespace.as_deref(), Some("urn:x"));
        assert_eq!(foreign[0].value, "a&b");
        assert_eq!(schema.location.line, 3);
        assert_eq!(schema.location.column, 5);
        assert_eq!(schema.location.source.as_deref(), Some("doc.xml"));
    }

    #[test]
    fn test_text_content_is_collected() {
        let root = parse_document("<Path xmlns=\"urn:a\"> A/B </Path>", None).unwrap();
        assert_eq!(root.text, "A/B");
    }

    #[test]
    fn test_malformed_input_is_an_xml_error() {
        let err = parse_document("<a><b></a>", None).unwrap_err();
        assert_eq!(err.code, EdmErrorCode::XmlError);

        let err = parse_document("", None).unwrap_err();
        assert_eq!(err.code, EdmErrorCode::XmlError);

        let err = parse_document("<p:a/>", None).unwrap_err();
        assert_eq!(err.code, EdmErrorCode::XmlError);
    }

    #[test]
    fn test_render_elides_empty_elements() {
        let root = XmlNode::new("Schema")
            .attr("Namespace", "NS")
            .child(XmlNode::new("Path").with_text("A<B"))
            .child(XmlNode::new("Null"));
        let text = render(&root, 0).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains("<Schema Namespace=\"NS\"><Path>A&lt;B</Path><Null/></Schema>"));
    }

    #[test]
    fn test_flag_skips_default() {
        let node = XmlNode::new("EntityType")
            .flag("Abstract", false, false)
            .flag("OpenType", true, false);
        assert_eq!(node.attributes, vec![("OpenType".to_string(), "true".to_string())]);
    }
}
