use std::fmt;

use indexmap::IndexMap;
use quick_xml::Reader as XmlReader;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use thiserror::Error;

/// Failure while turning XML text into a `FieldNode` tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("xml syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("invalid attribute: {0}")]
    Attribute(#[from] AttrError),
    #[error("document has no root element")]
    Empty,
    #[error("element '{0}' is never closed")]
    Unclosed(String),
}

/// One element of a record's field tree: name, attributes, direct text, children.
///
/// Attributes and children keep document order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FieldNode {
    name: String,
    attributes: IndexMap<String, String>,
    text: String,
    children: Vec<FieldNode>,
}

/// Slash-separated path of element names below a node (`preise/kaufpreis`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Build a path from individual element names.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse `a/b/c`; empty segments are ignored.
    pub fn parse(path: &str) -> Self {
        Self::new(path.split('/').filter(|segment| !segment.is_empty()))
    }

    /// Element names from the outermost to the innermost.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<&[&str]> for FieldPath {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl FieldNode {
    /// Create an element without content.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: set the direct text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: append an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder: append a child element.
    pub fn with_child(mut self, child: FieldNode) -> Self {
        self.children.push(child);
        self
    }

    /// Parse an XML document held as UTF-8 text and return its root element.
    pub fn parse_document(xml: &str) -> Result<FieldNode, TreeError> {
        Self::read_tree(XmlReader::from_str(xml))
    }

    /// Parse raw marker bytes, decoding through the encoding named in the XML
    /// declaration (or a byte order mark); UTF-8 when neither is present.
    pub fn parse_bytes(bytes: &[u8]) -> Result<FieldNode, TreeError> {
        Self::read_tree(XmlReader::from_reader(bytes))
    }

    fn read_tree(mut reader: XmlReader<&[u8]>) -> Result<FieldNode, TreeError> {
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut stack: Vec<FieldNode> = Vec::new();
        let mut root: Option<FieldNode> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => stack.push(Self::from_start(&reader, &start)?),
                Event::Empty(start) => {
                    let node = Self::from_start(&reader, &start)?;
                    attach(&mut stack, &mut root, node);
                }
                Event::End(_) => {
                    if let Some(node) = stack.pop() {
                        attach(&mut stack, &mut root, node);
                    }
                }
                Event::Text(text) => {
                    if let Some(node) = stack.last_mut() {
                        node.push_text(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(node) = stack.last_mut() {
                        node.push_text(reader.decoder().decode(&data)?.trim());
                    }
                }
                Event::Eof => break,
                _ => (),
            }
            buf.clear();
        }

        if let Some(open) = stack.pop() {
            return Err(TreeError::Unclosed(open.name));
        }
        root.ok_or(TreeError::Empty)
    }

    fn from_start(reader: &XmlReader<&[u8]>, start: &BytesStart<'_>) -> Result<Self, TreeError> {
        let decoder = reader.decoder();
        let mut node = FieldNode::new(decoder.decode(start.local_name().as_ref())?);
        for attr in start.attributes() {
            let attr = attr?;
            if attr.key.as_ref().starts_with(b"xmlns") {
                continue;
            }
            let key = decoder.decode(attr.key.local_name().as_ref())?.into_owned();
            let value = attr.decode_and_unescape_value(reader)?.into_owned();
            node.attributes.insert(key, value);
        }
        Ok(node)
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }

    /// Element name without namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct text content (child element text is not included).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the element carries direct text.
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Value of a single attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Child elements in document order.
    pub fn children(&self) -> &[FieldNode] {
        &self.children
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&FieldNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All child elements named `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldNode> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Follow `path` through first-matching children.
    pub fn get(&self, path: &FieldPath) -> Option<&FieldNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Direct text at `path`, if the element exists.
    pub fn text_at(&self, path: &FieldPath) -> Option<&str> {
        self.get(path).map(FieldNode::text)
    }

    /// Attribute `key` of the element at `path`.
    pub fn attribute_at(&self, path: &FieldPath, key: &str) -> Option<&str> {
        self.get(path).and_then(|node| node.attribute(key))
    }
}

fn attach(stack: &mut [FieldNode], root: &mut Option<FieldNode>, node: FieldNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}
