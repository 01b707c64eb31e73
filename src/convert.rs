//! Conversion of record field trees into labeled, type-coerced fields.

use indexmap::IndexMap;
use serde::Serialize;
use serde::ser::SerializeStruct;

use crate::constants::record::{BOOL_FALSE, BOOL_TRUE};
use crate::format::FormatterResolver;
use crate::labels::LabelMapper;
use crate::record::FieldNode;
use crate::types::{FieldKey, Label};

/// Ordered conversion output keyed by raw field name.
pub type ConvertedFields = IndexMap<FieldKey, ConvertedField>;

/// Coerced value of a converted field.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// `true` / `false` tokens from the export.
    Bool(bool),
    /// Raw or formatted text.
    Text(String),
    /// Attribute-only element converted one level deep.
    Attributes(ConvertedFields),
    /// Value that could not be rendered.
    Empty,
}

impl FieldValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Boolean content, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Nested attribute fields, if this is an attribute mapping.
    pub fn as_attributes(&self) -> Option<&ConvertedFields> {
        match self {
            FieldValue::Attributes(fields) => Some(fields),
            _ => None,
        }
    }
}

/// One converted field.
///
/// Serializes as `{key, label, value, original?}`; attribute-only fields carry
/// their nested fields under `attributes` instead of `value`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertedField {
    /// Raw field name.
    pub key: FieldKey,
    /// Display label from the label mapper.
    pub label: Label,
    /// Coerced value.
    pub value: FieldValue,
    /// Raw text before formatting; set whenever a formatter chain ran.
    pub original: Option<String>,
}

impl Serialize for ConvertedField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let len = if self.original.is_some() { 4 } else { 3 };
        let mut state = serializer.serialize_struct("ConvertedField", len)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("label", &self.label)?;
        match &self.value {
            FieldValue::Attributes(fields) => state.serialize_field("attributes", fields)?,
            value => state.serialize_field("value", value)?,
        }
        match &self.original {
            Some(original) => state.serialize_field("original", original)?,
            None => state.skip_field("original")?,
        }
        state.end()
    }
}

/// Converts field nodes using a label mapper and a formatter resolver.
///
/// Conversion itself keeps no state; the only memoization is inside the
/// resolver.
#[derive(Clone, Copy)]
pub struct RecordConverter<'a> {
    labels: &'a dyn LabelMapper,
    formatters: &'a FormatterResolver,
}

impl<'a> RecordConverter<'a> {
    /// Converter borrowing its collaborators.
    pub fn new(labels: &'a dyn LabelMapper, formatters: &'a FormatterResolver) -> Self {
        Self { labels, formatters }
    }

    /// Resolver used for formatting decisions.
    pub fn formatters(&self) -> &'a FormatterResolver {
        self.formatters
    }

    /// Label mapper used for display labels.
    pub fn labels(&self) -> &'a dyn LabelMapper {
        self.labels
    }

    /// Convert every child of `node` in source order, skipping keys in `exclude`.
    ///
    /// Attribute-only children become `FieldValue::Attributes`; deeper nesting
    /// is not expanded. A repeated key keeps its first position and its last value.
    pub fn convert(&self, node: &FieldNode, exclude: &[&str]) -> ConvertedFields {
        let mut fields = ConvertedFields::with_capacity(node.children().len());
        for child in node.children() {
            let key = child.name();
            if exclude.contains(&key) {
                continue;
            }
            let field = self.convert_child(child);
            fields.insert(key.to_string(), field);
        }
        fields
    }

    /// Convert one child element.
    pub fn convert_child(&self, child: &FieldNode) -> ConvertedField {
        let key = child.name();
        let label = self.labels.map_label(key);
        if !child.has_text() && !child.attributes().is_empty() {
            return ConvertedField {
                key: key.to_string(),
                label,
                value: FieldValue::Attributes(self.convert_attributes(child)),
                original: None,
            };
        }
        if !child.has_text() && !child.children().is_empty() {
            return ConvertedField {
                key: key.to_string(),
                label,
                value: FieldValue::Empty,
                original: None,
            };
        }
        let (value, original) = self.coerce(key, child.text());
        ConvertedField {
            key: key.to_string(),
            label,
            value,
            original,
        }
    }

    fn convert_attributes(&self, node: &FieldNode) -> ConvertedFields {
        node.attributes()
            .iter()
            .map(|(key, raw)| {
                let (value, original) = self.coerce(key, raw);
                let field = ConvertedField {
                    key: key.clone(),
                    label: self.labels.map_label(key),
                    value,
                    original,
                };
                (key.clone(), field)
            })
            .collect()
    }

    /// Boolean tokens first, then the key's formatter chain, else the raw text.
    fn coerce(&self, key: &str, raw: &str) -> (FieldValue, Option<String>) {
        if let Some(flag) = parse_bool_token(raw) {
            return (FieldValue::Bool(flag), None);
        }
        let chain = self.formatters.resolve(key);
        if chain.is_empty() {
            return (FieldValue::Text(raw.to_string()), None);
        }
        let value = chain
            .apply(raw)
            .map(FieldValue::Text)
            .unwrap_or(FieldValue::Empty);
        (value, Some(raw.to_string()))
    }
}

/// `Some(bool)` only for the exact export tokens `true` and `false`.
pub fn parse_bool_token(raw: &str) -> Option<bool> {
    match raw {
        BOOL_TRUE => Some(true),
        BOOL_FALSE => Some(false),
        _ => None,
    }
}
