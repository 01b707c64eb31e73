//! Label translation for raw field keys and values.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::Label;

/// Maps a raw key or value from the record tree to a display label.
pub trait LabelMapper: Send + Sync {
    /// Return the label for `raw`; unmapped input must still produce a label.
    fn map_label(&self, raw: &str) -> Label;
}

impl<F> LabelMapper for F
where
    F: Fn(&str) -> Label + Send + Sync,
{
    fn map_label(&self, raw: &str) -> Label {
        self(raw)
    }
}

/// What `TextMap` returns for strings it has no entry for.
#[derive(Clone, Default)]
pub enum LabelFallback {
    /// Return the raw string unchanged.
    #[default]
    Identity,
    /// Return a fixed label.
    Fixed(Label),
    /// Lowercase, then capitalize each word (`ZWEI_ZIMMER wohnung` → `Zwei_zimmer Wohnung`).
    TitleCase,
    /// Run a custom transform.
    Transform(Arc<dyn Fn(&str) -> Label + Send + Sync>),
}

impl fmt::Debug for LabelFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelFallback::Identity => f.write_str("Identity"),
            LabelFallback::Fixed(label) => f.debug_tuple("Fixed").field(label).finish(),
            LabelFallback::TitleCase => f.write_str("TitleCase"),
            LabelFallback::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

impl LabelFallback {
    fn apply(&self, raw: &str) -> Label {
        match self {
            LabelFallback::Identity => raw.to_string(),
            LabelFallback::Fixed(label) => label.clone(),
            LabelFallback::TitleCase => title_case(raw),
            LabelFallback::Transform(transform) => transform(raw),
        }
    }
}

/// Dictionary-backed label mapper.
///
/// Empty entries count as unmapped, so a translation file can list keys
/// without labels and still fall through to the fallback.
#[derive(Clone, Debug, Default)]
pub struct TextMap {
    entries: HashMap<String, Label>,
    fallback: LabelFallback,
}

impl TextMap {
    /// Empty map with identity fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(raw, label)` pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Label>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            fallback: LabelFallback::default(),
        }
    }

    /// Replace the fallback used for unmapped strings.
    pub fn with_fallback(mut self, fallback: LabelFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, raw: impl Into<String>, label: impl Into<Label>) {
        self.entries.insert(raw.into(), label.into());
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, raw: &str) -> Option<&str> {
        self.entries
            .get(raw)
            .map(String::as_str)
            .filter(|label| !label.is_empty())
    }
}

impl LabelMapper for TextMap {
    fn map_label(&self, raw: &str) -> Label {
        match self.lookup(raw) {
            Some(label) => label.to_string(),
            None => self.fallback.apply(raw),
        }
    }
}

/// Lowercase `raw` and uppercase the first letter of every whitespace-separated word.
pub fn title_case(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut at_word_start = true;
    for ch in lower.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_entries_win_over_fallback() {
        let map = TextMap::from_entries([("wohnflaeche", "Wohnfläche"), ("kamin", "")])
            .with_fallback(LabelFallback::Fixed("?".into()));
        assert_eq!(map.map_label("wohnflaeche"), "Wohnfläche");
        assert_eq!(map.map_label("kamin"), "?");
        assert_eq!(map.map_label("sauna"), "?");
    }

    #[test]
    fn identity_is_the_default_fallback() {
        let map = TextMap::new();
        assert!(map.is_empty());
        assert_eq!(map.map_label("EINFAMILIENHAUS"), "EINFAMILIENHAUS");
    }

    #[test]
    fn title_case_and_transform_fallbacks() {
        let map = TextMap::new().with_fallback(LabelFallback::TitleCase);
        assert_eq!(map.map_label("DOPPELHAUSHAELFTE mit garten"), "Doppelhaushaelfte Mit Garten");

        let map = TextMap::new()
            .with_fallback(LabelFallback::Transform(Arc::new(|raw: &str| raw.replace('_', " "))));
        assert_eq!(map.map_label("MIETE_PACHT"), "MIETE PACHT");
    }

    #[test]
    fn closures_are_label_mappers() {
        let upper = |raw: &str| raw.to_uppercase();
        assert_eq!(upper.map_label("kauf"), "KAUF");
    }
}
