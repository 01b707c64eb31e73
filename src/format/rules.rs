use std::fmt;
use std::sync::Arc;

use super::formatters::{PriceFormatter, SquareMeters, TrimDecimals, ValueFormatter};
use crate::constants::format::WILDCARD_MARKER;

/// Field-name pattern of a formatter rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldPattern {
    /// Key must equal the pattern.
    Exact(String),
    /// Key must contain the pattern as a substring.
    Contains(String),
}

impl FieldPattern {
    /// Parse rule syntax: any `*` makes a substring rule, wherever it appears.
    ///
    /// `*preis`, `preis*` and `pr*eis` all become `Contains("preis")`.
    pub fn parse(pattern: &str) -> Self {
        if pattern.contains(WILDCARD_MARKER) {
            FieldPattern::Contains(pattern.replace(WILDCARD_MARKER, ""))
        } else {
            FieldPattern::Exact(pattern.to_string())
        }
    }

    /// True when `key` satisfies the pattern.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            FieldPattern::Exact(exact) => key == exact,
            FieldPattern::Contains(needle) => key.contains(needle.as_str()),
        }
    }
}

impl From<&str> for FieldPattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}

/// Patterns plus the formatter applied when any of them matches.
#[derive(Clone)]
pub struct FormatterRule {
    patterns: Vec<FieldPattern>,
    formatter: Arc<dyn ValueFormatter>,
}

impl fmt::Debug for FormatterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterRule")
            .field("patterns", &self.patterns)
            .field("formatter", &self.formatter.name())
            .finish()
    }
}

impl FormatterRule {
    /// Rule applying `formatter` to keys matching any of `patterns`.
    pub fn new<I, P>(patterns: I, formatter: Arc<dyn ValueFormatter>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPattern>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            formatter,
        }
    }

    /// Patterns in declaration order.
    pub fn patterns(&self) -> &[FieldPattern] {
        &self.patterns
    }

    /// Formatter applied on match.
    pub fn formatter(&self) -> &Arc<dyn ValueFormatter> {
        &self.formatter
    }

    /// True when any pattern matches `key`.
    pub fn matches(&self, key: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(key))
    }
}

/// Ordered rule list; declaration order decides the pipeline order.
#[derive(Clone, Debug, Default)]
pub struct FormatterRules {
    rules: Vec<FormatterRule>,
}

impl FormatterRules {
    /// Empty rule list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    pub fn rule<I, P, F>(mut self, patterns: I, formatter: F) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPattern>,
        F: ValueFormatter + 'static,
    {
        self.rules.push(FormatterRule::new(patterns, Arc::new(formatter)));
        self
    }

    /// Append an already-built rule.
    pub fn push(&mut self, rule: FormatterRule) {
        self.rules.push(rule);
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[FormatterRule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rule is declared.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules for OpenImmo exports: prices as currency, areas as whole square meters.
    pub fn openimmo_defaults() -> Self {
        Self::new()
            .rule(["*preis", "*miete", "nebenkosten", "kaution"], PriceFormatter)
            .rule(["*flaeche"], TrimDecimals)
            .rule(["*flaeche"], SquareMeters)
    }
}

/// Formatters of every rule matching `key`, in rule order.
///
/// A rule contributes once even if several of its patterns match. Scanning
/// stops early only when `max_matches` is reached.
pub fn matching_formatters(
    rules: &[FormatterRule],
    key: &str,
    max_matches: Option<usize>,
) -> Vec<Arc<dyn ValueFormatter>> {
    let limit = max_matches.unwrap_or(usize::MAX);
    rules
        .iter()
        .filter(|rule| rule.matches(key))
        .take(limit)
        .map(|rule| Arc::clone(rule.formatter()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::formatters::Suffix;

    fn names(formatters: &[Arc<dyn ValueFormatter>]) -> Vec<&str> {
        formatters.iter().map(|formatter| formatter.name()).collect()
    }

    #[test]
    fn marker_position_does_not_change_matching() {
        for pattern in ["*preis", "preis*", "pr*eis", "*pre*is*"] {
            let parsed = FieldPattern::parse(pattern);
            assert_eq!(parsed, FieldPattern::Contains("preis".into()), "{pattern}");
            assert!(parsed.matches("kaufpreis"));
            assert!(parsed.matches("preis_pro_qm"));
            assert!(!parsed.matches("miete"));
        }
    }

    #[test]
    fn patterns_without_marker_match_exactly() {
        let exact = FieldPattern::parse("kaution");
        assert!(exact.matches("kaution"));
        assert!(!exact.matches("kaution_text"));
    }

    #[test]
    fn all_matching_rules_contribute_in_declaration_order() {
        let rules = FormatterRules::new()
            .rule(["*flaeche"], TrimDecimals)
            .rule(["kaufpreis"], PriceFormatter)
            .rule(["wohn*"], Suffix::new("!"))
            .rule(["*flaeche", "wohnflaeche"], SquareMeters);

        let matched = matching_formatters(rules.rules(), "wohnflaeche", None);
        assert_eq!(names(&matched), ["trim_decimals", "suffix(!)", "square_meters"]);

        let capped = matching_formatters(rules.rules(), "wohnflaeche", Some(2));
        assert_eq!(names(&capped), ["trim_decimals", "suffix(!)"]);

        assert!(matching_formatters(rules.rules(), "anzahl_zimmer", None).is_empty());
    }

    #[test]
    fn duplicate_rules_compose() {
        let rules = FormatterRules::new()
            .rule(["*x"], Suffix::new("!"))
            .rule(["*x"], Suffix::new("!"));
        assert_eq!(matching_formatters(rules.rules(), "box", None).len(), 2);
    }

    #[test]
    fn defaults_cover_prices_and_areas() {
        let rules = FormatterRules::openimmo_defaults();
        assert_eq!(
            names(&matching_formatters(rules.rules(), "kaufpreis", None)),
            ["price"]
        );
        assert_eq!(
            names(&matching_formatters(rules.rules(), "grundstuecksflaeche", None)),
            ["trim_decimals", "square_meters"]
        );
    }
}
