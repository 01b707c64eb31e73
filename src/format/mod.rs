//! Wildcard formatter rules and the memoizing resolver that applies them per field key.

/// Built-in value formatters.
pub mod formatters;
/// Memoized per-key formatter resolution.
pub mod resolver;
/// Rule types and the order-preserving matcher.
pub mod rules;

pub use formatters::{PriceFormatter, SquareMeters, Suffix, TrimDecimals, ValueFormatter};
pub use resolver::{FormatterChain, FormatterResolver};
pub use rules::{FieldPattern, FormatterRule, FormatterRules, matching_formatters};
