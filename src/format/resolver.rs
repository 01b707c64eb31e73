use std::fmt;
use std::sync::{Arc, RwLock};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::formatters::ValueFormatter;
use super::rules::{FormatterRules, matching_formatters};
use crate::types::FieldKey;

/// Ordered formatters resolved for one field key.
///
/// Cloning is cheap; clones share the same formatter list.
#[derive(Clone)]
pub struct FormatterChain {
    formatters: Arc<[Arc<dyn ValueFormatter>]>,
}

impl FormatterChain {
    fn from_vec(formatters: Vec<Arc<dyn ValueFormatter>>) -> Self {
        Self {
            formatters: formatters.into(),
        }
    }

    /// True when no rule matched.
    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }

    /// Number of formatters in the chain.
    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    /// Formatter names in application order.
    pub fn names(&self) -> Vec<&str> {
        self.formatters.iter().map(|formatter| formatter.name()).collect()
    }

    /// Feed `raw` through every formatter, each consuming the previous output.
    /// Stops with `None` as soon as one step cannot render its input.
    pub fn apply(&self, raw: &str) -> Option<String> {
        self.formatters
            .iter()
            .try_fold(raw.to_string(), |value, formatter| formatter.format(&value))
    }
}

impl PartialEq for FormatterChain {
    fn eq(&self, other: &Self) -> bool {
        self.formatters.len() == other.formatters.len()
            && self
                .formatters
                .iter()
                .zip(other.formatters.iter())
                .all(|(left, right)| Arc::ptr_eq(left, right))
    }
}

impl fmt::Debug for FormatterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Memo state behind `FormatterResolver`'s lock.
#[derive(Default)]
struct ResolverCache {
    chains: IndexMap<FieldKey, FormatterChain>,
    unformatted: IndexSet<FieldKey>,
}

/// Resolves and memoizes the formatter chain for each field key.
///
/// The first resolution of a key is stored, empty results included, and every
/// later call returns that stored chain without rescanning the rules. Keys
/// that match no rule are remembered once in the unformatted set, which only
/// serves diagnostics. Rules are fixed at construction, so the memo never needs
/// invalidation; one resolver can be shared by reference across threads.
pub struct FormatterResolver {
    rules: FormatterRules,
    max_matches: Option<usize>,
    cache: RwLock<ResolverCache>,
}

impl fmt::Debug for FormatterResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterResolver")
            .field("rules", &self.rules.len())
            .field("max_matches", &self.max_matches)
            .field("cached_keys", &self.cached_key_count())
            .finish()
    }
}

impl Default for FormatterResolver {
    fn default() -> Self {
        Self::new(FormatterRules::openimmo_defaults())
    }
}

impl FormatterResolver {
    /// Resolver over `rules` without a match cap.
    pub fn new(rules: FormatterRules) -> Self {
        Self {
            rules,
            max_matches: None,
            cache: RwLock::new(ResolverCache::default()),
        }
    }

    /// Stop collecting formatters for a key after `max` matches.
    pub fn with_max_matches(mut self, max: usize) -> Self {
        self.max_matches = Some(max);
        self
    }

    /// Rules this resolver evaluates.
    pub fn rules(&self) -> &FormatterRules {
        &self.rules
    }

    /// Formatter chain for `key`, from the memo table when already resolved.
    pub fn resolve(&self, key: &str) -> FormatterChain {
        {
            let cache = self.cache.read().expect("formatter cache poisoned");
            if let Some(chain) = cache.chains.get(key) {
                return chain.clone();
            }
        }

        let resolved =
            FormatterChain::from_vec(matching_formatters(self.rules.rules(), key, self.max_matches));
        let mut cache = self.cache.write().expect("formatter cache poisoned");
        // Another caller may have resolved the key between the two locks; keep its entry.
        let chain = cache
            .chains
            .entry(key.to_string())
            .or_insert(resolved)
            .clone();
        if chain.is_empty() && cache.unformatted.insert(key.to_string()) {
            debug!(field = key, "no formatter rule matches field");
        }
        chain
    }

    /// Keys that matched no rule, in first-seen order.
    pub fn unformatted_keys(&self) -> Vec<FieldKey> {
        let cache = self.cache.read().expect("formatter cache poisoned");
        cache.unformatted.iter().cloned().collect()
    }

    /// Number of keys with a memoized chain.
    pub fn cached_key_count(&self) -> usize {
        let cache = self.cache.read().expect("formatter cache poisoned");
        cache.chains.len()
    }
}
