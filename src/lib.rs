#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Binary entry points shared with `src/main.rs`.
pub mod apps;
/// Store locations, switches, and archive layout.
pub mod config;
/// Centralized constants for archive layout, record paths, and formatting.
pub mod constants;
/// Field-tree conversion into labeled, typed fields.
pub mod convert;
/// Record predicates.
pub mod filter;
/// Formatter rules, built-in formatters, and the memoizing resolver.
pub mod format;
/// Label mapping collaborators.
pub mod labels;
/// Parsed records and the typed XML tree.
pub mod record;
/// Ingestion, index, and context over the on-disk store.
pub mod store;
/// Filesystem primitives used by ingestion and indexing.
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Identifier and path helpers.
pub mod utils;

mod errors;

pub use config::{ArchiveLayout, StoreConfig};
pub use convert::{ConvertedField, ConvertedFields, FieldValue, RecordConverter};
pub use errors::StoreError;
pub use filter::{ForRent, ForSale, RecordFilter, UsageType};
pub use format::{FieldPattern, FormatterChain, FormatterResolver, FormatterRules, ValueFormatter};
pub use labels::{LabelFallback, LabelMapper, TextMap};
pub use record::{FieldNode, FieldPath, Record, RecordAction};
pub use store::{ArchiveIngestor, Freshness, IngestReport, StoreContext, StoreIndex};
pub use types::{AssetPath, FieldKey, Label, ObjectId, RelPathString, TokenString};
