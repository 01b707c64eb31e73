//! On-disk store: archive ingestion, the persisted identifier index, and the
//! context object that ties both to record loading.

/// Read-side context over one store.
pub mod context;
/// Identifier → record path index.
pub mod index;
/// Archive ingestion pass.
pub mod ingest;

pub use context::StoreContext;
pub use index::{Freshness, StoreIndex};
pub use ingest::{ArchiveIngestor, IngestReport};
