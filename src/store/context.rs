use std::borrow::Cow;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::convert::RecordConverter;
use crate::errors::StoreError;
use crate::filter::{RecordFilter, all_match};
use crate::format::FormatterResolver;
use crate::labels::LabelMapper;
use crate::record::{Category, Location, Record};
use crate::store::index::{Freshness, StoreIndex};
use crate::store::ingest::{ArchiveIngestor, IngestReport};
use crate::types::ObjectId;

/// Everything needed to read one store: config, collaborators, index, and the
/// optionally loaded record set.
///
/// Construct one per store and pass it where records are needed.
pub struct StoreContext {
    config: StoreConfig,
    labels: Arc<dyn LabelMapper>,
    formatters: FormatterResolver,
    ingestor: ArchiveIngestor,
    index: StoreIndex,
    records: Option<IndexMap<ObjectId, Record>>,
}

impl StoreContext {
    /// Open the store described by `config`.
    ///
    /// Runs an ingestion pass first when `auto_update` is set, then opens the
    /// index (rebuilding it when absent or stale).
    pub fn open(config: StoreConfig, labels: impl LabelMapper + 'static) -> Result<Self, StoreError> {
        config.validate()?;
        let ingestor = ArchiveIngestor::from_config(&config);
        if config.auto_update {
            ingestor.run(&config.base_dir, &config.store_dir())?;
        }
        let index = StoreIndex::open(
            &config.store_dir(),
            &config.index_path(),
            &config.layout,
            Freshness::UsePersisted,
        )?;
        debug!(
            store = %config.store_dir().display(),
            objects = index.len(),
            "opened store context"
        );
        Ok(Self {
            config,
            labels: Arc::new(labels),
            formatters: FormatterResolver::default(),
            ingestor,
            index,
            records: None,
        })
    }

    /// Replace the formatter resolver (default: `FormatterRules::openimmo_defaults`).
    pub fn with_formatters(mut self, formatters: FormatterResolver) -> Self {
        self.formatters = formatters;
        self
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Identifier index as of the last open or update.
    pub fn index(&self) -> &StoreIndex {
        &self.index
    }

    /// Label mapper used by `converter`.
    pub fn labels(&self) -> &dyn LabelMapper {
        self.labels.as_ref()
    }

    /// Formatter resolver used by `converter`.
    pub fn formatters(&self) -> &FormatterResolver {
        &self.formatters
    }

    /// Converter bound to this context's label mapper and resolver.
    pub fn converter(&self) -> RecordConverter<'_> {
        RecordConverter::new(self.labels.as_ref(), &self.formatters)
    }

    /// Run an ingestion pass and reopen the index it wrote.
    ///
    /// A previously loaded record set is dropped and reloaded on next use.
    pub fn update_store(&mut self) -> Result<IngestReport, StoreError> {
        let report = self
            .ingestor
            .run(&self.config.base_dir, &self.config.store_dir())?;
        self.index = StoreIndex::open(
            &self.config.store_dir(),
            &self.config.index_path(),
            &self.config.layout,
            Freshness::UsePersisted,
        )?;
        self.records = None;
        Ok(report)
    }

    /// True when no archives are waiting in the base directory.
    pub fn is_up_to_date(&self) -> Result<bool, StoreError> {
        Ok(self.ingestor.pending(&self.config.base_dir)?.is_empty())
    }

    /// Parse every indexed record into memory; returns how many loaded.
    ///
    /// A record that fails to parse is logged and left out.
    pub fn load_records(&mut self) -> Result<usize, StoreError> {
        let mut records = IndexMap::with_capacity(self.index.len());
        for id in self.index.ids() {
            let Some(path) = self.index.lookup(id) else {
                continue;
            };
            match Record::open(&path) {
                Ok(record) => {
                    records.insert(
                        id.to_string(),
                        record.with_id_normalization(self.config.normalize_ids),
                    );
                }
                Err(err) => {
                    warn!(id, path = %path.display(), error = %err, "skipping unreadable record");
                }
            }
        }
        let loaded = records.len();
        info!(loaded, indexed = self.index.len(), "loaded store records");
        self.records = Some(records);
        Ok(loaded)
    }

    fn loaded(&mut self) -> Result<&IndexMap<ObjectId, Record>, StoreError> {
        if self.records.is_none() {
            self.load_records()?;
        }
        Ok(&*self.records.get_or_insert_with(IndexMap::new))
    }

    /// Loaded records (loading on first use) that pass every filter.
    pub fn records(&mut self, filters: &[&dyn RecordFilter]) -> Result<Vec<&Record>, StoreError> {
        Ok(self
            .loaded()?
            .values()
            .filter(|record| all_match(filters, record))
            .collect())
    }

    /// One record: from the loaded set when present, otherwise parsed through the index.
    pub fn record(&self, id: &str) -> Result<Option<Cow<'_, Record>>, StoreError> {
        if let Some(records) = &self.records {
            return Ok(records.get(id).map(Cow::Borrowed));
        }
        let Some(path) = self.index.lookup(id) else {
            return Ok(None);
        };
        let record = Record::open(&path)?.with_id_normalization(self.config.normalize_ids);
        Ok(Some(Cow::Owned(record)))
    }

    /// Categories across all loaded records, keyed by category name.
    pub fn unique_categories(&mut self) -> Result<IndexMap<String, Category>, StoreError> {
        let labels = Arc::clone(&self.labels);
        let mut categories = IndexMap::new();
        for record in self.loaded()?.values() {
            categories.extend(record.categories(labels.as_ref()));
        }
        Ok(categories)
    }

    /// Location of every loaded record, in index order.
    pub fn locations(&mut self) -> Result<Vec<Location>, StoreError> {
        Ok(self.loaded()?.values().map(Record::location).collect())
    }

    /// Locations deduplicated by `key`; the last record with a given key wins.
    pub fn locations_by<F>(&mut self, key: F) -> Result<IndexMap<String, Location>, StoreError>
    where
        F: Fn(&Location) -> Option<String>,
    {
        let mut unique = IndexMap::new();
        for location in self.locations()? {
            if let Some(key) = key(&location) {
                unique.insert(key, location);
            }
        }
        Ok(unique)
    }

    /// Record following `id` in index order.
    pub fn next_of(&mut self, id: &str) -> Result<Option<&Record>, StoreError> {
        let records = self.loaded()?;
        Ok(records
            .get_index_of(id)
            .and_then(|pos| records.get_index(pos + 1))
            .map(|(_, record)| record))
    }

    /// Record preceding `id` in index order.
    pub fn prev_of(&mut self, id: &str) -> Result<Option<&Record>, StoreError> {
        let records = self.loaded()?;
        Ok(records
            .get_index_of(id)
            .and_then(|pos| pos.checked_sub(1))
            .and_then(|pos| records.get_index(pos))
            .map(|(_, record)| record))
    }
}
