use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{ArchiveLayout, StoreConfig};
use crate::constants::archive::RESERVED_DIR_PREFIX;
use crate::constants::index::INDEX_FILENAME;
use crate::constants::messages::{PASS_ABORTED_MSG, QUARANTINE_MSG, SKIP_UNREADABLE_MSG};
use crate::errors::StoreError;
use crate::record::{Record, RecordAction};
use crate::store::index::StoreIndex;
use crate::transport::fs::{
    ArchiveFile, extract_archive, list_archives, remove_dir_if_exists, remove_file, rename_dir,
};
use crate::types::ObjectId;
use crate::utils::is_safe_object_id;

/// Summary of one ingestion pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Identifiers installed or replaced, in processing order.
    pub applied_ids: Vec<ObjectId>,
    /// Identifiers removed by delete actions, in processing order.
    pub deleted_ids: Vec<ObjectId>,
    /// Archives whose extraction was quarantined.
    pub broken_count: usize,
    /// Archives skipped as unreadable or already staged.
    pub skipped_count: usize,
    /// Source archives removed after the pass.
    pub removed_archives: usize,
    /// Entries in the index written at the end of the pass.
    pub indexed_count: usize,
}

/// What happened to a single archive.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ArchiveOutcome {
    AlreadyStaged,
    Unreadable,
    Quarantined,
    Installed(ObjectId),
    Deleted(ObjectId),
}

/// Applies pending export archives to a store directory.
///
/// Archives are processed strictly in ordering-token order so a later export
/// always supersedes an earlier one for the same identifier. Unreadable and
/// broken archives never stop the pass; a failed rename or removal inside the
/// store does. The index is then rebuilt from what the completed archives left
/// in the store and every source archive stays in place.
#[derive(Clone, Debug)]
pub struct ArchiveIngestor {
    layout: ArchiveLayout,
    normalize_ids: bool,
    preserve_archives: bool,
    index_path: Option<PathBuf>,
}

impl Default for ArchiveIngestor {
    fn default() -> Self {
        Self {
            layout: ArchiveLayout::default(),
            normalize_ids: true,
            preserve_archives: false,
            index_path: None,
        }
    }
}

impl ArchiveIngestor {
    /// Ingestor with the default archive layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingestor configured from a store config.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            layout: config.layout.clone(),
            normalize_ids: config.normalize_ids,
            preserve_archives: config.preserve_archives,
            index_path: Some(config.index_path()),
        }
    }

    /// Override the archive naming convention.
    pub fn with_layout(mut self, layout: ArchiveLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Toggle identifier normalization.
    pub fn with_normalize_ids(mut self, normalize: bool) -> Self {
        self.normalize_ids = normalize;
        self
    }

    /// Keep source archives after the pass.
    pub fn with_preserve_archives(mut self, preserve: bool) -> Self {
        self.preserve_archives = preserve;
        self
    }

    /// Write the index somewhere other than `<input_dir>/object_index.json`.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Archives waiting in `input_dir`, in processing order.
    pub fn pending(&self, input_dir: &Path) -> Result<Vec<ArchiveFile>, StoreError> {
        list_archives(input_dir, &self.layout)
    }

    /// Run one pass over `input_dir`, rebuild and persist the index, then
    /// remove the consumed archives.
    pub fn run(&self, input_dir: &Path, store_dir: &Path) -> Result<IngestReport, StoreError> {
        fs::create_dir_all(store_dir)
            .map_err(|err| StoreError::filesystem("create", store_dir, err))?;
        let archives = self.pending(input_dir)?;
        debug!(
            input = %input_dir.display(),
            store = %store_dir.display(),
            pending = archives.len(),
            "starting ingestion pass"
        );

        let mut report = IngestReport::default();
        let consumed = match self.apply_archives(&archives, store_dir, &mut report) {
            Ok(consumed) => consumed,
            Err(err) => {
                warn!(error = %err, "{}", PASS_ABORTED_MSG);
                if let Err(reindex_err) = self.reindex(input_dir, store_dir) {
                    warn!(error = %reindex_err, "could not reindex after aborted pass");
                }
                return Err(err);
            }
        };

        report.indexed_count = self.reindex(input_dir, store_dir)?.len();

        if !self.preserve_archives {
            for path in consumed {
                remove_file(path)?;
                report.removed_archives += 1;
            }
        }

        info!(
            applied = report.applied_ids.len(),
            deleted = report.deleted_ids.len(),
            broken = report.broken_count,
            skipped = report.skipped_count,
            indexed = report.indexed_count,
            "ingestion pass finished"
        );
        Ok(report)
    }

    /// Apply archives in order; returns the archives whose effect landed in the store.
    fn apply_archives<'a>(
        &self,
        archives: &'a [ArchiveFile],
        store_dir: &Path,
        report: &mut IngestReport,
    ) -> Result<Vec<&'a Path>, StoreError> {
        let mut consumed = Vec::new();
        for archive in archives {
            match self.ingest_archive(archive, store_dir)? {
                ArchiveOutcome::AlreadyStaged | ArchiveOutcome::Unreadable => {
                    report.skipped_count += 1;
                }
                ArchiveOutcome::Quarantined => report.broken_count += 1,
                ArchiveOutcome::Installed(id) => {
                    report.applied_ids.push(id);
                    consumed.push(archive.path.as_path());
                }
                ArchiveOutcome::Deleted(id) => {
                    report.deleted_ids.push(id);
                    consumed.push(archive.path.as_path());
                }
            }
        }
        Ok(consumed)
    }

    /// Rescan the store and persist the result as the index.
    fn reindex(&self, input_dir: &Path, store_dir: &Path) -> Result<StoreIndex, StoreError> {
        let index = StoreIndex::rebuild_from_directory_scan(store_dir, &self.layout)?;
        index.persist(&self.resolved_index_path(input_dir))?;
        Ok(index)
    }

    fn resolved_index_path(&self, input_dir: &Path) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| input_dir.join(INDEX_FILENAME))
    }

    fn ingest_archive(
        &self,
        archive: &ArchiveFile,
        store_dir: &Path,
    ) -> Result<ArchiveOutcome, StoreError> {
        let staging = archive.staging_dir(store_dir);
        if staging.exists() {
            debug!(
                archive = %archive.path.display(),
                staging = %staging.display(),
                "archive already staged; skipping"
            );
            return Ok(ArchiveOutcome::AlreadyStaged);
        }

        match extract_archive(&archive.path, &staging) {
            Ok(()) => {}
            Err(err @ StoreError::ArchiveUnreadable { .. }) => {
                warn!(archive = %archive.path.display(), error = %err, "{}", SKIP_UNREADABLE_MSG);
                remove_dir_if_exists(&staging)?;
                return Ok(ArchiveOutcome::Unreadable);
            }
            Err(err) => return Err(err),
        }

        let (id, action) = match self.read_marker(&staging) {
            Ok(resolved) => resolved,
            Err(err) if err.is_quarantinable() => {
                let broken = archive.quarantine_dir(store_dir);
                remove_dir_if_exists(&broken)?;
                rename_dir(&staging, &broken)?;
                warn!(
                    archive = %archive.path.display(),
                    quarantine = %broken.display(),
                    error = %err,
                    "{}",
                    QUARANTINE_MSG
                );
                return Ok(ArchiveOutcome::Quarantined);
            }
            Err(err) => return Err(err),
        };

        let target = store_dir.join(&id);
        if remove_dir_if_exists(&target)? {
            debug!(id = %id, "removed superseded object directory");
        }

        match action {
            RecordAction::Delete => {
                remove_dir_if_exists(&staging)?;
                info!(id = %id, archive = %archive.path.display(), "deleted object");
                Ok(ArchiveOutcome::Deleted(id))
            }
            RecordAction::Upsert => {
                rename_dir(&staging, &target)?;
                info!(id = %id, archive = %archive.path.display(), "installed object");
                Ok(ArchiveOutcome::Installed(id))
            }
        }
    }

    /// Identifier and action of the staged marker record.
    ///
    /// Every failure here is quarantinable: missing marker, unreadable or
    /// malformed XML, and missing or unusable identifiers.
    fn read_marker(&self, staging: &Path) -> Result<(ObjectId, RecordAction), StoreError> {
        let marker = staging.join(&self.layout.marker_file);
        if !marker.is_file() {
            return Err(StoreError::MarkerMissing {
                path: staging.to_path_buf(),
            });
        }
        let malformed = |details: String| StoreError::MalformedRecord {
            path: marker.clone(),
            details,
        };
        let record = match Record::open(&marker) {
            Ok(record) => record.with_id_normalization(self.normalize_ids),
            Err(StoreError::Io(err)) => return Err(malformed(err.to_string())),
            Err(err) => return Err(err),
        };
        let id = record
            .id()
            .ok_or_else(|| malformed("missing object identifier".into()))?;
        if !is_safe_object_id(&id) || self.is_reserved_name(&id) {
            return Err(malformed(format!("unusable object identifier '{id}'")));
        }
        Ok((id, record.action()))
    }

    /// Names the index scan would skip cannot be used as identifiers.
    fn is_reserved_name(&self, id: &str) -> bool {
        id.starts_with(RESERVED_DIR_PREFIX)
            || (!self.layout.prefix.is_empty() && id.starts_with(self.layout.prefix.as_str()))
    }
}
