use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for ingestion, index persistence, and record loading failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A rename or removal inside the store failed; store/index coherence is no
    /// longer guaranteed and the run must stop.
    #[error("filesystem {action} failed for '{}': {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("archive '{}' could not be read: {reason}", path.display())]
    ArchiveUnreadable { path: PathBuf, reason: String },
    #[error("archive extraction '{}' has no marker record", path.display())]
    MarkerMissing { path: PathBuf },
    #[error("record '{}' is malformed: {details}", path.display())]
    MalformedRecord { path: PathBuf, details: String },
    #[error("store index '{}' is corrupt: {details}", path.display())]
    IndexCorrupt { path: PathBuf, details: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Wrap an io error raised while mutating the store layout.
    pub(crate) fn filesystem(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }

    /// True for per-archive problems that route the archive to quarantine.
    pub fn is_quarantinable(&self) -> bool {
        matches!(
            self,
            StoreError::MarkerMissing { .. } | StoreError::MalformedRecord { .. }
        )
    }
}
