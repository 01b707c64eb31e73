use std::env;
use std::path::{Path, PathBuf};

use crate::constants::archive::{ARCHIVE_PREFIX, ARCHIVE_SUFFIX, DEFAULT_EXTRACT_DIR, MARKER_FILE};
use crate::constants::env as env_keys;
use crate::constants::index::INDEX_FILENAME;
use crate::errors::StoreError;

/// Locations and switches for one store.
///
/// `base_dir` receives the vendor archives and holds the index file; the store
/// itself lives in `extract_dir` (defaults to `<base_dir>/extracted`).
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory scanned for pending archives.
    pub base_dir: PathBuf,
    /// Store directory override; `None` uses `<base_dir>/extracted`.
    pub extract_dir: Option<PathBuf>,
    /// Index file override; `None` uses `<base_dir>/object_index.json`.
    pub index_path: Option<PathBuf>,
    /// Keep source archives after a successful pass (repeatable test runs).
    pub preserve_archives: bool,
    /// Normalize identifiers (lowercase, `#` replaced by `-`).
    pub normalize_ids: bool,
    /// Run an ingestion pass when a `StoreContext` is opened.
    pub auto_update: bool,
    /// Archive naming and marker layout.
    pub layout: ArchiveLayout,
}

/// Naming convention of vendor archives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveLayout {
    /// Fixed file name prefix in front of the ordering token.
    pub prefix: String,
    /// Fixed file name suffix after the ordering token.
    pub suffix: String,
    /// Marker record path relative to the extraction root.
    pub marker_file: String,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            prefix: ARCHIVE_PREFIX.to_string(),
            suffix: ARCHIVE_SUFFIX.to_string(),
            marker_file: MARKER_FILE.to_string(),
        }
    }
}

impl StoreConfig {
    /// Config rooted at `base_dir` with defaults for everything else.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extract_dir: None,
            index_path: None,
            preserve_archives: false,
            normalize_ids: true,
            auto_update: false,
            layout: ArchiveLayout::default(),
        }
    }

    /// Build a config from `OPENIMMO_*` environment variables.
    pub fn from_env() -> Result<Self, StoreError> {
        let base_dir = env::var_os(env_keys::BASE_DIR).ok_or_else(|| {
            StoreError::Configuration(format!("{} is not set", env_keys::BASE_DIR))
        })?;
        let mut config = Self::new(base_dir);
        if let Some(dir) = env::var_os(env_keys::EXTRACT_DIR) {
            config.extract_dir = Some(dir.into());
        }
        config.preserve_archives = env_flag(env_keys::PRESERVE_ARCHIVES)?;
        config.auto_update = env_flag(env_keys::AUTO_UPDATE)?;
        Ok(config)
    }

    /// Use a store directory other than `<base_dir>/extracted`.
    pub fn with_extract_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extract_dir = Some(dir.into());
        self
    }

    /// Use an index file other than `<base_dir>/object_index.json`.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Keep archives in place after ingestion.
    pub fn with_preserve_archives(mut self, preserve: bool) -> Self {
        self.preserve_archives = preserve;
        self
    }

    /// Toggle identifier normalization.
    pub fn with_normalize_ids(mut self, normalize: bool) -> Self {
        self.normalize_ids = normalize;
        self
    }

    /// Toggle the ingestion pass performed by `StoreContext::open`.
    pub fn with_auto_update(mut self, auto_update: bool) -> Self {
        self.auto_update = auto_update;
        self
    }

    /// Override the archive naming convention.
    pub fn with_layout(mut self, layout: ArchiveLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Resolved store directory.
    pub fn store_dir(&self) -> PathBuf {
        self.extract_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join(DEFAULT_EXTRACT_DIR))
    }

    /// Resolved index file path.
    pub fn index_path(&self) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| self.base_dir.join(INDEX_FILENAME))
    }

    /// Reject layouts that cannot name archives or markers.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.layout.suffix.is_empty() {
            return Err(StoreError::Configuration(
                "archive suffix must not be empty".into(),
            ));
        }
        if self.layout.marker_file.is_empty() || Path::new(&self.layout.marker_file).is_absolute()
        {
            return Err(StoreError::Configuration(format!(
                "marker file '{}' must be a non-empty relative path",
                self.layout.marker_file
            )));
        }
        if self.base_dir.as_os_str().is_empty() {
            return Err(StoreError::Configuration("base dir must not be empty".into()));
        }
        Ok(())
    }
}

fn env_flag(key: &str) -> Result<bool, StoreError> {
    match env::var(key) {
        Ok(value) => parse_flag(&value).ok_or_else(|| {
            StoreError::Configuration(format!("{key} has unsupported value '{value}'"))
        }),
        Err(env::VarError::NotPresent) => Ok(false),
        Err(env::VarError::NotUnicode(_)) => Err(StoreError::Configuration(format!(
            "{key} is not valid unicode"
        ))),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_under_base_dir() {
        let config = StoreConfig::new("/srv/immo");
        assert_eq!(config.store_dir(), PathBuf::from("/srv/immo/extracted"));
        assert_eq!(
            config.index_path(),
            PathBuf::from("/srv/immo/object_index.json")
        );
        assert!(config.normalize_ids);
        assert!(!config.preserve_archives);
        config.validate().unwrap();
    }

    #[test]
    fn overrides_take_precedence() {
        let config = StoreConfig::new("/srv/immo")
            .with_extract_dir("/var/store")
            .with_index_path("/var/index.json")
            .with_preserve_archives(true);
        assert_eq!(config.store_dir(), PathBuf::from("/var/store"));
        assert_eq!(config.index_path(), PathBuf::from("/var/index.json"));
        assert!(config.preserve_archives);
    }

    #[test]
    fn validate_rejects_bad_layouts() {
        let layout = ArchiveLayout {
            suffix: String::new(),
            ..ArchiveLayout::default()
        };
        let err = StoreConfig::new("/srv").with_layout(layout).validate().unwrap_err();
        assert!(matches!(err, StoreError::Configuration(msg) if msg.contains("suffix")));

        let layout = ArchiveLayout {
            marker_file: "/abs/openimmo.xml".into(),
            ..ArchiveLayout::default()
        };
        let err = StoreConfig::new("/srv").with_layout(layout).validate().unwrap_err();
        assert!(matches!(err, StoreError::Configuration(msg) if msg.contains("marker")));
    }

    #[test]
    fn flags_parse_common_spellings() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
