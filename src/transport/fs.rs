use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::config::ArchiveLayout;
use crate::constants::archive::BROKEN_PREFIX;
use crate::errors::StoreError;
use crate::types::TokenString;

/// Ordering token parsed from an archive file name.
///
/// The token is split into alternating digit and text runs which compare
/// pairwise: digit runs numerically, text runs as text, a digit run before a
/// text run. All-digit tokens therefore compare as plain numbers, and
/// `20240131b` still sorts before `20240201`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderingToken {
    parts: Vec<TokenPart>,
}

/// One run of an `OrderingToken`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TokenPart {
    /// Digits with leading zeros removed; `width` first so longer numbers sort later.
    Number {
        /// Significant digit count.
        width: usize,
        /// Significant digits.
        digits: String,
    },
    /// Run of non-digit characters.
    Text(TokenString),
}

impl OrderingToken {
    /// Split `token` into runs. Leading `_`/`-` separators are ignored.
    pub fn parse(token: &str) -> Self {
        let mut parts = Vec::new();
        let mut rest = token.trim_start_matches(['_', '-']);
        while let Some(first) = rest.chars().next() {
            let is_digit = first.is_ascii_digit();
            let end = rest
                .find(|ch: char| ch.is_ascii_digit() != is_digit)
                .unwrap_or(rest.len());
            let (run, tail) = rest.split_at(end);
            parts.push(if is_digit {
                let significant = run.trim_start_matches('0');
                TokenPart::Number {
                    width: significant.len(),
                    digits: significant.to_string(),
                }
            } else {
                TokenPart::Text(run.to_string())
            });
            rest = tail;
        }
        Self { parts }
    }

    /// Runs in token order.
    pub fn parts(&self) -> &[TokenPart] {
        &self.parts
    }
}

/// One pending export archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveFile {
    /// Full path of the archive.
    pub path: PathBuf,
    /// File name without the archive suffix; names the staging directory.
    pub stem: String,
    /// Raw ordering token (file name between prefix and suffix).
    pub token: TokenString,
    order: OrderingToken,
}

impl ArchiveFile {
    /// Describe `path` when its file name ends with the layout's suffix.
    pub fn from_path(path: &Path, layout: &ArchiveLayout) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = strip_suffix_ignore_case(name, &layout.suffix)?;
        if stem.is_empty() {
            return None;
        }
        let token = stem.strip_prefix(layout.prefix.as_str()).unwrap_or(stem);
        Some(Self {
            path: path.to_path_buf(),
            stem: stem.to_string(),
            token: token.to_string(),
            order: OrderingToken::parse(token),
        })
    }

    /// Parsed ordering token.
    pub fn ordering(&self) -> &OrderingToken {
        &self.order
    }

    /// Extraction target `<store>/<stem>`.
    pub fn staging_dir(&self, store_dir: &Path) -> PathBuf {
        store_dir.join(&self.stem)
    }

    /// Quarantine target `<store>/_BROKEN__<stem>`.
    pub fn quarantine_dir(&self, store_dir: &Path) -> PathBuf {
        store_dir.join(format!("{BROKEN_PREFIX}{}", self.stem))
    }

    fn cmp_processing_order(&self, other: &Self) -> Ordering {
        self.order
            .cmp(&other.order)
            .then_with(|| self.path.file_name().cmp(&other.path.file_name()))
    }
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (stem, tail) = name.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(stem)
}

/// Archives directly inside `dir`, in processing order.
///
/// Order comes from the file names only; file times are never consulted.
/// A missing directory yields no archives.
pub fn list_archives(dir: &Path, layout: &ArchiveLayout) -> Result<Vec<ArchiveFile>, StoreError> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "archive input directory does not exist");
        return Ok(Vec::new());
    }
    let mut archives = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            StoreError::filesystem("list", path, err.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(archive) = ArchiveFile::from_path(entry.path(), layout) {
            archives.push(archive);
        }
    }
    archives.sort_by(ArchiveFile::cmp_processing_order);
    Ok(archives)
}

/// Unpack `archive` into `target`, creating `target` first.
///
/// Open and decode failures are reported as `ArchiveUnreadable`; the caller
/// owns cleanup of a partially written `target`.
pub fn extract_archive(archive: &Path, target: &Path) -> Result<(), StoreError> {
    let unreadable = |reason: String| StoreError::ArchiveUnreadable {
        path: archive.to_path_buf(),
        reason,
    };
    let file = File::open(archive).map_err(|err| unreadable(err.to_string()))?;
    let mut zip = ZipArchive::new(file).map_err(|err| unreadable(err.to_string()))?;
    fs::create_dir_all(target).map_err(|err| StoreError::filesystem("create", target, err))?;
    zip.extract(target).map_err(|err| unreadable(err.to_string()))?;
    debug!(
        archive = %archive.display(),
        target = %target.display(),
        entries = zip.len(),
        "extracted archive"
    );
    Ok(())
}

/// Remove `path` recursively; returns whether anything was removed.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool, StoreError> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(path).map_err(|err| StoreError::filesystem("remove", path, err))?;
    Ok(true)
}

/// Rename a directory inside the store.
pub fn rename_dir(from: &Path, to: &Path) -> Result<(), StoreError> {
    fs::rename(from, to).map_err(|err| StoreError::filesystem("rename", from, err))
}

/// Delete one file.
pub fn remove_file(path: &Path) -> Result<(), StoreError> {
    fs::remove_file(path).map_err(|err| StoreError::filesystem("remove", path, err))
}

/// Replace `path` with `bytes` via a temporary file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| StoreError::filesystem("create", parent, err))?;
    let mut temp =
        NamedTempFile::new_in(parent).map_err(|err| StoreError::filesystem("create", parent, err))?;
    temp.write_all(bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|err| StoreError::filesystem("write", temp.path(), err))?;
    temp.persist(path)
        .map_err(|err| StoreError::filesystem("persist", path, err.error))?;
    Ok(())
}
