//! Identifier and path helpers shared by ingestion and record accessors.

use crate::types::{AssetPath, ObjectId};

/// Normalize a vendor object number into a store identifier.
///
/// Lowercases and replaces `#` with `-`; surrounding whitespace is dropped.
pub fn normalize_object_id(raw: &str) -> ObjectId {
    raw.trim().to_lowercase().replace('#', "-")
}

/// True when `id` can name a directory directly inside the store.
pub fn is_safe_object_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
}

/// Display path of an attachment: `<store_root>/<id>/<pointer>`.
///
/// Leading dots of `store_root` are stripped so `./extracted` renders as
/// `/extracted`, matching how the store is served.
pub fn asset_display_path(store_root: &str, id: &str, pointer: &str) -> AssetPath {
    format!(
        "{}/{}/{}",
        store_root.trim_start_matches('.'),
        id,
        pointer.trim_start_matches('/')
    )
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    text.as_ref().split_whitespace().collect::<Vec<_>>().join(" ")
}
