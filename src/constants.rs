/// Constants describing the vendor archive layout.
pub mod archive {
    /// File name prefix that precedes the ordering token (`openimmo<token>.zip`).
    pub const ARCHIVE_PREFIX: &str = "openimmo";
    /// File name suffix of pending archives.
    pub const ARCHIVE_SUFFIX: &str = ".zip";
    /// Marker record expected at the root of every extracted archive.
    pub const MARKER_FILE: &str = "openimmo.xml";
    /// Prefix given to quarantined extraction directories.
    pub const BROKEN_PREFIX: &str = "_BROKEN__";
    /// Leading character reserved for non-record directories inside the store.
    pub const RESERVED_DIR_PREFIX: char = '_';
    /// Default store directory name under the base directory.
    pub const DEFAULT_EXTRACT_DIR: &str = "extracted";
}

/// Constants used by the persisted store index.
pub mod index {
    /// Default index file name under the base directory.
    pub const INDEX_FILENAME: &str = "object_index.json";
}

/// Constants naming fields of the OpenImmo record tree.
pub mod record {
    /// Path from the document root to the object node.
    pub const OBJECT_PATH: &[&str] = &["anbieter", "immobilie"];
    /// Administrative section carrying identifier and action.
    pub const ADMIN_SECTION: &str = "verwaltung_techn";
    /// Vendor-assigned external object number.
    pub const EXTERNAL_ID_FIELD: &str = "objektnr_extern";
    /// Node that carries the action flag.
    pub const ACTION_NODE: &str = "aktion";
    /// Attribute (or child element) holding the action kind.
    pub const ACTION_KIND: &str = "aktionart";
    /// Action value that removes an object from the store.
    pub const DELETE_ACTION: &str = "DELETE";
    /// Date of the last vendor-side modification.
    pub const MODIFIED_ON_FIELD: &str = "stand_vom";
    /// Textual boolean `true` as written by the vendor export.
    pub const BOOL_TRUE: &str = "true";
    /// Textual boolean `false` as written by the vendor export.
    pub const BOOL_FALSE: &str = "false";
    /// Marketing type value for objects offered for sale.
    pub const MARKETING_SALE: &str = "KAUF";
    /// Marketing type value for objects offered for rent or lease.
    pub const MARKETING_RENT: &str = "MIETE_PACHT";
    /// Usage type value for residential objects.
    pub const USAGE_RESIDENTIAL: &str = "WOHNEN";
    /// Usage type value for commercial objects.
    pub const USAGE_COMMERCIAL: &str = "GEWERBE";
    /// Attachment group holding the title image.
    pub const TITLE_IMAGE_GROUP: &str = "TITELBILD";
    /// Feature flags surfaced as highlights, in display order.
    pub const HIGHLIGHT_FEATURES: &[&str] =
        &["kamin", "sauna", "barrierefrei", "swimmingpool", "wintergarten"];
}

/// Constants used by the formatter rule language.
pub mod format {
    /// Marker that turns a pattern into a substring rule.
    pub const WILDCARD_MARKER: char = '*';
    /// Currency suffix appended by the price formatter.
    pub const CURRENCY_SUFFIX: &str = " €";
    /// Unit suffix appended by the square-meter formatter.
    pub const AREA_SUFFIX: &str = " m²";
}

/// Environment variables read by `StoreConfig::from_env`.
pub mod env {
    /// Directory holding pending archives and the index file.
    pub const BASE_DIR: &str = "OPENIMMO_BASE_DIR";
    /// Optional store directory override.
    pub const EXTRACT_DIR: &str = "OPENIMMO_EXTRACT_DIR";
    /// Keep source archives after ingestion when set to a truthy value.
    pub const PRESERVE_ARCHIVES: &str = "OPENIMMO_PRESERVE_ARCHIVES";
    /// Run an ingestion pass whenever a context is opened.
    pub const AUTO_UPDATE: &str = "OPENIMMO_AUTO_UPDATE";
}

/// Shared log messages for ingestion outcomes.
pub mod messages {
    /// Logged when an archive cannot be opened or decoded.
    pub const SKIP_UNREADABLE_MSG: &str = "skipping unreadable archive";
    /// Logged when an extraction is moved to quarantine.
    pub const QUARANTINE_MSG: &str = "quarantined archive extraction";
    /// Logged when a persisted index cannot be decoded.
    pub const INDEX_CORRUPT_MSG: &str = "persisted store index is corrupt; rebuilding";
    /// Logged when a store-consistency failure stops an ingestion pass.
    pub const PASS_ABORTED_MSG: &str = "ingestion pass aborted; reindexing completed archives";
}
