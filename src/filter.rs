//! Record predicates used by `StoreContext::records`.

use crate::constants::record::{USAGE_COMMERCIAL, USAGE_RESIDENTIAL};
use crate::record::Record;

/// Predicate over loaded records.
///
/// Any `Fn(&Record) -> bool` is a filter, so ad-hoc conditions need no type.
pub trait RecordFilter {
    /// True when `record` should be kept.
    fn matches(&self, record: &Record) -> bool;
}

impl<F> RecordFilter for F
where
    F: Fn(&Record) -> bool,
{
    fn matches(&self, record: &Record) -> bool {
        self(record)
    }
}

/// Keeps objects offered for sale.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForSale;

impl RecordFilter for ForSale {
    fn matches(&self, record: &Record) -> bool {
        record.is_for_sale()
    }
}

/// Keeps objects offered for rent or lease.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForRent;

impl RecordFilter for ForRent {
    fn matches(&self, record: &Record) -> bool {
        record.is_for_rent()
    }
}

/// Keeps objects whose usage type `kind` is flagged.
#[derive(Clone, Debug)]
pub struct UsageType(pub String);

impl UsageType {
    /// Residential objects (`WOHNEN`).
    pub fn residential() -> Self {
        Self(USAGE_RESIDENTIAL.to_string())
    }

    /// Commercial objects (`GEWERBE`).
    pub fn commercial() -> Self {
        Self(USAGE_COMMERCIAL.to_string())
    }
}

impl RecordFilter for UsageType {
    fn matches(&self, record: &Record) -> bool {
        record.is_usage_type(&self.0)
    }
}

/// AND of all `filters`; an empty list keeps everything.
pub fn all_match(filters: &[&dyn RecordFilter], record: &Record) -> bool {
    filters.iter().all(|filter| filter.matches(record))
}
