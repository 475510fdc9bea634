//! Data models for the ILL eligibility service

pub mod format;
pub mod holdings;
pub mod record;

// Re-export commonly used types
pub use format::Format;
pub use holdings::{HoldingsResult, LibraryHolding, SearchHit, SearchQuery, SearchResultSet};
pub use record::{normalize_standard_number, BibRecord, RecordDocument};
