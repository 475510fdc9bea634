//! Record capability facade consumed by the eligibility engine

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Capabilities of a bibliographic record the engine relies on.
///
/// Optional fields have default implementations reporting "absent", so a
/// record source that cannot provide them needs no extra code.
pub trait BibRecord: Send + Sync {
    /// Public record identifier (PPN)
    fn ppn(&self) -> &str;

    /// Cataloguing network the record originates from
    fn network(&self) -> Option<&str>;

    fn is_electronic(&self) -> bool;
    fn is_journal(&self) -> bool;
    fn is_newspaper(&self) -> bool;
    fn is_ebook(&self) -> bool;
    fn is_monographic_serial(&self) -> bool;
    fn is_book(&self) -> bool;
    fn is_article(&self) -> bool;
    fn is_serial(&self) -> bool;
    fn is_collection(&self) -> bool;
    fn is_free(&self) -> bool;

    /// Whether one of the caller's libraries already holds a copy
    fn has_local_holdings(&self) -> bool;

    fn clean_isbn(&self) -> Option<String>;
    fn clean_issn(&self) -> Option<String>;
    fn publication_dates(&self) -> &[String];
    fn title(&self) -> Option<&str>;
    fn primary_author(&self) -> Option<&str>;

    fn zdb_id(&self) -> Option<&str> {
        None
    }

    /// PPNs of parallel editions (print/online counterparts)
    fn related_editions(&self) -> &[String] {
        &[]
    }

    /// ILL indicator codes of the local holdings
    fn holding_indicators(&self) -> &[String] {
        &[]
    }
}

/// Record as delivered by the catalogue front end (search index document).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(default)]
pub struct RecordDocument {
    #[validate(length(min = 1, message = "record id must not be empty"))]
    pub id: String,
    pub network: Option<String>,
    /// Format facet values, e.g. `Book`, `Journal`, `Electronic`, `Article`
    pub formats: Vec<String>,
    pub free: bool,
    pub local_holdings: bool,
    pub isbn: Vec<String>,
    pub issn: Vec<String>,
    pub publication_dates: Vec<String>,
    pub title: Option<String>,
    pub primary_author: Option<String>,
    pub zdb_id: Option<String>,
    pub related_editions: Vec<String>,
    pub holding_indicators: Vec<String>,
}

impl RecordDocument {
    fn has_format(&self, candidates: &[&str]) -> bool {
        self.formats
            .iter()
            .any(|f| candidates.iter().any(|c| f.eq_ignore_ascii_case(c)))
    }
}

impl BibRecord for RecordDocument {
    fn ppn(&self) -> &str {
        &self.id
    }

    fn network(&self) -> Option<&str> {
        self.network.as_deref().filter(|n| !n.is_empty())
    }

    fn is_electronic(&self) -> bool {
        self.has_format(&["Electronic", "Online", "eBook", "eJournal"])
    }

    fn is_journal(&self) -> bool {
        self.has_format(&["Journal", "eJournal"])
    }

    fn is_newspaper(&self) -> bool {
        self.has_format(&["Newspaper"])
    }

    fn is_ebook(&self) -> bool {
        self.has_format(&["eBook"])
    }

    fn is_monographic_serial(&self) -> bool {
        self.has_format(&["MonographSeries", "MonoSerial"])
    }

    fn is_book(&self) -> bool {
        self.has_format(&["Book", "eBook"])
    }

    fn is_article(&self) -> bool {
        self.has_format(&["Article"])
    }

    fn is_serial(&self) -> bool {
        self.has_format(&[
            "Serial",
            "Journal",
            "eJournal",
            "Newspaper",
            "MonographSeries",
            "MonoSerial",
        ])
    }

    fn is_collection(&self) -> bool {
        self.has_format(&["Collection"])
    }

    fn is_free(&self) -> bool {
        self.free
    }

    fn has_local_holdings(&self) -> bool {
        self.local_holdings
    }

    fn clean_isbn(&self) -> Option<String> {
        // Prefer an ISBN-13, fall back to the first usable ISBN-10
        let cleaned: Vec<String> = self.isbn.iter().map(|i| normalize_standard_number(i)).collect();
        cleaned
            .iter()
            .find(|i| i.len() == 13)
            .or_else(|| cleaned.iter().find(|i| i.len() == 10))
            .cloned()
    }

    fn clean_issn(&self) -> Option<String> {
        self.issn
            .iter()
            .map(|i| normalize_standard_number(i))
            .find(|i| i.len() == 8)
    }

    fn publication_dates(&self) -> &[String] {
        &self.publication_dates
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn primary_author(&self) -> Option<&str> {
        self.primary_author.as_deref()
    }

    fn zdb_id(&self) -> Option<&str> {
        self.zdb_id.as_deref().filter(|z| !z.is_empty())
    }

    fn related_editions(&self) -> &[String] {
        &self.related_editions
    }

    fn holding_indicators(&self) -> &[String] {
        &self.holding_indicators
    }
}

static NON_IDENTIFIER_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9X]").expect("valid identifier regex"));

/// Normalize an ISBN/ISSN: keep digits and the `X` check character
pub fn normalize_standard_number(value: &str) -> String {
    NON_IDENTIFIER_CHARS
        .replace_all(&value.to_uppercase(), "")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_standard_number() {
        assert_eq!(normalize_standard_number("978-3-16-148410-0"), "9783161484100");
        assert_eq!(normalize_standard_number("1234-567x"), "1234567X");
        assert_eq!(normalize_standard_number("ISSN 0028-0836 (print)"), "00280836");
    }

    #[test]
    fn test_clean_isbn_prefers_isbn13() {
        let record = RecordDocument {
            id: "1".into(),
            isbn: vec!["3-16-148410-X".into(), "978-3-16-148410-0 (pbk.)".into()],
            ..Default::default()
        };
        assert_eq!(record.clean_isbn(), Some("9783161484100".to_string()));
    }

    #[test]
    fn test_clean_issn_skips_garbage() {
        let record = RecordDocument {
            id: "1".into(),
            issn: vec!["n/a".into(), "0028-0836".into()],
            ..Default::default()
        };
        assert_eq!(record.clean_issn(), Some("00280836".to_string()));
    }

    #[test]
    fn test_optional_fields_absent() {
        let record = RecordDocument {
            id: "1".into(),
            zdb_id: Some(String::new()),
            ..Default::default()
        };
        assert!(record.zdb_id().is_none());
        assert!(record.related_editions().is_empty());
        assert!(record.holding_indicators().is_empty());
        assert!(record.network().is_none());
    }

    #[test]
    fn test_format_predicates_case_insensitive() {
        let record = RecordDocument {
            id: "1".into(),
            formats: vec!["journal".into(), "ELECTRONIC".into()],
            ..Default::default()
        };
        assert!(record.is_journal());
        assert!(record.is_electronic());
        assert!(record.is_serial());
        assert!(!record.is_book());
    }
}
