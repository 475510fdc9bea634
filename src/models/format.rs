//! ILL format classification

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::record::BibRecord;

/// Classification of a record for inter-library loan purposes.
///
/// Serialized in lowercase so configuration sections (`[ill.formats.ejournal]`)
/// survive the case folding applied by the configuration loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[serde(alias = "EJournal")]
    EJournal,
    #[serde(alias = "Journal")]
    Journal,
    #[serde(alias = "EBook")]
    EBook,
    #[serde(alias = "Book")]
    Book,
    #[serde(alias = "MonoSerial")]
    MonoSerial,
    #[serde(alias = "Article")]
    Article,
    #[serde(alias = "Undefined")]
    Undefined,
}

impl Format {
    pub const ALL: [Format; 7] = [
        Format::EJournal,
        Format::Journal,
        Format::EBook,
        Format::Book,
        Format::MonoSerial,
        Format::Article,
        Format::Undefined,
    ];

    /// Derive the format from the record's capability predicates.
    ///
    /// Articles win over everything else; electronic and print records are
    /// then split into journal-like and book-like classes.
    pub fn classify(record: &dyn BibRecord) -> Self {
        if record.is_article() {
            return Format::Article;
        }

        let journal_like = record.is_journal() || record.is_newspaper();

        if record.is_electronic() {
            if journal_like {
                Format::EJournal
            } else if record.is_ebook() || record.is_book() {
                Format::EBook
            } else {
                Format::Undefined
            }
        } else if journal_like {
            Format::Journal
        } else if record.is_monographic_serial() {
            Format::MonoSerial
        } else if record.is_book() {
            Format::Book
        } else {
            Format::Undefined
        }
    }

    /// Lowercase key used for configuration sections
    pub fn config_key(&self) -> &'static str {
        match self {
            Format::EJournal => "ejournal",
            Format::Journal => "journal",
            Format::EBook => "ebook",
            Format::Book => "book",
            Format::MonoSerial => "monoserial",
            Format::Article => "article",
            Format::Undefined => "undefined",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Format::EJournal => "EJournal",
            Format::Journal => "Journal",
            Format::EBook => "EBook",
            Format::Book => "Book",
            Format::MonoSerial => "MonoSerial",
            Format::Article => "Article",
            Format::Undefined => "Undefined",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::RecordDocument;

    fn record(formats: &[&str]) -> RecordDocument {
        RecordDocument {
            id: "123".to_string(),
            formats: formats.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_print() {
        assert_eq!(Format::classify(&record(&["Book"])), Format::Book);
        assert_eq!(Format::classify(&record(&["Journal"])), Format::Journal);
        assert_eq!(Format::classify(&record(&["Newspaper"])), Format::Journal);
        assert_eq!(
            Format::classify(&record(&["MonographSeries", "Book"])),
            Format::MonoSerial
        );
        assert_eq!(Format::classify(&record(&["Map"])), Format::Undefined);
    }

    #[test]
    fn test_classify_electronic() {
        assert_eq!(
            Format::classify(&record(&["Electronic", "Journal"])),
            Format::EJournal
        );
        assert_eq!(Format::classify(&record(&["eBook"])), Format::EBook);
        assert_eq!(
            Format::classify(&record(&["Electronic", "Book"])),
            Format::EBook
        );
    }

    #[test]
    fn test_article_wins() {
        assert_eq!(
            Format::classify(&record(&["Electronic", "Article", "Journal"])),
            Format::Article
        );
    }

    #[test]
    fn test_deserialize_lowercase_and_camel() {
        let f: Format = serde_json::from_str("\"monoserial\"").unwrap();
        assert_eq!(f, Format::MonoSerial);
        let f: Format = serde_json::from_str("\"EJournal\"").unwrap();
        assert_eq!(f, Format::EJournal);
    }
}
