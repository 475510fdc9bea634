//! Search and holdings models

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured query handed to a [`SearchClient`](crate::services::search::SearchClient)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text (Lucene syntax) clause
    pub query: String,
    /// Filter clauses, each applied as its own filter query
    pub filters: Vec<String>,
    pub limit: usize,
    pub sort: Option<String>,
}

/// One library's copy of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LibraryHolding {
    pub isil: String,
    #[serde(default)]
    pub callnumber: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
}

/// A record returned by the search index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHit {
    pub id: String,
    /// Raw holding field; the same ISIL may occur more than once
    pub holdings: Vec<LibraryHolding>,
}

impl SearchHit {
    /// Whether any of the given libraries holds this record
    pub fn is_held_by(&self, isils: &[String]) -> bool {
        self.holdings.iter().any(|h| isils.contains(&h.isil))
    }
}

/// Result set returned by a search client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResultSet {
    pub total: u64,
    pub records: Vec<SearchHit>,
}

/// Holdings parsed from a result set, keyed by record PPN
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct HoldingsResult {
    pub holdings: IndexMap<String, Vec<LibraryHolding>>,
    /// Number of records with parsed holdings
    pub numppn: usize,
    /// Total hits reported by the search index
    pub numfound: u64,
}

impl HoldingsResult {
    /// PPNs of records held by one of the given libraries, in result order
    pub fn held_by<'a>(&'a self, isils: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        self.holdings
            .iter()
            .filter(|(_, libs)| libs.iter().any(|h| isils.contains(&h.isil)))
            .map(|(ppn, _)| ppn.as_str())
    }

    /// First PPN of the result set, if any
    pub fn first_ppn(&self) -> Option<&str> {
        self.holdings.keys().next().map(String::as_str)
    }
}
