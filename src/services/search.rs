//! Search index client
//!
//! The eligibility engine only sees the [`SearchClient`] trait. The Solr
//! implementation talks to the `select` handler of one core per search profile.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::{
    config::SearchConfig,
    error::{AppError, AppResult},
    models::{LibraryHolding, SearchHit, SearchQuery, SearchResultSet},
};

/// Executes structured queries against a bibliographic search index
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, profile: &str, query: &SearchQuery) -> AppResult<SearchResultSet>;
}

#[derive(Clone)]
pub struct SolrSearchClient {
    http: reqwest::Client,
    base_url: String,
    holdings_field: String,
}

impl SolrSearchClient {
    pub fn new(config: &SearchConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            holdings_field: config.holdings_field.clone(),
        })
    }

    fn select_url(&self, profile: &str) -> String {
        format!("{}/{}/select", self.base_url, profile)
    }

    fn query_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.query.clone()),
            ("rows", query.limit.to_string()),
            ("wt", "json".to_string()),
        ];
        params.extend(query.filters.iter().map(|f| ("fq", f.clone())));
        if let Some(ref sort) = query.sort {
            // Solr expects an explicit direction; "relevance" is its default order
            if sort != "relevance" {
                params.push(("sort", sort.clone()));
            }
        }
        params
    }
}

#[async_trait]
impl SearchClient for SolrSearchClient {
    async fn search(&self, profile: &str, query: &SearchQuery) -> AppResult<SearchResultSet> {
        let url = self.select_url(profile);
        tracing::debug!("Solr request {} q={} fq={:?}", url, query.query, query.filters);

        let response = self
            .http
            .get(&url)
            .query(&Self::query_params(query))
            .send()
            .await?
            .error_for_status()?;

        let body: SolrResponse = response.json().await?;
        Ok(body.into_result_set(&self.holdings_field))
    }
}

#[derive(Debug, Deserialize)]
struct SolrResponse {
    response: SolrResponseBody,
}

#[derive(Debug, Deserialize)]
struct SolrResponseBody {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<Map<String, Value>>,
}

impl SolrResponse {
    fn into_result_set(self, holdings_field: &str) -> SearchResultSet {
        let records = self
            .response
            .docs
            .into_iter()
            .filter_map(|doc| {
                let id = match doc.get("id")? {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                let holdings = doc
                    .get(holdings_field)
                    .map(parse_holding_field)
                    .unwrap_or_default();
                Some(SearchHit { id, holdings })
            })
            .collect();

        SearchResultSet {
            total: self.response.num_found,
            records,
        }
    }
}

/// Parse the holding field: a list of objects, or of JSON strings encoding them
fn parse_holding_field(value: &Value) -> Vec<LibraryHolding> {
    let entries = match value {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        other => vec![other],
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let parsed = match entry {
                Value::String(raw) => serde_json::from_str::<LibraryHolding>(raw),
                other => serde_json::from_value::<LibraryHolding>(other.clone()),
            };
            match parsed {
                Ok(holding) => Some(holding),
                Err(e) => {
                    tracing::debug!("Skipping malformed holding entry: {}", e);
                    None
                }
            }
        })
        .collect()
}
