//! Holdings lookup against the search index
//!
//! Builds identifier and title/author queries for one cataloguing network and
//! flattens the per-record holding field into a map of holding libraries.

use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::SearchConfig,
    error::{AppError, AppResult},
    models::{normalize_standard_number, HoldingsResult, LibraryHolding, SearchQuery, SearchResultSet},
    services::search::SearchClient,
};

/// Years up to this one are treated as cataloguing noise
const MIN_YEAR: i32 = 1800;

/// Identifiers up to this length are ISSNs, longer ones ISBNs
const MAX_ISSN_LEN: usize = 9;

#[derive(Clone)]
pub struct HoldingsLocator {
    client: Arc<dyn SearchClient>,
    profile: String,
    timeout: Duration,
    max_results: usize,
    network: Option<String>,
    title: Option<String>,
    author: Option<String>,
    year: Option<i32>,
    zdb: Option<String>,
    identifiers: Vec<String>,
}

impl HoldingsLocator {
    pub fn new(client: Arc<dyn SearchClient>, config: &SearchConfig) -> Self {
        Self {
            client,
            profile: config.profile.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            max_results: config.max_results,
            network: None,
            title: None,
            author: None,
            year: None,
            zdb: None,
            identifiers: Vec::new(),
        }
    }

    /// Restrict the lookup to one network (stored uppercase)
    pub fn network(mut self, network: &str) -> Self {
        let network = network.trim().to_uppercase();
        self.network = (!network.is_empty()).then_some(network);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = decode_term(title);
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = decode_term(author);
        self
    }

    /// Publication year; years up to 1800 are ignored
    pub fn year(mut self, year: i32) -> Self {
        self.year = (year > MIN_YEAR).then_some(year);
        self
    }

    pub fn zdb(mut self, zdb: &str) -> Self {
        let zdb = zdb.trim();
        self.zdb = (!zdb.is_empty()).then(|| zdb.to_string());
        self
    }

    /// ISBNs/ISSNs; normalized to digits and `X`, deduplicated
    pub fn identifiers<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in identifiers {
            let cleaned = normalize_standard_number(raw.as_ref());
            if !cleaned.is_empty() && !self.identifiers.contains(&cleaned) {
                self.identifiers.push(cleaned);
            }
        }
        self
    }

    /// Whether enough terms are set to run [`query`](Self::query)
    pub fn check_query(&self) -> bool {
        let has_ids = !self.identifiers.is_empty() || self.zdb.is_some();
        let has_title_author = self.title.is_some() && self.author.is_some();
        self.network.is_some() && (has_ids || has_title_author)
    }

    /// Lucene query for the current terms.
    ///
    /// ISSN/ISBN clauses are ORed into one group, which is ANDed with
    /// whichever of title, author, year and ZDB id are set.
    pub fn build_query(&self) -> String {
        let mut terms = Vec::new();
        if let Some(ref title) = self.title {
            terms.push(format!("title:\"{}\"", escape_phrase(title)));
        }
        if let Some(ref author) = self.author {
            terms.push(format!("author:\"{}\"", escape_phrase(author)));
        }
        if let Some(year) = self.year {
            terms.push(format!("publishDate:{}", year));
        }
        if let Some(ref zdb) = self.zdb {
            terms.push(format!("zdb:{}", escape_term(zdb)));
        }

        let identifiers: Vec<String> = self
            .identifiers
            .iter()
            .map(|id| {
                if id.len() <= MAX_ISSN_LEN {
                    format!("issn:{}", id)
                } else {
                    format!("isbn:{}", id)
                }
            })
            .collect();

        if !identifiers.is_empty() {
            let group = format!("({})", identifiers.join(" OR "));
            if terms.is_empty() {
                return group;
            }
            terms.push(group);
        }

        format!("({})", terms.join(" AND "))
    }

    /// Run the lookup and flatten the holding fields of all hits
    pub async fn query(&self) -> AppResult<HoldingsResult> {
        let network = match (self.check_query(), self.network.as_deref()) {
            (true, Some(network)) => network,
            _ => {
                return Err(AppError::BadRequest(
                    "Holdings query needs a network and identifiers or title and author".to_string(),
                ))
            }
        };

        let search = SearchQuery {
            query: self.build_query(),
            filters: vec![format!("network:{}", network)],
            limit: self.max_results,
            sort: Some("relevance".to_string()),
        };
        tracing::debug!("Holdings lookup in {}: {}", network, search.query);

        let result_set = self.execute(&search).await?;
        let result = parse_holdings(result_set);
        tracing::debug!(
            "Holdings lookup in {} returned {} of {} records",
            network,
            result.numppn,
            result.numfound
        );
        Ok(result)
    }

    /// Look up parallel editions by PPN.
    ///
    /// No network filter is applied: several libraries hold too many local
    /// records for a filter query, so the caller matches `local_isils` itself.
    pub async fn get_parallel_editions(
        &self,
        identifiers: &[String],
        local_isils: &[String],
    ) -> AppResult<SearchResultSet> {
        let clauses: Vec<String> = identifiers
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(|id| format!("id:{}", escape_term(id)))
            .collect();

        if clauses.is_empty() {
            return Ok(SearchResultSet::default());
        }

        tracing::debug!(
            "Parallel edition lookup for {} records ({} local ISILs)",
            clauses.len(),
            local_isils.len()
        );

        let search = SearchQuery {
            query: clauses.join(" OR "),
            filters: Vec::new(),
            limit: clauses.len().max(self.max_results),
            sort: None,
        };
        self.execute(&search).await
    }

    async fn execute(&self, search: &SearchQuery) -> AppResult<SearchResultSet> {
        match tokio::time::timeout(self.timeout, self.client.search(&self.profile, search)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::SearchTimeout(self.timeout.as_millis() as u64)),
        }
    }
}

/// Flatten hits into PPN → holdings.
///
/// A library listed twice in one record keeps only its last call number and
/// issue.
pub fn parse_holdings(result_set: SearchResultSet) -> HoldingsResult {
    let mut holdings = IndexMap::new();

    for hit in result_set.records {
        let mut by_isil: IndexMap<String, LibraryHolding> = IndexMap::new();
        for holding in hit.holdings {
            by_isil.insert(holding.isil.clone(), holding);
        }
        holdings.insert(hit.id, by_isil.into_values().collect::<Vec<_>>());
    }

    HoldingsResult {
        numppn: holdings.len(),
        numfound: result_set.total,
        holdings,
    }
}

fn decode_term(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let decoded = decoded.trim();
    (!decoded.is_empty()).then(|| decoded.to_string())
}

fn escape_phrase(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_term(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if "+-&|!(){}[]^\"~*?:\\/ ".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::SearchHit, services::search::MockSearchClient};
    use async_trait::async_trait;

    fn locator(client: MockSearchClient) -> HoldingsLocator {
        HoldingsLocator::new(Arc::new(client), &SearchConfig::default())
    }

    fn holding(isil: &str, callnumber: &str) -> LibraryHolding {
        LibraryHolding {
            isil: isil.to_string(),
            callnumber: Some(callnumber.to_string()),
            issue: None,
        }
    }

    #[test]
    fn test_identifier_normalization() {
        let l = locator(MockSearchClient::new())
            .identifiers(["978-3-16-148410-0", "1234-567x", "9783161484100", "n/a"]);
        assert_eq!(l.identifiers, vec!["9783161484100", "1234567X"]);
    }

    #[test]
    fn test_setters_normalize() {
        let l = locator(MockSearchClient::new())
            .network(" heb ")
            .title("Der%20Zauberberg")
            .author("Mann%2C%20Thomas")
            .year(1800);
        assert_eq!(l.network.as_deref(), Some("HEB"));
        assert_eq!(l.title.as_deref(), Some("Der Zauberberg"));
        assert_eq!(l.author.as_deref(), Some("Mann, Thomas"));
        assert_eq!(l.year, None);
        assert_eq!(l.year(1924).year, Some(1924));
    }

    #[test]
    fn test_check_query() {
        let base = locator(MockSearchClient::new());
        assert!(!base.clone().identifiers(["9783161484100"]).check_query());
        assert!(base.clone().network("SWB").identifiers(["9783161484100"]).check_query());
        assert!(base.clone().network("SWB").zdb("2014495-0").check_query());
        assert!(!base.clone().network("SWB").title("Faust").check_query());
        assert!(base.clone().network("SWB").title("Faust").author("Goethe").check_query());
        assert!(!base.network("SWB").check_query());
    }

    #[test]
    fn test_query_mixes_issn_and_isbn() {
        let l = locator(MockSearchClient::new())
            .network("SWB")
            .identifiers(["1234567X"])
            .identifiers(["9783161484100"]);
        assert_eq!(l.build_query(), "(issn:1234567X OR isbn:9783161484100)");
    }

    #[test]
    fn test_query_title_author_fallback() {
        let l = locator(MockSearchClient::new())
            .network("SWB")
            .title("Das \"Kapital\"")
            .author("Marx, Karl")
            .year(1867);
        assert_eq!(
            l.build_query(),
            "(title:\"Das \\\"Kapital\\\"\" AND author:\"Marx, Karl\" AND publishDate:1867)"
        );
    }

    #[test]
    fn test_identifier_group_inside_title_author_zdb_terms() {
        let l = locator(MockSearchClient::new())
            .network("SWB")
            .identifiers(["00280836", "9783161484100"])
            .zdb("2014495-0")
            .title("Nature")
            .author("Lockyer");
        assert_eq!(
            l.build_query(),
            "(title:\"Nature\" AND author:\"Lockyer\" AND zdb:2014495\\-0 AND (issn:00280836 OR isbn:9783161484100))"
        );
    }

    #[test]
    fn test_zdb_without_identifiers() {
        let l = locator(MockSearchClient::new()).network("SWB").zdb("2014495-0");
        assert_eq!(l.build_query(), "(zdb:2014495\\-0)");
    }

    #[test]
    fn test_duplicate_isil_keeps_last() {
        let result = parse_holdings(SearchResultSet {
            total: 1,
            records: vec![SearchHit {
                id: "123".into(),
                holdings: vec![
                    holding("DE-7", "first"),
                    holding("DE-30", "other"),
                    holding("DE-7", "second"),
                ],
            }],
        });

        let libs = &result.holdings["123"];
        assert_eq!(libs.len(), 2);
        assert_eq!(libs[0].isil, "DE-7");
        assert_eq!(libs[0].callnumber.as_deref(), Some("second"));
        assert_eq!(result.numppn, 1);
        assert_eq!(result.numfound, 1);
    }

    #[tokio::test]
    async fn test_query_sends_network_filter() {
        let mut client = MockSearchClient::new();
        client
            .expect_search()
            .withf(|profile, q| {
                profile == "ill"
                    && q.query == "(isbn:9783161484100)"
                    && q.filters == vec!["network:GBV".to_string()]
                    && q.limit == 20
            })
            .times(1)
            .returning(|_, _| {
                Ok(SearchResultSet {
                    total: 3,
                    records: vec![SearchHit {
                        id: "555".into(),
                        holdings: vec![holding("DE-1", "X 1")],
                    }],
                })
            });

        let result = locator(client)
            .network("gbv")
            .identifiers(["9783161484100"])
            .query()
            .await
            .unwrap();
        assert_eq!(result.numfound, 3);
        assert_eq!(result.holdings["555"][0].isil, "DE-1");
    }

    #[tokio::test]
    async fn test_incomplete_query_is_rejected() {
        let mut client = MockSearchClient::new();
        client.expect_search().never();
        let err = locator(client).title("Faust").query().await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_parallel_editions_without_network_filter() {
        let mut client = MockSearchClient::new();
        client
            .expect_search()
            .withf(|_, q| q.query == "id:111 OR id:22X" && q.filters.is_empty())
            .times(1)
            .returning(|_, _| Ok(SearchResultSet::default()));

        let ids = vec!["111".to_string(), "22X".to_string()];
        locator(client)
            .get_parallel_editions(&ids, &["DE-7".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_parallel_editions_empty_input_skips_search() {
        let mut client = MockSearchClient::new();
        client.expect_search().never();
        let result = locator(client).get_parallel_editions(&[], &[]).await.unwrap();
        assert_eq!(result.total, 0);
    }

    struct StalledClient;

    #[async_trait]
    impl SearchClient for StalledClient {
        async fn search(&self, _: &str, _: &SearchQuery) -> AppResult<SearchResultSet> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(SearchResultSet::default())
        }
    }

    #[tokio::test]
    async fn test_lookup_times_out() {
        let config = SearchConfig {
            timeout_ms: 20,
            ..Default::default()
        };
        let err = HoldingsLocator::new(Arc::new(StalledClient), &config)
            .network("SWB")
            .identifiers(["9783161484100"])
            .query()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SearchTimeout(20)));
    }
}
