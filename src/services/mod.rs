//! Business logic services

pub mod checks;
pub mod eligibility;
pub mod holdings;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{AppConfig, IllConfig, SearchConfig},
    error::AppResult,
    models::SearchQuery,
};

use checks::CheckPlan;
use eligibility::EligibilityEngine;
use holdings::HoldingsLocator;
use search::SearchClient;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    search: Arc<dyn SearchClient>,
    search_config: SearchConfig,
    ill_config: Arc<IllConfig>,
    plan: Arc<CheckPlan>,
}

impl Services {
    /// Create all services, validating the configured check list once
    pub fn new(config: &AppConfig, search: Arc<dyn SearchClient>) -> AppResult<Self> {
        let plan = CheckPlan::parse(&config.ill.checks.methods, config.ill.checks.strict)?;
        tracing::info!(
            "ILL check plan: {}",
            plan.iter()
                .map(|c| format!("{:?}:{}", c.modifier, c.id))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            search,
            search_config: config.search.clone(),
            ill_config: Arc::new(config.ill.clone()),
            plan: Arc::new(plan),
        })
    }

    /// Fresh holdings locator with no query terms set
    pub fn holdings_locator(&self) -> HoldingsLocator {
        HoldingsLocator::new(self.search.clone(), &self.search_config)
    }

    /// Whether the search index answers a minimal query in time
    pub async fn search_ready(&self) -> bool {
        let probe = SearchQuery {
            query: "*:*".to_string(),
            filters: Vec::new(),
            limit: 0,
            sort: None,
        };
        let timeout = Duration::from_millis(self.search_config.timeout_ms);

        match tokio::time::timeout(timeout, self.search.search(&self.search_config.profile, &probe)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::warn!("Search index readiness probe failed: {}", e);
                false
            }
            Err(_) => {
                tracing::warn!("Search index readiness probe timed out");
                false
            }
        }
    }

    /// Engine evaluating on behalf of the given local libraries
    pub fn engine(&self, local_isils: Vec<String>) -> EligibilityEngine {
        EligibilityEngine::with_plan(
            self.ill_config.clone(),
            self.plan.clone(),
            self.holdings_locator(),
            local_isils,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{LoggingConfig, ServerConfig},
        error::AppError,
        models::SearchResultSet,
    };
    use search::MockSearchClient;

    fn app_config(methods: &str) -> AppConfig {
        let mut ill = IllConfig::default();
        ill.checks.methods = methods.to_string();
        AppConfig {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            search: SearchConfig::default(),
            ill,
        }
    }

    #[test]
    fn test_invalid_check_list_rejected_at_startup() {
        let result = Services::new(&app_config("Format,Nonsense"), Arc::new(MockSearchClient::new()));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_search_ready() {
        let mut client = MockSearchClient::new();
        client
            .expect_search()
            .withf(|profile, q| profile == "ill" && q.query == "*:*" && q.limit == 0)
            .times(1)
            .returning(|_, _| Ok(SearchResultSet::default()));
        let services = Services::new(&app_config("Format"), Arc::new(client)).unwrap();
        assert!(tokio_test::block_on(services.search_ready()));

        let mut client = MockSearchClient::new();
        client
            .expect_search()
            .returning(|_, _| Err(AppError::Search("503 Service Unavailable".into())));
        let services = Services::new(&app_config("Format"), Arc::new(client)).unwrap();
        assert!(!tokio_test::block_on(services.search_ready()));
    }

    #[test]
    fn test_engine_carries_local_isils() {
        let services = Services::new(&app_config("Format"), Arc::new(MockSearchClient::new())).unwrap();
        let engine = services.engine(vec!["DE-7".to_string()]);
        assert_eq!(engine.local_isils(), &["DE-7".to_string()]);
    }
}
