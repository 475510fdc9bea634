//! Configuration management for the ILL eligibility service

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

use crate::models::Format;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

/// Search index connection
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    /// Search profile used for ILL lookups
    pub profile: String,
    pub timeout_ms: u64,
    pub max_results: usize,
    /// Index field carrying the per-library holdings of a record
    pub holdings_field: String,
}

/// Ordered check list
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChecksConfig {
    /// Comma separated check names, each optionally prefixed with `!` or `~`
    pub methods: String,
    /// Reject unknown check names instead of skipping them
    pub strict: bool,
}

/// Per-format ILL rules
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FormatRule {
    pub enabled: bool,
    pub exclude_network: Vec<String>,
    /// Allowed holding indicator codes; empty means unconstrained
    pub indicator: Vec<String>,
    pub disabled_message: Option<String>,
    pub excluded_network_message: Option<String>,
}

/// Message keys that are not bound to a single check
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MessageKeys {
    pub available: String,
    pub technical_error: String,
    pub journal_available: String,
    pub format_disabled: String,
    pub network_excluded: String,
}

/// Message keys explaining why a PPN was surfaced
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkLabels {
    pub own_catalog: String,
    pub network: String,
    pub parallel_edition: String,
}

/// Eligibility engine configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IllConfig {
    /// Network of the local union catalogue
    pub own_network: String,
    /// Network whose `8…` PPNs are flagged by the Hebis8 check
    pub hebis8_network: String,
    /// Record the first lookup hit when no local library holds any of them
    pub fallback_to_first_result: bool,
    /// Formats never looked up remotely by the CurrentLibrary check
    pub lookup_exempt_formats: Vec<Format>,
    pub checks: ChecksConfig,
    pub formats: HashMap<Format, FormatRule>,
    /// Check name to message key shown when that check fails
    pub messages: HashMap<String, String>,
    pub keys: MessageKeys,
    pub labels: LinkLabels,
}

impl IllConfig {
    pub fn format_rule(&self, format: Format) -> Option<&FormatRule> {
        self.formats.get(&format)
    }

    /// Message key configured for a failing check (case-insensitive)
    pub fn message_for(&self, check: &str) -> Option<&str> {
        self.messages
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(check))
            .map(|(_, key)| key.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ill: IllConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (e.g. ILL_SEARCH__BASE_URL)
            .add_source(
                Environment::with_prefix("ILL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // Override search URL from SEARCH_URL env var if present
            .set_override_option("search.base_url", env::var("SEARCH_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8983/solr".to_string(),
            profile: "ill".to_string(),
            timeout_ms: 3000,
            max_results: 20,
            holdings_field: "ill_holdings".to_string(),
        }
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            methods: "!Hebis8,!Free,!SerialOrCollection,!CurrentLibrary,!ParallelEditions,Format,Indicator"
                .to_string(),
            strict: true,
        }
    }
}

impl Default for MessageKeys {
    fn default() -> Self {
        Self {
            available: "ill_available".to_string(),
            technical_error: "ill_technical_error".to_string(),
            journal_available: "ill_journal_available_locally".to_string(),
            format_disabled: "ill_format_not_available".to_string(),
            network_excluded: "ill_network_excluded".to_string(),
        }
    }
}

impl Default for LinkLabels {
    fn default() -> Self {
        Self {
            own_catalog: "ill_link_own_catalog".to_string(),
            network: "ill_link_network".to_string(),
            parallel_edition: "ill_link_parallel_edition".to_string(),
        }
    }
}

impl Default for IllConfig {
    fn default() -> Self {
        let formats = Format::ALL
            .into_iter()
            .map(|format| {
                let enabled = matches!(
                    format,
                    Format::Book | Format::Journal | Format::MonoSerial | Format::Article
                );
                (
                    format,
                    FormatRule {
                        enabled,
                        ..Default::default()
                    },
                )
            })
            .collect();

        let messages = [
            ("Hebis8", "ill_hebis8"),
            ("Free", "ill_free"),
            ("SerialOrCollection", "ill_serial_or_collection"),
            ("CurrentLibrary", "ill_current_library"),
            ("ParallelEditions", "ill_parallel_editions"),
            ("Indicator", "ill_indicator"),
        ]
        .into_iter()
        .map(|(check, key)| (check.to_string(), key.to_string()))
        .collect();

        Self {
            own_network: "HEB".to_string(),
            hebis8_network: "HEB".to_string(),
            fallback_to_first_result: true,
            lookup_exempt_formats: vec![Format::Journal, Format::MonoSerial],
            checks: ChecksConfig::default(),
            formats,
            messages,
            keys: MessageKeys::default(),
            labels: LinkLabels::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_lookup_ignores_case() {
        let config = IllConfig::default();
        assert_eq!(config.message_for("currentlibrary"), Some("ill_current_library"));
        assert_eq!(config.message_for("Format"), None);
    }

    #[test]
    fn test_default_format_rules() {
        let config = IllConfig::default();
        assert!(config.format_rule(Format::Book).map(|r| r.enabled).unwrap_or(false));
        assert!(!config.format_rule(Format::EBook).map(|r| r.enabled).unwrap_or(true));
        assert!(!config.format_rule(Format::Undefined).map(|r| r.enabled).unwrap_or(true));
    }

    #[test]
    fn test_shipped_default_config() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.search.profile, "ill");
        assert_eq!(config.ill.lookup_exempt_formats, vec![Format::Journal, Format::MonoSerial]);
        assert_eq!(config.ill.formats.len(), Format::ALL.len());
        assert_eq!(config.ill.message_for("CurrentLibrary"), Some("ill_current_library"));
        assert!(crate::services::checks::CheckPlan::parse(
            &config.ill.checks.methods,
            config.ill.checks.strict
        )
        .is_ok());
    }

    #[test]
    fn test_ill_section_from_toml() {
        let toml = r#"
            own_network = "SWB"
            fallback_to_first_result = false

            [checks]
            methods = "Format,~Indicator"

            [formats.book]
            enabled = true
            exclude_network = ["GBV"]
            indicator = ["a", "b"]

            [messages]
            Indicator = "ill_bad_indicator"
        "#;

        let config: IllConfig = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.own_network, "SWB");
        assert!(!config.fallback_to_first_result);
        assert_eq!(config.checks.methods, "Format,~Indicator");
        let book = config.format_rule(Format::Book).unwrap();
        assert_eq!(book.exclude_network, vec!["GBV"]);
        assert_eq!(book.indicator, vec!["a", "b"]);
        assert_eq!(config.message_for("Indicator"), Some("ill_bad_indicator"));
    }
}
