//! Inter-library loan eligibility engine
//!
//! [`EligibilityEngine`] is a stateless evaluator over the ILL configuration
//! and a per-record [`RecordContext`]. Attaching a record yields a fresh
//! context; outcomes, messages and discovered PPNs are cached in it until the
//! context is dropped. [`IllSession`] keeps the "attach, then ask" lifecycle
//! for callers that reuse one object across records.
//!
//! Evaluation runs the configured [`CheckPlan`] in order. Each outcome is one
//! bit of the status code; a trailing bit records whether any local ISIL was
//! supplied. The record is available for ILL only when every bit is set.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::{
    config::IllConfig,
    error::{AppError, AppResult},
    models::{BibRecord, Format, HoldingsResult},
    services::{
        checks::{CheckId, CheckPlan},
        holdings::HoldingsLocator,
    },
};

/// Outcome key of the trailing "local ISILs supplied" bit
pub const LOCAL_ISILS_OUTCOME: &str = "LocalIsils";

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid year regex"));

/// Per-record evaluation state
pub struct RecordContext {
    record: Box<dyn BibRecord>,
    format: Format,
    outcomes: IndexMap<String, bool>,
    messages: Vec<String>,
    network_ppns: Vec<String>,
    parallel_ppns: Vec<String>,
    link_labels: Vec<String>,
    network_lookup: Option<bool>,
    parallel_lookup: Option<bool>,
    available_noted: bool,
}

impl RecordContext {
    fn new(record: Box<dyn BibRecord>) -> Self {
        let format = Format::classify(record.as_ref());
        Self {
            record,
            format,
            outcomes: IndexMap::new(),
            messages: Vec::new(),
            network_ppns: Vec::new(),
            parallel_ppns: Vec::new(),
            link_labels: Vec::new(),
            network_lookup: None,
            parallel_lookup: None,
            available_noted: false,
        }
    }

    pub fn record(&self) -> &dyn BibRecord {
        self.record.as_ref()
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Outcomes computed so far; empty until the first evaluation
    pub fn outcomes(&self) -> &IndexMap<String, bool> {
        &self.outcomes
    }

    fn add_network_hit(&mut self, ppn: String, label: &str) {
        self.network_ppns.push(ppn);
        self.link_labels.push(label.to_string());
    }

    fn add_parallel_hit(&mut self, ppn: String, label: &str) {
        self.parallel_ppns.push(ppn);
        self.link_labels.push(label.to_string());
    }
}

#[derive(Clone)]
pub struct EligibilityEngine {
    config: Arc<IllConfig>,
    plan: Arc<CheckPlan>,
    locator: HoldingsLocator,
    local_isils: Vec<String>,
}

impl EligibilityEngine {
    /// Build an engine, validating the configured check list
    pub fn new(
        config: Arc<IllConfig>,
        locator: HoldingsLocator,
        local_isils: Vec<String>,
    ) -> AppResult<Self> {
        let plan = CheckPlan::parse(&config.checks.methods, config.checks.strict)?;
        Ok(Self::with_plan(config, Arc::new(plan), locator, local_isils))
    }

    /// Build an engine from an already validated plan
    pub fn with_plan(
        config: Arc<IllConfig>,
        plan: Arc<CheckPlan>,
        locator: HoldingsLocator,
        local_isils: Vec<String>,
    ) -> Self {
        Self {
            config,
            plan,
            locator,
            local_isils,
        }
    }

    pub fn local_isils(&self) -> &[String] {
        &self.local_isils
    }

    /// Bind a record; the returned context starts with empty caches
    pub fn attach_driver<R: BibRecord + 'static>(&self, record: R) -> RecordContext {
        let context = RecordContext::new(Box::new(record));
        tracing::debug!(
            "Attached record {} as {}",
            context.record.ppn(),
            context.format
        );
        context
    }

    pub async fn is_available(&self, ctx: &mut RecordContext) -> bool {
        self.ensure_outcomes(ctx).await;

        if ctx.outcomes.values().any(|outcome| !outcome) {
            return false;
        }

        if !ctx.available_noted {
            ctx.messages.push(self.config.keys.available.clone());
            ctx.available_noted = true;
        }
        true
    }

    /// Outcomes as a binary number, first check in the most significant bit.
    ///
    /// Only meaningful for one configuration; not a stable identifier.
    pub async fn status_code(&self, ctx: &mut RecordContext) -> u64 {
        self.ensure_outcomes(ctx).await;
        ctx.outcomes
            .values()
            .fold(0u64, |code, &outcome| (code << 1) | u64::from(outcome))
    }

    /// Free-form messages, then the keys of failed checks, then the
    /// "journal held locally" hint.
    pub async fn messages(&self, ctx: &mut RecordContext) -> Vec<String> {
        self.ensure_outcomes(ctx).await;

        let mut messages = ctx.messages.clone();
        for (name, _) in ctx.outcomes.iter().filter(|(_, outcome)| !**outcome) {
            if let Some(key) = self.config.message_for(name) {
                messages.push(key.to_string());
            }
        }

        // Re-derived on every call rather than read from the outcome map
        if self.check_journal_available(ctx) {
            messages.push(self.config.keys.journal_available.clone());
        }

        messages
    }

    /// Network and parallel edition hits, deduplicated in discovery order
    pub async fn ppns(&self, ctx: &mut RecordContext) -> Vec<String> {
        self.ensure_outcomes(ctx).await;

        let mut ppns: Vec<String> = Vec::new();
        for ppn in ctx.network_ppns.iter().chain(ctx.parallel_ppns.iter()) {
            if !ppns.contains(ppn) {
                ppns.push(ppn.clone());
            }
        }
        ppns
    }

    pub async fn link_labels(&self, ctx: &mut RecordContext) -> Vec<String> {
        self.ensure_outcomes(ctx).await;
        ctx.link_labels.clone()
    }

    /// Run a single check without any modifier
    pub async fn check(&self, id: CheckId, ctx: &mut RecordContext) -> bool {
        match id {
            CheckId::Hebis8 => self.check_hebis8(ctx),
            CheckId::Free => ctx.record.is_free(),
            CheckId::SerialOrCollection => self.check_serial_or_collection(ctx),
            CheckId::CurrentLibrary => self.check_current_library(ctx).await,
            CheckId::ParallelEditions => self.check_parallel_editions(ctx).await,
            CheckId::JournalAvailable => self.check_journal_available(ctx),
            CheckId::Format => self.check_format(ctx),
            CheckId::Indicator => self.check_indicator(ctx),
        }
    }

    async fn ensure_outcomes(&self, ctx: &mut RecordContext) {
        if !ctx.outcomes.is_empty() {
            return;
        }

        let mut outcomes = IndexMap::with_capacity(self.plan.len() + 1);
        for planned in self.plan.iter() {
            let result = self.check(planned.id, ctx).await;
            let outcome = planned.modifier.apply(result);
            tracing::debug!(
                "Check {} ({:?}) on {}: {} -> {}",
                planned.id,
                planned.modifier,
                ctx.record.ppn(),
                result,
                outcome
            );
            outcomes.insert(planned.id.name().to_string(), outcome);
        }
        outcomes.insert(LOCAL_ISILS_OUTCOME.to_string(), !self.local_isils.is_empty());

        ctx.outcomes = outcomes;
    }

    fn is_own_network(&self, network: Option<&str>) -> bool {
        network.is_some_and(|n| n.eq_ignore_ascii_case(&self.config.own_network))
    }

    fn check_hebis8(&self, ctx: &RecordContext) -> bool {
        let network_matches = ctx
            .record
            .network()
            .is_some_and(|n| n.eq_ignore_ascii_case(&self.config.hebis8_network));
        network_matches && ctx.record.ppn().starts_with('8')
    }

    fn check_serial_or_collection(&self, ctx: &RecordContext) -> bool {
        let record = ctx.record.as_ref();
        (record.is_serial() || record.is_collection())
            && !(record.is_journal() || record.is_newspaper())
    }

    async fn check_current_library(&self, ctx: &mut RecordContext) -> bool {
        if ctx.record.has_local_holdings() {
            let ppn = ctx.record.ppn().to_string();
            ctx.add_network_hit(ppn, &self.config.labels.own_catalog);
            return true;
        }

        if ctx.record.network().is_none() || self.is_own_network(ctx.record.network()) {
            return false;
        }

        if self.config.lookup_exempt_formats.contains(&ctx.format) {
            return false;
        }

        self.lookup_network(ctx).await
    }

    /// Webservice lookup for copies of the record held by a local library.
    /// Runs at most once per context.
    async fn lookup_network(&self, ctx: &mut RecordContext) -> bool {
        if let Some(found) = ctx.network_lookup {
            return found;
        }

        let found = match self.network_holdings(ctx.record.as_ref()).await {
            Ok(Some(result)) => {
                let held: Vec<String> = result
                    .held_by(&self.local_isils)
                    .map(str::to_string)
                    .collect();

                if held.is_empty() {
                    if self.config.fallback_to_first_result {
                        if let Some(first) = result.first_ppn() {
                            tracing::debug!(
                                "No local copy of {}, falling back to {}",
                                ctx.record.ppn(),
                                first
                            );
                            ctx.add_network_hit(first.to_string(), &self.config.labels.network);
                        }
                    }
                    false
                } else {
                    for ppn in held {
                        ctx.add_network_hit(ppn, &self.config.labels.network);
                    }
                    true
                }
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Network lookup for {} failed: {}", ctx.record.ppn(), e);
                ctx.messages.push(self.config.keys.technical_error.clone());
                false
            }
        };

        ctx.network_lookup = Some(found);
        found
    }

    /// Query the record's own network by identifiers and title/author/year
    async fn network_holdings(&self, record: &dyn BibRecord) -> AppResult<Option<HoldingsResult>> {
        let Some(network) = record.network() else {
            return Ok(None);
        };

        let identifiers: Vec<String> = record
            .clean_isbn()
            .into_iter()
            .chain(record.clean_issn())
            .collect();

        let mut locator = self.locator.clone().network(network).identifiers(identifiers);
        if let Some(zdb) = record.zdb_id() {
            locator = locator.zdb(zdb);
        }
        if let Some(title) = record.title() {
            locator = locator.title(title);
        }
        if let Some(author) = record.primary_author() {
            locator = locator.author(author);
        }
        if let Some(year) = publication_year(record.publication_dates()) {
            locator = locator.year(year);
        }

        if !locator.check_query() {
            tracing::debug!("Not enough data to look up {} in {}", record.ppn(), network);
            return Ok(None);
        }

        locator.query().await.map(Some)
    }

    async fn check_parallel_editions(&self, ctx: &mut RecordContext) -> bool {
        if !self.is_own_network(ctx.record.network()) {
            return false;
        }

        if let Some(found) = ctx.parallel_lookup {
            return found;
        }

        let related = ctx.record.related_editions().to_vec();
        let found = if related.is_empty() {
            false
        } else {
            match self
                .locator
                .get_parallel_editions(&related, &self.local_isils)
                .await
            {
                Ok(result_set) => {
                    let mut found = false;
                    for hit in result_set.records {
                        if hit.is_held_by(&self.local_isils) {
                            ctx.add_parallel_hit(hit.id, &self.config.labels.parallel_edition);
                            found = true;
                        }
                    }
                    found
                }
                Err(e) => {
                    tracing::warn!(
                        "Parallel edition lookup for {} failed: {}",
                        ctx.record.ppn(),
                        e
                    );
                    ctx.messages.push(self.config.keys.technical_error.clone());
                    false
                }
            }
        };

        ctx.parallel_lookup = Some(found);
        found
    }

    fn check_journal_available(&self, ctx: &RecordContext) -> bool {
        ctx.record.has_local_holdings() && ctx.format == Format::Journal
    }

    fn check_format(&self, ctx: &mut RecordContext) -> bool {
        let Some(rule) = self.config.format_rule(ctx.format) else {
            ctx.messages.push(self.config.keys.format_disabled.clone());
            return false;
        };

        if !rule.enabled {
            let key = rule
                .disabled_message
                .clone()
                .unwrap_or_else(|| self.config.keys.format_disabled.clone());
            ctx.messages.push(key);
            return false;
        }

        let excluded = ctx.record.network().is_some_and(|network| {
            rule.exclude_network
                .iter()
                .any(|n| n.eq_ignore_ascii_case(network))
        });
        if excluded {
            let key = rule
                .excluded_network_message
                .clone()
                .unwrap_or_else(|| self.config.keys.network_excluded.clone());
            ctx.messages.push(key);
            return false;
        }

        true
    }

    fn check_indicator(&self, ctx: &RecordContext) -> bool {
        let allowed = match self.config.format_rule(ctx.format) {
            Some(rule) if !rule.indicator.is_empty() => &rule.indicator,
            _ => return true,
        };
        ctx.record
            .holding_indicators()
            .iter()
            .any(|indicator| allowed.contains(indicator))
    }
}

/// First four-digit year found in the publication dates
fn publication_year(dates: &[String]) -> Option<i32> {
    dates
        .iter()
        .find_map(|date| YEAR.find(date))
        .and_then(|m| m.as_str().parse().ok())
}

/// Stateful wrapper reusing one engine across records, one at a time
pub struct IllSession {
    engine: EligibilityEngine,
    context: Option<RecordContext>,
}

impl IllSession {
    pub fn new(engine: EligibilityEngine) -> Self {
        Self {
            engine,
            context: None,
        }
    }

    /// Attach a record, discarding every cache of the previous one
    pub fn attach_driver<R: BibRecord + 'static>(&mut self, record: R) {
        self.context = Some(self.engine.attach_driver(record));
    }

    pub fn format(&self) -> AppResult<Format> {
        self.context
            .as_ref()
            .map(RecordContext::format)
            .ok_or(AppError::MissingDriver)
    }

    pub async fn is_available(&mut self) -> AppResult<bool> {
        let ctx = self.context.as_mut().ok_or(AppError::MissingDriver)?;
        Ok(self.engine.is_available(ctx).await)
    }

    pub async fn status_code(&mut self) -> AppResult<u64> {
        let ctx = self.context.as_mut().ok_or(AppError::MissingDriver)?;
        Ok(self.engine.status_code(ctx).await)
    }

    pub async fn messages(&mut self) -> AppResult<Vec<String>> {
        let ctx = self.context.as_mut().ok_or(AppError::MissingDriver)?;
        Ok(self.engine.messages(ctx).await)
    }

    pub async fn ppns(&mut self) -> AppResult<Vec<String>> {
        let ctx = self.context.as_mut().ok_or(AppError::MissingDriver)?;
        Ok(self.engine.ppns(ctx).await)
    }

    pub async fn link_labels(&mut self) -> AppResult<Vec<String>> {
        let ctx = self.context.as_mut().ok_or(AppError::MissingDriver)?;
        Ok(self.engine.link_labels(ctx).await)
    }

    pub fn local_isils(&self) -> &[String] {
        self.engine.local_isils()
    }
}
