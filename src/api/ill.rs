//! Inter-library loan endpoints

use axum::{extract::State, Json};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{Format, HoldingsResult, RecordDocument},
    AppState,
};

/// ILL availability request
#[derive(Deserialize, ToSchema, Validate)]
pub struct AvailabilityRequest {
    /// Record to evaluate
    #[validate(nested)]
    pub record: RecordDocument,
    /// ISILs of the libraries the request is made for
    #[serde(default)]
    pub local_isils: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AvailabilityResponse {
    /// Whether the record may be ordered via ILL
    pub available: bool,
    pub format: Format,
    /// Check outcomes as a binary number (debugging aid)
    pub status_code: u64,
    /// Check outcomes in evaluation order
    pub outcomes: IndexMap<String, bool>,
    /// Message keys for display
    pub messages: Vec<String>,
    /// PPNs of usable copies found in the network or as parallel editions
    pub ppns: Vec<String>,
    /// Message keys explaining each PPN
    pub link_labels: Vec<String>,
}

/// Holdings lookup request
#[derive(Deserialize, ToSchema, Validate)]
pub struct HoldingsRequest {
    #[validate(length(min = 1, message = "network must not be empty"))]
    pub network: String,
    #[serde(default)]
    pub identifiers: Vec<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i32>,
    pub zdb: Option<String>,
}

/// Evaluate ILL eligibility of a record
#[utoipa::path(
    post,
    path = "/ill/availability",
    tag = "ill",
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Eligibility verdict", body = AvailabilityResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse)
    )
)]
pub async fn check_availability(
    State(state): State<AppState>,
    Json(request): Json<AvailabilityRequest>,
) -> AppResult<Json<AvailabilityResponse>> {
    request.validate()?;

    let engine = state.services.engine(request.local_isils);
    let mut ctx = engine.attach_driver(request.record);

    let available = engine.is_available(&mut ctx).await;
    let status_code = engine.status_code(&mut ctx).await;
    let messages = engine.messages(&mut ctx).await;
    let ppns = engine.ppns(&mut ctx).await;
    let link_labels = engine.link_labels(&mut ctx).await;

    tracing::info!(
        "ILL availability of {} ({}): {} [status {:b}]",
        ctx.record().ppn(),
        ctx.format(),
        available,
        status_code
    );

    Ok(Json(AvailabilityResponse {
        available,
        format: ctx.format(),
        status_code,
        outcomes: ctx.outcomes().clone(),
        messages,
        ppns,
        link_labels,
    }))
}

/// Look up holding libraries of a work in one network
#[utoipa::path(
    post,
    path = "/ill/holdings",
    tag = "ill",
    request_body = HoldingsRequest,
    responses(
        (status = 200, description = "Holdings per record", body = HoldingsResult),
        (status = 400, description = "Incomplete query", body = crate::error::ErrorResponse),
        (status = 502, description = "Search index error", body = crate::error::ErrorResponse),
        (status = 504, description = "Search index timeout", body = crate::error::ErrorResponse)
    )
)]
pub async fn lookup_holdings(
    State(state): State<AppState>,
    Json(request): Json<HoldingsRequest>,
) -> AppResult<Json<HoldingsResult>> {
    request.validate()?;

    let mut locator = state
        .services
        .holdings_locator()
        .network(&request.network)
        .identifiers(&request.identifiers);
    if let Some(ref title) = request.title {
        locator = locator.title(title);
    }
    if let Some(ref author) = request.author {
        locator = locator.author(author);
    }
    if let Some(year) = request.year {
        locator = locator.year(year);
    }
    if let Some(ref zdb) = request.zdb {
        locator = locator.zdb(zdb);
    }

    Ok(Json(locator.query().await?))
}
