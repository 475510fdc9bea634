//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, ill};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ILL Eligibility API",
        version = "1.0.0",
        description = "Inter-library loan eligibility and holdings lookup",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Inter-library loan
        ill::check_availability,
        ill::lookup_holdings,
    ),
    components(
        schemas(
            health::HealthResponse,
            ill::AvailabilityRequest,
            ill::AvailabilityResponse,
            ill::HoldingsRequest,
            crate::models::Format,
            crate::models::RecordDocument,
            crate::models::HoldingsResult,
            crate::models::LibraryHolding,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "ill", description = "Inter-library loan eligibility")
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router serving the OpenAPI document
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
