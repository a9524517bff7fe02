//! HTTP surface of the gateway.
//!
//! Two surfaces share one axum router:
//!
//! - `POST /mcp`, a JSON-RPC endpoint that speaks MCP to clients and exposes
//!   the aggregated catalog as if it were a single server.
//! - `/federation/*`, the administration API for registering backends,
//!   inspecting health, and routing natural-language requests.
//!
//! Both are guarded by the optional API key; `/` and `/health` are public.

mod admin;
mod auth;
mod error;
mod health;
mod mcp;
mod state;

pub use admin::RouteBody;
pub use auth::ApiKey;
pub use error::{ApiError, ApiResult};
pub use health::HealthResponse;
pub use state::AppState;

use crate::federation::ports::{BackendClient, BackendRegistry};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use mockable::Clock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Builds the gateway router.
///
/// `api_key` guards `/mcp` and `/federation/*` when present.
#[must_use]
pub fn build_router<R, B, C>(
    state: AppState<R, B, C>,
    api_key: Option<ApiKey>,
    cors: CorsLayer,
) -> Router
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    let protected = Router::new()
        .route("/mcp", post(mcp::handle::<R, B, C>))
        .nest("/federation", admin::routes::<R, B, C>())
        .route_layer(middleware::from_fn_with_state(
            api_key,
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(health::info::<R, B, C>))
        .route("/health", get(health::health::<R, B, C>))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
