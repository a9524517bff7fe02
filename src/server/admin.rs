//! Administration API under `/federation`.

use super::{ApiResult, AppState};
use crate::federation::{
    domain::{ResourceDescriptor, ToolDescriptor},
    ports::{BackendClient, BackendRegistry},
    services::{
        FederationStats, ProbeReport, RegisterServerRequest, RegisteredServer, RouteOutcome,
        ServerDetail, ServerSummary,
    },
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use mockable::Clock;
use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /federation/route`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteBody {
    /// Natural-language request.
    pub request: String,
    /// Optional structured context.
    #[serde(default)]
    pub context: Option<Value>,
}

/// Builds the administration routes.
pub fn routes<R, B, C>() -> Router<AppState<R, B, C>>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/servers",
            post(register_server::<R, B, C>).get(list_servers::<R, B, C>),
        )
        .route(
            "/servers/:name",
            get(server_detail::<R, B, C>).delete(unregister_server::<R, B, C>),
        )
        .route("/servers/:name/refresh", post(refresh_server::<R, B, C>))
        .route("/discover", post(discover_all::<R, B, C>))
        .route("/tools", get(list_tools::<R, B, C>))
        .route("/resources", get(list_resources::<R, B, C>))
        .route("/route", post(route_request::<R, B, C>))
        .route("/stats", get(stats::<R, B, C>))
}

async fn register_server<R, B, C>(
    State(state): State<AppState<R, B, C>>,
    Json(request): Json<RegisterServerRequest>,
) -> ApiResult<(StatusCode, Json<RegisteredServer>)>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    let registered = state.service.register_server(request).await?;
    let status = if registered.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(registered)))
}

async fn list_servers<R, B, C>(
    State(state): State<AppState<R, B, C>>,
) -> ApiResult<Json<Vec<ServerSummary>>>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Ok(Json(state.service.list_servers().await?))
}

async fn server_detail<R, B, C>(
    State(state): State<AppState<R, B, C>>,
    Path(name): Path<String>,
) -> ApiResult<Json<ServerDetail>>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Ok(Json(state.service.server_detail(&name).await?))
}

async fn unregister_server<R, B, C>(
    State(state): State<AppState<R, B, C>>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    state.service.unregister_server(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn refresh_server<R, B, C>(
    State(state): State<AppState<R, B, C>>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<ProbeReport>>>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Ok(Json(state.service.discover(Some(&name)).await?))
}

async fn discover_all<R, B, C>(
    State(state): State<AppState<R, B, C>>,
) -> ApiResult<Json<Vec<ProbeReport>>>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Ok(Json(state.service.discover(None).await?))
}

async fn list_tools<R, B, C>(
    State(state): State<AppState<R, B, C>>,
) -> ApiResult<Json<Vec<ToolDescriptor>>>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Ok(Json(state.service.list_tools().await?))
}

async fn list_resources<R, B, C>(
    State(state): State<AppState<R, B, C>>,
) -> ApiResult<Json<Vec<ResourceDescriptor>>>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Ok(Json(state.service.list_resources().await?))
}

async fn route_request<R, B, C>(
    State(state): State<AppState<R, B, C>>,
    Json(body): Json<RouteBody>,
) -> ApiResult<Json<RouteOutcome>>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Ok(Json(
        state.service.route(&body.request, body.context).await?,
    ))
}

async fn stats<R, B, C>(State(state): State<AppState<R, B, C>>) -> ApiResult<Json<FederationStats>>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Ok(Json(state.service.stats().await?))
}
