//! # API REST
//!
//! REST API for the ABG interpreter.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, identity headers)
//!
//! Uses `api-shared` for wire types and `abg-core` for all decisions.

#![warn(rust_2018_idioms)]

use abg_core::{AbgError, AnalysisOrchestrator, Identity, RawAbgInput};
use api_shared::auth::{identity_from_headers, USER_ID_HEADER, USER_TRANSIENT_HEADER};
use api_shared::{
    AbgValues, AnalyseReq, AnalyseRes, AnalysisEntry, ConnectivityDto, ErrorRes, HealthRes,
    HealthService, HistoryRes, RangeEntry, RangesRes, ViolationDto,
};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

/// Application state shared across REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: AnalysisOrchestrator,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, ranges, analyse, list_history, get_history),
    components(schemas(
        HealthRes,
        AbgValues,
        ConnectivityDto,
        AnalyseReq,
        AnalyseRes,
        AnalysisEntry,
        HistoryRes,
        ErrorRes,
        ViolationDto,
        RangeEntry,
        RangesRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ranges", get(ranges))
        .route("/analyses", post(analyse))
        .route("/history", get(list_history))
        .route("/history/:id", get(get_history))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the REST API until the server fails.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server stops with an error.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("++ ABG REST listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Error response carrying a status code and an `ErrorRes` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorRes,
}

impl ApiError {
    fn unauthorised() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: ErrorRes::message("Sign in required."),
        }
    }
}

impl From<AbgError> for ApiError {
    fn from(err: AbgError) -> Self {
        match &err {
            AbgError::Validation(v) => Self {
                status: StatusCode::BAD_REQUEST,
                body: ErrorRes::from(v),
            },
            AbgError::AuthRequired => Self::unauthorised(),
            AbgError::Store(_) | AbgError::InvalidConfig(_) => {
                tracing::error!("request failed: {err}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: ErrorRes::message("Internal error"),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn caller(headers: &HeaderMap) -> Option<Identity> {
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    identity_from_headers(value(USER_ID_HEADER), value(USER_TRANSIENT_HEADER))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/ranges",
    responses(
        (status = 200, description = "Normal and accepted ranges per parameter", body = RangesRes)
    )
)]
async fn ranges() -> Json<RangesRes> {
    Json(RangesRes::table())
}

#[utoipa::path(
    post,
    path = "/analyses",
    request_body = AnalyseReq,
    params(
        ("x-user-id" = Option<String>, Header, description = "Signed-in user id"),
        ("x-user-transient" = Option<String>, Header, description = "`true` for guest sessions")
    ),
    responses(
        (status = 200, description = "Analysis result, possibly degraded", body = AnalyseRes),
        (status = 400, description = "Values out of bounds", body = ErrorRes),
        (status = 401, description = "Online analysis without identity", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Analyse one ABG panel.
///
/// Gateway failures and offline requests still return 200; the `notice` and `warning` fields
/// say why the remote fields are placeholders.
async fn analyse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AnalyseReq>,
) -> Result<Json<AnalyseRes>, ApiError> {
    let identity = caller(&headers);
    let raw = RawAbgInput::from(req.values);
    let outcome = state
        .orchestrator
        .analyze_raw(&raw, identity.as_ref(), req.connectivity.into())
        .await?;
    Ok(Json(AnalyseRes::from(&outcome)))
}

#[utoipa::path(
    get,
    path = "/history",
    params(
        ("x-user-id" = String, Header, description = "Signed-in user id")
    ),
    responses(
        (status = 200, description = "The caller's analyses, newest first", body = HistoryRes),
        (status = 401, description = "No identity", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
async fn list_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HistoryRes>, ApiError> {
    let identity = caller(&headers).ok_or_else(ApiError::unauthorised)?;
    let entries = state.orchestrator.ledger().list(&identity).await?;
    Ok(Json(HistoryRes {
        entries: entries.iter().map(AnalysisEntry::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/history/{id}",
    params(
        ("id" = Uuid, Path, description = "Analysis id"),
        ("x-user-id" = String, Header, description = "Signed-in user id")
    ),
    responses(
        (status = 200, description = "One analysis", body = AnalysisEntry),
        (status = 400, description = "Malformed analysis id", body = ErrorRes),
        (status = 401, description = "No identity", body = ErrorRes),
        (status = 404, description = "No such analysis for this user", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
async fn get_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AnalysisEntry>, ApiError> {
    let identity = caller(&headers).ok_or_else(ApiError::unauthorised)?;
    let Path(id) = id.map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorRes::message(format!("invalid analysis id: {}", e.body_text())),
    })?;
    match state.orchestrator.ledger().get(&identity, id).await? {
        Some(entry) => Ok(Json(AnalysisEntry::from(&entry))),
        None => Err(ApiError {
            status: StatusCode::NOT_FOUND,
            body: ErrorRes::message(format!("no analysis {id}")),
        }),
    }
}
