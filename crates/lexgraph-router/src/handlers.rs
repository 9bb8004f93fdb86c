//! HTTP request handlers for the Router service.
//!
//! Exposes the conflict engine's read-only queries as JSON endpoints using axum.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use lexgraph_domain::{CaseId, CaseStore, ConflictFinding, ConflictPredictor, Prediction, RiskScore};
use lexgraph_engine::{ConflictEngine, EngineError, EngineMetrics, ExplainRequest, Explanation, PredictionReport};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
pub struct AppState<S, P> {
    /// Conflict engine shared by all requests
    pub engine: Arc<ConflictEngine<S, P>>,
    /// Deadline applied to every engine call
    pub request_timeout: Duration,
}

impl<S, P> Clone for AppState<S, P> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

/// Query parameters for the conflicts endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ConflictsQuery {
    /// Also fetch advisory predictions
    #[serde(default)]
    pub predictions: bool,
}

/// Conflicts response
#[derive(Debug, Serialize, Deserialize)]
pub struct ConflictsResponse {
    /// Case
    pub case_id: CaseId,
    /// Snapshot version the findings were computed on
    pub version: u64,
    /// Deterministic findings
    pub findings: Vec<ConflictFinding>,
    /// Aggregate risk of the findings
    pub risk: RiskScore,
    /// Advisory predictions, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<Prediction>>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Number of cases with a cache slot
    pub cached_cases: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code, e.g. "NOT_FOUND"
    pub error: String,
    /// Human-readable detail
    pub message: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Engine-reported error
    Engine(EngineError),
    /// The request deadline passed
    Timeout(Duration),
}

impl AppError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Engine(e) => match e {
                EngineError::NotFound(_) | EngineError::NoPath { .. } => StatusCode::NOT_FOUND,
                EngineError::NotRelated { .. } => StatusCode::BAD_REQUEST,
                EngineError::TooLarge { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Engine(e) => e.code(),
            AppError::Timeout(_) => "TIMEOUT",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Engine(e) => e.to_string(),
            AppError::Timeout(limit) => format!("Request exceeded {}s deadline", limit.as_secs()),
        };

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), code = self.code(), error = %message, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), code = self.code(), error = %message, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });
        (status, body).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::Engine(e)
    }
}

/// Run an engine call under the request deadline
///
/// Dropping the engine future on timeout releases any build lock it holds.
async fn with_deadline<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::Timeout(limit)),
    }
}

impl<S, P> AppState<S, P>
where
    S: CaseStore + Send + Sync + 'static,
    S::Error: Send + 'static,
    P: ConflictPredictor + Send + Sync + 'static,
    P::Error: Send + 'static,
{
    /// Create application state around an engine
    pub fn new(engine: Arc<ConflictEngine<S, P>>, request_timeout: Duration) -> Self {
        Self {
            engine,
            request_timeout,
        }
    }

    /// GET /health - Liveness and cache occupancy
    async fn health_check(State(state): State<Self>) -> Json<HealthCheckResponse> {
        Json(HealthCheckResponse {
            status: "healthy".to_string(),
            cached_cases: state.engine.metrics().cached_cases,
        })
    }

    /// GET /cases/:case_id/graph - Current snapshot
    async fn graph(State(state): State<Self>, Path(case_id): Path<String>) -> Result<Response, AppError> {
        let case_id = CaseId::from(case_id);
        let snapshot = with_deadline(state.request_timeout, state.engine.get_graph(&case_id)).await?;
        Ok(Json(snapshot.as_ref()).into_response())
    }

    /// GET /cases/:case_id/conflicts - Findings and risk, optionally with predictions
    ///
    /// A predictor failure fails the whole request when predictions are asked for.
    async fn conflicts(
        State(state): State<Self>,
        Path(case_id): Path<String>,
        Query(query): Query<ConflictsQuery>,
    ) -> Result<Json<ConflictsResponse>, AppError> {
        let case_id = CaseId::from(case_id);
        let engine = &state.engine;

        // Findings and predictions come from one snapshot
        let (report, predictions) = with_deadline(state.request_timeout, async {
            if query.predictions {
                let (report, predictions) = engine.get_conflicts_with_predictions(&case_id).await?;
                Ok::<_, EngineError>((report, Some(predictions.predictions)))
            } else {
                Ok::<_, EngineError>((engine.get_conflicts(&case_id).await?, None))
            }
        })
        .await?;

        Ok(Json(ConflictsResponse {
            case_id: report.case_id,
            version: report.version,
            findings: report.findings,
            risk: report.risk,
            predictions,
        }))
    }

    /// POST /cases/:case_id/explain - Shortest path between two related entities
    async fn explain(
        State(state): State<Self>,
        Path(case_id): Path<String>,
        Json(request): Json<ExplainRequest>,
    ) -> Result<Json<Explanation>, AppError> {
        let case_id = CaseId::from(case_id);
        let explanation = with_deadline(
            state.request_timeout,
            state.engine.explain_conflict(&case_id, request),
        )
        .await?;
        Ok(Json(explanation))
    }

    /// GET /cases/:case_id/predictions - Advisory predictions only
    async fn predictions(
        State(state): State<Self>,
        Path(case_id): Path<String>,
    ) -> Result<Json<PredictionReport>, AppError> {
        let case_id = CaseId::from(case_id);
        let report = with_deadline(state.request_timeout, state.engine.get_predictions(&case_id)).await?;
        Ok(Json(report))
    }

    /// GET /metrics - Engine counters
    async fn metrics(State(state): State<Self>) -> Json<EngineMetrics> {
        Json(state.engine.metrics())
    }
}

/// Create the axum router with all routes
pub fn create_router<S, P>(state: AppState<S, P>) -> AxumRouter
where
    S: CaseStore + Send + Sync + 'static,
    S::Error: Send + 'static,
    P: ConflictPredictor + Send + Sync + 'static,
    P::Error: Send + 'static,
{
    AxumRouter::new()
        .route("/health", get(AppState::<S, P>::health_check))
        .route("/cases/:case_id/graph", get(AppState::<S, P>::graph))
        .route("/cases/:case_id/conflicts", get(AppState::<S, P>::conflicts))
        .route("/cases/:case_id/explain", post(AppState::<S, P>::explain))
        .route("/cases/:case_id/predictions", get(AppState::<S, P>::predictions))
        .route("/metrics", get(AppState::<S, P>::metrics))
        .with_state(state)
}
