// HTTP route handlers for the Judge API

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use judge_common::redis;
use judge_common::types::{ExecutionRequest, ExecutionResult, Language, Submission};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::metrics;
use crate::AppState;

const MAX_ATTEMPT_ID_LEN: usize = 128;

/// Which rendering of a stored result the caller wants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultView {
    /// Everything the engine produced
    #[default]
    Full,
    /// Hidden test cases keep their verdict but lose output and error text
    Candidate,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultQuery {
    #[serde(default)]
    pub view: ResultView,
}

/// Attempt ids end up in Redis keys; keep them short and boring
pub fn is_valid_attempt_id(attempt_id: &str) -> bool {
    !attempt_id.is_empty()
        && attempt_id.len() <= MAX_ATTEMPT_ID_LEN
        && attempt_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Metrics label for a caller-supplied language
fn language_label(language: &str) -> String {
    Language::from_str(language)
        .map(|l| l.to_string())
        .unwrap_or_else(|| "unsupported".to_string())
}

/// Candidate rendering of a result. Without the stored request there is no
/// way to tell visible cases from hidden ones, so every case is treated as hidden.
pub fn candidate_result(result: &ExecutionResult, request: Option<&ExecutionRequest>) -> ExecutionResult {
    match request {
        Some(request) => result.candidate_view(&request.test_cases),
        None => result.candidate_view(&[]),
    }
}

fn respond(route: &str, status: StatusCode, body: serde_json::Value) -> Response {
    metrics::record_request(route, status.as_u16());
    (status, Json(body)).into_response()
}

fn invalid_attempt_id(route: &str) -> Response {
    respond(
        route,
        StatusCode::BAD_REQUEST,
        json!({ "error": "Invalid attempt ID format" }),
    )
}

/// Attempt ids are single-use: a second submission would be judged against
/// the first one's stored result
fn already_submitted(route: &str, attempt_id: &str) -> Response {
    respond(
        route,
        StatusCode::CONFLICT,
        json!({ "error": "Attempt already submitted", "attemptId": attempt_id }),
    )
}

/// POST /attempts/:attempt_id - Queue a request for judging
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
    Json(request): Json<ExecutionRequest>,
) -> Response {
    const ROUTE: &str = "submit";

    if !is_valid_attempt_id(&attempt_id) {
        return invalid_attempt_id(ROUTE);
    }

    let language = language_label(&request.language);
    let test_cases = request.test_cases.len();
    let mut conn = state.redis.clone();

    match redis::store_request(&mut conn, &attempt_id, &request, state.result_ttl_seconds).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(attempt_id = %attempt_id, "Attempt already submitted");
            return already_submitted(ROUTE, &attempt_id);
        }
        Err(e) => {
            error!(attempt_id = %attempt_id, error = %e, "Failed to store request");
            return respond(
                ROUTE,
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("Failed to queue attempt: {}", e) }),
            );
        }
    }

    let submission = Submission {
        attempt_id: attempt_id.clone(),
        request,
    };

    match redis::push_submission(&mut conn, &submission).await {
        Ok(()) => {
            metrics::record_attempt_submitted(&language);
            info!(
                attempt_id = %attempt_id,
                language = %language,
                test_cases = test_cases,
                "Attempt queued"
            );
            respond(
                ROUTE,
                StatusCode::ACCEPTED,
                json!({ "attemptId": attempt_id, "status": "queued" }),
            )
        }
        Err(e) => {
            error!(attempt_id = %attempt_id, error = %e, "Failed to queue attempt");
            // Never queued, so the id stays free for a retry
            if let Err(e) = redis::remove_request(&mut conn, &attempt_id).await {
                warn!(attempt_id = %attempt_id, error = %e, "Failed to release attempt id");
            }
            respond(
                ROUTE,
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("Failed to queue attempt: {}", e) }),
            )
        }
    }
}

/// GET /attempts/:attempt_id - Query a judged result
pub async fn get_attempt_result(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
    Query(query): Query<ResultQuery>,
) -> Response {
    const ROUTE: &str = "result";

    if !is_valid_attempt_id(&attempt_id) {
        return invalid_attempt_id(ROUTE);
    }

    let mut conn = state.redis.clone();
    let result = match redis::get_result(&mut conn, &attempt_id).await {
        Ok(Some(result)) => result,
        Ok(None) => {
            info!(attempt_id = %attempt_id, "Attempt still pending");
            return respond(
                ROUTE,
                StatusCode::ACCEPTED,
                json!({
                    "attemptId": attempt_id,
                    "status": "pending",
                    "message": "Attempt is queued or still executing"
                }),
            );
        }
        Err(e) => {
            error!(attempt_id = %attempt_id, error = %e, "Failed to fetch result");
            return respond(
                ROUTE,
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("Failed to query attempt: {}", e) }),
            );
        }
    };

    let result = match query.view {
        ResultView::Full => result,
        ResultView::Candidate => {
            let request = match redis::get_request(&mut conn, &attempt_id).await {
                Ok(request) => request,
                Err(e) => {
                    warn!(attempt_id = %attempt_id, error = %e, "Stored request unavailable, hiding every case");
                    None
                }
            };
            candidate_result(&result, request.as_ref())
        }
    };

    info!(attempt_id = %attempt_id, score = result.score, view = ?query.view, "Result retrieved");
    metrics::record_request(ROUTE, StatusCode::OK.as_u16());
    (StatusCode::OK, Json(result)).into_response()
}

/// POST /attempts/:attempt_id/cancel - Ask the worker to stop an attempt
pub async fn cancel_attempt(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
) -> Response {
    const ROUTE: &str = "cancel";

    if !is_valid_attempt_id(&attempt_id) {
        return invalid_attempt_id(ROUTE);
    }

    let mut conn = state.redis.clone();
    match redis::request_cancellation(&mut conn, &attempt_id).await {
        Ok(()) => {
            metrics::record_attempt_cancelled("api");
            info!(attempt_id = %attempt_id, "Cancellation requested");
            respond(
                ROUTE,
                StatusCode::ACCEPTED,
                json!({ "attemptId": attempt_id, "status": "cancelling" }),
            )
        }
        Err(e) => {
            error!(attempt_id = %attempt_id, error = %e, "Failed to request cancellation");
            respond(
                ROUTE,
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("Failed to cancel attempt: {}", e) }),
            )
        }
    }
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let mut conn = state.redis.clone();
    metrics::update_queue_depth(&mut conn).await;

    match metrics::render_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}
