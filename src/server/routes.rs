//! HTTP routes: `POST /getData` and `POST /chat`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, warn};

use super::context::AppContext;
use crate::types::{ChatRequest, Completion, DataRequest, LineItem};
use crate::{FinmemoError, Result};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<AppContext>,
    pub request_timeout: Duration,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/getData", post(get_data))
        .route("/chat", post(chat))
        .with_state(state)
}

async fn get_data(
    State(state): State<AppState>,
    Json(request): Json<DataRequest>,
) -> std::result::Result<Json<LineItem>, ApiError> {
    let item = with_timeout(
        state.request_timeout,
        state.ctx.financial.get_data_api(&request),
    )
    .await?;
    Ok(Json(item))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Json<Completion>, ApiError> {
    let completion =
        with_timeout(state.request_timeout, state.ctx.chat.get_chat_response(&request)).await?;
    Ok(Json(completion))
}

/// Bound a handler's work. A timed-out `getData` keeps computing in its
/// flight task, so a retry joins it or reads its cached result.
async fn with_timeout<T>(limit: Duration, work: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, work)
        .await
        .map_err(|_| FinmemoError::Internal(format!("request timed out after {limit:?}")))?
}

/// Error body returned by every route.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        self.status
    }
}

impl From<FinmemoError> for ApiError {
    fn from(err: FinmemoError) -> Self {
        let status = match &err {
            FinmemoError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            FinmemoError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let detail = if status.is_client_error() {
            warn!(error = %err, "request rejected");
            err.to_string()
        } else {
            // Store and provider details stay in the log.
            error!(error = %err, "request failed");
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "service temporarily unavailable".to_string(),
                _ => "internal server error".to_string(),
            }
        };

        Self { status, detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}
