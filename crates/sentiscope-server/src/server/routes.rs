use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use sentiscope_classifiers::ClassificationResult;
use serde_json::{json, Value};
use tracing::warn;

// ============================================================================
// Pages
// ============================================================================

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let html = state
        .pages
        .render_index(state.service.languages())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Html(html))
}

// ============================================================================
// Classification API
// ============================================================================

/// Fields read from a classify request body
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClassifyRequest {
    pub text: Option<String>,
    pub lang: Option<String>,
}

impl ClassifyRequest {
    /// Read `text` and `lang` from any body. Invalid JSON, a non-object or a
    /// non-string field all count as the field being absent.
    pub fn from_body(body: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

        Self {
            text: field("text"),
            lang: field("lang"),
        }
    }
}

pub async fn classify(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ClassificationResult>, AppError> {
    metrics::counter!("sentiscope_requests_total", "endpoint" => "classify").increment(1);

    let request = ClassifyRequest::from_body(&body);
    let text = request.text.unwrap_or_default();

    match state.service.classify(&text, request.lang.as_deref()).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            metrics::counter!("sentiscope_classification_errors_total", "kind" => err.kind())
                .increment(1);
            if !err.is_invalid_input() {
                warn!(error = %err, "Classification failed");
            }
            Err(err.into())
        }
    }
}

pub async fn languages(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.service.cache();
    let table = cache.languages();

    let languages: Vec<_> = table
        .iter()
        .map(|language| {
            json!({
                "code": language.code,
                "name": language.name,
                "loaded": cache.is_loaded(&language.code),
            })
        })
        .collect();

    Json(json!({
        "default": table.default_code(),
        "languages": languages,
    }))
}

// ============================================================================
// Operational endpoints
// ============================================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "loaded_languages": state.service.cache().loaded_languages(),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

pub async fn fallback() -> AppError {
    AppError::NotFound
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    ClassificationFailed(String),
    NotFound,
    Internal(String),
}

impl From<sentiscope_core::Error> for AppError {
    fn from(err: sentiscope_core::Error) -> Self {
        match err {
            sentiscope_core::Error::InvalidInput(msg) => AppError::InvalidRequest(msg),
            other => AppError::ClassificationFailed(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ClassificationFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Classification failed: {}", msg),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
