//! HTTP surface: one prediction route over a shared classifier.

use std::{future::Future, sync::Arc};

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::api::{PredictRequest, Prediction, TextClassifier};

/// Paths the prediction handler answers on.
pub const PREDICT_ROUTES: [&str; 2] = ["/predict", "/v1/predict"];

/// Request-time failures and the status each maps to.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("inference failed: {0}")]
    InferenceFailure(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("inference task did not complete: {0}")]
    Internal(#[from] tokio::task::JoinError),
}

impl ServeError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::InferenceFailure(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ServeError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::InvalidRequest(reason) => {
                tracing::debug!(%reason, "rejected request");
                reason.clone()
            }
            Self::InferenceFailure(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "prediction failed");
                "inference failed".to_owned()
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Builds the router with the classifier as shared state.
pub fn router<C>(classifier: Arc<C>) -> Router
where
    C: TextClassifier + 'static,
{
    PREDICT_ROUTES
        .iter()
        .fold(Router::new(), |router, path| router.route(path, post(predict::<C>)))
        .with_state(classifier)
}

/// Serves the router on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns I/O errors from the underlying listener.
pub async fn serve<C, F>(listener: TcpListener, classifier: Arc<C>, shutdown: F) -> std::io::Result<()>
where
    C: TextClassifier + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, routes = ?PREDICT_ROUTES, "listening");
    }
    axum::serve(listener, router(classifier))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn predict<C>(
    State(classifier): State<Arc<C>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Prediction>, ServeError>
where
    C: TextClassifier + 'static,
{
    let Json(PredictRequest { text }) = payload?;
    tracing::debug!(%text, "requested text");

    let prediction = tokio::task::spawn_blocking(move || classifier.classify(&text))
        .await?
        .map_err(|e| ServeError::InferenceFailure(Box::new(e)))?;

    tracing::info!(
        label = %prediction.label,
        probability = prediction.probability,
        "prediction"
    );
    Ok(Json(prediction))
}
