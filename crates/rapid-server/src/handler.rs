use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;

use rapid_engine::{DocumentStore, EngineResult};
use rapid_types::{Document, StorePath, PATH_FIELD};

use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
}

impl AppState {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Run an engine call on the blocking pool; table round trips are
    /// synchronous.
    async fn run<T, F>(&self, op: F) -> ServerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DocumentStore) -> EngineResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| ServerError::Internal(format!("engine task failed: {e}")))?
            .map_err(ServerError::from)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.store.config();
    Json(json!({
        "name": "rapid-server",
        "version": env!("CARGO_PKG_VERSION"),
        "partition": config.partition,
        "max_depth": config.max_depth,
    }))
}

/// Every path outside the reserved `/_*` routes addresses documents.
pub async fn document_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> ServerResult<Response> {
    match method {
        Method::GET => read(&state, parse_path(&uri)?).await,
        Method::POST | Method::PUT => write(&state, parse_path(&uri)?, &body).await,
        Method::DELETE => delete(&state, parse_path(&uri)?).await,
        other => Err(ServerError::MethodNotAllowed(other.to_string())),
    }
}

fn parse_path(uri: &Uri) -> ServerResult<StorePath> {
    Ok(StorePath::parse(uri.path())?)
}

async fn read(state: &AppState, path: StorePath) -> ServerResult<Response> {
    let outcome = state.run(move |store| store.read(&path)).await?;
    match outcome.to_json() {
        Some(body) => Ok(Json(body).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

async fn write(state: &AppState, path: StorePath, body: &[u8]) -> ServerResult<Response> {
    let json: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ServerError::InvalidBody(e.to_string()))?;
    let mut document = Document::from_json(json)?;
    document.remove(PATH_FIELD);

    let stored = state.run(move |store| store.write(&path, document)).await?;
    Ok(Json(stored.to_json()).into_response())
}

async fn delete(state: &AppState, path: StorePath) -> ServerResult<Response> {
    state.run(move |store| store.delete(&path)).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
