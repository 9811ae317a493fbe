use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use rapid_engine::EngineError;
use rapid_table::TableError;
use rapid_types::{DocumentError, PathError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("table error: {0}")]
    Table(#[from] TableError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Path(_) | Self::Document(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Engine(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
