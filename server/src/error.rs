use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} is required")]
    MissingParam(&'static str),

    #[error("Internal error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::MissingParam(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Store(ref err) => {
                // Diagnostic detail stays server-side.
                error!("request failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error. Check logs.".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
