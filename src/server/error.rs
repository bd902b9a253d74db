use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::slack::SignatureError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("request signature rejected: {0}")]
    Unauthorized(#[from] SignatureError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
