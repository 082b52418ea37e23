use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use postgen_types::{FailureResponse, PROCESSING_FAILURE};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upstream failed before any byte of the response was committed.
    /// Auth, network and upstream rejection all land here.
    #[error("Upstream error: {0}")]
    Upstream(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Upstream(ref e) => {
                tracing::error!("Upstream error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILURE.to_string())
            }
        };

        let body = Json(FailureResponse {
            error: message,
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
