pub mod chat;
pub mod stream;

use axum::{extract::rejection::JsonRejection, Json};
use postgen_types::GenerateRequest;

use crate::error::{ApiError, ApiResult};

/// Reject unreadable bodies and blank prompts with a 400
pub(crate) fn validate_request(
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<GenerateRequest> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    Ok(request)
}
