use axum::{extract::rejection::JsonRejection, extract::State, Json};
use postgen_llm::ChatRequest;
use postgen_types::{GenerateRequest, GenerateResponse};
use std::sync::Arc;
use tracing::Instrument;

use super::validate_request;
use crate::{error::ApiResult, state::AppState};

/// Generate a post and return it once the completion is available
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateResponse>> {
    let request = validate_request(payload)?;
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("generate", %request_id);

    let chat_request = ChatRequest::single_user(&state.config.llm.model, request.message);
    let response = state
        .llm_client
        .chat(chat_request)
        .instrument(span.clone())
        .await?;

    let text = response.content.unwrap_or_default();
    span.in_scope(|| tracing::info!(chars = text.len(), "Completion returned"));

    Ok(Json(GenerateResponse {
        response: text,
        status: 200,
    }))
}
