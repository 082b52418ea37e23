use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{config::Provider, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub model: String,
}

/// Health check endpoint
///
/// Does not call the upstream; reports what the relay is configured to use.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let provider = match state.config.llm.provider {
        Provider::Groq => "groq",
        Provider::Mock => "mock",
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: provider.to_string(),
        model: state.config.llm.model.clone(),
    })
}
