use std::sync::Arc;
use postgen_llm::ChatClient;
use crate::config::Config;

/// Shared application state passed to all handlers
///
/// Built once at startup; the upstream client is injected so tests can
/// substitute a scripted backend.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm_client: Arc<dyn ChatClient>,
}

impl AppState {
    pub fn new(config: Config, llm_client: Arc<dyn ChatClient>) -> Self {
        Self {
            config: Arc::new(config),
            llm_client,
        }
    }
}
