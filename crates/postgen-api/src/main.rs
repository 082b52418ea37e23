use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use postgen_api::{
    build_router,
    config::{Config, Provider},
    AppState,
};
use postgen_llm::{ChatClient, GroqClient, GroqConfig, ScriptedClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting postgen relay");
    tracing::info!(
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "Config loaded: {}",
        config.server.addr()
    );

    let llm_client = build_llm_client(&config)?;
    let state = Arc::new(AppState::new(config.clone(), llm_client));
    let app = build_router(state);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn build_llm_client(config: &Config) -> anyhow::Result<Arc<dyn ChatClient>> {
    match config.llm.provider {
        Provider::Groq => {
            let mut groq = GroqConfig::new(config.groq_api_key.clone());
            if let Some(base_url) = &config.llm.base_url {
                groq = groq.with_base_url(base_url.clone());
            }
            Ok(Arc::new(GroqClient::new(groq)?))
        }
        Provider::Mock => {
            tracing::warn!("Using mock provider, responses echo the prompt");
            Ok(Arc::new(
                ScriptedClient::echo().with_delay(std::time::Duration::from_millis(40)),
            ))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
