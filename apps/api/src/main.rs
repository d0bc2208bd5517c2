mod auth;
mod config;
mod errors;
mod llm_client;
mod pipeline;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod visitors;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{JwksVerifier, TokenVerifier};
use crate::config::Config;
use crate::llm_client::{AnthropicGateway, CompletionModel};
use crate::pipeline::ResumePipeline;
use crate::routes::build_router;
use crate::state::AppState;
use crate::visitors::VisitorCounter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobify API v{}", env!("CARGO_PKG_VERSION"));

    std::fs::create_dir_all(&config.upload_dir)?;
    info!("Staging uploads in {}", config.upload_dir.display());

    // A missing key is not fatal: the resume endpoint reports it per request
    let model: Option<Arc<dyn CompletionModel>> = match AnthropicGateway::new(&config.model) {
        Ok(gateway) => {
            info!("LLM client initialized (model: {})", gateway.model());
            Some(Arc::new(gateway) as Arc<dyn CompletionModel>)
        }
        Err(e) => {
            warn!("{e}; resume processing will fail until ANTHROPIC_API_KEY is set");
            None
        }
    };

    let auth: Option<Arc<dyn TokenVerifier>> = match JwksVerifier::from_settings(&config.auth) {
        Some(verifier) => Some(Arc::new(verifier) as Arc<dyn TokenVerifier>),
        None => {
            warn!("AUTH0_DOMAIN/AUTH0_AUDIENCE not set; protected routes will reject every request");
            None
        }
    };

    let visitors = Arc::new(VisitorCounter::load(config.visitor_count_file.clone()).await?);

    let state = AppState {
        pipeline: ResumePipeline::new(config.upload_dir.clone(), model),
        auth,
        visitors,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
