use std::sync::Arc;
use three_line_summary::{
    api::{start_server, AppState, GatewayState},
    config::Settings,
    memory::HistoryStore,
    summarizer::GeminiClient,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    info!("🚀 Three-Line Summary - API Server");
    info!("📍 Port: {}", settings.port);
    info!("🤖 Model: {}", settings.gemini_model);

    // Refuse to start without provider credentials
    let gemini = GeminiClient::new(&settings).map_err(|e| {
        error!("{}", e);
        eprintln!("📌 Set GEMINI_API_KEY in your .env file or environment");
        e
    })?;

    let state = AppState::new(Arc::new(HistoryStore::new()), GatewayState::ready(gemini));

    info!("✅ Summarization gateway ready");
    info!("📡 Starting API server...");

    start_server(state, &settings).await?;

    Ok(())
}
