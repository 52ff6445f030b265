use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;

use inbox_pulse::api::{AppState, api_routes};
use inbox_pulse::config::AnalyzerConfig;
use inbox_pulse::contacts::ContactRegistry;
use inbox_pulse::events::EventBus;
use inbox_pulse::pipeline::{Analyzer, LexicalClassifier, PatternExtractor};
use inbox_pulse::store::{LibSqlBackend, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let db_path = std::env::var("INBOX_PULSE_DB_PATH")
        .unwrap_or_else(|_| "./data/inbox-pulse.db".to_string());

    let port: u16 = std::env::var("INBOX_PULSE_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    eprintln!("📬 Inbox Pulse v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API:      http://0.0.0.0:{}/api/analyze", port);
    eprintln!("   Events:   ws://0.0.0.0:{}/ws", port);
    eprintln!("   Database: {}\n", db_path);

    // ── Store ───────────────────────────────────────────────────────
    let store: Arc<dyn Store> = Arc::new(
        LibSqlBackend::new_local(std::path::Path::new(&db_path))
            .await
            .with_context(|| format!("Failed to open database at {db_path}"))?,
    );

    // ── Analysis pipeline ───────────────────────────────────────────
    let config = AnalyzerConfig::from_env().context("Invalid analyzer configuration")?;
    let registry = Arc::new(ContactRegistry::new(Arc::clone(&store)));
    let events = EventBus::new();
    let analyzer = Arc::new(Analyzer::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        Arc::new(LexicalClassifier),
        Arc::new(PatternExtractor),
        Arc::clone(&events),
        config,
    ));

    // ── Server ──────────────────────────────────────────────────────
    let state = AppState {
        analyzer,
        registry,
        store,
        events,
    };
    let app = api_routes(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    tracing::info!(port, "Inbox Pulse server started");
    axum::serve(listener, app).await?;

    Ok(())
}
