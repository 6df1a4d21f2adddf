use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use whodrather::{
    config::{GameConfig, ServerConfig},
    hub::ChatHub,
    questions::{QuestionSource, RemoteQuestions, StaticQuestions},
    state::AppState,
    ws,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whodrather=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Who'd Rather...");

    let game_config = GameConfig::from_env();
    let server_config = ServerConfig::from_env();
    tracing::info!(
        "Trigger \"{}\", sign-up {:?}, voting {:?}, up to {} round(s)",
        game_config.trigger,
        game_config.sign_up_window,
        game_config.voting_window,
        game_config.max_rounds
    );

    let questions: Arc<dyn QuestionSource> = match &server_config.questions_url {
        Some(url) => {
            tracing::info!("Fetching questions from {}", url);
            Arc::new(RemoteQuestions::new(url.clone()))
        }
        None => {
            tracing::info!("Using built-in questions");
            Arc::new(StaticQuestions::default())
        }
    };

    let state = Arc::new(AppState::new(
        ChatHub::new("Who'd Rather"),
        questions,
        game_config,
    ));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
