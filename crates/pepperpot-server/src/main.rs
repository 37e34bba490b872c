use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use pepperpot_api::mailer::LogMailer;
use pepperpot_api::rate_limit::RateLimiter;
use pepperpot_api::{AppState, AppStateInner, content, router};
use pepperpot_providers::{
    LiveKitClient, OpenAiSpeechClient, OpenRouterClient, RoomCredentials, SpoonacularClient,
};
use pepperpot_server::config::Config;
use pepperpot_server::scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pepperpot=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let db = pepperpot_db::Database::open(&config.db_path)?;
    info!(path = %config.db_path.display(), "Database ready");

    let state = build_state(db, &config);

    if config.auto_init_content {
        tokio::spawn(content::auto_init(state.clone()));
    }
    if let Some(every) = config.content_schedule {
        info!(minutes = every.as_secs() / 60, "Content schedule enabled");
        tokio::spawn(scheduler::run_content_schedule(state.clone(), every));
    }

    let app = router(state);

    info!("Pepperpot server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn build_state(db: pepperpot_db::Database, config: &Config) -> AppState {
    let mailer = Arc::new(LogMailer::new(config.public_url.clone()));
    let mut inner = AppStateInner::new(db, config.jwt_secret.clone(), mailer);

    inner.settings.cron_secret = config.cron_secret.clone();
    inner.settings.payment_webhook_secret = config.payment_webhook_secret.clone();
    inner.settings.content_batch_delay = config.content_batch_delay;
    inner.tts_limiter = RateLimiter::new(config.tts_rate_limit, config.tts_rate_window);

    match &config.rooms {
        Some(rooms) => {
            let credentials = RoomCredentials::new(rooms.api_key.clone(), rooms.api_secret.clone());
            inner.rooms = Some(Arc::new(LiveKitClient::new(&rooms.url, credentials.clone())));
            inner.room_credentials = Some(credentials);
        }
        None => warn!("Room provider not configured; live sessions are disabled"),
    }

    match &config.openrouter_api_key {
        Some(key) => {
            inner.text = Some(Arc::new(OpenRouterClient::new(
                key.clone(),
                config.openrouter_model.clone(),
            )));
        }
        None => warn!("OPENROUTER_API_KEY not set; content generation is disabled"),
    }

    match &config.tts_api_key {
        Some(key) => {
            inner.speech = Some(Arc::new(OpenAiSpeechClient::new(
                key.clone(),
                config.tts_voice.clone(),
            )));
        }
        None => warn!("TTS_API_KEY not set; text-to-speech is disabled"),
    }

    if let Some(key) = &config.recipe_search_api_key {
        inner.recipe_search = Some(Arc::new(SpoonacularClient::new(key.clone())));
    }

    Arc::new(inner)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
