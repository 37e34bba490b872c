use std::sync::Arc;
use std::time::Duration;

use pepperpot_db::Database;
use pepperpot_providers::{
    RecipeSearch, RoomCredentials, RoomService, SpeechSynthesizer, TextGenerator,
};
use tracing::error;

use crate::error::ApiError;
use crate::init::InitGuard;
use crate::mailer::Mailer;
use crate::rate_limit::RateLimiter;

pub type AppState = Arc<AppStateInner>;

/// Knobs that are not collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
    /// When set, cron endpoints require `Authorization: Bearer <secret>`.
    pub cron_secret: Option<String>,
    pub payment_webhook_secret: Option<String>,
    /// Pause between items of a batch generation.
    pub content_batch_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cron_secret: None,
            payment_webhook_secret: None,
            content_batch_delay: Duration::from_secs(2),
        }
    }
}

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub settings: Settings,
    pub rooms: Option<Arc<dyn RoomService>>,
    pub room_credentials: Option<RoomCredentials>,
    pub text: Option<Arc<dyn TextGenerator>>,
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
    pub recipe_search: Option<Arc<dyn RecipeSearch>>,
    pub mailer: Arc<dyn Mailer>,
    pub tts_limiter: RateLimiter,
    pub init_guard: InitGuard,
}

impl AppStateInner {
    /// State with no external providers configured. The server fills the
    /// optional collaborators in from its environment.
    pub fn new(db: Database, jwt_secret: impl Into<String>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            jwt_secret: jwt_secret.into(),
            settings: Settings::default(),
            rooms: None,
            room_credentials: None,
            text: None,
            speech: None,
            recipe_search: None,
            mailer,
            tts_limiter: RateLimiter::new(50, Duration::from_secs(3600)),
            init_guard: InitGuard::new(),
        }
    }

    pub fn text_generator(&self) -> Result<Arc<dyn TextGenerator>, ApiError> {
        self.text
            .clone()
            .ok_or_else(|| ApiError::Unavailable("Text generation is not configured".into()))
    }
}

/// Runs a blocking storage closure off the async runtime.
pub async fn with_db<F, T, E>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    ApiError: From<E>,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::from)
}
