use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Secrets that ship in sample files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me", "secret"];

pub struct RoomsConfig {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
}

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub public_url: String,
    pub cron_secret: Option<String>,
    pub payment_webhook_secret: Option<String>,
    pub rooms: Option<RoomsConfig>,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: Option<String>,
    pub tts_api_key: Option<String>,
    pub tts_voice: Option<String>,
    pub recipe_search_api_key: Option<String>,
    pub tts_rate_limit: u32,
    pub tts_rate_window: Duration,
    pub content_batch_delay: Duration,
    /// Interval of the in-process content scheduler; `None` leaves scheduling
    /// to the external cron endpoints.
    pub content_schedule: Option<Duration>,
    pub auto_init_content: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("PEPPERPOT_JWT_SECRET").context("PEPPERPOT_JWT_SECRET must be set")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PEPPERPOT_JWT_SECRET is a placeholder value; set a real secret");
        }

        let host = var("PEPPERPOT_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(var("PEPPERPOT_PORT"), "PEPPERPOT_PORT", 3000)?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        let rooms = match (var("ROOMS_URL"), var("ROOMS_API_KEY"), var("ROOMS_API_SECRET")) {
            (Some(url), Some(api_key), Some(api_secret)) => Some(RoomsConfig {
                url,
                api_key,
                api_secret,
            }),
            (None, None, None) => None,
            _ => bail!("ROOMS_URL, ROOMS_API_KEY and ROOMS_API_SECRET must be set together"),
        };

        let schedule_minutes: u64 = parse_or(var("CONTENT_SCHEDULE_MINUTES"), "CONTENT_SCHEDULE_MINUTES", 0)?;

        Ok(Self {
            addr,
            db_path: PathBuf::from(var("PEPPERPOT_DB_PATH").unwrap_or_else(|| "pepperpot.db".into())),
            jwt_secret,
            public_url: var("PEPPERPOT_PUBLIC_URL").unwrap_or_else(|| format!("http://localhost:{port}")),
            cron_secret: var("CRON_SECRET"),
            payment_webhook_secret: var("PAYMENT_WEBHOOK_SECRET"),
            rooms,
            openrouter_api_key: var("OPENROUTER_API_KEY"),
            openrouter_model: var("OPENROUTER_MODEL"),
            tts_api_key: var("TTS_API_KEY"),
            tts_voice: var("TTS_VOICE"),
            recipe_search_api_key: var("RECIPE_SEARCH_API_KEY"),
            tts_rate_limit: parse_or(var("TTS_RATE_LIMIT"), "TTS_RATE_LIMIT", 50)?,
            tts_rate_window: Duration::from_secs(parse_or(
                var("TTS_RATE_WINDOW_SECS"),
                "TTS_RATE_WINDOW_SECS",
                3600,
            )?),
            content_batch_delay: Duration::from_millis(parse_or(
                var("CONTENT_BATCH_DELAY_MS"),
                "CONTENT_BATCH_DELAY_MS",
                2000,
            )?),
            content_schedule: (schedule_minutes > 0).then(|| Duration::from_secs(schedule_minutes * 60)),
            auto_init_content: parse_flag(var("AUTO_INIT_CONTENT"), "AUTO_INIT_CONTENT")?,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw.parse().with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>, key: &str) -> anyhow::Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => bail!("invalid {key}: {other:?}"),
    }
}
