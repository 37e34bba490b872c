#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use pepperpot_api::mailer::Mailer;
use pepperpot_api::{AppState, AppStateInner, auth::create_token, router};
use pepperpot_db::Database;
use pepperpot_providers::{
    ChatMessage, ProviderError, RecipeSearch, RoomCredentials, RoomHandle, RoomService,
    SpeechSynthesizer, TextGenerator,
};
use pepperpot_types::api::ExternalRecipe;
use pepperpot_types::models::UserRole;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const ROOM_KEY: &str = "room-key";
pub const ROOM_SECRET: &str = "room-secret";

// -- Fakes --

#[derive(Default)]
pub struct RecordingMailer {
    pub verifications: Mutex<Vec<(String, String)>>,
    pub resets: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification(&self, email: &str, _name: Option<&str>, token: &str) -> anyhow::Result<()> {
        self.verifications.lock().unwrap().push((email.into(), token.into()));
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> anyhow::Result<()> {
        self.resets.lock().unwrap().push((email.into(), token.into()));
        Ok(())
    }
}

/// Answers every completion with a numbered item, or fails on the listed calls.
#[derive(Default)]
pub struct FakeText {
    pub calls: AtomicUsize,
    pub fail_calls: Vec<usize>,
}

impl FakeText {
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_calls: calls.to_vec(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn complete(&self, _messages: &[ChatMessage], _temperature: f32) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_calls.contains(&n) {
            return Err(ProviderError::Malformed("fake failure".into()));
        }
        Ok(format!(
            "Sure! Here you go:\n{{\"title\": \"Generated Item {n}\", \"content\": \"Line one\nline two\", \"summary\": \"Short summary\"}}"
        ))
    }
}

#[derive(Default)]
pub struct FakeRooms {
    pub created: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_create: bool,
}

#[async_trait]
impl RoomService for FakeRooms {
    async fn create_room(&self, name: &str) -> Result<RoomHandle, ProviderError> {
        if self.fail_create {
            return Err(ProviderError::Malformed("room service down".into()));
        }
        self.created.lock().unwrap().push(name.to_string());
        Ok(RoomHandle {
            name: name.to_string(),
            sid: Some(format!("RM_{name}")),
        })
    }

    async fn delete_room(&self, name: &str) -> Result<(), ProviderError> {
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

pub struct FakeSpeech;

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn synthesize(&self, text: &str, _voice: Option<&str>) -> Result<Vec<u8>, ProviderError> {
        Ok(text.as_bytes().to_vec())
    }
}

pub struct FakeRecipes {
    pub queries: Mutex<Vec<(String, u32)>>,
}

#[async_trait]
impl RecipeSearch for FakeRecipes {
    async fn search(&self, query: &str, number: u32) -> Result<Vec<ExternalRecipe>, ProviderError> {
        self.queries.lock().unwrap().push((query.to_string(), number));
        Ok((0..number)
            .map(|i| ExternalRecipe {
                external_id: i as i64 + 1,
                title: format!("{query} #{i}"),
                image: None,
                summary: None,
                ready_in_minutes: Some(30),
                servings: Some(2),
                source_url: None,
            })
            .collect())
    }
}

// -- Harness --

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub mailer: Arc<RecordingMailer>,
    pub rooms: Arc<FakeRooms>,
    pub text: Arc<FakeText>,
    pub recipes: Arc<FakeRecipes>,
}

pub struct TestAppBuilder {
    text: FakeText,
    rooms: FakeRooms,
    cron_secret: Option<String>,
    payment_secret: Option<String>,
    tts_limit: Option<u32>,
}

impl TestAppBuilder {
    pub fn text(mut self, text: FakeText) -> Self {
        self.text = text;
        self
    }

    pub fn rooms(mut self, rooms: FakeRooms) -> Self {
        self.rooms = rooms;
        self
    }

    pub fn cron_secret(mut self, secret: &str) -> Self {
        self.cron_secret = Some(secret.into());
        self
    }

    pub fn payment_secret(mut self, secret: &str) -> Self {
        self.payment_secret = Some(secret.into());
        self
    }

    pub fn tts_limit(mut self, limit: u32) -> Self {
        self.tts_limit = Some(limit);
        self
    }

    pub fn build(self) -> TestApp {
        let db = Database::open_in_memory().unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let rooms = Arc::new(self.rooms);
        let text = Arc::new(self.text);
        let recipes = Arc::new(FakeRecipes {
            queries: Mutex::new(Vec::new()),
        });

        let mut inner = AppStateInner::new(db, JWT_SECRET, mailer.clone());
        inner.settings.content_batch_delay = Duration::ZERO;
        inner.settings.cron_secret = self.cron_secret;
        inner.settings.payment_webhook_secret = self.payment_secret;
        inner.rooms = Some(rooms.clone());
        inner.room_credentials = Some(RoomCredentials::new(ROOM_KEY, ROOM_SECRET));
        inner.text = Some(text.clone());
        inner.speech = Some(Arc::new(FakeSpeech));
        inner.recipe_search = Some(recipes.clone());
        if let Some(limit) = self.tts_limit {
            inner.tts_limiter = pepperpot_api::rate_limit::RateLimiter::new(limit, Duration::from_secs(3600));
        }

        let state: AppState = Arc::new(inner);
        TestApp {
            router: router(state.clone()),
            state,
            mailer,
            rooms,
            text,
            recipes,
        }
    }
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            text: FakeText::default(),
            rooms: FakeRooms::default(),
            cron_secret: None,
            payment_secret: None,
            tts_limit: None,
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Creates a user directly in storage and returns (id, bearer token).
    pub fn user(&self, email: &str) -> (String, String) {
        let id = Uuid::new_v4().to_string();
        self.db().create_user(&id, email, Some(email), None).unwrap();
        let row = self.db().get_user_by_id(&id).unwrap().unwrap();
        let token = create_token(JWT_SECRET, &row).unwrap();
        (id, token)
    }

    pub fn admin(&self, email: &str) -> (String, String) {
        let (id, token) = self.user(email);
        self.db().set_user_role(&id, UserRole::Admin).unwrap();
        (id, token)
    }

    pub fn influencer(&self, email: &str) -> (String, String) {
        let (id, token) = self.user(email);
        self.db().upsert_influencer_profile(&id, email, None).unwrap();
        (id, token)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }
}
