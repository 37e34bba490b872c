use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use pepperpot_types::models::RoomRole;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{ProviderError, check_status};

const SERVICE: &str = "room hosting";
const ACCESS_TOKEN_TTL_SECS: i64 = 6 * 60 * 60;
const ADMIN_TOKEN_TTL_SECS: i64 = 10 * 60;
const ROOM_EMPTY_TIMEOUT_SECS: u32 = 10 * 60;
const ROOM_MAX_PARTICIPANTS: u32 = 100;

/// A room as reported by the hosting provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomHandle {
    pub name: String,
    pub sid: Option<String>,
}

#[async_trait]
pub trait RoomService: Send + Sync {
    async fn create_room(&self, name: &str) -> Result<RoomHandle, ProviderError>;
    async fn delete_room(&self, name: &str) -> Result<(), ProviderError>;
}

/// `live_<user>_<millis>_<random>`, unique enough to never collide in practice.
pub fn generate_room_name(user_id: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("live_{}_{}_{}", user_id, Utc::now().timestamp_millis(), suffix)
}

// -- Tokens --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default)]
    pub room_join: bool,
    #[serde(default)]
    pub room_create: bool,
    #[serde(default)]
    pub can_publish: bool,
    #[serde(default)]
    pub can_publish_data: bool,
    #[serde(default)]
    pub can_subscribe: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

#[derive(Debug, Deserialize)]
struct WebhookClaims {
    sha256: String,
}

/// Who is joining which room, and in what capacity.
#[derive(Debug, Clone, Copy)]
pub struct RoomGrant<'a> {
    pub room_name: &'a str,
    pub identity: &'a str,
    pub display_name: Option<&'a str>,
    pub role: RoomRole,
}

/// API key pair shared with the room provider. Tokens are minted and webhook
/// signatures checked locally.
#[derive(Clone)]
pub struct RoomCredentials {
    api_key: String,
    api_secret: String,
}

impl RoomCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Join token. Hosts and co-hosts may publish media; everyone may chat.
    pub fn access_token(&self, grant: &RoomGrant<'_>) -> Result<String, ProviderError> {
        let video = VideoGrant {
            room: Some(grant.room_name.to_string()),
            room_join: true,
            room_create: false,
            can_publish: grant.role.can_publish(),
            can_publish_data: true,
            can_subscribe: true,
        };
        self.sign(grant.identity, grant.display_name, video, ACCESS_TOKEN_TTL_SECS)
    }

    fn admin_token(&self) -> Result<String, ProviderError> {
        let video = VideoGrant {
            room_create: true,
            ..Default::default()
        };
        self.sign(&self.api_key, None, video, ADMIN_TOKEN_TTL_SECS)
    }

    fn sign(
        &self,
        identity: &str,
        name: Option<&str>,
        video: VideoGrant,
        ttl_secs: i64,
    ) -> Result<String, ProviderError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            name: name.map(str::to_string),
            nbf: now,
            exp: now + ttl_secs,
            video,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )?)
    }

    pub fn decode_access_token(&self, token: &str) -> Result<AccessClaims, ProviderError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.api_key]);
        let data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.api_secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }

    /// Checks a webhook `Authorization` header: an HS256 token issued with our
    /// key whose `sha256` claim is the base64 SHA-256 of the raw body.
    pub fn verify_webhook(&self, authorization: &str, body: &[u8]) -> Result<(), ProviderError> {
        let token = authorization
            .strip_prefix("Bearer ")
            .unwrap_or(authorization)
            .trim();
        if token.is_empty() {
            return Err(ProviderError::Verification("missing authorization"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.api_key]);
        let claims = decode::<WebhookClaims>(
            token,
            &DecodingKey::from_secret(self.api_secret.as_bytes()),
            &validation,
        )?
        .claims;

        let digest = STANDARD.encode(Sha256::digest(body));
        if digest != claims.sha256 {
            return Err(ProviderError::Verification("body digest mismatch"));
        }
        Ok(())
    }
}

// -- HTTP client --

pub struct LiveKitClient {
    http: reqwest::Client,
    base_url: String,
    credentials: RoomCredentials,
}

impl LiveKitClient {
    /// `url` may be the websocket URL handed to clients; it is rewritten to
    /// the matching HTTP origin for server calls.
    pub fn new(url: &str, credentials: RoomCredentials) -> Self {
        let base_url = if let Some(rest) = url.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = url.strip_prefix("ws://") {
            format!("http://{rest}")
        } else {
            url.to_string()
        };
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http
            .post(format!("{}/twirp/livekit.RoomService/{}", self.base_url, method))
            .bearer_auth(self.credentials.admin_token()?)
            .json(body)
            .send()
            .await?;
        check_status(SERVICE, response).await
    }
}

#[derive(Serialize)]
struct CreateRoomRequest<'a> {
    name: &'a str,
    empty_timeout: u32,
    max_participants: u32,
}

#[derive(Deserialize)]
struct RoomResponse {
    name: String,
    #[serde(default)]
    sid: Option<String>,
}

#[derive(Serialize)]
struct DeleteRoomRequest<'a> {
    room: &'a str,
}

#[async_trait]
impl RoomService for LiveKitClient {
    async fn create_room(&self, name: &str) -> Result<RoomHandle, ProviderError> {
        let response = self
            .call(
                "CreateRoom",
                &CreateRoomRequest {
                    name,
                    empty_timeout: ROOM_EMPTY_TIMEOUT_SECS,
                    max_participants: ROOM_MAX_PARTICIPANTS,
                },
            )
            .await?;
        let room: RoomResponse = response.json().await?;
        info!(room = %room.name, "Room created");
        Ok(RoomHandle {
            name: room.name,
            sid: room.sid,
        })
    }

    async fn delete_room(&self, name: &str) -> Result<(), ProviderError> {
        self.call("DeleteRoom", &DeleteRoomRequest { room: name }).await?;
        info!(room = %name, "Room deleted");
        Ok(())
    }
}
