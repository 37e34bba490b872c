use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use pepperpot_db::models::UserRow;
use pepperpot_types::api::{
    Ack, Claims, ForgotPasswordRequest, InfluencerProfile, InfluencerProfileRequest, LoginRequest,
    LoginResponse, ProfileResponse, ResetPasswordRequest, SignupRequest, SignupResponse,
    VerifyEmailRequest,
};

use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody};
use crate::state::{AppState, with_db};

const MIN_PASSWORD_LEN: usize = 8;
const VERIFY_TOKEN_TTL_HOURS: i64 = 24;
const RESET_TOKEN_TTL_HOURS: i64 = 1;
const SESSION_TTL_DAYS: i64 = 30;

const RESET_SENT: &str = "If an account with that email exists, a password reset link has been sent.";

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password) = match (non_empty(req.email), req.password.filter(|p| !p.is_empty())) {
        (Some(email), Some(password)) => (email.to_lowercase(), password),
        _ => return Err(ApiError::validation("Email and password are required")),
    };
    check_password(&password)?;
    let name = non_empty(req.name);

    let password_hash = hash_password(&password)?;
    let token = random_token();
    let expires_at = Utc::now() + Duration::hours(VERIFY_TOKEN_TTL_HOURS);

    let user_id = Uuid::new_v4().to_string();
    {
        let (email, name, token) = (email.clone(), name.clone(), token.clone());
        with_db(&state, move |db| {
            if db.get_user_by_email(&email)?.is_some() {
                return Err(ApiError::validation("User with this email already exists"));
            }
            db.create_user(&user_id, &email, name.as_deref(), Some(&password_hash))
                .map_err(|e| {
                    if pepperpot_db::is_unique_violation(&e) {
                        ApiError::validation("User with this email already exists")
                    } else {
                        ApiError::Internal(e)
                    }
                })?;
            db.create_verification_token(&email, &token, expires_at)?;
            Ok(())
        })
        .await?;
    }

    if let Err(e) = state.mailer.send_verification(&email, name.as_deref(), &token).await {
        warn!(email = %email, "Verification email failed: {:#}", e);
    }
    info!(email = %email, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            message: "Account created! Please check your email to verify your account.".into(),
            email,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    let user = with_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    // Accounts created through a third-party provider have no password.
    let stored = user.password.as_deref().ok_or(ApiError::Unauthenticated)?;
    let parsed_hash = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {e}")))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthenticated)?;

    let token = create_token(&state.jwt_secret, &user)?;
    Ok(Json(LoginResponse {
        user_id: user.id,
        token,
    }))
}

pub async fn verify_email(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VerifyEmailRequest>,
) -> Result<Json<Ack>, ApiError> {
    let token = non_empty(req.token).ok_or_else(|| ApiError::validation("Verification token is required"))?;

    with_db(&state, move |db| {
        let record = db
            .get_verification_token(&token)?
            .ok_or_else(|| ApiError::validation("Invalid verification token"))?;

        if record.expires_at < Utc::now() {
            db.delete_verification_token(&token)?;
            return Err(ApiError::validation(
                "Verification token has expired. Please sign up again.",
            ));
        }

        if !db.mark_email_verified(&record.identifier, Utc::now())? {
            return Err(ApiError::not_found("User not found"));
        }
        db.delete_verification_token(&token)?;
        Ok(())
    })
    .await?;

    Ok(Json(Ack::new("Email verified successfully! You can now log in.")))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<Ack>, ApiError> {
    let email = non_empty(req.email)
        .ok_or_else(|| ApiError::validation("Email is required"))?
        .to_lowercase();

    let token = random_token();
    let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

    let known = {
        let (email, token) = (email.clone(), token.clone());
        with_db(&state, move |db| {
            if db.get_user_by_email(&email)?.is_none() {
                return Ok::<_, anyhow::Error>(false);
            }
            db.replace_verification_tokens(&email, &token, expires_at)?;
            Ok(true)
        })
        .await?
    };

    if known {
        if let Err(e) = state.mailer.send_password_reset(&email, &token).await {
            warn!(email = %email, "Password reset email failed: {:#}", e);
        }
    }

    // Same answer whether or not the account exists.
    Ok(Json(Ack::new(RESET_SENT)))
}

pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<Json<Ack>, ApiError> {
    let (token, password) = match (non_empty(req.token), req.password.filter(|p| !p.is_empty())) {
        (Some(token), Some(password)) => (token, password),
        _ => return Err(ApiError::validation("Token and password are required")),
    };
    check_password(&password)?;
    let password_hash = hash_password(&password)?;

    with_db(&state, move |db| {
        let record = db
            .get_verification_token(&token)?
            .ok_or_else(|| ApiError::validation("Invalid or expired reset token"))?;

        if record.expires_at < Utc::now() {
            db.delete_verification_token(&token)?;
            return Err(ApiError::validation(
                "Reset token has expired. Please request a new one.",
            ));
        }

        if !db.update_password(&record.identifier, &password_hash)? {
            return Err(ApiError::not_found("User not found"));
        }
        db.delete_verification_token(&token)?;
        Ok(())
    })
    .await?;

    Ok(Json(Ack::new(
        "Password has been reset successfully. You can now log in with your new password.",
    )))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<ProfileResponse>, ApiError> {
    let user_id = user.id();
    let (row, influencer) = with_db(&state, move |db| {
        let row = db.get_user_by_id(&user_id)?;
        let influencer = db.get_influencer_profile(&user_id)?;
        Ok::<_, anyhow::Error>((row, influencer))
    })
    .await?;
    let row = row.ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse {
        id: row.id,
        email: row.email,
        name: row.name,
        image: row.image,
        role: row.role,
        email_verified: row.email_verified_at.is_some(),
        influencer: influencer.map(|p| InfluencerProfile {
            display_name: p.display_name,
            bio: p.bio,
        }),
    }))
}

pub async fn upsert_influencer_profile(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<InfluencerProfileRequest>,
) -> Result<Json<InfluencerProfile>, ApiError> {
    let display_name = non_empty(req.display_name)
        .or_else(|| user.0.name.clone())
        .ok_or_else(|| ApiError::validation("Display name is required"))?;
    let bio = non_empty(req.bio);

    let user_id = user.id();
    {
        let (display_name, bio) = (display_name.clone(), bio.clone());
        with_db(&state, move |db| {
            db.upsert_influencer_profile(&user_id, &display_name, bio.as_deref())
        })
        .await?;
    }

    Ok(Json(InfluencerProfile { display_name, bio }))
}

pub fn create_token(secret: &str, user: &UserRow) -> Result<String, ApiError> {
    let sub: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("user id is not a uuid: {e}")))?;
    let claims = Claims {
        sub,
        email: user.email.clone(),
        name: user.name.clone(),
        image: user.image.clone(),
        exp: (Utc::now() + Duration::days(SESSION_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation("Password must be at least 8 characters long"));
    }
    Ok(())
}

fn random_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

/// Trimmed value, or `None` when absent or blank.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_hex_and_distinct() {
        let a = random_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, random_token());
    }

    #[test]
    fn hashes_verify() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"correct horse", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(check_password("1234567").is_err());
        assert!(check_password("12345678").is_ok());
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" a ".into())).as_deref(), Some("a"));
    }
}
