use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use pepperpot_db::models::LiveSessionRow;
use pepperpot_db::{Database, LiveFilter};
use pepperpot_providers::{RoomGrant, generate_room_name};
use pepperpot_types::api::{
    AddCohostRequest, ContentRequest, CreateLiveSessionRequest, CreateLiveSessionResponse,
    LiveCommentList, LiveLikeRequest, LiveLikeResponse, LiveLikeStats, LiveSessionEnvelope,
    LiveSessionList, LiveSessionResponse, RoomTokenResponse,
};
use pepperpot_types::models::RoomRole;

use crate::auth::non_empty;
use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody, MaybeUser};
use crate::state::{AppState, with_db};
use crate::views;

const COMMENT_LIMIT: u32 = 100;
const SESSION_ENDED: &str = "Live session has ended";

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    pub filter: Option<String>,
}

fn load_session(db: &Database, id: &str) -> Result<LiveSessionRow, ApiError> {
    db.get_live_session(id)?
        .ok_or_else(|| ApiError::not_found("Live session not found"))
}

fn render(db: &Database, row: LiveSessionRow) -> Result<LiveSessionResponse, ApiError> {
    let cohosts = db.list_cohosts(&row.id)?;
    Ok(views::live_session(row, cohosts))
}

pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateLiveSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = non_empty(req.title).ok_or_else(|| ApiError::validation("Title is required"))?;
    let description = non_empty(req.description);
    let user_id = user.id();

    let is_influencer = {
        let user_id = user_id.clone();
        with_db(&state, move |db| {
            Ok::<_, anyhow::Error>(db.get_influencer_profile(&user_id)?.is_some())
        })
        .await?
    };
    if !is_influencer {
        return Err(ApiError::forbidden("Only influencers can create live streams"));
    }

    let rooms = state
        .rooms
        .clone()
        .ok_or_else(|| ApiError::Unavailable("Live streaming is not configured".into()))?;

    let room_name = generate_room_name(&user_id);
    let room = rooms
        .create_room(&room_name)
        .await
        .map_err(|e| ApiError::external("Failed to create live session", e))?;

    let session = with_db(&state, move |db| {
        let id = Uuid::new_v4().to_string();
        db.insert_live_session(
            &id,
            &user_id,
            &title,
            description.as_deref(),
            &room.name,
            room.sid.as_deref(),
        )?;
        info!(session_id = %id, room = %room.name, "Live session started");
        let row = load_session(db, &id)?;
        render(db, row)
    })
    .await?;

    let room_name = session.room_name.clone();
    Ok((
        StatusCode::CREATED,
        Json(CreateLiveSessionResponse { session, room_name }),
    ))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<LiveQuery>,
) -> Result<Json<LiveSessionList>, ApiError> {
    let filter = match query.filter.as_deref() {
        None | Some("live") => LiveFilter::Live,
        Some("ended") => LiveFilter::Ended,
        Some("all") => LiveFilter::All,
        Some(_) => return Err(ApiError::validation("Invalid filter. Must be live, ended, or all")),
    };

    let sessions = with_db(&state, move |db| {
        db.list_live_sessions(filter)?
            .into_iter()
            .map(|row| render(db, row))
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;

    Ok(Json(LiveSessionList { sessions }))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LiveSessionEnvelope>, ApiError> {
    let session = with_db(&state, move |db| {
        let row = db
            .get_live_session(&id)?
            .ok_or_else(|| ApiError::not_found("Session not found"))?;
        render(db, row)
    })
    .await?;

    Ok(Json(LiveSessionEnvelope { session }))
}

/// Ends a session. Only the host may end it, and only once.
pub async fn end_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<LiveSessionEnvelope>, ApiError> {
    let user_id = user.id();
    let session = with_db(&state, move |db| {
        let row = db
            .get_live_session(&id)?
            .ok_or_else(|| ApiError::not_found("Session not found"))?;
        if row.host.id != user_id {
            return Err(ApiError::forbidden("Forbidden"));
        }
        // The conditional update is the authority; a concurrent end loses here.
        if row.is_ended() || !db.end_live_session(&id, Utc::now())? {
            return Err(ApiError::Conflict("Session already ended".into()));
        }
        info!(session_id = %id, "Live session ended by host");
        let row = load_session(db, &id)?;
        render(db, row)
    })
    .await?;

    if let Some(rooms) = &state.rooms {
        if let Err(e) = rooms.delete_room(&session.room_name).await {
            warn!(room = %session.room_name, "Room cleanup failed: {}", e);
        }
    }

    Ok(Json(LiveSessionEnvelope { session }))
}

pub async fn add_cohost(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AddCohostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cohost_id = non_empty(req.user_id).ok_or_else(|| ApiError::validation("User ID is required"))?;
    let user_id = user.id();

    let session = with_db(&state, move |db| {
        let row = load_session(db, &id)?;
        if row.host.id != user_id {
            return Err(ApiError::forbidden("Only the host can add co-hosts"));
        }
        if row.is_ended() {
            return Err(ApiError::Gone(SESSION_ENDED.into()));
        }
        if cohost_id == user_id {
            return Err(ApiError::validation("The host cannot be a co-host"));
        }
        if db.get_user_by_id(&cohost_id)?.is_none() {
            return Err(ApiError::not_found("User not found"));
        }
        db.add_cohost(&id, &cohost_id).map_err(|e| {
            if pepperpot_db::is_unique_violation(&e) {
                ApiError::Conflict("User is already a co-host".into())
            } else {
                ApiError::Internal(e)
            }
        })?;
        render(db, row)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(LiveSessionEnvelope { session })))
}

/// Mints a room token. Hosts and co-hosts publish; everyone else watches.
pub async fn room_token(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<RoomTokenResponse>, ApiError> {
    let credentials = state
        .room_credentials
        .clone()
        .ok_or_else(|| ApiError::Unavailable("Live streaming is not configured".into()))?;
    let user_id = user.id();

    let (room_name, role) = {
        let user_id = user_id.clone();
        with_db(&state, move |db| {
            let row = load_session(db, &id)?;
            if row.is_ended() {
                return Err(ApiError::Gone(SESSION_ENDED.into()));
            }
            let role = if row.host.id == user_id {
                RoomRole::Host
            } else if db.is_cohost(&id, &user_id)? {
                RoomRole::Cohost
            } else {
                RoomRole::Viewer
            };
            Ok((row.room_name, role))
        })
        .await?
    };

    let display_name = user.0.name.as_deref().unwrap_or(&user.0.email);
    let token = credentials
        .access_token(&RoomGrant {
            room_name: &room_name,
            identity: &user_id,
            display_name: Some(display_name),
            role,
        })
        .map_err(|e| ApiError::external("Failed to generate token", e))?;

    Ok(Json(RoomTokenResponse {
        token,
        room_name,
        role,
    }))
}

// -- Comments --

pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LiveCommentList>, ApiError> {
    let rows = with_db(&state, move |db| db.list_live_comments(&id, COMMENT_LIMIT)).await?;
    Ok(Json(LiveCommentList {
        comments: rows.into_iter().map(views::live_comment).collect(),
    }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content =
        non_empty(req.content).ok_or_else(|| ApiError::validation("Comment content is required"))?;
    let user_id = user.id();

    let comment = with_db(&state, move |db| {
        let row = load_session(db, &id)?;
        if row.is_ended() {
            return Err(ApiError::Gone(SESSION_ENDED.into()));
        }
        let comment_id = Uuid::new_v4().to_string();
        db.insert_live_comment(&comment_id, &id, &user_id, &content)?;
        let created = db
            .get_live_comment(&comment_id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("live comment {comment_id} vanished after insert")))?;
        Ok(views::live_comment(created))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

// -- Likes --

pub async fn toggle_like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<LiveLikeRequest>,
) -> Result<Json<LiveLikeResponse>, ApiError> {
    let is_like = req
        .is_like
        .ok_or_else(|| ApiError::validation("is_like must be a boolean"))?;
    let user_id = user.id();

    let action = with_db(&state, move |db| {
        load_session(db, &id)?;
        Ok::<_, ApiError>(db.toggle_live_like(&id, &user_id, is_like)?)
    })
    .await?;

    Ok(Json(LiveLikeResponse { action, is_like }))
}

pub async fn like_stats(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<LiveLikeStats>, ApiError> {
    let viewer_id = viewer.id();
    let (likes, dislikes, user_like) = with_db(&state, move |db| {
        load_session(db, &id)?;
        Ok::<_, ApiError>(db.live_like_stats(&id, viewer_id.as_deref())?)
    })
    .await?;

    Ok(Json(LiveLikeStats {
        likes,
        dislikes,
        user_like,
    }))
}

