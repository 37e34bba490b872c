use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use pepperpot_db::ReactionTarget;
use pepperpot_types::api::{
    ContentRequest, GroupMessagePage, GroupPostResponse, ReactionAction, ReactionGroup,
    ReactionToggleResponse, ToggleReactionRequest,
};

use crate::auth::non_empty;
use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody, MaybeUser};
use crate::groups::load_group;
use crate::permissions;
use crate::state::{AppState, with_db};
use crate::views;

const GROUP_POST_LIMIT: u32 = 50;
const MAX_MESSAGE_PAGE: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}

// -- Posts --

pub async fn list_posts(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<Vec<GroupPostResponse>>, ApiError> {
    let viewer_id = viewer.id();
    let posts = with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if !permissions::can_access_group(db, viewer_id.as_deref(), &row.group) {
            return Err(ApiError::forbidden("Access denied"));
        }
        let posts = db.list_group_posts(&row.group.id, GROUP_POST_LIMIT)?;
        Ok(posts.into_iter().map(views::group_post).collect())
    })
    .await?;

    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    JsonBody(req): JsonBody<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.id();
    let post = with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if !permissions::is_group_member(db, &user_id, &row.group.id) {
            return Err(ApiError::forbidden("You must be a member to post in this group"));
        }
        let content = non_empty(req.content).ok_or_else(|| ApiError::validation("Content is required"))?;

        let id = Uuid::new_v4().to_string();
        db.insert_group_post(&id, &row.group.id, &user_id, &content)?;
        let post = db
            .get_group_post(&id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("group post {id} vanished after insert")))?;
        Ok(views::group_post(post))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

// -- Chat --

pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<GroupMessagePage>, ApiError> {
    let user_id = user.id();
    let limit = query.limit.clamp(1, MAX_MESSAGE_PAGE);
    let offset = query.offset;

    let page = with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if !permissions::is_group_member(db, &user_id, &row.group.id) {
            return Err(ApiError::forbidden("Must be a member to view messages"));
        }

        let mut rows = db.list_group_messages(&row.group.id, limit, offset)?;
        let has_more = rows.len() as u32 == limit;
        // Fetched newest first; clients render oldest at the top.
        rows.reverse();

        let ids: Vec<String> = rows.iter().map(|m| m.id.clone()).collect();
        let reactions = db.reactions_for_targets(ReactionTarget::Message(""), &ids)?;
        let mut grouped = views::group_reactions(&reactions);

        let messages = rows
            .into_iter()
            .map(|m| {
                let reactions = grouped.remove(&m.id).unwrap_or_default();
                views::group_message(m, reactions)
            })
            .collect();
        Ok(GroupMessagePage { messages, has_more })
    })
    .await?;

    Ok(Json(page))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    JsonBody(req): JsonBody<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.id();
    let message = with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if !permissions::is_group_member(db, &user_id, &row.group.id) {
            return Err(ApiError::forbidden("Must be a member to send messages"));
        }

        let content = non_empty(req.content).unwrap_or_default();
        let image_url = non_empty(req.image_url);
        if content.is_empty() && image_url.is_none() {
            return Err(ApiError::validation("Message content or image required"));
        }

        let id = Uuid::new_v4().to_string();
        db.insert_group_message(&id, &row.group.id, &user_id, &content, image_url.as_deref())?;
        let message = db
            .get_group_message(&id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("group message {id} vanished after insert")))?;
        Ok(views::group_message(message, vec![]))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

// -- Message reactions --

pub async fn toggle_message_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, message_id)): Path<(String, String)>,
    JsonBody(req): JsonBody<ToggleReactionRequest>,
) -> Result<Json<ReactionToggleResponse>, ApiError> {
    let emoji = non_empty(req.emoji).ok_or_else(|| ApiError::validation("Invalid emoji"))?;
    let user_id = user.id();

    let added = with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if !permissions::is_group_member(db, &user_id, &row.group.id) {
            return Err(ApiError::forbidden("Access denied"));
        }
        match db.get_group_message(&message_id)? {
            Some(m) if m.group_id == row.group.id => {}
            _ => return Err(ApiError::not_found("Message not found")),
        }

        let id = Uuid::new_v4().to_string();
        let added = db.toggle_reaction(&id, ReactionTarget::Message(&message_id), &user_id, &emoji)?;
        Ok(added)
    })
    .await?;

    Ok(Json(ReactionToggleResponse {
        success: true,
        action: if added { ReactionAction::Added } else { ReactionAction::Removed },
    }))
}

pub async fn list_message_reactions(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, message_id)): Path<(String, String)>,
) -> Result<Json<Vec<ReactionGroup>>, ApiError> {
    let user_id = user.id();
    let groups = with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if !permissions::is_group_member(db, &user_id, &row.group.id) {
            return Err(ApiError::forbidden("Access denied"));
        }
        let rows = db.list_reactions(ReactionTarget::Message(&message_id))?;
        Ok(views::group_reactions(&rows).remove(&message_id).unwrap_or_default())
    })
    .await?;

    Ok(Json(groups))
}
