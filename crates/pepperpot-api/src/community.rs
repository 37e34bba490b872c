use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use pepperpot_db::{Database, ReactionTarget};
use pepperpot_types::api::{
    Ack, CommentResponse, ContentRequest, LikeResponse, Pagination, PostPage, PostResponse,
    ReactionAction, ReactionGroup, ReactionToggleResponse, ToggleReactionRequest,
};

use crate::auth::non_empty;
use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody};
use crate::permissions;
use crate::state::{AppState, with_db};
use crate::views;

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl PageQuery {
    /// (page, limit, offset) with page >= 1 and 1 <= limit <= 100.
    pub fn resolve(&self) -> (u32, u32, u32) {
        let page = self.page.max(1);
        let limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        (page, limit, (page - 1).saturating_mul(limit))
    }
}

fn require_post(db: &Database, post_id: &str) -> Result<(), ApiError> {
    match db.get_post(post_id)? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("Post not found")),
    }
}

// -- Posts --

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostPage>, ApiError> {
    let (page, limit, offset) = query.resolve();
    let (rows, total) = with_db(&state, move |db| {
        let rows = db.list_posts(limit, offset)?;
        let total = db.count_posts()?;
        Ok::<_, anyhow::Error>((rows, total))
    })
    .await?;

    Ok(Json(PostPage {
        posts: rows.into_iter().map(views::post).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = non_empty(req.content).ok_or_else(|| ApiError::validation("Content is required"))?;
    let image_url = non_empty(req.image_url);
    let user_id = user.id();

    let post: PostResponse = with_db(&state, move |db| {
        let id = Uuid::new_v4().to_string();
        db.insert_post(&id, &user_id, &content, image_url.as_deref())?;
        let row = db
            .get_post(&id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("post {id} vanished after insert")))?;
        Ok::<_, ApiError>(views::post(row))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let user_id = user.id();
    with_db(&state, move |db| {
        let post = db
            .get_post(&post_id)?
            .ok_or_else(|| ApiError::not_found("Post not found"))?;
        if !permissions::can_delete_post(db, &user_id, &post.author.id) {
            return Err(ApiError::forbidden("You do not have permission to delete this post"));
        }
        db.delete_post(&post_id)?;
        Ok(())
    })
    .await?;

    Ok(Json(Ack::new("Post deleted successfully")))
}

// -- Comments --

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let rows = with_db(&state, move |db| db.list_comments(&post_id)).await?;
    Ok(Json(rows.into_iter().map(views::comment).collect()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
    JsonBody(req): JsonBody<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = non_empty(req.content).ok_or_else(|| ApiError::validation("Content is required"))?;
    let user_id = user.id();

    let comment: CommentResponse = with_db(&state, move |db| {
        require_post(db, &post_id)?;
        let id = Uuid::new_v4().to_string();
        db.insert_comment(&id, &post_id, &user_id, &content)?;
        let row = db
            .get_comment(&id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("comment {id} vanished after insert")))?;
        Ok::<_, ApiError>(views::comment(row))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Json<Ack>, ApiError> {
    let user_id = user.id();
    with_db(&state, move |db| {
        let comment = db
            .get_comment(&comment_id)?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| ApiError::not_found("Comment not found"))?;
        if !permissions::can_delete_post(db, &user_id, &comment.author.id) {
            return Err(ApiError::forbidden(
                "You do not have permission to delete this comment",
            ));
        }
        db.delete_comment(&comment_id)?;
        Ok(())
    })
    .await?;

    Ok(Json(Ack::new("Comment deleted successfully")))
}

// -- Likes & reactions --

pub async fn toggle_like(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<LikeResponse>, ApiError> {
    let user_id = user.id();
    let liked = with_db(&state, move |db| {
        require_post(db, &post_id)?;
        Ok::<_, ApiError>(db.toggle_like(&user_id, &post_id)?)
    })
    .await?;

    Ok(Json(LikeResponse { liked }))
}

pub async fn toggle_post_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
    JsonBody(req): JsonBody<ToggleReactionRequest>,
) -> Result<Json<ReactionToggleResponse>, ApiError> {
    let emoji = non_empty(req.emoji).ok_or_else(|| ApiError::validation("Invalid emoji"))?;
    let user_id = user.id();

    let added = with_db(&state, move |db| {
        require_post(db, &post_id)?;
        let id = Uuid::new_v4().to_string();
        Ok::<_, ApiError>(db.toggle_reaction(&id, ReactionTarget::Post(&post_id), &user_id, &emoji)?)
    })
    .await?;

    Ok(Json(ReactionToggleResponse {
        success: true,
        action: if added { ReactionAction::Added } else { ReactionAction::Removed },
    }))
}

pub async fn list_post_reactions(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<ReactionGroup>>, ApiError> {
    let groups = with_db(&state, move |db| {
        let rows = db.list_reactions(ReactionTarget::Post(&post_id))?;
        Ok::<_, anyhow::Error>(views::group_reactions(&rows).remove(&post_id).unwrap_or_default())
    })
    .await?;

    Ok(Json(groups))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_is_clamped() {
        let q = PageQuery { page: 0, limit: 500 };
        assert_eq!(q.resolve(), (1, 100, 0));
        let q = PageQuery { page: 3, limit: 20 };
        assert_eq!(q.resolve(), (3, 20, 40));
    }
}
