use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use pepperpot_db::models::{GroupUpdate, GroupWithCounts, NewGroup};
use pepperpot_db::{Database, SlugScope};
use pepperpot_types::api::{
    Ack, CreateGroupRequest, GroupResponse, JoinGroupResponse, MemberResponse,
    UpdateGroupRequest, UpdateMemberRoleRequest,
};
use pepperpot_types::models::{GroupType, MembershipRole};

use crate::auth::non_empty;
use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody, MaybeUser};
use crate::membership::{ALREADY_MEMBER, join_message, plan_join, plan_leave};
use crate::permissions;
use crate::slug::unique_slug;
use crate::state::{AppState, with_db};
use crate::views;

#[derive(Debug, Deserialize)]
pub struct GroupQuery {
    #[serde(rename = "type")]
    pub group_type: Option<GroupType>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberQuery {
    #[serde(default)]
    pub ban: bool,
}

pub(crate) fn load_group(db: &Database, slug: &str) -> Result<GroupWithCounts, ApiError> {
    db.get_group_by_slug(slug)?
        .ok_or_else(|| ApiError::not_found("Group not found"))
}

pub async fn create_group(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = non_empty(req.name).ok_or_else(|| ApiError::validation("Group name is required"))?;
    let user_id = user.id();

    let group = with_db(&state, move |db| {
        let slug = unique_slug(db, SlugScope::Groups, &name)?;
        let id = Uuid::new_v4().to_string();
        db.create_group(&NewGroup {
            id: &id,
            name: &name,
            slug: &slug,
            description: req.description.as_deref(),
            group_type: req.group_type.unwrap_or(GroupType::Public),
            rules: req.rules.as_deref(),
            creator_id: &user_id,
            membership_id: &Uuid::new_v4().to_string(),
        })
        .map_err(|e| {
            if pepperpot_db::is_unique_violation(&e) {
                ApiError::Conflict("A group with this name already exists".into())
            } else {
                ApiError::Internal(e)
            }
        })?;
        info!(group_id = %id, slug = %slug, "Group created");
        load_group(db, &slug)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(views::group(group, Some(MembershipRole::Admin))),
    ))
}

pub async fn list_groups(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<GroupQuery>,
) -> Result<Json<Vec<GroupResponse>>, ApiError> {
    let viewer_id = viewer.id();
    let search = non_empty(query.search);

    let groups = with_db(&state, move |db| {
        let rows = db.list_groups(viewer_id.as_deref(), query.group_type, search.as_deref())?;
        Ok::<_, ApiError>(
            rows.into_iter()
                .map(|row| {
                    let role = viewer_id
                        .as_deref()
                        .and_then(|uid| permissions::group_role(db, uid, &row.group.id));
                    views::group(row, role)
                })
                .collect(),
        )
    })
    .await?;

    Ok(Json(groups))
}

pub async fn my_groups(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<GroupResponse>>, ApiError> {
    let user_id = user.id();
    let groups = with_db(&state, move |db| {
        let rows = db.list_groups_for_member(&user_id)?;
        Ok::<_, ApiError>(
            rows.into_iter()
                .map(|row| {
                    let role = permissions::group_role(db, &user_id, &row.group.id);
                    views::group(row, role)
                })
                .collect(),
        )
    })
    .await?;

    Ok(Json(groups))
}

pub async fn get_group(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<GroupResponse>, ApiError> {
    let viewer_id = viewer.id();
    let group = with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if !permissions::can_access_group(db, viewer_id.as_deref(), &row.group) {
            return Err(ApiError::forbidden("You do not have access to this group"));
        }
        let role = viewer_id
            .as_deref()
            .and_then(|uid| permissions::group_role(db, uid, &row.group.id));
        Ok(views::group(row, role))
    })
    .await?;

    Ok(Json(group))
}

pub async fn update_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    JsonBody(req): JsonBody<UpdateGroupRequest>,
) -> Result<Json<GroupResponse>, ApiError> {
    let user_id = user.id();
    let group = with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if !permissions::is_group_admin(db, &user_id, &row.group.id) {
            return Err(ApiError::forbidden("Only group admins can update the group"));
        }

        let name = non_empty(req.name);
        db.update_group(
            &row.group.id,
            &GroupUpdate {
                name: name.as_deref(),
                description: req.description.as_deref(),
                group_type: req.group_type,
                rules: req.rules.as_deref(),
            },
        )?;

        let updated = load_group(db, &slug)?;
        Ok(views::group(updated, Some(MembershipRole::Admin)))
    })
    .await?;

    Ok(Json(group))
}

pub async fn delete_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let user_id = user.id();
    with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if row.group.creator_id != user_id {
            return Err(ApiError::forbidden("Only the group creator can delete the group"));
        }
        db.delete_group(&row.group.id)?;
        info!(group_id = %row.group.id, "Group deleted");
        Ok(())
    })
    .await?;

    Ok(Json(Ack::new("Group deleted successfully")))
}

pub async fn join_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<JoinGroupResponse>, ApiError> {
    let user_id = user.id();
    let status = with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        let existing = db.get_membership(&user_id, &row.group.id)?;
        let status = plan_join(&row.group, existing.as_ref())?;

        let id = Uuid::new_v4().to_string();
        db.insert_membership(&id, &user_id, &row.group.id, MembershipRole::Member, status)
            .map_err(|e| {
                // Lost a race with a concurrent join for the same pair.
                if pepperpot_db::is_unique_violation(&e) {
                    ApiError::BadRequestConflict(ALREADY_MEMBER.into())
                } else {
                    ApiError::Internal(e)
                }
            })?;
        info!(group_id = %row.group.id, user_id = %user_id, status = %status, "Group join");
        Ok::<_, ApiError>(status)
    })
    .await?;

    Ok(Json(JoinGroupResponse {
        success: true,
        status,
        message: join_message(status).into(),
    }))
}

pub async fn leave_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let user_id = user.id();
    with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        let existing = db.get_membership(&user_id, &row.group.id)?;
        plan_leave(&row.group, &user_id, existing.as_ref())?;
        db.delete_membership(&user_id, &row.group.id)?;
        Ok::<_, ApiError>(())
    })
    .await?;

    Ok(Json(Ack::new("Successfully left group")))
}

pub async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let user_id = user.id();
    let members = with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if row.group.group_type == GroupType::Private
            && !permissions::is_group_member(db, &user_id, &row.group.id)
        {
            return Err(ApiError::forbidden("Access denied"));
        }
        let members = db.list_members(&row.group.id)?;
        Ok(members.into_iter().map(views::member).collect())
    })
    .await?;

    Ok(Json(members))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, member_id)): Path<(String, String)>,
    JsonBody(req): JsonBody<UpdateMemberRoleRequest>,
) -> Result<Json<Ack>, ApiError> {
    let role: MembershipRole = req
        .role
        .as_deref()
        .and_then(|r| r.parse().ok())
        .ok_or_else(|| ApiError::validation("Invalid role"))?;
    let user_id = user.id();

    with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if !permissions::is_group_admin(db, &user_id, &row.group.id) {
            return Err(ApiError::forbidden("Only admins can update member roles"));
        }
        if row.group.creator_id == member_id {
            return Err(ApiError::validation("Cannot change role of group creator"));
        }
        if !db.update_member_role(&row.group.id, &member_id, role)? {
            return Err(ApiError::not_found("Member not found"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(Ack::new("Member role updated successfully")))
}

pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path((slug, member_id)): Path<(String, String)>,
    Query(query): Query<RemoveMemberQuery>,
) -> Result<Json<Ack>, ApiError> {
    let user_id = user.id();
    let ban = query.ban;

    with_db(&state, move |db| {
        let row = load_group(db, &slug)?;
        if !permissions::can_moderate_group(db, &user_id, &row.group.id) {
            return Err(ApiError::forbidden("Permission denied"));
        }
        if row.group.creator_id == member_id {
            return Err(ApiError::validation("Cannot remove group creator"));
        }

        let changed = if ban {
            db.ban_member(&member_id, &row.group.id)?
        } else {
            db.delete_membership(&member_id, &row.group.id)?
        };
        if !changed {
            return Err(ApiError::not_found("Member not found"));
        }
        info!(group_id = %row.group.id, member_id = %member_id, ban, "Member removed");
        Ok(())
    })
    .await?;

    Ok(Json(Ack::new(if ban {
        "Member banned successfully"
    } else {
        "Member removed successfully"
    })))
}
