use pepperpot_db::models::{GroupRow, MembershipRow};
use pepperpot_types::models::{GroupType, MembershipStatus};

use crate::error::ApiError;

pub const ALREADY_MEMBER: &str = "Already a member of this group";

/// Status a new membership starts in, or why the caller cannot join.
pub fn plan_join(
    group: &GroupRow,
    existing: Option<&MembershipRow>,
) -> Result<MembershipStatus, ApiError> {
    match existing {
        Some(m) if m.status == MembershipStatus::Banned => {
            Err(ApiError::forbidden("You are banned from this group"))
        }
        Some(_) => Err(ApiError::BadRequestConflict(ALREADY_MEMBER.into())),
        None => Ok(match group.group_type {
            GroupType::Private => MembershipStatus::Pending,
            GroupType::Public => MembershipStatus::Active,
        }),
    }
}

pub fn join_message(status: MembershipStatus) -> &'static str {
    match status {
        MembershipStatus::Pending => "Membership request sent",
        _ => "Successfully joined group",
    }
}

/// The creator can never leave; anyone else needs an active or pending row.
/// A ban stays in place until a moderator lifts it.
pub fn plan_leave(
    group: &GroupRow,
    user_id: &str,
    existing: Option<&MembershipRow>,
) -> Result<(), ApiError> {
    if group.creator_id == user_id {
        return Err(ApiError::validation(
            "Group creator cannot leave. Delete the group instead.",
        ));
    }
    match existing {
        None => Err(ApiError::validation("You are not a member of this group")),
        Some(m) if m.status == MembershipStatus::Banned => {
            Err(ApiError::forbidden("You are banned from this group"))
        }
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pepperpot_types::models::MembershipRole;

    fn group(group_type: GroupType) -> GroupRow {
        GroupRow {
            id: "g1".into(),
            name: "Cooking Lovers".into(),
            slug: "cooking-lovers".into(),
            description: None,
            group_type,
            rules: None,
            creator_id: "creator".into(),
            created_at: Utc::now(),
        }
    }

    fn row(status: MembershipStatus) -> MembershipRow {
        MembershipRow {
            id: "m1".into(),
            user_id: "u1".into(),
            group_id: "g1".into(),
            role: MembershipRole::Member,
            status,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn join_status_follows_group_type() {
        assert_eq!(plan_join(&group(GroupType::Public), None).unwrap(), MembershipStatus::Active);
        assert_eq!(plan_join(&group(GroupType::Private), None).unwrap(), MembershipStatus::Pending);
    }

    #[test]
    fn existing_rows_block_join() {
        let g = group(GroupType::Public);
        let banned = plan_join(&g, Some(&row(MembershipStatus::Banned))).unwrap_err();
        assert!(matches!(banned, ApiError::Forbidden(_)));

        for status in [MembershipStatus::Active, MembershipStatus::Pending] {
            let err = plan_join(&g, Some(&row(status))).unwrap_err();
            assert_eq!(err.to_string(), ALREADY_MEMBER);
            assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn creator_can_never_leave() {
        let g = group(GroupType::Public);
        let mut creator_row = row(MembershipStatus::Active);
        creator_row.user_id = "creator".into();
        let err = plan_leave(&g, "creator", Some(&creator_row)).unwrap_err();
        assert_eq!(err.to_string(), "Group creator cannot leave. Delete the group instead.");

        assert!(plan_leave(&g, "u1", Some(&row(MembershipStatus::Pending))).is_ok());
        assert_eq!(
            plan_leave(&g, "u1", None).unwrap_err().to_string(),
            "You are not a member of this group"
        );
    }

    #[test]
    fn banned_members_cannot_leave() {
        let g = group(GroupType::Public);
        let err = plan_leave(&g, "u1", Some(&row(MembershipStatus::Banned))).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(plan_leave(&g, "u1", Some(&row(MembershipStatus::Active))).is_ok());
    }
}
