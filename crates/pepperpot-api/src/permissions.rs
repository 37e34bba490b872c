//! Membership and role questions. Each check is a single lookup with no side
//! effects; storage failures are logged and answered `false` so a broken
//! query never grants access.

use pepperpot_db::Database;
use pepperpot_db::models::{GroupRow, MembershipRow};
use pepperpot_types::models::{GroupType, MembershipRole, MembershipStatus, UserRole};
use tracing::error;

fn membership(db: &Database, user_id: &str, group_id: &str) -> Option<MembershipRow> {
    match db.get_membership(user_id, group_id) {
        Ok(row) => row,
        Err(e) => {
            error!(user_id, group_id, "Membership lookup failed: {:#}", e);
            None
        }
    }
}

/// True only for an ACTIVE membership.
pub fn is_group_member(db: &Database, user_id: &str, group_id: &str) -> bool {
    membership(db, user_id, group_id).is_some_and(|m| m.status == MembershipStatus::Active)
}

pub fn is_group_admin(db: &Database, user_id: &str, group_id: &str) -> bool {
    membership(db, user_id, group_id).is_some_and(|m| m.role == MembershipRole::Admin)
}

pub fn can_moderate_group(db: &Database, user_id: &str, group_id: &str) -> bool {
    membership(db, user_id, group_id)
        .is_some_and(|m| matches!(m.role, MembershipRole::Admin | MembershipRole::Moderator))
}

/// Public groups are open to everyone; private groups need an ACTIVE member.
pub fn can_access_group(db: &Database, user_id: Option<&str>, group: &GroupRow) -> bool {
    if group.group_type == GroupType::Public {
        return true;
    }
    user_id.is_some_and(|user_id| is_group_member(db, user_id, &group.id))
}

pub fn group_role(db: &Database, user_id: &str, group_id: &str) -> Option<MembershipRole> {
    membership(db, user_id, group_id).map(|m| m.role)
}

pub fn is_global_admin(db: &Database, user_id: &str) -> bool {
    match db.get_user_role(user_id) {
        Ok(role) => role == Some(UserRole::Admin),
        Err(e) => {
            error!(user_id, "Role lookup failed: {:#}", e);
            false
        }
    }
}

/// Authors may delete their own content; global admins may delete anything.
pub fn can_delete_post(db: &Database, user_id: &str, author_id: &str) -> bool {
    user_id == author_id || is_global_admin(db, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pepperpot_db::models::NewGroup;

    fn setup() -> (Database, String, String) {
        let db = Database::open_in_memory().unwrap();
        db.create_user("creator", "creator@example.com", Some("Creator"), None).unwrap();
        db.create_user("u1", "u1@example.com", None, None).unwrap();
        db.create_group(&NewGroup {
            id: "g1",
            name: "Secret Supper",
            slug: "secret-supper",
            description: None,
            group_type: GroupType::Private,
            rules: None,
            creator_id: "creator",
            membership_id: "m0",
        })
        .unwrap();
        (db, "u1".to_string(), "g1".to_string())
    }

    fn group(db: &Database) -> GroupRow {
        db.get_group_by_id("g1").unwrap().unwrap().group
    }

    #[test]
    fn membership_requires_active_status() {
        let (db, user, group_id) = setup();
        assert!(!is_group_member(&db, &user, &group_id));

        for (status, expected) in [
            (MembershipStatus::Pending, false),
            (MembershipStatus::Banned, false),
            (MembershipStatus::Active, true),
        ] {
            db.delete_membership(&user, &group_id).unwrap();
            db.insert_membership("m1", &user, &group_id, MembershipRole::Member, status)
                .unwrap();
            assert_eq!(is_group_member(&db, &user, &group_id), expected, "{status}");
        }
    }

    #[test]
    fn private_group_access() {
        let (db, user, group_id) = setup();
        let g = group(&db);
        assert!(!can_access_group(&db, None, &g));
        assert!(!can_access_group(&db, Some(&user), &g));
        assert!(can_access_group(&db, Some("creator"), &g));

        db.insert_membership("m1", &user, &group_id, MembershipRole::Member, MembershipStatus::Pending)
            .unwrap();
        assert!(!can_access_group(&db, Some(&user), &g));
    }

    #[test]
    fn roles() {
        let (db, user, group_id) = setup();
        assert!(is_group_admin(&db, "creator", &group_id));
        assert!(can_moderate_group(&db, "creator", &group_id));

        db.insert_membership("m1", &user, &group_id, MembershipRole::Moderator, MembershipStatus::Active)
            .unwrap();
        assert!(!is_group_admin(&db, &user, &group_id));
        assert!(can_moderate_group(&db, &user, &group_id));
        assert_eq!(group_role(&db, &user, &group_id), Some(MembershipRole::Moderator));
        assert_eq!(group_role(&db, "nobody", &group_id), None);
    }

    #[test]
    fn delete_post_for_author_or_admin() {
        let (db, user, _) = setup();
        assert!(can_delete_post(&db, &user, &user));
        assert!(!can_delete_post(&db, &user, "creator"));
        db.set_user_role(&user, UserRole::Admin).unwrap();
        assert!(can_delete_post(&db, &user, "creator"));
    }
}
