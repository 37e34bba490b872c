use super::{OptionalExt, author_at, count, text_enum};
use crate::Database;
use crate::models::{
    GroupMessageRow, GroupPostRow, GroupRow, GroupUpdate, GroupWithCounts, MemberRow,
    MembershipRow, NewGroup,
};
use anyhow::Result;
use chrono::Utc;
use pepperpot_types::models::{GroupType, MembershipRole, MembershipStatus};
use rusqlite::Row;

// Counts are correlated subqueries so list and detail share one row shape.
const GROUP_SELECT: &str = "SELECT g.id, g.name, g.slug, g.description, g.type, g.rules, g.creator_id, g.created_at,
        (SELECT COUNT(*) FROM group_memberships m WHERE m.group_id = g.id AND m.status = 'ACTIVE'),
        (SELECT COUNT(*) FROM group_posts p WHERE p.group_id = g.id)
     FROM groups g";

const MEMBERSHIP_COLUMNS: &str = "id, user_id, group_id, role, status, joined_at";

impl Database {
    // -- Groups --

    /// Inserts the group and its creator's ADMIN membership in one transaction.
    pub fn create_group(&self, group: &NewGroup<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let now = Utc::now();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO groups (id, name, slug, description, type, rules, creator_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    group.id,
                    group.name,
                    group.slug,
                    group.description,
                    group.group_type.as_str(),
                    group.rules,
                    group.creator_id,
                    now
                ],
            )?;
            tx.execute(
                "INSERT INTO group_memberships (id, user_id, group_id, role, status, joined_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    group.membership_id,
                    group.creator_id,
                    group.id,
                    MembershipRole::Admin.as_str(),
                    MembershipStatus::Active.as_str(),
                    now
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_group_by_slug(&self, slug: &str) -> Result<Option<GroupWithCounts>> {
        self.with_conn(|conn| {
            let sql = format!("{GROUP_SELECT} WHERE g.slug = ?1");
            conn.query_row(&sql, [slug], group_from_row).optional()
        })
    }

    pub fn get_group_by_id(&self, id: &str) -> Result<Option<GroupWithCounts>> {
        self.with_conn(|conn| {
            let sql = format!("{GROUP_SELECT} WHERE g.id = ?1");
            conn.query_row(&sql, [id], group_from_row).optional()
        })
    }

    /// Public groups plus any private group `viewer_id` is an active or
    /// pending member of.
    pub fn list_groups(
        &self,
        viewer_id: Option<&str>,
        group_type: Option<GroupType>,
        search: Option<&str>,
    ) -> Result<Vec<GroupWithCounts>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{GROUP_SELECT}
                 WHERE (g.type = 'PUBLIC' OR EXISTS (
                        SELECT 1 FROM group_memberships m
                        WHERE m.group_id = g.id AND m.user_id = ?1 AND m.status IN ('ACTIVE', 'PENDING')))
                   AND (?2 IS NULL OR g.type = ?2)
                   AND (?3 IS NULL OR g.name LIKE ?3 ESCAPE '\\' OR g.description LIKE ?3 ESCAPE '\\')
                 ORDER BY g.created_at DESC"
            );
            let pattern = search.map(|s| format!("%{}%", escape_like(s)));
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![viewer_id, group_type.map(|t| t.as_str()), pattern],
                    group_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_groups_for_member(&self, user_id: &str) -> Result<Vec<GroupWithCounts>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{GROUP_SELECT}
                 JOIN group_memberships me ON me.group_id = g.id
                 WHERE me.user_id = ?1 AND me.status = 'ACTIVE'
                 ORDER BY me.joined_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], group_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_group(&self, id: &str, update: &GroupUpdate<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE groups SET
                    name = COALESCE(?1, name),
                    description = COALESCE(?2, description),
                    type = COALESCE(?3, type),
                    rules = COALESCE(?4, rules)
                 WHERE id = ?5",
                rusqlite::params![
                    update.name,
                    update.description,
                    update.group_type.map(|t| t.as_str()),
                    update.rules,
                    id
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_group(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM groups WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Memberships --

    pub fn get_membership(&self, user_id: &str, group_id: &str) -> Result<Option<MembershipRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEMBERSHIP_COLUMNS} FROM group_memberships WHERE user_id = ?1 AND group_id = ?2"
            );
            conn.query_row(&sql, [user_id, group_id], membership_from_row)
                .optional()
        })
    }

    pub fn insert_membership(
        &self,
        id: &str,
        user_id: &str,
        group_id: &str,
        role: MembershipRole,
        status: MembershipStatus,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO group_memberships (id, user_id, group_id, role, status, joined_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, user_id, group_id, role.as_str(), status.as_str(), Utc::now()],
            )?;
            Ok(())
        })
    }

    /// Marks the membership BANNED and drops any elevated role with it.
    pub fn ban_member(&self, user_id: &str, group_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE group_memberships SET status = ?1, role = ?2 WHERE user_id = ?3 AND group_id = ?4",
                (
                    MembershipStatus::Banned.as_str(),
                    MembershipRole::Member.as_str(),
                    user_id,
                    group_id,
                ),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_membership(&self, user_id: &str, group_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM group_memberships WHERE user_id = ?1 AND group_id = ?2",
                (user_id, group_id),
            )?;
            Ok(changed > 0)
        })
    }

    /// ACTIVE members, admins first, then moderators, then by join time.
    pub fn list_members(&self, group_id: &str) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.user_id, m.group_id, m.role, m.status, m.joined_at,
                        u.name, u.email, u.image
                 FROM group_memberships m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.group_id = ?1 AND m.status = 'ACTIVE'
                 ORDER BY CASE m.role WHEN 'ADMIN' THEN 0 WHEN 'MODERATOR' THEN 1 ELSE 2 END,
                          m.joined_at ASC",
            )?;
            let rows = stmt
                .query_map([group_id], |row| {
                    Ok(MemberRow {
                        membership: membership_from_row(row)?,
                        name: row.get(6)?,
                        email: row.get(7)?,
                        image: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_member_role(
        &self,
        group_id: &str,
        user_id: &str,
        role: MembershipRole,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE group_memberships SET role = ?1 WHERE group_id = ?2 AND user_id = ?3",
                (role.as_str(), group_id, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    // -- Group feed --

    pub fn insert_group_post(
        &self,
        id: &str,
        group_id: &str,
        author_id: &str,
        content: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO group_posts (id, group_id, author_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, group_id, author_id, content, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn list_group_posts(&self, group_id: &str, limit: u32) -> Result<Vec<GroupPostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.group_id, p.content, p.created_at, u.id, u.name, u.image
                 FROM group_posts p
                 JOIN users u ON u.id = p.author_id
                 WHERE p.group_id = ?1
                 ORDER BY p.created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![group_id, limit], group_post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_group_post(&self, id: &str) -> Result<Option<GroupPostRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT p.id, p.group_id, p.content, p.created_at, u.id, u.name, u.image
                 FROM group_posts p
                 JOIN users u ON u.id = p.author_id
                 WHERE p.id = ?1",
                [id],
                group_post_from_row,
            )
            .optional()
        })
    }

    // -- Group chat --

    pub fn insert_group_message(
        &self,
        id: &str,
        group_id: &str,
        author_id: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO group_messages (id, group_id, author_id, content, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, group_id, author_id, content, image_url, Utc::now()],
            )?;
            Ok(())
        })
    }

    /// Newest messages first, paged by `limit`/`offset`.
    pub fn list_group_messages(
        &self,
        group_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<GroupMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.group_id, m.content, m.image_url, m.created_at, u.id, u.name, u.image
                 FROM group_messages m
                 JOIN users u ON u.id = m.author_id
                 WHERE m.group_id = ?1
                 ORDER BY m.created_at DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![group_id, limit, offset], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_group_messages(&self, group_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM group_messages WHERE group_id = ?1",
                [group_id],
                |row| count(row, 0),
            )?;
            Ok(n)
        })
    }

    pub fn get_group_message(&self, id: &str) -> Result<Option<GroupMessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT m.id, m.group_id, m.content, m.image_url, m.created_at, u.id, u.name, u.image
                 FROM group_messages m
                 JOIN users u ON u.id = m.author_id
                 WHERE m.id = ?1",
                [id],
                message_from_row,
            )
            .optional()
        })
    }
}

/// Escapes LIKE wildcards so user search text matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<GroupWithCounts> {
    Ok(GroupWithCounts {
        group: GroupRow {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            description: row.get(3)?,
            group_type: text_enum(row, 4)?,
            rules: row.get(5)?,
            creator_id: row.get(6)?,
            created_at: row.get(7)?,
        },
        member_count: count(row, 8)?,
        post_count: count(row, 9)?,
    })
}

fn membership_from_row(row: &Row<'_>) -> rusqlite::Result<MembershipRow> {
    Ok(MembershipRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        group_id: row.get(2)?,
        role: text_enum(row, 3)?,
        status: text_enum(row, 4)?,
        joined_at: row.get(5)?,
    })
}

fn group_post_from_row(row: &Row<'_>) -> rusqlite::Result<GroupPostRow> {
    Ok(GroupPostRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        author: author_at(row, 4)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<GroupMessageRow> {
    Ok(GroupMessageRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        created_at: row.get(4)?,
        author: author_at(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{db, user};
    use crate::is_unique_violation;
    use crate::models::{GroupUpdate, NewGroup};
    use pepperpot_types::models::{GroupType, MembershipRole, MembershipStatus};

    fn group(db: &crate::Database, creator: &str, slug: &str, group_type: GroupType) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let membership_id = uuid::Uuid::new_v4().to_string();
        db.create_group(&NewGroup {
            id: &id,
            name: slug,
            slug,
            description: None,
            group_type,
            rules: None,
            creator_id: creator,
            membership_id: &membership_id,
        })
        .unwrap();
        id
    }

    #[test]
    fn creator_becomes_active_admin() {
        let db = db();
        let creator = user(&db, "creator@example.com");
        let gid = group(&db, &creator, "cooking-lovers", GroupType::Public);
        let m = db.get_membership(&creator, &gid).unwrap().unwrap();
        assert_eq!(m.role, MembershipRole::Admin);
        assert_eq!(m.status, MembershipStatus::Active);
        let g = db.get_group_by_slug("cooking-lovers").unwrap().unwrap();
        assert_eq!(g.member_count, 1);
    }

    #[test]
    fn membership_is_unique_per_user_and_group() {
        let db = db();
        let creator = user(&db, "creator@example.com");
        let joiner = user(&db, "joiner@example.com");
        let gid = group(&db, &creator, "bakers", GroupType::Public);
        db.insert_membership("m1", &joiner, &gid, MembershipRole::Member, MembershipStatus::Active)
            .unwrap();
        let err = db
            .insert_membership("m2", &joiner, &gid, MembershipRole::Member, MembershipStatus::Pending)
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn private_groups_listed_only_for_members() {
        let db = db();
        let creator = user(&db, "creator@example.com");
        let outsider = user(&db, "outsider@example.com");
        group(&db, &creator, "public-one", GroupType::Public);
        group(&db, &creator, "secret-one", GroupType::Private);

        assert_eq!(db.list_groups(None, None, None).unwrap().len(), 1);
        assert_eq!(db.list_groups(Some(&outsider), None, None).unwrap().len(), 1);
        assert_eq!(db.list_groups(Some(&creator), None, None).unwrap().len(), 2);
        let private = db.list_groups(Some(&creator), Some(GroupType::Private), None).unwrap();
        assert_eq!(private.len(), 1);
        assert_eq!(private[0].group.slug, "secret-one");
        assert_eq!(db.list_groups(None, None, Some("public")).unwrap().len(), 1);
    }

    #[test]
    fn banned_members_do_not_see_private_groups() {
        let db = db();
        let creator = user(&db, "creator@example.com");
        let pending = user(&db, "pending@example.com");
        let banned = user(&db, "banned@example.com");
        let gid = group(&db, &creator, "secret-one", GroupType::Private);
        db.insert_membership("m1", &pending, &gid, MembershipRole::Member, MembershipStatus::Pending)
            .unwrap();
        db.insert_membership("m2", &banned, &gid, MembershipRole::Member, MembershipStatus::Active)
            .unwrap();
        assert!(db.ban_member(&banned, &gid).unwrap());

        assert_eq!(db.list_groups(Some(&pending), None, None).unwrap().len(), 1);
        assert!(db.list_groups(Some(&banned), None, None).unwrap().is_empty());
    }

    #[test]
    fn search_wildcards_match_literally() {
        let db = db();
        let creator = user(&db, "creator@example.com");
        group(&db, &creator, "bread-club", GroupType::Public);
        group(&db, &creator, "half_baked", GroupType::Public);
        group(&db, &creator, "100%-rye", GroupType::Public);

        let names = |q: &str| -> Vec<String> {
            db.list_groups(None, None, Some(q))
                .unwrap()
                .into_iter()
                .map(|g| g.group.name)
                .collect()
        };
        assert_eq!(names("_"), vec!["half_baked"]);
        assert_eq!(names("%"), vec!["100%-rye"]);
        assert_eq!(names("bread"), vec!["bread-club"]);
    }

    #[test]
    fn ban_demotes_to_member() {
        let db = db();
        let creator = user(&db, "creator@example.com");
        let moderator = user(&db, "mod@example.com");
        let gid = group(&db, &creator, "grill-masters", GroupType::Public);
        db.insert_membership("m1", &moderator, &gid, MembershipRole::Moderator, MembershipStatus::Active)
            .unwrap();

        assert!(db.ban_member(&moderator, &gid).unwrap());
        let m = db.get_membership(&moderator, &gid).unwrap().unwrap();
        assert_eq!(m.status, MembershipStatus::Banned);
        assert_eq!(m.role, MembershipRole::Member);
        assert!(!db.ban_member("nobody", &gid).unwrap());
    }

    #[test]
    fn members_sorted_by_seniority() {
        let db = db();
        let creator = user(&db, "creator@example.com");
        let a = user(&db, "a@example.com");
        let b = user(&db, "b@example.com");
        let gid = group(&db, &creator, "grillers", GroupType::Public);
        db.insert_membership("m1", &a, &gid, MembershipRole::Member, MembershipStatus::Active)
            .unwrap();
        db.insert_membership("m2", &b, &gid, MembershipRole::Moderator, MembershipStatus::Active)
            .unwrap();
        let roles: Vec<_> = db
            .list_members(&gid)
            .unwrap()
            .into_iter()
            .map(|m| m.membership.role)
            .collect();
        assert_eq!(
            roles,
            vec![MembershipRole::Admin, MembershipRole::Moderator, MembershipRole::Member]
        );
    }

    #[test]
    fn partial_update_keeps_other_columns() {
        let db = db();
        let creator = user(&db, "creator@example.com");
        let gid = group(&db, &creator, "soups", GroupType::Public);
        db.update_group(
            &gid,
            &GroupUpdate {
                description: Some("All about soup"),
                ..Default::default()
            },
        )
        .unwrap();
        let g = db.get_group_by_id(&gid).unwrap().unwrap().group;
        assert_eq!(g.name, "soups");
        assert_eq!(g.description.as_deref(), Some("All about soup"));
    }

    #[test]
    fn messages_page_newest_first() {
        let db = db();
        let creator = user(&db, "creator@example.com");
        let gid = group(&db, &creator, "night-owls", GroupType::Private);
        for i in 0..3 {
            db.insert_group_message(&format!("msg{i}"), &gid, &creator, &format!("hello {i}"), None)
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        db.insert_group_message("pic", &gid, &creator, "", Some("https://img/cake.jpg"))
            .unwrap();

        let page = db.list_group_messages(&gid, 2, 0).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "pic");
        assert_eq!(page[0].image_url.as_deref(), Some("https://img/cake.jpg"));
        assert_eq!(page[1].id, "msg2");
        assert_eq!(db.count_group_messages(&gid).unwrap(), 4);
        assert_eq!(db.get_group_message("msg0").unwrap().unwrap().content, "hello 0");
    }
}
