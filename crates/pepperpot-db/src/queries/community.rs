use super::{OptionalExt, author_at, count};
use crate::Database;
use crate::models::{CommentRow, PostRow, ReactionRow};
use anyhow::Result;
use chrono::Utc;
use rusqlite::Row;

/// What a reaction is attached to.
#[derive(Debug, Clone, Copy)]
pub enum ReactionTarget<'a> {
    Post(&'a str),
    Message(&'a str),
}

impl ReactionTarget<'_> {
    fn column(&self) -> &'static str {
        match self {
            Self::Post(_) => "post_id",
            Self::Message(_) => "message_id",
        }
    }

    fn id(&self) -> &str {
        match self {
            Self::Post(id) | Self::Message(id) => id,
        }
    }
}

const POST_SELECT: &str = "SELECT p.id, p.content, p.image_url, p.created_at,
        (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id),
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
        u.id, u.name, u.image
     FROM posts p
     JOIN users u ON u.id = p.author_id";

impl Database {
    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        author_id: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, content, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, author_id, content, image_url, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} WHERE p.id = ?1");
            conn.query_row(&sql, [id], post_from_row).optional()
        })
    }

    pub fn list_posts(&self, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} ORDER BY p.created_at DESC, p.rowid DESC LIMIT ?1 OFFSET ?2");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![limit, offset], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_posts(&self) -> Result<u64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM posts", [], |row| count(row, 0))?))
    }

    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, id: &str, post_id: &str, author_id: &str, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, post_id, author_id, content, Utc::now()],
            )?;
            Ok(())
        })
    }

    /// Oldest first, so threads read top to bottom.
    pub fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.content, c.created_at, u.id, u.name, u.image
                 FROM comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC",
            )?;
            let rows = stmt
                .query_map([post_id], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT c.id, c.post_id, c.content, c.created_at, u.id, u.name, u.image
                 FROM comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.id = ?1",
                [id],
                comment_from_row,
            )
            .optional()
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Likes --

    /// Toggle a like. Returns true when the post is liked afterwards.
    pub fn toggle_like(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                (user_id, post_id),
            )?;
            if removed == 0 {
                tx.execute(
                    "INSERT INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![user_id, post_id, Utc::now()],
                )?;
            }
            tx.commit()?;
            Ok(removed == 0)
        })
    }

    // -- Reactions --

    /// Toggle a reaction: removes if exists, inserts if not.
    /// Returns true when the reaction was added, false when it was removed.
    pub fn toggle_reaction(
        &self,
        id: &str,
        target: ReactionTarget<'_>,
        user_id: &str,
        emoji: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let column = target.column();
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    &format!(
                        "SELECT id FROM reactions WHERE {column} = ?1 AND user_id = ?2 AND emoji = ?3"
                    ),
                    (target.id(), user_id, emoji),
                    |row| row.get(0),
                )
                .optional()?;

            let added = match existing {
                Some(existing_id) => {
                    tx.execute("DELETE FROM reactions WHERE id = ?1", [&existing_id])?;
                    false
                }
                None => {
                    tx.execute(
                        &format!(
                            "INSERT INTO reactions (id, {column}, user_id, emoji, created_at)
                             VALUES (?1, ?2, ?3, ?4, ?5)"
                        ),
                        rusqlite::params![id, target.id(), user_id, emoji, Utc::now()],
                    )?;
                    true
                }
            };
            tx.commit()?;
            Ok(added)
        })
    }

    pub fn list_reactions(&self, target: ReactionTarget<'_>) -> Result<Vec<ReactionRow>> {
        let ids = [target.id().to_string()];
        self.reactions_for_targets(target, &ids)
    }

    /// Batch-fetch reactions for a set of targets of the same kind as `kind`.
    pub fn reactions_for_targets(
        &self,
        kind: ReactionTarget<'_>,
        target_ids: &[String],
    ) -> Result<Vec<ReactionRow>> {
        if target_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let column = kind.column();
            let placeholders: Vec<String> = (1..=target_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, {column}, user_id, emoji, created_at FROM reactions
                 WHERE {column} IN ({}) ORDER BY created_at ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(target_ids.iter()), |row| {
                    Ok(ReactionRow {
                        id: row.get(0)?,
                        target_id: row.get(1)?,
                        user_id: row.get(2)?,
                        emoji: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        content: row.get(1)?,
        image_url: row.get(2)?,
        created_at: row.get(3)?,
        like_count: count(row, 4)?,
        comment_count: count(row, 5)?,
        author: author_at(row, 6)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        author: author_at(row, 4)?,
    })
}
