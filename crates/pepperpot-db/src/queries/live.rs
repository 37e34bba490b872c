use super::{OptionalExt, author_at, count, text_enum};
use crate::Database;
use crate::models::{LiveCommentRow, LiveSessionRow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use pepperpot_types::api::LiveLikeAction;
use pepperpot_types::models::LiveStatus;
use rusqlite::{Connection, Row};

/// Which sessions a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveFilter {
    Live,
    Ended,
    All,
}

const ENDED_LISTING_LIMIT: u32 = 20;

const SESSION_SELECT: &str = "SELECT s.id, s.title, s.description, s.room_name, s.room_sid, s.status,
        s.started_at, s.ended_at, s.viewer_count, s.max_viewers, u.id, u.name, u.image
     FROM live_sessions s
     JOIN users u ON u.id = s.host_id";

impl Database {
    // -- Sessions --

    pub fn insert_live_session(
        &self,
        id: &str,
        host_id: &str,
        title: &str,
        description: Option<&str>,
        room_name: &str,
        room_sid: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO live_sessions (id, host_id, title, description, room_name, room_sid, status, started_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    host_id,
                    title,
                    description,
                    room_name,
                    room_sid,
                    LiveStatus::Live.as_str(),
                    Utc::now()
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_live_session(&self, id: &str) -> Result<Option<LiveSessionRow>> {
        self.with_conn(|conn| query_session(conn, "s.id", id))
    }

    pub fn get_live_session_by_room(&self, room_name: &str) -> Result<Option<LiveSessionRow>> {
        self.with_conn(|conn| query_session(conn, "s.room_name", room_name))
    }

    /// Live sessions newest first; ended ones capped at the most recent 20.
    pub fn list_live_sessions(&self, filter: LiveFilter) -> Result<Vec<LiveSessionRow>> {
        self.with_conn(|conn| {
            let sql = match filter {
                LiveFilter::Live => {
                    format!("{SESSION_SELECT} WHERE s.ended_at IS NULL ORDER BY s.started_at DESC")
                }
                LiveFilter::Ended => format!(
                    "{SESSION_SELECT} WHERE s.ended_at IS NOT NULL ORDER BY s.ended_at DESC LIMIT {ENDED_LISTING_LIMIT}"
                ),
                LiveFilter::All => format!("{SESSION_SELECT} ORDER BY s.started_at DESC"),
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], session_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks the session ended. Returns false when it had already ended, in
    /// which case `ended_at` is left untouched.
    pub fn end_live_session(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| end_where(conn, "id", id, at))
    }

    pub fn end_live_session_by_room(&self, room_name: &str, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| end_where(conn, "room_name", room_name, at))
    }

    /// Counts a joining viewer and raises `max_viewers` to the new peak.
    pub fn participant_joined(&self, room_name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE live_sessions
                 SET viewer_count = viewer_count + 1,
                     max_viewers = MAX(max_viewers, viewer_count + 1)
                 WHERE room_name = ?1 AND ended_at IS NULL",
                [room_name],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn participant_left(&self, room_name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE live_sessions SET viewer_count = MAX(viewer_count - 1, 0)
                 WHERE room_name = ?1 AND ended_at IS NULL",
                [room_name],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Co-hosts --

    pub fn add_cohost(&self, session_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO live_cohosts (session_id, user_id, added_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![session_id, user_id, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn list_cohosts(&self, session_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id FROM live_cohosts WHERE session_id = ?1 ORDER BY added_at ASC",
            )?;
            let rows = stmt
                .query_map([session_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    pub fn is_cohost(&self, session_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM live_cohosts WHERE session_id = ?1 AND user_id = ?2)",
                [session_id, user_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    // -- Comments --

    pub fn insert_live_comment(
        &self,
        id: &str,
        session_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO live_comments (id, session_id, user_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, session_id, user_id, content, Utc::now()],
            )?;
            Ok(())
        })
    }

    /// The most recent `limit` comments, returned oldest first.
    pub fn list_live_comments(&self, session_id: &str, limit: u32) -> Result<Vec<LiveCommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM (
                    SELECT c.id, c.session_id, c.content, c.created_at, u.id, u.name, u.image
                    FROM live_comments c
                    JOIN users u ON u.id = c.user_id
                    WHERE c.session_id = ?1
                    ORDER BY c.created_at DESC
                    LIMIT ?2
                 ) ORDER BY 4 ASC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![session_id, limit], live_comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_live_comment(&self, id: &str) -> Result<Option<LiveCommentRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT c.id, c.session_id, c.content, c.created_at, u.id, u.name, u.image
                 FROM live_comments c
                 JOIN users u ON u.id = c.user_id
                 WHERE c.id = ?1",
                [id],
                live_comment_from_row,
            )
            .optional()
        })
    }

    // -- Likes --

    /// Same value twice removes the vote, the other value flips it.
    pub fn toggle_live_like(
        &self,
        session_id: &str,
        user_id: &str,
        is_like: bool,
    ) -> Result<LiveLikeAction> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let existing: Option<bool> = tx
                .query_row(
                    "SELECT is_like FROM live_likes WHERE session_id = ?1 AND user_id = ?2",
                    [session_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;

            let action = match existing {
                Some(current) if current == is_like => {
                    tx.execute(
                        "DELETE FROM live_likes WHERE session_id = ?1 AND user_id = ?2",
                        [session_id, user_id],
                    )?;
                    LiveLikeAction::Removed
                }
                Some(_) => {
                    tx.execute(
                        "UPDATE live_likes SET is_like = ?1 WHERE session_id = ?2 AND user_id = ?3",
                        rusqlite::params![is_like, session_id, user_id],
                    )?;
                    LiveLikeAction::Updated
                }
                None => {
                    tx.execute(
                        "INSERT INTO live_likes (session_id, user_id, is_like) VALUES (?1, ?2, ?3)",
                        rusqlite::params![session_id, user_id, is_like],
                    )?;
                    LiveLikeAction::Created
                }
            };
            tx.commit()?;
            Ok(action)
        })
    }

    /// (likes, dislikes, the given user's vote)
    pub fn live_like_stats(
        &self,
        session_id: &str,
        user_id: Option<&str>,
    ) -> Result<(u64, u64, Option<bool>)> {
        self.with_conn(|conn| {
            let (likes, dislikes) = conn.query_row(
                "SELECT COALESCE(SUM(is_like = 1), 0), COALESCE(SUM(is_like = 0), 0)
                 FROM live_likes WHERE session_id = ?1",
                [session_id],
                |row| Ok((count(row, 0)?, count(row, 1)?)),
            )?;
            let mine = match user_id {
                Some(user_id) => conn
                    .query_row(
                        "SELECT is_like FROM live_likes WHERE session_id = ?1 AND user_id = ?2",
                        [session_id, user_id],
                        |row| row.get(0),
                    )
                    .optional()?,
                None => None,
            };
            Ok((likes, dislikes, mine))
        })
    }
}

fn query_session(conn: &Connection, column: &str, value: &str) -> Result<Option<LiveSessionRow>> {
    let sql = format!("{SESSION_SELECT} WHERE {column} = ?1");
    conn.query_row(&sql, [value], session_from_row).optional()
}

fn end_where(conn: &Connection, column: &str, value: &str, at: DateTime<Utc>) -> Result<bool> {
    let sql = format!(
        "UPDATE live_sessions SET status = ?1, ended_at = ?2, viewer_count = 0
         WHERE {column} = ?3 AND ended_at IS NULL"
    );
    let changed = conn.execute(&sql, rusqlite::params![LiveStatus::Ended.as_str(), at, value])?;
    Ok(changed > 0)
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<LiveSessionRow> {
    Ok(LiveSessionRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        room_name: row.get(3)?,
        room_sid: row.get(4)?,
        status: text_enum(row, 5)?,
        started_at: row.get(6)?,
        ended_at: row.get(7)?,
        viewer_count: row.get(8)?,
        max_viewers: row.get(9)?,
        host: author_at(row, 10)?,
    })
}

fn live_comment_from_row(row: &Row<'_>) -> rusqlite::Result<LiveCommentRow> {
    Ok(LiveCommentRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        author: author_at(row, 4)?,
    })
}
