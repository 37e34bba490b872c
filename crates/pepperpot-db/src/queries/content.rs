use super::{OptionalExt, count};
use crate::Database;
use crate::models::{CookingHackRow, KitchenTipRow, TrendPostRow};
use anyhow::Result;
use pepperpot_types::models::ContentKind;
use rusqlite::{Connection, Row};

/// Ids chosen to be featured after a rotation, per content kind.
#[derive(Debug, Default, Clone)]
pub struct ContentSelection {
    pub tips: Vec<String>,
    pub hacks: Vec<String>,
    pub trends: Vec<String>,
}

fn table(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::KitchenTip => "kitchen_tips",
        ContentKind::CookingHack => "cooking_hacks",
        ContentKind::FoodTrend => "trend_posts",
    }
}

impl Database {
    pub fn insert_kitchen_tip(&self, tip: &KitchenTipRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kitchen_tips (id, title, slug, category, content, featured, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    tip.id,
                    tip.title,
                    tip.slug,
                    tip.category,
                    tip.content,
                    tip.featured,
                    tip.published_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn insert_cooking_hack(&self, hack: &CookingHackRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cooking_hacks (id, title, slug, difficulty, content, time_to_read, featured, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    hack.id,
                    hack.title,
                    hack.slug,
                    hack.difficulty,
                    hack.content,
                    hack.time_to_read,
                    hack.featured,
                    hack.published_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn insert_trend_post(&self, trend: &TrendPostRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO trend_posts (id, title, slug, summary, content, featured, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    trend.id,
                    trend.title,
                    trend.slug,
                    trend.summary,
                    trend.content,
                    trend.featured,
                    trend.published_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn count_content(&self, kind: ContentKind) -> Result<u64> {
        self.with_conn(|conn| {
            let sql = format!("SELECT COUNT(*) FROM {}", table(kind));
            Ok(conn.query_row(&sql, [], |row| count(row, 0))?)
        })
    }

    /// Ids of the `limit` most recently published items of `kind`.
    pub fn recent_content_ids(&self, kind: ContentKind, limit: u32) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id FROM {} ORDER BY published_at DESC LIMIT ?1",
                table(kind)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    /// Clears every featured flag, then sets it on the selected ids, atomically.
    pub fn apply_rotation(&self, selection: &ContentSelection) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for (kind, ids) in [
                (ContentKind::KitchenTip, &selection.tips),
                (ContentKind::CookingHack, &selection.hacks),
                (ContentKind::FoodTrend, &selection.trends),
            ] {
                let table = table(kind);
                tx.execute(&format!("UPDATE {table} SET featured = 0 WHERE featured = 1"), [])?;
                for id in ids {
                    tx.execute(&format!("UPDATE {table} SET featured = 1 WHERE id = ?1"), [id])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Newest tips first; `featured_only` narrows to the current featured set.
    pub fn list_tips(&self, featured_only: bool, limit: u32) -> Result<Vec<KitchenTipRow>> {
        self.with_conn(|conn| {
            let mut stmt = list_stmt(conn, TIP_COLUMNS, ContentKind::KitchenTip, featured_only)?;
            let rows = stmt
                .query_map([limit], tip_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_tip_by_slug(&self, slug: &str) -> Result<Option<KitchenTipRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {TIP_COLUMNS} FROM kitchen_tips WHERE slug = ?1");
            conn.query_row(&sql, [slug], tip_from_row).optional()
        })
    }

    pub fn list_hacks(&self, featured_only: bool, limit: u32) -> Result<Vec<CookingHackRow>> {
        self.with_conn(|conn| {
            let mut stmt = list_stmt(conn, HACK_COLUMNS, ContentKind::CookingHack, featured_only)?;
            let rows = stmt
                .query_map([limit], hack_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_hack_by_slug(&self, slug: &str) -> Result<Option<CookingHackRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {HACK_COLUMNS} FROM cooking_hacks WHERE slug = ?1");
            conn.query_row(&sql, [slug], hack_from_row).optional()
        })
    }

    pub fn list_trends(&self, featured_only: bool, limit: u32) -> Result<Vec<TrendPostRow>> {
        self.with_conn(|conn| {
            let mut stmt = list_stmt(conn, TREND_COLUMNS, ContentKind::FoodTrend, featured_only)?;
            let rows = stmt
                .query_map([limit], trend_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

const TIP_COLUMNS: &str = "id, title, slug, category, content, featured, published_at";
const HACK_COLUMNS: &str = "id, title, slug, difficulty, content, time_to_read, featured, published_at";
const TREND_COLUMNS: &str = "id, title, slug, summary, content, featured, published_at";

fn list_stmt<'c>(
    conn: &'c Connection,
    columns: &str,
    kind: ContentKind,
    featured_only: bool,
) -> rusqlite::Result<rusqlite::Statement<'c>> {
    let filter = if featured_only { "WHERE featured = 1" } else { "" };
    conn.prepare(&format!(
        "SELECT {columns} FROM {} {filter} ORDER BY published_at DESC LIMIT ?1",
        table(kind)
    ))
}

fn tip_from_row(row: &Row<'_>) -> rusqlite::Result<KitchenTipRow> {
    Ok(KitchenTipRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        category: row.get(3)?,
        content: row.get(4)?,
        featured: row.get(5)?,
        published_at: row.get(6)?,
    })
}

fn hack_from_row(row: &Row<'_>) -> rusqlite::Result<CookingHackRow> {
    Ok(CookingHackRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        difficulty: row.get(3)?,
        content: row.get(4)?,
        time_to_read: row.get(5)?,
        featured: row.get(6)?,
        published_at: row.get(7)?,
    })
}

fn trend_from_row(row: &Row<'_>) -> rusqlite::Result<TrendPostRow> {
    Ok(TrendPostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        summary: row.get(3)?,
        content: row.get(4)?,
        featured: row.get(5)?,
        published_at: row.get(6)?,
    })
}
