mod commerce;
mod community;
mod content;
mod groups;
mod live;
mod recipes;
mod users;

pub use community::ReactionTarget;
pub use content::ContentSelection;
pub use live::LiveFilter;
pub use recipes::RecipeFilter;

use crate::Database;
use crate::models::AuthorRow;
use anyhow::Result;
use rusqlite::Row;
use rusqlite::types::Type;
use std::str::FromStr;

/// Tables whose rows are addressed by a unique slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugScope {
    Groups,
    KitchenTips,
    CookingHacks,
    TrendPosts,
    Recipes,
}

impl SlugScope {
    fn table(self) -> &'static str {
        match self {
            Self::Groups => "groups",
            Self::KitchenTips => "kitchen_tips",
            Self::CookingHacks => "cooking_hacks",
            Self::TrendPosts => "trend_posts",
            Self::Recipes => "recipes",
        }
    }
}

impl Database {
    pub fn slug_exists(&self, scope: SlugScope, slug: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE slug = ?1)", scope.table());
            let exists: bool = conn.query_row(&sql, [slug], |row| row.get(0))?;
            Ok(exists)
        })
    }
}

/// Reads a text column holding one of the `pepperpot_types::models` enums.
pub(crate) fn text_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads three consecutive author columns (id, name, image) starting at `idx`.
pub(crate) fn author_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<AuthorRow> {
    Ok(AuthorRow {
        id: row.get(idx)?,
        name: row.get(idx + 1)?,
        image: row.get(idx + 2)?,
    })
}

pub(crate) fn count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let n: i64 = row.get(idx)?;
    Ok(n.max(0) as u64)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
