use super::{OptionalExt, count};
use crate::Database;
use crate::models::RecipeRow;
use anyhow::Result;
use rusqlite::Row;

/// Optional, case-insensitive equality filters on the recipe catalogue.
#[derive(Debug, Default, Clone)]
pub struct RecipeFilter {
    pub category: Option<String>,
    pub cuisine: Option<String>,
    pub occasion: Option<String>,
}

const RECIPE_COLUMNS: &str =
    "id, title, slug, category, cuisine, occasion, summary, image_url, created_at";

const FILTER_CLAUSE: &str = "(?1 IS NULL OR LOWER(category) = LOWER(?1))
       AND (?2 IS NULL OR LOWER(cuisine) = LOWER(?2))
       AND (?3 IS NULL OR LOWER(occasion) = LOWER(?3))";

impl Database {
    pub fn insert_recipe(&self, recipe: &RecipeRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO recipes (id, title, slug, category, cuisine, occasion, summary, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    recipe.id,
                    recipe.title,
                    recipe.slug,
                    recipe.category,
                    recipe.cuisine,
                    recipe.occasion,
                    recipe.summary,
                    recipe.image_url,
                    recipe.created_at
                ],
            )?;
            Ok(())
        })
    }

    /// Newest first, paged by `limit`/`offset`, narrowed by `filter`.
    pub fn filter_recipes(
        &self,
        filter: &RecipeFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RecipeRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes WHERE {FILTER_CLAUSE}
                 ORDER BY created_at DESC LIMIT ?4 OFFSET ?5"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![filter.category, filter.cuisine, filter.occasion, limit, offset],
                    recipe_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_recipe_by_slug(&self, slug: &str) -> Result<Option<RecipeRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE slug = ?1");
            conn.query_row(&sql, [slug], recipe_from_row).optional()
        })
    }

    pub fn count_recipes(&self, filter: &RecipeFilter) -> Result<u64> {
        self.with_conn(|conn| {
            let sql = format!("SELECT COUNT(*) FROM recipes WHERE {FILTER_CLAUSE}");
            let n = conn.query_row(
                &sql,
                rusqlite::params![filter.category, filter.cuisine, filter.occasion],
                |row| count(row, 0),
            )?;
            Ok(n)
        })
    }
}

fn recipe_from_row(row: &Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        category: row.get(3)?,
        cuisine: row.get(4)?,
        occasion: row.get(5)?,
        summary: row.get(6)?,
        image_url: row.get(7)?,
        created_at: row.get(8)?,
    })
}
