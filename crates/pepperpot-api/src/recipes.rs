use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use pepperpot_db::models::RecipeRow;
use pepperpot_db::{RecipeFilter, SlugScope};
use pepperpot_types::api::{
    CreateRecipeRequest, ExternalRecipe, FilteredRecipe, Pagination, RecipeDetail,
    RecipeFilterResponse, RecipeFilters, RecipePage, RecipeSource, SourceBreakdown,
};

use crate::auth::non_empty;
use crate::community::PageQuery;
use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody};
use crate::permissions;
use crate::slug::unique_slug;
use crate::state::{AppState, with_db};
use crate::views;

const MAX_FILTER_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    pub category: Option<String>,
    pub cuisine: Option<String>,
    pub occasion: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_filter_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_filter_limit() -> u32 {
    12
}

/// Local results cover the page when they fill at least half of it.
fn local_is_enough(local: usize, limit: u32) -> bool {
    local as u64 * 2 >= limit as u64
}

/// Search text for the external provider, if the filter names anything it
/// can search by.
fn external_query(filter: &RecipeFilter) -> Option<String> {
    let terms: Vec<&str> = [filter.category.as_deref(), filter.cuisine.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    (!terms.is_empty()).then(|| terms.join(" "))
}

pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<RecipePage>, ApiError> {
    let (page, limit, offset) = query.resolve();
    let (rows, total) = with_db(&state, move |db| {
        let filter = RecipeFilter::default();
        let rows = db.filter_recipes(&filter, limit, offset)?;
        let total = db.count_recipes(&filter)?;
        Ok::<_, anyhow::Error>((rows, total))
    })
    .await?;

    Ok(Json(RecipePage {
        recipes: rows.into_iter().map(views::recipe).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let row = with_db(&state, move |db| db.get_recipe_by_slug(&slug))
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;
    Ok(Json(RecipeDetail {
        recipe: views::recipe(row),
    }))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = non_empty(req.title).ok_or_else(|| ApiError::validation("Title is required"))?;
    let user_id = user.id();

    let recipe = with_db(&state, move |db| {
        if !permissions::is_global_admin(db, &user_id) {
            return Err(ApiError::forbidden("Admin access required"));
        }
        let row = RecipeRow {
            id: Uuid::new_v4().to_string(),
            slug: unique_slug(db, SlugScope::Recipes, &title)?,
            title,
            category: non_empty(req.category),
            cuisine: non_empty(req.cuisine),
            occasion: non_empty(req.occasion),
            summary: non_empty(req.summary),
            image_url: non_empty(req.image_url),
            created_at: Utc::now(),
        };
        db.insert_recipe(&row)?;
        Ok(views::recipe(row))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(recipe)))
}

/// Local catalogue first; thin results are topped up from the external
/// search provider when one is configured.
pub async fn filter_recipes(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<RecipeFilterResponse>, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, MAX_FILTER_LIMIT);
    let filter = RecipeFilter {
        category: non_empty(query.category),
        cuisine: non_empty(query.cuisine),
        occasion: non_empty(query.occasion),
    };
    let filters = RecipeFilters {
        category: filter.category.clone(),
        cuisine: filter.cuisine.clone(),
        occasion: filter.occasion.clone(),
    };
    debug!(?filters, page, limit, "Filtering recipes");

    let (rows, total_local) = {
        let filter = filter.clone();
        let offset = (page - 1).saturating_mul(limit);
        with_db(&state, move |db| {
            let rows = db.filter_recipes(&filter, limit, offset)?;
            let total = db.count_recipes(&filter)?;
            Ok::<_, anyhow::Error>((rows, total))
        })
        .await?
    };
    let local: Vec<FilteredRecipe> = rows
        .into_iter()
        .map(|r| FilteredRecipe::Local(views::recipe(r)))
        .collect();

    if local_is_enough(local.len(), limit) {
        return Ok(Json(RecipeFilterResponse {
            success: true,
            recipes: local,
            total: total_local,
            page,
            limit,
            source: RecipeSource::Database,
            filters,
            breakdown: None,
        }));
    }

    let mut external: Vec<ExternalRecipe> = Vec::new();
    if let (Some(search), Some(q)) = (&state.recipe_search, external_query(&filter)) {
        let wanted = limit - local.len() as u32;
        match search.search(&q, wanted).await {
            Ok(found) => external = found,
            Err(e) => warn!(query = %q, "External recipe search failed: {}", e),
        }
    }

    let breakdown = SourceBreakdown {
        database: local.len(),
        external: external.len(),
    };
    let source = if local.is_empty() {
        RecipeSource::External
    } else {
        RecipeSource::Mixed
    };
    let total = total_local + external.len() as u64;
    let recipes = local
        .into_iter()
        .chain(external.into_iter().map(FilteredRecipe::External))
        .collect();

    Ok(Json(RecipeFilterResponse {
        success: true,
        recipes,
        total,
        page,
        limit,
        source,
        filters,
        breakdown: Some(breakdown),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_a_page_of_local_results_is_enough() {
        assert!(local_is_enough(6, 12));
        assert!(!local_is_enough(5, 12));
        assert!(local_is_enough(1, 1));
        assert!(!local_is_enough(0, 1));
    }

    #[test]
    fn external_query_uses_category_and_cuisine_only() {
        let filter = RecipeFilter {
            category: Some("dinner".into()),
            cuisine: Some("thai".into()),
            occasion: Some("party".into()),
        };
        assert_eq!(external_query(&filter).as_deref(), Some("dinner thai"));

        let occasion_only = RecipeFilter {
            occasion: Some("party".into()),
            ..Default::default()
        };
        assert_eq!(external_query(&occasion_only), None);
    }
}
