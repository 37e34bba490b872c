//! Generated kitchen content: on-demand generation, the daily bundle, the
//! featured rotation and first-boot initialisation.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use chrono::Utc;
use futures_util::FutureExt;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use pepperpot_db::models::{CookingHackRow, KitchenTipRow, TrendPostRow};
use pepperpot_db::{ContentSelection, Database, SlugScope};
use pepperpot_providers::{ContentPrompt, GeneratedContent, TextGenerator, generate_content};
use pepperpot_types::api::{
    ContentCounts, ContentRef, DailyContentResponse, DailyGenerated, FeaturedContent,
    FeaturedCounts, FeaturedResponse, GenerateContentRequest, GenerateContentResponse,
    GeneratedItem, HackDetail, HackList, InitContentResponse, RotationResponse, TipDetail,
    TipList,
};
use pepperpot_types::models::ContentKind;

use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody};
use crate::middleware::bearer_token;
use crate::permissions;
use crate::slug::unique_slug;
use crate::state::{AppState, with_db};
use crate::views;

pub const TIP_CATEGORIES: [&str; 5] = [
    "knife-skills",
    "food-safety",
    "storage",
    "meal-prep",
    "cooking-basics",
];
pub const HACK_DIFFICULTIES: [&str; 3] = ["easy", "medium", "advanced"];

const INVALID_TYPE: &str = "Invalid type. Must be kitchen-tip, cooking-hack, or food-trend";
const MAX_BATCH: u32 = 10;
const FEATURED_LIMIT: u32 = 3;
const ROTATION_POOL: u32 = 10;
const SUMMARY_FALLBACK_CHARS: usize = 200;
const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_LIST_LIMIT: u32 = 100;

/// Roughly ten seconds of reading per 200 characters.
pub fn time_to_read(content: &str) -> u32 {
    let chars = content.chars().count() as u32;
    chars.div_ceil(200) * 10
}

fn summary_or_excerpt(summary: Option<String>, content: &str) -> String {
    summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| content.chars().take(SUMMARY_FALLBACK_CHARS).collect())
}

/// Stores one generated item under a fresh unique slug.
fn save_generated(
    db: &Database,
    kind: ContentKind,
    generated: GeneratedContent,
    category: Option<&str>,
    difficulty: Option<&str>,
) -> anyhow::Result<GeneratedItem> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let GeneratedContent {
        title,
        content,
        summary,
        category: generated_category,
        difficulty: generated_difficulty,
    } = generated;

    let item = match kind {
        ContentKind::KitchenTip => {
            let row = KitchenTipRow {
                id,
                slug: unique_slug(db, SlugScope::KitchenTips, &title)?,
                title,
                category: generated_category
                    .or_else(|| category.map(str::to_string))
                    .unwrap_or_else(|| "cooking-basics".into()),
                content,
                featured: false,
                published_at: now,
            };
            db.insert_kitchen_tip(&row)?;
            GeneratedItem::Tip(views::kitchen_tip(row))
        }
        ContentKind::CookingHack => {
            let row = CookingHackRow {
                id,
                slug: unique_slug(db, SlugScope::CookingHacks, &title)?,
                title,
                difficulty: generated_difficulty
                    .or_else(|| difficulty.map(str::to_string))
                    .unwrap_or_else(|| "easy".into()),
                time_to_read: time_to_read(&content),
                content,
                featured: false,
                published_at: now,
            };
            db.insert_cooking_hack(&row)?;
            GeneratedItem::Hack(views::cooking_hack(row))
        }
        ContentKind::FoodTrend => {
            let row = TrendPostRow {
                id,
                slug: unique_slug(db, SlugScope::TrendPosts, &title)?,
                title,
                summary: summary_or_excerpt(summary, &content),
                content,
                featured: false,
                published_at: now,
            };
            db.insert_trend_post(&row)?;
            GeneratedItem::Trend(views::trend_post(row))
        }
    };
    Ok(item)
}

/// Asks the text provider for one item and persists it.
pub async fn generate_one(
    state: &AppState,
    generator: &dyn TextGenerator,
    prompt: ContentPrompt<'_>,
) -> Result<GeneratedItem, ApiError> {
    let generated = generate_content(generator, &prompt)
        .await
        .map_err(|e| ApiError::external("Failed to generate content", e))?;

    let kind = prompt.kind;
    let category = prompt.category.map(str::to_string);
    let difficulty = prompt.difficulty.map(str::to_string);
    let item = with_db(state, move |db| {
        save_generated(db, kind, generated, category.as_deref(), difficulty.as_deref())
    })
    .await?;

    info!(kind = %kind.as_str(), id = %item.id(), title = %item.title(), "Generated content saved");
    Ok(item)
}

async fn pause(state: &AppState) {
    let delay = state.settings.content_batch_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Generates `count` items of `kind`, cycling through `variants` for the
/// category or difficulty. Failed items are logged and skipped.
async fn generate_batch(
    state: &AppState,
    generator: &dyn TextGenerator,
    kind: ContentKind,
    variants: &[&str],
    count: u32,
) -> Vec<GeneratedItem> {
    let mut items = Vec::with_capacity(count as usize);
    for i in 0..count {
        let variant = variants[i as usize % variants.len()];
        let prompt = match kind {
            ContentKind::CookingHack => ContentPrompt {
                kind,
                category: None,
                difficulty: Some(variant),
            },
            _ => ContentPrompt {
                kind,
                category: Some(variant),
                difficulty: None,
            },
        };

        match generate_one(state, generator, prompt).await {
            Ok(item) => items.push(item),
            Err(e) => error!(kind = %kind.as_str(), "Batch item {} failed: {}", i + 1, e),
        }
        if i + 1 < count {
            pause(state).await;
        }
    }
    items
}

/// One tip, one hack and one trend. Any failure aborts the bundle.
pub async fn daily_bundle(state: &AppState) -> Result<DailyGenerated, ApiError> {
    let generator = state.text_generator()?;

    let mut refs = Vec::with_capacity(3);
    for (i, kind) in [ContentKind::KitchenTip, ContentKind::CookingHack, ContentKind::FoodTrend]
        .into_iter()
        .enumerate()
    {
        if i > 0 {
            pause(state).await;
        }
        let prompt = ContentPrompt {
            kind,
            category: None,
            difficulty: None,
        };
        let item = generate_one(state, generator.as_ref(), prompt).await?;
        refs.push(ContentRef {
            id: item.id().to_string(),
            title: item.title().to_string(),
        });
    }

    let mut refs = refs.into_iter();
    match (refs.next(), refs.next(), refs.next()) {
        (Some(tip), Some(hack), Some(trend)) => Ok(DailyGenerated { tip, hack, trend }),
        _ => Err(ApiError::Internal(anyhow::anyhow!("daily bundle incomplete"))),
    }
}

/// Picks up to three random items among the ten newest of each kind.
fn select_featured(db: &Database) -> anyhow::Result<ContentSelection> {
    let mut rng = rand::rng();
    let mut pick = |kind: ContentKind| -> anyhow::Result<Vec<String>> {
        let pool = db.recent_content_ids(kind, ROTATION_POOL)?;
        Ok(pool
            .choose_multiple(&mut rng, FEATURED_LIMIT as usize)
            .cloned()
            .collect())
    };
    Ok(ContentSelection {
        tips: pick(ContentKind::KitchenTip)?,
        hacks: pick(ContentKind::CookingHack)?,
        trends: pick(ContentKind::FoodTrend)?,
    })
}

pub async fn rotate_featured(state: &AppState) -> Result<FeaturedCounts, ApiError> {
    let counts = with_db(state, |db| {
        let selection = select_featured(db)?;
        db.apply_rotation(&selection)?;
        Ok::<_, anyhow::Error>(FeaturedCounts {
            tips: selection.tips.len(),
            hacks: selection.hacks.len(),
            trends: selection.trends.len(),
        })
    })
    .await?;

    info!(
        tips = counts.tips,
        hacks = counts.hacks,
        trends = counts.trends,
        "Featured content rotated"
    );
    Ok(counts)
}

async fn content_counts(state: &AppState) -> Result<ContentCounts, ApiError> {
    with_db(state, |db| {
        let tips = db.count_content(ContentKind::KitchenTip)?;
        let hacks = db.count_content(ContentKind::CookingHack)?;
        let trends = db.count_content(ContentKind::FoodTrend)?;
        Ok::<_, anyhow::Error>(ContentCounts {
            tips,
            hacks,
            trends,
            total: tips + hacks + trends,
        })
    })
    .await
}

/// Seeds the daily bundle when no content exists yet. Concurrent callers
/// share one run through the state's `InitGuard`.
pub async fn auto_init(state: AppState) {
    let guard_state = state.clone();
    state
        .init_guard
        .run(move || {
            async move {
                match content_counts(&guard_state).await {
                    Ok(counts) if counts.total > 0 => {
                        info!(total = counts.total, "Content already present, skipping init");
                    }
                    Ok(_) => {
                        info!("No content found, generating initial bundle");
                        if let Err(e) = daily_bundle(&guard_state).await {
                            warn!("Initial content generation failed: {}", e);
                        }
                    }
                    Err(e) => warn!("Could not count content: {}", e),
                }
            }
            .boxed()
        })
        .await;
}

fn require_cron(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    match &state.settings.cron_secret {
        Some(secret) if bearer_token(headers) != Some(secret.as_str()) => {
            warn!("Rejected cron call with bad credentials");
            Err(ApiError::Unauthenticated)
        }
        _ => Ok(()),
    }
}

async fn require_admin(state: &AppState, user: &AuthUser) -> Result<(), ApiError> {
    let user_id = user.id();
    let is_admin =
        with_db(state, move |db| Ok::<_, ApiError>(permissions::is_global_admin(db, &user_id))).await?;
    if !is_admin {
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(())
}

// -- Handlers --

pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<GenerateContentRequest>,
) -> Result<Json<GenerateContentResponse>, ApiError> {
    require_admin(&state, &user).await?;

    let kind: ContentKind = req
        .content_type
        .as_deref()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| ApiError::validation(INVALID_TYPE))?;
    let count = req.count.unwrap_or(1).clamp(1, MAX_BATCH);
    let generator = state.text_generator()?;
    let category = req.category.as_deref();
    let difficulty = req.difficulty.as_deref();

    let generated = match kind {
        ContentKind::KitchenTip if count > 1 => {
            let variants: Vec<&str> = match category {
                Some(c) => vec![c],
                None => TIP_CATEGORIES.to_vec(),
            };
            generate_batch(&state, generator.as_ref(), kind, &variants, count).await
        }
        ContentKind::CookingHack if count > 1 => {
            generate_batch(&state, generator.as_ref(), kind, &HACK_DIFFICULTIES, count).await
        }
        _ => {
            let prompt = ContentPrompt {
                kind,
                category,
                difficulty,
            };
            vec![generate_one(&state, generator.as_ref(), prompt).await?]
        }
    };

    Ok(Json(GenerateContentResponse {
        success: true,
        content_type: kind,
        count: generated.len(),
        generated,
    }))
}

pub async fn featured(State(state): State<AppState>) -> Result<Json<FeaturedResponse>, ApiError> {
    let featured = with_db(&state, |db| {
        Ok::<_, anyhow::Error>(FeaturedContent {
            tips: db
                .list_tips(true, FEATURED_LIMIT)?
                .into_iter()
                .map(views::kitchen_tip)
                .collect(),
            hacks: db
                .list_hacks(true, FEATURED_LIMIT)?
                .into_iter()
                .map(views::cooking_hack)
                .collect(),
            trends: db
                .list_trends(true, FEATURED_LIMIT)?
                .into_iter()
                .map(views::trend_post)
                .collect(),
        })
    })
    .await?;

    let counts = FeaturedCounts {
        tips: featured.tips.len(),
        hacks: featured.hacks.len(),
        trends: featured.trends.len(),
    };
    Ok(Json(FeaturedResponse { featured, counts }))
}

#[derive(Debug, Deserialize)]
pub struct ContentListQuery {
    pub limit: Option<u32>,
    pub featured: Option<String>,
}

impl ContentListQuery {
    /// `(featured_only, limit)`; only the literal `featured=true` narrows.
    fn resolve(&self) -> (bool, u32) {
        let limit = self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        (self.featured.as_deref() == Some("true"), limit)
    }
}

pub async fn list_tips(
    State(state): State<AppState>,
    Query(query): Query<ContentListQuery>,
) -> Result<Json<TipList>, ApiError> {
    let (featured_only, limit) = query.resolve();
    let rows = with_db(&state, move |db| db.list_tips(featured_only, limit)).await?;
    let tips: Vec<_> = rows.into_iter().map(views::kitchen_tip).collect();
    Ok(Json(TipList {
        success: true,
        total: tips.len(),
        tips,
    }))
}

pub async fn get_tip(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<TipDetail>, ApiError> {
    let row = with_db(&state, move |db| db.get_tip_by_slug(&slug))
        .await?
        .ok_or_else(|| ApiError::not_found("Tip not found"))?;
    Ok(Json(TipDetail {
        tip: views::kitchen_tip(row),
    }))
}

pub async fn list_hacks(
    State(state): State<AppState>,
    Query(query): Query<ContentListQuery>,
) -> Result<Json<HackList>, ApiError> {
    let (featured_only, limit) = query.resolve();
    let rows = with_db(&state, move |db| db.list_hacks(featured_only, limit)).await?;
    let hacks: Vec<_> = rows.into_iter().map(views::cooking_hack).collect();
    Ok(Json(HackList {
        success: true,
        total: hacks.len(),
        hacks,
    }))
}

pub async fn get_hack(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<HackDetail>, ApiError> {
    let row = with_db(&state, move |db| db.get_hack_by_slug(&slug))
        .await?
        .ok_or_else(|| ApiError::not_found("Hack not found"))?;
    Ok(Json(HackDetail {
        hack: views::cooking_hack(row),
    }))
}

/// Reports counts, seeding content first when the store is empty.
pub async fn init_content(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<InitContentResponse>, ApiError> {
    require_admin(&state, &user).await?;

    let before = content_counts(&state).await?;
    if before.total > 0 {
        return Ok(Json(InitContentResponse {
            message: "Content already exists".into(),
            counts: before,
            initialized: true,
        }));
    }

    auto_init(state.clone()).await;
    let counts = content_counts(&state).await?;
    let initialized = counts.total > 0;
    Ok(Json(InitContentResponse {
        message: if initialized {
            "Content initialized successfully".into()
        } else {
            "Content initialization failed".into()
        },
        counts,
        initialized,
    }))
}

pub async fn cron_daily_content(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DailyContentResponse>, ApiError> {
    require_cron(&state, &headers)?;
    info!("Starting daily content generation");

    let generated = daily_bundle(&state).await.map_err(|e| match e {
        ApiError::External { details, .. } => ApiError::External {
            error: "Failed to generate daily content".into(),
            details,
        },
        other => other,
    })?;

    Ok(Json(DailyContentResponse {
        success: true,
        message: "Daily content generated successfully".into(),
        generated,
        timestamp: Utc::now(),
    }))
}

pub async fn cron_rotate_featured(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RotationResponse>, ApiError> {
    require_cron(&state, &headers)?;
    let featured = rotate_featured(&state).await?;

    Ok(Json(RotationResponse {
        success: true,
        message: "Featured content rotated successfully".into(),
        featured,
        timestamp: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_time_rounds_up_in_ten_second_steps() {
        assert_eq!(time_to_read(""), 0);
        assert_eq!(time_to_read(&"a".repeat(1)), 10);
        assert_eq!(time_to_read(&"a".repeat(200)), 10);
        assert_eq!(time_to_read(&"a".repeat(201)), 20);
    }

    #[test]
    fn trend_summary_falls_back_to_excerpt() {
        let content = "x".repeat(450);
        assert_eq!(summary_or_excerpt(None, &content).len(), 200);
        assert_eq!(summary_or_excerpt(Some("  ".into()), &content).len(), 200);
        assert_eq!(summary_or_excerpt(Some("Short".into()), &content), "Short");
    }

    #[test]
    fn saved_tip_gets_fallback_category_and_unique_slug() {
        let db = Database::open_in_memory().unwrap();
        let generated = || GeneratedContent {
            title: "Sharp Knives Are Safer".into(),
            content: "Keep them honed.".into(),
            summary: None,
            category: None,
            difficulty: None,
        };

        let first = save_generated(&db, ContentKind::KitchenTip, generated(), None, None).unwrap();
        let second =
            save_generated(&db, ContentKind::KitchenTip, generated(), Some("storage"), None).unwrap();

        match (first, second) {
            (GeneratedItem::Tip(a), GeneratedItem::Tip(b)) => {
                assert_eq!(a.category, "cooking-basics");
                assert_eq!(b.category, "storage");
                assert_eq!(a.slug, "sharp-knives-are-safer");
                assert_eq!(b.slug, "sharp-knives-are-safer-1");
            }
            other => panic!("unexpected items: {other:?}"),
        }
    }

    #[test]
    fn rotation_picks_at_most_three_from_recent_pool() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            let generated = GeneratedContent {
                title: format!("Hack {i}"),
                content: "Freeze the butter, then grate it.".into(),
                summary: None,
                category: None,
                difficulty: None,
            };
            save_generated(&db, ContentKind::CookingHack, generated, None, Some("medium")).unwrap();
        }

        let selection = select_featured(&db).unwrap();
        assert_eq!(selection.hacks.len(), 3);
        assert!(selection.tips.is_empty());
        assert!(selection.trends.is_empty());
    }
}
