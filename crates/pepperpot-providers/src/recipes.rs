use async_trait::async_trait;
use pepperpot_types::api::ExternalRecipe;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, check_status};

const SPOONACULAR_URL: &str = "https://api.spoonacular.com";
const SERVICE: &str = "recipe search";

#[async_trait]
pub trait RecipeSearch: Send + Sync {
    async fn search(&self, query: &str, number: u32) -> Result<Vec<ExternalRecipe>, ProviderError>;
}

pub struct SpoonacularClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SpoonacularClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: SPOONACULAR_URL.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    id: i64,
    title: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    ready_in_minutes: Option<u32>,
    #[serde(default)]
    servings: Option<u32>,
    #[serde(default)]
    source_url: Option<String>,
}

impl From<SearchResult> for ExternalRecipe {
    fn from(r: SearchResult) -> Self {
        Self {
            external_id: r.id,
            title: r.title,
            image: r.image,
            summary: r.summary,
            ready_in_minutes: r.ready_in_minutes,
            servings: r.servings,
            source_url: r.source_url,
        }
    }
}

#[async_trait]
impl RecipeSearch for SpoonacularClient {
    async fn search(&self, query: &str, number: u32) -> Result<Vec<ExternalRecipe>, ProviderError> {
        let number = number.to_string();
        let response = self
            .http
            .get(format!("{}/recipes/complexSearch", self.base_url))
            .query(&[
                ("query", query),
                ("number", number.as_str()),
                ("addRecipeInformation", "true"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let body: SearchResponse = check_status(SERVICE, response).await?.json().await?;
        debug!(query, results = body.results.len(), "Recipe search complete");
        Ok(body.results.into_iter().map(ExternalRecipe::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_results_decode_into_external_recipes() {
        let raw = r#"{"results":[{"id":716429,"title":"Pasta with Garlic","image":"https://img/1.jpg",
            "readyInMinutes":45,"servings":2,"sourceUrl":"https://example.com/pasta","pricePerServing":163.15}],
            "offset":0,"number":1,"totalResults":86}"#;
        let body: SearchResponse = serde_json::from_str(raw).unwrap();
        let recipes: Vec<ExternalRecipe> = body.results.into_iter().map(Into::into).collect();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].external_id, 716429);
        assert_eq!(recipes[0].ready_in_minutes, Some(45));
        assert!(recipes[0].summary.is_none());
    }
}
