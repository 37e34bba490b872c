use async_trait::async_trait;
use pepperpot_types::models::ContentKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, check_status};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
const SERVICE: &str = "text generation";
const CONTENT_TEMPERATURE: f32 = 0.8;

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// A chat-completion backend. Returns the assistant message text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, ProviderError>;
}

pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterClient {
    pub const DEFAULT_MODEL: &'static str = "anthropic/claude-3.5-sonnet";

    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            base_url: OPENROUTER_URL.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-Title", "Pepperpot")
            .json(&ChatRequest {
                model: &self.model,
                messages,
                temperature,
                max_tokens: 1000,
            })
            .send()
            .await?;

        let body: ChatResponse = check_status(SERVICE, response).await?.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(model = %self.model, chars = content.len(), "Completion received");
        Ok(content)
    }
}

// -- Generated content --

/// What to ask the generator for.
#[derive(Debug, Clone, Copy)]
pub struct ContentPrompt<'a> {
    pub kind: ContentKind,
    pub category: Option<&'a str>,
    pub difficulty: Option<&'a str>,
}

impl ContentPrompt<'_> {
    pub fn messages(&self) -> Vec<ChatMessage> {
        let user = match self.kind {
            ContentKind::KitchenTip => format!(
                "Write a practical kitchen tip for home cooks.{}\n\n\
                 Include a catchy title (at most 60 characters), two or three paragraphs of \
                 actionable content, and a category chosen from: knife-skills, food-safety, \
                 storage, meal-prep, cooking-basics.\n\n\
                 Reply with JSON only:\n{{\"title\": \"...\", \"content\": \"...\", \"category\": \"...\"}}",
                self.category.map(|c| format!(" Category: {c}.")).unwrap_or_default()
            ),
            ContentKind::CookingHack => format!(
                "Write an inventive cooking hack or shortcut.{}\n\n\
                 Include a catchy title (at most 60 characters) and two or three paragraphs \
                 explaining the steps and why it works.\n\n\
                 Reply with JSON only:\n{{\"title\": \"...\", \"content\": \"...\", \"difficulty\": \"easy|medium|advanced\"}}",
                self.difficulty.map(|d| format!(" Difficulty: {d}.")).unwrap_or_default()
            ),
            ContentKind::FoodTrend => "Summarise a current food trend or culinary innovation.\n\n\
                 Include a compelling title (at most 60 characters), a one paragraph summary \
                 and two or three paragraphs of detail.\n\n\
                 Reply with JSON only:\n{\"title\": \"...\", \"summary\": \"...\", \"content\": \"...\"}"
                .to_string(),
        };

        vec![
            ChatMessage::system(
                "You are a professional culinary content creator. Produce original, accurate cooking content.",
            ),
            ChatMessage::user(user),
        ]
    }
}

/// Structured content decoded from a completion. `title` and `content` are
/// guaranteed non-empty.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

pub async fn generate_content(
    generator: &dyn TextGenerator,
    prompt: &ContentPrompt<'_>,
) -> Result<GeneratedContent, ProviderError> {
    let raw = generator.complete(&prompt.messages(), CONTENT_TEMPERATURE).await?;
    parse_generated(&raw)
}

/// Extracts the span from the first `{` to the last `}` and decodes it.
pub fn parse_generated(raw: &str) -> Result<GeneratedContent, ProviderError> {
    let start = raw
        .find('{')
        .ok_or_else(|| ProviderError::Malformed("no JSON object in completion".into()))?;
    let end = raw
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| ProviderError::Malformed("no JSON object in completion".into()))?;

    let json = sanitize_json(&raw[start..=end]);
    let generated: GeneratedContent = serde_json::from_str(&json)
        .map_err(|e| ProviderError::Malformed(format!("generated content: {e}")))?;

    if generated.title.trim().is_empty() || generated.content.trim().is_empty() {
        return Err(ProviderError::Malformed(
            "generated content is missing a title or body".into(),
        ));
    }
    Ok(generated)
}

/// Escapes raw newlines and tabs inside string literals and drops any other
/// ASCII control characters, which models occasionally emit unescaped.
fn sanitize_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            if !c.is_ascii_control() || matches!(c, '\n' | '\r' | '\t') {
                out.push(c);
            }
            continue;
        }

        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn complete(&self, _: &[ChatMessage], _: f32) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let raw = "Sure! Here you go:\n{\"title\": \"Sharpen often\", \"content\": \"A sharp knife is safer.\", \"category\": \"knife-skills\"}\nEnjoy.";
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.title, "Sharpen often");
        assert_eq!(parsed.category.as_deref(), Some("knife-skills"));
    }

    #[test]
    fn raw_newlines_inside_strings_are_escaped() {
        let raw = "{\n  \"title\": \"Ice cubes\",\n  \"content\": \"Freeze stock.\nThen use it.\u{7}\"\n}";
        let parsed = parse_generated(raw).unwrap();
        assert_eq!(parsed.content, "Freeze stock.\nThen use it.");
    }

    #[test]
    fn missing_title_is_rejected() {
        let err = parse_generated(r#"{"content": "body only"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
        assert!(parse_generated("no json here").is_err());
        assert!(parse_generated("} backwards {").is_err());
    }

    #[test]
    fn prompt_mentions_requested_category() {
        let prompt = ContentPrompt {
            kind: ContentKind::KitchenTip,
            category: Some("storage"),
            difficulty: None,
        };
        let messages = prompt.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("Category: storage."));
    }

    #[tokio::test]
    async fn generate_content_parses_completion() {
        let generator = Canned(r#"{"title": "Trend", "summary": "Short", "content": "Long read"}"#);
        let prompt = ContentPrompt {
            kind: ContentKind::FoodTrend,
            category: None,
            difficulty: None,
        };
        let generated = generate_content(&generator, &prompt).await.unwrap();
        assert_eq!(generated.summary.as_deref(), Some("Short"));
    }
}
