use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    ContentKind, GroupType, LiveStatus, MembershipRole, MembershipStatus, RoomRole, UserRole,
};

// -- JWT Claims --

/// Bearer token claims. Mirrors the session shape the web client expects:
/// `{ user: { email, name, image } }` plus the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub exp: usize,
}

// -- Shared --

#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorSummary {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit as u64) };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// Body shared by every "write some text" endpoint (posts, comments, messages).
#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: Option<String>,
    pub image_url: Option<String>,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InfluencerProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfluencerProfile {
    pub display_name: String,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: UserRole,
    pub email_verified: bool,
    pub influencer: Option<InfluencerProfile>,
}

// -- Groups --

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub group_type: Option<GroupType>,
    pub rules: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub group_type: Option<GroupType>,
    pub rules: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    pub rules: Option<String>,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    pub member_count: u64,
    pub post_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<MembershipRole>,
}

#[derive(Debug, Serialize)]
pub struct JoinGroupResponse {
    pub success: bool,
    pub status: MembershipStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub user_id: String,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub role: MembershipRole,
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupPostResponse {
    pub id: String,
    pub group_id: String,
    pub author: AuthorSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct GroupMessageResponse {
    pub id: String,
    pub group_id: String,
    pub author: AuthorSummary,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<ReactionGroup>,
}

#[derive(Debug, Serialize)]
pub struct GroupMessagePage {
    pub messages: Vec<GroupMessageResponse>,
    pub has_more: bool,
}

// -- Community --

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: String,
    pub author: AuthorSummary,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    pub comment_count: u64,
}

#[derive(Debug, Serialize)]
pub struct PostPage {
    pub posts: Vec<PostResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub author: AuthorSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
}

#[derive(Debug, Deserialize)]
pub struct ToggleReactionRequest {
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Removed,
}

#[derive(Debug, Serialize)]
pub struct ReactionToggleResponse {
    pub success: bool,
    pub action: ReactionAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub emoji: String,
    pub count: usize,
    pub user_ids: Vec<String>,
}

// -- Live sessions --

#[derive(Debug, Deserialize)]
pub struct CreateLiveSessionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LiveSessionResponse {
    pub id: String,
    pub host: AuthorSummary,
    pub title: String,
    pub description: Option<String>,
    pub room_name: String,
    pub status: LiveStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub viewer_count: u32,
    pub max_viewers: u32,
    pub cohost_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LiveSessionEnvelope {
    pub session: LiveSessionResponse,
}

#[derive(Debug, Serialize)]
pub struct CreateLiveSessionResponse {
    pub session: LiveSessionResponse,
    pub room_name: String,
}

#[derive(Debug, Serialize)]
pub struct LiveSessionList {
    pub sessions: Vec<LiveSessionResponse>,
}

#[derive(Debug, Deserialize)]
pub struct AddCohostRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoomTokenResponse {
    pub token: String,
    pub room_name: String,
    pub role: RoomRole,
}

#[derive(Debug, Serialize)]
pub struct LiveCommentResponse {
    pub id: String,
    pub session_id: String,
    pub author: AuthorSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LiveCommentList {
    pub comments: Vec<LiveCommentResponse>,
}

#[derive(Debug, Deserialize)]
pub struct LiveLikeRequest {
    pub is_like: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveLikeAction {
    Created,
    Updated,
    Removed,
}

#[derive(Debug, Serialize)]
pub struct LiveLikeResponse {
    pub action: LiveLikeAction,
    pub is_like: bool,
}

#[derive(Debug, Serialize)]
pub struct LiveLikeStats {
    pub likes: u64,
    pub dislikes: u64,
    pub user_like: Option<bool>,
}

// -- Generated content --

#[derive(Debug, Deserialize)]
pub struct GenerateContentRequest {
    /// Kept as free text so an unknown value can be reported with the
    /// list of accepted kinds rather than a generic decode error.
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KitchenTipResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub content: String,
    pub featured: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CookingHackResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub difficulty: String,
    pub content: String,
    pub time_to_read: u32,
    pub featured: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendPostResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub featured: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GeneratedItem {
    Tip(KitchenTipResponse),
    Hack(CookingHackResponse),
    Trend(TrendPostResponse),
}

impl GeneratedItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Tip(t) => &t.id,
            Self::Hack(h) => &h.id,
            Self::Trend(t) => &t.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Tip(t) => &t.title,
            Self::Hack(h) => &h.title,
            Self::Trend(t) => &t.title,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateContentResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub content_type: ContentKind,
    pub count: usize,
    pub generated: Vec<GeneratedItem>,
}

#[derive(Debug, Serialize)]
pub struct FeaturedContent {
    pub tips: Vec<KitchenTipResponse>,
    pub hacks: Vec<CookingHackResponse>,
    pub trends: Vec<TrendPostResponse>,
}

#[derive(Debug, Serialize)]
pub struct FeaturedCounts {
    pub tips: usize,
    pub hacks: usize,
    pub trends: usize,
}

#[derive(Debug, Serialize)]
pub struct FeaturedResponse {
    pub featured: FeaturedContent,
    pub counts: FeaturedCounts,
}

#[derive(Debug, Serialize)]
pub struct TipList {
    pub success: bool,
    pub tips: Vec<KitchenTipResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct TipDetail {
    pub tip: KitchenTipResponse,
}

#[derive(Debug, Serialize)]
pub struct HackList {
    pub success: bool,
    pub hacks: Vec<CookingHackResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HackDetail {
    pub hack: CookingHackResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentRef {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct DailyGenerated {
    pub tip: ContentRef,
    pub hack: ContentRef,
    pub trend: ContentRef,
}

#[derive(Debug, Serialize)]
pub struct DailyContentResponse {
    pub success: bool,
    pub message: String,
    pub generated: DailyGenerated,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RotationResponse {
    pub success: bool,
    pub message: String,
    pub featured: FeaturedCounts,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ContentCounts {
    pub tips: u64,
    pub hacks: u64,
    pub trends: u64,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct InitContentResponse {
    pub message: String,
    pub counts: ContentCounts,
    pub initialized: bool,
}

// -- Speech --

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: Option<String>,
    pub step_number: Option<u32>,
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpeechResponse {
    pub audio: String,
    pub provider: String,
}

// -- Recipes --

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub cuisine: Option<String>,
    pub occasion: Option<String>,
    pub summary: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub category: Option<String>,
    pub cuisine: Option<String>,
    pub occasion: Option<String>,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A recipe fetched from the external search provider, already validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalRecipe {
    pub external_id: i64,
    pub title: String,
    pub image: Option<String>,
    pub summary: Option<String>,
    pub ready_in_minutes: Option<u32>,
    pub servings: Option<u32>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FilteredRecipe {
    Local(RecipeResponse),
    External(ExternalRecipe),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeSource {
    Database,
    Mixed,
    External,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeFilters {
    pub category: Option<String>,
    pub cuisine: Option<String>,
    pub occasion: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SourceBreakdown {
    pub database: usize,
    pub external: usize,
}

#[derive(Debug, Serialize)]
pub struct RecipeFilterResponse {
    pub success: bool,
    pub recipes: Vec<FilteredRecipe>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub source: RecipeSource,
    pub filters: RecipeFilters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<SourceBreakdown>,
}

#[derive(Debug, Serialize)]
pub struct RecipePage {
    pub recipes: Vec<RecipeResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub recipe: RecipeResponse,
}

// -- Webhooks --

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_pages_up() {
        let p = Pagination::new(1, 20, 41);
        assert_eq!(p.total_pages, 3);
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
    }

    #[test]
    fn group_type_uses_type_key() {
        let req: CreateGroupRequest =
            serde_json::from_str(r#"{"name":"Cooking Lovers","type":"PRIVATE"}"#).unwrap();
        assert_eq!(req.group_type, Some(GroupType::Private));
    }
}
