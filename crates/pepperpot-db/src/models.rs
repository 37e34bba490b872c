//! Database row types. These map directly to SQLite rows and stay distinct from
//! the pepperpot-types API models so the storage layer has no HTTP concerns.

use chrono::{DateTime, Utc};
use pepperpot_types::models::{
    GroupType, LiveStatus, MembershipRole, MembershipStatus, PurchaseStatus, UserRole,
};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub password: Option<String>,
    pub role: UserRole,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub struct InfluencerProfileRow {
    pub user_id: String,
    pub display_name: String,
    pub bio: Option<String>,
}

pub struct VerificationTokenRow {
    pub identifier: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Author columns joined onto posts, comments, messages and sessions.
#[derive(Debug, Clone)]
pub struct AuthorRow {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

// -- Groups --

#[derive(Debug, Clone)]
pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub group_type: GroupType,
    pub rules: Option<String>,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
}

pub struct GroupWithCounts {
    pub group: GroupRow,
    pub member_count: u64,
    pub post_count: u64,
}

/// Fields accepted when creating a group. The creator's ADMIN membership is
/// inserted alongside it.
pub struct NewGroup<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub group_type: GroupType,
    pub rules: Option<&'a str>,
    pub creator_id: &'a str,
    pub membership_id: &'a str,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Default)]
pub struct GroupUpdate<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub group_type: Option<GroupType>,
    pub rules: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct MembershipRow {
    pub id: String,
    pub user_id: String,
    pub group_id: String,
    pub role: MembershipRole,
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
}

pub struct MemberRow {
    pub membership: MembershipRow,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
}

pub struct GroupPostRow {
    pub id: String,
    pub group_id: String,
    pub author: AuthorRow,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub struct GroupMessageRow {
    pub id: String,
    pub group_id: String,
    pub author: AuthorRow,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Community --

pub struct PostRow {
    pub id: String,
    pub author: AuthorRow,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    pub comment_count: u64,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author: AuthorRow,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A reaction on either a post or a group message; `target_id` is whichever
/// of the two columns is set.
pub struct ReactionRow {
    pub id: String,
    pub target_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

// -- Live --

pub struct LiveSessionRow {
    pub id: String,
    pub host: AuthorRow,
    pub title: String,
    pub description: Option<String>,
    pub room_name: String,
    pub room_sid: Option<String>,
    pub status: LiveStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub viewer_count: u32,
    pub max_viewers: u32,
}

impl LiveSessionRow {
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

pub struct LiveCommentRow {
    pub id: String,
    pub session_id: String,
    pub author: AuthorRow,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Generated content --

#[derive(Debug, Clone)]
pub struct KitchenTipRow {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub content: String,
    pub featured: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CookingHackRow {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub difficulty: String,
    pub content: String,
    pub time_to_read: u32,
    pub featured: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TrendPostRow {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub featured: bool,
    pub published_at: DateTime<Utc>,
}

// -- Recipes --

#[derive(Debug, Clone)]
pub struct RecipeRow {
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

// -- Payments --

pub struct PurchaseRow {
    pub id: String,
    pub user_id: String,
    pub document_id: String,
    pub amount: i64,
    pub payment_intent_id: Option<String>,
    pub status: PurchaseStatus,
    pub updated_at: DateTime<Utc>,
}
