//! Storage rows rendered as API responses.

use std::collections::BTreeMap;

use pepperpot_db::models::{
    AuthorRow, CommentRow, CookingHackRow, GroupMessageRow, GroupPostRow, GroupWithCounts,
    KitchenTipRow, LiveCommentRow, LiveSessionRow, MemberRow, PostRow, ReactionRow, RecipeRow,
    TrendPostRow,
};
use pepperpot_types::api::{
    AuthorSummary, CommentResponse, CookingHackResponse, GroupMessageResponse, GroupPostResponse,
    GroupResponse, KitchenTipResponse, LiveCommentResponse, LiveSessionResponse, MemberResponse,
    PostResponse, ReactionGroup, RecipeResponse, TrendPostResponse,
};
use pepperpot_types::models::MembershipRole;

pub fn author(row: AuthorRow) -> AuthorSummary {
    AuthorSummary {
        id: row.id,
        name: row.name,
        image: row.image,
    }
}

pub fn group(row: GroupWithCounts, user_role: Option<MembershipRole>) -> GroupResponse {
    let GroupWithCounts {
        group,
        member_count,
        post_count,
    } = row;
    GroupResponse {
        id: group.id,
        name: group.name,
        slug: group.slug,
        description: group.description,
        group_type: group.group_type,
        rules: group.rules,
        creator_id: group.creator_id,
        created_at: group.created_at,
        member_count,
        post_count,
        user_role,
    }
}

pub fn member(row: MemberRow) -> MemberResponse {
    MemberResponse {
        id: row.membership.id,
        user_id: row.membership.user_id,
        name: row.name,
        email: row.email,
        image: row.image,
        role: row.membership.role,
        status: row.membership.status,
        joined_at: row.membership.joined_at,
    }
}

pub fn group_post(row: GroupPostRow) -> GroupPostResponse {
    GroupPostResponse {
        id: row.id,
        group_id: row.group_id,
        author: author(row.author),
        content: row.content,
        created_at: row.created_at,
    }
}

pub fn group_message(row: GroupMessageRow, reactions: Vec<ReactionGroup>) -> GroupMessageResponse {
    GroupMessageResponse {
        id: row.id,
        group_id: row.group_id,
        author: author(row.author),
        content: row.content,
        image_url: row.image_url,
        created_at: row.created_at,
        reactions,
    }
}

pub fn post(row: PostRow) -> PostResponse {
    PostResponse {
        id: row.id,
        author: author(row.author),
        content: row.content,
        image_url: row.image_url,
        created_at: row.created_at,
        like_count: row.like_count,
        comment_count: row.comment_count,
    }
}

pub fn comment(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: row.id,
        post_id: row.post_id,
        author: author(row.author),
        content: row.content,
        created_at: row.created_at,
    }
}

/// Groups reactions by emoji in first-seen order, keyed per target id.
pub fn group_reactions(rows: &[ReactionRow]) -> BTreeMap<String, Vec<ReactionGroup>> {
    let mut by_target: BTreeMap<String, Vec<ReactionGroup>> = BTreeMap::new();
    for r in rows {
        let groups = by_target.entry(r.target_id.clone()).or_default();
        match groups.iter_mut().find(|g| g.emoji == r.emoji) {
            Some(g) => {
                g.count += 1;
                g.user_ids.push(r.user_id.clone());
            }
            None => groups.push(ReactionGroup {
                emoji: r.emoji.clone(),
                count: 1,
                user_ids: vec![r.user_id.clone()],
            }),
        }
    }
    by_target
}

pub fn live_session(row: LiveSessionRow, cohost_ids: Vec<String>) -> LiveSessionResponse {
    LiveSessionResponse {
        id: row.id,
        host: author(row.host),
        title: row.title,
        description: row.description,
        room_name: row.room_name,
        status: row.status,
        started_at: row.started_at,
        ended_at: row.ended_at,
        viewer_count: row.viewer_count,
        max_viewers: row.max_viewers,
        cohost_ids,
    }
}

pub fn live_comment(row: LiveCommentRow) -> LiveCommentResponse {
    LiveCommentResponse {
        id: row.id,
        session_id: row.session_id,
        author: author(row.author),
        content: row.content,
        created_at: row.created_at,
    }
}

pub fn kitchen_tip(row: KitchenTipRow) -> KitchenTipResponse {
    KitchenTipResponse {
        id: row.id,
        title: row.title,
        slug: row.slug,
        category: row.category,
        content: row.content,
        featured: row.featured,
        published_at: row.published_at,
    }
}

pub fn cooking_hack(row: CookingHackRow) -> CookingHackResponse {
    CookingHackResponse {
        id: row.id,
        title: row.title,
        slug: row.slug,
        difficulty: row.difficulty,
        content: row.content,
        time_to_read: row.time_to_read,
        featured: row.featured,
        published_at: row.published_at,
    }
}

pub fn trend_post(row: TrendPostRow) -> TrendPostResponse {
    TrendPostResponse {
        id: row.id,
        title: row.title,
        slug: row.slug,
        summary: row.summary,
        content: row.content,
        featured: row.featured,
        published_at: row.published_at,
    }
}

pub fn recipe(row: RecipeRow) -> RecipeResponse {
    RecipeResponse {
        id: row.id,
        title: row.title,
        slug: row.slug,
        category: row.category,
        cuisine: row.cuisine,
        occasion: row.occasion,
        summary: row.summary,
        image_url: row.image_url,
        created_at: row.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reaction(target: &str, user: &str, emoji: &str) -> ReactionRow {
        ReactionRow {
            id: format!("{target}-{user}-{emoji}"),
            target_id: target.into(),
            user_id: user.into(),
            emoji: emoji.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reactions_grouped_per_target_and_emoji() {
        let rows = vec![
            reaction("m1", "a", "🔥"),
            reaction("m1", "b", "🔥"),
            reaction("m1", "a", "😋"),
            reaction("m2", "c", "🔥"),
        ];
        let grouped = group_reactions(&rows);
        let m1 = &grouped["m1"];
        assert_eq!(m1.len(), 2);
        assert_eq!(m1[0].emoji, "🔥");
        assert_eq!(m1[0].count, 2);
        assert_eq!(m1[0].user_ids, vec!["a", "b"]);
        assert_eq!(grouped["m2"][0].count, 1);
    }
}
