use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{authenticate, limit_tts};
use crate::state::AppState;
use crate::{auth, community, content, group_feed, groups, live, recipes, speech, webhooks};

/// The full HTTP surface. Every route sees the caller's `Viewer`; handlers
/// that need a signed-in user take `AuthUser`.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/me", get(auth::me))
        .route("/influencers/profile", post(auth::upsert_influencer_profile));

    let group_routes = Router::new()
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/groups/mine", get(groups::my_groups))
        .route(
            "/groups/{slug}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/groups/{slug}/join", post(groups::join_group))
        .route("/groups/{slug}/leave", post(groups::leave_group))
        .route("/groups/{slug}/members", get(groups::list_members))
        .route(
            "/groups/{slug}/members/{user_id}",
            put(groups::update_member_role).delete(groups::remove_member),
        )
        .route(
            "/groups/{slug}/posts",
            get(group_feed::list_posts).post(group_feed::create_post),
        )
        .route(
            "/groups/{slug}/messages",
            get(group_feed::list_messages).post(group_feed::send_message),
        )
        .route(
            "/groups/{slug}/messages/{message_id}/reactions",
            get(group_feed::list_message_reactions).post(group_feed::toggle_message_reaction),
        );

    let community_routes = Router::new()
        .route("/posts", get(community::list_posts).post(community::create_post))
        .route("/posts/{post_id}", delete(community::delete_post))
        .route(
            "/posts/{post_id}/comments",
            get(community::list_comments).post(community::create_comment),
        )
        .route(
            "/posts/{post_id}/comments/{comment_id}",
            delete(community::delete_comment),
        )
        .route("/posts/{post_id}/like", post(community::toggle_like))
        .route(
            "/posts/{post_id}/reactions",
            get(community::list_post_reactions).post(community::toggle_post_reaction),
        );

    let live_routes = Router::new()
        .route("/live", get(live::list_sessions).post(live::create_session))
        .route("/live/{id}", get(live::get_session).patch(live::end_session))
        .route("/live/{id}/cohosts", post(live::add_cohost))
        .route("/live/{id}/token", post(live::room_token))
        .route(
            "/live/{id}/comments",
            get(live::list_comments).post(live::create_comment),
        )
        .route("/live/{id}/like", get(live::like_stats).post(live::toggle_like));

    let content_routes = Router::new()
        .route("/admin/content/generate", post(content::generate))
        .route("/admin/content/featured", get(content::featured))
        .route("/tips", get(content::list_tips))
        .route("/tips/{slug}", get(content::get_tip))
        .route("/hacks", get(content::list_hacks))
        .route("/hacks/{slug}", get(content::get_hack))
        .route("/admin/init-content", post(content::init_content))
        .route("/cron/daily-content", get(content::cron_daily_content))
        .route("/cron/rotate-featured", get(content::cron_rotate_featured));

    let recipe_routes = Router::new()
        .route("/recipes", get(recipes::list_recipes).post(recipes::create_recipe))
        .route("/recipes/filter", get(recipes::filter_recipes))
        .route("/recipes/{slug}", get(recipes::get_recipe));

    let tts_routes = Router::new()
        .route("/tts/generate", post(speech::generate))
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_tts));

    let webhook_routes = Router::new()
        .route("/webhooks/payments", post(webhooks::payments))
        .route("/webhooks/rooms", post(webhooks::rooms));

    Router::new()
        .merge(auth_routes)
        .merge(group_routes)
        .merge(community_routes)
        .merge(live_routes)
        .merge(content_routes)
        .merge(recipe_routes)
        .merge(tts_routes)
        .merge(webhook_routes)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
