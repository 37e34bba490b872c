//! HTTP surface of pepperpot: handlers, auth, permissions and the shared
//! application state they run against.

pub mod auth;
pub mod community;
pub mod content;
pub mod error;
pub mod extract;
pub mod group_feed;
pub mod groups;
pub mod init;
pub mod live;
pub mod mailer;
pub mod membership;
pub mod middleware;
pub mod permissions;
pub mod rate_limit;
pub mod recipes;
pub mod routes;
pub mod slug;
pub mod speech;
pub mod state;
pub mod views;
pub mod webhooks;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner, Settings};
