pub mod auth;
pub mod health;
pub mod streak;

pub use auth::whoami;
pub use health::health;
pub use streak::{streak_activity_post, streak_get};
