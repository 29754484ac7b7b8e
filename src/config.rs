use crate::models::models::Id;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_NOTIFICATION_LENGTH: usize = 1000;

pub const DEFAULT_STORY_DURATION_HOURS: u32 = 24;
pub const MAX_STORY_DURATION_HOURS: u32 = 168;

pub const DEFAULT_ACTIVITY: &str = "Nouveau";

pub fn token_expiration_hours() -> i64 {
    std::env::var("NINEY_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn bind_addr() -> String {
    std::env::var("NINEY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

/// Demo data is seeded unless `NINEY_SEED_DEMO_DATA` is `false` or `0`.
pub fn seed_demo_data() -> bool {
    std::env::var("NINEY_SEED_DEMO_DATA")
        .map(|v| !matches!(v.trim(), "false" | "0"))
        .unwrap_or(true)
}

// === Key-value layout ===

pub const USERS_LIST_KEY: &str = "users_list";
pub const POSTS_LIST_KEY: &str = "posts_list";
pub const FOLLOWS_LIST_KEY: &str = "follows_list";
pub const STORIES_LIST_KEY: &str = "stories_list";

pub fn sequence_key(table: &str) -> String {
    format!("seq:{}", table)
}

pub fn user_key(id: Id) -> String {
    format!("user:{}", id)
}

pub fn username_key(username: &str) -> String {
    format!("username:{}", username)
}

pub fn credential_key(id: Id) -> String {
    format!("credential:{}", id)
}

pub fn post_key(id: Id) -> String {
    format!("post:{}", id)
}

pub fn reaction_key(post_id: Id, user_id: Id) -> String {
    format!("reaction:{}:{}", post_id, user_id)
}

pub fn follow_key(id: Id) -> String {
    format!("follow:{}", id)
}

pub fn follow_edge_key(follower_id: Id, following_id: Id) -> String {
    format!("follow_edge:{}:{}", follower_id, following_id)
}

pub fn story_key(id: Id) -> String {
    format!("story:{}", id)
}

pub fn notification_key(id: Id) -> String {
    format!("notification:{}", id)
}

pub fn user_notifications_key(user_id: Id) -> String {
    format!("notifications:{}", user_id)
}

pub fn session_key(token: &str) -> String {
    format!("session:{}", token)
}
