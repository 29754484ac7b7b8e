use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::models::{
    Follow, Id, NewFollow, NewNotification, NewPost, NewStory, NewUser, Notification, Post,
    ReactionKind, Reactions, Session, Story, User,
};

/// Failures reported by an [`EntityStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("unique constraint `{constraint}` violated on {table}")]
    UniqueViolation {
        table: &'static str,
        constraint: &'static str,
    },

    /// A foreign key points at a row that does not exist.
    #[error("{table}.{column} references missing row {id}")]
    MissingReference {
        table: &'static str,
        column: &'static str,
        id: Id,
    },

    /// The backend itself failed.
    #[error("store backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Relational entity store behind the social graph and notification core.
///
/// Every method is a single round trip. Implementations assign
/// auto-incrementing ids, check foreign keys and unique constraints, and
/// return lists documented as "newest first" ordered by `created_at`
/// descending with ties broken by descending id.
pub trait EntityStore {
    // === Users ===
    fn insert_user(&self, new: NewUser) -> StoreResult<User>;
    fn get_user(&self, id: Id) -> StoreResult<Option<User>>;
    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    fn password_hash(&self, id: Id) -> StoreResult<Option<String>>;
    /// All users in id order.
    fn list_users(&self) -> StoreResult<Vec<User>>;
    /// Replaces the stored profile fields. Counters and `created_at` are kept.
    fn update_user(&self, user: &User) -> StoreResult<Option<User>>;

    // === Posts ===
    /// Inserts the post and bumps the author's `posts` counter.
    fn insert_post(&self, new: NewPost) -> StoreResult<Post>;
    fn get_post(&self, id: Id) -> StoreResult<Option<Post>>;
    /// Newest first.
    fn list_posts(&self) -> StoreResult<Vec<Post>>;
    /// Newest first.
    fn list_user_posts(&self, user_id: Id) -> StoreResult<Vec<Post>>;
    /// Overwrites the counter pair. `None` when the post does not exist.
    fn set_post_reactions(&self, id: Id, reactions: Reactions) -> StoreResult<Option<Post>>;
    /// Records `user_id`'s reaction to the post (or withdraws it with `None`)
    /// and adjusts the counters in the same critical section.
    fn set_user_reaction(
        &self,
        post_id: Id,
        user_id: Id,
        kind: Option<ReactionKind>,
    ) -> StoreResult<Option<Post>>;

    // === Follows ===
    /// Fails with `UniqueViolation` when the edge already exists.
    fn insert_follow(&self, new: NewFollow) -> StoreResult<Follow>;
    /// Edges leaving `follower_id`, in insertion order.
    fn follows_from(&self, follower_id: Id) -> StoreResult<Vec<Follow>>;
    /// Edges arriving at `following_id`, in insertion order.
    fn follows_to(&self, following_id: Id) -> StoreResult<Vec<Follow>>;

    // === Stories ===
    /// Inserts the story and bumps the author's `stories` counter.
    fn insert_story(&self, new: NewStory) -> StoreResult<Story>;
    fn get_story(&self, id: Id) -> StoreResult<Option<Story>>;
    /// Newest first.
    fn list_stories(&self) -> StoreResult<Vec<Story>>;
    /// Newest first.
    fn list_user_stories(&self, user_id: Id) -> StoreResult<Vec<Story>>;

    // === Notifications ===
    fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification>;
    fn get_notification(&self, id: Id) -> StoreResult<Option<Notification>>;
    /// Newest first.
    fn list_user_notifications(&self, user_id: Id) -> StoreResult<Vec<Notification>>;
    fn mark_notification_read(&self, id: Id) -> StoreResult<Option<Notification>>;
    /// Returns how many notifications flipped from unread to read.
    fn mark_all_notifications_read(&self, user_id: Id) -> StoreResult<usize>;

    // === Sessions ===
    fn insert_session(&self, session: Session) -> StoreResult<()>;
    fn get_session(&self, token: &str) -> StoreResult<Option<Session>>;
    fn delete_session(&self, token: &str) -> StoreResult<bool>;
}

pub(crate) fn sort_newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, Id)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}
