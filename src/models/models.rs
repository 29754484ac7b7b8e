use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = u32;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: Option<String>,
    pub name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub cover_photo: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub birthday: Option<String>,
    pub theme_color: Option<String>,
    pub posts: u32,
    pub stories: u32,
    pub activity: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a user. The password is already hashed.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub cover_photo: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub birthday: Option<String>,
    pub theme_color: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reactions {
    pub likes: u32,
    pub dislikes: u32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl Reactions {
    pub fn add(&mut self, kind: ReactionKind) {
        match kind {
            ReactionKind::Like => self.likes = self.likes.saturating_add(1),
            ReactionKind::Dislike => self.dislikes = self.dislikes.saturating_add(1),
        }
    }

    pub fn remove(&mut self, kind: ReactionKind) {
        match kind {
            ReactionKind::Like => self.likes = self.likes.saturating_sub(1),
            ReactionKind::Dislike => self.dislikes = self.dislikes.saturating_sub(1),
        }
    }

    /// Moves one count from `previous` to `next`.
    pub fn switch(&mut self, previous: Option<ReactionKind>, next: Option<ReactionKind>) {
        if previous == next {
            return;
        }
        if let Some(kind) = previous {
            self.remove(kind);
        }
        if let Some(kind) = next {
            self.add(kind);
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id,
    pub user_id: Id,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub media_type: Option<String>,
    pub reactions: Reactions,
    pub comments: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct NewPost {
    pub user_id: Id,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub media_type: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub id: Id,
    pub follower_id: Id,
    pub following_id: Id,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug)]
pub struct NewFollow {
    pub follower_id: Id,
    pub following_id: Id,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: Id,
    pub user_id: Id,
    pub content: Option<String>,
    pub media: String,
    pub media_type: String,
    pub duration: u32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Story {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Clone, Debug)]
pub struct NewStory {
    pub user_id: Id,
    pub content: Option<String>,
    pub media: String,
    pub media_type: String,
    pub duration: u32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Mention,
    System,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 5] = [
        NotificationKind::Like,
        NotificationKind::Comment,
        NotificationKind::Follow,
        NotificationKind::Mention,
        NotificationKind::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::Mention => "mention",
            NotificationKind::System => "system",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown notification type '{}'", s))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Id,
    pub user_id: Id,
    pub sender_id: Option<Id>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub content: String,
    pub post_id: Option<Id>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewNotification {
    pub user_id: Id,
    pub sender_id: Option<Id>,
    pub kind: NotificationKind,
    pub content: String,
    pub post_id: Option<Id>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Session {
    pub token: String,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
}

// === Read-side views ===

/// Notification with the sender's display fields joined in at read time.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Author {
    pub id: Id,
    pub name: String,
    pub username: String,
    pub avatar: Option<String>,
}

impl Author {
    pub fn unknown(id: Id) -> Self {
        Author {
            id,
            name: "Unknown User".to_string(),
            username: "unknown".to_string(),
            avatar: None,
        }
    }
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Author {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub user: Author,
}

#[derive(Serialize, Clone, Debug)]
pub struct ProfileStats {
    pub posts: u32,
    pub stories: u32,
    pub activity: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub stats: ProfileStats,
    pub followers: usize,
    pub following: usize,
}
