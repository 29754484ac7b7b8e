use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::config::DEFAULT_ACTIVITY;
use crate::core::store::{sort_newest_first, EntityStore, StoreError, StoreResult};
use crate::models::models::{
    Follow, Id, NewFollow, NewNotification, NewPost, NewStory, NewUser, Notification, Post,
    ReactionKind, Reactions, Session, Story, User,
};

struct UserRow {
    user: User,
    password_hash: String,
}

struct ReactionRow {
    post_id: Id,
    user_id: Id,
    kind: ReactionKind,
}

#[derive(Default)]
struct Tables {
    users: Vec<UserRow>,
    posts: Vec<Post>,
    reactions: Vec<ReactionRow>,
    follows: Vec<Follow>,
    stories: Vec<Story>,
    notifications: Vec<Notification>,
    sessions: HashMap<String, Session>,
    sequences: HashMap<&'static str, Id>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> Id {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    fn user_mut(&mut self, id: Id) -> Option<&mut User> {
        self.users.iter_mut().map(|row| &mut row.user).find(|u| u.id == id)
    }

    fn require_user(&self, table: &'static str, column: &'static str, id: Id) -> StoreResult<()> {
        if self.users.iter().any(|row| row.user.id == id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference { table, column, id })
        }
    }

    fn require_post(&self, table: &'static str, column: &'static str, id: Id) -> StoreResult<()> {
        if self.posts.iter().any(|p| p.id == id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference { table, column, id })
        }
    }
}

/// Process-local store used by the native server and the tests.
///
/// A single mutex serializes every operation, so multi-row writes such as
/// counter bumps and reaction switches are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl EntityStore for MemoryStore {
    fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let mut t = self.lock()?;
        if t.users.iter().any(|row| row.user.username == new.username) {
            return Err(StoreError::UniqueViolation {
                table: "users",
                constraint: "username",
            });
        }
        let user = User {
            id: t.next_id("users"),
            username: new.username,
            email: new.email,
            name: new.name,
            bio: new.bio,
            avatar: new.avatar,
            cover_photo: new.cover_photo,
            location: new.location,
            website: new.website,
            birthday: new.birthday,
            theme_color: new.theme_color,
            posts: 0,
            stories: 0,
            activity: DEFAULT_ACTIVITY.to_string(),
            created_at: Utc::now(),
        };
        t.users.push(UserRow {
            user: user.clone(),
            password_hash: new.password_hash,
        });
        Ok(user)
    }

    fn get_user(&self, id: Id) -> StoreResult<Option<User>> {
        let t = self.lock()?;
        Ok(t.users.iter().find(|row| row.user.id == id).map(|row| row.user.clone()))
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.lock()?;
        Ok(t
            .users
            .iter()
            .find(|row| row.user.username == username)
            .map(|row| row.user.clone()))
    }

    fn password_hash(&self, id: Id) -> StoreResult<Option<String>> {
        let t = self.lock()?;
        Ok(t
            .users
            .iter()
            .find(|row| row.user.id == id)
            .map(|row| row.password_hash.clone()))
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        let t = self.lock()?;
        Ok(t.users.iter().map(|row| row.user.clone()).collect())
    }

    fn update_user(&self, user: &User) -> StoreResult<Option<User>> {
        let mut t = self.lock()?;
        let Some(stored) = t.user_mut(user.id) else {
            return Ok(None);
        };
        let updated = User {
            id: stored.id,
            username: stored.username.clone(),
            posts: stored.posts,
            stories: stored.stories,
            created_at: stored.created_at,
            ..user.clone()
        };
        *stored = updated.clone();
        Ok(Some(updated))
    }

    fn insert_post(&self, new: NewPost) -> StoreResult<Post> {
        let mut t = self.lock()?;
        t.require_user("posts", "user_id", new.user_id)?;
        let post = Post {
            id: t.next_id("posts"),
            user_id: new.user_id,
            content: new.content,
            image: new.image,
            video: new.video,
            media_type: new.media_type,
            reactions: Reactions::default(),
            comments: 0,
            created_at: Utc::now(),
        };
        if let Some(author) = t.user_mut(post.user_id) {
            author.posts += 1;
        }
        t.posts.push(post.clone());
        Ok(post)
    }

    fn get_post(&self, id: Id) -> StoreResult<Option<Post>> {
        let t = self.lock()?;
        Ok(t.posts.iter().find(|p| p.id == id).cloned())
    }

    fn list_posts(&self) -> StoreResult<Vec<Post>> {
        let t = self.lock()?;
        let mut posts = t.posts.clone();
        sort_newest_first(&mut posts, |p| (p.created_at, p.id));
        Ok(posts)
    }

    fn list_user_posts(&self, user_id: Id) -> StoreResult<Vec<Post>> {
        let t = self.lock()?;
        let mut posts: Vec<Post> = t.posts.iter().filter(|p| p.user_id == user_id).cloned().collect();
        sort_newest_first(&mut posts, |p| (p.created_at, p.id));
        Ok(posts)
    }

    fn set_post_reactions(&self, id: Id, reactions: Reactions) -> StoreResult<Option<Post>> {
        let mut t = self.lock()?;
        Ok(t.posts.iter_mut().find(|p| p.id == id).map(|post| {
            post.reactions = reactions;
            post.clone()
        }))
    }

    fn set_user_reaction(
        &self,
        post_id: Id,
        user_id: Id,
        kind: Option<ReactionKind>,
    ) -> StoreResult<Option<Post>> {
        let mut t = self.lock()?;
        if !t.posts.iter().any(|p| p.id == post_id) {
            return Ok(None);
        }
        t.require_user("post_reactions", "user_id", user_id)?;

        let existing = t
            .reactions
            .iter()
            .position(|r| r.post_id == post_id && r.user_id == user_id);
        let previous = existing.map(|idx| t.reactions[idx].kind);

        match (existing, kind) {
            (Some(idx), Some(kind)) => t.reactions[idx].kind = kind,
            (Some(idx), None) => {
                t.reactions.remove(idx);
            }
            (None, Some(kind)) => t.reactions.push(ReactionRow { post_id, user_id, kind }),
            (None, None) => {}
        }

        Ok(t.posts.iter_mut().find(|p| p.id == post_id).map(|post| {
            post.reactions.switch(previous, kind);
            post.clone()
        }))
    }

    fn insert_follow(&self, new: NewFollow) -> StoreResult<Follow> {
        let mut t = self.lock()?;
        t.require_user("follows", "follower_id", new.follower_id)?;
        t.require_user("follows", "following_id", new.following_id)?;
        if t
            .follows
            .iter()
            .any(|f| f.follower_id == new.follower_id && f.following_id == new.following_id)
        {
            return Err(StoreError::UniqueViolation {
                table: "follows",
                constraint: "follower_id_following_id",
            });
        }
        let follow = Follow {
            id: t.next_id("follows"),
            follower_id: new.follower_id,
            following_id: new.following_id,
            created_at: Utc::now(),
        };
        t.follows.push(follow.clone());
        Ok(follow)
    }

    fn follows_from(&self, follower_id: Id) -> StoreResult<Vec<Follow>> {
        let t = self.lock()?;
        Ok(t.follows.iter().filter(|f| f.follower_id == follower_id).cloned().collect())
    }

    fn follows_to(&self, following_id: Id) -> StoreResult<Vec<Follow>> {
        let t = self.lock()?;
        Ok(t.follows.iter().filter(|f| f.following_id == following_id).cloned().collect())
    }

    fn insert_story(&self, new: NewStory) -> StoreResult<Story> {
        let mut t = self.lock()?;
        t.require_user("stories", "user_id", new.user_id)?;
        let story = Story {
            id: t.next_id("stories"),
            user_id: new.user_id,
            content: new.content,
            media: new.media,
            media_type: new.media_type,
            duration: new.duration,
            expires_at: new.expires_at,
            created_at: Utc::now(),
        };
        if let Some(author) = t.user_mut(story.user_id) {
            author.stories += 1;
        }
        t.stories.push(story.clone());
        Ok(story)
    }

    fn get_story(&self, id: Id) -> StoreResult<Option<Story>> {
        let t = self.lock()?;
        Ok(t.stories.iter().find(|s| s.id == id).cloned())
    }

    fn list_stories(&self) -> StoreResult<Vec<Story>> {
        let t = self.lock()?;
        let mut stories = t.stories.clone();
        sort_newest_first(&mut stories, |s| (s.created_at, s.id));
        Ok(stories)
    }

    fn list_user_stories(&self, user_id: Id) -> StoreResult<Vec<Story>> {
        let t = self.lock()?;
        let mut stories: Vec<Story> =
            t.stories.iter().filter(|s| s.user_id == user_id).cloned().collect();
        sort_newest_first(&mut stories, |s| (s.created_at, s.id));
        Ok(stories)
    }

    fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        let mut t = self.lock()?;
        t.require_user("notifications", "user_id", new.user_id)?;
        if let Some(sender_id) = new.sender_id {
            t.require_user("notifications", "sender_id", sender_id)?;
        }
        if let Some(post_id) = new.post_id {
            t.require_post("notifications", "post_id", post_id)?;
        }
        let notification = Notification {
            id: t.next_id("notifications"),
            user_id: new.user_id,
            sender_id: new.sender_id,
            kind: new.kind,
            content: new.content,
            post_id: new.post_id,
            read: false,
            created_at: Utc::now(),
        };
        t.notifications.push(notification.clone());
        Ok(notification)
    }

    fn get_notification(&self, id: Id) -> StoreResult<Option<Notification>> {
        let t = self.lock()?;
        Ok(t.notifications.iter().find(|n| n.id == id).cloned())
    }

    fn list_user_notifications(&self, user_id: Id) -> StoreResult<Vec<Notification>> {
        let t = self.lock()?;
        let mut notifications: Vec<Notification> =
            t.notifications.iter().filter(|n| n.user_id == user_id).cloned().collect();
        sort_newest_first(&mut notifications, |n| (n.created_at, n.id));
        Ok(notifications)
    }

    fn mark_notification_read(&self, id: Id) -> StoreResult<Option<Notification>> {
        let mut t = self.lock()?;
        Ok(t.notifications.iter_mut().find(|n| n.id == id).map(|n| {
            n.read = true;
            n.clone()
        }))
    }

    fn mark_all_notifications_read(&self, user_id: Id) -> StoreResult<usize> {
        let mut t = self.lock()?;
        let mut updated = 0;
        for n in t.notifications.iter_mut().filter(|n| n.user_id == user_id && !n.read) {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    fn insert_session(&self, session: Session) -> StoreResult<()> {
        let mut t = self.lock()?;
        t.require_user("sessions", "user_id", session.user_id)?;
        t.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    fn get_session(&self, token: &str) -> StoreResult<Option<Session>> {
        let t = self.lock()?;
        Ok(t.sessions.get(token).cloned())
    }

    fn delete_session(&self, token: &str) -> StoreResult<bool> {
        let mut t = self.lock()?;
        Ok(t.sessions.remove(token).is_some())
    }
}
