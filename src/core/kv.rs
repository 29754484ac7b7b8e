use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use spin_sdk::key_value::Store;

use crate::config::*;
use crate::core::store::{backend, sort_newest_first, EntityStore, StoreError, StoreResult};
use crate::models::models::{
    Follow, Id, NewFollow, NewNotification, NewPost, NewStory, NewUser, Notification, Post,
    ReactionKind, Reactions, Session, Story, User,
};

/// Entity store over the Spin key-value store.
///
/// Records live under `<table>:<id>` keys as JSON; id lists and sequences
/// emulate the table scans and serial columns of a relational store. A Spin
/// component instance handles one request at a time, so read-modify-write
/// sequences are not interleaved within an instance.
pub struct KvStore {
    store: Store,
}

impl KvStore {
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self {
            store: Store::open_default()?,
        })
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        self.store.get_json(key).map_err(backend)
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        self.store.set_json(key, value).map_err(backend)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.store.delete(key).map_err(backend)
    }

    fn next_id(&self, table: &str) -> StoreResult<Id> {
        let key = sequence_key(table);
        let next = self.get::<Id>(&key)?.unwrap_or(0) + 1;
        self.set(&key, &next)?;
        Ok(next)
    }

    fn ids(&self, list_key: &str) -> StoreResult<Vec<Id>> {
        Ok(self.get(list_key)?.unwrap_or_default())
    }

    fn push_id(&self, list_key: &str, id: Id) -> StoreResult<()> {
        let mut ids = self.ids(list_key)?;
        ids.push(id);
        self.set(list_key, &ids)
    }

    fn load_all<T: DeserializeOwned>(&self, list_key: &str, key: fn(Id) -> String) -> StoreResult<Vec<T>> {
        let mut records = Vec::new();
        for id in self.ids(list_key)? {
            if let Some(record) = self.get(&key(id))? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn require_user(&self, table: &'static str, column: &'static str, id: Id) -> StoreResult<User> {
        self.get_user(id)?
            .ok_or(StoreError::MissingReference { table, column, id })
    }
}

impl EntityStore for KvStore {
    fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        if self.get::<Id>(&username_key(&new.username))?.is_some() {
            return Err(StoreError::UniqueViolation {
                table: "users",
                constraint: "username",
            });
        }
        let user = User {
            id: self.next_id("users")?,
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
        self.set(&user_key(user.id), &user)?;
        self.set(&credential_key(user.id), &new.password_hash)?;
        self.set(&username_key(&user.username), &user.id)?;
        self.push_id(USERS_LIST_KEY, user.id)?;
        Ok(user)
    }

    fn get_user(&self, id: Id) -> StoreResult<Option<User>> {
        self.get(&user_key(id))
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        match self.get::<Id>(&username_key(username))? {
            Some(id) => self.get_user(id),
            None => Ok(None),
        }
    }

    fn password_hash(&self, id: Id) -> StoreResult<Option<String>> {
        self.get(&credential_key(id))
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        self.load_all(USERS_LIST_KEY, user_key)
    }

    fn update_user(&self, user: &User) -> StoreResult<Option<User>> {
        let Some(stored) = self.get_user(user.id)? else {
            return Ok(None);
        };
        let updated = User {
            id: stored.id,
            username: stored.username,
            posts: stored.posts,
            stories: stored.stories,
            created_at: stored.created_at,
            ..user.clone()
        };
        self.set(&user_key(updated.id), &updated)?;
        Ok(Some(updated))
    }

    fn insert_post(&self, new: NewPost) -> StoreResult<Post> {
        let mut author = self.require_user("posts", "user_id", new.user_id)?;
        let post = Post {
            id: self.next_id("posts")?,
            user_id: new.user_id,
            content: new.content,
            image: new.image,
            video: new.video,
            media_type: new.media_type,
            reactions: Reactions::default(),
            comments: 0,
            created_at: Utc::now(),
        };
        self.set(&post_key(post.id), &post)?;
        self.push_id(POSTS_LIST_KEY, post.id)?;
        author.posts += 1;
        self.set(&user_key(author.id), &author)?;
        Ok(post)
    }

    fn get_post(&self, id: Id) -> StoreResult<Option<Post>> {
        self.get(&post_key(id))
    }

    fn list_posts(&self) -> StoreResult<Vec<Post>> {
        let mut posts: Vec<Post> = self.load_all(POSTS_LIST_KEY, post_key)?;
        sort_newest_first(&mut posts, |p| (p.created_at, p.id));
        Ok(posts)
    }

    fn list_user_posts(&self, user_id: Id) -> StoreResult<Vec<Post>> {
        let mut posts = self.list_posts()?;
        posts.retain(|p| p.user_id == user_id);
        Ok(posts)
    }

    fn set_post_reactions(&self, id: Id, reactions: Reactions) -> StoreResult<Option<Post>> {
        let Some(mut post) = self.get_post(id)? else {
            return Ok(None);
        };
        post.reactions = reactions;
        self.set(&post_key(id), &post)?;
        Ok(Some(post))
    }

    fn set_user_reaction(
        &self,
        post_id: Id,
        user_id: Id,
        kind: Option<ReactionKind>,
    ) -> StoreResult<Option<Post>> {
        let Some(mut post) = self.get_post(post_id)? else {
            return Ok(None);
        };
        self.require_user("post_reactions", "user_id", user_id)?;

        let key = reaction_key(post_id, user_id);
        let previous: Option<ReactionKind> = self.get(&key)?;
        if previous == kind {
            return Ok(Some(post));
        }
        match kind {
            Some(kind) => self.set(&key, &kind)?,
            None => self.delete(&key)?,
        }
        post.reactions.switch(previous, kind);
        self.set(&post_key(post_id), &post)?;
        Ok(Some(post))
    }

    fn insert_follow(&self, new: NewFollow) -> StoreResult<Follow> {
        self.require_user("follows", "follower_id", new.follower_id)?;
        self.require_user("follows", "following_id", new.following_id)?;
        let edge_key = follow_edge_key(new.follower_id, new.following_id);
        if self.get::<Id>(&edge_key)?.is_some() {
            return Err(StoreError::UniqueViolation {
                table: "follows",
                constraint: "follower_id_following_id",
            });
        }
        let follow = Follow {
            id: self.next_id("follows")?,
            follower_id: new.follower_id,
            following_id: new.following_id,
            created_at: Utc::now(),
        };
        self.set(&follow_key(follow.id), &follow)?;
        self.set(&edge_key, &follow.id)?;
        self.push_id(FOLLOWS_LIST_KEY, follow.id)?;
        Ok(follow)
    }

    fn follows_from(&self, follower_id: Id) -> StoreResult<Vec<Follow>> {
        let mut follows: Vec<Follow> = self.load_all(FOLLOWS_LIST_KEY, follow_key)?;
        follows.retain(|f| f.follower_id == follower_id);
        Ok(follows)
    }

    fn follows_to(&self, following_id: Id) -> StoreResult<Vec<Follow>> {
        let mut follows: Vec<Follow> = self.load_all(FOLLOWS_LIST_KEY, follow_key)?;
        follows.retain(|f| f.following_id == following_id);
        Ok(follows)
    }

    fn insert_story(&self, new: NewStory) -> StoreResult<Story> {
        let mut author = self.require_user("stories", "user_id", new.user_id)?;
        let story = Story {
            id: self.next_id("stories")?,
            user_id: new.user_id,
            content: new.content,
            media: new.media,
            media_type: new.media_type,
            duration: new.duration,
            expires_at: new.expires_at,
            created_at: Utc::now(),
        };
        self.set(&story_key(story.id), &story)?;
        self.push_id(STORIES_LIST_KEY, story.id)?;
        author.stories += 1;
        self.set(&user_key(author.id), &author)?;
        Ok(story)
    }

    fn get_story(&self, id: Id) -> StoreResult<Option<Story>> {
        self.get(&story_key(id))
    }

    fn list_stories(&self) -> StoreResult<Vec<Story>> {
        let mut stories: Vec<Story> = self.load_all(STORIES_LIST_KEY, story_key)?;
        sort_newest_first(&mut stories, |s| (s.created_at, s.id));
        Ok(stories)
    }

    fn list_user_stories(&self, user_id: Id) -> StoreResult<Vec<Story>> {
        let mut stories = self.list_stories()?;
        stories.retain(|s| s.user_id == user_id);
        Ok(stories)
    }

    fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        self.require_user("notifications", "user_id", new.user_id)?;
        if let Some(sender_id) = new.sender_id {
            self.require_user("notifications", "sender_id", sender_id)?;
        }
        if let Some(post_id) = new.post_id {
            if self.get_post(post_id)?.is_none() {
                return Err(StoreError::MissingReference {
                    table: "notifications",
                    column: "post_id",
                    id: post_id,
                });
            }
        }
        let notification = Notification {
            id: self.next_id("notifications")?,
            user_id: new.user_id,
            sender_id: new.sender_id,
            kind: new.kind,
            content: new.content,
            post_id: new.post_id,
            read: false,
            created_at: Utc::now(),
        };
        self.set(&notification_key(notification.id), &notification)?;
        self.push_id(&user_notifications_key(notification.user_id), notification.id)?;
        Ok(notification)
    }

    fn get_notification(&self, id: Id) -> StoreResult<Option<Notification>> {
        self.get(&notification_key(id))
    }

    fn list_user_notifications(&self, user_id: Id) -> StoreResult<Vec<Notification>> {
        let mut notifications: Vec<Notification> =
            self.load_all(&user_notifications_key(user_id), notification_key)?;
        sort_newest_first(&mut notifications, |n| (n.created_at, n.id));
        Ok(notifications)
    }

    fn mark_notification_read(&self, id: Id) -> StoreResult<Option<Notification>> {
        let Some(mut notification) = self.get_notification(id)? else {
            return Ok(None);
        };
        if !notification.read {
            notification.read = true;
            self.set(&notification_key(id), &notification)?;
        }
        Ok(Some(notification))
    }

    fn mark_all_notifications_read(&self, user_id: Id) -> StoreResult<usize> {
        let mut updated = 0;
        for mut notification in self.list_user_notifications(user_id)? {
            if notification.read {
                continue;
            }
            notification.read = true;
            self.set(&notification_key(notification.id), &notification)?;
            updated += 1;
        }
        Ok(updated)
    }

    fn insert_session(&self, session: Session) -> StoreResult<()> {
        self.require_user("sessions", "user_id", session.user_id)?;
        self.set(&session_key(&session.token), &session)
    }

    fn get_session(&self, token: &str) -> StoreResult<Option<Session>> {
        self.get(&session_key(token))
    }

    fn delete_session(&self, token: &str) -> StoreResult<bool> {
        let key = session_key(token);
        let existed = self.get::<Session>(&key)?.is_some();
        if existed {
            self.delete(&key)?;
        }
        Ok(existed)
    }
}
