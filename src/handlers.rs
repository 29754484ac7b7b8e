use spin_sdk::http::{Method, Request, Response};
use tracing::{debug, error};

use crate::core::errors::ApiError;
use crate::core::store::EntityStore;
use crate::{auth, follow, notifications, posts, stories, users};

/// Dispatches a request to its handler. Shared by the Spin component and
/// the native server.
pub fn route(store: &dyn EntityStore, req: &Request) -> Response {
    let path = req.path().split('?').next().unwrap_or_default().to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    debug!(method = ?req.method(), %path, "routing request");

    let result = match (req.method(), segments.as_slice()) {
        (Method::Post, ["users"]) => users::create_user(store, req),
        (Method::Get, ["users"]) => users::list_users(store),
        (Method::Get, ["users", id]) => users::get_user_details(store, id),
        (Method::Get, ["users", id, "followers"]) => follow::get_followers_list(store, id),
        (Method::Get, ["users", id, "following"]) => follow::get_following_list(store, id),
        (Method::Get, ["users", id, "stories"]) => stories::handle_user_stories(store, id),

        (Method::Post, ["login"]) => auth::login_user(store, req),
        (Method::Post, ["logout"]) => auth::logout_user(store, req),

        (Method::Get, ["profile"]) => users::get_profile_handler(store, req),
        (Method::Put, ["profile"]) => users::update_profile_handler(store, req),
        (Method::Get, ["profile", "posts"]) => posts::handle_profile_posts(store, req),

        (Method::Get, ["posts"]) => posts::handle_list_posts(store),
        (Method::Post, ["posts"]) => posts::handle_create_post(store, req),
        (Method::Get, ["posts", id]) => posts::handle_get_post(store, id),
        (Method::Patch, ["posts", id, "reactions"]) => posts::handle_update_reactions(store, req, id),
        (Method::Put, ["posts", id, "reaction"]) => posts::handle_react(store, req, id),

        (Method::Post, ["follows"]) => follow::handle_follow(store, req),
        (Method::Get, ["suggestions"]) => follow::get_suggestions_list(store, req),

        (Method::Get, ["notifications"]) => notifications::list_notifications(store, req),
        (Method::Post, ["notifications"]) => notifications::handle_create_notification(store, req),
        (Method::Post, ["notifications", "read-all"]) => notifications::read_all_notifications(store, req),
        (Method::Patch, ["notifications", id]) => notifications::update_notification(store, req, id),

        (Method::Get, ["stories"]) => stories::handle_active_stories(store),
        (Method::Post, ["stories"]) => stories::handle_create_story(store, req),
        (Method::Get, ["stories", id]) => stories::handle_get_story(store, id),

        _ => Ok(ApiError::NotFound("No route found".to_string()).into()),
    };

    match result {
        Ok(resp) => resp,
        Err(err) => {
            error!(error = %err, %path, "handler failed");
            ApiError::InternalError("Internal server error".to_string()).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;
    use crate::core::store::{StoreError, StoreResult};
    use crate::models::models::{
        Follow, Id, NewFollow, NewNotification, NewPost, NewStory, NewUser, Notification, Post,
        ReactionKind, Reactions, Session, Story, User,
    };
    use crate::users::tests::seed_user;
    use chrono::Utc;
    use serde_json::{json, Value};

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request {
        let mut builder = Request::builder();
        builder.method(method).uri(uri);
        if let Some(token) = token {
            builder.header("Authorization", format!("Bearer {}", token));
        }
        let body = body.map(|b| serde_json::to_vec(&b).unwrap()).unwrap_or_default();
        builder.body(body).build()
    }

    fn session_for(store: &MemoryStore, user_id: u32) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        store
            .insert_session(Session { token: token.clone(), user_id, created_at: Utc::now() })
            .unwrap();
        token
    }

    fn body(resp: &Response) -> Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[test]
    fn unknown_routes_are_404() {
        let store = MemoryStore::new();
        let resp = route(&store, &request(Method::Get, "/nope", None, None));
        assert_eq!(*resp.status(), 404);
        let resp = route(&store, &request(Method::Delete, "/posts/1", None, None));
        assert_eq!(*resp.status(), 404);
    }

    #[test]
    fn notification_endpoints_require_a_session() {
        let store = MemoryStore::new();
        for (method, uri) in [
            (Method::Get, "/notifications"),
            (Method::Post, "/notifications"),
            (Method::Post, "/notifications/read-all"),
            (Method::Patch, "/notifications/1"),
            (Method::Get, "/suggestions"),
        ] {
            let resp = route(&store, &request(method, uri, None, None));
            assert_eq!(*resp.status(), 401, "{}", uri);
        }
    }

    #[test]
    fn patch_notification_checks_shape_then_ownership() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, "owner", "Owner");
        let other = seed_user(&store, "other", "Other");
        let owner_token = session_for(&store, owner.id);
        let other_token = session_for(&store, other.id);

        let created = route(
            &store,
            &request(
                Method::Post,
                "/notifications",
                Some(&owner_token),
                Some(json!({"type": "system", "content": "Bienvenue"})),
            ),
        );
        assert_eq!(*created.status(), 201);
        let id = body(&created)["id"].as_u64().unwrap();
        let uri = format!("/notifications/{}", id);

        let resp = route(&store, &request(Method::Patch, &uri, Some(&owner_token), Some(json!({"read": "yes"}))));
        assert_eq!(*resp.status(), 400);

        let resp = route(&store, &request(Method::Patch, &uri, Some(&other_token), Some(json!({"read": true}))));
        assert_eq!(*resp.status(), 403);

        let resp = route(
            &store,
            &request(Method::Patch, "/notifications/999", Some(&owner_token), Some(json!({"read": true}))),
        );
        assert_eq!(*resp.status(), 404);

        let resp = route(&store, &request(Method::Patch, &uri, Some(&owner_token), Some(json!({"read": true}))));
        assert_eq!(*resp.status(), 200);
        assert_eq!(body(&resp)["read"], true);

        let resp = route(&store, &request(Method::Patch, &uri, Some(&owner_token), Some(json!({"read": false}))));
        assert_eq!(*resp.status(), 400);
    }

    #[test]
    fn follow_route_binds_follower_to_session() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "A");
        let b = seed_user(&store, "b", "B");
        let token = session_for(&store, a.id);

        let resp = route(
            &store,
            &request(Method::Post, "/follows", Some(&token), Some(json!({"followerId": b.id, "followingId": a.id}))),
        );
        assert_eq!(*resp.status(), 403);

        let resp = route(&store, &request(Method::Post, "/follows", Some(&token), Some(json!({"followingId": b.id}))));
        assert_eq!(*resp.status(), 201);
        assert_eq!(body(&resp)["followerId"], a.id);

        let resp = route(&store, &request(Method::Get, "/suggestions", Some(&token), None));
        assert_eq!(*resp.status(), 200);
        assert_eq!(body(&resp), json!([]));
    }

    #[test]
    fn reactions_patch_distinguishes_missing_post() {
        let store = MemoryStore::new();
        let resp = route(
            &store,
            &request(Method::Patch, "/posts/12/reactions", None, Some(json!({"reactions": {"likes": 1, "dislikes": 0}}))),
        );
        assert_eq!(*resp.status(), 404);

        let resp = route(
            &store,
            &request(Method::Patch, "/posts/12/reactions", None, Some(json!({"reactions": {"likes": -1, "dislikes": 0}}))),
        );
        assert_eq!(*resp.status(), 400);
    }

    /// Store whose every call fails at the backend.
    struct BrokenStore;

    fn down<T>() -> StoreResult<T> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    impl EntityStore for BrokenStore {
        fn insert_user(&self, _: NewUser) -> StoreResult<User> { down() }
        fn get_user(&self, _: Id) -> StoreResult<Option<User>> { down() }
        fn find_user_by_username(&self, _: &str) -> StoreResult<Option<User>> { down() }
        fn password_hash(&self, _: Id) -> StoreResult<Option<String>> { down() }
        fn list_users(&self) -> StoreResult<Vec<User>> { down() }
        fn update_user(&self, _: &User) -> StoreResult<Option<User>> { down() }
        fn insert_post(&self, _: NewPost) -> StoreResult<Post> { down() }
        fn get_post(&self, _: Id) -> StoreResult<Option<Post>> { down() }
        fn list_posts(&self) -> StoreResult<Vec<Post>> { down() }
        fn list_user_posts(&self, _: Id) -> StoreResult<Vec<Post>> { down() }
        fn set_post_reactions(&self, _: Id, _: Reactions) -> StoreResult<Option<Post>> { down() }
        fn set_user_reaction(&self, _: Id, _: Id, _: Option<ReactionKind>) -> StoreResult<Option<Post>> { down() }
        fn insert_follow(&self, _: NewFollow) -> StoreResult<Follow> { down() }
        fn follows_from(&self, _: Id) -> StoreResult<Vec<Follow>> { down() }
        fn follows_to(&self, _: Id) -> StoreResult<Vec<Follow>> { down() }
        fn insert_story(&self, _: NewStory) -> StoreResult<Story> { down() }
        fn get_story(&self, _: Id) -> StoreResult<Option<Story>> { down() }
        fn list_stories(&self) -> StoreResult<Vec<Story>> { down() }
        fn list_user_stories(&self, _: Id) -> StoreResult<Vec<Story>> { down() }
        fn insert_notification(&self, _: NewNotification) -> StoreResult<Notification> { down() }
        fn get_notification(&self, _: Id) -> StoreResult<Option<Notification>> { down() }
        fn list_user_notifications(&self, _: Id) -> StoreResult<Vec<Notification>> { down() }
        fn mark_notification_read(&self, _: Id) -> StoreResult<Option<Notification>> { down() }
        fn mark_all_notifications_read(&self, _: Id) -> StoreResult<usize> { down() }
        fn insert_session(&self, _: Session) -> StoreResult<()> { down() }
        fn get_session(&self, _: &str) -> StoreResult<Option<Session>> { down() }
        fn delete_session(&self, _: &str) -> StoreResult<bool> { down() }
    }

    #[test]
    fn store_failures_are_500_not_401() {
        let store = BrokenStore;
        let token = uuid::Uuid::new_v4().to_string();
        for (method, uri) in [
            (Method::Get, "/notifications"),
            (Method::Post, "/notifications/read-all"),
            (Method::Get, "/profile"),
            (Method::Get, "/suggestions"),
        ] {
            let resp = route(&store, &request(method, uri, Some(&token), None));
            assert_eq!(*resp.status(), 500, "{}", uri);
            assert_eq!(body(&resp)["error"], "Internal server error");
        }

        let resp = route(&store, &request(Method::Get, "/users", None, None));
        assert_eq!(*resp.status(), 500);
    }

    #[test]
    fn notification_sender_is_bound_to_session() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "A");
        let b = seed_user(&store, "b", "B");
        let token = session_for(&store, a.id);

        let forged = json!({"userId": b.id, "senderId": b.id, "type": "like", "content": "B aime votre post"});
        let resp = route(&store, &request(Method::Post, "/notifications", Some(&token), Some(forged)));
        assert_eq!(*resp.status(), 403);
        assert!(store.list_user_notifications(b.id).unwrap().is_empty());

        let own = json!({"userId": b.id, "senderId": a.id, "type": "follow", "content": "A vous suit"});
        let resp = route(&store, &request(Method::Post, "/notifications", Some(&token), Some(own)));
        assert_eq!(*resp.status(), 201);
        assert_eq!(body(&resp)["senderId"], a.id);
    }
}
