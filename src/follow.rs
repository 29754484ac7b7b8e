use std::collections::HashSet;

use spin_sdk::http::{Request, Response};
use tracing::{info, warn};

use crate::auth::authenticate;
use crate::core::errors::ApiError;
use crate::core::helpers::{id_field, parse_id, parse_json_body, respond};
use crate::core::query_params::{get_limit, parse_query_params};
use crate::core::store::{EntityStore, StoreError};
use crate::models::models::{Follow, Id, NewFollow, User};
use crate::users::find_user;

/// Creates the edge `follower_id -> following_id`.
///
/// Self-follows and duplicate edges are rejected here rather than filtered
/// at query time.
pub fn create_follow(store: &dyn EntityStore, follower_id: Id, following_id: Id) -> Result<Follow, ApiError> {
    if follower_id == following_id {
        return Err(ApiError::BadRequest("Users cannot follow themselves".to_string()));
    }
    find_user(store, follower_id)?;
    find_user(store, following_id)
        .map_err(|_| ApiError::NotFound("Target user not found".to_string()))?;

    let follow = store
        .insert_follow(NewFollow { follower_id, following_id })
        .map_err(|err| match err {
            StoreError::UniqueViolation { .. } => ApiError::Conflict("Already following this user".to_string()),
            other => other.into(),
        })?;
    info!(follower_id, following_id, "follow created");
    Ok(follow)
}

fn resolve_users(store: &dyn EntityStore, ids: impl Iterator<Item = Id>) -> Result<Vec<User>, ApiError> {
    let mut users = Vec::new();
    for id in ids {
        if let Some(user) = store.get_user(id)? {
            users.push(user);
        }
    }
    Ok(users)
}

/// Users following `user_id`, in edge insertion order.
pub fn get_followers(store: &dyn EntityStore, user_id: Id) -> Result<Vec<User>, ApiError> {
    find_user(store, user_id)?;
    let edges = store.follows_to(user_id)?;
    resolve_users(store, edges.into_iter().map(|f| f.follower_id))
}

/// Users `user_id` follows, in edge insertion order.
pub fn get_following(store: &dyn EntityStore, user_id: Id) -> Result<Vec<User>, ApiError> {
    find_user(store, user_id)?;
    let edges = store.follows_from(user_id)?;
    resolve_users(store, edges.into_iter().map(|f| f.following_id))
}

/// Every user except `user_id` and the users it already follows, by id.
pub fn get_suggestions(store: &dyn EntityStore, user_id: Id, limit: Option<usize>) -> Result<Vec<User>, ApiError> {
    find_user(store, user_id)?;
    let followed: HashSet<Id> = store
        .follows_from(user_id)?
        .into_iter()
        .map(|f| f.following_id)
        .collect();

    let mut suggestions: Vec<User> = store
        .list_users()?
        .into_iter()
        .filter(|u| u.id != user_id && !followed.contains(&u.id))
        .collect();
    suggestions.sort_by_key(|u| u.id);
    if let Some(limit) = limit {
        suggestions.truncate(limit);
    }
    Ok(suggestions)
}

// === HTTP Handlers ===

pub fn handle_follow(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    let value = match parse_json_body(req) {
        Ok(v) => v,
        Err(err) => return Ok(err.into()),
    };
    let (follower_id, following_id) = match (id_field(&value, "followerId"), id_field(&value, "followingId")) {
        (Ok(follower), Ok(Some(following))) => (follower.unwrap_or(user_id), following),
        (Err(err), _) | (_, Err(err)) => return Ok(err.into()),
        (Ok(_), Ok(None)) => {
            return Ok(ApiError::BadRequest("'followingId' is required".to_string()).into())
        }
    };

    if follower_id != user_id {
        warn!(user_id, follower_id, "attempt to create a follow for another user");
        return Ok(ApiError::Forbidden("You can only follow on your own behalf".to_string()).into());
    }

    respond(201, create_follow(store, follower_id, following_id))
}

pub fn get_followers_list(store: &dyn EntityStore, id: &str) -> anyhow::Result<Response> {
    respond(200, parse_id(id, "user").and_then(|id| get_followers(store, id)))
}

pub fn get_following_list(store: &dyn EntityStore, id: &str) -> anyhow::Result<Response> {
    respond(200, parse_id(id, "user").and_then(|id| get_following(store, id)))
}

pub fn get_suggestions_list(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    let params = parse_query_params(&req.uri());
    respond(200, get_suggestions(store, user_id, get_limit(&params, "limit")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;
    use crate::users::tests::seed_user;

    fn ids(users: &[User]) -> Vec<Id> {
        users.iter().map(|u| u.id).collect()
    }

    #[test]
    fn suggestions_before_and_after_following() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "A");
        let b = seed_user(&store, "b", "B");

        assert_eq!(ids(&get_suggestions(&store, a.id, None).unwrap()), vec![b.id]);

        create_follow(&store, a.id, b.id).unwrap();
        assert!(get_suggestions(&store, a.id, None).unwrap().is_empty());
        // the edge is directed
        assert_eq!(ids(&get_suggestions(&store, b.id, None).unwrap()), vec![a.id]);
    }

    #[test]
    fn suggestions_never_overlap_following_or_self() {
        let store = MemoryStore::new();
        let users: Vec<User> = (0..6)
            .map(|i| seed_user(&store, &format!("user{}", i), &format!("User {}", i)))
            .collect();
        create_follow(&store, users[0].id, users[2].id).unwrap();
        create_follow(&store, users[0].id, users[4].id).unwrap();
        create_follow(&store, users[3].id, users[0].id).unwrap();
        create_follow(&store, users[5].id, users[1].id).unwrap();

        for user in &users {
            let following: HashSet<Id> = ids(&get_following(&store, user.id).unwrap()).into_iter().collect();
            let suggestions = ids(&get_suggestions(&store, user.id, None).unwrap());
            assert!(!suggestions.contains(&user.id));
            assert!(suggestions.iter().all(|id| !following.contains(id)));
            assert_eq!(suggestions.len() + following.len() + 1, users.len());
        }
    }

    #[test]
    fn suggestions_respect_limit_in_id_order() {
        let store = MemoryStore::new();
        let me = seed_user(&store, "me", "Me");
        for i in 0..5 {
            seed_user(&store, &format!("other{}", i), "Other");
        }
        let limited = get_suggestions(&store, me.id, Some(2)).unwrap();
        assert_eq!(ids(&limited), vec![2, 3]);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let store = MemoryStore::new();
        assert_eq!(get_suggestions(&store, 7, None).unwrap_err().status(), 404);
        assert_eq!(get_followers(&store, 7).unwrap_err().status(), 404);
        assert_eq!(get_following(&store, 7).unwrap_err().status(), 404);
    }

    #[test]
    fn followers_and_following_follow_edges() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "alice", "Alice");
        let b = seed_user(&store, "bob", "Bob");
        let c = seed_user(&store, "carol", "Carol");
        create_follow(&store, c.id, a.id).unwrap();
        create_follow(&store, b.id, a.id).unwrap();

        assert_eq!(ids(&get_followers(&store, a.id).unwrap()), vec![c.id, b.id]);
        assert_eq!(ids(&get_following(&store, b.id).unwrap()), vec![a.id]);
        assert!(get_following(&store, a.id).unwrap().is_empty());
    }

    #[test]
    fn self_and_duplicate_follows_are_rejected() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "alice", "Alice");
        let b = seed_user(&store, "bob", "Bob");

        assert_eq!(create_follow(&store, a.id, a.id).unwrap_err().status(), 400);
        create_follow(&store, a.id, b.id).unwrap();
        assert_eq!(create_follow(&store, a.id, b.id).unwrap_err().status(), 409);
        assert_eq!(create_follow(&store, a.id, 99).unwrap_err().status(), 404);
        assert_eq!(store.follows_from(a.id).unwrap().len(), 1);
    }
}
