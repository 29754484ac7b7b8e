use std::collections::HashMap;

use ammonia::Builder;
use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::authenticate;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{char_len, parse_id, parse_json_body, respond, text_field};
use crate::core::store::EntityStore;
use crate::models::models::{Author, Id, NewPost, Post, PostView, ReactionKind, Reactions};

#[derive(Debug, Default, Clone)]
pub struct PostDraft {
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub media_type: Option<String>,
}

fn filter_post_content(content: &str) -> String {
    // Sanitize HTML to remove dangerous scripts and event handlers
    Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string()
}

fn post_not_found() -> ApiError {
    ApiError::NotFound("Post not found".to_string())
}

/// Attaches an author summary to each post, looking each author up once.
fn with_authors(store: &dyn EntityStore, posts: Vec<Post>) -> Result<Vec<PostView>, ApiError> {
    let mut authors: HashMap<Id, Author> = HashMap::new();
    for user_id in posts.iter().map(|p| p.user_id) {
        if !authors.contains_key(&user_id) {
            let author = store
                .get_user(user_id)?
                .map(|u| Author::from(&u))
                .unwrap_or_else(|| Author::unknown(user_id));
            authors.insert(user_id, author);
        }
    }
    Ok(posts
        .into_iter()
        .map(|post| PostView {
            user: authors
                .get(&post.user_id)
                .cloned()
                .unwrap_or_else(|| Author::unknown(post.user_id)),
            post,
        })
        .collect())
}

pub fn create_post(store: &dyn EntityStore, user_id: Id, draft: PostDraft) -> Result<PostView, ApiError> {
    let content = draft.content.trim();
    if content.is_empty() || char_len(content) > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest("Invalid content".to_string()));
    }

    let post = store.insert_post(NewPost {
        user_id,
        content: filter_post_content(content),
        image: draft.image,
        video: draft.video,
        media_type: draft.media_type,
    })?;
    info!(post_id = post.id, user_id, "post created");

    let mut views = with_authors(store, vec![post])?;
    views.pop().ok_or_else(|| ApiError::InternalError("Post vanished after insert".to_string()))
}

pub fn get_post(store: &dyn EntityStore, id: Id) -> Result<PostView, ApiError> {
    let post = store.get_post(id)?.ok_or_else(post_not_found)?;
    let mut views = with_authors(store, vec![post])?;
    views.pop().ok_or_else(post_not_found)
}

pub fn list_posts(store: &dyn EntityStore) -> Result<Vec<PostView>, ApiError> {
    let posts = store.list_posts()?;
    with_authors(store, posts)
}

pub fn list_user_posts(store: &dyn EntityStore, user_id: Id) -> Result<Vec<PostView>, ApiError> {
    let posts = store.list_user_posts(user_id)?;
    with_authors(store, posts)
}

/// Overwrites the stored counter pair (last writer wins).
pub fn update_reactions(store: &dyn EntityStore, post_id: Id, reactions: Reactions) -> Result<Post, ApiError> {
    store
        .set_post_reactions(post_id, reactions)?
        .ok_or_else(post_not_found)
}

/// Sets (or withdraws, with `None`) `user_id`'s reaction to the post.
///
/// Each user holds at most one reaction per post, so repeating a reaction
/// does not inflate the counters.
pub fn react(store: &dyn EntityStore, post_id: Id, user_id: Id, kind: Option<ReactionKind>) -> Result<Post, ApiError> {
    store
        .set_user_reaction(post_id, user_id, kind)?
        .ok_or_else(post_not_found)
}

// === HTTP Handlers ===

pub fn handle_create_post(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    let result = parse_json_body(req).and_then(|value| {
        let draft = PostDraft {
            content: text_field(&value, "content")?.unwrap_or_default(),
            image: text_field(&value, "image")?,
            video: text_field(&value, "video")?,
            media_type: text_field(&value, "mediaType")?,
        };
        create_post(store, user_id, draft)
    });
    respond(201, result)
}

pub fn handle_list_posts(store: &dyn EntityStore) -> anyhow::Result<Response> {
    respond(200, list_posts(store))
}

pub fn handle_get_post(store: &dyn EntityStore, id: &str) -> anyhow::Result<Response> {
    respond(200, parse_id(id, "post").and_then(|id| get_post(store, id)))
}

pub fn handle_profile_posts(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    respond(200, list_user_posts(store, user_id))
}

pub fn handle_update_reactions(store: &dyn EntityStore, req: &Request, id: &str) -> anyhow::Result<Response> {
    let result = parse_json_body(req).and_then(|value| {
        let id = parse_id(id, "post")?;
        let reactions: Reactions = serde_json::from_value(value["reactions"].clone()).map_err(|_| {
            ApiError::BadRequest("'reactions' must be {likes, dislikes} with non-negative integers".to_string())
        })?;
        update_reactions(store, id, reactions)
    });
    respond(200, result)
}

pub fn handle_react(store: &dyn EntityStore, req: &Request, id: &str) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    let result = parse_json_body(req).and_then(|value| {
        let id = parse_id(id, "post")?;
        let kind: Option<ReactionKind> = serde_json::from_value(value["reaction"].clone()).map_err(|_| {
            ApiError::BadRequest("'reaction' must be \"like\", \"dislike\" or null".to_string())
        })?;
        react(store, id, user_id, kind)
    });
    respond(200, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;
    use crate::users::tests::seed_user;

    fn draft(content: &str) -> PostDraft {
        PostDraft { content: content.to_string(), ..Default::default() }
    }

    #[test]
    fn reactions_are_overwritten_not_added() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "A");
        let post = create_post(&store, a.id, draft("hello")).unwrap().post;

        update_reactions(&store, post.id, Reactions { likes: 10, dislikes: 4 }).unwrap();
        update_reactions(&store, post.id, Reactions { likes: 3, dislikes: 1 }).unwrap();

        let stored = get_post(&store, post.id).unwrap().post;
        assert_eq!(stored.reactions, Reactions { likes: 3, dislikes: 1 });
    }

    #[test]
    fn reaction_update_on_missing_post_is_not_found() {
        let store = MemoryStore::new();
        let err = update_reactions(&store, 5, Reactions::default()).unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn per_user_reactions_are_idempotent() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "A");
        let b = seed_user(&store, "b", "B");
        let post = create_post(&store, a.id, draft("vote")).unwrap().post;

        react(&store, post.id, b.id, Some(ReactionKind::Like)).unwrap();
        let post_after = react(&store, post.id, b.id, Some(ReactionKind::Like)).unwrap();
        assert_eq!(post_after.reactions, Reactions { likes: 1, dislikes: 0 });

        let post_after = react(&store, post.id, b.id, Some(ReactionKind::Dislike)).unwrap();
        assert_eq!(post_after.reactions, Reactions { likes: 0, dislikes: 1 });
    }

    #[test]
    fn posts_are_listed_newest_first_with_authors() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "A");
        let b = seed_user(&store, "b", "B");
        create_post(&store, a.id, draft("first")).unwrap();
        create_post(&store, b.id, draft("second")).unwrap();

        let posts = list_posts(&store).unwrap();
        assert_eq!(posts[0].post.content, "second");
        assert_eq!(posts[0].user.username, "b");
        assert_eq!(posts[1].user.name, "A");
        assert_eq!(store.get_user(a.id).unwrap().unwrap().posts, 1);
    }

    #[test]
    fn post_content_is_validated_and_sanitized() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", "A");
        assert_eq!(create_post(&store, a.id, draft("  ")).unwrap_err().status(), 400);
        assert_eq!(
            create_post(&store, a.id, draft(&"a".repeat(MAX_POST_LENGTH + 1))).unwrap_err().status(),
            400
        );
        let view = create_post(&store, a.id, draft("hi<script>alert(1)</script>")).unwrap();
        assert_eq!(view.post.content, "hi");
    }
}
