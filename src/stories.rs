use chrono::{DateTime, Duration, Utc};
use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::authenticate;
use crate::config::{DEFAULT_STORY_DURATION_HOURS, MAX_STORY_DURATION_HOURS};
use crate::core::errors::ApiError;
use crate::core::helpers::{now, parse_id, parse_json_body, respond, sanitize_text, text_field};
use crate::core::store::EntityStore;
use crate::models::models::{Id, NewStory, Story};
use crate::users::find_user;

#[derive(Debug, Default, Clone)]
pub struct StoryDraft {
    pub content: Option<String>,
    pub media: String,
    pub media_type: String,
    pub duration: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn create_story(store: &dyn EntityStore, user_id: Id, draft: StoryDraft) -> Result<Story, ApiError> {
    if draft.media.trim().is_empty() || draft.media_type.trim().is_empty() {
        return Err(ApiError::BadRequest("'media' and 'mediaType' are required".to_string()));
    }
    let duration = draft.duration.unwrap_or(DEFAULT_STORY_DURATION_HOURS);
    if duration == 0 || duration > MAX_STORY_DURATION_HOURS {
        return Err(ApiError::BadRequest("Story duration must be 1-168 hours".to_string()));
    }
    let now = now();
    let expires_at = draft
        .expires_at
        .unwrap_or_else(|| now + Duration::hours(i64::from(duration)));
    if expires_at <= now {
        return Err(ApiError::BadRequest("Story expiry must be in the future".to_string()));
    }

    let story = store.insert_story(NewStory {
        user_id,
        content: draft.content.map(|c| sanitize_text(c.trim())).filter(|c| !c.is_empty()),
        media: draft.media,
        media_type: draft.media_type,
        duration,
        expires_at,
    })?;
    info!(story_id = story.id, user_id, "story created");
    Ok(story)
}

/// Stories not yet expired at `at`, newest first.
pub fn list_active_stories(store: &dyn EntityStore, at: DateTime<Utc>) -> Result<Vec<Story>, ApiError> {
    let mut stories = store.list_stories()?;
    stories.retain(|s| s.is_active(at));
    Ok(stories)
}

pub fn list_user_stories(store: &dyn EntityStore, user_id: Id) -> Result<Vec<Story>, ApiError> {
    find_user(store, user_id)?;
    Ok(store.list_user_stories(user_id)?)
}

pub fn get_story(store: &dyn EntityStore, id: Id) -> Result<Story, ApiError> {
    store
        .get_story(id)?
        .ok_or_else(|| ApiError::NotFound("Story not found".to_string()))
}

// === HTTP Handlers ===

pub fn handle_create_story(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    let result = parse_json_body(req).and_then(|value| {
        let duration = match value.get("duration") {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => Some(
                v.as_u64()
                    .and_then(|d| u32::try_from(d).ok())
                    .ok_or_else(|| ApiError::BadRequest("'duration' must be a number of hours".to_string()))?,
            ),
        };
        let expires_at = text_field(&value, "expiresAt")?
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| ApiError::BadRequest("'expiresAt' must be an RFC 3339 timestamp".to_string()))
            })
            .transpose()?;
        let draft = StoryDraft {
            content: text_field(&value, "content")?,
            media: text_field(&value, "media")?.unwrap_or_default(),
            media_type: text_field(&value, "mediaType")?.unwrap_or_default(),
            duration,
            expires_at,
        };
        create_story(store, user_id, draft)
    });
    respond(201, result)
}

pub fn handle_active_stories(store: &dyn EntityStore) -> anyhow::Result<Response> {
    respond(200, list_active_stories(store, now()))
}

pub fn handle_user_stories(store: &dyn EntityStore, id: &str) -> anyhow::Result<Response> {
    respond(200, parse_id(id, "user").and_then(|id| list_user_stories(store, id)))
}

pub fn handle_get_story(store: &dyn EntityStore, id: &str) -> anyhow::Result<Response> {
    respond(200, parse_id(id, "story").and_then(|id| get_story(store, id)))
}
