//! Notification lifecycle: `unread` on creation, `read` once marked, never back.

use std::collections::HashMap;

use serde_json::Value;
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};

use crate::auth::authenticate;
use crate::config::MAX_NOTIFICATION_LENGTH;
use crate::core::errors::ApiError;
use crate::core::helpers::{char_len, id_field, json_response, parse_id, parse_json_body, respond, sanitize_text};
use crate::core::store::EntityStore;
use crate::models::models::{Id, NewNotification, Notification, NotificationKind, NotificationView, User};

pub fn create_notification(
    store: &dyn EntityStore,
    recipient_id: Id,
    sender_id: Option<Id>,
    kind: &str,
    content: &str,
    post_id: Option<Id>,
) -> Result<Notification, ApiError> {
    let kind: NotificationKind = kind.parse().map_err(ApiError::BadRequest)?;
    let content = content.trim();
    if char_len(content) > MAX_NOTIFICATION_LENGTH {
        return Err(ApiError::BadRequest("Notification content too long".to_string()));
    }
    let content = sanitize_text(content);
    if content.is_empty() {
        return Err(ApiError::BadRequest("Notification content is required".to_string()));
    }

    let notification = store.insert_notification(NewNotification {
        user_id: recipient_id,
        sender_id,
        kind,
        content,
        post_id,
    })?;
    info!(
        notification_id = notification.id,
        recipient_id,
        kind = %notification.kind,
        "notification created"
    );
    Ok(notification)
}

/// Notifications of `user_id`, newest first, with sender name and avatar
/// joined in.
pub fn list_for_user(store: &dyn EntityStore, user_id: Id) -> Result<Vec<NotificationView>, ApiError> {
    let notifications = store.list_user_notifications(user_id)?;

    let mut senders: HashMap<Id, Option<User>> = HashMap::new();
    for sender_id in notifications.iter().filter_map(|n| n.sender_id) {
        if !senders.contains_key(&sender_id) {
            senders.insert(sender_id, store.get_user(sender_id)?);
        }
    }

    Ok(notifications
        .into_iter()
        .map(|notification| {
            let sender = notification
                .sender_id
                .and_then(|id| senders.get(&id))
                .and_then(Option::as_ref);
            NotificationView {
                sender_name: sender.map(|u| u.name.clone()),
                sender_avatar: sender.and_then(|u| u.avatar.clone()),
                notification,
            }
        })
        .collect())
}

/// Fetches notification `id` on behalf of `requesting_user_id`.
pub fn get_owned(store: &dyn EntityStore, id: Id, requesting_user_id: Id) -> Result<Notification, ApiError> {
    let notification = store
        .get_notification(id)?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;
    if notification.user_id != requesting_user_id {
        warn!(notification_id = id, requesting_user_id, "notification owned by another user");
        return Err(ApiError::Forbidden(
            "You don't have permission to update this notification".to_string(),
        ));
    }
    Ok(notification)
}

/// Marks one notification read. Idempotent; only the owner may do it.
pub fn mark_read(store: &dyn EntityStore, id: Id, requesting_user_id: Id) -> Result<Notification, ApiError> {
    let notification = get_owned(store, id, requesting_user_id)?;
    if notification.read {
        return Ok(notification);
    }
    store
        .mark_notification_read(id)?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))
}

/// Marks every unread notification of `user_id` read; returns how many flipped.
pub fn mark_all_read(store: &dyn EntityStore, user_id: Id) -> Result<usize, ApiError> {
    let updated = store.mark_all_notifications_read(user_id)?;
    info!(user_id, updated, "notifications marked read");
    Ok(updated)
}

// === HTTP Handlers ===

pub fn list_notifications(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    respond(200, list_for_user(store, user_id))
}

pub fn handle_create_notification(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    let result = parse_json_body(req).and_then(|value| {
        let recipient_id = id_field(&value, "userId")?.unwrap_or(user_id);
        let sender_id = id_field(&value, "senderId")?;
        if sender_id.is_some_and(|sender| sender != user_id) {
            warn!(user_id, ?sender_id, "attempt to send a notification as another user");
            return Err(ApiError::Forbidden("You can only send notifications as yourself".to_string()));
        }
        let post_id = id_field(&value, "postId")?;
        let kind = value["type"]
            .as_str()
            .ok_or_else(|| ApiError::BadRequest("'type' is required".to_string()))?;
        let content = value["content"]
            .as_str()
            .ok_or_else(|| ApiError::BadRequest("'content' is required".to_string()))?;
        create_notification(store, recipient_id, sender_id, kind, content, post_id)
    });
    respond(201, result)
}

pub fn update_notification(store: &dyn EntityStore, req: &Request, id: &str) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    let result = parse_json_body(req).and_then(|value| {
        let read = value
            .get("read")
            .and_then(Value::as_bool)
            .ok_or_else(|| ApiError::BadRequest("Invalid data. 'read' must be a boolean value.".to_string()))?;
        let id = parse_id(id, "notification")?;
        if read {
            mark_read(store, id, user_id)
        } else {
            get_owned(store, id, user_id)?;
            Err(ApiError::BadRequest("Notifications cannot be marked as unread".to_string()))
        }
    });
    respond(200, result)
}

pub fn read_all_notifications(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    match mark_all_read(store, user_id) {
        Ok(updated) => json_response(200, &serde_json::json!({ "success": true, "updated": updated })),
        Err(err) => Ok(err.into()),
    }
}
