use spin_sdk::http::{Request, Response};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::token_expiration_hours;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, now, parse_json_body, respond, text_field, validate_uuid, verify_password};
use crate::core::store::EntityStore;
use crate::models::models::{Id, Session};

fn bearer_token(req: &Request) -> Option<&str> {
    req.header("Authorization")?
        .as_str()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

pub fn login(store: &dyn EntityStore, username: &str, password: &str) -> Result<Session, ApiError> {
    let Some(user) = store.find_user_by_username(username)? else {
        warn!(%username, "login for unknown user");
        return Err(ApiError::Unauthorized);
    };
    let hash = store.password_hash(user.id)?.unwrap_or_default();
    if !verify_password(password, &hash) {
        warn!(user_id = user.id, "login with wrong password");
        return Err(ApiError::Unauthorized);
    }

    let session = Session {
        token: Uuid::new_v4().to_string(),
        user_id: user.id,
        created_at: now(),
    };
    store.insert_session(session.clone())?;
    info!(user_id = user.id, "session opened");
    Ok(session)
}

/// Resolves the bearer token to the session's user id.
///
/// Expired sessions and sessions whose user no longer exists resolve to
/// `Ok(None)`. Store failures are returned as errors.
pub fn validate_token(store: &dyn EntityStore, req: &Request) -> Result<Option<Id>, ApiError> {
    let Some(token) = bearer_token(req).filter(|t| validate_uuid(t)) else {
        return Ok(None);
    };
    let Some(session) = store.get_session(token)? else {
        return Ok(None);
    };
    let age_hours = (now() - session.created_at).num_hours();
    if age_hours >= token_expiration_hours() {
        return Ok(None);
    }
    // Check if user still exists
    if store.get_user(session.user_id)?.is_none() {
        return Ok(None);
    }
    Ok(Some(session.user_id))
}

/// Session user of `req`, or `Unauthorized` when there is none.
pub fn authenticate(store: &dyn EntityStore, req: &Request) -> Result<Id, ApiError> {
    validate_token(store, req)?.ok_or(ApiError::Unauthorized)
}

// === HTTP Handlers ===

pub fn login_user(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let creds = match parse_json_body(req) {
        Ok(v) => v,
        Err(err) => return Ok(err.into()),
    };
    let username = text_field(&creds, "username").ok().flatten().unwrap_or_default();
    let password = text_field(&creds, "password").ok().flatten().unwrap_or_default();

    let result = login(store, &username, &password).map(|session| {
        serde_json::json!({
            "token": session.token,
            "userId": session.user_id,
        })
    });
    respond(200, result)
}

pub fn logout_user(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let Some(token) = bearer_token(req) else {
        return Ok(ApiError::Unauthorized.into());
    };
    if !store.delete_session(token)? {
        return Ok(ApiError::Unauthorized.into());
    }

    json_response(200, &serde_json::json!({ "message": "Logged out successfully" }))
}
