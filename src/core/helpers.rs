use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use ammonia::Builder;
use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::Value;
use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::models::models::Id;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn json_response<T: Serialize>(status: u16, value: &T) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(value)?)
        .build())
}

/// Serializes `Ok` with `status`, or turns the error into its response.
pub fn respond<T: Serialize>(status: u16, result: Result<T, ApiError>) -> anyhow::Result<Response> {
    match result {
        Ok(value) => json_response(status, &value),
        Err(err) => Ok(err.into()),
    }
}

pub fn parse_json_body(req: &Request) -> Result<Value, ApiError> {
    let body = req.body();
    if body.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))
}

pub fn parse_id(segment: &str, what: &str) -> Result<Id, ApiError> {
    segment
        .parse::<Id>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {} id", what)))
}

/// Reads an optional id field. Missing and `null` are `None`; anything other
/// than a positive integer is rejected.
pub fn id_field(value: &Value, key: &str) -> Result<Option<Id>, ApiError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| Id::try_from(n).ok())
            .filter(|id| *id > 0)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("'{}' must be a positive integer", key))),
    }
}

/// Reads an optional string field, rejecting non-string values.
pub fn text_field(value: &Value, key: &str) -> Result<Option<String>, ApiError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ApiError::BadRequest(format!("'{}' must be a string", key))),
    }
}

/// Strips every tag from free text. The cleaner escapes what it keeps, so
/// entities are decoded back to the characters the user typed.
pub fn sanitize_text(text: &str) -> String {
    let cleaned = Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string();
    decode_html_entities(&cleaned).into_owned()
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}
