use serde_json::Value;
use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::authenticate;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{char_len, hash_password, parse_id, parse_json_body, respond, sanitize_text, text_field};
use crate::core::store::{EntityStore, StoreError};
use crate::models::models::{Id, NewUser, Profile, ProfileStats, User};

/// Registration input, before validation.
#[derive(Debug, Default, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub cover_photo: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub birthday: Option<String>,
    pub theme_color: Option<String>,
}

/// Partial profile update; `None` leaves a field untouched and an empty
/// string clears an optional field.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub cover_photo: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub birthday: Option<String>,
    pub theme_color: Option<String>,
}

/// Free text: tags stripped, blank becomes `None`.
fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| sanitize_text(v.trim()))
        .filter(|v| !v.is_empty())
}

/// URLs, colors, dates: stored as typed, blank becomes `None`.
fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn valid_name(raw: &str) -> Result<String, ApiError> {
    let raw = raw.trim();
    let name = sanitize_text(raw);
    if name.is_empty() || char_len(raw) > MAX_NAME_LENGTH {
        return Err(ApiError::BadRequest("Name must be 1-100 characters".to_string()));
    }
    Ok(name)
}

pub fn find_user(store: &dyn EntityStore, id: Id) -> Result<User, ApiError> {
    store
        .get_user(id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub fn register_user(store: &dyn EntityStore, reg: Registration) -> Result<User, ApiError> {
    let username = reg.username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    if char_len(username) < MIN_USERNAME_LENGTH || char_len(username) > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest("Username must be 3-50 characters".to_string()));
    }
    if char_len(&reg.password) < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest("Password must be at least 3 characters".to_string()));
    }
    let name = valid_name(&reg.name)?;
    if reg.bio.as_ref().is_some_and(|b| char_len(b.trim()) > MAX_BIO_LENGTH) {
        return Err(ApiError::BadRequest("Bio too long (max 500 chars)".to_string()));
    }

    let new_user = NewUser {
        username: username.to_string(),
        password_hash: hash_password(&reg.password)?,
        email: trim_optional(reg.email),
        name,
        bio: clean_optional(reg.bio),
        avatar: trim_optional(reg.avatar),
        cover_photo: trim_optional(reg.cover_photo),
        location: clean_optional(reg.location),
        website: trim_optional(reg.website),
        birthday: trim_optional(reg.birthday),
        theme_color: trim_optional(reg.theme_color),
    };

    let user = store.insert_user(new_user).map_err(|err| match err {
        StoreError::UniqueViolation { .. } => ApiError::Conflict("Username exists".to_string()),
        other => other.into(),
    })?;
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

pub fn get_profile(store: &dyn EntityStore, user_id: Id) -> Result<Profile, ApiError> {
    let user = find_user(store, user_id)?;
    let followers = store.follows_to(user_id)?.len();
    let following = store.follows_from(user_id)?.len();
    Ok(Profile {
        stats: ProfileStats {
            posts: user.posts,
            stories: user.stories,
            activity: user.activity.clone(),
        },
        user,
        followers,
        following,
    })
}

pub fn update_profile(store: &dyn EntityStore, user_id: Id, update: ProfileUpdate) -> Result<User, ApiError> {
    let mut user = find_user(store, user_id)?;

    if let Some(name) = update.name {
        user.name = valid_name(&name)?;
    }
    if let Some(bio) = update.bio {
        if char_len(bio.trim()) > MAX_BIO_LENGTH {
            return Err(ApiError::BadRequest("Bio too long (max 500 chars)".to_string()));
        }
        user.bio = clean_optional(Some(bio));
    }
    if update.location.is_some() {
        user.location = clean_optional(update.location);
    }
    let verbatim_fields = [
        (update.avatar, &mut user.avatar),
        (update.cover_photo, &mut user.cover_photo),
        (update.website, &mut user.website),
        (update.birthday, &mut user.birthday),
        (update.theme_color, &mut user.theme_color),
    ];
    for (value, field) in verbatim_fields {
        if value.is_some() {
            *field = trim_optional(value);
        }
    }

    store
        .update_user(&user)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

// === HTTP Handlers ===

fn registration_from_json(value: &Value) -> Result<Registration, ApiError> {
    Ok(Registration {
        username: text_field(value, "username")?.unwrap_or_default(),
        password: text_field(value, "password")?.unwrap_or_default(),
        name: text_field(value, "name")?.unwrap_or_default(),
        email: text_field(value, "email")?,
        bio: text_field(value, "bio")?,
        avatar: text_field(value, "avatar")?,
        cover_photo: text_field(value, "coverPhoto")?,
        location: text_field(value, "location")?,
        website: text_field(value, "website")?,
        birthday: text_field(value, "birthday")?,
        theme_color: text_field(value, "themeColor")?,
    })
}

fn profile_update_from_json(value: &Value) -> Result<ProfileUpdate, ApiError> {
    Ok(ProfileUpdate {
        name: text_field(value, "name")?,
        bio: text_field(value, "bio")?,
        avatar: text_field(value, "avatar")?,
        cover_photo: text_field(value, "coverPhoto")?,
        location: text_field(value, "location")?,
        website: text_field(value, "website")?,
        birthday: text_field(value, "birthday")?,
        theme_color: text_field(value, "themeColor")?,
    })
}

pub fn create_user(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let result = parse_json_body(req)
        .and_then(|value| registration_from_json(&value))
        .and_then(|reg| register_user(store, reg));
    respond(201, result)
}

pub fn list_users(store: &dyn EntityStore) -> anyhow::Result<Response> {
    respond(200, store.list_users().map_err(ApiError::from))
}

pub fn get_user_details(store: &dyn EntityStore, id: &str) -> anyhow::Result<Response> {
    respond(200, parse_id(id, "user").and_then(|id| find_user(store, id)))
}

pub fn get_profile_handler(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    respond(200, get_profile(store, user_id))
}

pub fn update_profile_handler(store: &dyn EntityStore, req: &Request) -> anyhow::Result<Response> {
    let user_id = match authenticate(store, req) {
        Ok(uid) => uid,
        Err(err) => return Ok(err.into()),
    };

    let result = parse_json_body(req)
        .and_then(|value| profile_update_from_json(&value))
        .and_then(|update| update_profile(store, user_id, update));
    respond(200, result)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;

    /// Inserts a user without paying for argon2 hashing.
    pub(crate) fn seed_user(store: &dyn EntityStore, username: &str, name: &str) -> User {
        store
            .insert_user(NewUser {
                username: username.to_string(),
                password_hash: "unused".to_string(),
                name: name.to_string(),
                avatar: Some(format!("/assets/{}.png", username)),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn registration_validates_and_sanitizes() {
        let store = MemoryStore::new();
        let err = register_user(
            &store,
            Registration { username: "ab".into(), password: "pw1".into(), name: "A".into(), ..Default::default() },
        )
        .unwrap_err();
        assert_eq!(err.status(), 400);

        let user = register_user(
            &store,
            Registration {
                username: "pierre".into(),
                password: "secret".into(),
                name: "<i>Pierre</i> Network".into(),
                bio: Some("   ".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(user.name, "Pierre Network");
        assert_eq!(user.bio, None);
        assert_eq!(user.activity, DEFAULT_ACTIVITY);
    }

    #[test]
    fn duplicate_username_is_a_conflict() {
        let store = MemoryStore::new();
        seed_user(&store, "pierre", "Pierre");
        let err = register_user(
            &store,
            Registration { username: "pierre".into(), password: "secret".into(), name: "P".into(), ..Default::default() },
        )
        .unwrap_err();
        assert_eq!(err.status(), 409);
    }

    #[test]
    fn profile_counts_followers_and_following() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "alice", "Alice");
        let b = seed_user(&store, "bob", "Bob");
        let c = seed_user(&store, "carol", "Carol");
        crate::follow::create_follow(&store, b.id, a.id).unwrap();
        crate::follow::create_follow(&store, c.id, a.id).unwrap();
        crate::follow::create_follow(&store, a.id, c.id).unwrap();

        let profile = get_profile(&store, a.id).unwrap();
        assert_eq!(profile.followers, 2);
        assert_eq!(profile.following, 1);
        assert_eq!(profile.stats.activity, DEFAULT_ACTIVITY);
    }

    #[test]
    fn profile_update_is_partial() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "alice", "Alice");
        let updated = update_profile(
            &store,
            a.id,
            ProfileUpdate { bio: Some("Voyageuse".into()), avatar: Some(String::new()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(updated.name, "Alice");
        assert_eq!(updated.bio.as_deref(), Some("Voyageuse"));
        assert_eq!(updated.avatar, None);

        let err = update_profile(
            &store,
            a.id,
            ProfileUpdate { bio: Some("x".repeat(MAX_BIO_LENGTH + 1)), ..Default::default() },
        )
        .unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn profile_update_stores_text_as_typed() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "alice", "Alice");
        let updated = update_profile(
            &store,
            a.id,
            ProfileUpdate {
                name: Some("Tom & Jerry <3".into()),
                avatar: Some("https://cdn.x/a.png?w=1&h=2".into()),
                website: Some(" https://niney.fr/?ref=a&copy=1 ".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.name, "Tom & Jerry <3");
        assert_eq!(updated.avatar.as_deref(), Some("https://cdn.x/a.png?w=1&h=2"));
        assert_eq!(updated.website.as_deref(), Some("https://niney.fr/?ref=a&copy=1"));

        let stored = find_user(&store, a.id).unwrap();
        assert_eq!(stored.avatar, updated.avatar);
    }

    #[test]
    fn name_limit_counts_characters() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "alice", "Alice");
        let at_limit = "é".repeat(MAX_NAME_LENGTH);
        let updated = update_profile(&store, a.id, ProfileUpdate { name: Some(at_limit.clone()), ..Default::default() })
            .unwrap();
        assert_eq!(updated.name, at_limit);

        let over = "é".repeat(MAX_NAME_LENGTH + 1);
        let err = update_profile(&store, a.id, ProfileUpdate { name: Some(over), ..Default::default() }).unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
