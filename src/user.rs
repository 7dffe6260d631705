//! User records: registration, token-based authentication, flags and
//! profile fields. Password hashing lives in the excluded auth layer; the
//! engine stores whatever salt and hash it is handed.

use ::std::sync::OnceLock;

use ::constant_time_eq::constant_time_eq;
use ::log::*;
use ::rand::RngCore;

use crate::error::{Error, Result};
use crate::model::{Context, User};
use crate::store::Store;
use crate::{ratelimit, Engine};

const ABOUT_MAX_LENGTH: usize = 4096;
const EMAIL_MAX_LENGTH: usize = 256;

fn username_re() -> &'static ::regex::Regex {
    static RE: OnceLock<::regex::Regex> = OnceLock::new();
    RE.get_or_init(|| ::regex::Regex::new(r"^[a-zA-Z0-9_-]{2,32}$").expect("valid regex"))
}

/// Hex representation of an unguessable 160-bit random value, used for
/// auth tokens, API secrets and password salts.
pub fn random_token() -> String {
    let mut bytes = [0u8; 20];
    ::rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Register a user. The first user ever created is an administrator.
///
/// Account creation is throttled per originating address; the username is
/// unique case-insensitively. Returns the new user id and auth token.
pub async fn create_user(
    engine: &Engine,
    ctx: &Context,
    username: &str,
    salt: &str,
    password_hash: &str,
) -> Result<(u64, String)> {
    let username = username.trim();
    if !username_re().is_match(username) {
        return Err(Error::Validation(
            "username must be 2..32 letters, digits, '-' or '_'".to_string(),
        ));
    }
    let username_key = format!("username.to.id:{}", username.to_lowercase());
    if engine.store.exists(&username_key).await? {
        return Err(Error::AlreadyExists("username"));
    }
    if ratelimit::is_limited(
        engine.store.as_ref(),
        engine.config.create_user_window,
        &["create_user", &ctx.remote_addr],
    )
    .await?
    {
        return Err(Error::RateLimited);
    }

    let id = engine.store.incr("users.count").await? as u64;
    let auth_token = random_token();
    let apisecret = random_token();
    let flags = if id == 1 { "a" } else { "" };
    engine
        .store
        .hset(
            &format!("user:{}", id),
            &[
                ("id", id.to_string()),
                ("username", username.to_string()),
                ("salt", salt.to_string()),
                ("password", password_hash.to_string()),
                ("ctime", ctx.now.to_string()),
                ("karma", engine.config.user_initial_karma.to_string()),
                ("about", String::new()),
                ("email", String::new()),
                ("auth", auth_token.clone()),
                ("apisecret", apisecret),
                ("flags", flags.to_string()),
                ("karma_incr_time", ctx.now.to_string()),
                ("replies", "0".to_string()),
            ],
        )
        .await?;
    engine.store.set(&username_key, &id.to_string()).await?;
    engine
        .store
        .set(&format!("auth:{}", auth_token), &id.to_string())
        .await?;

    info!("created user {} ({})", id, username);
    Ok((id, auth_token))
}

/// Resolve an auth token to its user; `None` means anonymous.
pub async fn auth_user(engine: &Engine, token: &str) -> Result<Option<User>> {
    let Some(id) = engine.store.get(&format!("auth:{}", token)).await? else {
        return Ok(None);
    };
    let map = engine.store.hgetall(&format!("user:{}", id)).await?;
    Ok(User::from_map(&map))
}

/// Rotate the user's auth token, invalidating every open session.
/// Returns the new token.
pub async fn update_auth_token(engine: &Engine, user: &User) -> Result<String> {
    engine.store.del(&format!("auth:{}", user.auth)).await?;
    let new_token = random_token();
    engine
        .store
        .hset(&format!("user:{}", user.id), &[("auth", new_token.clone())])
        .await?;
    engine
        .store
        .set(&format!("auth:{}", new_token), &user.id.to_string())
        .await?;
    Ok(new_token)
}

/// Constant-time check of the per-user API secret that write forms carry.
pub fn check_api_secret(user: &User, apisecret: &str) -> bool {
    constant_time_eq(user.apisecret.as_bytes(), apisecret.as_bytes())
}

pub async fn get_user_by_id(engine: &Engine, user_id: u64) -> Result<Option<User>> {
    let map = engine.store.hgetall(&format!("user:{}", user_id)).await?;
    Ok(User::from_map(&map))
}

pub async fn get_user_by_username(engine: &Engine, username: &str) -> Result<Option<User>> {
    let id = engine
        .store
        .get(&format!("username.to.id:{}", username.to_lowercase()))
        .await?;
    match id.and_then(|v| v.parse::<u64>().ok()) {
        Some(id) => get_user_by_id(engine, id).await,
        None => Ok(None),
    }
}

/// Add flags to a user. Flags already present are kept once; concurrent
/// writers are last-one-wins on this field.
pub async fn user_add_flags(engine: &Engine, user_id: u64, flags: &str) -> Result<()> {
    let user = get_user_by_id(engine, user_id)
        .await?
        .ok_or(Error::NotFound("user"))?;
    let mut new_flags = user.flags.clone();
    for flag in flags.chars() {
        if !new_flags.contains(flag) {
            new_flags.push(flag);
        }
    }
    engine
        .store
        .hset(&format!("user:{}", user_id), &[("flags", new_flags)])
        .await?;
    Ok(())
}

/// Update the identity's own profile fields, mirrored into the context.
pub async fn update_profile(
    engine: &Engine,
    ctx: &mut Context,
    about: &str,
    email: &str,
) -> Result<()> {
    let user_id = ctx.require_user()?.id;
    let about: String = about.chars().take(ABOUT_MAX_LENGTH).collect();
    let email: String = email.chars().take(EMAIL_MAX_LENGTH).collect();
    engine
        .store
        .hset(
            &format!("user:{}", user_id),
            &[("about", about.clone()), ("email", email.clone())],
        )
        .await?;
    if let Some(user) = &mut ctx.user {
        user.about = about;
        user.email = email;
    }
    Ok(())
}

/// Posted-news and posted-comments totals for the profile page, fetched
/// from the per-user orderings.
pub async fn user_counters(engine: &Engine, user_id: u64) -> Result<(u64, u64)> {
    let posted = engine
        .store
        .zcard(&format!("user.posted:{}", user_id))
        .await?;
    let comments = engine
        .store
        .zcard(&format!("user.comments:{}", user_id))
        .await?;
    Ok((posted, comments))
}
