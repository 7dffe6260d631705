#![allow(dead_code)] // not every test binary uses every fixture

// Shared fixtures for the engine integration tests. Everything runs on an
// in-memory store; time is whatever the Context says it is, so tests time
// travel by bumping `ctx.now`.

use newsrank::{user, Config, Context, Engine, Store};

/// Fixed base instant for all test clocks.
pub const T0: i64 = 1_700_000_000;

pub fn test_engine() -> Engine {
    Engine::in_memory(Config::default())
}

/// Register a user and return an authenticated context at T0. Each caller
/// must use a distinct address: account creation is throttled per address.
pub async fn login_new_user(engine: &Engine, name: &str, addr: &str) -> Context {
    let anon = Context::anonymous(addr, T0);
    let (_, token) = user::create_user(engine, &anon, name, "salt", "hash")
        .await
        .unwrap();
    let logged = user::auth_user(engine, &token).await.unwrap().unwrap();
    Context::authenticated(logged, addr, T0)
}

/// Engine with the first (admin) account already taken, so accounts the
/// test creates afterwards are regular users.
pub async fn engine_with_admin() -> (Engine, Context) {
    let engine = test_engine();
    let admin = login_new_user(&engine, "root", "192.168.0.1").await;
    assert!(admin.is_admin());
    (engine, admin)
}

/// Overwrite a user's stored karma and refresh the context copy.
pub async fn set_karma(engine: &Engine, ctx: &mut Context, karma: i64) {
    let id = ctx.user.as_ref().unwrap().id;
    engine
        .store
        .hset(&format!("user:{}", id), &[("karma", karma.to_string())])
        .await
        .unwrap();
    if let Some(user) = &mut ctx.user {
        user.karma = karma;
    }
}

/// The stored karma value, bypassing any context mirror.
pub async fn stored_karma(engine: &Engine, user_id: u64) -> i64 {
    engine
        .store
        .hget(&format!("user:{}", user_id), "karma")
        .await
        .unwrap()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}
