//! Seeds a store with demo users, stories, votes and a comment thread,
//! then prints the resulting front page and thread ordering.
//!
//! Uses the Redis store when REDIS_URL is set, an in-memory store
//! otherwise (useful to eyeball the engine without any infrastructure).

use ::std::sync::Arc;
use ::std::time::{SystemTime, UNIX_EPOCH};

use ::log::*;

use newsrank::{comment, news, user, vote, Config, Context, Engine, RedisStore, VoteDirection};

#[tokio::main]
async fn main() -> ::anyhow::Result<()> {
    ::dotenvy::dotenv().ok();
    ::env_logger::init();

    let config = Config::from_env()?;
    let engine = match ::std::env::var("REDIS_URL") {
        Ok(url) => Engine::new(Arc::new(RedisStore::connect(&url).await?), config),
        Err(_) => {
            info!("REDIS_URL not set, seeding an in-memory store");
            Engine::in_memory(config)
        }
    };

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;

    // Distinct originating addresses: account creation is throttled per
    // address.
    let mut sessions = Vec::new();
    for (i, name) in ["antirez", "alice", "bob"].iter().enumerate() {
        let addr = format!("10.0.0.{}", i + 1);
        let anon = Context::anonymous(addr.clone(), now);
        let (id, token) = user::create_user(
            &engine,
            &anon,
            name,
            &user::random_token(),
            &user::random_token(),
        )
        .await?;
        let logged = user::auth_user(&engine, &token)
            .await?
            .expect("user was just created");
        println!("created user {} (id {})", name, id);
        sessions.push(Context::authenticated(logged, addr, now));
    }

    let stories = [
        ("Redis 7.4 released", "https://redis.io/blog/7-4", ""),
        ("Show: my static site generator", "https://example.org/ssg", ""),
        (
            "What are you reading this month?",
            "",
            "Fiction or papers, anything goes.",
        ),
    ];
    let mut ids = Vec::new();
    for (ctx, (title, url, text)) in sessions.iter_mut().zip(stories) {
        ids.push(news::submit_news(&engine, ctx, title, url, text).await?);
    }

    // Cross-votes: everyone starts with just enough karma for one upvote.
    vote::vote_news(&engine, &mut sessions[1], ids[0], VoteDirection::Up).await?;
    vote::vote_news(&engine, &mut sessions[2], ids[0], VoteDirection::Up).await?;

    let c1 = comment::post_comment(&engine, &mut sessions[1], ids[0], -1, "Great release!").await?;
    comment::post_comment(
        &engine,
        &mut sessions[2],
        ids[0],
        c1 as i64,
        "Agreed, the new commands look useful.",
    )
    .await?;
    comment::post_comment(
        &engine,
        &mut sessions[0],
        ids[0],
        -1,
        "Changelog link is in the post.",
    )
    .await?;

    let viewer = Context::anonymous("127.0.0.1", now);
    let (top, total) = news::get_top_news(&engine, &viewer, 0, engine.config.top_news_per_page).await?;
    println!("\nfront page ({} items):", total);
    for item in &top {
        println!(
            "  [{:>10.4}] {} ({}) by {}: {} up / {} down",
            item.rank,
            item.title,
            item.domain().unwrap_or_else(|| "text".to_string()),
            item.username.as_deref().unwrap_or("?"),
            item.up,
            item.down,
        );
    }

    let thread = comment::render_thread(&engine, ids[0], -1).await?;
    println!("\nthread for news {}:", ids[0]);
    for (c, depth) in &thread {
        println!("  {}- {} (score {})", "  ".repeat(*depth), c.body, c.score());
    }

    let stats = news::site_stats(&engine).await?;
    println!("\n{} users, {} news", stats.users, stats.news);
    Ok(())
}
