mod common;

use common::helpers::{engine_with_admin, login_new_user, T0};
use newsrank::{news, paginate::paginate, ranking, Context, Error, Store, VoteDirection};

#[tokio::test]
async fn submit_hydrate_and_enrich() {
    let (engine, mut admin) = engine_with_admin().await;
    let news_id = news::submit_news(
        &engine,
        &mut admin,
        "Redis is a data structure server",
        "https://redis.io/topics/data-types",
        "",
    )
    .await
    .unwrap();

    let item = news::get_news_by_id(&engine, &admin, news_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.title, "Redis is a data structure server");
    assert_eq!(item.user_id, admin.user.as_ref().unwrap().id);
    assert_eq!(item.up, 1);
    assert_eq!(item.down, 0);
    assert_eq!(item.score, 1.0);
    assert_eq!(item.username.as_deref(), Some("root"));
    assert_eq!(item.voted, Some(VoteDirection::Up));
    assert_eq!(item.domain().as_deref(), Some("redis.io"));

    // an anonymous reader gets no vote state
    let anon = Context::anonymous("127.0.0.1", T0);
    let item = news::get_news_by_id(&engine, &anon, news_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.voted, None);
}

#[tokio::test]
async fn text_posts_use_the_inline_marker() {
    let (engine, mut admin) = engine_with_admin().await;
    let news_id = news::submit_news(&engine, &mut admin, "Ask: favorite pager?", "", "less or more?")
        .await
        .unwrap();
    let item = news::get_news_by_id(&engine, &admin, news_id)
        .await
        .unwrap()
        .unwrap();
    assert!(item.is_text_post());
    assert_eq!(item.domain(), None);
    assert_eq!(item.text(), Some("less or more?"));
}

#[tokio::test]
async fn rejects_malformed_submissions() {
    let (engine, mut admin) = engine_with_admin().await;
    let err = news::submit_news(&engine, &mut admin, "", "https://example.org", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = news::submit_news(&engine, &mut admin, "No content", "", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = news::submit_news(&engine, &mut admin, "Bad scheme", "ftp://example.org", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn reposted_url_returns_the_original_id() {
    let (engine, _admin) = engine_with_admin().await;
    let mut first = login_new_user(&engine, "alice", "10.2.0.1").await;
    let mut second = login_new_user(&engine, "bob", "10.2.0.2").await;

    let original = news::submit_news(&engine, &mut first, "A story", "https://example.org/dup", "")
        .await
        .unwrap();
    let reposted = news::submit_news(&engine, &mut second, "Same link", "https://example.org/dup", "")
        .await
        .unwrap();
    assert_eq!(reposted, original);
    // no second item was allocated
    assert_eq!(engine.store.zcard("news.cron").await.unwrap(), 1);
}

#[tokio::test]
async fn submission_cooldown_applies_to_regular_users_only() {
    let (engine, mut admin) = engine_with_admin().await;
    let mut user = login_new_user(&engine, "alice", "10.2.0.3").await;

    news::submit_news(&engine, &mut user, "First", "https://example.org/1", "")
        .await
        .unwrap();
    let err = news::submit_news(&engine, &mut user, "Second", "https://example.org/2", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited));
    assert!(news::allowed_to_post_in_seconds(&engine, &user).await.unwrap() > 0);

    // admins are exempt
    news::submit_news(&engine, &mut admin, "One", "https://example.org/3", "")
        .await
        .unwrap();
    news::submit_news(&engine, &mut admin, "Two", "https://example.org/4", "")
        .await
        .unwrap();
    assert_eq!(news::allowed_to_post_in_seconds(&engine, &admin).await.unwrap(), 0);
}

#[tokio::test]
async fn edit_window_is_enforced() {
    let (engine, _admin) = engine_with_admin().await;
    let mut author = login_new_user(&engine, "alice", "10.2.0.4").await;
    let news_id = news::submit_news(&engine, &mut author, "Title", "https://example.org/w", "")
        .await
        .unwrap();

    news::edit_news(&engine, &author, news_id, "Better title", "https://example.org/w", "")
        .await
        .unwrap();
    let item = news::get_news_by_id(&engine, &author, news_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.title, "Better title");

    // window elapsed: author can no longer touch it
    let mut late = author.clone();
    late.now = T0 + engine.config.news_edit_time;
    let err = news::edit_news(&engine, &late, news_id, "Too late", "https://example.org/w", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied));
    let err = news::del_news(&engine, &late, news_id).await.unwrap_err();
    assert!(matches!(err, Error::PermissionDenied));

    // another regular user never could
    let other = login_new_user(&engine, "mallory", "10.2.0.5").await;
    let err = news::edit_news(&engine, &other, news_id, "Hijack", "https://example.org/w", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied));
}

#[tokio::test]
async fn admins_bypass_the_edit_window() {
    let (engine, admin) = engine_with_admin().await;
    let mut author = login_new_user(&engine, "alice", "10.2.0.6").await;
    let news_id = news::submit_news(&engine, &mut author, "Title", "https://example.org/x", "")
        .await
        .unwrap();

    let mut late_admin = admin.clone();
    late_admin.now = T0 + engine.config.news_edit_time * 10;
    news::edit_news(
        &engine,
        &late_admin,
        news_id,
        "Moderated title",
        "https://example.org/x",
        "",
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn editing_to_a_guarded_url_fails() {
    let (engine, _admin) = engine_with_admin().await;
    let mut first = login_new_user(&engine, "alice", "10.2.0.7").await;
    let mut second = login_new_user(&engine, "bob", "10.2.0.8").await;

    news::submit_news(&engine, &mut first, "Taken", "https://example.org/taken", "")
        .await
        .unwrap();
    let mine = news::submit_news(&engine, &mut second, "Mine", "https://example.org/mine", "")
        .await
        .unwrap();

    let err = news::edit_news(&engine, &second, mine, "Mine", "https://example.org/taken", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists("url")));
}

#[tokio::test]
async fn soft_delete_evicts_from_both_orderings() {
    let (engine, mut admin) = engine_with_admin().await;
    let keep = news::submit_news(&engine, &mut admin, "Keep", "https://example.org/keep", "")
        .await
        .unwrap();
    let drop = news::submit_news(&engine, &mut admin, "Drop", "https://example.org/drop", "")
        .await
        .unwrap();

    news::del_news(&engine, &admin, drop).await.unwrap();

    let (top, total) = news::get_top_news(&engine, &admin, 0, 10).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(top.iter().map(|n| n.id).collect::<Vec<_>>(), vec![keep]);
    let (latest, _) = news::get_latest_news(&engine, &admin, 0, 10).await.unwrap();
    assert!(latest.iter().all(|n| n.id != drop));

    // the record survives, flagged
    let item = news::get_news_by_id(&engine, &admin, drop)
        .await
        .unwrap()
        .unwrap();
    assert!(item.del);
}

#[tokio::test]
async fn stale_ranks_are_repaired_on_read() {
    let (engine, mut admin) = engine_with_admin().await;
    let news_id = news::submit_news(&engine, &mut admin, "Ages", "https://example.org/age", "")
        .await
        .unwrap();

    // six hours later the stored rank (computed at submit time) is stale
    let later = Context::anonymous("127.0.0.1", T0 + 6 * 3600);
    let (top, _) = news::get_top_news(&engine, &later, 0, 10).await.unwrap();
    let expected = ranking::compute_rank(&engine.config, top[0].score, 6 * 3600);
    assert!((top[0].rank - expected).abs() <= ranking::RANK_EPSILON);

    // both the record and the ordering were rewritten
    let stored: f64 = engine
        .store
        .hget(&format!("news:{}", news_id), "rank")
        .await
        .unwrap()
        .unwrap()
        .parse()
        .unwrap();
    assert!((stored - expected).abs() <= ranking::RANK_EPSILON);
    let indexed = engine
        .store
        .zscore("news.top", &news_id.to_string())
        .await
        .unwrap()
        .unwrap();
    assert!((indexed - expected).abs() <= ranking::RANK_EPSILON);
}

#[tokio::test]
async fn top_page_orders_by_post_repair_rank() {
    let (engine, mut admin) = engine_with_admin().await;
    let quiet = news::submit_news(&engine, &mut admin, "Quiet", "https://example.org/q", "")
        .await
        .unwrap();
    let popular = news::submit_news(&engine, &mut admin, "Popular", "https://example.org/p", "")
        .await
        .unwrap();

    for (name, addr) in [("u1", "10.2.1.1"), ("u2", "10.2.1.2"), ("u3", "10.2.1.3")] {
        let mut voter = login_new_user(&engine, name, addr).await;
        newsrank::vote::vote_news(&engine, &mut voter, popular, VoteDirection::Up)
            .await
            .unwrap();
    }

    let (top, _) = news::get_top_news(&engine, &admin, 0, 10).await.unwrap();
    assert_eq!(
        top.iter().map(|n| n.id).collect::<Vec<_>>(),
        vec![popular, quiet]
    );
}

#[tokio::test]
async fn latest_feed_is_chronological() {
    let (engine, admin) = engine_with_admin().await;
    let mut ids = Vec::new();
    for i in 0..3 {
        let mut ctx = admin.clone();
        ctx.now = T0 + i * 60;
        ids.push(
            news::submit_news(
                &engine,
                &mut ctx,
                &format!("Story {}", i),
                &format!("https://example.org/s{}", i),
                "",
            )
            .await
            .unwrap(),
        );
    }
    let (latest, total) = news::get_latest_news(&engine, &admin, 0, 10).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(
        latest.iter().map(|n| n.id).collect::<Vec<_>>(),
        vec![ids[2], ids[1], ids[0]]
    );
}

#[tokio::test]
async fn pagination_over_a_real_feed() {
    let (engine, admin) = engine_with_admin().await;
    for i in 0..5 {
        let mut ctx = admin.clone();
        ctx.now = T0 + i * 60;
        news::submit_news(
            &engine,
            &mut ctx,
            &format!("Story {}", i),
            &format!("https://example.org/pg{}", i),
            "",
        )
        .await
        .unwrap();
    }

    let viewer = Context::anonymous("127.0.0.1", T0 + 3600);
    let page = paginate(0, 2, |start, count| {
        news::get_latest_news(&engine, &viewer, start, count)
    })
    .await
    .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 5);
    assert_eq!(page.more, Some(2));

    let page = paginate(4, 2, |start, count| {
        news::get_latest_news(&engine, &viewer, start, count)
    })
    .await
    .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.more, None);
}

#[tokio::test]
async fn recompute_is_admin_only() {
    let (engine, mut admin) = engine_with_admin().await;
    news::submit_news(&engine, &mut admin, "A", "https://example.org/r1", "")
        .await
        .unwrap();
    news::submit_news(&engine, &mut admin, "B", "https://example.org/r2", "")
        .await
        .unwrap();

    let user = login_new_user(&engine, "alice", "10.2.2.1").await;
    let err = ranking::recompute_all(&engine, &user).await.unwrap_err();
    assert!(matches!(err, Error::PermissionDenied));

    let mut later = admin.clone();
    later.now = T0 + 3600;
    assert_eq!(ranking::recompute_all(&engine, &later).await.unwrap(), 2);
}

#[tokio::test]
async fn posted_feed_and_stats() {
    let (engine, mut admin) = engine_with_admin().await;
    let id = news::submit_news(&engine, &mut admin, "Mine", "https://example.org/st", "")
        .await
        .unwrap();
    let admin_id = admin.user.as_ref().unwrap().id;
    let (posted, total) = news::get_posted_news(&engine, &admin, admin_id, 0, 10)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(posted[0].id, id);

    let stats = news::site_stats(&engine).await.unwrap();
    assert_eq!(stats.users, 1);
    assert_eq!(stats.news, 1);

    assert!(news::get_random_news(&engine, &admin).await.unwrap().is_some());
}
