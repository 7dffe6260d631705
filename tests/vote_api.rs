mod common;

use common::helpers::{engine_with_admin, login_new_user, set_karma, stored_karma};
use newsrank::{news, vote, Config, Error, Store, VoteDirection};

#[tokio::test]
async fn second_vote_is_rejected_and_changes_nothing() {
    let (engine, mut admin) = engine_with_admin().await;
    let news_id = news::submit_news(&engine, &mut admin, "A story", "https://example.org/a", "")
        .await
        .unwrap();

    let mut voter = login_new_user(&engine, "alice", "10.1.0.1").await;
    vote::vote_news(&engine, &mut voter, news_id, VoteDirection::Up)
        .await
        .unwrap();

    let before = news::get_news_by_id(&engine, &voter, news_id)
        .await
        .unwrap()
        .unwrap();
    let karma_before = stored_karma(&engine, voter.user.as_ref().unwrap().id).await;

    // a second cast in either direction is a duplicate
    let err = vote::vote_news(&engine, &mut voter, news_id, VoteDirection::Up)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateVote));
    let err = vote::vote_news(&engine, &mut voter, news_id, VoteDirection::Down)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateVote));

    let after = news::get_news_by_id(&engine, &voter, news_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.up, before.up);
    assert_eq!(after.down, before.down);
    assert_eq!(
        stored_karma(&engine, voter.user.as_ref().unwrap().id).await,
        karma_before
    );
}

#[tokio::test]
async fn upvote_moves_karma_between_voter_and_author() {
    let (engine, mut admin) = engine_with_admin().await;
    let news_id = news::submit_news(&engine, &mut admin, "A story", "https://example.org/b", "")
        .await
        .unwrap();
    let author_id = admin.user.as_ref().unwrap().id;
    let author_karma = stored_karma(&engine, author_id).await;

    let mut voter = login_new_user(&engine, "alice", "10.1.0.2").await;
    set_karma(&engine, &mut voter, 5).await;
    vote::vote_news(&engine, &mut voter, news_id, VoteDirection::Up)
        .await
        .unwrap();

    let config = Config::default();
    // context mirror and stored value both see the debit
    assert_eq!(
        voter.user.as_ref().unwrap().karma,
        5 - config.upvote_karma_cost
    );
    assert_eq!(
        stored_karma(&engine, voter.user.as_ref().unwrap().id).await,
        5 - config.upvote_karma_cost
    );
    assert_eq!(
        stored_karma(&engine, author_id).await,
        author_karma + config.upvote_karma_transfer
    );
}

#[tokio::test]
async fn downvote_debits_without_transfer() {
    let (engine, mut admin) = engine_with_admin().await;
    let news_id = news::submit_news(&engine, &mut admin, "A story", "https://example.org/c", "")
        .await
        .unwrap();
    let author_id = admin.user.as_ref().unwrap().id;
    let author_karma = stored_karma(&engine, author_id).await;

    let mut voter = login_new_user(&engine, "alice", "10.1.0.3").await;
    set_karma(&engine, &mut voter, 29).await;
    let err = vote::vote_news(&engine, &mut voter, news_id, VoteDirection::Down)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientKarma));

    set_karma(&engine, &mut voter, 30).await;
    vote::vote_news(&engine, &mut voter, news_id, VoteDirection::Down)
        .await
        .unwrap();
    let config = Config::default();
    assert_eq!(
        voter.user.as_ref().unwrap().karma,
        30 - config.downvote_karma_cost
    );
    // no transfer happens on a downvote
    assert_eq!(stored_karma(&engine, author_id).await, author_karma);
}

#[tokio::test]
async fn zero_karma_upvote_fails_closed() {
    let (engine, mut admin) = engine_with_admin().await;
    let news_id = news::submit_news(&engine, &mut admin, "A story", "https://example.org/d", "")
        .await
        .unwrap();
    let author_id = admin.user.as_ref().unwrap().id;
    let author_karma = stored_karma(&engine, author_id).await;

    let mut voter = login_new_user(&engine, "alice", "10.1.0.4").await;
    set_karma(&engine, &mut voter, 0).await;
    let err = vote::vote_news(&engine, &mut voter, news_id, VoteDirection::Up)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientKarma));

    // nothing moved: counters, karma, vote record, saved list
    let item = news::get_news_by_id(&engine, &voter, news_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.up, 1); // only the author's implicit vote
    assert_eq!(item.voted, None);
    assert_eq!(stored_karma(&engine, voter.user.as_ref().unwrap().id).await, 0);
    assert_eq!(stored_karma(&engine, author_id).await, author_karma);
    let voter_id = voter.user.as_ref().unwrap().id;
    assert_eq!(
        engine
            .store
            .zcard(&format!("user.saved:{}", voter_id))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn own_submission_needs_no_karma_and_costs_none() {
    let (engine, _admin) = engine_with_admin().await;
    let mut author = login_new_user(&engine, "alice", "10.1.0.5").await;
    set_karma(&engine, &mut author, 0).await;

    // the implicit self-upvote on submission is exempt from the karma gate
    let news_id = news::submit_news(&engine, &mut author, "Mine", "https://example.org/e", "")
        .await
        .unwrap();
    let item = news::get_news_by_id(&engine, &author, news_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.up, 1);
    assert_eq!(item.voted, Some(VoteDirection::Up));
    assert_eq!(stored_karma(&engine, author.user.as_ref().unwrap().id).await, 0);
}

#[tokio::test]
async fn upvote_lands_in_saved_list() {
    let (engine, mut admin) = engine_with_admin().await;
    let news_id = news::submit_news(&engine, &mut admin, "A story", "https://example.org/f", "")
        .await
        .unwrap();

    let mut voter = login_new_user(&engine, "alice", "10.1.0.6").await;
    vote::vote_news(&engine, &mut voter, news_id, VoteDirection::Up)
        .await
        .unwrap();

    let voter_id = voter.user.as_ref().unwrap().id;
    let (saved, total) = news::get_saved_news(&engine, &voter, voter_id, 0, 10)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(saved[0].id, news_id);
    assert_eq!(saved[0].voted, Some(VoteDirection::Up));
}
