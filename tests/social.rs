//! Follow edge tests
//!
//! Covers idempotent follow/unfollow and the self-follow guard.

mod common;

use axum::http::StatusCode;
use common::app;

#[tokio::test]
async fn follow_redirects_home() {
    let app = app().await;
    let user = app.create_user("soc_follow_a").await;
    let author = app.create_user("soc_follow_b").await;

    let resp = app
        .post_empty(&format!("/{}/follow", author.username), Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), "/");
    assert_eq!(app.follow_edge_count(user.id, author.id).await, 1);
}

#[tokio::test]
async fn follow_twice_keeps_one_edge() {
    let app = app().await;
    let user = app.create_user("soc_dup_a").await;
    let author = app.create_user("soc_dup_b").await;

    for _ in 0..2 {
        let resp = app
            .post_empty(&format!("/{}/follow", author.username), Some(&user.token))
            .await;
        // Get-or-create: the repeat is not an error.
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
    }

    assert_eq!(app.follow_edge_count(user.id, author.id).await, 1);
}

#[tokio::test]
async fn follow_self_creates_no_edge() {
    let app = app().await;
    let user = app.create_user("soc_self").await;

    let resp = app
        .post_empty(&format!("/{}/follow", user.username), Some(&user.token))
        .await;

    // Redirected to the own profile, not home.
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), format!("/{}", user.username));
    assert_eq!(app.follow_edge_count(user.id, user.id).await, 0);
}

#[tokio::test]
async fn unfollow_removes_edge() {
    let app = app().await;
    let user = app.create_user("soc_unfollow_a").await;
    let author = app.create_user("soc_unfollow_b").await;

    app.post_empty(&format!("/{}/follow", author.username), Some(&user.token))
        .await;
    assert_eq!(app.follow_edge_count(user.id, author.id).await, 1);

    let resp = app
        .post_empty(&format!("/{}/unfollow", author.username), Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), "/");
    assert_eq!(app.follow_edge_count(user.id, author.id).await, 0);
}

#[tokio::test]
async fn unfollow_absent_edge_is_noop() {
    let app = app().await;
    let user = app.create_user("soc_absent_a").await;
    let author = app.create_user("soc_absent_b").await;

    let resp = app
        .post_empty(&format!("/{}/unfollow", author.username), Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(app.follow_edge_count(user.id, author.id).await, 0);
}

#[tokio::test]
async fn unfollow_self_redirects_to_profile() {
    let app = app().await;
    let user = app.create_user("soc_unself").await;

    let resp = app
        .post_empty(&format!("/{}/unfollow", user.username), Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), format!("/{}", user.username));
}

#[tokio::test]
async fn follow_unknown_user_is_404() {
    let app = app().await;
    let user = app.create_user("soc_ghost").await;

    let resp = app
        .post_empty("/no_such_author/follow", Some(&user.token))
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn follow_anonymous_redirects_to_login() {
    let app = app().await;
    let author = app.create_user("soc_anon_target").await;

    let resp = app
        .post_empty(&format!("/{}/follow", author.username), None)
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert!(resp.location().starts_with("/auth/login?next="));
}
