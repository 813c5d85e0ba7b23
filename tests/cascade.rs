//! Deletion policy tests
//!
//! Group deletion nulls the group reference on posts; user deletion
//! cascades posts, comments, follow edges, and sessions.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;

// ===========================================================================
// Group administration
// ===========================================================================

#[tokio::test]
async fn create_group_with_admin_token() {
    let app = app().await;

    let resp = app
        .post_admin(
            "/groups",
            json!({
                "title": "Cooking",
                "slug": "cascade-cooking",
                "description": "recipes and such"
            }),
            Some(app.admin_token()),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["slug"].as_str().unwrap(), "cascade-cooking");
    assert_eq!(body["title"].as_str().unwrap(), "Cooking");
}

#[tokio::test]
async fn create_group_duplicate_slug() {
    let app = app().await;
    let (_, slug) = app.create_group("cascade-dup").await;

    let resp = app
        .post_admin(
            "/groups",
            json!({ "title": "Again", "slug": slug, "description": "x" }),
            Some(app.admin_token()),
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.field_error("slug"), "slug is already taken");
}

#[tokio::test]
async fn create_group_requires_admin_token() {
    let app = app().await;

    let resp = app
        .post_admin(
            "/groups",
            json!({ "title": "Nope", "slug": "cascade-nope", "description": "x" }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post_admin(
            "/groups",
            json!({ "title": "Nope", "slug": "cascade-nope", "description": "x" }),
            Some("wrong-token"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

// ===========================================================================
// Deletion policies
// ===========================================================================

#[tokio::test]
async fn deleting_group_nulls_post_reference() {
    let app = app().await;
    let user = app.create_user("cascade_groupdel").await;
    let (group_id, slug) = app.create_group("cascade-del").await;
    let post_id = app.create_post_for_user(user.id, Some(group_id)).await;

    let resp = app
        .delete_admin(&format!("/groups/{}", slug), Some(app.admin_token()))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    // The post survives with its group reference nulled.
    let resp = app
        .get(&format!("/{}/{}", user.username, post_id), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert!(body["post"].get("group_slug").is_none());
    assert!(body["post"].get("group_id").is_none());
}

#[tokio::test]
async fn deleting_unknown_group_is_404() {
    let app = app().await;

    let resp = app
        .delete_admin("/groups/cascade-ghost", Some(app.admin_token()))
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_user_cascades_posts_and_comments() {
    let app = app().await;
    let doomed = app.create_user("cascade_doomed").await;
    let bystander = app.create_user("cascade_bystander").await;

    let doomed_post = app.create_post_for_user(doomed.id, None).await;
    let bystander_post = app.create_post_for_user(bystander.id, None).await;

    // The doomed user comments on the bystander's post.
    app.post_json(
        &format!("/{}/{}/comment", bystander.username, bystander_post),
        json!({ "text": "soon gone" }),
        Some(&doomed.token),
    )
    .await;
    // And the bystander follows the doomed user.
    app.post_empty(
        &format!("/{}/follow", doomed.username),
        Some(&bystander.token),
    )
    .await;

    let resp = app.delete("/account", Some(&doomed.token)).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    // Profile, posts, comments, and follow edges are all gone.
    let resp = app.get(&format!("/{}", doomed.username), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .get(&format!("/{}/{}", doomed.username, doomed_post), None)
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .get(&format!("/{}/{}", bystander.username, bystander_post), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["comments"].as_array().unwrap().len(), 0);

    assert_eq!(app.follow_edge_count(bystander.id, doomed.id).await, 0);
}

#[tokio::test]
async fn delete_account_anonymous_redirects_to_login() {
    let app = app().await;

    let resp = app.delete("/account", None).await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert!(resp.location().starts_with("/auth/login?next="));
}
