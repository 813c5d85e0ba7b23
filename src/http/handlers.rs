use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::comments::CommentService;
use crate::app::feed::{FeedPage, FeedService};
use crate::app::groups::GroupService;
use crate::app::posts::PostService;
use crate::app::social::SocialService;
use crate::app::users::UserService;
use crate::domain::comment::Comment;
use crate::domain::group::Group;
use crate::domain::post::Post;
use crate::domain::user::User;
use crate::http::forms::{CommentForm, GroupForm, PostForm, SignupForm};
use crate::http::{AdminToken, AppError, AuthUser, FieldErrors, MaybeAuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

/// `?page=` query parameter. A value that is not an integer counts as
/// absent and lands on the first page, like the page links themselves.
#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

fn lenient_page<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.parse().ok()))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

pub async fn signup(
    State(state): State<AppState>,
    Json(form): Json<SignupForm>,
) -> Result<Json<User>, AppError> {
    form.validate().map_err(AppError::validation)?;

    let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
    let user = service
        .signup(form.username.trim().to_owned(), form.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to sign up");
            AppError::internal("failed to sign up")
        })?;

    match user {
        Some(user) => Ok(Json(user)),
        None => {
            let mut fields = FieldErrors::new();
            fields.insert("username", "username is already taken".to_string());
            Err(AppError::validation(fields))
        }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Deserialize)]
pub struct LoginPageQuery {
    pub next: Option<String>,
}

#[derive(Serialize)]
pub struct LoginPageResponse {
    /// Where to POST credentials.
    pub action: &'static str,
    /// Path to return to after a successful login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// The login entry point the auth redirects land on. Describes the login
/// contract so following the `Location` with GET answers 200.
pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Json<LoginPageResponse> {
    Json(LoginPageResponse {
        action: "/auth/login",
        next: query.next,
    })
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("username and password are required"));
    }

    let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
    let session = service
        .login(&payload.username, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match session {
        Some(session) => Ok(Json(SessionResponse {
            token: session.token,
            expires_at: session.expires_at,
        })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

pub async fn logout(
    auth: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

    let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
    service.revoke_session(token).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to logout");
        AppError::internal("failed to logout")
    })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_account(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = UserService::new(state.db.clone());
    let deleted = service.delete_account(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to delete account");
        AppError::internal("failed to delete account")
    })?;

    if !deleted {
        return Err(AppError::not_found("user not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Groups (administrative)
// ---------------------------------------------------------------------------

pub async fn create_group(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(form): Json<GroupForm>,
) -> Result<Json<Group>, AppError> {
    form.validate().map_err(AppError::validation)?;

    let service = GroupService::new(state.db.clone());
    let group = service
        .create(
            form.title.trim().to_owned(),
            form.slug.trim().to_owned(),
            form.description,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create group");
            AppError::internal("failed to create group")
        })?;

    match group {
        Some(group) => Ok(Json(group)),
        None => {
            let mut fields = FieldErrors::new();
            fields.insert("slug", "slug is already taken".to_string());
            Err(AppError::validation(fields))
        }
    }
}

pub async fn delete_group(
    _admin: AdminToken,
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = GroupService::new(state.db.clone());
    let deleted = service.delete_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to delete group");
        AppError::internal("failed to delete group")
    })?;

    if !deleted {
        return Err(AppError::not_found("group not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Feeds
// ---------------------------------------------------------------------------

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedPage>, AppError> {
    let service = FeedService::new(state.db.clone(), state.cache.clone());
    let feed = service
        .home(query.page, state.posts_limit, state.index_cache_ttl_seconds)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to assemble home feed");
            AppError::internal("failed to assemble home feed")
        })?;

    Ok(Json(feed))
}

#[derive(Serialize)]
pub struct GroupFeedResponse {
    pub group: Group,
    #[serde(flatten)]
    pub feed: FeedPage,
}

pub async fn group_feed(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<GroupFeedResponse>, AppError> {
    let groups = GroupService::new(state.db.clone());
    let group = groups.get_by_slug(&slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to fetch group");
        AppError::internal("failed to fetch group")
    })?;
    let group = group.ok_or_else(|| AppError::not_found("group not found"))?;

    let service = FeedService::new(state.db.clone(), state.cache.clone());
    let feed = service
        .group(group.id, query.page, state.posts_limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to assemble group feed");
            AppError::internal("failed to assemble group feed")
        })?;

    Ok(Json(GroupFeedResponse { group, feed }))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub author: User,
    /// Whether the current requester follows this author. Always false for
    /// anonymous requesters and for the author's own profile.
    pub following: bool,
    #[serde(flatten)]
    pub feed: FeedPage,
}

pub async fn profile(
    Path(username): Path<String>,
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let users = UserService::new(state.db.clone());
    let author = users.get_by_username(&username).await.map_err(|err| {
        tracing::error!(error = ?err, username = %username, "failed to fetch user");
        AppError::internal("failed to fetch user")
    })?;
    let author = author.ok_or_else(|| AppError::not_found("user not found"))?;

    let following = match &auth.0 {
        Some(requester) if requester.user_id != author.id => {
            SocialService::new(state.db.clone())
                .is_following(requester.user_id, author.id)
                .await
                .map_err(|err| {
                    tracing::error!(error = ?err, "failed to check follow status");
                    AppError::internal("failed to check follow status")
                })?
        }
        _ => false,
    };

    let service = FeedService::new(state.db.clone(), state.cache.clone());
    let feed = service
        .profile(author.id, query.page, state.posts_limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username = %username, "failed to assemble profile feed");
            AppError::internal("failed to assemble profile feed")
        })?;

    Ok(Json(ProfileResponse {
        author,
        following,
        feed,
    }))
}

pub async fn follow_feed(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedPage>, AppError> {
    let service = FeedService::new(state.db.clone(), state.cache.clone());
    let feed = service
        .following(auth.user_id, query.page, state.posts_limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to assemble follow feed");
            AppError::internal("failed to assemble follow feed")
        })?;

    Ok(Json(feed))
}

// ---------------------------------------------------------------------------
// Posts and comments
// ---------------------------------------------------------------------------

/// Resolves the optional group slug of a post form. An unknown slug is a
/// field error, not a 404: the submission form is the thing being rejected.
async fn resolve_group_field(
    state: &AppState,
    slug: Option<&str>,
) -> Result<Option<Uuid>, AppError> {
    let Some(slug) = slug else {
        return Ok(None);
    };

    let service = GroupService::new(state.db.clone());
    let group = service.get_by_slug(slug).await.map_err(|err| {
        tracing::error!(error = ?err, slug = %slug, "failed to resolve group");
        AppError::internal("failed to resolve group")
    })?;

    match group {
        Some(group) => Ok(Some(group.id)),
        None => {
            let mut fields = FieldErrors::new();
            fields.insert("group", "unknown group".to_string());
            Err(AppError::validation(fields))
        }
    }
}

pub async fn new_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(form): Json<PostForm>,
) -> Result<Redirect, AppError> {
    form.validate().map_err(AppError::validation)?;
    let group_id = resolve_group_field(&state, form.group.as_deref()).await?;

    let service = PostService::new(state.db.clone());
    service
        .create(auth.user_id, form.text, group_id, form.image)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    Ok(Redirect::to("/"))
}

#[derive(Serialize)]
pub struct PostViewResponse {
    pub post: Post,
    pub comments: Vec<Comment>,
}

pub async fn post_view(
    Path((username, post_id)): Path<(String, i64)>,
    State(state): State<AppState>,
) -> Result<Json<PostViewResponse>, AppError> {
    let posts = PostService::new(state.db.clone());
    let post = posts.get(&username, post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;
    let post = post.ok_or_else(|| AppError::not_found("post not found"))?;

    let comments = CommentService::new(state.db.clone())
        .list_for_post(post.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id, "failed to fetch comments");
            AppError::internal("failed to fetch comments")
        })?;

    Ok(Json(PostViewResponse { post, comments }))
}

pub async fn edit_post(
    auth: AuthUser,
    Path((username, post_id)): Path<(String, i64)>,
    State(state): State<AppState>,
    Json(form): Json<PostForm>,
) -> Result<Redirect, AppError> {
    let service = PostService::new(state.db.clone());
    let post = service.get(&username, post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;
    let post = post.ok_or_else(|| AppError::not_found("post not found"))?;

    // Not the author: silent no-op, back to the read view.
    if post.author_id != auth.user_id {
        return Ok(Redirect::to(&format!("/{}/{}", username, post_id)));
    }

    form.validate().map_err(AppError::validation)?;
    let group_id = resolve_group_field(&state, form.group.as_deref()).await?;

    service
        .update(post.id, form.text, group_id, form.image)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id, "failed to update post");
            AppError::internal("failed to update post")
        })?;

    Ok(Redirect::to(&format!("/{}/{}", username, post_id)))
}

pub async fn add_comment(
    auth: AuthUser,
    Path((username, post_id)): Path<(String, i64)>,
    State(state): State<AppState>,
    Json(form): Json<CommentForm>,
) -> Result<Redirect, AppError> {
    let posts = PostService::new(state.db.clone());
    let post = posts.get(&username, post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;
    let post = post.ok_or_else(|| AppError::not_found("post not found"))?;

    form.validate().map_err(AppError::validation)?;

    CommentService::new(state.db.clone())
        .add(post.id, auth.user_id, form.text)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id, "failed to add comment");
            AppError::internal("failed to add comment")
        })?;

    Ok(Redirect::to(&format!("/{}/{}", username, post_id)))
}

// ---------------------------------------------------------------------------
// Follow edges
// ---------------------------------------------------------------------------

pub async fn follow_author(
    auth: AuthUser,
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    let users = UserService::new(state.db.clone());
    let author = users.get_by_username(&username).await.map_err(|err| {
        tracing::error!(error = ?err, username = %username, "failed to fetch user");
        AppError::internal("failed to fetch user")
    })?;
    let author = author.ok_or_else(|| AppError::not_found("user not found"))?;

    // Following yourself is a no-op; go look at your own profile instead.
    if author.id == auth.user_id {
        return Ok(Redirect::to(&format!("/{}", username)));
    }

    SocialService::new(state.db.clone())
        .follow(auth.user_id, author.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to follow");
            AppError::internal("failed to follow")
        })?;

    Ok(Redirect::to("/"))
}

pub async fn unfollow_author(
    auth: AuthUser,
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    let users = UserService::new(state.db.clone());
    let author = users.get_by_username(&username).await.map_err(|err| {
        tracing::error!(error = ?err, username = %username, "failed to fetch user");
        AppError::internal("failed to fetch user")
    })?;
    let author = author.ok_or_else(|| AppError::not_found("user not found"))?;

    if author.id == auth.user_id {
        return Ok(Redirect::to(&format!("/{}", username)));
    }

    SocialService::new(state.db.clone())
        .unfollow(auth.user_id, author.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to unfollow");
            AppError::internal("failed to unfollow")
        })?;

    Ok(Redirect::to("/"))
}
