use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderName, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use subtle::ConstantTimeEq;

use crate::app::auth::AuthService;
use crate::http::AppError;
use crate::AppState;

/// Requester identity where authentication is required. Anonymous requests
/// are not rejected with an error status; they are redirected to the login
/// entry point carrying the original path as a return parameter.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub username: String,
}

/// Requester identity on pages that render for anonymous visitors too.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[derive(Debug, Clone)]
pub struct AdminToken;

const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

#[derive(Debug)]
pub enum AuthRejection {
    LoginRedirect(String),
    Failed(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::LoginRedirect(path) => Redirect::to(&path).into_response(),
            Self::Failed(err) => err.into_response(),
        }
    }
}

/// `/auth/login?next=<original path>` so the client can resume after login.
fn login_redirect(uri: &Uri) -> AuthRejection {
    let next = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    AuthRejection::LoginRedirect(format!("/auth/login?next={}", encoded))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts) {
            Some(token) => token.to_owned(),
            None => return Err(login_redirect(&parts.uri)),
        };

        let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
        let session = service
            .authenticate(&token)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to authenticate session");
                AuthRejection::Failed(AppError::internal("failed to authenticate"))
            })?;

        match session {
            Some(session) => Ok(AuthUser {
                user_id: session.user_id,
                username: session.username,
            }),
            None => Err(login_redirect(&parts.uri)),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts) {
            Some(token) => token.to_owned(),
            None => return Ok(MaybeAuthUser(None)),
        };

        let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
        let session = service.authenticate(&token).await.map_err(|err| {
            tracing::error!(error = ?err, "failed to authenticate session");
            AppError::internal("failed to authenticate")
        })?;

        Ok(MaybeAuthUser(session.map(|session| AuthUser {
            user_id: session.user_id,
            username: session.username,
        })))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .admin_token
            .as_ref()
            .ok_or_else(|| AppError::forbidden("admin token not configured"))?;

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::forbidden("missing admin token"))?;

        if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(AppError::forbidden("invalid admin token"));
        }

        Ok(AdminToken)
    }
}
