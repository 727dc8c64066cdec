//! Authentication middleware for Axum

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::jwt::JwtManager;

/// Cookie set by the registration site after login
pub const SESSION_COOKIE: &str = "confreg_session";

/// Signed-in user extracted from the session token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
}

/// State needed for authentication
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
}

fn extract_token_from_cookie(request: &Request) -> Option<String> {
    let cookies = request.headers().get(COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|cookie| {
        cookie
            .trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .map(String::from)
    })
}

/// Bearer token from the Authorization header, falling back to the session cookie
fn extract_bearer_token(request: &Request) -> Option<String> {
    if let Some(header) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    extract_token_from_cookie(request)
}

/// Attach an `AuthUser` to the request when a valid session is present.
///
/// Requests without a session pass through untouched; each handler decides
/// how to treat anonymous users.
pub async fn optional_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_bearer_token(&request) {
        match auth_state.jwt_manager.validate(&token) {
            Ok(claims) => {
                tracing::debug!(
                    path = %request.uri().path(),
                    user_id = %claims.sub,
                    "optional_auth: session accepted"
                );
                request.extensions_mut().insert(AuthUser {
                    user_id: claims.sub,
                    username: claims.username,
                    email: claims.email,
                    is_staff: claims.is_staff,
                });
            }
            Err(err) => {
                tracing::warn!(path = %request.uri().path(), error = %err, "optional_auth: session rejected");
            }
        }
    }

    next.run(request).await
}

/// The signed-in user, if any
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(header: &str, value: &str) -> Request {
        axum::http::Request::builder()
            .uri("/")
            .header(header, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_bearer_header_preferred() {
        let request = axum::http::Request::builder()
            .uri("/")
            .header("Authorization", "Bearer from-header")
            .header("Cookie", "confreg_session=from-cookie")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_bearer_token(&request).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_cookie_fallback() {
        let request = request_with("Cookie", "csrftoken=abc; confreg_session=tok123; other=1");
        assert_eq!(extract_bearer_token(&request).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_similar_cookie_name_ignored() {
        let request = request_with("Cookie", "confreg_session_old=stale");
        assert_eq!(extract_bearer_token(&request), None);
    }

    #[test]
    fn test_no_credentials() {
        let request = request_with("Accept", "text/html");
        assert_eq!(extract_bearer_token(&request), None);
    }
}
