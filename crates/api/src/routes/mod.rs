//! HTTP routes

pub mod admin;
pub mod notification;
pub mod subscription;

use axum::{
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::{auth::optional_auth, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    Router::new()
        .route("/health", get(health))
        .route(
            "/dashboard/subscription/{kind}/",
            get(subscription::subscribe),
        )
        .route(
            "/subscription/notification/",
            post(notification::notification),
        )
        .route("/admin/subscriptions", get(admin::list_subscriptions))
        .layer(middleware::from_fn_with_state(auth_state, optional_auth))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// `302 Found` redirect
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Redirect to `base` carrying the current path in `next`
pub(crate) fn redirect_with_next(base: &str, next: &str) -> Response {
    found(&format!("{}?next={}", base, next))
}
