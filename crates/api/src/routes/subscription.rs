//! Subscription checkout route

use axum::{
    extract::{Path, State},
    http::Uri,
    response::Response,
};
use confreg_billing::SubscriptionType;

use super::{found, redirect_with_next};
use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Subscribe the signed-in user to a track and send them to the gateway checkout
pub async fn subscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(kind): Path<String>,
    uri: Uri,
) -> ApiResult<Response> {
    let kind: SubscriptionType = kind.parse().map_err(|_| ApiError::NotFound)?;
    let path = uri.path();

    let Some(user) = user else {
        tracing::debug!(path = %path, "Anonymous subscription attempt, redirecting to login");
        return Ok(redirect_with_next(&state.config.login_url, path));
    };

    let profile = state.profiles.profile(user.user_id).await?;
    let Some(category) = profile
        .as_ref()
        .filter(|p| p.is_complete())
        .and_then(|p| p.category)
    else {
        tracing::info!(
            user_id = %user.user_id,
            has_profile = profile.is_some(),
            "Incomplete profile, redirecting to profile editor"
        );
        return Ok(redirect_with_next(&state.config.edit_profile_url, path));
    };

    match state
        .billing
        .checkout
        .start(user.user_id, kind, category)
        .await
    {
        Ok(started) => Ok(found(&started.checkout_url)),
        Err(e) if e.is_gateway_failure() => {
            tracing::error!(
                user_id = %user.user_id,
                kind = %kind,
                error = %e,
                "Could not open gateway checkout"
            );
            state.staff_notifier.subscription_failed(&user, kind).await;
            Ok(found(&state.config.dashboard_url))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::{header, StatusCode};
    use confreg_billing::{Category, SubscriptionStore, TransactionStatus};
    use rust_decimal::Decimal;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::profiles::AccountProfile;

    fn profile(name: &str, category: Option<Category>) -> AccountProfile {
        AccountProfile {
            user_id: Uuid::new_v4(),
            username: "Wolverine".to_string(),
            email: "logan@xavier.edu".to_string(),
            name: name.to_string(),
            category,
        }
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    fn succeeding() -> StubGateway {
        StubGateway {
            code: Some("xpto123".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_redirects_to_gateway_checkout() {
        let app = TestApp::new(succeeding());
        let logan = profile("Logan", Some(Category::Student));
        let user_id = logan.user_id;
        let token = app.user(logan, false).await;

        let response = app
            .router
            .clone()
            .oneshot(get("/dashboard/subscription/talk/", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), format!("{CHECKOUT}xpto123"));

        let records = app.store.list_subscriptions().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subscription.user_id, user_id);
        let transaction = &records[0].transactions[0];
        assert_eq!(transaction.price, Decimal::from(150));
        assert_eq!(transaction.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_price_uses_profile_category() {
        let app = TestApp::new(succeeding());
        let token = app
            .user(profile("Charles", Some(Category::Corporate)), false)
            .await;

        app.router
            .clone()
            .oneshot(get("/dashboard/subscription/tutorial/", Some(&token)))
            .await
            .unwrap();

        let records = app.store.list_subscriptions().await.unwrap();
        assert_eq!(records[0].transactions[0].price, Decimal::from(350));
    }

    #[tokio::test]
    async fn test_anonymous_user_redirected_to_login() {
        let app = TestApp::new(succeeding());

        let response = app
            .router
            .clone()
            .oneshot(get("/dashboard/subscription/talk/", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(location(&response).starts_with("/accounts/login/"));
        assert_eq!(
            location(&response),
            "/accounts/login/?next=/dashboard/subscription/talk/"
        );
        assert!(app.store.list_subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_session_treated_as_anonymous() {
        let app = TestApp::new(succeeding());

        let response = app
            .router
            .clone()
            .oneshot(get("/dashboard/subscription/talk/", Some("not-a-jwt")))
            .await
            .unwrap();

        assert!(location(&response).starts_with("/accounts/login/"));
    }

    #[tokio::test]
    async fn test_user_without_profile_redirected_to_profile_editor() {
        let app = TestApp::new(succeeding());
        let token = app.token_without_profile(Uuid::new_v4());

        let response = app
            .router
            .clone()
            .oneshot(get("/dashboard/subscription/talk/", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            location(&response),
            "/dashboard/profile/?next=/dashboard/subscription/talk/"
        );
    }

    #[tokio::test]
    async fn test_profile_without_name_redirected_to_profile_editor() {
        let app = TestApp::new(succeeding());
        let token = app.user(profile("", Some(Category::Student)), false).await;

        let response = app
            .router
            .clone()
            .oneshot(get("/dashboard/subscription/tutorial/", Some(&token)))
            .await
            .unwrap();

        assert_eq!(
            location(&response),
            "/dashboard/profile/?next=/dashboard/subscription/tutorial/"
        );
        assert!(app.store.list_subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_notifies_staff_and_redirects_to_dashboard() {
        let app = TestApp::new(StubGateway::default());
        let logan = profile("Logan", Some(Category::Individual));
        let user_id = logan.user_id;
        let token = app.user(logan, false).await;

        let response = app
            .router
            .clone()
            .oneshot(get("/dashboard/subscription/talk/", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/dashboard/");
        assert!(app.store.list_subscriptions().await.unwrap().is_empty());

        let notified = app.notifier.notified.lock().await;
        assert_eq!(notified.len(), 1);
        assert_eq!(notified[0].0, user_id);
    }

    #[tokio::test]
    async fn test_unknown_subscription_type_is_not_found() {
        let app = TestApp::new(succeeding());
        let token = app
            .user(profile("Logan", Some(Category::Student)), false)
            .await;

        let response = app
            .router
            .clone()
            .oneshot(get("/dashboard/subscription/keynote/", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
