//! Staff-only subscription listing

use axum::{
    extract::{Query, State},
    Json,
};
use confreg_billing::{ListingQuery, PaymentStatus, SubscriptionListing};
use serde::Deserialize;

use crate::{
    auth::{AuthUser, CurrentUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListSubscriptionsQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

fn require_staff(user: Option<AuthUser>) -> ApiResult<AuthUser> {
    let user = user.ok_or(ApiError::Unauthorized)?;
    if !user.is_staff {
        tracing::warn!(user_id = %user.user_id, "Non-staff user tried to list subscriptions");
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}

/// List subscriptions with subscriber name and payment status
pub async fn list_subscriptions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListSubscriptionsQuery>,
) -> ApiResult<Json<SubscriptionListing>> {
    let staff = require_staff(user)?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<PaymentStatus>()
                .map_err(|_| ApiError::BadRequest(format!("unknown status filter '{}'", s)))
        })
        .transpose()?;

    let listing = state
        .billing
        .store
        .list_page(&ListingQuery {
            search: query.search,
            status,
            page: query.page,
            limit: query.limit,
        })
        .await?;

    tracing::debug!(
        staff_id = %staff.user_id,
        total = listing.total,
        "Admin subscription listing"
    );

    Ok(Json(listing))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;
    use confreg_billing::{
        Category, InMemorySubscriptionStore, Subscription, SubscriptionStore, SubscriptionType,
        Transaction, TransactionStatus,
    };
    use rust_decimal::Decimal;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::profiles::AccountProfile;

    fn profile(username: &str, name: &str) -> AccountProfile {
        AccountProfile {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{}@xavier.edu", username.to_lowercase()),
            name: name.to_string(),
            category: Some(Category::Speaker),
        }
    }

    async fn subscribe(
        store: &InMemorySubscriptionStore,
        user_id: Uuid,
        statuses: &[TransactionStatus],
    ) -> Subscription {
        let subscription = Subscription::new(user_id, SubscriptionType::Talk);
        let (first, rest) = statuses.split_first().unwrap();
        let code = format!("{}-0", subscription.id);
        let transaction = Transaction {
            status: *first,
            ..Transaction::pending(subscription.id, code, Decimal::from(150))
        };
        store
            .create_subscription(&subscription, &transaction)
            .await
            .unwrap();
        for (attempt, status) in rest.iter().enumerate() {
            let code = format!("{}-{}", subscription.id, attempt + 1);
            store
                .add_transaction(Transaction {
                    status: *status,
                    ..Transaction::pending(subscription.id, code, Decimal::from(150))
                })
                .await
                .unwrap();
        }
        subscription
    }

    async fn json(app: &TestApp, uri: &str, token: &str) -> Value {
        let response = app
            .router
            .clone()
            .oneshot(get(uri, Some(token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_listing_shows_name_and_status() {
        use TransactionStatus::*;
        let app = TestApp::new(StubGateway::default());
        let staff_token = app.user(profile("Xavier", "Charles"), true).await;

        let logan = profile("Wolverine", "Logan");
        let jean = profile("Phoenix", "Jean");
        let scott = profile("Cyclops", "Scott");
        let (logan_id, jean_id, scott_id) = (logan.user_id, jean.user_id, scott.user_id);
        app.user(logan, false).await;
        app.user(jean, false).await;
        app.user(scott, false).await;

        subscribe(&app.store, logan_id, &[Canceled, Pending, Done]).await;
        subscribe(&app.store, jean_id, &[Canceled, Pending]).await;
        subscribe(&app.store, scott_id, &[Pending]).await;

        let body = json(&app, "/admin/subscriptions", &staff_token).await;
        assert_eq!(body["total"], 3);

        let status_of = |name: &str| {
            body["subscriptions"]
                .as_array()
                .unwrap()
                .iter()
                .find(|row| row["name"] == name)
                .map(|row| row["status"].as_str().unwrap().to_string())
                .unwrap()
        };
        assert_eq!(status_of("Logan"), "confirmed");
        assert_eq!(status_of("Jean"), "canceled");
        assert_eq!(status_of("Scott"), "pending");
    }

    #[tokio::test]
    async fn test_listing_filters() {
        use TransactionStatus::*;
        let app = TestApp::new(StubGateway::default());
        let staff_token = app.user(profile("Xavier", "Charles"), true).await;

        let logan = profile("Wolverine", "Logan");
        let jean = profile("Phoenix", "Jean");
        let (logan_id, jean_id) = (logan.user_id, jean.user_id);
        app.user(logan, false).await;
        app.user(jean, false).await;
        subscribe(&app.store, logan_id, &[Done]).await;
        subscribe(&app.store, jean_id, &[Pending]).await;

        let by_search = json(&app, "/admin/subscriptions?search=wolverine", &staff_token).await;
        assert_eq!(by_search["total"], 1);
        assert_eq!(by_search["subscriptions"][0]["name"], "Logan");

        let by_status = json(&app, "/admin/subscriptions?status=pending", &staff_token).await;
        assert_eq!(by_status["total"], 1);
        assert_eq!(by_status["subscriptions"][0]["name"], "Jean");
        assert_eq!(by_status["subscriptions"][0]["type"], "talk");
    }

    #[tokio::test]
    async fn test_unknown_status_filter_is_bad_request() {
        let app = TestApp::new(StubGateway::default());
        let staff_token = app.user(profile("Xavier", "Charles"), true).await;

        let response = app
            .router
            .clone()
            .oneshot(get("/admin/subscriptions?status=refunded", Some(&staff_token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_huge_page_returns_empty_page() {
        let app = TestApp::new(StubGateway::default());
        let staff_token = app.user(profile("Xavier", "Charles"), true).await;
        let logan = profile("Wolverine", "Logan");
        let logan_id = logan.user_id;
        app.user(logan, false).await;
        subscribe(&app.store, logan_id, &[TransactionStatus::Pending]).await;

        let uri = format!("/admin/subscriptions?page={}", usize::MAX);
        let body = json(&app, &uri, &staff_token).await;

        assert_eq!(body["total"], 1);
        assert_eq!(body["subscriptions"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_requires_staff() {
        let app = TestApp::new(StubGateway::default());
        let attendee = app.user(profile("Wolverine", "Logan"), false).await;

        let anonymous = app
            .router
            .clone()
            .oneshot(get("/admin/subscriptions", None))
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let forbidden = app
            .router
            .clone()
            .oneshot(get("/admin/subscriptions", Some(&attendee)))
            .await
            .unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }
}
