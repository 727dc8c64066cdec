//! Administrative listing of subscriptions
//!
//! Read-only: each row carries the subscriber's display name and the payment
//! status derived from the subscription's transactions.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{PaymentStatus, SubscriptionRecord, SubscriptionType};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 100;

/// Who a subscription belongs to, as far as the listing cares
#[derive(Debug, Clone, Default)]
pub struct Subscriber {
    pub username: String,
    pub email: String,
    /// Profile display name, if the user has a profile
    pub name: Option<String>,
}

/// Display name of the subscriber; empty without a profile
pub fn name(subscriber: Option<&Subscriber>) -> String {
    subscriber
        .and_then(|s| s.name.clone())
        .unwrap_or_default()
}

/// Payment status column
pub fn status(record: &SubscriptionRecord) -> PaymentStatus {
    record.payment_status()
}

#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    /// Case-insensitive match against email or username
    pub search: Option<String>,
    pub status: Option<PaymentStatus>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl ListingQuery {
    /// Requested page, 1-based
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows to skip before the requested page; saturates for absurd pages
    pub fn offset(&self) -> usize {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Lowercased search term, if any non-blank one was given
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SubscriptionType,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionListing {
    pub subscriptions: Vec<SubscriptionRow>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// Filter, paginate and render subscription records
pub fn build_listing<F>(
    records: Vec<SubscriptionRecord>,
    subscriber_of: F,
    query: &ListingQuery,
) -> SubscriptionListing
where
    F: Fn(Uuid) -> Option<Subscriber>,
{
    let needle = query.search_term();

    let rows: Vec<SubscriptionRow> = records
        .iter()
        .filter_map(|record| {
            let subscriber = subscriber_of(record.subscription.user_id);

            if let Some(needle) = &needle {
                let matched = subscriber.as_ref().is_some_and(|s| {
                    s.email.to_lowercase().contains(needle)
                        || s.username.to_lowercase().contains(needle)
                });
                if !matched {
                    return None;
                }
            }

            let status = status(record);
            if query.status.is_some_and(|wanted| wanted != status) {
                return None;
            }

            Some(SubscriptionRow {
                id: record.subscription.id,
                name: name(subscriber.as_ref()),
                kind: record.subscription.kind,
                date: record.subscription.date,
                status,
            })
        })
        .collect();

    let total = rows.len();
    let subscriptions = rows
        .into_iter()
        .skip(query.offset())
        .take(query.limit())
        .collect();

    SubscriptionListing {
        subscriptions,
        total,
        page: query.page(),
        limit: query.limit(),
    }
}
