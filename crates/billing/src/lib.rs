// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Registration billing
//!
//! Conference subscriptions, their payment transactions and the PagSeguro
//! integration that moves them between states.
//!
//! ## Features
//!
//! - **Prices**: fixed registration price per subscriber category
//! - **Checkout**: create a subscription and open a hosted gateway checkout
//! - **Notifications**: apply gateway payment notifications to transactions
//! - **Admin listing**: subscriptions with derived name and payment status

pub mod admin;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod models;
pub mod notification;
pub mod prices;
pub mod store;

#[cfg(test)]
mod testing;

// Admin
pub use admin::{ListingQuery, Subscriber, SubscriptionListing, SubscriptionRow};

// Checkout
pub use checkout::{CheckoutService, CheckoutStarted};

// Error
pub use error::{BillingError, BillingResult};

// Gateway
pub use gateway::{
    CheckoutRequest, GatewayConfig, GatewayTransaction, PagSeguroClient, PaymentGateway,
};

// Models
pub use models::{
    PaymentStatus, Subscription, SubscriptionRecord, SubscriptionType, Transaction,
    TransactionStatus,
};

// Notifications
pub use notification::{
    action_for, GatewayStatus, NotificationAction, NotificationHandler, NotificationOutcome,
};

// Prices
pub use prices::{price_for, Category, PRICES};

// Store
pub use store::{InMemorySubscriptionStore, PgSubscriptionStore, SubscriptionStore};

use std::sync::Arc;

/// Billing services sharing one store and gateway
#[derive(Clone)]
pub struct BillingService {
    pub checkout: CheckoutService,
    pub notifications: NotificationHandler,
    pub store: Arc<dyn SubscriptionStore>,
}

impl BillingService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        gateway: Arc<dyn PaymentGateway>,
        checkout_url: impl Into<String>,
    ) -> Self {
        Self {
            checkout: CheckoutService::new(store.clone(), gateway.clone(), checkout_url),
            notifications: NotificationHandler::new(store.clone(), gateway),
            store,
        }
    }
}
