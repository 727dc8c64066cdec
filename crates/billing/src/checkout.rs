//! Subscription checkout
//!
//! Opens a gateway checkout for a new subscription and persists the
//! subscription only once the gateway has handed out a code.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::BillingResult;
use crate::gateway::{CheckoutRequest, PaymentGateway};
use crate::models::{Subscription, SubscriptionType, Transaction};
use crate::prices::{price_for, Category};
use crate::store::SubscriptionStore;

/// A persisted subscription ready to be paid
#[derive(Debug, Clone)]
pub struct CheckoutStarted {
    pub subscription: Subscription,
    pub transaction: Transaction,
    pub checkout_url: String,
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn SubscriptionStore>,
    gateway: Arc<dyn PaymentGateway>,
    checkout_url: String,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        gateway: Arc<dyn PaymentGateway>,
        checkout_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            checkout_url: checkout_url.into(),
        }
    }

    /// Subscribe a user and open the payment for their category's price.
    ///
    /// Nothing is persisted when the gateway call fails.
    pub async fn start(
        &self,
        user_id: Uuid,
        kind: SubscriptionType,
        category: Category,
    ) -> BillingResult<CheckoutStarted> {
        let subscription = Subscription::new(user_id, kind);
        let price = price_for(category);

        let transaction = self.generate_transaction(&subscription, price).await?;
        self.store
            .create_subscription(&subscription, &transaction)
            .await?;

        tracing::info!(
            user_id = %user_id,
            subscription_id = %subscription.id,
            kind = %kind,
            category = %category,
            price = %price,
            code = %transaction.code,
            "Subscription created, awaiting payment"
        );

        let checkout_url = transaction.checkout_url(&self.checkout_url);
        Ok(CheckoutStarted {
            subscription,
            transaction,
            checkout_url,
        })
    }

    /// Ask the gateway for a checkout code and build the pending transaction
    pub async fn generate_transaction(
        &self,
        subscription: &Subscription,
        price: Decimal,
    ) -> BillingResult<Transaction> {
        let request = CheckoutRequest {
            reference: subscription.id,
            item_id: subscription.kind.as_str().to_string(),
            description: format!("Conference registration ({})", subscription.kind),
            amount: price,
        };

        let code = self.gateway.create_checkout(&request).await?;
        Ok(Transaction::pending(subscription.id, code, price))
    }
}
