//! Gateway payment notifications
//!
//! The gateway only sends an opaque notification code. The handler resolves it
//! into a status and the reference we attached at checkout (the subscription
//! id), then moves the subscription's latest transaction accordingly.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::BillingResult;
use crate::gateway::PaymentGateway;
use crate::models::{Transaction, TransactionStatus};
use crate::store::SubscriptionStore;

/// Transaction status codes used by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    AwaitingPayment,
    InAnalysis,
    Paid,
    Available,
    InDispute,
    Returned,
    Canceled,
    Unknown(i32),
}

impl From<i32> for GatewayStatus {
    fn from(code: i32) -> Self {
        match code {
            1 => GatewayStatus::AwaitingPayment,
            2 => GatewayStatus::InAnalysis,
            3 => GatewayStatus::Paid,
            4 => GatewayStatus::Available,
            5 => GatewayStatus::InDispute,
            6 => GatewayStatus::Returned,
            7 => GatewayStatus::Canceled,
            other => GatewayStatus::Unknown(other),
        }
    }
}

/// State change applied to a transaction in response to a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    MarkDone,
    MarkCanceled,
}

impl NotificationAction {
    pub fn target_status(&self) -> TransactionStatus {
        match self {
            NotificationAction::MarkDone => TransactionStatus::Done,
            NotificationAction::MarkCanceled => TransactionStatus::Canceled,
        }
    }
}

/// Only paid (3) and canceled (7) change anything.
pub fn action_for(status: GatewayStatus) -> Option<NotificationAction> {
    match status {
        GatewayStatus::Paid => Some(NotificationAction::MarkDone),
        GatewayStatus::Canceled => Some(NotificationAction::MarkCanceled),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationOutcome {
    Applied { transaction: Transaction },
    /// Status has no mapped action
    Ignored { status: i32 },
    /// Reference is not a subscription with transactions
    UnknownReference { reference: String },
}

#[derive(Clone)]
pub struct NotificationHandler {
    store: Arc<dyn SubscriptionStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl NotificationHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    pub async fn handle(&self, notification_code: &str) -> BillingResult<NotificationOutcome> {
        let report = self.gateway.transaction_status(notification_code).await?;
        let status = GatewayStatus::from(report.status);

        let Some(action) = action_for(status) else {
            tracing::info!(
                notification_code = %notification_code,
                status = report.status,
                reference = %report.reference,
                "Notification status has no action"
            );
            return Ok(NotificationOutcome::Ignored {
                status: report.status,
            });
        };

        let Ok(subscription_id) = report.reference.trim().parse::<Uuid>() else {
            tracing::warn!(reference = %report.reference, "Notification reference is not a subscription id");
            return Ok(NotificationOutcome::UnknownReference {
                reference: report.reference,
            });
        };

        match self.apply(action, subscription_id).await? {
            Some(transaction) => Ok(NotificationOutcome::Applied { transaction }),
            None => Ok(NotificationOutcome::UnknownReference {
                reference: report.reference,
            }),
        }
    }

    pub async fn apply(
        &self,
        action: NotificationAction,
        subscription_id: Uuid,
    ) -> BillingResult<Option<Transaction>> {
        let status = action.target_status();
        let updated = self
            .store
            .set_latest_transaction_status(subscription_id, status)
            .await?;

        match &updated {
            Some(transaction) => tracing::info!(
                subscription_id = %subscription_id,
                transaction_id = %transaction.id,
                status = %status,
                "Transaction status updated from notification"
            ),
            None => tracing::warn!(
                subscription_id = %subscription_id,
                "No transaction found for notification reference"
            ),
        }

        Ok(updated)
    }

    pub async fn transaction_done(&self, subscription_id: Uuid) -> BillingResult<Option<Transaction>> {
        self.apply(NotificationAction::MarkDone, subscription_id).await
    }

    pub async fn transaction_canceled(
        &self,
        subscription_id: Uuid,
    ) -> BillingResult<Option<Transaction>> {
        self.apply(NotificationAction::MarkCanceled, subscription_id)
            .await
    }
}
