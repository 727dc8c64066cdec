//! Subscription and transaction records

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::BillingError;

/// Conference track a subscription is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionType {
    Talk,
    Tutorial,
}

impl SubscriptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionType::Talk => "talk",
            SubscriptionType::Tutorial => "tutorial",
        }
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "talk" => Ok(SubscriptionType::Talk),
            "tutorial" => Ok(SubscriptionType::Tutorial),
            other => Err(BillingError::UnknownSubscriptionType(other.to_string())),
        }
    }
}

/// Payment state of a single transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Done,
    Canceled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Done => "done",
            TransactionStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "done" => Ok(TransactionStatus::Done),
            "canceled" => Ok(TransactionStatus::Canceled),
            other => Err(BillingError::InvalidData(format!(
                "unknown transaction status '{}'",
                other
            ))),
        }
    }
}

/// A user's registration for one conference track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: SubscriptionType,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl Subscription {
    /// New, not yet persisted, subscription dated now
    pub fn new(user_id: Uuid, kind: SubscriptionType) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            date: OffsetDateTime::now_utc(),
        }
    }
}

/// One payment attempt against a subscription
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub subscription_id: Uuid,
    /// Gateway-assigned checkout code
    pub code: String,
    pub price: Decimal,
    pub status: TransactionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    pub fn pending(subscription_id: Uuid, code: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscription_id,
            code: code.into(),
            price,
            status: TransactionStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Hosted checkout page for this transaction
    pub fn checkout_url(&self, base: &str) -> String {
        format!("{}{}", base, self.code)
    }
}

/// Payment status shown for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Confirmed,
    Canceled,
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(PaymentStatus::Confirmed),
            "canceled" => Ok(PaymentStatus::Canceled),
            "pending" => Ok(PaymentStatus::Pending),
            other => Err(BillingError::InvalidData(format!(
                "unknown payment status '{}'",
                other
            ))),
        }
    }
}

/// True when at least one transaction has been paid
pub fn done(transactions: &[Transaction]) -> bool {
    transactions
        .iter()
        .any(|t| t.status == TransactionStatus::Done)
}

/// Derive the payment status: done > canceled > pending
pub fn payment_status(transactions: &[Transaction]) -> PaymentStatus {
    if done(transactions) {
        PaymentStatus::Confirmed
    } else if transactions
        .iter()
        .any(|t| t.status == TransactionStatus::Canceled)
    {
        PaymentStatus::Canceled
    } else {
        PaymentStatus::Pending
    }
}

/// A subscription loaded together with all of its transactions
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRecord {
    pub subscription: Subscription,
    pub transactions: Vec<Transaction>,
}

impl SubscriptionRecord {
    pub fn done(&self) -> bool {
        done(&self.transactions)
    }

    pub fn payment_status(&self) -> PaymentStatus {
        payment_status(&self.transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(statuses: &[TransactionStatus]) -> SubscriptionRecord {
        let subscription = Subscription::new(Uuid::new_v4(), SubscriptionType::Talk);
        let transactions = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| Transaction {
                status: *status,
                ..Transaction::pending(subscription.id, format!("code-{i}"), Decimal::from(100))
            })
            .collect();
        SubscriptionRecord {
            subscription,
            transactions,
        }
    }

    #[test]
    fn test_done_false_without_transactions() {
        assert!(!record_with(&[]).done());
    }

    #[test]
    fn test_done_false_when_nothing_paid() {
        let record = record_with(&[TransactionStatus::Pending, TransactionStatus::Canceled]);
        assert!(!record.done());
    }

    #[test]
    fn test_done_true_when_any_transaction_paid() {
        let record = record_with(&[TransactionStatus::Canceled, TransactionStatus::Done]);
        assert!(record.done());
    }

    #[test]
    fn test_payment_status_precedence() {
        use TransactionStatus::*;

        assert_eq!(record_with(&[]).payment_status(), PaymentStatus::Pending);
        assert_eq!(
            record_with(&[Pending]).payment_status(),
            PaymentStatus::Pending
        );
        assert_eq!(
            record_with(&[Canceled, Pending]).payment_status(),
            PaymentStatus::Canceled
        );
        assert_eq!(
            record_with(&[Canceled, Pending, Done]).payment_status(),
            PaymentStatus::Confirmed
        );
    }

    #[test]
    fn test_checkout_url_appends_code() {
        let t = Transaction::pending(Uuid::new_v4(), "123", Decimal::from(150));
        assert_eq!(
            t.checkout_url("https://pagseguro.uol.com.br/v2/checkout/payment.html?code="),
            "https://pagseguro.uol.com.br/v2/checkout/payment.html?code=123"
        );
    }

    #[test]
    fn test_subscription_type_parsing() {
        assert_eq!("talk".parse::<SubscriptionType>().unwrap(), SubscriptionType::Talk);
        assert_eq!(
            "tutorial".parse::<SubscriptionType>().unwrap(),
            SubscriptionType::Tutorial
        );
        assert!("keynote".parse::<SubscriptionType>().is_err());
    }

    #[test]
    fn test_transaction_status_rejects_unknown_values() {
        assert_eq!("done".parse::<TransactionStatus>().unwrap(), TransactionStatus::Done);
        assert!("refunded".parse::<TransactionStatus>().is_err());
    }
}
