//! Billing error types

use thiserror::Error;

pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Payment gateway rejected the request: HTTP {status}")]
    Gateway { status: u16 },

    #[error("Payment gateway unreachable: {0}")]
    GatewayTransport(#[from] reqwest::Error),

    #[error("Invalid payment gateway response: {0}")]
    InvalidGatewayResponse(String),

    #[error("Invalid payment gateway URL: {0}")]
    GatewayUrl(String),

    #[error("Invalid notification code: {0:?}")]
    InvalidNotificationCode(String),

    #[error("Unknown subscription type: {0}")]
    UnknownSubscriptionType(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Transaction code already recorded: {0}")]
    DuplicateTransactionCode(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BillingError {
    /// Whether the failure came from talking to the payment gateway
    pub fn is_gateway_failure(&self) -> bool {
        matches!(
            self,
            BillingError::Gateway { .. }
                | BillingError::GatewayTransport(_)
                | BillingError::InvalidGatewayResponse(_)
                | BillingError::GatewayUrl(_)
        )
    }
}
