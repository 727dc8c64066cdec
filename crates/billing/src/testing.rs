//! Test doubles shared by the billing unit tests

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{BillingError, BillingResult};
use crate::gateway::{CheckoutRequest, GatewayTransaction, PaymentGateway};

/// Gateway that answers from canned values and records checkout requests
pub(crate) struct FakeGateway {
    code: Option<String>,
    transaction: Option<GatewayTransaction>,
    requests: Mutex<Vec<CheckoutRequest>>,
}

impl FakeGateway {
    pub(crate) fn with_code(code: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            transaction: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            code: None,
            transaction: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_transaction(status: i32, reference: impl Into<String>) -> Self {
        Self {
            code: None,
            transaction: Some(GatewayTransaction {
                status,
                reference: reference.into(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> BillingResult<String> {
        self.requests.lock().await.push(request.clone());
        self.code
            .clone()
            .ok_or(BillingError::Gateway { status: 500 })
    }

    async fn transaction_status(&self, _code: &str) -> BillingResult<GatewayTransaction> {
        self.transaction
            .clone()
            .ok_or(BillingError::Gateway { status: 404 })
    }
}
