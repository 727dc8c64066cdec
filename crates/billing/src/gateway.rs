//! PagSeguro payment gateway client
//!
//! Two calls are used: opening a checkout (returns a code that identifies the
//! hosted payment page) and looking up a transaction from a notification code.
//! Both endpoints answer in XML.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};

pub const DEFAULT_WS_URL: &str = "https://ws.pagseguro.uol.com.br";
pub const DEFAULT_CHECKOUT_URL: &str = "https://pagseguro.uol.com.br/v2/checkout/payment.html?code=";

/// Gateway credentials and endpoints
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub email: String,
    pub token: String,
    /// Web service base URL, without trailing slash
    pub ws_url: String,
    /// Hosted checkout URL; the checkout code is appended to it
    pub checkout_url: String,
}

impl GatewayConfig {
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
            ws_url: DEFAULT_WS_URL.to_string(),
            checkout_url: DEFAULT_CHECKOUT_URL.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.email.is_empty() && !self.token.is_empty()
    }
}

/// Item sold through a checkout
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Echoed back by the gateway in notifications
    pub reference: Uuid,
    pub item_id: String,
    pub description: String,
    pub amount: Decimal,
}

/// Transaction state as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayTransaction {
    pub status: i32,
    pub reference: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout and return its code
    async fn create_checkout(&self, request: &CheckoutRequest) -> BillingResult<String>;

    /// Resolve a notification code into the transaction it refers to
    async fn transaction_status(&self, notification_code: &str)
        -> BillingResult<GatewayTransaction>;
}

#[derive(Clone)]
pub struct PagSeguroClient {
    http: Client,
    config: GatewayConfig,
}

impl PagSeguroClient {
    pub fn new(http: Client, config: GatewayConfig) -> Self {
        Self { http, config }
    }

    /// `{ws_url}/<segments>`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> BillingResult<Url> {
        let mut url = Url::parse(&self.config.ws_url)
            .map_err(|e| BillingError::GatewayUrl(format!("{}: {}", self.config.ws_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| BillingError::GatewayUrl(self.config.ws_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn credentials(&self) -> [(&'static str, &str); 2] {
        [("email", &self.config.email), ("token", &self.config.token)]
    }
}

#[async_trait]
impl PaymentGateway for PagSeguroClient {
    async fn create_checkout(&self, request: &CheckoutRequest) -> BillingResult<String> {
        let url = self.endpoint(&["v2", "checkout"])?;
        let reference = request.reference.to_string();
        let amount = format_amount(request.amount);
        let form = [
            ("currency", "BRL"),
            ("itemId1", request.item_id.as_str()),
            ("itemDescription1", request.description.as_str()),
            ("itemAmount1", amount.as_str()),
            ("itemQuantity1", "1"),
            ("reference", reference.as_str()),
        ];

        let response = self
            .http
            .post(url)
            .query(&self.credentials())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                reference = %request.reference,
                status = status.as_u16(),
                "Gateway refused checkout"
            );
            return Err(BillingError::Gateway {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let code = first_text(&body, "code")?
            .ok_or_else(|| BillingError::InvalidGatewayResponse("missing <code>".to_string()))?;

        tracing::info!(reference = %request.reference, code = %code, "Gateway checkout created");
        Ok(code)
    }

    async fn transaction_status(
        &self,
        notification_code: &str,
    ) -> BillingResult<GatewayTransaction> {
        if !is_valid_notification_code(notification_code) {
            tracing::warn!(notification_code = %notification_code, "Rejected malformed notification code");
            return Err(BillingError::InvalidNotificationCode(
                notification_code.to_string(),
            ));
        }
        let url = self.endpoint(&["v2", "transactions", "notifications", notification_code])?;

        let response = self
            .http
            .get(url)
            .query(&self.credentials())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                notification_code = %notification_code,
                status = status.as_u16(),
                "Gateway notification lookup failed"
            );
            return Err(BillingError::Gateway {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_transaction(&body)
    }
}

/// Gateway codes are hex digits and dashes
fn is_valid_notification_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Amount with exactly two decimal places, as the gateway expects
fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

fn parse_transaction(xml: &str) -> BillingResult<GatewayTransaction> {
    let status = first_text(xml, "status")?
        .ok_or_else(|| BillingError::InvalidGatewayResponse("missing <status>".to_string()))?;
    let status = status.trim().parse::<i32>().map_err(|_| {
        BillingError::InvalidGatewayResponse(format!("non-numeric status '{}'", status))
    })?;
    let reference = first_text(xml, "reference")?
        .ok_or_else(|| BillingError::InvalidGatewayResponse("missing <reference>".to_string()))?;

    Ok(GatewayTransaction { status, reference })
}

/// Text content of the first element named `tag`
fn first_text(xml: &str, tag: &str) -> BillingResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut inside = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => inside = e.name().as_ref() == tag.as_bytes(),
            Ok(Event::Text(text)) if inside => {
                let value = text
                    .unescape()
                    .map_err(|e| BillingError::InvalidGatewayResponse(e.to_string()))?;
                return Ok(Some(value.into_owned()));
            }
            Ok(Event::End(_)) => inside = false,
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(BillingError::InvalidGatewayResponse(e.to_string())),
            Ok(_) => {}
        }
    }
}
