//! Staff notifications
//!
//! Sent through the Resend HTTP API when a subscription could not be opened at
//! the payment gateway, so the organizers can follow up with the attendee.

use async_trait::async_trait;
use confreg_billing::SubscriptionType;
use reqwest::Client;
use serde_json::json;

use crate::auth::AuthUser;
use crate::config::Config;

pub const RESEND_API_URL: &str = "https://api.resend.com";

#[async_trait]
pub trait StaffNotifier: Send + Sync {
    /// Tell staff that `user` could not be subscribed.
    ///
    /// Delivery problems are logged, never returned: the attendee's request
    /// must not fail because of them.
    async fn subscription_failed(&self, user: &AuthUser, kind: SubscriptionType);
}

#[derive(Clone)]
pub struct ResendStaffNotifier {
    http: Client,
    api_url: String,
    api_key: String,
    from: String,
    recipients: Vec<String>,
}

impl ResendStaffNotifier {
    pub fn new(http: Client, api_key: String, from: String, recipients: Vec<String>) -> Self {
        Self {
            http,
            api_url: RESEND_API_URL.to_string(),
            api_key,
            from,
            recipients,
        }
    }

    pub fn from_config(http: Client, config: &Config) -> Self {
        Self::new(
            http,
            config.resend_api_key.clone(),
            config.email_from.clone(),
            config.staff_emails.clone(),
        )
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty() && !self.recipients.is_empty()
    }
}

#[async_trait]
impl StaffNotifier for ResendStaffNotifier {
    async fn subscription_failed(&self, user: &AuthUser, kind: SubscriptionType) {
        if !self.is_enabled() {
            tracing::warn!(
                user_id = %user.user_id,
                kind = %kind,
                "Staff email not configured; subscription failure only logged"
            );
            return;
        }

        let subject = format!("Subscription failed for {}", user.username);
        let text = format!(
            "The payment gateway refused to open a {} checkout for user {} ({}, id {}).\n\
             No subscription was recorded. Please get in touch with the attendee.",
            kind, user.username, user.email, user.user_id
        );

        let result = self
            .http
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": self.recipients,
                "subject": subject,
                "text": text,
            }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(user_id = %user.user_id, "Staff notified of failed subscription");
            }
            Ok(response) => {
                tracing::error!(
                    user_id = %user.user_id,
                    status = response.status().as_u16(),
                    "Staff notification rejected by email API"
                );
            }
            Err(e) => {
                tracing::error!(user_id = %user.user_id, error = %e, "Failed to send staff notification");
            }
        }
    }
}
