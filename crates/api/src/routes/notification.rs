//! Gateway notification webhook

use axum::{extract::State, Form};
use confreg_billing::NotificationOutcome;
use serde::Deserialize;

use crate::state::AppState;

/// Acknowledgement body expected by the gateway
pub const ACK: &str = "OK";

#[derive(Debug, Deserialize)]
pub struct NotificationForm {
    #[serde(rename = "notificationCode")]
    pub notification_code: String,
}

/// Receive a payment notification.
///
/// Always acknowledged once the form parses: unmapped statuses, unknown
/// references and lookup failures are only logged.
pub async fn notification(
    State(state): State<AppState>,
    Form(form): Form<NotificationForm>,
) -> &'static str {
    let code = form.notification_code.trim();

    match state.billing.notifications.handle(code).await {
        Ok(NotificationOutcome::Applied { transaction }) => {
            tracing::info!(
                notification_code = %code,
                subscription_id = %transaction.subscription_id,
                status = %transaction.status,
                "Notification applied"
            );
        }
        Ok(NotificationOutcome::Ignored { status }) => {
            tracing::debug!(notification_code = %code, status, "Notification ignored");
        }
        Ok(NotificationOutcome::UnknownReference { reference }) => {
            tracing::warn!(
                notification_code = %code,
                reference = %reference,
                "Notification for unknown subscription"
            );
        }
        Err(e) => {
            tracing::error!(notification_code = %code, error = %e, "Failed to process notification");
        }
    }

    ACK
}
