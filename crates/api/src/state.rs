//! Application state

use std::{sync::Arc, time::Duration};

use confreg_billing::{
    BillingService, PagSeguroClient, PaymentGateway, PgSubscriptionStore, SubscriptionStore,
};
use reqwest::Client;
use sqlx::PgPool;

use crate::{
    auth::{AuthState, JwtManager},
    config::Config,
    email::{ResendStaffNotifier, StaffNotifier},
    profiles::{PgProfileDirectory, ProfileDirectory},
};

/// Lifetime of tokens issued through `JwtManager::issue`
const SESSION_EXPIRY_HOURS: i64 = 24;

/// Upper bound on any call to the gateway or the email API
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Outbound HTTP client; requests that take longer than `timeout` fail
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jwt_manager: JwtManager,
    pub billing: BillingService,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub staff_notifier: Arc<dyn StaffNotifier>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Result<Self, reqwest::Error> {
        let http = http_client(HTTP_TIMEOUT)?;

        if config.gateway.is_configured() {
            tracing::info!(ws_url = %config.gateway.ws_url, "PagSeguro gateway configured");
        } else {
            tracing::warn!("PagSeguro credentials missing (PAGSEGURO_EMAIL/PAGSEGURO_TOKEN) - checkouts will fail");
        }
        let gateway = Arc::new(PagSeguroClient::new(
            http.clone(),
            config.gateway.clone(),
        ));

        let notifier = ResendStaffNotifier::from_config(http, &config);
        if notifier.is_enabled() {
            tracing::info!(
                recipients = config.staff_emails.len(),
                "Staff email notifications enabled"
            );
        } else {
            tracing::warn!("Staff email notifications not configured (missing RESEND_API_KEY or STAFF_EMAILS)");
        }

        Ok(Self::from_parts(
            config,
            Arc::new(PgSubscriptionStore::new(pool.clone())),
            gateway,
            Arc::new(PgProfileDirectory::new(pool)),
            Arc::new(notifier),
        ))
    }

    /// Assemble state from explicit collaborators
    pub fn from_parts(
        config: Config,
        store: Arc<dyn SubscriptionStore>,
        gateway: Arc<dyn PaymentGateway>,
        profiles: Arc<dyn ProfileDirectory>,
        staff_notifier: Arc<dyn StaffNotifier>,
    ) -> Self {
        let jwt_manager = JwtManager::new(&config.jwt_secret, SESSION_EXPIRY_HOURS);
        let billing = BillingService::new(store, gateway, config.gateway.checkout_url.clone());

        Self {
            config,
            jwt_manager,
            billing,
            profiles,
            staff_notifier,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}
