//! Server configuration loaded from the environment

use confreg_billing::GatewayConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// HS256 secret shared with the site that issues session tokens
    pub jwt_secret: String,
    pub gateway: GatewayConfig,
    pub login_url: String,
    pub edit_profile_url: String,
    pub dashboard_url: String,
    pub resend_api_key: String,
    pub email_from: String,
    pub staff_emails: Vec<String>,
    pub run_migrations: bool,
}

impl Config {
    /// Configuration with every optional setting at its default
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            bind_address: "0.0.0.0:8000".to_string(),
            jwt_secret: jwt_secret.into(),
            gateway: GatewayConfig::new("", ""),
            login_url: "/accounts/login/".to_string(),
            edit_profile_url: "/dashboard/profile/".to_string(),
            dashboard_url: "/dashboard/".to_string(),
            resend_api_key: String::new(),
            email_from: "PythonBrasil <noreply@pythonbrasil.org.br>".to_string(),
            staff_emails: Vec::new(),
            run_migrations: true,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let mut config = Self::new(database_url, jwt_secret);

        if let Some(v) = optional("BIND_ADDRESS") {
            config.bind_address = v;
        }
        if let Some(v) = optional("PAGSEGURO_EMAIL") {
            config.gateway.email = v;
        }
        if let Some(v) = optional("PAGSEGURO_TOKEN") {
            config.gateway.token = v;
        }
        if let Some(v) = optional("PAGSEGURO_WS_URL") {
            config.gateway.ws_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = optional("PAGSEGURO_WEBCHECKOUT") {
            config.gateway.checkout_url = v;
        }
        if let Some(v) = optional("LOGIN_URL") {
            config.login_url = v;
        }
        if let Some(v) = optional("EDIT_PROFILE_URL") {
            config.edit_profile_url = v;
        }
        if let Some(v) = optional("DASHBOARD_URL") {
            config.dashboard_url = v;
        }
        if let Some(v) = optional("RESEND_API_KEY") {
            config.resend_api_key = v;
        }
        if let Some(v) = optional("EMAIL_FROM") {
            config.email_from = v;
        }
        if let Some(v) = optional("STAFF_EMAILS") {
            config.staff_emails = parse_list(&v);
        }
        if let Some(v) = optional("RUN_MIGRATIONS") {
            config.run_migrations = v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "RUN_MIGRATIONS",
                value: v.clone(),
            })?;
        }

        Ok(config)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::MissingRequired(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
