// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Conference registration API
//!
//! HTTP surface for subscribing to the conference, receiving payment
//! notifications from the gateway and listing subscriptions for staff.

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod profiles;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
