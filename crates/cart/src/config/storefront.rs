//! Storefront Config

use std::{path::PathBuf, time::Duration};

use clap::Args;

use crate::session::{AuthSession, UserId};

/// Storefront backend and device storage settings.
#[derive(Debug, Args)]
pub struct StorefrontConfig {
    /// Base URL of the storefront API
    #[arg(long, env = "STOREFRONT_API_URL")]
    pub api_url: String,

    /// Directory holding the device-local cart records
    #[arg(long, env = "STOREFRONT_CART_DIR", default_value = ".storefront")]
    pub cart_dir: PathBuf,

    /// Seconds to wait for a single cart API call
    #[arg(long, env = "STOREFRONT_REQUEST_TIMEOUT_SECONDS", default_value_t = 15_u64)]
    pub request_timeout_seconds: u64,

    /// Shopper to sign in as
    #[arg(long, env = "STOREFRONT_USER")]
    pub user: Option<String>,

    /// Bearer token of the shopper
    #[arg(long, env = "STOREFRONT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl StorefrontConfig {
    /// Limit on a single cart API call.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// The session described by the configured credentials.
    ///
    /// Anonymous unless both a non-blank user and a token are configured.
    #[must_use]
    pub fn auth_session(&self) -> AuthSession {
        match (&self.user, &self.token) {
            (Some(user), Some(_)) if !user.trim().is_empty() => {
                AuthSession::Authenticated(UserId::new(user.trim()))
            }
            _ => AuthSession::Anonymous,
        }
    }
}
