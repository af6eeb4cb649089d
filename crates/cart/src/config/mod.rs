//! Cart engine configuration module

use clap::Args;

pub use crate::config::{
    logging::{LogFormat, LoggingConfig},
    storefront::StorefrontConfig,
};

mod logging;
mod storefront;

/// Storefront cart configuration
#[derive(Debug, Args)]
pub struct CartConfig {
    /// Storefront backend and device storage settings.
    #[command(flatten)]
    pub storefront: StorefrontConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}
