use std::io::{self, Write};

use clap::{Parser, Subcommand};
use rusty_money::iso::{self, Currency};
use storefront_cart::{
    config::CartConfig,
    context::{CartContext, CartInitError},
    state::{SyncFailure, SyncState},
};
use thiserror::Error;

mod cart;
mod render;
mod session;

#[derive(Debug, Parser)]
#[command(name = "storefront-cart", about = "Storefront cart CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: CartConfig,

    /// ISO currency code used to display prices
    #[arg(long, env = "STOREFRONT_CURRENCY", default_value = "GBP")]
    currency: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the cart
    Show,

    /// Add units of a product
    Add(cart::AddArgs),

    /// Set the quantity of a line; zero or less removes it
    Update(cart::UpdateArgs),

    /// Remove a line
    Remove(cart::RemoveArgs),

    /// Remove every line
    Clear,

    /// Sign in and hand the guest cart to the server
    Login,

    /// Sign out, keeping a snapshot of the server cart on this device
    ///
    /// Each run starts signed out, so this signs in first exactly as `login`
    /// does: any guest cart is handed to the server before signing out.
    Logout,
}

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Init(#[from] CartInitError),

    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    #[error("STOREFRONT_USER and STOREFRONT_TOKEN are required to sign in")]
    MissingCredentials,

    #[error("cart sync failed: {0:?}")]
    Sync(SyncFailure),

    #[error("failed to write output")]
    Output(#[from] io::Error),
}

impl Cli {
    /// Load configuration from `.env`, environment and arguments.
    pub(crate) fn load() -> Result<Self, clap::Error> {
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    pub(crate) async fn run(self, mut out: impl Write) -> Result<(), CliError> {
        let currency = find_currency(&self.currency)?;
        let auth = self.config.storefront.auth_session();
        let context = CartContext::from_config(&self.config.storefront)?;

        match self.command {
            Commands::Login => session::login(&context, &auth, currency, &mut out).await?,
            Commands::Logout => session::logout(&context, &auth, currency, &mut out).await?,
            command => {
                context.session.observe(&auth).await;

                cart::run(&context, command, currency, &mut out).await?;
            }
        }

        match context.cart.sync_state() {
            SyncState::Error(failure) => Err(CliError::Sync(failure)),
            SyncState::Idle | SyncState::Loading => Ok(()),
        }
    }
}

fn find_currency(code: &str) -> Result<&'static Currency, CliError> {
    iso::find(&code.to_uppercase()).ok_or_else(|| CliError::UnknownCurrency(code.to_string()))
}
