use std::io::Write;

use rusty_money::iso::Currency;
use storefront_cart::{
    context::CartContext,
    session::{AuthSession, SessionChange},
};

use super::{CliError, render};

pub(super) async fn login(
    context: &CartContext,
    auth: &AuthSession,
    currency: &'static Currency,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let Some(user) = auth.user() else {
        return Err(CliError::MissingCredentials);
    };

    if let SessionChange::SignedIn(report) = context.session.login(user.clone()).await {
        render::write_merge_report(out, user, &report)?;
    }

    render::write_cart(out, &context.cart.snapshot(), currency)?;

    Ok(())
}

pub(super) async fn logout(
    context: &CartContext,
    auth: &AuthSession,
    currency: &'static Currency,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let Some(user) = auth.user() else {
        return Err(CliError::MissingCredentials);
    };

    // A fresh process has no session to end; sign in to have one.
    context.session.login(user.clone()).await;

    if context.session.logout().await == SessionChange::SignedOut {
        writeln!(out, "Signed out {user}; cart kept on this device")?;
    }

    render::write_cart(out, &context.cart.snapshot(), currency)?;

    Ok(())
}
