use std::io::{self, Write};

use rusty_money::{Money, iso::Currency};
use storefront_cart::{
    session::{MergeReport, UserId},
    state::{CartMode, CartState, SyncFailure, SyncState},
};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

pub(super) fn write_cart(
    out: &mut impl Write,
    state: &CartState,
    currency: &'static Currency,
) -> io::Result<()> {
    if state.items().is_empty() {
        writeln!(out, "Cart is empty")?;
    } else {
        let mut builder = Builder::default();

        builder.push_record(["Product", "Name", "Qty", "Unit Price", "Line Total"]);

        for line in state.items() {
            builder.push_record([
                line.id.to_string(),
                line.product.name.clone(),
                line.quantity.to_string(),
                format_minor(line.product.effective_price(), currency),
                format_minor(line.line_total(), currency),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Columns::new(2..5), Alignment::right());

        writeln!(out, "{table}")?;
    }

    writeln!(out, "Items:    {}", state.total_items())?;
    writeln!(out, "Subtotal: {}", format_minor(state.subtotal(), currency))?;
    writeln!(out, "Cart:     {}", describe_mode(state.mode()))?;
    writeln!(out, "Sync:     {}", describe_sync(state.sync_state()))
}

pub(super) fn write_merge_report(
    out: &mut impl Write,
    user: &UserId,
    report: &MergeReport,
) -> io::Result<()> {
    writeln!(
        out,
        "Signed in as {user}: {} guest line(s) transferred, {} failed, {} unreadable",
        report.transferred, report.failed, report.dropped
    )
}

fn format_minor(amount: u64, currency: &'static Currency) -> String {
    let minor = i64::try_from(amount).unwrap_or(i64::MAX);

    Money::from_minor(minor, currency).to_string()
}

fn describe_mode(mode: &CartMode) -> String {
    match mode {
        CartMode::Guest => "guest".to_string(),
        CartMode::Authenticated(user) => format!("signed in as {user}"),
    }
}

fn describe_sync(sync: SyncState) -> &'static str {
    match sync {
        SyncState::Idle => "idle",
        SyncState::Loading => "loading",
        SyncState::Error(SyncFailure::Network) => "error (network)",
        SyncState::Error(SyncFailure::Unauthorized) => "error (unauthorized)",
        SyncState::Error(SyncFailure::ServerError) => "error (server)",
        SyncState::Error(SyncFailure::ValidationError) => "error (rejected)",
    }
}
