//! Stored cart record encoding.
//!
//! Records look like `{ "items": CartLine[], "lastUpdated": "<RFC 3339>" }`.
//! Decoding never fails: an absent, unreadable or malformed record reads as no
//! record, and lines that do not decode or are not well formed are skipped.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    domain::carts::{CartLine, GuestCart},
    guest::GuestCartError,
    session::UserId,
    storage::LocalStorage,
};

/// Key of the anonymous cart record.
pub const GUEST_CART_KEY: &str = "storefront.cart.guest.v1";

pub(super) fn user_cart_key(user: &UserId) -> String {
    format!("storefront.cart.user.{user}.v1")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    items: Vec<Value>,

    #[serde(default)]
    last_updated: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordRef<'a> {
    items: &'a [CartLine],
    last_updated: Timestamp,
}

/// Lines read back from a record.
#[derive(Debug, Default)]
pub(super) struct DecodedLines {
    pub(super) lines: Vec<CartLine>,
    pub(super) dropped: usize,
    pub(super) last_updated: Option<Timestamp>,
}

/// Read the record under `key`. `None` when absent, unreadable or malformed.
pub(super) fn read(storage: &dyn LocalStorage, key: &str) -> Option<DecodedLines> {
    let contents = match storage.get(key) {
        Ok(Some(contents)) => contents,
        Ok(None) => return None,
        Err(error) => {
            warn!(key, error = %error, "cart record unreadable, treating as empty");

            return None;
        }
    };

    let raw = match serde_json::from_str::<RawRecord>(&contents) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(key, error = %error, "cart record malformed, treating as empty");

            return None;
        }
    };

    let last_updated = raw
        .last_updated
        .and_then(|value| serde_json::from_value::<Timestamp>(value).ok());

    let mut decoded = DecodedLines {
        last_updated,
        ..DecodedLines::default()
    };

    for value in raw.items {
        match serde_json::from_value::<CartLine>(value) {
            Ok(line) if line.is_well_formed() => fold_line(&mut decoded.lines, line),
            Ok(_) | Err(_) => decoded.dropped += 1,
        }
    }

    if decoded.dropped > 0 {
        debug!(key, dropped = decoded.dropped, "skipped malformed cart lines");
    }

    Some(decoded)
}

/// Read the record under `key` as a cart, or an empty cart stamped `now`.
pub(super) fn read_cart(storage: &dyn LocalStorage, key: &str, now: Timestamp) -> GuestCart {
    read(storage, key).map_or_else(
        || GuestCart::empty(now),
        |decoded| GuestCart {
            items: decoded.lines,
            last_updated: decoded.last_updated.unwrap_or(now),
        },
    )
}

/// Write `items` under `key` stamped `now`.
pub(super) fn write(
    storage: &dyn LocalStorage,
    key: &str,
    items: &[CartLine],
    now: Timestamp,
) -> Result<(), GuestCartError> {
    let encoded = serde_json::to_string(&RecordRef {
        items,
        last_updated: now,
    })?;

    storage.set(key, &encoded)?;

    Ok(())
}

// Duplicate ids fold into the first occurrence so each product keeps one line.
fn fold_line(lines: &mut Vec<CartLine>, line: CartLine) {
    match lines.iter_mut().find(|existing| existing.id == line.id) {
        Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
        None => lines.push(line),
    }
}
