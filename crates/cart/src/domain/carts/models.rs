//! Cart Models

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::domain::products::{ProductId, ProductSnapshot};

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Line identity, equal to the product identifier
    pub id: ProductId,

    /// Product data cached when the line was first added
    pub product: ProductSnapshot,

    /// Units of the product, never zero in a cart the engine produces
    pub quantity: u32,

    /// When the product was first added, kept across quantity updates
    pub added_at: Timestamp,
}

impl CartLine {
    /// Start a new line for `product`.
    #[must_use]
    pub fn new(product: ProductSnapshot, quantity: u32, added_at: Timestamp) -> Self {
        Self {
            id: product.id.clone(),
            product,
            quantity,
            added_at,
        }
    }

    /// Whether the line can be kept in a cart or offered to the server.
    ///
    /// Requires a non-blank id, a positive quantity and a product snapshot
    /// describing the same product as the line.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_blank() && self.quantity > 0 && self.product.id == self.id
    }

    /// Price of the whole line in minor units.
    #[must_use]
    pub fn line_total(&self) -> u64 {
        self.product
            .effective_price()
            .saturating_mul(u64::from(self.quantity))
    }
}

/// Sum of quantities across `items`.
#[must_use]
pub fn total_items(items: &[CartLine]) -> u64 {
    items.iter().map(|line| u64::from(line.quantity)).sum()
}

/// Sum of `effective price × quantity` across `items`, in minor units.
#[must_use]
pub fn subtotal(items: &[CartLine]) -> u64 {
    items
        .iter()
        .fold(0_u64, |acc, line| acc.saturating_add(line.line_total()))
}

/// Cart of a shopper who has not signed in, kept on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCart {
    /// Lines in display order
    pub items: Vec<CartLine>,

    /// Stamped on every save
    pub last_updated: Timestamp,
}

impl GuestCart {
    /// An empty cart stamped `now`.
    #[must_use]
    pub fn empty(now: Timestamp) -> Self {
        Self {
            items: Vec::new(),
            last_updated: now,
        }
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find the line for `id`.
    #[must_use]
    pub fn line(&self, id: &ProductId) -> Option<&CartLine> {
        self.items.iter().find(|line| &line.id == id)
    }

    /// Add `quantity` units of `product`, incrementing an existing line in place.
    ///
    /// Returns `false` when `quantity` is zero and nothing changed.
    pub fn add(&mut self, product: ProductSnapshot, quantity: u32, now: Timestamp) -> bool {
        if quantity == 0 {
            return false;
        }

        if let Some(line) = self.items.iter_mut().find(|line| line.id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartLine::new(product, quantity, now));
        }

        true
    }

    /// Set the quantity of the line for `id`; zero or less removes it.
    ///
    /// Returns `false` when no line exists for `id`.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(id);
        }

        let Some(line) = self.items.iter_mut().find(|line| &line.id == id) else {
            return false;
        };

        line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        true
    }

    /// Remove the line for `id`.
    ///
    /// Returns `false` when no line exists for `id`.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();

        self.items.retain(|line| &line.id != id);

        self.items.len() != before
    }
}

/// A guest line offered to the server after sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLine {
    /// Product to add
    pub product_id: ProductId,

    /// Units to add
    pub quantity: u32,
}

/// Guest lines ready for transfer, plus how many stored lines were unusable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferBatch {
    /// Structurally valid lines
    pub lines: Vec<TransferLine>,

    /// Stored lines dropped as malformed
    pub dropped: usize,
}

impl TransferBatch {
    /// Whether there is nothing to transfer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Server-side cart as returned by every cart endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCart {
    /// Server cart identifier
    #[serde(default)]
    pub id: String,

    /// Authoritative lines
    #[serde(default)]
    pub items: Vec<RemoteCartLine>,

    /// Server-computed quantity total, informational only
    #[serde(default)]
    pub total_items: u64,

    /// Server-computed subtotal, informational only
    #[serde(default)]
    pub subtotal: u64,
}

/// One line of a [`RemoteCart`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartLine {
    /// Line identity, equal to the product identifier
    pub id: ProductId,

    /// Product data as known to the server
    pub product: ProductSnapshot,

    /// Units of the product
    pub quantity: u32,

    /// When the server first recorded the line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<Timestamp>,
}

impl RemoteCart {
    /// Convert the server lines into cart lines, dropping any with zero quantity.
    ///
    /// Lines without a server timestamp are stamped `now`.
    #[must_use]
    pub fn into_lines(self, now: Timestamp) -> Vec<CartLine> {
        self.items
            .into_iter()
            .filter(|line| line.quantity > 0)
            .map(|line| CartLine {
                id: line.id,
                product: line.product,
                quantity: line.quantity,
                added_at: line.added_at.unwrap_or(now),
            })
            .collect()
    }
}
