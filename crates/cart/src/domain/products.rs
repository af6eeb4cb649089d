//! Product Snapshots

use serde::{Deserialize, Serialize};

use crate::ids::TypedId;

/// Product identifier. Also identifies the cart line holding that product.
pub type ProductId = TypedId<ProductSnapshot>;

/// Product display data cached when a line is first added.
///
/// Prices are in minor currency units. The snapshot is not refreshed, so it may
/// lag the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Catalogue identifier
    pub id: ProductId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// List price
    pub price: u64,

    /// Sale price, when the product is discounted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<u64>,

    /// Stock ceiling at the time of caching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,

    /// Image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProductSnapshot {
    /// Create a snapshot with only the required fields set.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            discount_price: None,
            stock: None,
            image: None,
        }
    }

    /// Set the sale price.
    #[must_use]
    pub fn with_discount_price(mut self, discount_price: u64) -> Self {
        self.discount_price = Some(discount_price);
        self
    }

    /// Price charged per unit: the sale price when present, otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> u64 {
        self.discount_price.unwrap_or(self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_price_prefers_discount() {
        let product = ProductSnapshot::new("p1", "Ibuprofen 200mg", 450);

        assert_eq!(product.effective_price(), 450);
        assert_eq!(product.with_discount_price(399).effective_price(), 399);
    }
}
