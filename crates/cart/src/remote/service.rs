//! Cart service contract.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    domain::{carts::RemoteCart, products::ProductId},
    remote::CartServiceError,
};

/// Server-side cart of the signed-in user.
///
/// Every call returns the whole cart after the change; the server owns
/// deduplication and totals.
#[automock]
#[async_trait]
pub trait CartService: Send + Sync {
    /// Retrieve the current cart.
    async fn fetch_cart(&self) -> Result<RemoteCart, CartServiceError>;

    /// Add `quantity` units of a product.
    async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, CartServiceError>;

    /// Set the quantity of a line.
    async fn update_item_quantity(
        &self,
        line_id: ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, CartServiceError>;

    /// Remove a line.
    async fn remove_item(&self, line_id: ProductId) -> Result<RemoteCart, CartServiceError>;

    /// Remove every line.
    async fn clear_cart(&self) -> Result<RemoteCart, CartServiceError>;
}
