//! Guest cart store.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use jiff::Timestamp;
use tracing::{debug, warn};

use crate::{
    domain::{
        carts::{GuestCart, TransferBatch, TransferLine},
        products::{ProductId, ProductSnapshot},
    },
    guest::{GuestCartError, record},
    storage::LocalStorage,
};

use super::record::GUEST_CART_KEY;

/// Durable cart of a shopper who has not signed in.
///
/// Reads never fail: anything unusable in storage reads as an empty cart.
/// Write failures are logged and reported, never raised, so the in-memory
/// cart returned by every mutation stays authoritative for the caller.
#[derive(Clone)]
pub struct GuestCartStore {
    storage: Arc<dyn LocalStorage>,
}

impl GuestCartStore {
    /// Keep the guest cart in `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Read the guest cart, or an empty cart when none is usable.
    #[must_use]
    pub fn load(&self) -> GuestCart {
        record::read_cart(self.storage.as_ref(), GUEST_CART_KEY, Timestamp::now())
    }

    /// Stamp `cart` with the current time and write it.
    ///
    /// # Errors
    ///
    /// Returns a [`GuestCartError`] when the write fails. The failure is
    /// non-fatal; `cart` is still stamped.
    pub fn save(&self, cart: &mut GuestCart) -> Result<(), GuestCartError> {
        cart.last_updated = Timestamp::now();

        record::write(
            self.storage.as_ref(),
            GUEST_CART_KEY,
            &cart.items,
            cart.last_updated,
        )
    }

    /// Add `quantity` units of `product`, merging into an existing line.
    pub fn add_item(&self, product: ProductSnapshot, quantity: u32) -> GuestCart {
        let mut cart = self.load();

        if !cart.add(product, quantity, Timestamp::now()) {
            debug!("ignoring add of zero units");

            return cart;
        }

        self.persist(cart)
    }

    /// Set the quantity of a line; zero or less removes it.
    pub fn update_quantity(&self, product_id: &ProductId, quantity: i64) -> GuestCart {
        let mut cart = self.load();

        if !cart.set_quantity(product_id, quantity) {
            return cart;
        }

        self.persist(cart)
    }

    /// Remove a line if present.
    pub fn remove_item(&self, product_id: &ProductId) -> GuestCart {
        let mut cart = self.load();

        if !cart.remove(product_id) {
            return cart;
        }

        self.persist(cart)
    }

    /// Delete the stored record entirely.
    ///
    /// # Errors
    ///
    /// Returns a [`GuestCartError`] when the record could not be deleted.
    pub fn clear(&self) -> Result<(), GuestCartError> {
        self.storage.remove(GUEST_CART_KEY)?;

        Ok(())
    }

    /// Whether the stored cart holds any lines.
    #[must_use]
    pub fn has_items(&self) -> bool {
        !self.load().is_empty()
    }

    /// Lines that may be offered to the server after sign-in.
    ///
    /// Malformed stored lines are counted in [`TransferBatch::dropped`] and
    /// never returned. The record is left in place; the caller clears it once
    /// the transfer has settled.
    #[must_use]
    pub fn drain_for_transfer(&self) -> TransferBatch {
        let Some(decoded) = record::read(self.storage.as_ref(), GUEST_CART_KEY) else {
            return TransferBatch::default();
        };

        TransferBatch {
            lines: decoded
                .lines
                .into_iter()
                .map(|line| TransferLine {
                    product_id: line.id,
                    quantity: line.quantity,
                })
                .collect(),
            dropped: decoded.dropped,
        }
    }

    fn persist(&self, mut cart: GuestCart) -> GuestCart {
        if let Err(error) = self.save(&mut cart) {
            warn!(error = %error, "guest cart kept in memory only");
        }

        cart
    }
}

impl Debug for GuestCartStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GuestCartStore")
            .field("key", &GUEST_CART_KEY)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::storage::{MemoryLocalStorage, MockLocalStorage, StorageError};

    use super::*;

    fn store() -> (Arc<MemoryLocalStorage>, GuestCartStore) {
        let storage = Arc::new(MemoryLocalStorage::new());

        (storage.clone(), GuestCartStore::new(storage))
    }

    fn product(id: &str, price: u64) -> ProductSnapshot {
        ProductSnapshot::new(id, format!("Product {id}"), price)
    }

    #[test]
    fn load_without_record_is_empty() {
        let (_, store) = store();

        assert!(store.load().is_empty());
        assert!(!store.has_items());
    }

    #[test]
    fn load_recovers_from_corruption() -> TestResult {
        let (storage, store) = store();

        storage.set(GUEST_CART_KEY, "{\"lastUpdated\": \"2026-01-01T00:00:00Z\"}")?;

        let before = Timestamp::now();
        let cart = store.load();

        assert!(cart.is_empty());
        assert!(cart.last_updated >= before);

        storage.set(GUEST_CART_KEY, "{{{")?;

        assert!(store.load().is_empty());

        Ok(())
    }

    #[test]
    fn adds_accumulate_into_one_line() {
        let (_, store) = store();

        store.add_item(product("p1", 100), 1);
        store.add_item(product("p1", 100), 4);

        let cart = store.add_item(product("p1", 100), 2);

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items.first().map(|line| line.quantity), Some(7));
        assert_eq!(store.load().items, cart.items);
    }

    #[test]
    fn save_then_load_round_trips_items_in_order() -> TestResult {
        let (_, store) = store();
        let now = Timestamp::now();

        let mut cart = GuestCart::empty(now);

        cart.add(product("p2", 50), 1, now);
        cart.add(product("p1", 100).with_discount_price(90), 3, now);
        cart.add(product("p3", 10), 9, now);

        store.save(&mut cart)?;

        let loaded = store.load();

        assert_eq!(loaded.items, cart.items);
        assert_eq!(loaded.last_updated, cart.last_updated);

        Ok(())
    }

    #[test]
    fn zero_quantity_update_removes_line() {
        let (_, store) = store();

        store.add_item(product("p1", 100), 2);
        store.add_item(product("p2", 100), 1);

        let cart = store.update_quantity(&"p1".into(), 0);

        assert!(cart.line(&"p1".into()).is_none());
        assert!(store.load().line(&"p1".into()).is_none());
        assert!(cart.items.iter().all(|line| line.quantity > 0));
    }

    #[test]
    fn update_and_remove_of_missing_line_leave_record_untouched() {
        let mut storage = MockLocalStorage::new();

        storage.expect_get().times(2).returning(|_| Ok(None));
        storage.expect_set().never();
        storage.expect_remove().never();

        let store = GuestCartStore::new(Arc::new(storage));

        assert!(store.update_quantity(&"p1".into(), 3).is_empty());
        assert!(store.remove_item(&"p1".into()).is_empty());
    }

    #[test]
    fn write_failure_is_swallowed() {
        let mut storage = MockLocalStorage::new();

        storage.expect_get().returning(|_| Ok(None));
        storage
            .expect_set()
            .once()
            .returning(|_, _| Err(StorageError::Unavailable("quota exceeded".to_string())));

        let store = GuestCartStore::new(Arc::new(storage));

        let cart = store.add_item(product("p1", 100), 2);

        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn save_reports_write_failure() {
        let mut storage = MockLocalStorage::new();

        storage
            .expect_set()
            .once()
            .returning(|_, _| Err(StorageError::Unavailable("disabled".to_string())));

        let store = GuestCartStore::new(Arc::new(storage));
        let mut cart = GuestCart::empty(Timestamp::UNIX_EPOCH);

        let result = store.save(&mut cart);

        assert!(
            matches!(result, Err(GuestCartError::Storage(_))),
            "expected storage warning, got {result:?}"
        );
        assert!(cart.last_updated > Timestamp::UNIX_EPOCH);
    }

    #[test]
    fn clear_deletes_the_record() -> TestResult {
        let (storage, store) = store();

        store.add_item(product("p1", 100), 2);
        store.clear()?;

        assert!(storage.get(GUEST_CART_KEY)?.is_none());
        assert!(!store.has_items());

        Ok(())
    }

    #[test]
    fn drain_skips_malformed_lines_without_clearing() -> TestResult {
        let (storage, store) = store();

        storage.set(
            GUEST_CART_KEY,
            r#"{
                "items": [
                    {"id": "p1", "product": {"id": "p1", "name": "A", "price": 100}, "quantity": 2, "addedAt": "2026-01-01T00:00:00Z"},
                    {"id": "p2", "product": {"id": "p2", "name": "B", "price": 50}, "quantity": -1, "addedAt": "2026-01-01T00:00:00Z"},
                    {"id": "p3", "quantity": 1, "addedAt": "2026-01-01T00:00:00Z"}
                ],
                "lastUpdated": "2026-01-01T00:00:00Z"
            }"#,
        )?;

        let batch = store.drain_for_transfer();

        assert_eq!(
            batch.lines,
            vec![TransferLine {
                product_id: "p1".into(),
                quantity: 2,
            }]
        );
        assert_eq!(batch.dropped, 2);
        assert!(storage.get(GUEST_CART_KEY)?.is_some());

        Ok(())
    }
}
