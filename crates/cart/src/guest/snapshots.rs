//! Per-user advisory cart snapshots.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use jiff::Timestamp;

use crate::{
    domain::carts::{CartLine, GuestCart},
    guest::{GuestCartError, record},
    session::UserId,
    storage::LocalStorage,
};

/// Last known cart of each user who signed out on this device.
///
/// Snapshots are advisory only. They let a returning user see something
/// before the server answers, and are always superseded by the server cart.
#[derive(Clone)]
pub struct UserCartSnapshots {
    storage: Arc<dyn LocalStorage>,
}

impl UserCartSnapshots {
    /// Keep snapshots in `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Write the snapshot for `user`.
    ///
    /// # Errors
    ///
    /// Returns a [`GuestCartError`] when the write fails.
    pub fn save_for(&self, user: &UserId, items: &[CartLine]) -> Result<(), GuestCartError> {
        record::write(
            self.storage.as_ref(),
            &record::user_cart_key(user),
            items,
            Timestamp::now(),
        )
    }

    /// Read the snapshot for `user`, if one exists and holds any lines.
    #[must_use]
    pub fn load_for(&self, user: &UserId) -> Option<GuestCart> {
        let cart = record::read_cart(
            self.storage.as_ref(),
            &record::user_cart_key(user),
            Timestamp::now(),
        );

        (!cart.is_empty()).then_some(cart)
    }

    /// Delete the snapshot for `user`.
    ///
    /// # Errors
    ///
    /// Returns a [`GuestCartError`] when the record could not be deleted.
    pub fn clear_for(&self, user: &UserId) -> Result<(), GuestCartError> {
        self.storage.remove(&record::user_cart_key(user))?;

        Ok(())
    }
}

impl Debug for UserCartSnapshots {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("UserCartSnapshots").finish_non_exhaustive()
    }
}
