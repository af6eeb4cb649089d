//! Cart Context

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    config::StorefrontConfig,
    guest::{GuestCartStore, UserCartSnapshots},
    remote::{CartService, CartServiceError, HttpCartService},
    session::SessionCoordinator,
    state::CartStore,
    storage::{FsLocalStorage, LocalStorage},
};

/// Errors raised while wiring up a [`CartContext`].
#[derive(Debug, Error)]
pub enum CartInitError {
    /// The cart API client could not be built.
    #[error("failed to build cart api client")]
    Remote(#[source] CartServiceError),
}

/// One cart session: the live store and the coordinator that moves it
/// between guest and authenticated mode.
#[derive(Debug, Clone)]
pub struct CartContext {
    /// Live cart
    pub cart: Arc<CartStore>,

    /// Sign-in and sign-out hand-off
    pub session: SessionCoordinator,
}

impl CartContext {
    /// Wire a session over `storage` and `remote`.
    #[must_use]
    pub fn new(
        storage: Arc<dyn LocalStorage>,
        remote: Arc<dyn CartService>,
        request_timeout: Duration,
    ) -> Self {
        let guest = GuestCartStore::new(Arc::clone(&storage));
        let snapshots = UserCartSnapshots::new(storage);
        let cart = Arc::new(CartStore::new(guest, remote, request_timeout));

        Self {
            session: SessionCoordinator::new(Arc::clone(&cart), snapshots),
            cart,
        }
    }

    /// Build a session against the configured API, storing records under the
    /// configured cart directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the API base URL is unusable.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, CartInitError> {
        let timeout = config.request_timeout();
        let remote =
            HttpCartService::new(&config.api_url, timeout).map_err(CartInitError::Remote)?;

        remote.set_bearer_token(config.token.clone());

        Ok(Self::new(
            Arc::new(FsLocalStorage::new(&config.cart_dir)),
            Arc::new(remote),
            timeout,
        ))
    }
}
