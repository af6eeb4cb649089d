//! Cart store.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    future::Future,
    sync::Arc,
    time::Duration,
};

use jiff::Timestamp;
use tokio::{
    sync::{Mutex, MutexGuard, watch},
    time::timeout,
};
use tracing::{debug, warn};

use crate::{
    domain::{
        carts::{CartLine, GuestCart, RemoteCart},
        products::{ProductId, ProductSnapshot},
    },
    guest::GuestCartStore,
    remote::{CartService, CartServiceError},
    state::{CartEvent, CartState, SyncFailure, SyncState},
};

/// Default limit on a single cart service call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Something the shopper asked the cart to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    /// Add units of a product.
    Add {
        /// Product to add
        product: ProductSnapshot,

        /// Units to add; zero does nothing
        quantity: u32,
    },

    /// Set the quantity of a line; zero or less removes it.
    UpdateQuantity {
        /// Line to change
        line: ProductId,

        /// New quantity
        quantity: i64,
    },

    /// Remove a line.
    Remove {
        /// Line to remove
        line: ProductId,
    },

    /// Remove every line.
    Clear,

    /// Re-read the backing store.
    Refresh,
}

/// The live cart of a session.
///
/// Build one per application session at the composition root and share it.
/// Reads never wait; they see the most recently published state, including
/// `Loading` while a remote call is in flight.
pub struct CartStore {
    state: Mutex<CartState>,
    guest: GuestCartStore,
    remote: Arc<dyn CartService>,
    request_timeout: Duration,
    updates: watch::Sender<CartState>,
}

impl CartStore {
    /// Start a session in guest mode, showing whatever the guest store holds.
    #[must_use]
    pub fn new(
        guest: GuestCartStore,
        remote: Arc<dyn CartService>,
        request_timeout: Duration,
    ) -> Self {
        let state = CartState::new(guest.load());
        let (updates, _) = watch::channel(state.clone());

        Self {
            state: Mutex::new(state),
            guest,
            remote,
            request_timeout,
            updates,
        }
    }

    /// The most recently published state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.updates.borrow().clone()
    }

    /// Current lines.
    #[must_use]
    pub fn items(&self) -> Vec<CartLine> {
        self.updates.borrow().items().to_vec()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.updates.borrow().total_items()
    }

    /// Sum of line totals in minor units.
    #[must_use]
    pub fn subtotal(&self) -> u64 {
        self.updates.borrow().subtotal()
    }

    /// Progress of remote operations.
    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        self.updates.borrow().sync_state()
    }

    /// Receive every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.updates.subscribe()
    }

    /// Add `quantity` units of `product`.
    pub async fn add_to_cart(&self, product: ProductSnapshot, quantity: u32) -> SyncState {
        self.dispatch(CartCommand::Add { product, quantity }).await
    }

    /// Set the quantity of `line`; zero or less removes it.
    pub async fn update_quantity(&self, line: ProductId, quantity: i64) -> SyncState {
        self.dispatch(CartCommand::UpdateQuantity { line, quantity })
            .await
    }

    /// Remove `line`.
    pub async fn remove_from_cart(&self, line: ProductId) -> SyncState {
        self.dispatch(CartCommand::Remove { line }).await
    }

    /// Remove every line.
    pub async fn clear_cart(&self) -> SyncState {
        self.dispatch(CartCommand::Clear).await
    }

    /// Re-read the backing store.
    pub async fn refresh(&self) -> SyncState {
        self.dispatch(CartCommand::Refresh).await
    }

    /// Run `command` against the backing store of the current mode.
    ///
    /// Waits for earlier commands to settle first. Returns the sync state once
    /// the command has settled; remote failures are reported there and never
    /// retried.
    pub async fn dispatch(&self, command: CartCommand) -> SyncState {
        let mut cart = self.lock().await;

        if let CartCommand::Add { quantity: 0, .. } = command {
            debug!("ignoring add of zero units");

            return cart.state().sync_state();
        }

        if cart.state().current_user().is_some() {
            cart.run_remote_command(command).await;
        } else {
            cart.run_guest(command);
        }

        cart.state().sync_state()
    }

    /// Take exclusive access to the state until the guard drops.
    pub(crate) async fn lock(&self) -> LockedCart<'_> {
        LockedCart {
            store: self,
            state: self.state.lock().await,
        }
    }
}

impl Debug for CartStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CartStore")
            .field("state", &*self.updates.borrow())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a [`CartStore`]'s state.
pub(crate) struct LockedCart<'a> {
    store: &'a CartStore,
    state: MutexGuard<'a, CartState>,
}

impl LockedCart<'_> {
    pub(crate) fn state(&self) -> &CartState {
        &self.state
    }

    pub(crate) fn guest(&self) -> &GuestCartStore {
        &self.store.guest
    }

    pub(crate) fn service(&self) -> Arc<dyn CartService> {
        Arc::clone(&self.store.remote)
    }

    /// Apply `event` and publish the new state.
    pub(crate) fn apply(&mut self, event: CartEvent) {
        self.state.transition(event);
        self.store.updates.send_replace(self.state.clone());
    }

    /// Await `call` within the request timeout.
    pub(crate) async fn call<F>(&self, call: F) -> Result<RemoteCart, CartServiceError>
    where
        F: Future<Output = Result<RemoteCart, CartServiceError>>,
    {
        timeout(self.store.request_timeout, call)
            .await
            .unwrap_or(Err(CartServiceError::Timeout))
    }

    /// Adopt `cart` as the authoritative cart.
    pub(crate) fn adopt(&mut self, cart: RemoteCart) {
        let at = Timestamp::now();

        self.apply(CartEvent::RemoteSucceeded {
            items: cart.into_lines(at),
            at,
        });
    }

    /// Issue `call`, then adopt its cart or record its failure.
    pub(crate) async fn sync<F>(&mut self, call: F) -> Result<(), SyncFailure>
    where
        F: Future<Output = Result<RemoteCart, CartServiceError>>,
    {
        self.apply(CartEvent::RemoteStarted);

        match self.call(call).await {
            Ok(cart) => {
                self.adopt(cart);

                Ok(())
            }
            Err(error) => {
                let failure = SyncFailure::from(&error);

                warn!(error = %error, ?failure, "cart sync failed");

                self.apply(CartEvent::RemoteFailed(failure));

                Err(failure)
            }
        }
    }

    fn run_guest(&mut self, command: CartCommand) {
        let store = self.store;
        let guest = &store.guest;

        let cart = match command {
            CartCommand::Add { product, quantity } => guest.add_item(product, quantity),
            CartCommand::UpdateQuantity { line, quantity } => {
                guest.update_quantity(&line, quantity)
            }
            CartCommand::Remove { line } => guest.remove_item(&line),
            CartCommand::Clear => match guest.clear() {
                Ok(()) => GuestCart::empty(Timestamp::now()),
                Err(error) => {
                    warn!(error = %error, "guest cart record not deleted");

                    guest.load()
                }
            },
            CartCommand::Refresh => guest.load(),
        };

        self.apply(CartEvent::GuestMirrored(cart));
    }

    async fn run_remote_command(&mut self, command: CartCommand) {
        let service = self.service();

        // Failures are already recorded in the sync state.
        _ = match command {
            CartCommand::Add { product, quantity } => {
                self.sync(service.add_item(product.id, quantity)).await
            }
            CartCommand::UpdateQuantity { line, quantity } if quantity <= 0 => {
                self.sync(service.remove_item(line)).await
            }
            CartCommand::UpdateQuantity { line, quantity } => {
                let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

                self.sync(service.update_item_quantity(line, quantity)).await
            }
            CartCommand::Remove { line } => self.sync(service.remove_item(line)).await,
            CartCommand::Clear => self.sync(service.clear_cart()).await,
            CartCommand::Refresh => self.sync(service.fetch_cart()).await,
        };
    }
}
