//! Cart state machine.

use jiff::Timestamp;
use tracing::debug;

use crate::{
    domain::carts::{self, CartLine, GuestCart},
    remote::CartServiceError,
    session::UserId,
};

/// Why the last remote cart operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFailure {
    /// The server could not be reached in time.
    Network,

    /// The session is missing or was refused.
    Unauthorized,

    /// The server failed or answered with something unexpected.
    ServerError,

    /// The server rejected the request.
    ValidationError,
}

impl From<&CartServiceError> for SyncFailure {
    fn from(error: &CartServiceError) -> Self {
        match error {
            CartServiceError::Unauthorized => Self::Unauthorized,
            CartServiceError::Rejected(_) => Self::ValidationError,
            CartServiceError::Server(_) | CartServiceError::Decode(_) => Self::ServerError,
            CartServiceError::Timeout
            | CartServiceError::Transport(_)
            | CartServiceError::InvalidBaseUrl(_) => Self::Network,
        }
    }
}

/// Progress of remote cart operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing outstanding.
    #[default]
    Idle,

    /// A remote call is in flight.
    Loading,

    /// The last remote call failed. Items hold the last known-good cart.
    Error(SyncFailure),
}

/// Which store backs the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CartMode {
    /// Device-local guest cart.
    #[default]
    Guest,

    /// Server cart of the signed-in user.
    Authenticated(UserId),
}

/// Everything that can change a [`CartState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// The guest store changed; mirror its lines.
    GuestMirrored(GuestCart),

    /// A remote call was issued.
    RemoteStarted,

    /// A remote call returned the server cart.
    RemoteSucceeded {
        /// Server lines, adopted wholesale
        items: Vec<CartLine>,

        /// When the response arrived
        at: Timestamp,
    },

    /// A remote call failed.
    RemoteFailed(SyncFailure),

    /// A user signed in. Guest lines are not shown in the server cart's place.
    SignedIn(UserId),

    /// The user signed out; the guest cart takes over.
    SignedOut(GuestCart),

    /// Lines known from an earlier session, shown until the server answers.
    Provisional(Vec<CartLine>),
}

/// The current cart and where it lives.
///
/// Totals are derived from `items` on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    items: Vec<CartLine>,
    mode: CartMode,
    sync: SyncState,
    last_synced_at: Option<Timestamp>,
}

impl CartState {
    /// Initial state of a session: guest mode showing `guest`.
    #[must_use]
    pub fn new(guest: GuestCart) -> Self {
        Self {
            items: guest.items,
            ..Self::default()
        }
    }

    /// Lines in display order.
    #[must_use]
    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    /// Backing store of the cart.
    #[must_use]
    pub fn mode(&self) -> &CartMode {
        &self.mode
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<&UserId> {
        match &self.mode {
            CartMode::Guest => None,
            CartMode::Authenticated(user) => Some(user),
        }
    }

    /// Progress of remote operations.
    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        self.sync
    }

    /// When the server cart was last adopted.
    #[must_use]
    pub fn last_synced_at(&self) -> Option<Timestamp> {
        self.last_synced_at
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        carts::total_items(&self.items)
    }

    /// Sum of line totals in minor units.
    #[must_use]
    pub fn subtotal(&self) -> u64 {
        carts::subtotal(&self.items)
    }

    /// Apply `event`.
    pub fn transition(&mut self, event: CartEvent) {
        match (event, &self.mode) {
            (CartEvent::GuestMirrored(guest), CartMode::Guest) => self.items = guest.items,
            (CartEvent::GuestMirrored(_), CartMode::Authenticated(_)) => {
                debug!("ignoring guest cart while signed in");
            }
            (CartEvent::RemoteStarted, _) => self.sync = SyncState::Loading,
            (CartEvent::RemoteSucceeded { items, at }, CartMode::Authenticated(_)) => {
                self.items = items;
                self.sync = SyncState::Idle;
                self.last_synced_at = Some(at);
            }
            (CartEvent::RemoteSucceeded { .. }, CartMode::Guest) => {
                debug!("ignoring server cart while signed out");
                self.sync = SyncState::Idle;
            }
            (CartEvent::RemoteFailed(failure), _) => self.sync = SyncState::Error(failure),
            (CartEvent::SignedIn(user), _) => {
                self.mode = CartMode::Authenticated(user);
                self.items.clear();
                self.sync = SyncState::Idle;
                self.last_synced_at = None;
            }
            (CartEvent::SignedOut(guest), _) => {
                self.mode = CartMode::Guest;
                self.items = guest.items;
                self.sync = SyncState::Idle;
                self.last_synced_at = None;
            }
            (CartEvent::Provisional(items), CartMode::Authenticated(_)) => self.items = items,
            (CartEvent::Provisional(_), CartMode::Guest) => {
                debug!("ignoring provisional cart while signed out");
            }
        }
    }
}
