//! Device-local carts: the anonymous guest cart and the per-user advisory snapshots.

mod errors;
mod record;
mod snapshots;
mod store;

pub use errors::GuestCartError;
pub use record::GUEST_CART_KEY;
pub use snapshots::UserCartSnapshots;
pub use store::GuestCartStore;
