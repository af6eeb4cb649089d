//! # Cart State
//!
//! [`CartState`] is a pure state machine: every change goes through
//! [`CartState::transition`] with a [`CartEvent`]. [`CartStore`] owns the one
//! live state of a session, turns [`CartCommand`]s into events by routing them
//! to the guest store or the cart service, and publishes each new state.
//!
//! ## Routing
//!
//! - **Guest**: the guest store is updated synchronously and its cart mirrored.
//! - **Authenticated**: the cart service is called and its full cart adopted.
//!   Nothing is patched locally while a call is in flight, and a failed call
//!   leaves the last known-good items in place.
//!
//! ## Ordering
//!
//! Commands are serialized per store: a command waits for any earlier command
//! (or sign-in merge) to settle before it runs, so responses can never be
//! adopted out of order.

mod machine;
mod store;

pub use machine::*;
pub use store::*;
