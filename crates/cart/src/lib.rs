//! Storefront Cart
//!
//! Keeps a shopper's cart consistent across the anonymous, device-local guest
//! cart and the authenticated, server-side cart.
//!
//! - [`guest::GuestCartStore`] persists the guest cart and never fails a read.
//! - [`state::CartStore`] owns the live [`state::CartState`], routing commands
//!   to the guest store or the [`remote::CartService`] by mode.
//! - [`session::SessionCoordinator`] hands the guest cart to the server once
//!   per sign-in and restores it on sign-out.
//!
//! [`context::CartContext`] wires the three together.

pub mod config;
pub mod context;
pub mod domain;
pub mod guest;
pub mod ids;
pub mod observability;
pub mod remote;
pub mod session;
pub mod state;
pub mod storage;
