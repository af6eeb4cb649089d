//! Carts

pub mod models;

pub use models::*;
