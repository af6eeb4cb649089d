//! Sign-in and sign-out hand-off between the guest cart and the server cart.

mod auth;
mod coordinator;

pub use auth::*;
pub use coordinator::*;
