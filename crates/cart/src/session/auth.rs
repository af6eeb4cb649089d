//! Authentication session values.

use crate::ids::TypedId;

/// Marker for shopper identifiers.
#[derive(Debug)]
pub enum Shopper {}

/// Identity of an authenticated shopper.
pub type UserId = TypedId<Shopper>;

/// Authentication state as reported by the storefront's auth layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthSession {
    /// Nobody is signed in.
    #[default]
    Anonymous,

    /// `UserId` is signed in.
    Authenticated(UserId),
}

impl AuthSession {
    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }
}
