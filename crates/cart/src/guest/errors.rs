//! Guest cart errors.

use thiserror::Error;

use crate::storage::StorageError;

/// Failure to persist a device-local cart. Never fatal: the in-memory cart
/// stays usable and the failure is reported as a warning.
#[derive(Debug, Error)]
pub enum GuestCartError {
    /// The storage backend refused the write.
    #[error("cart not persisted")]
    Storage(#[from] StorageError),

    /// The cart could not be encoded.
    #[error("cart could not be encoded")]
    Encode(#[from] serde_json::Error),
}
