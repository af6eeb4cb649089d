//! Cart service errors.

use thiserror::Error;

/// Errors returned by a [`CartService`](super::CartService).
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// No credentials, or the server refused them.
    #[error("not authorised")]
    Unauthorized,

    /// The server rejected the request as invalid.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The server failed to handle the request.
    #[error("server error (status {0})")]
    Server(u16),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The request could not be sent or the response not received.
    #[error("transport error")]
    Transport(#[source] reqwest::Error),

    /// The response body was not a cart.
    #[error("unexpected response body")]
    Decode(#[source] reqwest::Error),

    /// The configured base URL cannot address cart endpoints.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
}

impl From<reqwest::Error> for CartServiceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }

        if error.is_decode() {
            return Self::Decode(error);
        }

        Self::Transport(error)
    }
}
