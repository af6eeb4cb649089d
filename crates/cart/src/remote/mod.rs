//! Remote cart service.

mod errors;
mod http;
mod service;

pub use errors::CartServiceError;
pub use http::HttpCartService;
pub use service::*;
