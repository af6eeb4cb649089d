//! HTTP client for the storefront cart API.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::{PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use zeroize::Zeroizing;

use crate::{
    domain::{carts::RemoteCart, products::ProductId},
    remote::{CartService, CartServiceError},
};

/// [`CartService`] backed by the storefront REST API.
///
/// Requests carry `Authorization: Bearer <token>`. Without a token every call
/// fails with [`CartServiceError::Unauthorized`] before touching the network.
pub struct HttpCartService {
    base_url: Url,
    http: Client,
    token: RwLock<Option<Zeroizing<String>>>,
}

impl HttpCartService {
    /// Create a client for the API at `base_url`, giving up on requests after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when `base_url` is not a usable base URL or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CartServiceError> {
        let base_url = Url::parse(base_url)
            .map_err(|error| CartServiceError::InvalidBaseUrl(error.to_string()))?;

        if base_url.cannot_be_a_base() {
            return Err(CartServiceError::InvalidBaseUrl(base_url.to_string()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CartServiceError::Transport)?;

        Ok(Self {
            base_url,
            http,
            token: RwLock::new(None),
        })
    }

    /// Replace the bearer token sent with each request. `None` signs the client out.
    pub fn set_bearer_token(&self, token: Option<String>) {
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);

        *slot = token.map(Zeroizing::new);
    }

    fn bearer_token(&self) -> Result<Zeroizing<String>, CartServiceError> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(CartServiceError::Unauthorized)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CartServiceError> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|()| CartServiceError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, CartServiceError> {
        let token = self.bearer_token()?;
        let url = self.endpoint(segments)?;

        debug!(%method, %url, "cart request");

        Ok(self.http.request(method, url).bearer_auth(token.as_str()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<RemoteCart, CartServiceError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            return Err(classify_status(status, text));
        }

        let envelope: CartEnvelope = response.json().await?;

        Ok(envelope.into_cart())
    }
}

impl Debug for HttpCartService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let signed_in = self
            .token
            .read()
            .is_ok_and(|token| token.is_some());

        f.debug_struct("HttpCartService")
            .field("base_url", &self.base_url.as_str())
            .field("signed_in", &signed_in)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CartService for HttpCartService {
    async fn fetch_cart(&self) -> Result<RemoteCart, CartServiceError> {
        self.send(self.request(Method::GET, &["cart"])?).await
    }

    async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, CartServiceError> {
        let request = self
            .request(Method::POST, &["cart", "items"])?
            .json(&json!({ "productId": product_id, "quantity": quantity }));

        self.send(request).await
    }

    async fn update_item_quantity(
        &self,
        line_id: ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, CartServiceError> {
        let request = self
            .request(Method::PATCH, &["cart", "items", line_id.as_str()])?
            .json(&json!({ "quantity": quantity }));

        self.send(request).await
    }

    async fn remove_item(&self, line_id: ProductId) -> Result<RemoteCart, CartServiceError> {
        self.send(self.request(Method::DELETE, &["cart", "items", line_id.as_str()])?)
            .await
    }

    async fn clear_cart(&self) -> Result<RemoteCart, CartServiceError> {
        self.send(self.request(Method::DELETE, &["cart"])?).await
    }
}

/// Cart bodies arrive bare or wrapped in `cart` / `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CartEnvelope {
    Cart { cart: RemoteCart },
    Data { data: RemoteCart },
    Bare(RemoteCart),
}

impl CartEnvelope {
    fn into_cart(self) -> RemoteCart {
        match self {
            Self::Cart { cart } | Self::Data { data: cart } | Self::Bare(cart) => cart,
        }
    }
}

fn classify_status(status: StatusCode, text: String) -> CartServiceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CartServiceError::Unauthorized,
        StatusCode::BAD_REQUEST
        | StatusCode::NOT_FOUND
        | StatusCode::CONFLICT
        | StatusCode::UNPROCESSABLE_ENTITY => CartServiceError::Rejected(if text.is_empty() {
            status.to_string()
        } else {
            text
        }),
        other => CartServiceError::Server(other.as_u16()),
    }
}
