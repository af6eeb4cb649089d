//! End-to-end sign-in and sign-out scenarios against a stub storefront API

use std::{sync::Arc, time::Duration};

use serde_json::json;
use tempfile::TempDir;
use testresult::TestResult;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

use storefront_cart::{
    context::CartContext,
    domain::products::ProductSnapshot,
    guest::GUEST_CART_KEY,
    remote::HttpCartService,
    session::{AuthSession, MergeReport, SessionChange},
    state::{CartMode, SyncFailure, SyncState},
    storage::{FsLocalStorage, LocalStorage},
};

struct Device {
    dir: TempDir,
    server: MockServer,
}

impl Device {
    async fn new() -> TestResult<Self> {
        Ok(Self {
            dir: TempDir::new()?,
            server: MockServer::start().await,
        })
    }

    fn storage(&self) -> FsLocalStorage {
        FsLocalStorage::new(self.dir.path())
    }

    fn context(&self) -> TestResult<CartContext> {
        let remote = HttpCartService::new(&self.server.uri(), Duration::from_secs(5))?;

        remote.set_bearer_token(Some("t0k3n".to_string()));

        Ok(CartContext::new(
            Arc::new(self.storage()),
            Arc::new(remote),
            Duration::from_secs(5),
        ))
    }
}

fn server_cart(lines: &[(&str, u64, u32)]) -> serde_json::Value {
    let items: Vec<_> = lines
        .iter()
        .map(|&(id, price, quantity)| {
            json!({
                "id": id,
                "product": {"id": id, "name": id, "price": price},
                "quantity": quantity
            })
        })
        .collect();

    json!({ "id": "server-cart", "items": items })
}

#[tokio::test]
async fn guest_cart_is_merged_once_and_cleared() -> TestResult {
    let device = Device::new().await?;

    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .and(body_json(json!({"productId": "p1", "quantity": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(server_cart(&[("p1", 100, 2)])))
        .expect(1)
        .mount(&device.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .and(body_json(json!({"productId": "p2", "quantity": 1})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(server_cart(&[("p1", 100, 2), ("p2", 50, 1)])),
        )
        .expect(1)
        .mount(&device.server)
        .await;

    let context = device.context()?;

    context.cart.add_to_cart(ProductSnapshot::new("p1", "A", 100), 2).await;
    context.cart.add_to_cart(ProductSnapshot::new("p2", "B", 50), 1).await;

    assert_eq!(context.cart.total_items(), 3);
    assert_eq!(context.cart.subtotal(), 250);

    let user = AuthSession::Authenticated("u1".into());
    let first = context.session.observe(&user).await;
    let second = context.session.observe(&user).await;

    assert_eq!(
        first,
        SessionChange::SignedIn(MergeReport {
            transferred: 2,
            ..MergeReport::default()
        })
    );
    assert_eq!(second, SessionChange::Unchanged);
    assert_eq!(context.cart.total_items(), 3);
    assert!(device.storage().get(GUEST_CART_KEY)?.is_none());

    Ok(())
}

#[tokio::test]
async fn failed_merge_still_clears_guest_cart() -> TestResult {
    let device = Device::new().await?;

    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&device.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&device.server)
        .await;

    let context = device.context()?;

    context.cart.add_to_cart(ProductSnapshot::new("p1", "A", 100), 2).await;
    context.session.login("u1".into()).await;

    assert!(device.storage().get(GUEST_CART_KEY)?.is_none());
    assert_eq!(
        context.cart.sync_state(),
        SyncState::Error(SyncFailure::ServerError)
    );
    assert!(context.cart.items().is_empty());

    Ok(())
}

#[tokio::test]
async fn guest_cart_persists_between_sessions() -> TestResult {
    let device = Device::new().await?;

    device
        .context()?
        .cart
        .add_to_cart(ProductSnapshot::new("p1", "A", 100), 3)
        .await;

    let next = device.context()?;

    assert_eq!(next.cart.total_items(), 3);
    assert_eq!(next.cart.snapshot().mode(), &CartMode::Guest);

    Ok(())
}

#[tokio::test]
async fn logout_restores_guest_cart_and_keeps_snapshot() -> TestResult {
    let device = Device::new().await?;

    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(server_cart(&[("p3", 10, 5)])))
        .mount(&device.server)
        .await;

    let context = device.context()?;

    context.session.login("u1".into()).await;

    assert_eq!(context.cart.total_items(), 5);

    assert_eq!(context.session.logout().await, SessionChange::SignedOut);
    assert_eq!(context.cart.snapshot().mode(), &CartMode::Guest);
    assert_eq!(context.cart.total_items(), 0);
    assert!(device.storage().get("storefront.cart.user.u1.v1")?.is_some());

    Ok(())
}
