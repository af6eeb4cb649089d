//! Session transition coordinator.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    domain::carts::TransferLine,
    guest::UserCartSnapshots,
    session::{AuthSession, UserId},
    state::{CartEvent, CartStore, LockedCart},
};

/// What happened to the guest cart when a user signed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Guest lines the server accepted
    pub transferred: usize,

    /// Guest lines the server did not accept; they are not retried
    pub failed: usize,

    /// Stored guest lines too malformed to offer
    pub dropped: usize,

    /// Whether the server cart was fetched afterwards
    pub fetched: bool,
}

/// Result of observing an authentication change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// Nothing changed; the session was already in that state.
    Unchanged,

    /// A user signed in and the guest cart was handed over.
    SignedIn(MergeReport),

    /// The user signed out and the guest cart took over.
    SignedOut,
}

/// Moves the cart between guest and authenticated mode as the auth session changes.
///
/// Each sign-in hands the guest cart to the server at most once: repeated
/// notifications for the user already signed in are ignored.
#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    cart: Arc<CartStore>,
    snapshots: UserCartSnapshots,
}

impl SessionCoordinator {
    /// Coordinate `cart`, keeping sign-out snapshots in `snapshots`.
    #[must_use]
    pub fn new(cart: Arc<CartStore>, snapshots: UserCartSnapshots) -> Self {
        Self { cart, snapshots }
    }

    /// Apply one authentication state.
    pub async fn observe(&self, session: &AuthSession) -> SessionChange {
        match session {
            AuthSession::Anonymous => self.logout().await,
            AuthSession::Authenticated(user) => self.login(user.clone()).await,
        }
    }

    /// Follow `sessions` until its sender is dropped.
    pub async fn run(&self, mut sessions: watch::Receiver<AuthSession>) {
        loop {
            let session = sessions.borrow_and_update().clone();

            self.observe(&session).await;

            if sessions.changed().await.is_err() {
                debug!("auth session stream closed");

                break;
            }
        }
    }

    /// Switch to `user`'s server cart, offering it the guest cart first.
    ///
    /// Does nothing when `user` is already signed in. A different signed-in
    /// user is signed out first.
    #[instrument(skip(self, user), fields(user = %user))]
    pub async fn login(&self, user: UserId) -> SessionChange {
        let mut cart = self.cart.lock().await;

        match cart.state().current_user().cloned() {
            Some(current) if current == user => {
                debug!("already signed in");

                return SessionChange::Unchanged;
            }
            Some(current) => {
                info!(previous = %current, "switching user");

                self.sign_out(&mut cart, &current);
            }
            None => {}
        }

        cart.apply(CartEvent::SignedIn(user.clone()));

        let batch = cart.guest().drain_for_transfer();

        let mut report = MergeReport {
            dropped: batch.dropped,
            ..MergeReport::default()
        };

        if batch.dropped > 0 {
            warn!(dropped = batch.dropped, "malformed guest lines not transferred");
        }

        if batch.is_empty() {
            if let Some(snapshot) = self.snapshots.load_for(&user) {
                debug!(lines = snapshot.items.len(), "showing snapshot until server answers");

                cart.apply(CartEvent::Provisional(snapshot.items));
            }
        } else {
            transfer(&mut cart, batch.lines, &mut report).await;
        }

        if batch.dropped > 0 || report.transferred + report.failed > 0 {
            clear_guest(&cart);
        }

        // Nothing adopted from the server yet.
        if report.transferred == 0 || report.failed > 0 {
            let service = cart.service();

            report.fetched = true;

            _ = cart.sync(service.fetch_cart()).await;
        }

        info!(
            transferred = report.transferred,
            failed = report.failed,
            dropped = report.dropped,
            "signed in"
        );

        SessionChange::SignedIn(report)
    }

    /// Switch back to the guest cart, keeping a snapshot of the departing user's cart.
    ///
    /// Signing out with an empty cart deletes the user's snapshot.
    /// Does nothing when nobody is signed in.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> SessionChange {
        let mut cart = self.cart.lock().await;

        let Some(user) = cart.state().current_user().cloned() else {
            debug!("already signed out");

            return SessionChange::Unchanged;
        };

        self.sign_out(&mut cart, &user);

        info!(user = %user, "signed out");

        SessionChange::SignedOut
    }

    fn sign_out(&self, cart: &mut LockedCart<'_>, user: &UserId) {
        let items = cart.state().items();

        // An empty cart replaces any older snapshot.
        let kept = if items.is_empty() {
            self.snapshots.clear_for(user)
        } else {
            self.snapshots.save_for(user, items)
        };

        if let Err(error) = kept {
            warn!(error = %error, "cart snapshot not updated");
        }

        let guest = cart.guest().load();

        cart.apply(CartEvent::SignedOut(guest));
    }
}

/// Offer each line once, in order. Failures are logged and not retried.
async fn transfer(
    cart: &mut LockedCart<'_>,
    lines: Vec<TransferLine>,
    report: &mut MergeReport,
) {
    let service = cart.service();

    for line in lines {
        cart.apply(CartEvent::RemoteStarted);

        match cart
            .call(service.add_item(line.product_id.clone(), line.quantity))
            .await
        {
            Ok(remote) => {
                report.transferred += 1;

                cart.adopt(remote);
            }
            Err(error) => {
                report.failed += 1;

                warn!(
                    product = %line.product_id,
                    quantity = line.quantity,
                    error = %error,
                    "guest line not transferred"
                );
            }
        }
    }
}

fn clear_guest(cart: &LockedCart<'_>) {
    if let Err(error) = cart.guest().clear() {
        warn!(error = %error, "guest cart not cleared after transfer");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use jiff::Timestamp;
    use mockall::{Sequence, predicate::eq};
    use testresult::TestResult;

    use crate::{
        domain::{
            carts::{CartLine, RemoteCart, RemoteCartLine},
            products::{ProductId, ProductSnapshot},
        },
        guest::{GUEST_CART_KEY, GuestCartStore},
        remote::{CartServiceError, MockCartService},
        state::{CartMode, SyncFailure, SyncState},
        storage::{LocalStorage, MemoryLocalStorage},
    };

    use super::*;

    struct Fixture {
        storage: Arc<MemoryLocalStorage>,
        guest: GuestCartStore,
        snapshots: UserCartSnapshots,
    }

    impl Fixture {
        fn new() -> Self {
            let storage = Arc::new(MemoryLocalStorage::new());

            Self {
                guest: GuestCartStore::new(storage.clone()),
                snapshots: UserCartSnapshots::new(storage.clone()),
                storage,
            }
        }

        fn coordinator(&self, service: MockCartService) -> (Arc<CartStore>, SessionCoordinator) {
            let cart = Arc::new(CartStore::new(
                self.guest.clone(),
                Arc::new(service),
                Duration::from_secs(15),
            ));

            (
                cart.clone(),
                SessionCoordinator::new(cart, self.snapshots.clone()),
            )
        }
    }

    fn product(id: &str, price: u64) -> ProductSnapshot {
        ProductSnapshot::new(id, format!("Product {id}"), price)
    }

    fn remote_cart(lines: &[(&str, u64, u32)]) -> RemoteCart {
        RemoteCart {
            id: "server".to_string(),
            items: lines
                .iter()
                .map(|&(id, price, quantity)| RemoteCartLine {
                    id: id.into(),
                    product: product(id, price),
                    quantity,
                    added_at: None,
                })
                .collect(),
            total_items: 0,
            subtotal: 0,
        }
    }

    #[tokio::test]
    async fn guest_cart_is_transferred_then_cleared() -> TestResult {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();
        let mut seq = Sequence::new();

        service
            .expect_add_item()
            .once()
            .in_sequence(&mut seq)
            .with(eq(ProductId::from("p1")), eq(2))
            .return_once(|_, _| Ok(remote_cart(&[("p1", 100, 2)])));
        service
            .expect_add_item()
            .once()
            .in_sequence(&mut seq)
            .with(eq(ProductId::from("p2")), eq(1))
            .return_once(|_, _| Ok(remote_cart(&[("p1", 100, 2), ("p2", 50, 1)])));
        service.expect_fetch_cart().never();

        let (cart, coordinator) = fixture.coordinator(service);

        cart.add_to_cart(product("p1", 100), 2).await;
        cart.add_to_cart(product("p2", 50), 1).await;

        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.subtotal(), 250);

        let change = coordinator.login("u1".into()).await;

        assert_eq!(
            change,
            SessionChange::SignedIn(MergeReport {
                transferred: 2,
                ..MergeReport::default()
            })
        );
        assert!(fixture.storage.get(GUEST_CART_KEY)?.is_none());
        assert_eq!(cart.snapshot().mode(), &CartMode::Authenticated("u1".into()));
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.sync_state(), SyncState::Idle);

        Ok(())
    }

    #[tokio::test]
    async fn guest_cart_is_cleared_even_when_transfers_fail() -> TestResult {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();

        service
            .expect_add_item()
            .once()
            .with(eq(ProductId::from("p1")), eq(2))
            .return_once(|_, _| Err(CartServiceError::Server(503)));
        service
            .expect_add_item()
            .once()
            .with(eq(ProductId::from("p2")), eq(1))
            .return_once(|_, _| Err(CartServiceError::Timeout));
        service
            .expect_fetch_cart()
            .once()
            .return_once(|| Ok(remote_cart(&[("p8", 10, 1)])));

        let (cart, coordinator) = fixture.coordinator(service);

        cart.add_to_cart(product("p1", 100), 2).await;
        cart.add_to_cart(product("p2", 50), 1).await;

        let change = coordinator.login("u1".into()).await;

        assert_eq!(
            change,
            SessionChange::SignedIn(MergeReport {
                failed: 2,
                fetched: true,
                ..MergeReport::default()
            })
        );
        assert!(fixture.storage.get(GUEST_CART_KEY)?.is_none());
        assert_eq!(cart.sync_state(), SyncState::Idle);
        assert_eq!(
            cart.items().first().map(|line| line.id.clone()),
            Some(ProductId::from("p8"))
        );

        Ok(())
    }

    #[tokio::test]
    async fn failed_merge_and_fetch_show_no_guest_lines() -> TestResult {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();

        service
            .expect_add_item()
            .once()
            .return_once(|_, _| Err(CartServiceError::Server(503)));
        service
            .expect_fetch_cart()
            .once()
            .return_once(|| Err(CartServiceError::Server(503)));

        let (cart, coordinator) = fixture.coordinator(service);

        cart.add_to_cart(product("p1", 100), 2).await;
        coordinator.login("u1".into()).await;

        assert!(fixture.storage.get(GUEST_CART_KEY)?.is_none());
        assert_eq!(cart.snapshot().mode(), &CartMode::Authenticated("u1".into()));
        assert!(cart.items().is_empty());
        assert_eq!(cart.sync_state(), SyncState::Error(SyncFailure::ServerError));

        Ok(())
    }

    #[tokio::test]
    async fn repeated_login_for_same_user_merges_once() {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();

        service
            .expect_add_item()
            .once()
            .return_once(|_, _| Ok(remote_cart(&[("p1", 100, 2)])));
        service.expect_fetch_cart().never();

        let (cart, coordinator) = fixture.coordinator(service);

        cart.add_to_cart(product("p1", 100), 2).await;

        let first = coordinator.login("u1".into()).await;
        let second = coordinator.login("u1".into()).await;
        let third = coordinator
            .observe(&AuthSession::Authenticated("u1".into()))
            .await;

        assert!(matches!(first, SessionChange::SignedIn(_)));
        assert_eq!(second, SessionChange::Unchanged);
        assert_eq!(third, SessionChange::Unchanged);
    }

    #[tokio::test]
    async fn empty_guest_cart_fetches_server_cart() {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();

        service.expect_add_item().never();
        service
            .expect_fetch_cart()
            .once()
            .return_once(|| Ok(remote_cart(&[("p3", 10, 5)])));

        let (cart, coordinator) = fixture.coordinator(service);

        let change = coordinator.login("u1".into()).await;

        assert_eq!(
            change,
            SessionChange::SignedIn(MergeReport {
                fetched: true,
                ..MergeReport::default()
            })
        );
        assert_eq!(cart.total_items(), 5);
        assert!(cart.snapshot().last_synced_at().is_some());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_provisional_snapshot() -> TestResult {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();

        service
            .expect_fetch_cart()
            .once()
            .return_once(|| Err(CartServiceError::Server(500)));

        let line = CartLine::new(product("p3", 10), 5, Timestamp::now());

        fixture.snapshots.save_for(&"u1".into(), std::slice::from_ref(&line))?;

        let (cart, coordinator) = fixture.coordinator(service);

        coordinator.login("u1".into()).await;

        assert_eq!(cart.items(), vec![line]);
        assert_eq!(cart.sync_state(), SyncState::Error(SyncFailure::ServerError));

        Ok(())
    }

    #[tokio::test]
    async fn only_valid_guest_lines_are_offered() -> TestResult {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();

        fixture.storage.set(
            GUEST_CART_KEY,
            r#"{
                "items": [
                    {"id": "p1", "product": {"id": "p1", "name": "A", "price": 100}, "quantity": 2, "addedAt": "2026-01-01T00:00:00Z"},
                    {"id": "", "product": {"id": "", "name": "B", "price": 100}, "quantity": 1, "addedAt": "2026-01-01T00:00:00Z"},
                    {"id": "p3", "quantity": 4, "addedAt": "2026-01-01T00:00:00Z"}
                ],
                "lastUpdated": "2026-01-01T00:00:00Z"
            }"#,
        )?;

        service
            .expect_add_item()
            .once()
            .with(eq(ProductId::from("p1")), eq(2))
            .return_once(|_, _| Ok(remote_cart(&[("p1", 100, 2)])));

        let (_, coordinator) = fixture.coordinator(service);

        let change = coordinator.login("u1".into()).await;

        assert_eq!(
            change,
            SessionChange::SignedIn(MergeReport {
                transferred: 1,
                dropped: 2,
                ..MergeReport::default()
            })
        );
        assert!(fixture.storage.get(GUEST_CART_KEY)?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn logout_snapshots_cart_and_restores_guest_cart() -> TestResult {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();

        service
            .expect_fetch_cart()
            .once()
            .return_once(|| Ok(remote_cart(&[("p3", 10, 5)])));

        let (cart, coordinator) = fixture.coordinator(service);

        coordinator.login("u1".into()).await;

        // Another tab added to the guest cart while signed in.
        fixture.guest.add_item(product("p5", 30), 1);

        let change = coordinator.logout().await;

        assert_eq!(change, SessionChange::SignedOut);
        assert_eq!(cart.snapshot().mode(), &CartMode::Guest);
        assert_eq!(cart.items(), fixture.guest.load().items);
        assert_eq!(cart.total_items(), 1);

        let snapshot = fixture.snapshots.load_for(&"u1".into());

        let kept = snapshot.map(|snapshot| {
            snapshot
                .items
                .into_iter()
                .map(|line| (line.id, line.quantity))
                .collect::<Vec<_>>()
        });

        assert_eq!(kept, Some(vec![(ProductId::from("p3"), 5)]));

        Ok(())
    }

    #[tokio::test]
    async fn empty_logout_discards_stale_snapshot() -> TestResult {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();
        let mut seq = Sequence::new();

        service
            .expect_fetch_cart()
            .once()
            .in_sequence(&mut seq)
            .return_once(|| Ok(remote_cart(&[])));
        service
            .expect_fetch_cart()
            .once()
            .in_sequence(&mut seq)
            .return_once(|| Err(CartServiceError::Timeout));

        let line = CartLine::new(product("p3", 10), 5, Timestamp::now());

        fixture.snapshots.save_for(&"u1".into(), std::slice::from_ref(&line))?;

        let (cart, coordinator) = fixture.coordinator(service);

        coordinator.login("u1".into()).await;

        assert!(cart.items().is_empty());

        coordinator.logout().await;

        assert!(fixture.snapshots.load_for(&"u1".into()).is_none());

        coordinator.login("u1".into()).await;

        assert!(cart.items().is_empty());
        assert_eq!(cart.sync_state(), SyncState::Error(SyncFailure::Network));

        Ok(())
    }

    #[tokio::test]
    async fn logout_when_signed_out_is_a_no_op() {
        let fixture = Fixture::new();
        let (_, coordinator) = fixture.coordinator(MockCartService::new());

        assert_eq!(coordinator.logout().await, SessionChange::Unchanged);
        assert_eq!(
            coordinator.observe(&AuthSession::Anonymous).await,
            SessionChange::Unchanged
        );
        assert!(fixture.storage.is_empty());
    }

    #[tokio::test]
    async fn switching_users_signs_out_first() {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();

        service
            .expect_fetch_cart()
            .times(2)
            .returning(|| Ok(remote_cart(&[("p3", 10, 5)])));

        let (cart, coordinator) = fixture.coordinator(service);

        coordinator.login("u1".into()).await;
        coordinator.login("u2".into()).await;

        assert!(fixture.snapshots.load_for(&"u1".into()).is_some());
        assert_eq!(cart.snapshot().current_user(), Some(&UserId::from("u2")));
    }

    #[tokio::test]
    async fn run_follows_session_stream() {
        let fixture = Fixture::new();
        let mut service = MockCartService::new();

        service
            .expect_fetch_cart()
            .once()
            .return_once(|| Ok(remote_cart(&[])));

        let (cart, coordinator) = fixture.coordinator(service);
        let (sender, receiver) = watch::channel(AuthSession::Anonymous);

        let task = tokio::spawn(async move { coordinator.run(receiver).await });

        sender.send_replace(AuthSession::Authenticated("u1".into()));
        sender.send_replace(AuthSession::Authenticated("u1".into()));

        drop(sender);

        _ = task.await;

        assert_eq!(cart.snapshot().current_user(), Some(&UserId::from("u1")));
    }
}
