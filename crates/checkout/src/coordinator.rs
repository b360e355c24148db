//! Checkout coordinator for turning a cart into a receipt.

use std::time::Instant;

use common::CartId;
use domain::{ItemId, PurchaseLine, Purchaser};
use futures_util::future::join_all;
use store::{CartStore, InventoryStore, ReceiptStore, StoreError};

use crate::code::CodeGenerator;
use crate::error::{CheckoutError, Result};
use crate::notify::{NoopSink, OutcomeEvent, OutcomeSink};
use crate::outcome::{CheckoutOutcome, CheckoutStatus};
use crate::reconciler::{Reconciler, RejectedLine};
use crate::recorder::ReceiptRecorder;
use crate::steps;

/// Orchestrates a checkout.
///
/// The flow is load → reconcile → commit stock → record receipt → sync cart.
/// Stock decrements are never rolled back: once a line's stock is committed
/// it stays sold even if a later step fails.
pub struct CheckoutCoordinator<C, I, R, N = NoopSink>
where
    C: CartStore,
    I: InventoryStore,
    R: ReceiptStore,
    N: OutcomeSink,
{
    carts: C,
    inventory: I,
    reconciler: Reconciler<I>,
    recorder: ReceiptRecorder<R>,
    sink: N,
}

impl<C, I, R> CheckoutCoordinator<C, I, R, NoopSink>
where
    C: CartStore,
    I: InventoryStore + Clone,
    R: ReceiptStore,
{
    /// Creates a new checkout coordinator that publishes nowhere.
    pub fn new(carts: C, inventory: I, receipts: R) -> Self {
        Self {
            carts,
            reconciler: Reconciler::new(inventory.clone()),
            inventory,
            recorder: ReceiptRecorder::new(receipts),
            sink: NoopSink,
        }
    }
}

impl<C, I, R, N> CheckoutCoordinator<C, I, R, N>
where
    C: CartStore,
    I: InventoryStore,
    R: ReceiptStore,
    N: OutcomeSink,
{
    /// Replaces the outcome sink.
    pub fn with_sink<M: OutcomeSink>(self, sink: M) -> CheckoutCoordinator<C, I, R, M> {
        CheckoutCoordinator {
            carts: self.carts,
            inventory: self.inventory,
            reconciler: self.reconciler,
            recorder: self.recorder,
            sink,
        }
    }

    /// Replaces the receipt code generator.
    pub fn with_code_generator(mut self, codes: impl CodeGenerator + 'static) -> Self {
        self.recorder = self.recorder.with_code_generator(codes);
        self
    }

    /// Sets how many receipt codes are tried before giving up.
    pub fn with_code_attempts(mut self, attempts: u32) -> Self {
        self.recorder = self.recorder.with_max_attempts(attempts);
        self
    }

    /// Checks out a cart on behalf of a purchaser.
    ///
    /// Ownership is not checked here; callers authorize before calling and
    /// serialize concurrent checkouts of the same cart.
    #[tracing::instrument(skip(self), fields(purchaser = %purchaser))]
    pub async fn checkout(&self, cart_id: CartId, purchaser: &Purchaser) -> Result<CheckoutOutcome> {
        metrics::counter!("checkout_total").increment(1);
        let started = Instant::now();

        let result = self.run(cart_id, purchaser).await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);

        match &result {
            Ok(outcome) => {
                match outcome.status {
                    CheckoutStatus::Completed => {
                        metrics::counter!("checkout_completed").increment(1)
                    }
                    CheckoutStatus::Partial => metrics::counter!("checkout_partial").increment(1),
                    CheckoutStatus::NoStockAvailable => {
                        metrics::counter!("checkout_no_stock").increment(1)
                    }
                }
                tracing::info!(
                    %cart_id,
                    status = %outcome.status,
                    purchased = outcome.purchased.len(),
                    rejected = outcome.rejected.len(),
                    duration,
                    "checkout finished"
                );
            }
            Err(e) => {
                metrics::counter!("checkout_failed").increment(1);
                tracing::warn!(%cart_id, error = %e, "checkout failed");
            }
        }

        result
    }

    async fn run(&self, cart_id: CartId, purchaser: &Purchaser) -> Result<CheckoutOutcome> {
        // 1. Load
        tracing::debug!(step = steps::STEP_LOAD_CART, "checkout step started");
        let resolved = self
            .carts
            .load_cart_with_items(cart_id)
            .await?
            .ok_or(CheckoutError::CartNotFound(cart_id))?;

        if resolved.is_empty() {
            return Err(CheckoutError::EmptyCart(cart_id));
        }

        // 2. Reconcile
        tracing::debug!(step = steps::STEP_RECONCILE, "checkout step started");
        let reconciliation = self.reconciler.reconcile(&resolved.lines).await?;

        // 3. Short-circuit
        if !reconciliation.has_purchasable() {
            tracing::warn!(
                %cart_id,
                rejected = reconciliation.rejected.len(),
                "no cart line has enough stock"
            );
            return Ok(CheckoutOutcome::no_stock(cart_id, reconciliation.rejected));
        }

        // 4. Commit stock
        tracing::debug!(step = steps::STEP_COMMIT_STOCK, "checkout step started");
        let (purchased, raced) = self.commit_stock(cart_id, reconciliation.purchasable).await?;

        let mut rejected = reconciliation.rejected;
        rejected.extend(raced);
        let order: Vec<&ItemId> = resolved.cart.lines().iter().map(|l| &l.item_id).collect();
        rejected.sort_by_key(|line| order.iter().position(|id| **id == line.item_id));

        if purchased.is_empty() {
            tracing::warn!(%cart_id, "every purchasable line lost its stock race");
            return Ok(CheckoutOutcome::no_stock(cart_id, rejected));
        }

        // 5. Record
        tracing::debug!(step = steps::STEP_RECORD_RECEIPT, "checkout step started");
        let receipt = match self.recorder.record(purchaser, purchased.clone()).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::error!(
                    %cart_id,
                    committed = purchased.len(),
                    error = %e,
                    "receipt not recorded after stock was committed"
                );
                return Err(e.into());
            }
        };

        // 6. Sync cart
        tracing::debug!(step = steps::STEP_SYNC_CART, "checkout step started");
        let cart_sync_error = self.sync_cart(cart_id, &purchased).await;

        // 7. Done
        let status = if rejected.is_empty() {
            CheckoutStatus::Completed
        } else {
            CheckoutStatus::Partial
        };

        let outcome = CheckoutOutcome {
            cart_id,
            status,
            receipt: Some(receipt),
            purchased,
            rejected,
            cart_sync_error,
        };

        if let Some(event) = OutcomeEvent::from_outcome(&outcome)
            && let Err(e) = self.sink.publish(&event).await
        {
            tracing::warn!(%cart_id, error = %e, "failed to publish checkout outcome");
        }

        Ok(outcome)
    }

    /// Decrements stock for every line concurrently.
    ///
    /// Returns the lines that committed and the lines that lost a stock race,
    /// both in input order. Any other store error aborts after every
    /// decrement has settled.
    async fn commit_stock(
        &self,
        cart_id: CartId,
        lines: Vec<PurchaseLine>,
    ) -> Result<(Vec<PurchaseLine>, Vec<RejectedLine>)> {
        let decrements = lines
            .iter()
            .map(|line| self.inventory.decrement_stock(&line.item_id, line.quantity));
        let results = join_all(decrements).await;

        let mut committed = Vec::with_capacity(lines.len());
        let mut raced = Vec::new();
        let mut failure = None;

        for (line, result) in lines.into_iter().zip(results) {
            match result {
                Ok(remaining) => {
                    tracing::debug!(item_id = %line.item_id, remaining, "stock committed");
                    committed.push(line);
                }
                Err(StoreError::InsufficientStock { available, .. }) => {
                    metrics::counter!("checkout_stock_races").increment(1);
                    tracing::warn!(
                        item_id = %line.item_id,
                        requested = line.quantity,
                        available,
                        "stock changed since reconciliation"
                    );
                    raced.push(RejectedLine {
                        item_id: line.item_id,
                        title: Some(line.title),
                        requested: line.quantity,
                        available,
                    });
                }
                Err(StoreError::ItemNotFound(item_id)) => {
                    metrics::counter!("checkout_stock_races").increment(1);
                    tracing::warn!(%item_id, "item removed since reconciliation");
                    raced.push(RejectedLine {
                        item_id,
                        title: Some(line.title),
                        requested: line.quantity,
                        available: 0,
                    });
                }
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            tracing::error!(
                %cart_id,
                committed = committed.len(),
                error = %e,
                "aborting checkout with stock already committed"
            );
            return Err(e.into());
        }

        Ok((committed, raced))
    }

    /// Removes purchased lines from the cart, in order.
    ///
    /// Returns the first failure instead of propagating it.
    async fn sync_cart(&self, cart_id: CartId, purchased: &[PurchaseLine]) -> Option<String> {
        for line in purchased {
            if let Err(e) = self.carts.remove_line(cart_id, &line.item_id).await {
                metrics::counter!("cart_sync_failures").increment(1);
                tracing::warn!(
                    %cart_id,
                    item_id = %line.item_id,
                    error = %e,
                    "purchased line could not be removed from cart"
                );
                return Some(e.to_string());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use domain::{Cart, CatalogItem, Money};
    use store::InMemoryStore;

    use crate::error::NotifyError;

    type TestCoordinator<N = NoopSink> =
        CheckoutCoordinator<InMemoryStore, InMemoryStore, InMemoryStore, N>;

    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<OutcomeEvent>>>,
    }

    #[async_trait]
    impl OutcomeSink for RecordingSink {
        async fn publish(&self, event: &OutcomeEvent) -> std::result::Result<(), NotifyError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl OutcomeSink for FailingSink {
        async fn publish(&self, _event: &OutcomeEvent) -> std::result::Result<(), NotifyError> {
            Err(NotifyError::Delivery("smtp down".to_string()))
        }
    }

    fn item(id: &str, dollars: i64, stock: u32) -> CatalogItem {
        CatalogItem::new(id, format!("Item {id}"), Money::from_dollars(dollars), stock).unwrap()
    }

    fn alice() -> Purchaser {
        Purchaser::new("alice@example.com").unwrap()
    }

    async fn setup(items: Vec<CatalogItem>) -> (TestCoordinator, InMemoryStore) {
        let store = InMemoryStore::with_items(items).await;
        let coordinator = CheckoutCoordinator::new(store.clone(), store.clone(), store.clone());
        (coordinator, store)
    }

    async fn cart_with(store: &InMemoryStore, lines: &[(&str, u32)]) -> CartId {
        let mut cart = Cart::new(Some(alice()));
        for (id, qty) in lines {
            cart.add_line(*id, *qty).unwrap();
        }
        store.create_cart(&cart).await.unwrap()
    }

    #[tokio::test]
    async fn test_full_checkout() {
        let (coordinator, store) = setup(vec![item("A", 10, 5), item("B", 20, 5)]).await;
        let cart_id = cart_with(&store, &[("A", 2), ("B", 1)]).await;

        let outcome = coordinator.checkout(cart_id, &alice()).await.unwrap();

        assert_eq!(outcome.status, CheckoutStatus::Completed);
        assert!(outcome.success());
        assert_eq!(outcome.total_amount(), Money::from_dollars(40));
        assert_eq!(outcome.total_items(), 3);
        assert!(outcome.rejected.is_empty());
        assert!(outcome.cart_sync_error.is_none());

        let cart = store.get_cart(cart_id).await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert_eq!(store.stock_of(&ItemId::new("A")).await, Some(3));
        assert_eq!(store.stock_of(&ItemId::new("B")).await, Some(4));
    }

    #[tokio::test]
    async fn test_partial_checkout() {
        let (coordinator, store) = setup(vec![item("A", 10, 5), item("B", 20, 1)]).await;
        let cart_id = cart_with(&store, &[("A", 2), ("B", 3)]).await;

        let outcome = coordinator.checkout(cart_id, &alice()).await.unwrap();

        assert_eq!(outcome.status, CheckoutStatus::Partial);
        assert_eq!(outcome.total_amount(), Money::from_dollars(20));
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].shortfall(), 2);

        let cart = store.get_cart(cart_id).await.unwrap().unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].item_id.as_str(), "B");
    }

    #[tokio::test]
    async fn test_no_stock_leaves_everything_untouched() {
        let (coordinator, store) = setup(vec![item("A", 10, 0)]).await;
        let cart_id = cart_with(&store, &[("A", 1)]).await;

        let outcome = coordinator.checkout(cart_id, &alice()).await.unwrap();

        assert_eq!(outcome.status, CheckoutStatus::NoStockAvailable);
        assert!(outcome.receipt.is_none());
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(store.receipt_count().await, 0);
        assert_eq!(store.get_cart(cart_id).await.unwrap().unwrap().lines().len(), 1);
    }

    #[tokio::test]
    async fn test_cart_not_found() {
        let (coordinator, _) = setup(vec![]).await;
        let result = coordinator.checkout(CartId::new(), &alice()).await;
        assert!(matches!(result, Err(CheckoutError::CartNotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_cart() {
        let (coordinator, store) = setup(vec![]).await;
        let cart_id = cart_with(&store, &[]).await;

        let result = coordinator.checkout(cart_id, &alice()).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart(_))));
        assert_eq!(store.receipt_count().await, 0);
    }

    #[tokio::test]
    async fn test_cart_sync_failure_is_degraded_success() {
        let (coordinator, store) = setup(vec![item("A", 10, 5)]).await;
        let cart_id = cart_with(&store, &[("A", 2)]).await;
        store.set_fail_cart_writes(true);

        let outcome = coordinator.checkout(cart_id, &alice()).await.unwrap();

        assert_eq!(outcome.status, CheckoutStatus::Completed);
        assert!(outcome.receipt.is_some());
        assert!(outcome.is_degraded());
        assert_eq!(store.receipt_count().await, 1);
        assert_eq!(store.stock_of(&ItemId::new("A")).await, Some(3));
    }

    #[tokio::test]
    async fn test_record_failure_keeps_committed_stock() {
        let (coordinator, store) = setup(vec![item("A", 10, 5)]).await;
        let cart_id = cart_with(&store, &[("A", 2)]).await;
        store.set_fail_receipt_inserts(true);

        let result = coordinator.checkout(cart_id, &alice()).await;

        assert!(matches!(result, Err(CheckoutError::Record(_))));
        assert_eq!(store.stock_of(&ItemId::new("A")).await, Some(3));
        assert_eq!(store.get_cart(cart_id).await.unwrap().unwrap().lines().len(), 1);
    }

    #[tokio::test]
    async fn test_publishes_outcome() {
        let (coordinator, store) = setup(vec![item("A", 10, 5)]).await;
        let sink = RecordingSink::default();
        let coordinator = coordinator.with_sink(sink.clone());
        let cart_id = cart_with(&store, &[("A", 1)]).await;

        let outcome = coordinator.checkout(cart_id, &alice()).await.unwrap();

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            &events[0].receipt_code,
            outcome.receipt.as_ref().unwrap().code()
        );
        assert_eq!(events[0].status, CheckoutStatus::Completed);
    }

    #[tokio::test]
    async fn test_no_stock_is_not_published() {
        let (coordinator, store) = setup(vec![item("A", 10, 0)]).await;
        let sink = RecordingSink::default();
        let coordinator = coordinator.with_sink(sink.clone());
        let cart_id = cart_with(&store, &[("A", 1)]).await;

        coordinator.checkout(cart_id, &alice()).await.unwrap();
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let (coordinator, store) = setup(vec![item("A", 10, 5)]).await;
        let coordinator = coordinator.with_sink(FailingSink);
        let cart_id = cart_with(&store, &[("A", 1)]).await;

        let outcome = coordinator.checkout(cart_id, &alice()).await.unwrap();
        assert!(outcome.success());
    }
}
