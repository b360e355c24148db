//! Checkout outcome notifications.
//!
//! Sinks receive an event after every checkout that issued a receipt.
//! Delivery (e-mail, websockets, ...) is left to subscribers outside the core.

use async_trait::async_trait;
use common::CartId;
use domain::{Money, Purchaser, ReceiptCode};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::NotifyError;
use crate::outcome::{CheckoutOutcome, CheckoutStatus};

/// Summary of a checkout that issued a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeEvent {
    pub cart_id: CartId,
    pub purchaser: Purchaser,
    pub receipt_code: ReceiptCode,
    pub status: CheckoutStatus,
    pub total_amount: Money,
    pub total_items: u64,
}

impl OutcomeEvent {
    /// Builds an event from an outcome. Returns None if no receipt was issued.
    pub fn from_outcome(outcome: &CheckoutOutcome) -> Option<Self> {
        let receipt = outcome.receipt.as_ref()?;
        Some(Self {
            cart_id: outcome.cart_id,
            purchaser: receipt.purchaser().clone(),
            receipt_code: receipt.code().clone(),
            status: outcome.status,
            total_amount: receipt.total_amount(),
            total_items: receipt.total_items(),
        })
    }
}

/// Receives checkout outcomes.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    async fn publish(&self, event: &OutcomeEvent) -> Result<(), NotifyError>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl OutcomeSink for NoopSink {
    async fn publish(&self, _event: &OutcomeEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Fans events out over a tokio broadcast channel.
///
/// Publishing with no subscribers succeeds; lagging subscribers lose the
/// oldest events.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<OutcomeEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutcomeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl OutcomeSink for BroadcastSink {
    async fn publish(&self, event: &OutcomeEvent) -> Result<(), NotifyError> {
        // Err only means nobody is listening
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(code = %event.receipt_code, "no outcome subscribers");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{ItemId, PurchaseLine, Receipt};

    fn outcome() -> CheckoutOutcome {
        let lines = vec![PurchaseLine {
            item_id: ItemId::new("A"),
            title: "Widget".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(1000),
        }];
        let receipt = Receipt::issue(
            ReceiptCode::new("TICKET-1-1").unwrap(),
            Purchaser::new("alice@example.com").unwrap(),
            lines.clone(),
            Utc::now(),
        );
        CheckoutOutcome {
            cart_id: CartId::new(),
            status: CheckoutStatus::Completed,
            receipt: Some(receipt),
            purchased: lines,
            rejected: vec![],
            cart_sync_error: None,
        }
    }

    #[test]
    fn test_event_from_outcome() {
        let event = OutcomeEvent::from_outcome(&outcome()).unwrap();
        assert_eq!(event.receipt_code.as_str(), "TICKET-1-1");
        assert_eq!(event.total_amount.cents(), 2000);
        assert_eq!(event.total_items, 2);

        let no_stock = CheckoutOutcome::no_stock(CartId::new(), vec![]);
        assert!(OutcomeEvent::from_outcome(&no_stock).is_none());
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers() {
        let sink = BroadcastSink::new(4);
        let event = OutcomeEvent::from_outcome(&outcome()).unwrap();

        assert_eq!(sink.subscriber_count(), 0);
        assert!(sink.publish(&event).await.is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let sink = BroadcastSink::new(4);
        let mut rx1 = sink.subscribe();
        let mut rx2 = sink.subscribe();
        let event = OutcomeEvent::from_outcome(&outcome()).unwrap();

        sink.publish(&event).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }
}
