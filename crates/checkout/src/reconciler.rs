//! Read-only stock reconciliation.

use domain::{ItemId, PurchaseLine, ResolvedLine};
use serde::Serialize;
use store::{InventoryStore, StoreError};

/// A cart line that could not be fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedLine {
    pub item_id: ItemId,
    /// `None` when the catalog no longer has the item.
    pub title: Option<String>,
    pub requested: u32,
    pub available: u32,
}

impl RejectedLine {
    /// Returns how many units were missing. Never negative.
    pub fn shortfall(&self) -> u32 {
        self.requested.saturating_sub(self.available)
    }
}

/// Result of comparing a cart with live stock.
///
/// Both lists keep cart order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub purchasable: Vec<PurchaseLine>,
    pub rejected: Vec<RejectedLine>,
}

impl Reconciliation {
    pub fn has_purchasable(&self) -> bool {
        !self.purchasable.is_empty()
    }
}

/// Splits resolved cart lines into purchasable and rejected sets.
///
/// Stock readings are hints; the orchestrator re-checks them when it
/// decrements. Lines are never split: a line moves over in full or not at all.
#[derive(Clone)]
pub struct Reconciler<I> {
    inventory: I,
}

impl<I> Reconciler<I>
where
    I: InventoryStore,
{
    pub fn new(inventory: I) -> Self {
        Self { inventory }
    }

    /// Reads current stock for every line and classifies it.
    ///
    /// Missing or inactive items are rejected with `available = 0`.
    /// Unexpected store errors propagate.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn reconcile(&self, lines: &[ResolvedLine]) -> Result<Reconciliation, StoreError> {
        let mut reconciliation = Reconciliation::default();

        for resolved in lines {
            let requested = resolved.line.quantity;

            let Some(item) = resolved.item.as_ref().filter(|item| item.active) else {
                reconciliation.rejected.push(RejectedLine {
                    item_id: resolved.line.item_id.clone(),
                    title: resolved.item.as_ref().map(|item| item.title.clone()),
                    requested,
                    available: 0,
                });
                continue;
            };

            let available = match self.inventory.read_stock(&item.id).await {
                Ok(stock) => stock,
                Err(StoreError::ItemNotFound(_)) => 0,
                Err(e) => return Err(e),
            };

            if available >= requested {
                reconciliation.purchasable.push(PurchaseLine {
                    item_id: item.id.clone(),
                    title: item.title.clone(),
                    quantity: requested,
                    unit_price: item.price,
                });
            } else {
                reconciliation.rejected.push(RejectedLine {
                    item_id: item.id.clone(),
                    title: Some(item.title.clone()),
                    requested,
                    available,
                });
            }
        }

        Ok(reconciliation)
    }
}
