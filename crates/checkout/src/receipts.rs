//! Receipt lookups and sales reporting.

use chrono::{DateTime, Utc};
use common::ReceiptId;
use domain::{Purchaser, Receipt, ReceiptCode, SalesSummary};
use store::{ReceiptQuery, ReceiptStore, Result};

/// Read-only access to issued receipts.
#[derive(Clone)]
pub struct ReceiptService<R> {
    receipts: R,
}

impl<R> ReceiptService<R>
where
    R: ReceiptStore,
{
    pub fn new(receipts: R) -> Self {
        Self { receipts }
    }

    /// Returns a purchaser's receipts, newest first.
    pub async fn receipts_for(&self, purchaser: &Purchaser) -> Result<Vec<Receipt>> {
        self.receipts
            .find_receipts(ReceiptQuery::for_purchaser(purchaser.clone()))
            .await
    }

    pub async fn get_receipt(&self, receipt_id: ReceiptId) -> Result<Option<Receipt>> {
        self.receipts.get_receipt(receipt_id).await
    }

    pub async fn get_receipt_by_code(&self, code: &ReceiptCode) -> Result<Option<Receipt>> {
        self.receipts.get_receipt_by_code(code).await
    }

    /// Totals every receipt issued in `[from, to]`. Open ends are unbounded.
    #[tracing::instrument(skip(self))]
    pub async fn sales_summary(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<SalesSummary> {
        let mut query = ReceiptQuery::new();
        if let Some(from) = from {
            query = query.from_timestamp(from);
        }
        if let Some(to) = to {
            query = query.to_timestamp(to);
        }
        self.receipts.sales_summary(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::{ItemId, Money, PurchaseLine};
    use store::InMemoryStore;

    fn receipt(code: &str, purchaser: &str, cents: i64, at: DateTime<Utc>) -> Receipt {
        Receipt::issue(
            ReceiptCode::new(code).unwrap(),
            Purchaser::new(purchaser).unwrap(),
            vec![PurchaseLine {
                item_id: ItemId::new("A"),
                title: "Widget".to_string(),
                quantity: 1,
                unit_price: Money::from_cents(cents),
            }],
            at,
        )
    }

    #[tokio::test]
    async fn test_receipts_for_purchaser_newest_first() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .insert_receipt(&receipt("T-1", "alice@example.com", 100, now - Duration::days(2)))
            .await
            .unwrap();
        store
            .insert_receipt(&receipt("T-2", "alice@example.com", 200, now))
            .await
            .unwrap();
        store
            .insert_receipt(&receipt("T-3", "bob@example.com", 300, now))
            .await
            .unwrap();

        let service = ReceiptService::new(store);
        let alice = Purchaser::new("alice@example.com").unwrap();
        let receipts = service.receipts_for(&alice).await.unwrap();

        let codes: Vec<_> = receipts.iter().map(|r| r.code().as_str()).collect();
        assert_eq!(codes, vec!["T-2", "T-1"]);
    }

    #[tokio::test]
    async fn test_lookup_by_id_and_code() {
        let store = InMemoryStore::new();
        let issued = receipt("T-1", "alice@example.com", 100, Utc::now());
        store.insert_receipt(&issued).await.unwrap();
        let service = ReceiptService::new(store);

        assert_eq!(service.get_receipt(issued.id()).await.unwrap(), Some(issued.clone()));
        assert_eq!(
            service.get_receipt_by_code(issued.code()).await.unwrap(),
            Some(issued)
        );
        assert!(service.get_receipt(ReceiptId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sales_summary_in_range() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .insert_receipt(&receipt("T-1", "a@example.com", 1000, now - Duration::days(10)))
            .await
            .unwrap();
        store
            .insert_receipt(&receipt("T-2", "b@example.com", 300, now - Duration::days(1)))
            .await
            .unwrap();
        store
            .insert_receipt(&receipt("T-3", "c@example.com", 500, now))
            .await
            .unwrap();
        let service = ReceiptService::new(store);

        let recent = service
            .sales_summary(Some(now - Duration::days(2)), Some(now))
            .await
            .unwrap();
        assert_eq!(recent.total_orders, 2);
        assert_eq!(recent.total_sales.cents(), 800);
        assert_eq!(recent.average_order_value.cents(), 400);

        let all = service.sales_summary(None, None).await.unwrap();
        assert_eq!(all.total_orders, 3);

        let none = service
            .sales_summary(Some(now + Duration::days(1)), None)
            .await
            .unwrap();
        assert_eq!(none, SalesSummary::default());
    }
}
