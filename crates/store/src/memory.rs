use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{CartId, ReceiptId};
use domain::{
    Cart, CatalogItem, ItemId, Money, Receipt, ReceiptCode, ResolvedCart, ResolvedLine,
    SalesSummary,
};
use tokio::sync::RwLock;

use crate::{
    ReceiptQuery, Result, StoreError,
    store::{CartStore, InventoryStore, ReceiptStore},
};

#[derive(Default)]
struct MemoryState {
    carts: HashMap<CartId, Cart>,
    items: HashMap<ItemId, CatalogItem>,
    receipts: Vec<Receipt>,
}

/// Failure switches for exercising error paths in tests.
#[derive(Default)]
struct Faults {
    cart_writes: AtomicBool,
    receipt_inserts: AtomicBool,
}

/// In-memory storefront store.
///
/// One handle implements the cart, inventory and receipt contracts, like a
/// single document database would. Clones share the same data. Every stock
/// decrement runs under the write lock, which makes it linearizable per item.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with catalog items.
    pub async fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write().await;
            for item in items {
                state.items.insert(item.id.clone(), item);
            }
        }
        store
    }

    /// Makes every cart write (`save_cart`, `remove_line`) fail while set.
    pub fn set_fail_cart_writes(&self, fail: bool) {
        self.faults.cart_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every receipt insert fail while set.
    pub fn set_fail_receipt_inserts(&self, fail: bool) {
        self.faults.receipt_inserts.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of receipts stored.
    pub async fn receipt_count(&self) -> usize {
        self.state.read().await.receipts.len()
    }

    /// Returns the stock of an item, if it exists.
    pub async fn stock_of(&self, item_id: &ItemId) -> Option<u32> {
        self.state
            .read()
            .await
            .items
            .get(item_id)
            .map(|item| item.stock)
    }

    fn check_cart_writes(&self) -> Result<()> {
        if self.faults.cart_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("cart writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn create_cart(&self, cart: &Cart) -> Result<CartId> {
        let mut state = self.state.write().await;
        state.carts.insert(cart.id(), cart.clone());
        Ok(cart.id())
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>> {
        Ok(self.state.read().await.carts.get(&cart_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        self.check_cart_writes()?;
        let mut state = self.state.write().await;
        let stored = state
            .carts
            .get_mut(&cart.id())
            .ok_or(StoreError::CartNotFound(cart.id()))?;
        *stored = cart.clone();
        Ok(())
    }

    async fn load_cart_with_items(&self, cart_id: CartId) -> Result<Option<ResolvedCart>> {
        let state = self.state.read().await;
        let Some(cart) = state.carts.get(&cart_id) else {
            return Ok(None);
        };

        let lines = cart
            .lines()
            .iter()
            .map(|line| ResolvedLine {
                line: line.clone(),
                item: state.items.get(&line.item_id).cloned(),
            })
            .collect();

        Ok(Some(ResolvedCart {
            cart: cart.clone(),
            lines,
        }))
    }

    async fn remove_line(&self, cart_id: CartId, item_id: &ItemId) -> Result<()> {
        self.check_cart_writes()?;
        let mut state = self.state.write().await;
        let cart = state
            .carts
            .get_mut(&cart_id)
            .ok_or(StoreError::CartNotFound(cart_id))?;
        cart.discard_line(item_id);
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<CatalogItem>> {
        Ok(self.state.read().await.items.get(item_id).cloned())
    }

    async fn list_items(&self, active_only: bool) -> Result<Vec<CatalogItem>> {
        let state = self.state.read().await;
        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|item| !active_only || item.active)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn put_item(&self, item: &CatalogItem) -> Result<()> {
        let mut state = self.state.write().await;
        state.items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn read_stock(&self, item_id: &ItemId) -> Result<u32> {
        self.state
            .read()
            .await
            .items
            .get(item_id)
            .map(|item| item.stock)
            .ok_or_else(|| StoreError::ItemNotFound(item_id.clone()))
    }

    async fn decrement_stock(&self, item_id: &ItemId, amount: u32) -> Result<u32> {
        let mut state = self.state.write().await;
        let item = state
            .items
            .get_mut(item_id)
            .ok_or_else(|| StoreError::ItemNotFound(item_id.clone()))?;

        if item.stock < amount {
            return Err(StoreError::InsufficientStock {
                item_id: item_id.clone(),
                requested: amount,
                available: item.stock,
            });
        }

        item.stock -= amount;
        Ok(item.stock)
    }
}

#[async_trait]
impl ReceiptStore for InMemoryStore {
    async fn insert_receipt(&self, receipt: &Receipt) -> Result<ReceiptId> {
        if self.faults.receipt_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "receipt inserts disabled".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        if state.receipts.iter().any(|r| r.code() == receipt.code()) {
            return Err(StoreError::CodeCollision(receipt.code().clone()));
        }
        state.receipts.push(receipt.clone());
        Ok(receipt.id())
    }

    async fn get_receipt(&self, receipt_id: ReceiptId) -> Result<Option<Receipt>> {
        let state = self.state.read().await;
        Ok(state.receipts.iter().find(|r| r.id() == receipt_id).cloned())
    }

    async fn get_receipt_by_code(&self, code: &ReceiptCode) -> Result<Option<Receipt>> {
        let state = self.state.read().await;
        Ok(state.receipts.iter().find(|r| r.code() == code).cloned())
    }

    async fn find_receipts(&self, query: ReceiptQuery) -> Result<Vec<Receipt>> {
        let state = self.state.read().await;
        let mut receipts: Vec<_> = state
            .receipts
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        // Newest first
        receipts.sort_by(|a, b| b.purchased_at().cmp(&a.purchased_at()));

        let offset = query.offset.unwrap_or(0);
        let receipts = receipts.into_iter().skip(offset);
        let receipts = match query.limit {
            Some(limit) => receipts.take(limit).collect(),
            None => receipts.collect(),
        };

        Ok(receipts)
    }

    async fn sales_summary(&self, query: ReceiptQuery) -> Result<SalesSummary> {
        let state = self.state.read().await;
        let (total, count) = state
            .receipts
            .iter()
            .filter(|r| query.matches(r))
            .fold((Money::zero(), 0u64), |(total, count), r| {
                (total + r.total_amount(), count + 1)
            });
        Ok(SalesSummary::new(total, count))
    }
}
