use async_trait::async_trait;
use common::{CartId, ReceiptId};
use domain::{Cart, CatalogItem, ItemId, Receipt, ReceiptCode, ResolvedCart, SalesSummary};

use crate::{ReceiptQuery, Result};

/// Persistence contract for carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Inserts a new cart and returns its ID.
    async fn create_cart(&self, cart: &Cart) -> Result<CartId>;

    /// Loads a cart without resolving its items.
    ///
    /// Returns None if the cart doesn't exist.
    async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>>;

    /// Replaces the stored owner and lines of an existing cart.
    ///
    /// Fails with `CartNotFound` if the cart doesn't exist.
    async fn save_cart(&self, cart: &Cart) -> Result<()>;

    /// Loads a cart and joins every line with its current catalog item.
    ///
    /// Lines come back in cart order. Returns None if the cart doesn't exist.
    async fn load_cart_with_items(&self, cart_id: CartId) -> Result<Option<ResolvedCart>>;

    /// Removes the line for an item.
    ///
    /// Removing an absent line is a no-op; an absent cart fails with
    /// `CartNotFound`.
    async fn remove_line(&self, cart_id: CartId, item_id: &ItemId) -> Result<()>;
}

/// Inventory ledger: catalog items and their stock counts.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Loads a catalog item. Returns None if it doesn't exist.
    async fn get_item(&self, item_id: &ItemId) -> Result<Option<CatalogItem>>;

    /// Lists catalog items ordered by ID.
    async fn list_items(&self, active_only: bool) -> Result<Vec<CatalogItem>>;

    /// Inserts or replaces a catalog item.
    async fn put_item(&self, item: &CatalogItem) -> Result<()>;

    /// Reads the current stock of an item.
    ///
    /// The value is a hint: it may be stale by the time a decrement runs.
    async fn read_stock(&self, item_id: &ItemId) -> Result<u32>;

    /// Atomically lowers stock by `amount` and returns the new stock.
    ///
    /// Linearizable per item. Fails with `InsufficientStock` (stock left
    /// untouched) if the decrement would go below zero.
    async fn decrement_stock(&self, item_id: &ItemId, amount: u32) -> Result<u32>;
}

/// Append-only receipt storage.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Stores a new receipt.
    ///
    /// Fails with `CodeCollision` if another receipt already has its code.
    async fn insert_receipt(&self, receipt: &Receipt) -> Result<ReceiptId>;

    /// Loads a receipt by ID.
    async fn get_receipt(&self, receipt_id: ReceiptId) -> Result<Option<Receipt>>;

    /// Loads a receipt by its code.
    async fn get_receipt_by_code(&self, code: &ReceiptCode) -> Result<Option<Receipt>>;

    /// Retrieves receipts matching a query, newest first.
    async fn find_receipts(&self, query: ReceiptQuery) -> Result<Vec<Receipt>>;

    /// Totals the receipts matching a query. Paging fields are ignored.
    async fn sales_summary(&self, query: ReceiptQuery) -> Result<SalesSummary>;
}

/// Everything the storefront needs from one backend.
pub trait Storage: CartStore + InventoryStore + ReceiptStore + Clone + 'static {}

impl<T> Storage for T where T: CartStore + InventoryStore + ReceiptStore + Clone + 'static {}
