//! Checkout step names, used as the `step` field in logs.

/// Step name: Load the cart and resolve its items.
pub const STEP_LOAD_CART: &str = "load_cart";

/// Step name: Compare requested quantities with live stock.
pub const STEP_RECONCILE: &str = "reconcile";

/// Step name: Decrement stock for every purchasable line.
pub const STEP_COMMIT_STOCK: &str = "commit_stock";

/// Step name: Persist the receipt.
pub const STEP_RECORD_RECEIPT: &str = "record_receipt";

/// Step name: Remove purchased lines from the cart.
pub const STEP_SYNC_CART: &str = "sync_cart";
