//! Domain error types.

use thiserror::Error;

/// Errors raised by cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Line quantities must be positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// A line may not hold more than the store can record.
    #[error("Quantity too large: {quantity} (at most {max} per line)")]
    QuantityTooLarge { quantity: u64, max: u32 },

    /// The cart has no line for this item.
    #[error("Item not in cart: {item_id}")]
    LineNotFound { item_id: String },
}

/// Errors raised when building catalog items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Prices cannot be negative.
    #[error("Invalid price for {item_id}: {price} (must not be negative)")]
    NegativePrice { item_id: String, price: i64 },
}

/// Errors raised when building receipt values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiptError {
    /// Purchaser identity was blank.
    #[error("Purchaser identity is required")]
    PurchaserRequired,

    /// Receipt code was blank.
    #[error("Receipt code is required")]
    CodeRequired,
}
