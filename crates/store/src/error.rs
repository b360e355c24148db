use common::CartId;
use domain::{ItemId, ReceiptCode};
use thiserror::Error;

/// Errors that can occur when interacting with the storefront stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cart does not exist.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The catalog item does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// A decrement would have driven stock below zero. Stock is unchanged.
    #[error("Insufficient stock for {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// Another receipt already uses this code.
    #[error("Receipt code already in use: {0}")]
    CodeCollision(ReceiptCode),

    /// The backend refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
