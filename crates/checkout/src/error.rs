//! Checkout error types.

use common::CartId;
use domain::{CartError, ItemId, ReceiptCode};
use store::StoreError;
use thiserror::Error;

/// Errors that abort a checkout.
///
/// Running out of stock is not an error: it is reported through
/// [`CheckoutStatus::NoStockAvailable`](crate::CheckoutStatus::NoStockAvailable).
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart does not exist.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The cart has no lines.
    #[error("Cart is empty: {0}")]
    EmptyCart(CartId),

    /// A storage operation failed unexpectedly.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The receipt could not be recorded.
    #[error("Receipt error: {0}")]
    Record(#[from] RecordError),
}

/// Errors raised while recording a receipt.
#[derive(Debug, Error)]
pub enum RecordError {
    /// There was nothing to record.
    #[error("Cannot record a purchase with no lines")]
    EmptyPurchase,

    /// Every generated code was already taken.
    #[error("Receipt code {code} still collides after {attempts} attempts")]
    CodeCollision { code: ReceiptCode, attempts: u32 },

    /// The receipt store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by cart management operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// The cart does not exist.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The catalog has no such item.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The item exists but is no longer sold.
    #[error("Item is not available for sale: {0}")]
    ItemInactive(ItemId),

    /// The cart rejected the change.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// A storage operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by an outcome sink.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The event could not be delivered.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
