//! HTTP route handlers.

pub mod carts;
pub mod health;
pub mod items;
pub mod metrics;
pub mod receipts;

use common::{CartId, ReceiptId};

use crate::error::ApiError;

fn parse_uuid(id: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(id).map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}

pub(crate) fn parse_cart_id(id: &str) -> Result<CartId, ApiError> {
    parse_uuid(id).map(CartId::from)
}

pub(crate) fn parse_receipt_id(id: &str) -> Result<ReceiptId, ApiError> {
    parse_uuid(id).map(ReceiptId::from)
}
