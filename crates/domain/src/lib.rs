//! Domain model for the storefront checkout system.
//!
//! This crate holds the pure data model and its invariants:
//! - `Money` in integer cents
//! - Catalog items with live stock
//! - The `Cart` aggregate and its line items
//! - Immutable purchase receipts
//!
//! Nothing here performs I/O.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod receipt;

pub use cart::{Cart, CartLineItem, MAX_LINE_QUANTITY, ResolvedCart, ResolvedLine};
pub use catalog::{CatalogItem, ItemId};
pub use error::{CartError, CatalogError, ReceiptError};
pub use money::Money;
pub use receipt::{Purchaser, PurchaseLine, Receipt, ReceiptCode, SalesSummary};
