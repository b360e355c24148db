//! Storage for the storefront checkout system.
//!
//! Three contracts, one per concern:
//! - [`CartStore`]: carts and their lines
//! - [`InventoryStore`]: catalog items and the atomic stock decrement
//! - [`ReceiptStore`]: append-only receipts and sales totals
//!
//! [`InMemoryStore`] and [`PostgresStore`] implement all three.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::ReceiptQuery;
pub use store::{CartStore, InventoryStore, ReceiptStore, Storage};
