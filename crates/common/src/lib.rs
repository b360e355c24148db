//! Identifier types shared across the storefront crates.

mod types;

pub use types::{CartId, ReceiptId};
