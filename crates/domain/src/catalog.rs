//! Catalog items as seen by the checkout core.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::money::Money;

/// Catalog item identifier (SKU).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new item ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the item ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A sellable item together with its live stock level.
///
/// `stock` is only ever lowered through the inventory store's atomic
/// decrement. Catalog management (creating items, restocking, changing
/// prices) happens outside the checkout core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub price: Money,
    pub stock: u32,
    pub active: bool,
}

impl CatalogItem {
    /// Creates an active catalog item.
    pub fn new(
        id: impl Into<ItemId>,
        title: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Result<Self, CatalogError> {
        let id = id.into();
        if price.is_negative() {
            return Err(CatalogError::NegativePrice {
                item_id: id.to_string(),
                price: price.cents(),
            });
        }

        Ok(Self {
            id,
            title: title.into(),
            price,
            stock,
            active: true,
        })
    }

    /// Returns the same item flagged as inactive.
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns true if the item can currently be sold at `quantity`.
    pub fn can_fulfill(&self, quantity: u32) -> bool {
        self.active && self.stock >= quantity
    }
}
