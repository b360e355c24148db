//! Cart aggregate.

use common::CartId;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogItem, ItemId};
use crate::error::CartError;
use crate::receipt::Purchaser;

/// Largest quantity a single cart line may hold.
///
/// Matches the range of the `INTEGER` column cart lines are stored in.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

fn check_quantity(quantity: u64) -> Result<u32, CartError> {
    match u32::try_from(quantity) {
        Ok(0) => Err(CartError::InvalidQuantity { quantity: 0 }),
        Ok(q) if q <= MAX_LINE_QUANTITY => Ok(q),
        _ => Err(CartError::QuantityTooLarge {
            quantity,
            max: MAX_LINE_QUANTITY,
        }),
    }
}

/// One (item, quantity) pair within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub item_id: ItemId,
    pub quantity: u32,
}

impl CartLineItem {
    /// Creates a line, rejecting a zero or oversized quantity.
    pub fn new(item_id: impl Into<ItemId>, quantity: u32) -> Result<Self, CartError> {
        Ok(Self {
            item_id: item_id.into(),
            quantity: check_quantity(u64::from(quantity))?,
        })
    }
}

/// Shopping cart aggregate root.
///
/// Lines keep insertion order and every item appears at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    owner: Option<Purchaser>,
    lines: Vec<CartLineItem>,
}

impl Cart {
    /// Creates an empty cart, optionally owned by a purchaser.
    pub fn new(owner: Option<Purchaser>) -> Self {
        Self {
            id: CartId::new(),
            owner,
            lines: Vec::new(),
        }
    }

    /// Rebuilds a cart from persisted parts.
    ///
    /// Duplicate lines for the same item are merged and zero-quantity lines
    /// dropped so a loaded cart always satisfies the aggregate invariants.
    pub fn from_parts(id: CartId, owner: Option<Purchaser>, lines: Vec<CartLineItem>) -> Self {
        let mut cart = Self {
            id,
            owner,
            lines: Vec::with_capacity(lines.len()),
        };
        for line in lines {
            // zero-quantity lines are skipped, not errors
            let _ = cart.add_line(line.item_id, line.quantity);
        }
        cart
    }

    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn owner(&self) -> Option<&Purchaser> {
        self.owner.as_ref()
    }

    /// Returns true if `purchaser` may modify or check out this cart.
    ///
    /// Anonymous carts are open to anyone.
    pub fn is_accessible_by(&self, purchaser: &Purchaser) -> bool {
        self.owner.as_ref().is_none_or(|owner| owner == purchaser)
    }

    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    /// Returns the line for an item, if present.
    pub fn line(&self, item_id: &ItemId) -> Option<&CartLineItem> {
        self.lines.iter().find(|line| &line.item_id == item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the total number of units across all lines.
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Adds units of an item.
    ///
    /// If the item is already in the cart the quantities are summed and the
    /// line keeps its position. A merged quantity above
    /// [`MAX_LINE_QUANTITY`] is rejected and the line left unchanged.
    pub fn add_line(&mut self, item_id: impl Into<ItemId>, quantity: u32) -> Result<(), CartError> {
        check_quantity(u64::from(quantity))?;

        let item_id = item_id.into();
        match self.lines.iter_mut().find(|line| line.item_id == item_id) {
            Some(existing) => {
                existing.quantity =
                    check_quantity(u64::from(existing.quantity) + u64::from(quantity))?;
            }
            None => self.lines.push(CartLineItem { item_id, quantity }),
        }
        Ok(())
    }

    /// Sets the quantity of an existing line. A quantity of 0 removes it.
    pub fn update_quantity(&mut self, item_id: &ItemId, quantity: u32) -> Result<(), CartError> {
        let index = self.position(item_id)?;
        if quantity == 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = check_quantity(u64::from(quantity))?;
        }
        Ok(())
    }

    /// Removes a line.
    pub fn remove_line(&mut self, item_id: &ItemId) -> Result<CartLineItem, CartError> {
        let index = self.position(item_id)?;
        Ok(self.lines.remove(index))
    }

    /// Removes a line if present, returning whether anything changed.
    pub fn discard_line(&mut self, item_id: &ItemId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| &line.item_id != item_id);
        before != self.lines.len()
    }

    /// Drops every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn position(&self, item_id: &ItemId) -> Result<usize, CartError> {
        self.lines
            .iter()
            .position(|line| &line.item_id == item_id)
            .ok_or_else(|| CartError::LineNotFound {
                item_id: item_id.to_string(),
            })
    }
}

/// A cart line joined with the catalog item it references.
///
/// `item` is `None` when the catalog no longer has the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    pub line: CartLineItem,
    pub item: Option<CatalogItem>,
}

/// A cart with each line's catalog data already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCart {
    pub cart: Cart,
    pub lines: Vec<ResolvedLine>,
}

impl ResolvedCart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sku(id: &str) -> ItemId {
        ItemId::new(id)
    }

    #[test]
    fn test_add_line_appends_in_order() {
        let mut cart = Cart::new(None);
        cart.add_line("SKU-001", 2).unwrap();
        cart.add_line("SKU-002", 1).unwrap();

        let ids: Vec<_> = cart.lines().iter().map(|l| l.item_id.as_str()).collect();
        assert_eq!(ids, ["SKU-001", "SKU-002"]);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_add_existing_item_merges_quantity() {
        let mut cart = Cart::new(None);
        cart.add_line("SKU-001", 2).unwrap();
        cart.add_line("SKU-002", 1).unwrap();
        cart.add_line("SKU-001", 3).unwrap();

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[test]
    fn test_add_zero_quantity_rejected() {
        let mut cart = Cart::new(None);
        let result = cart.add_line("SKU-001", 0);
        assert_eq!(result, Err(CartError::InvalidQuantity { quantity: 0 }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_oversized_quantities_rejected() {
        let mut cart = Cart::new(None);
        cart.add_line("SKU-001", MAX_LINE_QUANTITY).unwrap();
        cart.add_line("SKU-002", MAX_LINE_QUANTITY).unwrap();

        // merging past the cap leaves the line as it was
        let merged = cart.add_line("SKU-001", 1);
        assert!(matches!(merged, Err(CartError::QuantityTooLarge { .. })));
        assert_eq!(cart.line(&sku("SKU-001")).unwrap().quantity, MAX_LINE_QUANTITY);

        let updated = cart.update_quantity(&sku("SKU-002"), u32::MAX);
        assert!(matches!(updated, Err(CartError::QuantityTooLarge { .. })));
        assert!(CartLineItem::new("SKU-003", MAX_LINE_QUANTITY + 1).is_err());

        assert_eq!(cart.total_quantity(), 2 * u64::from(MAX_LINE_QUANTITY));
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = Cart::new(None);
        cart.add_line("SKU-001", 2).unwrap();

        cart.update_quantity(&sku("SKU-001"), 7).unwrap();
        assert_eq!(cart.line(&sku("SKU-001")).unwrap().quantity, 7);
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let mut cart = Cart::new(None);
        cart.add_line("SKU-001", 2).unwrap();

        cart.update_quantity(&sku("SKU-001"), 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_missing_line() {
        let mut cart = Cart::new(None);
        let result = cart.update_quantity(&sku("SKU-404"), 1);
        assert!(matches!(result, Err(CartError::LineNotFound { .. })));
    }

    #[test]
    fn test_remove_and_discard() {
        let mut cart = Cart::new(None);
        cart.add_line("SKU-001", 2).unwrap();
        cart.add_line("SKU-002", 1).unwrap();

        let removed = cart.remove_line(&sku("SKU-001")).unwrap();
        assert_eq!(removed.quantity, 2);
        assert!(cart.remove_line(&sku("SKU-001")).is_err());

        assert!(cart.discard_line(&sku("SKU-002")));
        assert!(!cart.discard_line(&sku("SKU-002")));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new(None);
        cart.add_line("SKU-001", 2).unwrap();
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_from_parts_restores_invariants() {
        let id = CartId::new();
        let lines = vec![
            CartLineItem {
                item_id: sku("SKU-001"),
                quantity: 1,
            },
            CartLineItem {
                item_id: sku("SKU-002"),
                quantity: 0,
            },
            CartLineItem {
                item_id: sku("SKU-001"),
                quantity: 2,
            },
        ];

        let cart = Cart::from_parts(id, None, lines);
        assert_eq!(cart.id(), id);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_access_rules() {
        let alice = Purchaser::new("alice@example.com").unwrap();
        let bob = Purchaser::new("bob@example.com").unwrap();

        let anonymous = Cart::new(None);
        assert!(anonymous.is_accessible_by(&alice));

        let owned = Cart::new(Some(alice.clone()));
        assert!(owned.is_accessible_by(&alice));
        assert!(!owned.is_accessible_by(&bob));
    }
}
