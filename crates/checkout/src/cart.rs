//! Cart management service.

use common::CartId;
use domain::{Cart, ItemId, Money, Purchaser, ResolvedCart, ResolvedLine};
use serde::Serialize;
use store::{CartStore, InventoryStore};

use crate::error::CartServiceError;

type Result<T> = std::result::Result<T, CartServiceError>;

/// Price of a cart at current catalog prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotal {
    pub total_amount: Money,
    pub total_items: u64,
}

impl CartTotal {
    /// Line subtotal at the current catalog price, `None` for a missing item.
    pub fn line_subtotal(line: &ResolvedLine) -> Option<Money> {
        line.item
            .as_ref()
            .map(|item| item.price.multiply(line.line.quantity))
    }

    /// Totals a resolved cart, skipping lines whose item no longer exists.
    pub fn of(resolved: &ResolvedCart) -> Self {
        resolved.lines.iter().fold(
            Self {
                total_amount: Money::zero(),
                total_items: 0,
            },
            |mut total, line| {
                if let Some(subtotal) = Self::line_subtotal(line) {
                    total.total_amount += subtotal;
                    total.total_items += u64::from(line.line.quantity);
                }
                total
            },
        )
    }
}

/// Creates and edits carts.
///
/// Every mutation loads the cart, applies the change to the aggregate and
/// saves it back.
#[derive(Clone)]
pub struct CartService<C, I> {
    carts: C,
    inventory: I,
}

impl<C, I> CartService<C, I>
where
    C: CartStore,
    I: InventoryStore,
{
    pub fn new(carts: C, inventory: I) -> Self {
        Self { carts, inventory }
    }

    /// Creates an empty cart.
    #[tracing::instrument(skip(self))]
    pub async fn create_cart(&self, owner: Option<Purchaser>) -> Result<Cart> {
        let cart = Cart::new(owner);
        self.carts.create_cart(&cart).await?;
        tracing::info!(cart_id = %cart.id(), "cart created");
        Ok(cart)
    }

    pub async fn get_cart(&self, cart_id: CartId) -> Result<Cart> {
        self.carts
            .get_cart(cart_id)
            .await?
            .ok_or(CartServiceError::CartNotFound(cart_id))
    }

    /// Loads a cart with its catalog items resolved.
    pub async fn get_cart_with_items(&self, cart_id: CartId) -> Result<ResolvedCart> {
        self.carts
            .load_cart_with_items(cart_id)
            .await?
            .ok_or(CartServiceError::CartNotFound(cart_id))
    }

    /// Adds units of an item, summing onto an existing line.
    ///
    /// The item must exist and be active. Stock is not checked here.
    #[tracing::instrument(skip(self))]
    pub async fn add_line(&self, cart_id: CartId, item_id: &ItemId, quantity: u32) -> Result<Cart> {
        let item = self
            .inventory
            .get_item(item_id)
            .await?
            .ok_or_else(|| CartServiceError::ItemNotFound(item_id.clone()))?;
        if !item.active {
            return Err(CartServiceError::ItemInactive(item_id.clone()));
        }

        let mut cart = self.get_cart(cart_id).await?;
        cart.add_line(item_id.clone(), quantity)?;
        self.carts.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Sets a line's quantity. Zero removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn update_line(
        &self,
        cart_id: CartId,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut cart = self.get_cart(cart_id).await?;
        cart.update_quantity(item_id, quantity)?;
        self.carts.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Removes a line. Removing an absent line is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn remove_line(&self, cart_id: CartId, item_id: &ItemId) -> Result<Cart> {
        let mut cart = self.get_cart(cart_id).await?;
        if cart.discard_line(item_id) {
            self.carts.save_cart(&cart).await?;
        }
        Ok(cart)
    }

    /// Drops every line.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, cart_id: CartId) -> Result<Cart> {
        let mut cart = self.get_cart(cart_id).await?;
        cart.clear();
        self.carts.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Prices the cart at current catalog prices.
    ///
    /// Lines whose item no longer exists are skipped.
    pub async fn cart_total(&self, cart_id: CartId) -> Result<CartTotal> {
        let resolved = self.get_cart_with_items(cart_id).await?;
        Ok(CartTotal::of(&resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CartError, CatalogItem};
    use store::InMemoryStore;

    async fn setup() -> CartService<InMemoryStore, InMemoryStore> {
        let store = InMemoryStore::with_items([
            CatalogItem::new("A", "Widget", Money::from_cents(1000), 5).unwrap(),
            CatalogItem::new("B", "Gadget", Money::from_cents(250), 0).unwrap(),
            CatalogItem::new("OLD", "Retired", Money::from_cents(100), 9)
                .unwrap()
                .deactivated(),
        ])
        .await;
        CartService::new(store.clone(), store)
    }

    #[tokio::test]
    async fn test_add_sums_quantities() {
        let service = setup().await;
        let cart = service.create_cart(None).await.unwrap();
        let a = ItemId::new("A");

        service.add_line(cart.id(), &a, 1).await.unwrap();
        let cart = service.add_line(cart.id(), &a, 2).await.unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(&a).unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_add_allows_out_of_stock_items() {
        let service = setup().await;
        let cart = service.create_cart(None).await.unwrap();

        let cart = service.add_line(cart.id(), &ItemId::new("B"), 4).await.unwrap();
        assert_eq!(cart.total_quantity(), 4);
    }

    #[tokio::test]
    async fn test_add_rejects_unknown_and_inactive() {
        let service = setup().await;
        let cart = service.create_cart(None).await.unwrap();

        let missing = service.add_line(cart.id(), &ItemId::new("NOPE"), 1).await;
        assert!(matches!(missing, Err(CartServiceError::ItemNotFound(_))));

        let inactive = service.add_line(cart.id(), &ItemId::new("OLD"), 1).await;
        assert!(matches!(inactive, Err(CartServiceError::ItemInactive(_))));

        let zero = service.add_line(cart.id(), &ItemId::new("A"), 0).await;
        assert!(matches!(
            zero,
            Err(CartServiceError::Cart(CartError::InvalidQuantity { .. }))
        ));
    }

    #[tokio::test]
    async fn test_update_to_zero_removes() {
        let service = setup().await;
        let cart = service.create_cart(None).await.unwrap();
        let a = ItemId::new("A");
        service.add_line(cart.id(), &a, 2).await.unwrap();

        let cart = service.update_line(cart.id(), &a, 0).await.unwrap();
        assert!(cart.is_empty());

        let missing = service.update_line(cart.id(), &a, 1).await;
        assert!(matches!(
            missing,
            Err(CartServiceError::Cart(CartError::LineNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let service = setup().await;
        let cart = service.create_cart(None).await.unwrap();
        service.add_line(cart.id(), &ItemId::new("A"), 1).await.unwrap();
        service.add_line(cart.id(), &ItemId::new("B"), 1).await.unwrap();

        let cart = service.remove_line(cart.id(), &ItemId::new("A")).await.unwrap();
        assert_eq!(cart.lines().len(), 1);
        // absent line is fine
        service.remove_line(cart.id(), &ItemId::new("A")).await.unwrap();

        let cart = service.clear(cart.id()).await.unwrap();
        assert!(service.get_cart(cart.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cart_total() {
        let service = setup().await;
        let cart = service.create_cart(None).await.unwrap();
        service.add_line(cart.id(), &ItemId::new("A"), 2).await.unwrap();
        service.add_line(cart.id(), &ItemId::new("B"), 3).await.unwrap();

        let total = service.cart_total(cart.id()).await.unwrap();
        assert_eq!(total.total_amount.cents(), 2750);
        assert_eq!(total.total_items, 5);
    }

    #[tokio::test]
    async fn test_cart_total_does_not_overflow() {
        let service = setup().await;
        let cart = service.create_cart(None).await.unwrap();
        service
            .add_line(cart.id(), &ItemId::new("A"), domain::MAX_LINE_QUANTITY)
            .await
            .unwrap();
        service
            .add_line(cart.id(), &ItemId::new("B"), domain::MAX_LINE_QUANTITY)
            .await
            .unwrap();

        let total = service.cart_total(cart.id()).await.unwrap();
        assert_eq!(total.total_items, 2 * u64::from(domain::MAX_LINE_QUANTITY));

        let too_many = service
            .add_line(cart.id(), &ItemId::new("A"), 1)
            .await;
        assert!(matches!(
            too_many,
            Err(CartServiceError::Cart(CartError::QuantityTooLarge { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unknown_cart() {
        let service = setup().await;
        let result = service.get_cart(CartId::new()).await;
        assert!(matches!(result, Err(CartServiceError::CartNotFound(_))));
    }
}
