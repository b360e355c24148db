//! Shared application state.

use checkout::{BroadcastSink, CartService, CheckoutCoordinator, ReceiptService};
use store::Storage;

use crate::gate::CartGate;

/// Capacity of the outcome broadcast channel.
const OUTCOME_CHANNEL_CAPACITY: usize = 1024;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Storage> {
    pub carts: CartService<S, S>,
    pub receipts: ReceiptService<S>,
    pub checkout: CheckoutCoordinator<S, S, S, BroadcastSink>,
    pub inventory: S,
    pub gate: CartGate,
    pub outcomes: BroadcastSink,
}

impl<S: Storage> AppState<S> {
    /// Wires every service to one storage backend.
    pub fn new(store: S, receipt_code_attempts: u32) -> Self {
        let outcomes = BroadcastSink::new(OUTCOME_CHANNEL_CAPACITY);
        let checkout = CheckoutCoordinator::new(store.clone(), store.clone(), store.clone())
            .with_code_attempts(receipt_code_attempts)
            .with_sink(outcomes.clone());

        Self {
            carts: CartService::new(store.clone(), store.clone()),
            receipts: ReceiptService::new(store.clone()),
            checkout,
            inventory: store,
            gate: CartGate::new(),
            outcomes,
        }
    }
}
