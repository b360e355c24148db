//! Per-cart request serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use common::CartId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per cart.
///
/// Every request that changes a cart (line edits, clearing, checkout) holds
/// the cart's lock from the ownership check until its last write.
/// Requests on different carts never wait on each other.
#[derive(Debug, Default)]
pub struct CartGate {
    locks: Mutex<HashMap<CartId, Arc<AsyncMutex<()>>>>,
}

impl CartGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to a cart. Access ends when the guard drops.
    pub async fn lock(&self, cart_id: CartId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Only the map holds idle locks
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(cart_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of carts with a request holding or awaiting their lock.
    #[cfg(test)]
    fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}
