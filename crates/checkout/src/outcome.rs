//! Checkout outcome types.

use common::CartId;
use domain::{Money, PurchaseLine, Receipt};
use serde::{Deserialize, Serialize};

use crate::reconciler::RejectedLine;

/// How a checkout ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// Every line was purchased.
    Completed,
    /// Some lines were purchased, others rejected.
    Partial,
    /// Nothing could be purchased. No receipt was issued.
    NoStockAvailable,
}

impl CheckoutStatus {
    /// Returns true if a receipt was issued.
    pub fn is_success(&self) -> bool {
        !matches!(self, CheckoutStatus::NoStockAvailable)
    }

    /// Human-readable summary of the status.
    pub fn message(&self) -> &'static str {
        match self {
            CheckoutStatus::Completed => "Purchase completed",
            CheckoutStatus::Partial => {
                "Purchase partially completed: some items did not have enough stock"
            }
            CheckoutStatus::NoStockAvailable => "No items available for purchase",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStatus::Completed => "completed",
            CheckoutStatus::Partial => "partial",
            CheckoutStatus::NoStockAvailable => "no_stock_available",
        }
    }
}

impl std::fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub cart_id: CartId,
    pub status: CheckoutStatus,
    /// Present iff `status.is_success()`.
    pub receipt: Option<Receipt>,
    /// Lines that were sold, in cart order.
    pub purchased: Vec<PurchaseLine>,
    /// Lines that stay in the cart, in cart order.
    pub rejected: Vec<RejectedLine>,
    /// Set when the receipt was issued but purchased lines could not be
    /// removed from the cart.
    pub cart_sync_error: Option<String>,
}

impl CheckoutOutcome {
    pub(crate) fn no_stock(cart_id: CartId, rejected: Vec<RejectedLine>) -> Self {
        Self {
            cart_id,
            status: CheckoutStatus::NoStockAvailable,
            receipt: None,
            purchased: Vec::new(),
            rejected,
            cart_sync_error: None,
        }
    }

    pub fn success(&self) -> bool {
        self.status.is_success()
    }

    pub fn message(&self) -> &'static str {
        self.status.message()
    }

    /// Total charged. Zero when nothing was purchased.
    pub fn total_amount(&self) -> Money {
        self.receipt
            .as_ref()
            .map(Receipt::total_amount)
            .unwrap_or_else(Money::zero)
    }

    /// Units sold across all purchased lines.
    pub fn total_items(&self) -> u64 {
        self.purchased.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// True when a receipt exists but the cart still holds purchased lines.
    pub fn is_degraded(&self) -> bool {
        self.cart_sync_error.is_some()
    }
}
