//! Purchase receipts (tickets) and the values they are built from.

use chrono::{DateTime, Utc};
use common::ReceiptId;
use serde::{Deserialize, Serialize};

use crate::catalog::ItemId;
use crate::error::ReceiptError;
use crate::money::Money;

/// Identity of the buyer (e-mail or user id), supplied by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Purchaser(String);

impl Purchaser {
    /// Creates a purchaser identity, rejecting blank values.
    pub fn new(identity: impl Into<String>) -> Result<Self, ReceiptError> {
        let identity = identity.into().trim().to_string();
        if identity.is_empty() {
            return Err(ReceiptError::PurchaserRequired);
        }
        Ok(Self(identity))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Purchaser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-referenceable, unique receipt code (e.g. `TICKET-1718000000000-42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptCode(String);

impl ReceiptCode {
    pub fn new(code: impl Into<String>) -> Result<Self, ReceiptError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(ReceiptError::CodeRequired);
        }
        Ok(Self(code))
    }

    /// Builds a `TICKET-<unix-millis>-<suffix>` code.
    pub fn ticket(issued_at: DateTime<Utc>, suffix: u16) -> Self {
        Self(format!("TICKET-{}-{}", issued_at.timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sold line. The unit price is the one shown at checkout time and is
/// never recalculated from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub item_id: ItemId,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl PurchaseLine {
    /// Returns `unit_price * quantity`.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Immutable record of a completed (possibly partial) purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    id: ReceiptId,
    code: ReceiptCode,
    purchaser: Purchaser,
    lines: Vec<PurchaseLine>,
    total_amount: Money,
    purchased_at: DateTime<Utc>,
}

impl Receipt {
    /// Issues a new receipt, computing the total from the lines.
    pub fn issue(
        code: ReceiptCode,
        purchaser: Purchaser,
        lines: Vec<PurchaseLine>,
        purchased_at: DateTime<Utc>,
    ) -> Self {
        let total_amount = lines.iter().map(PurchaseLine::subtotal).sum();
        Self {
            id: ReceiptId::new(),
            code,
            purchaser,
            lines,
            total_amount,
            purchased_at,
        }
    }

    /// Rebuilds a stored receipt exactly as persisted.
    pub fn from_parts(
        id: ReceiptId,
        code: ReceiptCode,
        purchaser: Purchaser,
        lines: Vec<PurchaseLine>,
        total_amount: Money,
        purchased_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            purchaser,
            lines,
            total_amount,
            purchased_at,
        }
    }

    /// Returns a copy carrying a different code. Used when a generated code
    /// collides before the receipt was ever stored.
    pub fn with_code(&self, code: ReceiptCode) -> Self {
        Self {
            code,
            ..self.clone()
        }
    }

    pub fn id(&self) -> ReceiptId {
        self.id
    }

    pub fn code(&self) -> &ReceiptCode {
        &self.code
    }

    pub fn purchaser(&self) -> &Purchaser {
        &self.purchaser
    }

    pub fn lines(&self) -> &[PurchaseLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn purchased_at(&self) -> DateTime<Utc> {
        self.purchased_at
    }

    /// Returns the number of units sold.
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

/// Sales totals over a set of receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_sales: Money,
    pub total_orders: u64,
    pub average_order_value: Money,
}

impl SalesSummary {
    /// Builds a summary from a total and a receipt count.
    pub fn new(total_sales: Money, total_orders: u64) -> Self {
        Self {
            total_sales,
            total_orders,
            average_order_value: total_sales.split(total_orders),
        }
    }
}
