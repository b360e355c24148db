use chrono::{DateTime, Utc};
use domain::{Purchaser, Receipt};

/// Builder for constructing receipt queries.
///
/// Allows filtering receipts by purchaser and purchase time range.
/// Results are always returned newest first.
#[derive(Debug, Clone, Default)]
pub struct ReceiptQuery {
    /// Filter by purchaser identity.
    pub purchaser: Option<Purchaser>,

    /// Filter by receipts issued at or after this timestamp.
    pub from_timestamp: Option<DateTime<Utc>>,

    /// Filter by receipts issued at or before this timestamp.
    pub to_timestamp: Option<DateTime<Utc>>,

    /// Maximum number of receipts to return.
    pub limit: Option<usize>,

    /// Number of receipts to skip.
    pub offset: Option<usize>,
}

impl ReceiptQuery {
    /// Creates a new empty query matching every receipt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one purchaser's receipts.
    pub fn for_purchaser(purchaser: Purchaser) -> Self {
        Self {
            purchaser: Some(purchaser),
            ..Default::default()
        }
    }

    /// Filters to receipts issued at or after this timestamp.
    pub fn from_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    /// Filters to receipts issued at or before this timestamp.
    pub fn to_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_timestamp = Some(timestamp);
        self
    }

    /// Limits the number of receipts returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many receipts before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the receipt passes every filter (paging aside).
    pub fn matches(&self, receipt: &Receipt) -> bool {
        if let Some(ref purchaser) = self.purchaser
            && receipt.purchaser() != purchaser
        {
            return false;
        }
        if let Some(from) = self.from_timestamp
            && receipt.purchased_at() < from
        {
            return false;
        }
        if let Some(to) = self.to_timestamp
            && receipt.purchased_at() > to
        {
            return false;
        }
        true
    }
}
