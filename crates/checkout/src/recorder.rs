//! Receipt recording with code-collision retries.

use std::sync::Arc;

use chrono::Utc;
use domain::{PurchaseLine, Purchaser, Receipt};
use store::{ReceiptStore, StoreError};

use crate::code::{CodeGenerator, TicketCodeGenerator};
use crate::error::RecordError;

/// Default number of codes tried before giving up.
pub const DEFAULT_CODE_ATTEMPTS: u32 = 5;

/// Builds and persists exactly one receipt per call.
#[derive(Clone)]
pub struct ReceiptRecorder<R> {
    receipts: R,
    codes: Arc<dyn CodeGenerator>,
    max_attempts: u32,
}

impl<R> ReceiptRecorder<R>
where
    R: ReceiptStore,
{
    /// Creates a recorder issuing `TICKET-` codes.
    pub fn new(receipts: R) -> Self {
        Self {
            receipts,
            codes: Arc::new(TicketCodeGenerator),
            max_attempts: DEFAULT_CODE_ATTEMPTS,
        }
    }

    /// Replaces the code generator.
    pub fn with_code_generator(mut self, codes: impl CodeGenerator + 'static) -> Self {
        self.codes = Arc::new(codes);
        self
    }

    /// Sets how many codes are tried. At least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Records a receipt for the given lines.
    ///
    /// The total is computed from the captured unit prices. On a code
    /// collision the same receipt is retried with a fresh code.
    #[tracing::instrument(skip(self, lines), fields(purchaser = %purchaser, lines = lines.len()))]
    pub async fn record(
        &self,
        purchaser: &Purchaser,
        lines: Vec<PurchaseLine>,
    ) -> Result<Receipt, RecordError> {
        if lines.is_empty() {
            return Err(RecordError::EmptyPurchase);
        }

        let mut receipt = Receipt::issue(self.codes.generate(), purchaser.clone(), lines, Utc::now());
        let mut attempt = 1;

        loop {
            match self.receipts.insert_receipt(&receipt).await {
                Ok(_) => {
                    tracing::info!(
                        code = %receipt.code(),
                        total_cents = receipt.total_amount().cents(),
                        "receipt recorded"
                    );
                    return Ok(receipt);
                }
                Err(StoreError::CodeCollision(code)) => {
                    metrics::counter!("receipt_code_collisions").increment(1);
                    if attempt >= self.max_attempts {
                        return Err(RecordError::CodeCollision {
                            code,
                            attempts: attempt,
                        });
                    }
                    tracing::warn!(%code, attempt, "receipt code collision, retrying");
                    receipt = receipt.with_code(self.codes.generate());
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
