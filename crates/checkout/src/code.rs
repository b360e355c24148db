//! Receipt code generation.

use chrono::Utc;
use domain::ReceiptCode;
use rand::Rng;

/// Produces candidate receipt codes.
///
/// Codes need not be unique on their own; the receipt store rejects
/// duplicates and the recorder asks for another.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> ReceiptCode;
}

/// Generates `TICKET-<unix-millis>-<0..9999>` codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketCodeGenerator;

impl CodeGenerator for TicketCodeGenerator {
    fn generate(&self) -> ReceiptCode {
        let suffix = rand::rng().random_range(0..10_000);
        ReceiptCode::ticket(Utc::now(), suffix)
    }
}
