//! Checkout orchestration for the storefront.
//!
//! A checkout turns a cart into a receipt in five steps:
//! 1. Load the cart with its catalog items
//! 2. Reconcile requested quantities with live stock (read-only)
//! 3. Atomically decrement stock for every purchasable line
//! 4. Record a receipt for the lines that committed
//! 5. Remove purchased lines from the cart
//!
//! Lines that cannot be fulfilled stay in the cart. There is no rollback:
//! committed stock stays sold even if a later step fails.

pub mod cart;
pub mod code;
pub mod coordinator;
pub mod error;
pub mod notify;
pub mod outcome;
pub mod receipts;
pub mod reconciler;
pub mod recorder;
pub mod steps;

pub use cart::{CartService, CartTotal};
pub use code::{CodeGenerator, TicketCodeGenerator};
pub use coordinator::CheckoutCoordinator;
pub use error::{CartServiceError, CheckoutError, NotifyError, RecordError};
pub use notify::{BroadcastSink, NoopSink, OutcomeEvent, OutcomeSink};
pub use outcome::{CheckoutOutcome, CheckoutStatus};
pub use receipts::ReceiptService;
pub use reconciler::{Reconciler, Reconciliation, RejectedLine};
pub use recorder::{DEFAULT_CODE_ATTEMPTS, ReceiptRecorder};
