use crate::checkout_actor::{CheckoutState, SubmissionOutcome};
use crate::error::CheckoutError;
use tokio::sync::oneshot;

/// Requests sent to the checkout controller through its mailbox.
#[derive(Debug)]
pub enum CheckoutCommand {
    PlaceOrder {
        additional: Option<serde_json::Value>,
        respond_to: oneshot::Sender<Result<SubmissionOutcome, CheckoutError>>,
    },
    Snapshot {
        respond_to: oneshot::Sender<CheckoutState>,
    },
}
