//! # Checkout Client
//!
//! Handle for talking to a running [`CheckoutActor`](crate::checkout_actor::CheckoutActor).
//! Cheap to clone; every method sends one command and awaits the reply.
use crate::checkout_actor::{CheckoutCommand, CheckoutState, SubmissionOutcome};
use crate::error::CheckoutError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct CheckoutClient {
    sender: mpsc::Sender<CheckoutCommand>,
}

impl CheckoutClient {
    pub fn new(sender: mpsc::Sender<CheckoutCommand>) -> Self {
        Self { sender }
    }

    /// Runs the place-order flow, as a `checkout-do-placeOrder` event would.
    ///
    /// `additional` is the payment widget's extra payload, stored on the
    /// payment details before the order is assembled.
    #[instrument(skip(self, additional))]
    pub async fn place_order(
        &self,
        additional: Option<serde_json::Value>,
    ) -> Result<SubmissionOutcome, CheckoutError> {
        debug!("Sending place_order");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CheckoutCommand::PlaceOrder {
                additional,
                respond_to,
            })
            .await
            .map_err(|_| CheckoutError::ActorClosed)?;
        response.await.map_err(|_| CheckoutError::ActorDropped)?
    }

    /// Returns a copy of the controller's current state.
    pub async fn snapshot(&self) -> Result<CheckoutState, CheckoutError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CheckoutCommand::Snapshot { respond_to })
            .await
            .map_err(|_| CheckoutError::ActorClosed)?;
        response.await.map_err(|_| CheckoutError::ActorDropped)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
