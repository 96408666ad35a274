//! Error types for the checkout controller and its collaborators.

use thiserror::Error;

/// Errors reported by the external checkout/cart store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The store has no active cart (no server token yet).
    #[error("Cart not available: {0}")]
    CartUnavailable(String),

    /// The backend rejected the order.
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Totals could not be synchronised with the backend.
    #[error("Totals sync failed: {0}")]
    SyncFailed(String),

    /// Any other failure while talking to the backend.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Errors from the local stock-check cache.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("Cache read failed: {0}")]
    Read(String),
    #[error("Stored stock result is malformed: {0}")]
    Malformed(String),
}

/// Errors from the order-comment endpoint.
#[derive(Debug, Error)]
pub enum CommentError {
    /// The request never reached the backend.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("Comment endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The cart has no server token, so there is nothing to attach to.
    #[error("Cart id missing")]
    MissingCartId,
}

impl From<reqwest::Error> for CommentError {
    fn from(e: reqwest::Error) -> Self {
        CommentError::Network(e.to_string())
    }
}

/// Errors surfaced by the checkout controller itself.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The controller's mailbox is closed (controller unmounted).
    #[error("Checkout controller closed")]
    ActorClosed,

    /// The controller dropped the response channel before answering.
    #[error("Checkout controller dropped response channel")]
    ActorDropped,

    /// The controller was torn down while the operation was suspended.
    #[error("Checkout controller cancelled")]
    Cancelled,

    /// The order for this checkout has already been confirmed.
    #[error("Order already placed: {0}")]
    AlreadyPlaced(String),

    /// A controller task panicked or was aborted during unmount.
    #[error("Checkout task failed: {0}")]
    TaskFailed(String),
}
