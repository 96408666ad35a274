//! Collaborators the checkout controller talks to.
//!
//! Everything outside the controller (the application store, the stock-check
//! cache, the comment endpoint, the UI) sits behind a trait here, so the
//! controller can be driven by the in-memory doubles in [`crate::mock`].

pub mod checkout_client;
pub mod comment_client;
pub mod presenter;
pub mod stock_cache;
pub mod store;

pub use checkout_client::*;
pub use comment_client::*;
pub use presenter::*;
pub use stock_cache::*;
pub use store::*;
