//! # Checkout Lifecycle
//!
//! Mounting and unmounting the checkout screen, plus logging setup.
//!
//! The controller is useless on its own: it needs the store loaded, a bus
//! subscription, a background stock check and a network watcher, and all of
//! them must stop together. [`CheckoutSystem`] is the conductor for that.
//!
//! ```rust,ignore
//! let mut checkout = CheckoutSystem::mount(context).await;
//! // ... steps publish their events on the bus ...
//! checkout.unmount().await?;
//! checkout.unmount().await?; // no-op
//! ```
//!
//! ## Teardown
//!
//! 1. **Mark inactive** - `set_modified_at(None)` on the store
//! 2. **Unsubscribe** - the subscription scope removes every handler
//! 3. **Cancel** - the shared token stops stock lookups, the comment call,
//!    the network watcher and the controller loop
//! 4. **Await** - the controller and watcher tasks are joined
//!
//! Results that arrive after step 3 are discarded rather than applied.

pub mod checkout_system;
pub mod tracing;

pub use checkout_system::*;
pub use tracing::*;
