//! # Checkout Flow
//!
//! > **The controller behind a storefront checkout screen.**
//!
//! The checkout screen is a handful of step forms (personal details,
//! shipping, international delivery, payment, order review) that report to
//! one controller over an event bus. The controller collects their data,
//! keeps the application store in sync, checks that every queued online
//! stock check came back positive, and finally assembles and submits the
//! order.
//!
//! ## Design
//!
//! ### 1. One owner for checkout state
//! The controller is an actor: a single Tokio task owns every record and
//! flag and processes bus events, client commands and internal completions
//! one at a time. No locks guard checkout state.
//!
//! ### 2. Collaborators behind traits
//! The application store, the stock-check cache, the comment endpoint and
//! the UI are reached only through [`clients`] traits. Production wires real
//! implementations; tests and the demo wire the doubles from [`mock`].
//!
//! ### 3. Typed events
//! Every bus topic carries exactly one payload type ([`bus::CheckoutEvent`]),
//! and a subscription lives exactly as long as its
//! [`SubscriptionScope`](bus::SubscriptionScope).
//!
//! ### 4. Lifetime-scoped background work
//! Stock lookups, the order comment, the payment recompute and the network
//! watcher all observe one cancellation token. Unmounting cancels it, so
//! nothing resolves into a torn-down controller.
//!
//! ## Module Tour
//!
//! - [`model`]: step records, cart, order payloads and the address mapping rules
//! - [`bus`]: topics, events and the publish/subscribe hub
//! - [`clients`]: collaborator traits, the HTTP comment client and [`CheckoutClient`](clients::CheckoutClient)
//! - [`checkout_actor`]: the controller, stock reconciliation, the
//!   single-flight payment recompute and the submission state machine
//! - [`lifecycle`]: [`CheckoutSystem`](lifecycle::CheckoutSystem) mount/unmount and logging setup
//! - [`config`]: store-view settings, from defaults or `CHECKOUT_*` variables
//! - [`error`]: error enums per concern
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=info cargo run     # demo checkout against in-memory collaborators
//! cargo test
//! ```

pub mod bus;
pub mod checkout_actor;
pub mod clients;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod model;
