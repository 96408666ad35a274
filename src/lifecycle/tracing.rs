//! # Logging
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered
//! by `RUST_LOG`. Module paths are hidden; the structured fields (`topic`,
//! `sku`, `order_number`, ...) carry the context instead.
//!
//! ```bash
//! RUST_LOG=info cargo run     # lifecycle, stock results, order outcome
//! RUST_LOG=debug cargo run    # every bus event and store call
//! RUST_LOG=checkout_flow::bus=trace cargo run
//! ```
//!
//! A typical placed order at `info`:
//!
//! ```text
//! INFO Checkout mounted thank_you_page=false
//! INFO Checkout controller started
//! INFO Stock reconciliation finished checked=2 unresolved=0 ok=true
//! INFO Placing order cart_id="cart-1" payment_method="liqpaymagento_liqpay"
//! INFO Order accepted order_number="000000042"
//! INFO Continuing with external payment order_number="000000042"
//! INFO Checkout unmounted
//! ```

/// Initialises the global subscriber. Call once, from `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
