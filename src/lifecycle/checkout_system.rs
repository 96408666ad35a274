use crate::bus::{CheckoutEvent, SubscriptionScope, Topic};
use crate::checkout_actor::{spawn_network_watcher, CheckoutActor, CheckoutContext};
use crate::clients::{CheckoutClient, Notice};
use crate::error::CheckoutError;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A mounted checkout screen.
///
/// `CheckoutSystem` owns everything whose lifetime matches the screen: the
/// controller task, its bus subscription, the network watcher and the
/// cancellation token shared by all background work.
///
/// # Example
///
/// ```ignore
/// let checkout = CheckoutSystem::mount(context).await;
///
/// bus.publish(CheckoutEvent::PaymentDetails { data, validation });
/// let outcome = checkout.client.place_order(None).await?;
///
/// checkout.unmount().await?;
/// ```
pub struct CheckoutSystem {
    /// Client for commands to the controller.
    pub client: CheckoutClient,

    ctx: CheckoutContext,
    cancel: CancellationToken,
    subscription: Option<SubscriptionScope>,
    handles: Vec<JoinHandle<()>>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl CheckoutSystem {
    /// Mounts the checkout screen.
    ///
    /// 1. Loads the checkout and the region/city reference data
    /// 2. Announces `checkout-after-load` and marks the checkout active
    /// 3. Subscribes the controller to its topics
    /// 4. Unless the thank-you page is showing, loads the cart: an empty cart
    ///    sends the shopper back to the storefront, otherwise stock checks start
    /// 5. Announces the effective shipping country
    /// 6. Starts the controller and the network watcher
    ///
    /// Store failures during mount are logged; the screen still mounts. If the
    /// cart cannot be loaded, stock checks start from the cart the store already
    /// holds, or from the first non-empty cart update.
    pub async fn mount(ctx: CheckoutContext) -> Self {
        let store = &ctx.store;

        let snapshot = match store.load_checkout().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Loading checkout failed");
                Default::default()
            }
        };
        if let Err(e) = store.load_reference_data().await {
            warn!(error = %e, "Loading reference data failed");
        }
        ctx.bus.publish(CheckoutEvent::AfterLoad);
        store.set_modified_at(Some(now_millis())).await;

        let cancel = CancellationToken::new();
        let (event_sender, events) = mpsc::unbounded_channel();
        let subscription = ctx.bus.subscribe(&Topic::CONTROLLER_TOPICS, event_sender);
        let (mut actor, client) = CheckoutActor::new(ctx.clone(), events, cancel.clone());

        if !snapshot.thank_you_page {
            match store.load_cart().await {
                Ok(cart) if cart.is_empty() => {
                    info!("Cart is empty, leaving checkout");
                    ctx.presenter.notify(Notice::EmptyCart);
                    ctx.presenter.redirect(&ctx.config.localized_route("/"));
                }
                Ok(cart) => actor.begin_stock_check(cart.items),
                Err(e) => {
                    error!(error = %e, "Loading cart failed");
                    // Fall back to the cart already held; an empty one waits for a cart event.
                    let cart = store.cart().await;
                    if !cart.is_empty() {
                        actor.begin_stock_check(cart.items);
                    }
                }
            }
        }

        let country = snapshot
            .shipping_country
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| ctx.config.default_country.clone());
        ctx.bus.publish(CheckoutEvent::BeforeShippingMethods {
            country: Some(country),
        });

        let actor_handle = tokio::spawn(actor.run());
        let watcher_handle =
            spawn_network_watcher(ctx.online.clone(), ctx.presenter.clone(), cancel.clone());

        info!(thank_you_page = snapshot.thank_you_page, "Checkout mounted");
        Self {
            client,
            ctx,
            cancel,
            subscription: Some(subscription),
            handles: vec![actor_handle, watcher_handle],
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Tears the screen down. Calling it again is a no-op.
    ///
    /// Marks the checkout inactive, removes every bus handler, cancels
    /// background work and waits for the controller tasks to finish.
    pub async fn unmount(&mut self) -> Result<(), CheckoutError> {
        let Some(mut subscription) = self.subscription.take() else {
            debug!("Checkout already unmounted");
            return Ok(());
        };

        self.ctx.store.set_modified_at(None).await;
        let removed = subscription.unsubscribe();
        self.cancel.cancel();
        debug!(removed, "Handlers removed");

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "Checkout task failed");
                return Err(CheckoutError::TaskFailed(e.to_string()));
            }
        }

        info!("Checkout unmounted");
        Ok(())
    }
}
