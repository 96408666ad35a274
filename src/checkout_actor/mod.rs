//! # Checkout Controller Actor
//!
//! The controller owns every piece of checkout-screen state (step records,
//! validation results, stock status, the submission state machine) inside one
//! Tokio task. Three sources feed its loop:
//!
//! - **Bus events** from the step forms and the store, via a
//!   [`SubscriptionScope`](crate::bus::SubscriptionScope) registered at mount.
//! - **Commands** from a [`CheckoutClient`](crate::clients::CheckoutClient),
//!   answered through oneshot channels.
//! - **Internal completions**, currently the stock reconciliation report.
//!
//! Messages are processed one at a time, so handlers never race each other.
//! Work that must not hold the loop (stock lookups, the order comment) runs
//! in spawned tasks that report back or only log.
//!
//! Every spawned task and every handler resuming from an `.await` checks the
//! controller's [`CancellationToken`] first: once the checkout is unmounted,
//! late results are dropped instead of touching state. A handler still
//! waiting on a collaborator when the token fires is dropped mid-flight, so
//! a store call that never answers cannot hold up unmount.

pub mod message;
pub mod network;
pub mod single_flight;
pub mod stock;
pub mod submission;

pub use message::*;
pub use network::*;
pub use single_flight::*;
pub use stock::*;
pub use submission::*;

use crate::bus::{CheckoutEvent, EventBus};
use crate::clients::{
    CheckoutClient, CheckoutStore, CommentService, InternationalDeliveryRequest, Notice,
    Presenter, StepPayload, StockCache,
};
use crate::config::CheckoutConfig;
use crate::error::CheckoutError;
use crate::model::{
    Address, AgreementIds, Cart, CartItem, CartSummary, InternationalDelivery, Order,
    OrderConfirmation, OrderDraft, PaymentDetails, PaymentInformation, PaymentMethodSelection,
    PersonalDetails, ShippingDetails, ShippingMethod, Step, StepRecord, ValidationResult,
};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Collaborators injected into the controller.
#[derive(Clone)]
pub struct CheckoutContext {
    pub store: Arc<dyn CheckoutStore>,
    pub stock_cache: Arc<dyn StockCache>,
    pub comments: Arc<dyn CommentService>,
    pub presenter: Arc<dyn Presenter>,
    pub bus: EventBus,
    /// Connectivity signal; `true` while online.
    pub online: watch::Receiver<bool>,
    pub config: Arc<CheckoutConfig>,
}

/// Everything the checkout screen has collected so far.
#[derive(Debug, Clone, Default)]
pub struct CheckoutState {
    pub personal_details: PersonalDetails,
    pub shipping: ShippingDetails,
    pub international_delivery: InternationalDelivery,
    pub payment: PaymentDetails,
    pub shipping_method: Option<ShippingMethod>,
    pub comment: String,
    pub cart_summary: CartSummary,
    pub validation: BTreeMap<Step, ValidationResult>,
    pub use_other_address: bool,
    pub stock: StockStatus,
    /// Items whose online stock check resolved, with stock errors attached.
    pub stock_items: Vec<CartItem>,
    pub submission: SubmissionState,
    /// Last order handed to the store.
    pub order: Option<Order>,
    pub confirmation: Option<OrderConfirmation>,
}

pub struct CheckoutActor {
    receiver: mpsc::Receiver<CheckoutCommand>,
    events: mpsc::UnboundedReceiver<CheckoutEvent>,
    reports: mpsc::UnboundedReceiver<StockReport>,
    report_sender: mpsc::UnboundedSender<StockReport>,
    ctx: CheckoutContext,
    cancel: CancellationToken,
    payment_flight: SingleFlight<PaymentInformation>,
    stock_started: bool,
    state: CheckoutState,
}

/// Recomputes payment/billing information, then re-syncs totals.
fn payment_job(store: Arc<dyn CheckoutStore>) -> Job<PaymentInformation> {
    Arc::new(move |info: PaymentInformation| {
        let store = Arc::clone(&store);
        async move {
            let is_logged_in = store.current_user().await.is_some();
            let method = info.shipping_method.clone();
            if let Err(e) = store.set_payment_information(info, is_logged_in).await {
                warn!(error = %e, "Payment information update failed");
                return;
            }
            if let Err(e) = store.sync_totals(method).await {
                warn!(error = %e, "Totals sync after payment update failed");
            }
        }
        .boxed()
    })
}

impl CheckoutActor {
    /// Creates the controller and its client.
    ///
    /// `events` is the receiving half of the controller's bus subscription.
    /// The actor does nothing until [`run`](Self::run) is spawned.
    pub fn new(
        ctx: CheckoutContext,
        events: mpsc::UnboundedReceiver<CheckoutEvent>,
        cancel: CancellationToken,
    ) -> (Self, CheckoutClient) {
        let (sender, receiver) = mpsc::channel(ctx.config.mailbox_size);
        let (report_sender, reports) = mpsc::unbounded_channel();
        let payment_flight = SingleFlight::new(payment_job(Arc::clone(&ctx.store)), cancel.clone());

        let actor = Self {
            receiver,
            events,
            reports,
            report_sender,
            ctx,
            cancel,
            payment_flight,
            stock_started: false,
            state: CheckoutState::default(),
        };
        (actor, CheckoutClient::new(sender))
    }

    /// Starts reconciling the online stock checks of `items` in the background.
    pub fn begin_stock_check(&mut self, items: Vec<CartItem>) {
        self.stock_started = true;
        if items.iter().all(|item| item.online_stock_check_id.is_none()) {
            debug!("No pending stock checks");
            self.state.stock = StockStatus::ready();
            return;
        }

        self.state.stock = StockStatus::default();
        let cache = Arc::clone(&self.ctx.stock_cache);
        let timeout = self.ctx.config.stock_check_timeout;
        let reports = self.report_sender.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => debug!("Stock reconciliation abandoned"),
                report = reconcile(cache.as_ref(), items, timeout) => {
                    let _ = reports.send(report);
                }
            }
        });
    }

    /// Runs the controller until it is cancelled or every client is dropped.
    pub async fn run(mut self) {
        info!("Checkout controller started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some(report) = self.reports.recv() => self.apply_stock_report(report),
                Some(event) = self.events.recv() => {
                    let cancel = self.cancel.clone();
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            warn!("Event handler abandoned on unmount");
                            break;
                        }
                        _ = self.handle_event(event) => {}
                    }
                }
                command = self.receiver.recv() => match command {
                    Some(command) => {
                        // Dropping the handler drops its reply sender; the caller sees ActorDropped.
                        let cancel = self.cancel.clone();
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                warn!("Command abandoned on unmount");
                                break;
                            }
                            _ = self.handle_command(command) => {}
                        }
                    }
                    None => break,
                },
            }
        }

        info!(state = ?self.state.submission, "Checkout controller stopped");
    }

    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    fn ensure_live(&self) -> Result<(), CheckoutError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(CheckoutError::Cancelled)
        }
    }

    async fn handle_command(&mut self, command: CheckoutCommand) {
        match command {
            CheckoutCommand::PlaceOrder {
                additional,
                respond_to,
            } => {
                let result = self.place_order(additional).await;
                let _ = respond_to.send(result);
            }
            CheckoutCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.state.clone());
            }
        }
    }

    async fn handle_event(&mut self, event: CheckoutEvent) {
        debug!(topic = %event.topic(), "Event");

        match event {
            CheckoutEvent::CartAfterUpdate | CheckoutEvent::CartAfterDelete => {
                let cart = self.ctx.store.cart().await;
                if !self.is_live() {
                    return;
                }
                if cart.is_empty() {
                    self.notify_empty_cart();
                } else if !self.stock_started {
                    info!("Cart available, starting stock checks");
                    self.begin_stock_check(cart.items);
                }
            }
            CheckoutEvent::PersonalDetails { data, validation } => {
                self.accept_step(&data, validation);
                self.state.personal_details = data.clone();
                self.save_step(StepPayload::PersonalDetails(data)).await;
            }
            CheckoutEvent::ShippingDetails { data, validation } => {
                self.accept_step(&data, validation);
                self.state.shipping = data.clone();
                self.save_step(StepPayload::Shipping(data)).await;
            }
            CheckoutEvent::InternationalDelivery { data, validation } => {
                self.accept_step(&data, validation);
                self.state.international_delivery = data;
                self.save_international_delivery().await;
            }
            CheckoutEvent::PaymentDetails { data, validation } => {
                self.accept_step(&data, validation);
                self.state.payment = data.clone();
                self.save_step(StepPayload::Payment(data)).await;
                if self.is_live() {
                    let info = self.payment_information().await;
                    let ticket = self.payment_flight.submit(info);
                    debug!(ticket, "Payment recompute scheduled");
                }
            }
            CheckoutEvent::OrderReview { data, validation } => {
                self.accept_step(&data, validation);
                self.state.comment = data.comment;
            }
            CheckoutEvent::CartSummary(summary) => {
                self.state.cart_summary = summary;
            }
            CheckoutEvent::BeforePlaceOrder(payload) => {
                debug!(?payload, "Before place order");
            }
            CheckoutEvent::DoPlaceOrder(additional) => match self.place_order(additional).await {
                Ok(outcome) => info!(?outcome, "Place order finished"),
                Err(e) => warn!(error = %e, "Place order failed"),
            },
            CheckoutEvent::OrderPlaced {
                order,
                confirmation,
            } => self.on_order_placed(order, confirmation).await,
            CheckoutEvent::BeforeShippingMethods { country } => {
                let country = country
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| self.ctx.config.default_country.clone());
                if let Err(e) = self.ctx.store.update_shipping_country(&country).await {
                    warn!(%country, error = %e, "Shipping country update failed");
                }
                if let Err(e) = self.ctx.store.sync_totals(None).await {
                    warn!(error = %e, "Totals sync failed");
                }
            }
            CheckoutEvent::ShippingMethodChanged(method) => {
                if let Err(e) = self.ctx.store.sync_totals(Some(method.clone())).await {
                    warn!(error = %e, "Totals sync failed");
                }
                if self.is_live() {
                    debug!(carrier = %method.carrier_code, method = %method.method_code, "Shipping method changed");
                    self.state.shipping_method = Some(method);
                }
            }
            CheckoutEvent::UsePaymentToShipping(use_other_address) => {
                self.state.use_other_address = use_other_address;
            }
            CheckoutEvent::AfterLoad => {}
        }
    }

    fn accept_step<R: StepRecord>(&mut self, record: &R, reported: ValidationResult) {
        let result = record.accept(reported);
        if !result.is_valid() {
            debug!(step = %R::STEP, errors = ?result.field_errors, "Step reported invalid");
        }
        self.state.validation.insert(R::STEP, result);
    }

    async fn save_step(&self, payload: StepPayload) {
        let step = payload.step();
        if let Err(e) = self.ctx.store.save_step(payload).await {
            warn!(%step, error = %e, "Saving step failed");
        }
    }

    async fn save_international_delivery(&self) {
        let cart = self.ctx.store.cart().await;
        let is_logged_in = self.ctx.store.current_user().await.is_some();
        let request = InternationalDeliveryRequest {
            cart_id: cart.cart_id(),
            custom_fields: self.state.international_delivery.custom_fields.clone(),
        };
        if let Err(e) = self
            .ctx
            .store
            .set_international_delivery(request, is_logged_in)
            .await
        {
            warn!(error = %e, "Saving international delivery failed");
        }
    }

    async fn payment_information(&self) -> PaymentInformation {
        let cart = self.ctx.store.cart().await;
        let agreement_ids = self.ctx.store.agreement_ids().await;
        let config = &self.ctx.config;
        let payment = &self.state.payment;
        let shipping = &self.state.shipping;

        PaymentInformation {
            billing_address: Address::billing(payment, shipping, &config.default_zip_code),
            country_id: shipping.country.clone(),
            postcode: config.default_zip_code.clone(),
            cart_id: cart.cart_id(),
            email: payment.email_address.clone(),
            payment_method: PaymentMethodSelection {
                method: config.map_payment_method(&payment.payment_method),
                extension_attributes: AgreementIds { agreement_ids },
            },
            shipping_method: self.state.shipping_method.clone(),
        }
    }

    fn apply_stock_report(&mut self, report: StockReport) {
        if !self.is_live() {
            return;
        }
        for item in report.out_of_stock() {
            warn!(sku = %item.sku, "Product out of stock");
            self.ctx.presenter.notify(Notice::OutOfStock {
                sku: item.sku.clone(),
                name: item.name.clone(),
            });
        }
        self.state.stock = StockStatus {
            completed: true,
            ok: report.ok,
        };
        self.state.stock_items = report.checked;
    }

    fn notify_empty_cart(&self) {
        info!("Cart is empty, leaving checkout");
        self.ctx.presenter.notify(Notice::EmptyCart);
        self.ctx
            .presenter
            .redirect(&self.ctx.config.localized_route("/"));
    }

    async fn place_order(
        &mut self,
        additional: Option<serde_json::Value>,
    ) -> Result<SubmissionOutcome, CheckoutError> {
        // Requests are handled one at a time and every path below settles the
        // state before returning, so only a confirmed checkout is left to refuse.
        if self.state.submission == SubmissionState::Confirmed {
            let number = self
                .state
                .confirmation
                .as_ref()
                .map(|c| c.order_number.clone())
                .unwrap_or_default();
            return Err(CheckoutError::AlreadyPlaced(number));
        }

        let cart = self.ctx.store.cart().await;
        self.ensure_live()?;
        if cart.is_empty() {
            self.notify_empty_cart();
            return Ok(SubmissionOutcome::EmptyCart);
        }
        self.state.payment.payment_method_additional = additional;

        self.state.submission = SubmissionState::Validating;
        let online = *self.ctx.online.borrow();
        if let Err(rejection) =
            check_readiness(&self.state.validation, cart.is_virtual(), online, self.state.stock)
        {
            warn!(?rejection, "Order not ready");
            self.ctx.presenter.notify(rejection.notice());
            self.state.submission = SubmissionState::Idle;
            return Ok(SubmissionOutcome::Rejected(rejection));
        }

        self.state.submission = SubmissionState::Submitting;
        match self.submit(&cart).await {
            Ok(confirmation) => Ok(SubmissionOutcome::Placed(confirmation)),
            Err(CheckoutError::Cancelled) => Err(CheckoutError::Cancelled),
            Err(e) => {
                error!(error = %e, "Order submission failed");
                self.ctx.presenter.notify(Notice::OrderFailed);
                self.state.submission = SubmissionState::Idle;
                Err(e)
            }
        }
    }

    async fn submit(&mut self, cart: &Cart) -> Result<OrderConfirmation, CheckoutError> {
        if !self.state.comment.trim().is_empty() {
            self.send_comment(cart.cart_id());
        }

        let info = self.payment_information().await;
        self.payment_flight.run(info).await?;
        self.ensure_live()?;

        // Totals and items may have changed with the payment recompute.
        let cart = self.ctx.store.cart().await;
        let totals = self.ctx.store.totals().await;
        let user_id = self.ctx.store.current_user().await;
        self.ensure_live()?;

        let config = &self.ctx.config;
        let cart_id = cart.cart_id();
        let order = Order::assemble(OrderDraft {
            user_id: user_id.as_deref(),
            cart_id: &cart_id,
            products: cart.items.clone(),
            totals,
            payment: &self.state.payment,
            shipping: &self.state.shipping,
            shipping_method: self.state.shipping_method.as_ref(),
            payment_method_code: config.map_payment_method(&self.state.payment.payment_method),
            postcode: &config.default_zip_code,
            is_virtual: cart.is_virtual(),
            use_other_address: self.state.use_other_address,
        });
        self.state.order = Some(order.clone());

        info!(%cart_id, payment_method = order.payment_method_code(), "Placing order");
        let confirmation = self.ctx.store.place_order(order.clone()).await?;
        self.ensure_live()?;

        info!(order_number = %confirmation.order_number, "Order accepted");
        self.ctx.bus.publish(CheckoutEvent::OrderPlaced {
            order,
            confirmation: confirmation.clone(),
        });
        Ok(confirmation)
    }

    /// Attaches the review comment to the cart. Never awaited by submission.
    fn send_comment(&self, cart_id: String) {
        let comments = Arc::clone(&self.ctx.comments);
        let comment = self.state.comment.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => debug!("Order comment abandoned"),
                result = comments.send_comment(&cart_id, &comment) => match result {
                    Ok(body) => info!(%body, "Order comment saved"),
                    Err(e) => warn!(error = %e, "Order comment failed"),
                },
            }
        });
    }

    async fn on_order_placed(&mut self, order: Order, confirmation: OrderConfirmation) {
        if self.state.submission != SubmissionState::Submitting {
            debug!(order_number = %confirmation.order_number, "Ignoring confirmation without a submission in flight");
            return;
        }
        self.state.submission = SubmissionState::Confirmed;
        self.state.confirmation = Some(confirmation.clone());

        let store = &self.ctx.store;
        if order.payment_method_code() == self.ctx.config.external_payment_method {
            info!(order_number = %confirmation.order_number, "Continuing with external payment");
            if let Err(e) = store
                .continue_external_payment(&confirmation.order_number, &order.cart_id)
                .await
            {
                error!(error = %e, "External payment continuation failed");
            }
        }
        if !self.is_live() {
            return;
        }

        store.set_thank_you_page(true).await;
        if let Err(e) = store.refresh_order_history().await {
            warn!(error = %e, "Order history refresh failed");
        }
        debug!(?order, "Order placed");
    }
}
