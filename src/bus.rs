//! # Typed Event Bus
//!
//! Checkout steps and the store talk to the controller through named topics.
//! Each topic has exactly one payload shape, captured by [`CheckoutEvent`], so
//! a handler can never receive the wrong data for its topic.
//!
//! Subscribers hand the bus an unbounded sender; [`EventBus::publish`] clones
//! the event into every sender registered for its topic, in registration
//! order. The returned [`SubscriptionScope`] owns the registration: calling
//! [`SubscriptionScope::unsubscribe`] (or dropping the scope) removes it.

use crate::model::{
    CartSummary, InternationalDelivery, Order, OrderConfirmation, OrderReview, PaymentDetails,
    PersonalDetails, ShippingDetails, ShippingMethod, ValidationResult,
};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CartAfterUpdate,
    CartAfterDelete,
    AfterPersonalDetails,
    AfterShippingDetails,
    AfterInternationalDelivery,
    AfterPaymentDetails,
    AfterOrderReview,
    AfterCartSummary,
    BeforePlaceOrder,
    DoPlaceOrder,
    OrderAfterPlaced,
    BeforeShippingMethods,
    AfterShippingMethodChanged,
    UsePaymentToShipping,
    AfterLoad,
}

impl Topic {
    /// Topics the checkout controller listens to while mounted.
    pub const CONTROLLER_TOPICS: [Topic; 14] = [
        Topic::CartAfterUpdate,
        Topic::CartAfterDelete,
        Topic::AfterPersonalDetails,
        Topic::AfterShippingDetails,
        Topic::AfterInternationalDelivery,
        Topic::AfterPaymentDetails,
        Topic::AfterOrderReview,
        Topic::AfterCartSummary,
        Topic::BeforePlaceOrder,
        Topic::DoPlaceOrder,
        Topic::OrderAfterPlaced,
        Topic::BeforeShippingMethods,
        Topic::AfterShippingMethodChanged,
        Topic::UsePaymentToShipping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::CartAfterUpdate => "cart-after-update",
            Topic::CartAfterDelete => "cart-after-delete",
            Topic::AfterPersonalDetails => "checkout-after-personalDetails",
            Topic::AfterShippingDetails => "checkout-after-shippingDetails",
            Topic::AfterInternationalDelivery => "checkout-after-internationalDelivery",
            Topic::AfterPaymentDetails => "checkout-after-paymentDetails",
            Topic::AfterOrderReview => "checkout-after-orderReview",
            Topic::AfterCartSummary => "checkout-after-cartSummary",
            Topic::BeforePlaceOrder => "checkout-before-placeOrder",
            Topic::DoPlaceOrder => "checkout-do-placeOrder",
            Topic::OrderAfterPlaced => "order-after-placed",
            Topic::BeforeShippingMethods => "checkout-before-shippingMethods",
            Topic::AfterShippingMethodChanged => "checkout-after-shippingMethodChanged",
            Topic::UsePaymentToShipping => "checkout-use-payment-to-shipping",
            Topic::AfterLoad => "checkout-after-load",
        }
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload carried on each topic.
#[derive(Debug, Clone)]
pub enum CheckoutEvent {
    CartAfterUpdate,
    CartAfterDelete,
    PersonalDetails {
        data: PersonalDetails,
        validation: ValidationResult,
    },
    ShippingDetails {
        data: ShippingDetails,
        validation: ValidationResult,
    },
    InternationalDelivery {
        data: InternationalDelivery,
        validation: ValidationResult,
    },
    PaymentDetails {
        data: PaymentDetails,
        validation: ValidationResult,
    },
    OrderReview {
        data: OrderReview,
        validation: ValidationResult,
    },
    CartSummary(CartSummary),
    BeforePlaceOrder(Option<serde_json::Value>),
    /// Place-order request with the payment widget's additional payload.
    DoPlaceOrder(Option<serde_json::Value>),
    OrderPlaced {
        order: Order,
        confirmation: OrderConfirmation,
    },
    BeforeShippingMethods {
        country: Option<String>,
    },
    ShippingMethodChanged(ShippingMethod),
    UsePaymentToShipping(bool),
    AfterLoad,
}

impl CheckoutEvent {
    pub fn topic(&self) -> Topic {
        match self {
            CheckoutEvent::CartAfterUpdate => Topic::CartAfterUpdate,
            CheckoutEvent::CartAfterDelete => Topic::CartAfterDelete,
            CheckoutEvent::PersonalDetails { .. } => Topic::AfterPersonalDetails,
            CheckoutEvent::ShippingDetails { .. } => Topic::AfterShippingDetails,
            CheckoutEvent::InternationalDelivery { .. } => Topic::AfterInternationalDelivery,
            CheckoutEvent::PaymentDetails { .. } => Topic::AfterPaymentDetails,
            CheckoutEvent::OrderReview { .. } => Topic::AfterOrderReview,
            CheckoutEvent::CartSummary(_) => Topic::AfterCartSummary,
            CheckoutEvent::BeforePlaceOrder(_) => Topic::BeforePlaceOrder,
            CheckoutEvent::DoPlaceOrder(_) => Topic::DoPlaceOrder,
            CheckoutEvent::OrderPlaced { .. } => Topic::OrderAfterPlaced,
            CheckoutEvent::BeforeShippingMethods { .. } => Topic::BeforeShippingMethods,
            CheckoutEvent::ShippingMethodChanged(_) => Topic::AfterShippingMethodChanged,
            CheckoutEvent::UsePaymentToShipping(_) => Topic::UsePaymentToShipping,
            CheckoutEvent::AfterLoad => Topic::AfterLoad,
        }
    }
}

type Subscriber = (u64, mpsc::UnboundedSender<CheckoutEvent>);

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<Topic, Vec<Subscriber>>,
}

/// Topic-based publish/subscribe hub shared by the steps and the controller.
///
/// Cloning is cheap; all clones share the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sender` for every topic in `topics`.
    pub fn subscribe(
        &self,
        topics: &[Topic],
        sender: mpsc::UnboundedSender<CheckoutEvent>,
    ) -> SubscriptionScope {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        for topic in topics {
            registry
                .subscribers
                .entry(*topic)
                .or_default()
                .push((id, sender.clone()));
        }
        debug!(subscription = id, topics = topics.len(), "Subscribed");

        SubscriptionScope {
            id,
            topics: topics.to_vec(),
            bus: self.clone(),
            active: true,
        }
    }

    /// Delivers `event` to every subscriber of its topic, returning how many
    /// received it. Subscribers whose receiver is gone are pruned.
    pub fn publish(&self, event: CheckoutEvent) -> usize {
        let topic = event.topic();
        let mut registry = lock(&self.registry);
        let Some(subscribers) = registry.subscribers.get_mut(&topic) else {
            trace!(%topic, "No subscribers");
            return 0;
        };

        subscribers.retain(|(_, sender)| sender.send(event.clone()).is_ok());
        let delivered = subscribers.len();
        debug!(%topic, delivered, "Published");
        delivered
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        lock(&self.registry)
            .subscribers
            .get(&topic)
            .map_or(0, Vec::len)
    }

    fn remove(&self, id: u64, topics: &[Topic]) -> usize {
        let mut registry = lock(&self.registry);
        let mut removed = 0;
        for topic in topics {
            if let Some(subscribers) = registry.subscribers.get_mut(topic) {
                let before = subscribers.len();
                subscribers.retain(|(sub_id, _)| *sub_id != id);
                removed += before - subscribers.len();
            }
        }
        removed
    }
}

/// Owns one subscription; the registration lives exactly as long as the scope.
pub struct SubscriptionScope {
    id: u64,
    topics: Vec<Topic>,
    bus: EventBus,
    active: bool,
}

impl SubscriptionScope {
    /// Removes every handler registered through this scope.
    ///
    /// Returns the number of registrations removed; repeated calls return 0.
    pub fn unsubscribe(&mut self) -> usize {
        if !self.active {
            return 0;
        }
        self.active = false;
        let removed = self.bus.remove(self.id, &self.topics);
        debug!(subscription = self.id, removed, "Unsubscribed");
        removed
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for SubscriptionScope {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names_match_storefront_events() {
        assert_eq!(Topic::AfterPaymentDetails.as_str(), "checkout-after-paymentDetails");
        assert_eq!(Topic::OrderAfterPlaced.as_str(), "order-after-placed");
        assert_eq!(
            CheckoutEvent::UsePaymentToShipping(true).topic().as_str(),
            "checkout-use-payment-to-shipping"
        );
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers_in_registration_order() {
        let bus = EventBus::new();
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let (second_tx, mut second_rx) = mpsc::unbounded_channel();
        let _first = bus.subscribe(&[Topic::CartAfterUpdate], first_tx);
        let _second = bus.subscribe(&[Topic::CartAfterUpdate], second_tx);

        assert_eq!(bus.publish(CheckoutEvent::CartAfterUpdate), 2);
        assert_eq!(bus.publish(CheckoutEvent::CartAfterDelete), 0);

        assert!(matches!(first_rx.recv().await, Some(CheckoutEvent::CartAfterUpdate)));
        assert!(matches!(second_rx.recv().await, Some(CheckoutEvent::CartAfterUpdate)));
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scope = bus.subscribe(&Topic::CONTROLLER_TOPICS, tx);
        assert_eq!(bus.subscriber_count(Topic::DoPlaceOrder), 1);

        assert_eq!(scope.unsubscribe(), Topic::CONTROLLER_TOPICS.len());
        assert_eq!(scope.unsubscribe(), 0);
        assert!(!scope.is_active());
        assert_eq!(bus.subscriber_count(Topic::DoPlaceOrder), 0);
    }

    #[test]
    fn test_dropping_scope_unsubscribes() {
        let bus = EventBus::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        {
            let _scope = bus.subscribe(&[Topic::AfterLoad], tx);
            assert_eq!(bus.subscriber_count(Topic::AfterLoad), 1);
        }
        assert_eq!(bus.subscriber_count(Topic::AfterLoad), 0);
    }

    #[test]
    fn test_closed_receivers_are_pruned() {
        let bus = EventBus::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let _scope = bus.subscribe(&[Topic::AfterLoad], tx);
        drop(rx);

        assert_eq!(bus.publish(CheckoutEvent::AfterLoad), 0);
        assert_eq!(bus.subscriber_count(Topic::AfterLoad), 0);
    }
}
