//! # Checkout Store
//!
//! The persistent checkout/cart state lives outside the controller. The
//! controller reaches it only through [`CheckoutStore`], one method per
//! action it needs, so every call site is type-checked instead of naming
//! actions by string.

use crate::error::StoreError;
use crate::model::{
    Cart, Order, OrderConfirmation, PaymentDetails, PaymentInformation, PersonalDetails,
    ShippingDetails, ShippingMethod, Step, TotalSegment,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the store remembers about the checkout when the screen opens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutSnapshot {
    /// Country saved with the shipping details, if any.
    pub shipping_country: Option<String>,
    pub thank_you_page: bool,
}

/// Step data persisted through [`CheckoutStore::save_step`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepPayload {
    PersonalDetails(PersonalDetails),
    Shipping(ShippingDetails),
    Payment(PaymentDetails),
}

impl StepPayload {
    pub fn step(&self) -> Step {
        match self {
            StepPayload::PersonalDetails(_) => Step::PersonalDetails,
            StepPayload::Shipping(_) => Step::Shipping,
            StepPayload::Payment(_) => Step::Payment,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternationalDeliveryRequest {
    pub cart_id: String,
    pub custom_fields: serde_json::Map<String, serde_json::Value>,
}

/// Typed facade over the application store.
///
/// Implementations must be cheap to share: the controller holds one behind an
/// `Arc` and calls it from background tasks as well as from its own loop.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn load_checkout(&self) -> Result<CheckoutSnapshot, StoreError>;

    /// Loads auxiliary reference data (region/city collections).
    async fn load_reference_data(&self) -> Result<(), StoreError>;

    /// Marks the checkout active (`Some(millis)`) or inactive (`None`).
    async fn set_modified_at(&self, at: Option<u64>);

    async fn update_shipping_country(&self, country: &str) -> Result<(), StoreError>;

    /// Reloads the cart from client state and returns it.
    async fn load_cart(&self) -> Result<Cart, StoreError>;

    /// The cart as currently held by the store.
    async fn cart(&self) -> Cart;

    /// Id of the logged-in user, `None` for guests.
    async fn current_user(&self) -> Option<String>;

    async fn agreement_ids(&self) -> Vec<String>;

    async fn totals(&self) -> Vec<TotalSegment>;

    async fn save_step(&self, payload: StepPayload) -> Result<(), StoreError>;

    /// Forces a server-side totals sync, optionally for a shipping method.
    async fn sync_totals(&self, method: Option<ShippingMethod>) -> Result<(), StoreError>;

    async fn set_international_delivery(
        &self,
        request: InternationalDeliveryRequest,
        is_logged_in: bool,
    ) -> Result<(), StoreError>;

    async fn set_payment_information(
        &self,
        info: PaymentInformation,
        is_logged_in: bool,
    ) -> Result<(), StoreError>;

    async fn place_order(&self, order: Order) -> Result<OrderConfirmation, StoreError>;

    async fn set_thank_you_page(&self, active: bool);

    async fn refresh_order_history(&self) -> Result<(), StoreError>;

    /// Hands a placed order over to the external payment provider.
    async fn continue_external_payment(
        &self,
        order_number: &str,
        cart_id: &str,
    ) -> Result<(), StoreError>;
}
