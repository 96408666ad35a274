//! # In-Memory Collaborators
//!
//! Test doubles for everything behind the controller's traits. They keep
//! state in memory, record every call, and let a test decide what the
//! backend answers.
//!
//! | Double | Stands in for | Knobs |
//! |--------|---------------|-------|
//! | [`MockStore`] | [`CheckoutStore`] | cart, snapshot, user, failing `load_cart`, `expect_place_order()` |
//! | [`MockStockCache`] | [`StockCache`] | per-check result or error |
//! | [`RecordingPresenter`] | [`Presenter`] | none, records notices and redirects |
//! | [`MockCommentService`] | [`CommentService`] | fail on demand |
//!
//! ```rust,ignore
//! let store = Arc::new(MockStore::new().with_cart(cart));
//! store.expect_place_order().return_ok(OrderConfirmation { .. });
//!
//! // ... mount the checkout and drive it ...
//!
//! assert_eq!(store.placed_orders().len(), 1);
//! store.verify();
//! ```
//!
//! `place_order` without a queued expectation answers with
//! [`StoreError::Backend`], which surfaces as an `OrderFailed` notice.

use crate::clients::{
    CheckoutSnapshot, CheckoutStore, CommentService, InternationalDeliveryRequest, Notice,
    Presenter, StepPayload, StockCache,
};
use crate::error::{CacheError, CommentError, StoreError};
use crate::model::{
    Cart, Order, OrderConfirmation, PaymentInformation, ShippingMethod, Step, StockCheckResult,
    TotalSegment,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A store call as observed by [`MockStore`]. Pure reads are not recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    LoadCheckout,
    LoadReferenceData,
    SetModifiedAt(Option<u64>),
    UpdateShippingCountry(String),
    LoadCart,
    SaveStep(Step),
    SyncTotals(Option<ShippingMethod>),
    SetInternationalDelivery {
        request: InternationalDeliveryRequest,
        is_logged_in: bool,
    },
    SetPaymentInformation(PaymentInformation),
    PlaceOrder(Order),
    SetThankYouPage(bool),
    RefreshOrderHistory,
    ContinueExternalPayment {
        order_number: String,
        cart_id: String,
    },
}

#[derive(Default)]
struct StoreData {
    snapshot: CheckoutSnapshot,
    cart: Cart,
    user: Option<String>,
    agreement_ids: Vec<String>,
    totals: Vec<TotalSegment>,
    calls: Vec<StoreCall>,
    load_cart_error: Option<StoreError>,
}

/// A queued `place_order` answer.
enum PlaceOrderAnswer {
    Reply(Result<OrderConfirmation, StoreError>),
    /// The backend never answers.
    Hang,
}

/// In-memory [`CheckoutStore`].
#[derive(Default)]
pub struct MockStore {
    data: Mutex<StoreData>,
    place_order: Arc<Mutex<VecDeque<PlaceOrderAnswer>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cart(self, cart: Cart) -> Self {
        lock(&self.data).cart = cart;
        self
    }

    pub fn with_snapshot(self, snapshot: CheckoutSnapshot) -> Self {
        lock(&self.data).snapshot = snapshot;
        self
    }

    pub fn with_user(self, user_id: impl Into<String>) -> Self {
        lock(&self.data).user = Some(user_id.into());
        self
    }

    pub fn with_agreements(self, ids: Vec<String>) -> Self {
        lock(&self.data).agreement_ids = ids;
        self
    }

    pub fn with_totals(self, totals: Vec<TotalSegment>) -> Self {
        lock(&self.data).totals = totals;
        self
    }

    /// Makes every `load_cart` fail; `cart()` still returns the held cart.
    pub fn with_load_cart_error(self, error: StoreError) -> Self {
        lock(&self.data).load_cart_error = Some(error);
        self
    }

    /// Replaces the cart, as a cart update elsewhere in the app would.
    pub fn set_cart(&self, cart: Cart) {
        lock(&self.data).cart = cart;
    }

    /// Queues the answer for the next `place_order` call.
    pub fn expect_place_order(&self) -> PlaceOrderExpectationBuilder {
        PlaceOrderExpectationBuilder {
            expectations: Arc::clone(&self.place_order),
        }
    }

    /// Panics if a queued `place_order` answer was never consumed.
    pub fn verify(&self) {
        let remaining = lock(&self.place_order).len();
        if remaining > 0 {
            panic!("Not all place_order expectations were met. {} remaining", remaining);
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.data).calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&StoreCall) -> bool) -> usize {
        lock(&self.data).calls.iter().filter(|&call| matches(call)).count()
    }

    pub fn placed_orders(&self) -> Vec<Order> {
        lock(&self.data)
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::PlaceOrder(order) => Some(order.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(order_number, cart_id)` of every external payment continuation.
    pub fn continuations(&self) -> Vec<(String, String)> {
        lock(&self.data)
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::ContinueExternalPayment {
                    order_number,
                    cart_id,
                } => Some((order_number.clone(), cart_id.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: StoreCall) {
        lock(&self.data).calls.push(call);
    }
}

#[async_trait]
impl CheckoutStore for MockStore {
    async fn load_checkout(&self) -> Result<CheckoutSnapshot, StoreError> {
        self.record(StoreCall::LoadCheckout);
        Ok(lock(&self.data).snapshot.clone())
    }

    async fn load_reference_data(&self) -> Result<(), StoreError> {
        self.record(StoreCall::LoadReferenceData);
        Ok(())
    }

    async fn set_modified_at(&self, at: Option<u64>) {
        self.record(StoreCall::SetModifiedAt(at));
    }

    async fn update_shipping_country(&self, country: &str) -> Result<(), StoreError> {
        self.record(StoreCall::UpdateShippingCountry(country.to_string()));
        lock(&self.data).snapshot.shipping_country = Some(country.to_string());
        Ok(())
    }

    async fn load_cart(&self) -> Result<Cart, StoreError> {
        self.record(StoreCall::LoadCart);
        let data = lock(&self.data);
        match &data.load_cart_error {
            Some(error) => Err(error.clone()),
            None => Ok(data.cart.clone()),
        }
    }

    async fn cart(&self) -> Cart {
        lock(&self.data).cart.clone()
    }

    async fn current_user(&self) -> Option<String> {
        lock(&self.data).user.clone()
    }

    async fn agreement_ids(&self) -> Vec<String> {
        lock(&self.data).agreement_ids.clone()
    }

    async fn totals(&self) -> Vec<TotalSegment> {
        lock(&self.data).totals.clone()
    }

    async fn save_step(&self, payload: StepPayload) -> Result<(), StoreError> {
        self.record(StoreCall::SaveStep(payload.step()));
        Ok(())
    }

    async fn sync_totals(&self, method: Option<ShippingMethod>) -> Result<(), StoreError> {
        self.record(StoreCall::SyncTotals(method));
        Ok(())
    }

    async fn set_international_delivery(
        &self,
        request: InternationalDeliveryRequest,
        is_logged_in: bool,
    ) -> Result<(), StoreError> {
        self.record(StoreCall::SetInternationalDelivery {
            request,
            is_logged_in,
        });
        Ok(())
    }

    async fn set_payment_information(
        &self,
        info: PaymentInformation,
        _is_logged_in: bool,
    ) -> Result<(), StoreError> {
        self.record(StoreCall::SetPaymentInformation(info));
        Ok(())
    }

    async fn place_order(&self, order: Order) -> Result<OrderConfirmation, StoreError> {
        self.record(StoreCall::PlaceOrder(order));
        let answer = lock(&self.place_order).pop_front();
        match answer {
            Some(PlaceOrderAnswer::Reply(result)) => result,
            Some(PlaceOrderAnswer::Hang) => std::future::pending().await,
            None => Err(StoreError::Backend("unexpected place_order".to_string())),
        }
    }

    async fn set_thank_you_page(&self, active: bool) {
        self.record(StoreCall::SetThankYouPage(active));
        lock(&self.data).snapshot.thank_you_page = active;
    }

    async fn refresh_order_history(&self) -> Result<(), StoreError> {
        self.record(StoreCall::RefreshOrderHistory);
        Ok(())
    }

    async fn continue_external_payment(
        &self,
        order_number: &str,
        cart_id: &str,
    ) -> Result<(), StoreError> {
        self.record(StoreCall::ContinueExternalPayment {
            order_number: order_number.to_string(),
            cart_id: cart_id.to_string(),
        });
        Ok(())
    }
}

/// Builder for `place_order` answers.
pub struct PlaceOrderExpectationBuilder {
    expectations: Arc<Mutex<VecDeque<PlaceOrderAnswer>>>,
}

impl PlaceOrderExpectationBuilder {
    pub fn return_ok(self, confirmation: OrderConfirmation) {
        lock(&self.expectations).push_back(PlaceOrderAnswer::Reply(Ok(confirmation)));
    }

    pub fn return_err(self, error: StoreError) {
        lock(&self.expectations).push_back(PlaceOrderAnswer::Reply(Err(error)));
    }

    /// The call is recorded but never completes.
    pub fn never_return(self) {
        lock(&self.expectations).push_back(PlaceOrderAnswer::Hang);
    }
}

/// In-memory [`StockCache`]. Unknown ids resolve to "not available yet".
#[derive(Default)]
pub struct MockStockCache {
    entries: Mutex<HashMap<String, Result<Option<StockCheckResult>, CacheError>>>,
}

impl MockStockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, check_id: impl Into<String>, is_in_stock: bool) -> Self {
        lock(&self.entries).insert(
            check_id.into(),
            Ok(Some(StockCheckResult {
                is_in_stock,
                qty: None,
            })),
        );
        self
    }

    pub fn with_error(self, check_id: impl Into<String>, error: CacheError) -> Self {
        lock(&self.entries).insert(check_id.into(), Err(error));
        self
    }
}

#[async_trait]
impl StockCache for MockStockCache {
    async fn lookup(&self, check_id: &str) -> Result<Option<StockCheckResult>, CacheError> {
        lock(&self.entries)
            .get(check_id)
            .cloned()
            .unwrap_or(Ok(None))
    }
}

/// [`Presenter`] that remembers what the shopper would have seen.
#[derive(Default)]
pub struct RecordingPresenter {
    notices: Mutex<Vec<Notice>>,
    redirects: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }

    pub fn count(&self, notice: &Notice) -> usize {
        lock(&self.notices).iter().filter(|n| *n == notice).count()
    }

    pub fn redirects(&self) -> Vec<String> {
        lock(&self.redirects).clone()
    }
}

impl Presenter for RecordingPresenter {
    fn notify(&self, notice: Notice) {
        lock(&self.notices).push(notice);
    }

    fn redirect(&self, path: &str) {
        lock(&self.redirects).push(path.to_string());
    }
}

/// [`CommentService`] that records comments instead of sending them.
#[derive(Default)]
pub struct MockCommentService {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl MockCommentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call records the comment and then fails with a 500.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(cart_id, comment)` pairs in call order.
    pub fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl CommentService for MockCommentService {
    async fn send_comment(
        &self,
        cart_id: &str,
        comment: &str,
    ) -> Result<serde_json::Value, CommentError> {
        lock(&self.sent).push((cart_id.to_string(), comment.to_string()));
        if self.fail {
            return Err(CommentError::Status {
                status: 500,
                body: "comment storage unavailable".to_string(),
            });
        }
        Ok(serde_json::json!({ "code": 200, "result": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_place_order_answers_in_queue_order() {
        let store = MockStore::new();
        store.expect_place_order().return_ok(OrderConfirmation {
            order_number: "1".into(),
            backend_order_id: None,
        });
        store
            .expect_place_order()
            .return_err(StoreError::OrderRejected("declined".into()));

        assert!(store.place_order(Order::default()).await.is_ok());
        assert!(matches!(
            store.place_order(Order::default()).await,
            Err(StoreError::OrderRejected(_))
        ));
        assert!(matches!(
            store.place_order(Order::default()).await,
            Err(StoreError::Backend(_))
        ));
        assert_eq!(store.placed_orders().len(), 3);
        store.verify();
    }

    #[tokio::test]
    async fn test_failing_load_cart_keeps_held_cart() {
        let store = MockStore::new()
            .with_cart(Cart::new("c1", Vec::new()))
            .with_load_cart_error(StoreError::Backend("timeout".into()));

        assert_eq!(
            store.load_cart().await,
            Err(StoreError::Backend("timeout".into()))
        );
        assert_eq!(store.cart().await.cart_id(), "c1");
    }

    #[tokio::test]
    async fn test_hanging_place_order_never_completes() {
        let store = MockStore::new();
        store.expect_place_order().never_return();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            store.place_order(Order::default()),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(store.placed_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_stock_cache_unknown_id_is_unresolved() {
        let cache = MockStockCache::new().with_result("a", true);
        assert!(cache.lookup("a").await.unwrap().is_some());
        assert_eq!(cache.lookup("b").await.unwrap(), None);
    }
}
