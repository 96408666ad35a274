//! Demo: one checkout from mount to thank-you page.
//!
//! Runs against the in-memory collaborators from [`checkout_flow::mock`],
//! driving each step through the event bus the way the step forms would.

use checkout_flow::bus::{CheckoutEvent, EventBus};
use checkout_flow::checkout_actor::{CheckoutContext, SubmissionOutcome};
use checkout_flow::config::{CheckoutConfig, LIQPAY_METHOD};
use checkout_flow::lifecycle::{setup_tracing, CheckoutSystem};
use checkout_flow::mock::{MockCommentService, MockStockCache, MockStore, RecordingPresenter};
use checkout_flow::model::{
    Cart, CartItem, OrderConfirmation, OrderReview, PaymentDetails, PersonalDetails,
    ShippingDetails, ShippingMethod, ValidationResult,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = CheckoutConfig::from_env().with_payment_mapping("card", LIQPAY_METHOD);

    let cart = Cart::new(
        "cart-demo",
        vec![
            CartItem::new("MUG-01", "Enamel mug", 2, 9.5).with_stock_check("task-1"),
            CartItem::new("EBOOK-07", "Field guide", 1, 4.0).with_type("downloadable"),
        ],
    );
    let store = Arc::new(MockStore::new().with_cart(cart));
    store.expect_place_order().return_ok(OrderConfirmation {
        order_number: "000000042".to_string(),
        backend_order_id: Some("42".to_string()),
    });

    let bus = EventBus::new();
    let presenter = Arc::new(RecordingPresenter::new());
    let (_online_tx, online) = watch::channel(true);
    let ctx = CheckoutContext {
        store: store.clone(),
        stock_cache: Arc::new(MockStockCache::new().with_result("task-1", true)),
        comments: Arc::new(MockCommentService::new()),
        presenter: presenter.clone(),
        bus: bus.clone(),
        online,
        config: Arc::new(config),
    };

    let mut checkout = CheckoutSystem::mount(ctx).await;

    let span = tracing::info_span!("steps");
    async {
        info!("Filling in checkout steps");
        bus.publish(CheckoutEvent::PersonalDetails {
            data: PersonalDetails {
                first_name: "Ivanna".to_string(),
                last_name: "Koval".to_string(),
                email_address: "ivanna@example.com".to_string(),
                create_account: false,
            },
            validation: ValidationResult::valid(),
        });
        bus.publish(CheckoutEvent::ShippingDetails {
            data: ShippingDetails {
                first_name: "Ivanna".to_string(),
                last_name: "Koval".to_string(),
                country: "UA".to_string(),
                city: "Lviv".to_string(),
                street_address: "Rynok Sq 1".to_string(),
                phone_number: "+380501112233".to_string(),
                ..Default::default()
            },
            validation: ValidationResult::valid(),
        });
        bus.publish(CheckoutEvent::ShippingMethodChanged(ShippingMethod {
            carrier_code: "novaposhta".to_string(),
            method_code: "warehouse".to_string(),
        }));
        bus.publish(CheckoutEvent::PaymentDetails {
            data: PaymentDetails {
                first_name: "Ivanna".to_string(),
                last_name: "Koval".to_string(),
                state: "Lvivska".to_string(),
                phone_number: "+380501112233".to_string(),
                email_address: "ivanna@example.com".to_string(),
                payment_method: "card".to_string(),
                ..Default::default()
            },
            validation: ValidationResult::valid(),
        });
        bus.publish(CheckoutEvent::OrderReview {
            data: OrderReview {
                comment: "Please call before delivery".to_string(),
            },
            validation: ValidationResult::valid(),
        });
    }
    .instrument(span)
    .await;

    // Stock checks resolve in the background; give them a moment.
    for _ in 0..50 {
        let state = checkout.client.snapshot().await.map_err(|e| e.to_string())?;
        if state.stock.completed {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let span = tracing::info_span!("place_order");
    let outcome = async {
        info!("Placing order");
        checkout.client.place_order(None).await
    }
    .instrument(span)
    .await;

    match outcome {
        Ok(SubmissionOutcome::Placed(confirmation)) => {
            info!(order_number = %confirmation.order_number, "Order placed")
        }
        Ok(other) => info!(outcome = ?other, "Order not placed"),
        Err(e) => error!(error = %e, "Order failed"),
    }

    let state = checkout.client.snapshot().await.map_err(|e| e.to_string())?;
    info!(
        submission = ?state.submission,
        continuations = store.continuations().len(),
        notices = presenter.notices().len(),
        "Checkout finished"
    );

    checkout.unmount().await.map_err(|e| e.to_string())?;
    Ok(())
}
