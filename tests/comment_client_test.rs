use checkout_flow::clients::{CommentService, HttpCommentClient};
use checkout_flow::config::CheckoutConfig;
use checkout_flow::error::CommentError;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMMENT_PATH: &str = "/api/ext/kraina/checkout/guest-carts/cart-9/set-order-comment";

#[tokio::test]
async fn test_comment_is_put_to_guest_cart_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(COMMENT_PATH))
        .and(body_json(json!({
            "cartId": "cart-9",
            "orderComment": { "comment": "Ring twice" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": true })))
        .expect(1)
        .mount(&server)
        .await;

    let config = CheckoutConfig::default().with_api_base_url(server.uri());
    let client = HttpCommentClient::from_config(&config);

    let body = client.send_comment("cart-9", "Ring twice").await.unwrap();
    assert_eq!(body, json!({ "result": true }));
}

#[tokio::test]
async fn test_plain_text_response_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(COMMENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("saved"))
        .mount(&server)
        .await;

    let client = HttpCommentClient::new(&server.uri(), "kraina");

    let body = client.send_comment("cart-9", "Ring twice").await.unwrap();
    assert_eq!(body, json!("saved"));
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(COMMENT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("cart not found"))
        .mount(&server)
        .await;

    let client = HttpCommentClient::new(&server.uri(), "kraina");

    let result = client.send_comment("cart-9", "Ring twice").await;
    match result {
        Err(CommentError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "cart not found");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    let client = HttpCommentClient::new("http://127.0.0.1:9", "kraina");

    let result = client.send_comment("cart-9", "Ring twice").await;
    assert!(matches!(result, Err(CommentError::Network(_))));
}
