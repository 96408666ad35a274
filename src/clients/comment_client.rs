//! # Order Comment Client
//!
//! The free-text comment from the order-review step is not part of the order
//! payload. It is attached to the guest cart through a separate vendor
//! endpoint before the order is placed:
//!
//! ```text
//! PUT {api}/api/ext/{vendor}/checkout/guest-carts/{cartId}/set-order-comment
//! {"cartId": "...", "orderComment": {"comment": "..."}}
//! ```
//!
//! The call is best-effort. Callers log the outcome and never block the
//! order on it.

use crate::config::CheckoutConfig;
use crate::error::CommentError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

#[async_trait]
pub trait CommentService: Send + Sync {
    /// Attaches `comment` to the cart, returning the backend's response body.
    async fn send_comment(
        &self,
        cart_id: &str,
        comment: &str,
    ) -> Result<serde_json::Value, CommentError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetOrderCommentRequest<'a> {
    cart_id: &'a str,
    order_comment: OrderComment<'a>,
}

#[derive(Serialize)]
struct OrderComment<'a> {
    comment: &'a str,
}

/// [`CommentService`] backed by the storefront API.
#[derive(Clone)]
pub struct HttpCommentClient {
    client: Client,
    base_url: String,
    vendor: String,
}

impl HttpCommentClient {
    pub fn new(base_url: &str, vendor: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            vendor: vendor.to_string(),
        }
    }

    pub fn from_config(config: &CheckoutConfig) -> Self {
        Self::new(&config.api_base_url, &config.vendor)
    }

    fn endpoint(&self, cart_id: &str) -> String {
        format!(
            "{}/api/ext/{}/checkout/guest-carts/{}/set-order-comment",
            self.base_url, self.vendor, cart_id
        )
    }
}

#[async_trait]
impl CommentService for HttpCommentClient {
    #[instrument(skip(self, comment))]
    async fn send_comment(
        &self,
        cart_id: &str,
        comment: &str,
    ) -> Result<serde_json::Value, CommentError> {
        if cart_id.is_empty() {
            return Err(CommentError::MissingCartId);
        }

        let body = SetOrderCommentRequest {
            cart_id,
            order_comment: OrderComment { comment },
        };

        debug!("Sending order comment");
        let response = self
            .client
            .put(self.endpoint(cart_id))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CommentError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        // Some deployments answer with plain text; keep it rather than fail.
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uses_vendor_and_cart() {
        let client = HttpCommentClient::new("https://api.example.com/", "kraina");
        assert_eq!(
            client.endpoint("abc"),
            "https://api.example.com/api/ext/kraina/checkout/guest-carts/abc/set-order-comment"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = SetOrderCommentRequest {
            cart_id: "abc",
            order_comment: OrderComment { comment: "leave at door" },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"cartId": "abc", "orderComment": {"comment": "leave at door"}})
        );
    }

    #[tokio::test]
    async fn test_missing_cart_id_is_rejected_without_request() {
        let client = HttpCommentClient::new("http://127.0.0.1:9", "kraina");
        let result = client.send_comment("", "hi").await;
        assert!(matches!(result, Err(CommentError::MissingCartId)));
    }
}
