/// Cart records as read from the store.
///
/// The controller never computes cart contents; it reads them to decide
/// whether checkout can continue, which items await an online stock check,
/// and whether a shipping address is needed at all.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Product types that never ship physically.
const NON_SHIPPABLE_TYPES: [&str; 2] = ["virtual", "downloadable"];

/// Result of an asynchronous online stock check for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockCheckResult {
    pub is_in_stock: bool,
    #[serde(default)]
    pub qty: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub sku: String,
    pub name: String,
    pub qty: u32,
    pub price: f64,
    #[serde(rename = "type_id", default = "simple_type")]
    pub product_type: String,
    /// Identifier of the pending online stock check, if one was queued.
    #[serde(rename = "onlineStockCheckid", default, skip_serializing_if = "Option::is_none")]
    pub online_stock_check_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<StockCheckResult>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

fn simple_type() -> String {
    "simple".to_string()
}

impl CartItem {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, qty: u32, price: f64) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            qty,
            price,
            product_type: simple_type(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = product_type.into();
        self
    }

    pub fn with_stock_check(mut self, check_id: impl Into<String>) -> Self {
        self.online_stock_check_id = Some(check_id.into());
        self
    }

    pub fn is_shippable(&self) -> bool {
        !NON_SHIPPABLE_TYPES.contains(&self.product_type.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Backend cart id; `None` until the cart is synced with the server.
    pub server_token: Option<String>,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new(server_token: impl Into<String>, items: Vec<CartItem>) -> Self {
        Self {
            server_token: Some(server_token.into()),
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A cart is virtual when nothing in it ships physically.
    pub fn is_virtual(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| !item.is_shippable())
    }

    /// The backend cart id as sent in payloads (empty when not synced).
    pub fn cart_id(&self) -> String {
        self.server_token.clone().unwrap_or_default()
    }
}

/// One totals line (subtotal, shipping, grand total, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalSegment {
    pub code: String,
    pub title: String,
    pub value: f64,
}

/// Display projection of the cart sent by the cart-summary component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSummary {
    pub items_count: u32,
    pub totals: Vec<TotalSegment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_cart_requires_only_non_shippable_items() {
        let ebook = CartItem::new("EBOOK", "Ebook", 1, 5.0).with_type("downloadable");
        let gift = CartItem::new("GIFT", "Gift card", 1, 50.0).with_type("virtual");
        let mug = CartItem::new("MUG", "Mug", 1, 12.0);

        assert!(Cart::new("c1", vec![ebook.clone(), gift]).is_virtual());
        assert!(!Cart::new("c1", vec![ebook, mug]).is_virtual());
        assert!(!Cart::default().is_virtual());
    }

    #[test]
    fn test_cart_item_reads_storefront_field_names() {
        let item: CartItem = serde_json::from_value(serde_json::json!({
            "sku": "MUG",
            "name": "Mug",
            "qty": 2,
            "price": 12.0,
            "onlineStockCheckid": "task-7"
        }))
        .unwrap();

        assert_eq!(item.product_type, "simple");
        assert_eq!(item.online_stock_check_id.as_deref(), Some("task-7"));
    }
}
