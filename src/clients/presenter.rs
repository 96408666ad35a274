//! User-facing side effects: notifications and navigation.

use std::fmt::Display;

/// Notification shown to the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    EmptyCart,
    OutOfStock { sku: String, name: String },
    ProductsNotAvailable,
    InvalidData,
    NoConnection,
    OrderFailed,
}

impl Notice {
    pub fn is_error(&self) -> bool {
        !matches!(self, Notice::EmptyCart)
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::EmptyCart => write!(f, "Shopping cart is empty. Please add some products before entering Checkout"),
            Notice::OutOfStock { name, .. } => write!(f, "The product {} is out of stock!", name),
            Notice::ProductsNotAvailable => write!(f, "Some of the ordered products are not available!"),
            Notice::InvalidData => write!(f, "Please check if all data are correct"),
            Notice::NoConnection => write!(f, "There is no Internet connection. Your order can be placed once you are back online."),
            Notice::OrderFailed => write!(f, "The order could not be placed. Please try again"),
        }
    }
}

pub trait Presenter: Send + Sync {
    fn notify(&self, notice: Notice);

    /// Navigates to an already localized route.
    fn redirect(&self, path: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_notice_does_not_invite_placing_the_order() {
        let text = Notice::NoConnection.to_string();
        assert!(text.contains("once you are back online"));
        assert!(!text.contains("can still place"));
        assert!(Notice::NoConnection.is_error());
    }

    #[test]
    fn test_out_of_stock_notice_names_the_product() {
        let notice = Notice::OutOfStock {
            sku: "MUG".to_string(),
            name: "Enamel mug".to_string(),
        };
        assert_eq!(notice.to_string(), "The product Enamel mug is out of stock!");
        assert!(!Notice::EmptyCart.is_error());
    }
}
