//! # Checkout Configuration
//!
//! Static settings the controller needs but never computes: backend location,
//! store-view defaults, payment method mapping and stock-check bounds.
//!
//! Defaults match a single store view; [`CheckoutConfig::from_env`] overrides
//! them from `CHECKOUT_*` environment variables.

use std::collections::HashMap;
use std::time::Duration;

/// Payment method code of the external provider that needs a continuation
/// call after the order is placed.
pub const LIQPAY_METHOD: &str = "liqpaymagento_liqpay";

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Base URL of the storefront API (no trailing slash).
    pub api_base_url: String,

    /// Vendor segment of the extension endpoints (`/api/ext/<vendor>/...`).
    pub vendor: String,

    /// Country used when neither the checkout nor the event carries one.
    pub default_country: String,

    /// Postcode sent with every address block.
    pub default_zip_code: String,

    /// Store code prefixed to localized routes; `None` for the default store.
    pub store_code: Option<String>,

    /// Maps storefront payment method codes to backend codes.
    pub payment_methods_mapping: HashMap<String, String>,

    /// Payment method that triggers the provider continuation call.
    pub external_payment_method: String,

    /// Upper bound for a single stock-cache lookup.
    pub stock_check_timeout: Duration,

    /// Capacity of the controller's command mailbox.
    pub mailbox_size: usize,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            vendor: "kraina".to_string(),
            default_country: "UA".to_string(),
            default_zip_code: "00000".to_string(),
            store_code: None,
            payment_methods_mapping: HashMap::new(),
            external_payment_method: LIQPAY_METHOD.to_string(),
            stock_check_timeout: Duration::from_secs(10),
            mailbox_size: 32,
        }
    }
}

impl CheckoutConfig {
    /// Create config from environment variables.
    ///
    /// - `CHECKOUT_API_URL`: API base URL
    /// - `CHECKOUT_VENDOR`: extension vendor segment
    /// - `CHECKOUT_DEFAULT_COUNTRY`: store default country
    /// - `CHECKOUT_DEFAULT_ZIP`: postcode sent with addresses
    /// - `CHECKOUT_STORE_CODE`: store code for localized routes
    /// - `CHECKOUT_STOCK_TIMEOUT_MS`: per-lookup stock-check bound
    /// - `CHECKOUT_EXTERNAL_PAYMENT_METHOD`: provider method needing a continuation
    /// - `CHECKOUT_PAYMENT_METHODS_MAPPING`: `from=to,from=to`
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let stock_check_timeout = std::env::var("CHECKOUT_STOCK_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.stock_check_timeout);

        let payment_methods_mapping = std::env::var("CHECKOUT_PAYMENT_METHODS_MAPPING")
            .map(|raw| parse_mapping(&raw))
            .unwrap_or_default();

        Self {
            api_base_url: std::env::var("CHECKOUT_API_URL").unwrap_or(defaults.api_base_url),
            vendor: std::env::var("CHECKOUT_VENDOR").unwrap_or(defaults.vendor),
            default_country: std::env::var("CHECKOUT_DEFAULT_COUNTRY")
                .unwrap_or(defaults.default_country),
            default_zip_code: std::env::var("CHECKOUT_DEFAULT_ZIP")
                .unwrap_or(defaults.default_zip_code),
            store_code: std::env::var("CHECKOUT_STORE_CODE")
                .ok()
                .filter(|code| !code.is_empty()),
            payment_methods_mapping,
            external_payment_method: std::env::var("CHECKOUT_EXTERNAL_PAYMENT_METHOD")
                .unwrap_or(defaults.external_payment_method),
            stock_check_timeout,
            mailbox_size: defaults.mailbox_size,
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_default_country(mut self, country: impl Into<String>) -> Self {
        self.default_country = country.into();
        self
    }

    pub fn with_store_code(mut self, code: impl Into<String>) -> Self {
        self.store_code = Some(code.into());
        self
    }

    pub fn with_stock_check_timeout(mut self, timeout: Duration) -> Self {
        self.stock_check_timeout = timeout;
        self
    }

    pub fn with_payment_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.payment_methods_mapping.insert(from.into(), to.into());
        self
    }

    /// Resolves a storefront payment method to the backend code.
    pub fn map_payment_method(&self, method: &str) -> String {
        self.payment_methods_mapping
            .get(method)
            .cloned()
            .unwrap_or_else(|| method.to_string())
    }

    /// Prefixes `path` with the store code when one is configured.
    pub fn localized_route(&self, path: &str) -> String {
        match &self.store_code {
            Some(code) => format!("/{}/{}", code, path.trim_start_matches('/')),
            None => path.to_string(),
        }
    }
}

fn parse_mapping(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (from, to) = pair.split_once('=')?;
            let (from, to) = (from.trim(), to.trim());
            (!from.is_empty() && !to.is_empty()).then(|| (from.to_string(), to.to_string()))
        })
        .collect()
}
