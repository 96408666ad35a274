/// Order payloads and the address mapping rules used to build them.
///
/// Field names follow the backend's order endpoint, which mixes snake_case
/// keys with camelCase address blocks.
use crate::model::{CartItem, PaymentDetails, ShippingDetails, ShippingMethod, TotalSegment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub region: String,
    pub region_id: u32,
    pub country_id: String,
    pub street: [String; 2],
    pub company: String,
    pub telephone: String,
    pub postcode: String,
    pub city: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub region_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_id: Option<String>,
}

/// `[street, apartment]`, repeating the street when no apartment is given.
fn street_lines(shipping: &ShippingDetails) -> [String; 2] {
    let second = if shipping.apartment_number.is_empty() {
        shipping.street_address.clone()
    } else {
        shipping.apartment_number.clone()
    };
    [shipping.street_address.clone(), second]
}

impl Address {
    /// Billing address: contact fields from payment, location from shipping.
    pub fn billing(payment: &PaymentDetails, shipping: &ShippingDetails, postcode: &str) -> Self {
        Self {
            region: payment.state.clone(),
            region_id: payment.region_id.unwrap_or(0),
            country_id: shipping.country.clone(),
            street: street_lines(shipping),
            company: payment.company.clone(),
            telephone: payment.phone_number.clone(),
            postcode: postcode.to_string(),
            city: shipping.city.clone(),
            firstname: payment.first_name.clone(),
            lastname: payment.last_name.clone(),
            email: payment.email_address.clone(),
            region_code: payment.region_code.clone().unwrap_or_default(),
            vat_id: payment.tax_id.clone(),
        }
    }

    /// Shipping address.
    ///
    /// With `use_other_address` off the recipient is the payer; with it on the
    /// recipient's name, phone and region code come from the shipping form.
    /// The e-mail always belongs to the payer.
    pub fn shipping(
        payment: &PaymentDetails,
        shipping: &ShippingDetails,
        postcode: &str,
        use_other_address: bool,
    ) -> Self {
        let (telephone, firstname, lastname, region_code) = if use_other_address {
            (
                shipping.phone_number.clone(),
                shipping.first_name.clone(),
                shipping.last_name.clone(),
                shipping.region_code.clone().unwrap_or_default(),
            )
        } else {
            (
                payment.phone_number.clone(),
                payment.first_name.clone(),
                payment.last_name.clone(),
                payment.region_code.clone().unwrap_or_default(),
            )
        };

        Self {
            region: payment.state.clone(),
            region_id: payment.region_id.unwrap_or(0),
            country_id: shipping.country.clone(),
            street: street_lines(shipping),
            company: String::new(),
            telephone,
            postcode: postcode.to_string(),
            city: shipping.city.clone(),
            firstname,
            lastname,
            email: payment.email_address.clone(),
            region_code,
            vat_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressInformation {
    #[serde(rename = "billingAddress")]
    pub billing_address: Address,
    #[serde(rename = "shippingAddress", default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    pub shipping_method_code: String,
    pub shipping_carrier_code: String,
    pub payment_method_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_additional: Option<serde_json::Value>,
    #[serde(rename = "shippingExtraFields", default, skip_serializing_if = "Option::is_none")]
    pub shipping_extra_fields: Option<serde_json::Value>,
}

/// The order handed to the store for transmission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub user_id: String,
    pub cart_id: String,
    pub products: Vec<CartItem>,
    pub totals: Vec<TotalSegment>,
    #[serde(rename = "addressInformation")]
    pub address_information: AddressInformation,
}

/// Everything order assembly reads, gathered at submission time.
#[derive(Debug, Clone)]
pub struct OrderDraft<'a> {
    pub user_id: Option<&'a str>,
    pub cart_id: &'a str,
    pub products: Vec<CartItem>,
    pub totals: Vec<TotalSegment>,
    pub payment: &'a PaymentDetails,
    pub shipping: &'a ShippingDetails,
    pub shipping_method: Option<&'a ShippingMethod>,
    pub payment_method_code: String,
    pub postcode: &'a str,
    pub is_virtual: bool,
    pub use_other_address: bool,
}

impl Order {
    /// Builds a fresh order from the collected step data.
    pub fn assemble(draft: OrderDraft<'_>) -> Self {
        let payment = draft.payment;
        let shipping = draft.shipping;

        // The selector's choice wins over what the shipping form remembered.
        let (shipping_method_code, shipping_carrier_code) = match draft.shipping_method {
            Some(method) if !method.method_code.is_empty() => {
                (method.method_code.clone(), method.carrier_code.clone())
            }
            _ => (shipping.shipping_method.clone(), shipping.shipping_carrier.clone()),
        };

        let shipping_address = (!draft.is_virtual).then(|| {
            Address::shipping(payment, shipping, draft.postcode, draft.use_other_address)
        });

        Self {
            user_id: draft.user_id.unwrap_or_default().to_string(),
            cart_id: draft.cart_id.to_string(),
            products: draft.products,
            totals: draft.totals,
            address_information: AddressInformation {
                billing_address: Address::billing(payment, shipping, draft.postcode),
                shipping_address,
                shipping_method_code,
                shipping_carrier_code,
                payment_method_code: draft.payment_method_code,
                payment_method_additional: payment.payment_method_additional.clone(),
                shipping_extra_fields: shipping.extra_fields.clone(),
            },
        }
    }

    pub fn payment_method_code(&self) -> &str {
        &self.address_information.payment_method_code
    }
}

/// Selected payment method with the accepted agreements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodSelection {
    pub method: String,
    pub extension_attributes: AgreementIds,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgreementIds {
    pub agreement_ids: Vec<String>,
}

/// Payload of the payment/billing recomputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInformation {
    pub billing_address: Address,
    pub country_id: String,
    pub postcode: String,
    pub cart_id: String,
    pub email: String,
    pub payment_method: PaymentMethodSelection,
    /// Shipping method to re-sync totals with once payment is set.
    #[serde(skip)]
    pub shipping_method: Option<ShippingMethod>,
}

/// Confirmation returned by the store once the backend accepted an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_number: String,
    #[serde(default)]
    pub backend_order_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment() -> PaymentDetails {
        PaymentDetails {
            first_name: "Taras".into(),
            last_name: "Shevchenko".into(),
            company: "Kobzar LLC".into(),
            state: "Kyivska".into(),
            region_id: Some(7),
            phone_number: "+380000000001".into(),
            email_address: "taras@example.com".into(),
            tax_id: Some("UA123".into()),
            payment_method: "cashondelivery".into(),
            ..Default::default()
        }
    }

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            first_name: "Lesya".into(),
            last_name: "Ukrainka".into(),
            country: "UA".into(),
            city: "Kyiv".into(),
            street_address: "Khreshchatyk 1".into(),
            phone_number: "+380000000002".into(),
            region_code: Some("KV".into()),
            shipping_method: "flatrate".into(),
            shipping_carrier: "flatrate".into(),
            ..Default::default()
        }
    }

    fn draft<'a>(
        payment: &'a PaymentDetails,
        shipping: &'a ShippingDetails,
        is_virtual: bool,
        use_other_address: bool,
    ) -> OrderDraft<'a> {
        OrderDraft {
            user_id: None,
            cart_id: "cart-1",
            products: vec![CartItem::new("MUG", "Mug", 1, 12.0)],
            totals: Vec::new(),
            payment,
            shipping,
            shipping_method: None,
            payment_method_code: "cashondelivery".into(),
            postcode: "01001",
            is_virtual,
            use_other_address,
        }
    }

    #[test]
    fn test_shipping_address_reuses_payer_when_toggle_off() {
        let (payment, shipping) = (payment(), shipping());
        let order = Order::assemble(draft(&payment, &shipping, false, false));

        let ship = order.address_information.shipping_address.expect("shipping address");
        let bill = &order.address_information.billing_address;
        assert_eq!(ship.firstname, "Taras");
        assert_eq!(ship.telephone, bill.telephone);
        assert_eq!(ship.email, bill.email);
        assert_eq!(ship.country_id, "UA");
        assert_eq!(ship.city, "Kyiv");
        assert_eq!(ship.street, ["Khreshchatyk 1".to_string(), "Khreshchatyk 1".to_string()]);
        assert_eq!(ship.company, "");
        assert_eq!(ship.vat_id, None);
        assert_eq!(bill.vat_id.as_deref(), Some("UA123"));
    }

    #[test]
    fn test_shipping_address_uses_recipient_when_toggle_on() {
        let (payment, shipping) = (payment(), shipping());
        let order = Order::assemble(draft(&payment, &shipping, false, true));

        let ship = order.address_information.shipping_address.expect("shipping address");
        assert_eq!(ship.firstname, "Lesya");
        assert_eq!(ship.telephone, "+380000000002");
        assert_eq!(ship.region_code, "KV");
        assert_eq!(ship.email, "taras@example.com");
    }

    #[test]
    fn test_virtual_order_has_no_shipping_address_key() {
        let (payment, shipping) = (payment(), shipping());
        let order = Order::assemble(draft(&payment, &shipping, true, false));

        let json = serde_json::to_value(&order).unwrap();
        let info = json["addressInformation"].as_object().unwrap();
        assert!(info.contains_key("billingAddress"));
        assert!(!info.contains_key("shippingAddress"));
    }

    #[test]
    fn test_selected_shipping_method_overrides_form_value() {
        let (payment, shipping) = (payment(), shipping());
        let method = ShippingMethod {
            carrier_code: "novaposhta".into(),
            method_code: "warehouse".into(),
        };
        let mut d = draft(&payment, &shipping, false, false);
        d.shipping_method = Some(&method);

        let order = Order::assemble(d);
        assert_eq!(order.address_information.shipping_method_code, "warehouse");
        assert_eq!(order.address_information.shipping_carrier_code, "novaposhta");
    }
}
