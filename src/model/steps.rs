//! Step records and their validation results.
//!
//! Each checkout step owns a form; when the form completes it reports its data
//! together with a [`ValidationResult`]. The controller does not trust the
//! report alone: every record implements [`StepRecord`], and the result stored
//! by the controller is the report merged with the record's own check.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// One logical checkout stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    PersonalDetails,
    Shipping,
    InternationalDelivery,
    Payment,
    OrderReview,
}

impl Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::PersonalDetails => "personalDetails",
            Step::Shipping => "shipping",
            Step::InternationalDelivery => "internationalDelivery",
            Step::Payment => "payment",
            Step::OrderReview => "orderReview",
        };
        f.write_str(name)
    }
}

/// Validation outcome reported by a step form.
///
/// The default value is *invalid*: a step that never reported blocks the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(rename = "$invalid")]
    pub invalid: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: BTreeMap<String, String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            invalid: true,
            field_errors: BTreeMap::new(),
        }
    }
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            invalid: false,
            field_errors: BTreeMap::new(),
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.invalid = true;
        self.field_errors.insert(field.into(), message.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        !self.invalid
    }

    /// Combines two results: invalid if either is, with the union of field errors.
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.invalid |= other.invalid;
        for (field, message) in other.field_errors {
            self.field_errors.entry(field).or_insert(message);
        }
        self
    }
}

/// A record produced by a step form.
pub trait StepRecord {
    const STEP: Step;

    /// Required-field check done at the step boundary.
    fn check(&self) -> ValidationResult;

    /// The result to store for this record given the form's own report.
    fn accept(&self, reported: ValidationResult) -> ValidationResult {
        reported.merge(self.check())
    }
}

fn require(result: ValidationResult, field: &str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        result.with_error(field, "Field is required")
    } else {
        result
    }
}

fn require_email(result: ValidationResult, field: &str, value: &str) -> ValidationResult {
    let result = require(result, field, value);
    if !value.trim().is_empty() && !value.contains('@') {
        result.with_error(field, "Please provide valid e-mail address.")
    } else {
        result
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalDetails {
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub create_account: bool,
}

impl StepRecord for PersonalDetails {
    const STEP: Step = Step::PersonalDetails;

    fn check(&self) -> ValidationResult {
        let result = ValidationResult::valid();
        let result = require(result, "firstName", &self.first_name);
        let result = require(result, "lastName", &self.last_name);
        require_email(result, "emailAddress", &self.email_address)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub street_address: String,
    pub apartment_number: String,
    pub zip_code: String,
    pub phone_number: String,
    pub region_code: Option<String>,
    pub shipping_method: String,
    pub shipping_carrier: String,
    pub extra_fields: Option<serde_json::Value>,
}

impl StepRecord for ShippingDetails {
    const STEP: Step = Step::Shipping;

    fn check(&self) -> ValidationResult {
        let result = ValidationResult::valid();
        let result = require(result, "country", &self.country);
        let result = require(result, "city", &self.city);
        require(result, "streetAddress", &self.street_address)
    }
}

/// Custom delivery fields for international shipments.
///
/// The fields are defined by the backend per destination and are forwarded
/// verbatim, so they stay a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InternationalDelivery {
    pub custom_fields: serde_json::Map<String, serde_json::Value>,
}

impl StepRecord for InternationalDelivery {
    const STEP: Step = Step::InternationalDelivery;

    fn check(&self) -> ValidationResult {
        ValidationResult::valid()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentDetails {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub country: String,
    pub state: String,
    pub region_id: Option<u32>,
    pub region_code: Option<String>,
    pub city: String,
    pub street_address: String,
    pub apartment_number: String,
    pub zip_code: String,
    pub phone_number: String,
    pub email_address: String,
    pub tax_id: Option<String>,
    pub payment_method: String,
    pub payment_method_additional: Option<serde_json::Value>,
}

impl StepRecord for PaymentDetails {
    const STEP: Step = Step::Payment;

    fn check(&self) -> ValidationResult {
        let result = ValidationResult::valid();
        let result = require(result, "firstName", &self.first_name);
        let result = require(result, "lastName", &self.last_name);
        let result = require(result, "phoneNumber", &self.phone_number);
        let result = require_email(result, "emailAddress", &self.email_address);
        require(result, "paymentMethod", &self.payment_method)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderReview {
    pub comment: String,
}

impl StepRecord for OrderReview {
    const STEP: Step = Step::OrderReview;

    fn check(&self) -> ValidationResult {
        ValidationResult::valid()
    }
}

/// Carrier/method pair chosen in the shipping-method selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub carrier_code: String,
    pub method_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validation_is_invalid() {
        assert!(!ValidationResult::default().is_valid());
    }

    #[test]
    fn test_accept_merges_reported_and_boundary_check() {
        let details = PersonalDetails {
            first_name: "Olena".into(),
            last_name: "".into(),
            email_address: "olena.example.com".into(),
            create_account: false,
        };

        let stored = details.accept(ValidationResult::valid());
        assert!(stored.invalid);
        assert!(stored.field_errors.contains_key("lastName"));
        assert!(stored.field_errors.contains_key("emailAddress"));
    }

    #[test]
    fn test_reported_invalid_wins_over_clean_record() {
        let review = OrderReview { comment: "ring twice".into() };
        let stored = review.accept(ValidationResult::invalid().with_error("terms", "Must accept"));
        assert!(stored.invalid);
        assert_eq!(stored.field_errors["terms"], "Must accept");
    }

    #[test]
    fn test_validation_result_uses_dollar_invalid_key() {
        let json = serde_json::to_value(ValidationResult::invalid()).unwrap();
        assert_eq!(json, serde_json::json!({ "$invalid": true }));
    }
}
