//! # Submission State Machine
//!
//! ```text
//!  Idle ──place order──► Validating ──ready──► Submitting ──confirmed──► Confirmed
//!    ▲                       │                     │
//!    └──────── rejected ─────┘◄──── store failed ──┘
//! ```
//!
//! Readiness is checked in a fixed order so the shopper sees the most useful
//! reason first: step validity, then stock, then connectivity.

use crate::clients::Notice;
use crate::model::{OrderConfirmation, Step, ValidationResult};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Validating,
    Submitting,
    Confirmed,
}

/// Progress of the background stock reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockStatus {
    pub completed: bool,
    pub ok: bool,
}

impl StockStatus {
    pub fn ready() -> Self {
        Self {
            completed: true,
            ok: true,
        }
    }
}

/// Why a place-order request did not reach the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Steps whose validation result is invalid (or never reported).
    InvalidSteps(Vec<Step>),
    /// Stock checks are outstanding or found an unavailable item.
    ProductsNotAvailable,
    Offline,
}

impl Rejection {
    pub fn notice(&self) -> Notice {
        match self {
            Rejection::InvalidSteps(_) => Notice::InvalidData,
            Rejection::ProductsNotAvailable => Notice::ProductsNotAvailable,
            Rejection::Offline => Notice::NoConnection,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Placed(OrderConfirmation),
    Rejected(Rejection),
    /// The cart was empty; the shopper was sent back to the storefront.
    EmptyCart,
}

/// Steps that must be valid before an order can be prepared.
pub fn required_steps(is_virtual: bool) -> Vec<Step> {
    if is_virtual {
        vec![Step::PersonalDetails, Step::Payment]
    } else {
        vec![Step::PersonalDetails, Step::Shipping, Step::Payment]
    }
}

/// Required steps that are not valid, followed by reported optional steps
/// that are invalid.
pub fn invalid_steps(validation: &BTreeMap<Step, ValidationResult>, is_virtual: bool) -> Vec<Step> {
    let required = required_steps(is_virtual);
    let mut invalid: Vec<Step> = required
        .iter()
        .copied()
        .filter(|step| !validation.get(step).is_some_and(ValidationResult::is_valid))
        .collect();

    invalid.extend(
        validation
            .iter()
            .filter(|(step, result)| !required.contains(*step) && !result.is_valid())
            .map(|(step, _)| *step)
            // Shipping is optional only for virtual carts; an invalid report there is ignored.
            .filter(|step| *step != Step::Shipping),
    );
    invalid
}

pub fn check_readiness(
    validation: &BTreeMap<Step, ValidationResult>,
    is_virtual: bool,
    online: bool,
    stock: StockStatus,
) -> Result<(), Rejection> {
    let invalid = invalid_steps(validation, is_virtual);
    if !invalid.is_empty() {
        return Err(Rejection::InvalidSteps(invalid));
    }
    if online && !(stock.completed && stock.ok) {
        return Err(Rejection::ProductsNotAvailable);
    }
    if !online {
        return Err(Rejection::Offline);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_valid() -> BTreeMap<Step, ValidationResult> {
        [Step::PersonalDetails, Step::Shipping, Step::Payment]
            .into_iter()
            .map(|step| (step, ValidationResult::valid()))
            .collect()
    }

    #[test]
    fn test_unreported_steps_block_the_order() {
        let result = check_readiness(&BTreeMap::new(), false, true, StockStatus::ready());
        assert_eq!(
            result,
            Err(Rejection::InvalidSteps(vec![
                Step::PersonalDetails,
                Step::Shipping,
                Step::Payment
            ]))
        );
    }

    #[test]
    fn test_virtual_cart_does_not_need_shipping() {
        let mut validation = all_valid();
        validation.insert(Step::Shipping, ValidationResult::invalid());
        assert_eq!(check_readiness(&validation, true, true, StockStatus::ready()), Ok(()));
        assert!(check_readiness(&validation, false, true, StockStatus::ready()).is_err());
    }

    #[test]
    fn test_reported_optional_step_counts() {
        let mut validation = all_valid();
        validation.insert(Step::InternationalDelivery, ValidationResult::invalid());
        assert_eq!(
            check_readiness(&validation, false, true, StockStatus::ready()),
            Err(Rejection::InvalidSteps(vec![Step::InternationalDelivery]))
        );
    }

    #[test]
    fn test_pending_or_failed_stock_blocks_when_online() {
        let validation = all_valid();
        let pending = StockStatus::default();
        let failed = StockStatus {
            completed: true,
            ok: false,
        };
        assert_eq!(
            check_readiness(&validation, false, true, pending),
            Err(Rejection::ProductsNotAvailable)
        );
        assert_eq!(
            check_readiness(&validation, false, true, failed),
            Err(Rejection::ProductsNotAvailable)
        );
    }

    #[test]
    fn test_offline_rejects_with_its_own_reason() {
        let rejection = check_readiness(&all_valid(), false, false, StockStatus::default());
        assert_eq!(rejection, Err(Rejection::Offline));
        assert_eq!(Rejection::Offline.notice(), Notice::NoConnection);
    }
}
