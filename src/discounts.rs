//! Discounts
//!
//! Minor-unit arithmetic shared by the pricing functions.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;

/// Errors specific to discount calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,
}

/// Calculate the discount amount in minor units based on a percentage and a minor unit amount.
///
/// The result is rounded half away from zero.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] if the calculation overflows.
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    scale_minor(fraction(percent), minor)
}

/// Take `percent` off a minor-unit price.
///
/// The discounted price is computed exactly and rounded once, half away from
/// zero. Percentages above 100% produce a negative price, below 0% a markup.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] if the calculation overflows.
pub fn percent_off_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let remaining = Decimal::ONE
        .checked_sub(fraction(percent))
        .ok_or(DiscountError::PercentConversion)?;

    scale_minor(remaining, minor)
}

fn fraction(percent: &Percentage) -> Decimal {
    (*percent) * Decimal::ONE // `Percentage` doesn't expose its inner `Decimal`
}

fn scale_minor(factor: Decimal, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    factor
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}
