//! Pricing
//!
//! Effective unit prices and cart totals. Everything here is pure apart from
//! the `now` argument, which decides whether a promotion's window is open.

use jiff::Timestamp;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::warn;

use crate::{
    cart::{Cart, CartLine},
    discounts::{DiscountError, percent_off_minor},
    products::Product,
    promotions::{Promotion, PromotionDiscount},
};

/// Errors that can occur while pricing products or totalling a cart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// A decimal amount doesn't fit in the currency's minor units.
    #[error("amount {0} cannot be represented in minor units")]
    MinorUnits(Decimal),

    /// Multiplying or summing line totals overflowed.
    #[error("cart total overflowed")]
    Overflow,

    /// Errors bubbled up from discount calculation.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

/// Convert a major-unit decimal amount into minor units of `currency`.
///
/// Sub-minor fractions are rounded half away from zero.
///
/// # Errors
///
/// Returns [`PricingError::MinorUnits`] if the amount is out of range.
pub fn to_minor_units(amount: Decimal, currency: &Currency) -> Result<i64, PricingError> {
    10_i64
        .checked_pow(currency.exponent)
        .and_then(|scale| amount.checked_mul(Decimal::from(scale)))
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_i64())
        .ok_or(PricingError::MinorUnits(amount))
}

/// The price charged for one unit of `product`.
///
/// The promotion only counts when it is active and `now` is inside its window;
/// otherwise the base price applies. Discounts are applied exactly as
/// configured: a percentage above 100 gives a negative price. Such
/// promotions are logged, not clamped.
///
/// # Errors
///
/// Returns a [`PricingError`] if an amount can't be represented in minor units.
pub fn effective_price<'a>(
    product: &Product,
    promotion: Option<&Promotion>,
    currency: &'a Currency,
    now: Timestamp,
) -> Result<Money<'a, Currency>, PricingError> {
    effective_minor(product, promotion, currency, now)
        .map(|minor| Money::from_minor(minor, currency))
}

/// Effective unit price multiplied by the line's quantity.
///
/// # Errors
///
/// Returns a [`PricingError`] on overflow.
pub fn line_total<'a>(
    line: &CartLine,
    currency: &'a Currency,
    now: Timestamp,
) -> Result<Money<'a, Currency>, PricingError> {
    line_total_minor(line, currency, now).map(|minor| Money::from_minor(minor, currency))
}

/// Sum of every line's total. An empty cart totals zero.
///
/// # Errors
///
/// Returns a [`PricingError`] on overflow.
pub fn cart_total<'a>(
    cart: &Cart,
    currency: &'a Currency,
    now: Timestamp,
) -> Result<Money<'a, Currency>, PricingError> {
    let total = cart.iter().try_fold(0_i64, |acc, line| {
        acc.checked_add(line_total_minor(line, currency, now)?)
            .ok_or(PricingError::Overflow)
    })?;

    Ok(Money::from_minor(total, currency))
}

fn line_total_minor(
    line: &CartLine,
    currency: &Currency,
    now: Timestamp,
) -> Result<i64, PricingError> {
    effective_minor(line.product(), line.promotion(), currency, now)?
        .checked_mul(i64::from(line.quantity().get()))
        .ok_or(PricingError::Overflow)
}

fn effective_minor(
    product: &Product,
    promotion: Option<&Promotion>,
    currency: &Currency,
    now: Timestamp,
) -> Result<i64, PricingError> {
    let base = to_minor_units(product.price, currency)?;

    let Some(promotion) = promotion.filter(|promotion| promotion.is_applicable_at(now)) else {
        return Ok(base);
    };

    let issues = promotion.issues();
    if !issues.is_empty() {
        warn!(
            promotion = %promotion.id,
            product = %product.id,
            issues = ?issues,
            "applying promotion with suspicious configuration as entered"
        );
    }

    match promotion.discount {
        PromotionDiscount::Percentage(_) => {
            let percent = promotion
                .percentage()
                .ok_or(DiscountError::PercentConversion)?;

            Ok(percent_off_minor(&percent, base)?)
        }
        PromotionDiscount::Price(price) => to_minor_units(price, currency),
    }
}
