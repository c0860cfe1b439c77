//! Promotions
//!
//! A promotion is a time-bounded discount rule covering a set of products.
//! The cart only ever reads promotions; they are owned by the catalog.

use std::fmt;

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{products::ProductUuid, uuids::TypedUuid};

/// Promotion Uuid
pub type PromotionUuid = TypedUuid<Promotion>;

/// How a promotion changes the unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionDiscount {
    /// Percentage points off the base price (`20` is "20% off")
    Percentage(Decimal),

    /// Replace the base price with this amount, in major units
    Price(Decimal),
}

/// Something suspicious about a promotion's configuration.
///
/// These are reported, never corrected: the promotion still applies as entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionIssue {
    /// Percentage outside `0..=100`
    PercentageOutOfRange(Decimal),

    /// Discount price below zero
    NegativePrice(Decimal),

    /// End time precedes start time, so the promotion can never apply
    EndsBeforeStart,
}

impl fmt::Display for PromotionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PercentageOutOfRange(points) => {
                write!(f, "percentage {points} is outside 0..=100")
            }
            Self::NegativePrice(price) => write!(f, "discount price {price} is negative"),
            Self::EndsBeforeStart => f.write_str("ends before it starts"),
        }
    }
}

/// Promotion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    /// Promotion identifier
    pub id: PromotionUuid,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Discount rule
    pub discount: PromotionDiscount,

    /// Products the promotion covers
    #[serde(default)]
    pub products: Vec<ProductUuid>,

    /// Active flag, toggled by the back-office
    pub is_active: bool,

    /// Earliest moment the promotion applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<Timestamp>,

    /// Last moment the promotion applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<Timestamp>,
}

impl Promotion {
    /// Create an active, unbounded promotion.
    pub fn new(id: PromotionUuid, title: impl Into<String>, discount: PromotionDiscount) -> Self {
        Self {
            id,
            title: title.into(),
            discount,
            products: Vec::new(),
            is_active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    /// Set the products the promotion covers.
    #[must_use]
    pub fn for_products(mut self, products: impl IntoIterator<Item = ProductUuid>) -> Self {
        self.products = products.into_iter().collect();
        self
    }

    /// Set the active flag.
    #[must_use]
    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Set the start of the promotion window.
    #[must_use]
    pub fn starting_at(mut self, starts_at: Timestamp) -> Self {
        self.starts_at = Some(starts_at);
        self
    }

    /// Set the end of the promotion window.
    #[must_use]
    pub fn ending_at(mut self, ends_at: Timestamp) -> Self {
        self.ends_at = Some(ends_at);
        self
    }

    /// Whether the promotion is active and `now` falls inside its window.
    ///
    /// Both window bounds are inclusive; a missing bound is open.
    #[must_use]
    pub fn is_applicable_at(&self, now: Timestamp) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|starts_at| starts_at <= now)
            && self.ends_at.is_none_or(|ends_at| ends_at >= now)
    }

    /// Whether the promotion lists `product`.
    #[must_use]
    pub fn applies_to(&self, product: ProductUuid) -> bool {
        self.products.contains(&product)
    }

    /// The discount as a fractional percentage, if it is a percentage discount.
    #[must_use]
    pub fn percentage(&self) -> Option<Percentage> {
        match self.discount {
            PromotionDiscount::Percentage(points) => {
                points.checked_div(Decimal::ONE_HUNDRED).map(Percentage::from)
            }
            PromotionDiscount::Price(_) => None,
        }
    }

    /// Configuration problems worth flagging.
    pub fn issues(&self) -> SmallVec<[PromotionIssue; 2]> {
        let mut issues = SmallVec::new();

        match self.discount {
            PromotionDiscount::Percentage(points)
                if points < Decimal::ZERO || points > Decimal::ONE_HUNDRED =>
            {
                issues.push(PromotionIssue::PercentageOutOfRange(points));
            }
            PromotionDiscount::Price(price) if price < Decimal::ZERO => {
                issues.push(PromotionIssue::NegativePrice(price));
            }
            PromotionDiscount::Percentage(_) | PromotionDiscount::Price(_) => {}
        }

        if let (Some(starts_at), Some(ends_at)) = (self.starts_at, self.ends_at)
            && ends_at < starts_at
        {
            issues.push(PromotionIssue::EndsBeforeStart);
        }

        issues
    }
}
