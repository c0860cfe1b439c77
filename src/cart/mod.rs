//! Cart
//!
//! The in-memory cart model. [`CartStore`] wraps it with persistence and
//! change notification.

use std::num::NonZeroU32;

use jiff::Timestamp;
use rusty_money::{Money, iso::Currency};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    pricing::{PricingError, cart_total, effective_price, line_total},
    products::{Product, ProductUuid},
    promotions::Promotion,
};

pub mod events;
pub mod store;

pub use events::{CartEvent, CartObserver, Subscription};
pub use store::{CART_STORAGE_KEY, CartStore};

/// One product in the cart, with its quantity and the promotion it was added under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    product: Product,
    quantity: NonZeroU32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    promotion: Option<Promotion>,
}

impl CartLine {
    /// Create a single-unit line.
    pub fn new(product: Product, promotion: Option<Promotion>) -> Self {
        Self {
            product,
            quantity: NonZeroU32::MIN,
            promotion,
        }
    }

    /// The product snapshot
    pub fn product(&self) -> &Product {
        &self.product
    }

    /// The product's identifier
    pub fn product_id(&self) -> ProductUuid {
        self.product.id
    }

    /// Units of the product in the cart
    pub fn quantity(&self) -> NonZeroU32 {
        self.quantity
    }

    /// The promotion snapshot taken when the product was first added
    pub fn promotion(&self) -> Option<&Promotion> {
        self.promotion.as_ref()
    }

    /// Price of one unit, after the promotion if it currently applies.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if an amount can't be represented in minor units.
    pub fn unit_price<'a>(
        &self,
        currency: &'a Currency,
        now: Timestamp,
    ) -> Result<Money<'a, Currency>, PricingError> {
        effective_price(&self.product, self.promotion.as_ref(), currency, now)
    }

    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] on overflow.
    pub fn total<'a>(
        &self,
        currency: &'a Currency,
        now: Timestamp,
    ) -> Result<Money<'a, Currency>, PricingError> {
        line_total(self, currency, now)
    }
}

/// Errors building a cart from raw lines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// More than one line for the same product.
    #[error("duplicate cart line for product {0}")]
    DuplicateLine(ProductUuid),
}

/// Ordered cart lines, at most one per product.
///
/// Serializes as a bare JSON array of lines. Arrays with two lines for the
/// same product are rejected when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Add one unit of `product`.
    ///
    /// If the product already has a line its quantity goes up by one and the
    /// promotion it was first added with is kept; `promotion` is ignored.
    pub fn add(&mut self, product: Product, promotion: Option<Promotion>) {
        match self.line_mut(product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.lines.push(CartLine::new(product, promotion)),
        }
    }

    /// Remove the product's line. Returns whether a line was removed.
    pub fn remove(&mut self, product: ProductUuid) -> bool {
        let before = self.lines.len();

        self.lines.retain(|line| line.product_id() != product);

        self.lines.len() != before
    }

    /// Set the product's quantity; zero or less removes the line.
    ///
    /// Returns whether the cart changed. Quantities above `u32::MAX` saturate.
    pub fn update_quantity(&mut self, product: ProductUuid, quantity: i64) -> bool {
        let clamped = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);

        let Some(quantity) = NonZeroU32::new(clamped) else {
            return self.remove(product);
        };

        match self.line_mut(product) {
            Some(line) => {
                let changed = line.quantity != quantity;
                line.quantity = quantity;
                changed
            }
            None => false,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Get the line for a product.
    pub fn line(&self, product: ProductUuid) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id() == product)
    }

    fn line_mut(&mut self, product: ProductUuid) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id() == product)
    }

    /// Iterate over the lines in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter()
    }

    /// The lines as a slice.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of lines (distinct products).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Sum of every line's effective price times quantity.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] on overflow.
    pub fn total<'a>(
        &self,
        currency: &'a Currency,
        now: Timestamp,
    ) -> Result<Money<'a, Currency>, PricingError> {
        cart_total(self, currency, now)
    }
}

impl TryFrom<Vec<CartLine>> for Cart {
    type Error = CartError;

    fn try_from(lines: Vec<CartLine>) -> Result<Self, Self::Error> {
        let mut seen = FxHashSet::default();

        if let Some(line) = lines.iter().find(|line| !seen.insert(line.product_id())) {
            return Err(CartError::DuplicateLine(line.product_id()));
        }

        Ok(Self { lines })
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso::BRL;
    use testresult::TestResult;

    use crate::promotions::{PromotionDiscount, PromotionUuid};

    use super::*;

    fn product(name: &str, cents: i64) -> Product {
        Product::new(ProductUuid::now_v7(), name, Decimal::new(cents, 2), 10)
    }

    fn quantities(cart: &Cart) -> Vec<u32> {
        cart.iter().map(|line| line.quantity().get()).collect()
    }

    #[test]
    fn add_appends_new_line_with_quantity_one() {
        let mut cart = Cart::default();
        let a = product("A", 1000);

        cart.add(a.clone(), None);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.line(a.id).map(|line| line.quantity().get()), Some(1));
    }

    #[test]
    fn add_existing_product_increments_and_keeps_first_promotion() {
        let mut cart = Cart::default();
        let a = product("A", 1000);

        let first = Promotion::new(
            PromotionUuid::now_v7(),
            "First",
            PromotionDiscount::Percentage(Decimal::from(10)),
        );
        let second = Promotion::new(
            PromotionUuid::now_v7(),
            "Second",
            PromotionDiscount::Percentage(Decimal::from(50)),
        );

        cart.add(a.clone(), Some(first.clone()));
        cart.add(a.clone(), Some(second));
        cart.add(a.clone(), None);

        let line = cart.line(a.id);

        assert_eq!(cart.len(), 1);
        assert_eq!(line.map(|line| line.quantity().get()), Some(3));
        assert_eq!(line.and_then(CartLine::promotion), Some(&first));
    }

    #[test]
    fn lines_keep_insertion_order() {
        let mut cart = Cart::default();
        let a = product("A", 1000);
        let b = product("B", 2000);

        cart.add(a.clone(), None);
        cart.add(b.clone(), None);
        cart.add(a.clone(), None);

        let ids: Vec<_> = cart.iter().map(CartLine::product_id).collect();

        assert_eq!(ids, vec![a.id, b.id]);
        assert_eq!(quantities(&cart), vec![2, 1]);
    }

    #[test]
    fn remove_missing_product_is_a_no_op() {
        let mut cart = Cart::default();
        cart.add(product("A", 1000), None);

        let before = cart.clone();

        assert!(!cart.remove(ProductUuid::now_v7()));
        assert_eq!(cart, before);
    }

    #[test]
    fn update_quantity_to_zero_or_below_removes() {
        let a = product("A", 1000);

        for quantity in [0, -1, i64::MIN] {
            let mut cart = Cart::default();
            cart.add(a.clone(), None);

            assert!(cart.update_quantity(a.id, quantity), "quantity {quantity}");
            assert!(cart.is_empty(), "quantity {quantity} should remove the line");
        }
    }

    #[test]
    fn update_quantity_sets_and_saturates() {
        let mut cart = Cart::default();
        let a = product("A", 1000);
        cart.add(a.clone(), None);

        assert!(cart.update_quantity(a.id, 5));
        assert_eq!(quantities(&cart), vec![5]);

        assert!(!cart.update_quantity(a.id, 5), "same quantity is not a change");

        cart.update_quantity(a.id, i64::MAX);
        assert_eq!(quantities(&cart), vec![u32::MAX]);
    }

    #[test]
    fn update_quantity_for_missing_product_does_nothing() {
        let mut cart = Cart::default();

        assert!(!cart.update_quantity(ProductUuid::now_v7(), 3));
        assert!(cart.is_empty());
    }

    #[test]
    fn count_sums_quantities() {
        let mut cart = Cart::default();
        let a = product("A", 1000);
        let b = product("B", 2000);

        cart.add(a.clone(), None);
        cart.add(b, None);
        cart.update_quantity(a.id, 4);

        assert_eq!(cart.count(), 5);
    }

    #[test]
    fn total_is_order_independent() -> TestResult {
        let a = product("A", 1050);
        let b = product("B", 399);
        let promo = Promotion::new(
            PromotionUuid::now_v7(),
            "Promo",
            PromotionDiscount::Percentage(Decimal::from(15)),
        );

        let mut forward = Cart::default();
        forward.add(a.clone(), Some(promo.clone()));
        forward.add(b.clone(), None);
        forward.update_quantity(b.id, 3);

        let mut reversed = Cart::default();
        reversed.add(b.clone(), None);
        reversed.update_quantity(b.id, 3);
        reversed.add(a, Some(promo));

        let now = Timestamp::now();

        assert_eq!(forward.total(BRL, now)?, reversed.total(BRL, now)?);

        Ok(())
    }

    #[test]
    fn serializes_as_array_of_lines() -> TestResult {
        let mut cart = Cart::default();
        cart.add(product("A", 1000), None);

        let value = serde_json::to_value(&cart)?;
        let line = value.get(0);

        assert!(value.is_array());
        assert_eq!(line.and_then(|line| line.get("quantity")), Some(&1.into()));
        assert!(line.and_then(|line| line.get("product")).is_some());
        assert!(line.and_then(|line| line.get("promotion")).is_none());

        Ok(())
    }

    #[test]
    fn zero_quantity_fails_to_deserialize() {
        let json = r#"[{
            "product": {
                "id": "0190f3a0-7b1c-7d2e-8f00-000000000001",
                "name": "A",
                "price": "10.00"
            },
            "quantity": 0
        }]"#;

        assert!(serde_json::from_str::<Cart>(json).is_err());
    }

    #[test]
    fn duplicate_product_lines_are_rejected() -> TestResult {
        let a = product("A", 1000);
        let line = CartLine::new(a.clone(), None);
        let json = serde_json::to_string(&vec![line.clone(), line.clone()])?;

        let err = serde_json::from_str::<Cart>(&json).err().map(|err| err.to_string());

        assert!(
            err.is_some_and(|err| err.contains("duplicate cart line")),
            "two lines for one product should not deserialize"
        );
        assert_eq!(
            Cart::try_from(vec![line.clone(), line]),
            Err(CartError::DuplicateLine(a.id))
        );

        Ok(())
    }
}
