//! Checkout
//!
//! Turns a cart into an order summary. Checkout doesn't place orders itself:
//! the summary's text form is handed to whatever channel takes orders.

use std::{fmt, io, num::NonZeroU32};

use jiff::Timestamp;
use rusty_money::{Money, MoneyError, iso::Currency};
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;

use crate::{
    cart::Cart,
    pricing::{PricingError, effective_price},
    products::ProductUuid,
};

/// Errors that can occur when checking out.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to check out.
    #[error("the cart is empty")]
    EmptyCart,

    /// A line asks for more units than the product has in stock.
    #[error("only {available} of {name} in stock, {requested} requested")]
    InsufficientStock {
        /// Product identifier
        product: ProductUuid,
        /// Product name
        name: String,
        /// Quantity in the cart
        requested: u32,
        /// Units in stock
        available: u32,
    },

    /// Error pricing a line.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Wrapper for money errors.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// IO error while rendering.
    #[error("io error")]
    Io(#[from] io::Error),
}

/// One priced line of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLine<'a> {
    /// Product identifier
    pub product: ProductUuid,

    /// Product name
    pub name: String,

    /// Units ordered
    pub quantity: NonZeroU32,

    /// Price of one unit before promotions
    pub base_price: Money<'a, Currency>,

    /// Price of one unit after promotions
    pub unit_price: Money<'a, Currency>,

    /// Unit price times quantity
    pub total: Money<'a, Currency>,

    /// Title of the promotion that applied, if any
    pub promotion: Option<String>,
}

/// Priced snapshot of a cart at checkout time.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSummary<'a> {
    lines: SmallVec<[CheckoutLine<'a>; 8]>,
    subtotal: Money<'a, Currency>,
    total: Money<'a, Currency>,
    placed_at: Timestamp,
}

impl<'a> CheckoutSummary<'a> {
    /// Price every line of `cart` at `now`.
    ///
    /// Stock is checked against the product snapshot held by each line.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`]: the cart has no lines.
    /// - [`CheckoutError::InsufficientStock`]: a line's quantity exceeds stock.
    /// - [`CheckoutError::Pricing`]: an amount overflowed.
    pub fn from_cart(
        cart: &Cart,
        currency: &'a Currency,
        now: Timestamp,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut lines = SmallVec::with_capacity(cart.len());
        let mut subtotal_minor = 0_i64;

        for line in cart {
            let product = line.product();
            let quantity = line.quantity();

            if !product.has_stock_for(quantity.get()) {
                return Err(CheckoutError::InsufficientStock {
                    product: product.id,
                    name: product.name.clone(),
                    requested: quantity.get(),
                    available: product.stock,
                });
            }

            let base_price = effective_price(product, None, currency, now)?;

            subtotal_minor = base_price
                .to_minor_units()
                .checked_mul(i64::from(quantity.get()))
                .and_then(|line_subtotal| subtotal_minor.checked_add(line_subtotal))
                .ok_or(PricingError::Overflow)?;

            lines.push(CheckoutLine {
                product: product.id,
                name: product.name.clone(),
                quantity,
                base_price,
                unit_price: line.unit_price(currency, now)?,
                total: line.total(currency, now)?,
                promotion: line
                    .promotion()
                    .filter(|promotion| promotion.is_applicable_at(now))
                    .map(|promotion| promotion.title.clone()),
            });
        }

        Ok(Self {
            lines,
            subtotal: Money::from_minor(subtotal_minor, currency),
            total: cart.total(currency, now)?,
            placed_at: now,
        })
    }

    /// The priced lines
    pub fn lines(&self) -> &[CheckoutLine<'a>] {
        &self.lines
    }

    /// Total before promotions
    pub fn subtotal(&self) -> &Money<'a, Currency> {
        &self.subtotal
    }

    /// Amount due
    pub fn total(&self) -> &Money<'a, Currency> {
        &self.total
    }

    /// When the cart was priced
    pub fn placed_at(&self) -> Timestamp {
        self.placed_at
    }

    /// Calculate the savings made by applying promotions.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction operation fails.
    pub fn savings(&self) -> Result<Money<'a, Currency>, MoneyError> {
        self.subtotal.sub(self.total)
    }

    /// The plain-text order message.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Render the summary as a table followed by totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the summary cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), CheckoutError> {
        let mut builder = Builder::default();

        builder.push_record(["Item", "Qty", "Base Price", "Unit Price", "Total", "Promotion"]);

        for line in &self.lines {
            builder.push_record([
                line.name.clone(),
                line.quantity.to_string(),
                line.base_price.to_string(),
                line.unit_price.to_string(),
                line.total.to_string(),
                line.promotion.clone().unwrap_or_default(),
            ]);
        }

        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.modify(Columns::new(1..5), Alignment::right());

        writeln!(out, "\n{table}")?;
        writeln!(out, " Subtotal: {}", self.subtotal)?;
        writeln!(out, " Savings:  {}", self.savings()?)?;
        writeln!(out, " Total:    {}", self.total)?;

        Ok(())
    }
}

impl fmt::Display for CheckoutSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Order summary")?;

        for line in &self.lines {
            write!(f, "- {} x {} @ {}", line.quantity, line.name, line.unit_price)?;

            if let Some(promotion) = &line.promotion {
                write!(f, " ({promotion})")?;
            }

            writeln!(f, " = {}", line.total)?;
        }

        write!(f, "Total: {}", self.total)
    }
}
