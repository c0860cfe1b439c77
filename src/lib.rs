//! Vitrine
//!
//! Vitrine is the cart and promotion pricing engine behind a storefront: a
//! persisted, observable shopping cart whose totals account for time-bounded
//! product promotions.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod discounts;
pub mod observability;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod promotions;
pub mod storage;
pub mod uuids;
