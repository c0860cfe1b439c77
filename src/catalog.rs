//! Catalog
//!
//! Products and promotions loaded from a YAML fixture. Stands in for the
//! hosted backend that owns this data in production.

use std::{fs, path::Path};

use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::iso::{self, Currency};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    pricing::effective_price,
    products::{Product, ProductUuid},
    promotions::{Promotion, PromotionDiscount, PromotionUuid},
};

/// Catalog Parsing Errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading the catalog file
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// A promotion references a product handle that doesn't exist
    #[error("Promotion {promotion} references unknown product {product}")]
    UnknownProduct {
        /// Promotion handle
        promotion: String,
        /// Product handle
        product: String,
    },

    /// Two products share an identifier
    #[error("Duplicate product id {0}")]
    DuplicateProductId(ProductUuid),
}

#[derive(Debug, Deserialize)]
struct CatalogFixture {
    currency: String,
    #[serde(default)]
    products: FxHashMap<String, Product>,
    #[serde(default)]
    promotions: FxHashMap<String, PromotionFixture>,
}

#[derive(Debug, Deserialize)]
struct PromotionFixture {
    id: PromotionUuid,
    #[serde(default)]
    title: String,
    discount: DiscountFixture,
    #[serde(default)]
    products: Vec<String>,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    starts_at: Option<Timestamp>,
    #[serde(default)]
    ends_at: Option<Timestamp>,
}

/// Discount configuration from YAML fixtures
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DiscountFixture {
    /// Percentage points off (`amount: "20"` is 20% off)
    Percentage { amount: Decimal },

    /// Fixed price override in major units
    Price { amount: Decimal },
}

impl From<DiscountFixture> for PromotionDiscount {
    fn from(fixture: DiscountFixture) -> Self {
        match fixture {
            DiscountFixture::Percentage { amount } => Self::Percentage(amount),
            DiscountFixture::Price { amount } => Self::Price(amount),
        }
    }
}

const fn default_active() -> bool {
    true
}

/// Products and promotions keyed by handle.
#[derive(Debug)]
pub struct Catalog {
    currency: &'static Currency,
    products: FxHashMap<String, Product>,
    handles: FxHashMap<ProductUuid, String>,

    /// Sorted by handle
    promotions: Vec<(String, Promotion)>,
}

impl Catalog {
    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or isn't a valid catalog.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    /// Parse a catalog from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed, the currency is unknown,
    /// product ids collide, or a promotion names an unknown product.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let fixture: CatalogFixture = serde_norway::from_str(yaml)?;

        let currency = iso::find(&fixture.currency)
            .ok_or_else(|| CatalogError::UnknownCurrency(fixture.currency.clone()))?;

        let mut handles = FxHashMap::default();

        for (handle, product) in &fixture.products {
            if handles.insert(product.id, handle.clone()).is_some() {
                return Err(CatalogError::DuplicateProductId(product.id));
            }
        }

        let mut promotions = fixture
            .promotions
            .into_iter()
            .map(|(handle, promotion)| -> Result<_, CatalogError> {
                let products = promotion
                    .products
                    .iter()
                    .map(|product| {
                        fixture
                            .products
                            .get(product)
                            .map(|product| product.id)
                            .ok_or_else(|| CatalogError::UnknownProduct {
                                promotion: handle.clone(),
                                product: product.clone(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let promotion = Promotion {
                    id: promotion.id,
                    title: promotion.title,
                    discount: promotion.discount.into(),
                    products,
                    is_active: promotion.is_active,
                    starts_at: promotion.starts_at,
                    ends_at: promotion.ends_at,
                };

                Ok((handle, promotion))
            })
            .collect::<Result<Vec<(String, Promotion)>, _>>()?;

        promotions.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(Self {
            currency,
            products: fixture.products,
            handles,
            promotions,
        })
    }

    /// The catalog's currency
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Look a product up by handle.
    pub fn product(&self, handle: &str) -> Option<&Product> {
        self.products.get(handle)
    }

    /// Look a product up by identifier.
    pub fn product_by_id(&self, id: ProductUuid) -> Option<&Product> {
        self.handles
            .get(&id)
            .and_then(|handle| self.products.get(handle))
    }

    /// The handle a product was declared under.
    pub fn handle_of(&self, id: ProductUuid) -> Option<&str> {
        self.handles.get(&id).map(String::as_str)
    }

    /// Product handles, sorted.
    pub fn product_handles(&self) -> Vec<&str> {
        let mut handles: Vec<_> = self.products.keys().map(String::as_str).collect();
        handles.sort_unstable();
        handles
    }

    /// Promotions in handle order.
    pub fn promotions(&self) -> impl Iterator<Item = &Promotion> {
        self.promotions.iter().map(|(_, promotion)| promotion)
    }

    /// The promotion to attach when `product` is added to a cart at `now`.
    ///
    /// Among promotions that list the product and are currently applicable,
    /// picks the one giving the lowest unit price; ties go to the first handle.
    pub fn promotion_for(&self, product: ProductUuid, now: Timestamp) -> Option<&Promotion> {
        let details = self.product_by_id(product)?;

        self.promotions
            .iter()
            .map(|(_, promotion)| promotion)
            .filter(|promotion| promotion.applies_to(product) && promotion.is_applicable_at(now))
            .filter_map(|promotion| {
                effective_price(details, Some(promotion), self.currency, now)
                    .ok()
                    .map(|price| (price.to_minor_units(), promotion))
            })
            .min_by_key(|(price, _)| *price)
            .map(|(_, promotion)| promotion)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    const CATALOG: &str = r#"
currency: BRL
products:
  shirt:
    id: "0190f3a0-7b1c-7d2e-8f00-000000000001"
    name: Camiseta
    price: "100.00"
    stock: 5
  mug:
    id: "0190f3a0-7b1c-7d2e-8f00-000000000002"
    name: Caneca
    price: "25.00"
    stock: 2
promotions:
  a-small:
    id: "0190f3a0-7b1c-7d2e-8f00-0000000000a1"
    title: Ten off
    discount:
      type: percentage
      amount: "10"
    products: [shirt]
  b-big:
    id: "0190f3a0-7b1c-7d2e-8f00-0000000000a2"
    title: Twenty off
    discount:
      type: percentage
      amount: "20"
    products: [shirt]
  c-expired:
    id: "0190f3a0-7b1c-7d2e-8f00-0000000000a3"
    title: Half price
    discount:
      type: percentage
      amount: "50"
    products: [shirt, mug]
    ends_at: "2020-01-01T00:00:00Z"
"#;

    #[test]
    fn parses_products_and_currency() -> TestResult {
        let catalog = Catalog::from_yaml(CATALOG)?;

        assert_eq!(catalog.currency().iso_alpha_code, "BRL");
        assert_eq!(catalog.product_handles(), vec!["mug", "shirt"]);
        assert_eq!(
            catalog.product("shirt").map(|p| p.price),
            Some(Decimal::from(100))
        );

        Ok(())
    }

    #[test]
    fn looks_up_by_id() -> TestResult {
        let catalog = Catalog::from_yaml(CATALOG)?;
        let id: ProductUuid = "0190f3a0-7b1c-7d2e-8f00-000000000002".parse()?;

        assert_eq!(catalog.product_by_id(id).map(|p| p.name.as_str()), Some("Caneca"));
        assert_eq!(catalog.handle_of(id), Some("mug"));

        Ok(())
    }

    #[test]
    fn promotions_resolve_product_handles() -> TestResult {
        let catalog = Catalog::from_yaml(CATALOG)?;
        let titles: Vec<_> = catalog.promotions().map(|p| p.title.as_str()).collect();

        assert_eq!(titles, vec!["Ten off", "Twenty off", "Half price"]);
        assert!(catalog.promotions().all(|p| p.is_active), "active by default");

        Ok(())
    }

    #[test]
    fn discount_fixtures_are_tagged_by_type() -> TestResult {
        let yaml = r#"
currency: BRL
products:
  mug:
    id: "0190f3a0-7b1c-7d2e-8f00-000000000002"
    name: Caneca
    price: "25.00"
promotions:
  fixed:
    id: "0190f3a0-7b1c-7d2e-8f00-0000000000a1"
    discount:
      type: price
      amount: "19.90"
    products: [mug]
  off:
    id: "0190f3a0-7b1c-7d2e-8f00-0000000000a2"
    discount:
      type: percentage
      amount: 15
    products: [mug]
"#;

        let catalog = Catalog::from_yaml(yaml)?;
        let discounts: Vec<_> = catalog.promotions().map(|p| p.discount).collect();

        assert_eq!(
            discounts,
            vec![
                PromotionDiscount::Price(Decimal::new(1990, 2)),
                PromotionDiscount::Percentage(Decimal::from(15)),
            ]
        );

        Ok(())
    }

    #[test]
    fn untagged_discount_is_rejected() {
        let yaml = r#"
currency: BRL
promotions:
  sale:
    id: "0190f3a0-7b1c-7d2e-8f00-0000000000a1"
    discount:
      percentage: "10"
"#;

        assert!(matches!(Catalog::from_yaml(yaml), Err(CatalogError::Yaml(_))));
    }

    #[test]
    fn promotion_for_picks_the_lowest_price() -> TestResult {
        let catalog = Catalog::from_yaml(CATALOG)?;
        let shirt = catalog.product("shirt").map(|p| p.id);
        let mug = catalog.product("mug").map(|p| p.id);

        let now = Timestamp::now();

        assert_eq!(
            shirt
                .and_then(|id| catalog.promotion_for(id, now))
                .map(|p| p.title.as_str()),
            Some("Twenty off")
        );
        assert!(
            mug.and_then(|id| catalog.promotion_for(id, now)).is_none(),
            "the only mug promotion has expired"
        );

        Ok(())
    }

    #[test]
    fn unknown_currency_errors() {
        let result = Catalog::from_yaml("currency: XXZ\n");

        assert!(matches!(result, Err(CatalogError::UnknownCurrency(code)) if code == "XXZ"));
    }

    #[test]
    fn unknown_product_handle_errors() {
        let yaml = r#"
currency: BRL
promotions:
  sale:
    id: "0190f3a0-7b1c-7d2e-8f00-0000000000a1"
    discount:
      type: price
      amount: "5.00"
    products: [ghost]
"#;

        let result = Catalog::from_yaml(yaml);

        assert!(matches!(
            result,
            Err(CatalogError::UnknownProduct { ref product, .. }) if product == "ghost"
        ));
    }

    #[test]
    fn duplicate_product_ids_error() {
        let yaml = r#"
currency: BRL
products:
  a:
    id: "0190f3a0-7b1c-7d2e-8f00-000000000001"
    name: A
    price: "1.00"
  b:
    id: "0190f3a0-7b1c-7d2e-8f00-000000000001"
    name: B
    price: "2.00"
"#;

        assert!(matches!(
            Catalog::from_yaml(yaml),
            Err(CatalogError::DuplicateProductId(_))
        ));
    }
}
