//! Products

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::uuids::TypedUuid;

/// Product Uuid
pub type ProductUuid = TypedUuid<Product>;

/// Catalog product, as the cart sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier
    pub id: ProductUuid,

    /// Product name
    pub name: String,

    /// Base price, in major currency units (e.g. `10.00`)
    pub price: Decimal,

    /// Units in stock
    #[serde(default)]
    pub stock: u32,

    /// Image references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl Product {
    /// Create a product with no images.
    pub fn new(id: ProductUuid, name: impl Into<String>, price: Decimal, stock: u32) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            stock,
            images: Vec::new(),
        }
    }

    /// Whether `quantity` units can be fulfilled from stock.
    #[must_use]
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn stock_check_is_inclusive() {
        let product = Product::new(ProductUuid::now_v7(), "Caneca", Decimal::new(2500, 2), 3);

        assert!(product.has_stock_for(3), "exact stock should be enough");
        assert!(!product.has_stock_for(4), "one over stock should not be");
    }

    #[test]
    fn deserializes_without_optional_fields() -> TestResult {
        let json = r#"{
            "id": "0190f3a0-7b1c-7d2e-8f00-000000000001",
            "name": "Camiseta",
            "price": "49.90"
        }"#;

        let product: Product = serde_json::from_str(json)?;

        assert_eq!(product.price, Decimal::new(4990, 2));
        assert_eq!(product.stock, 0);
        assert!(product.images.is_empty());

        Ok(())
    }
}
