//! Vitrine prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{
        CART_STORAGE_KEY, Cart, CartError, CartEvent, CartLine, CartObserver, CartStore,
        Subscription,
    },
    catalog::{Catalog, CatalogError},
    checkout::{CheckoutError, CheckoutLine, CheckoutSummary},
    config::{CartConfig, ConfigError, LogFormat, LoggingConfig, StorageConfig},
    discounts::DiscountError,
    pricing::{PricingError, cart_total, effective_price, line_total},
    products::{Product, ProductUuid},
    promotions::{Promotion, PromotionDiscount, PromotionIssue, PromotionUuid},
    storage::{CartStorage, FileStorage, MemoryStorage, StorageError},
};
