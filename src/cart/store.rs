//! Cart Store
//!
//! The single source of truth for a session's cart. Every mutation reads the
//! persisted cart, changes it, writes it back and then notifies observers.
//!
//! Persistence is best-effort: unreadable state reads as an empty cart and a
//! failed write is logged, never returned. An emptied cart removes its key. Within one store mutations are
//! serialized; separate stores over the same storage are last-write-wins.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex, PoisonError},
};

use jiff::Timestamp;
use rusty_money::{Money, iso::Currency};
use tracing::{debug, error, info, warn};

use crate::{
    cart::{
        Cart,
        events::{CartEvent, CartObserver, ObserverRegistry, Subscription},
    },
    checkout::{CheckoutError, CheckoutSummary},
    pricing::PricingError,
    products::{Product, ProductUuid},
    promotions::Promotion,
    storage::{CartStorage, MemoryStorage},
};

/// Default storage key for the cart.
pub const CART_STORAGE_KEY: &str = "cart";

/// Persisted, observable cart.
#[derive(Debug)]
pub struct CartStore<S: CartStorage = MemoryStorage> {
    storage: S,
    key: String,
    currency: &'static Currency,
    observers: ObserverRegistry,
    writes: Mutex<()>,
}

impl CartStore<MemoryStorage> {
    /// Create a store that forgets everything when dropped.
    #[must_use]
    pub fn in_memory(currency: &'static Currency) -> Self {
        Self::new(MemoryStorage::new(), currency)
    }
}

impl<S: CartStorage> CartStore<S> {
    /// Create a store persisting under [`CART_STORAGE_KEY`].
    pub fn new(storage: S, currency: &'static Currency) -> Self {
        Self {
            storage,
            key: CART_STORAGE_KEY.to_string(),
            currency,
            observers: ObserverRegistry::default(),
            writes: Mutex::new(()),
        }
    }

    /// Persist under a different key, e.g. one per session.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// The storage key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The currency carts are priced in
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// The storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read the persisted cart.
    ///
    /// Missing, unreadable or corrupt state gives an empty cart.
    pub fn cart(&self) -> Cart {
        let json = match self.storage.read(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return Cart::default(),
            Err(err) => {
                warn!(key = %self.key, error = %err, "cart storage unreadable; using empty cart");
                return Cart::default();
            }
        };

        serde_json::from_str(&json).unwrap_or_else(|err| {
            warn!(key = %self.key, error = %err, "stored cart is corrupt; using empty cart");
            Cart::default()
        })
    }

    /// Add one unit of `product`, see [`Cart::add`].
    pub fn add_to_cart(&self, product: Product, promotion: Option<Promotion>) -> Cart {
        let event = CartEvent::Added(product.id);

        self.mutate(event, |cart| cart.add(product, promotion))
    }

    /// Remove the product's line. Missing lines are not an error.
    pub fn remove_from_cart(&self, product: ProductUuid) -> Cart {
        self.mutate(CartEvent::Removed(product), |cart| {
            cart.remove(product);
        })
    }

    /// Set the product's quantity; zero or less removes the line.
    pub fn update_quantity(&self, product: ProductUuid, quantity: i64) -> Cart {
        let event = match u32::try_from(quantity) {
            Ok(0) => CartEvent::Removed(product),
            Ok(quantity) => CartEvent::QuantityUpdated(product, quantity),
            Err(_) if quantity > 0 => CartEvent::QuantityUpdated(product, u32::MAX),
            Err(_) => CartEvent::Removed(product),
        };

        self.mutate(event, |cart| {
            cart.update_quantity(product, quantity);
        })
    }

    /// Empty the cart.
    pub fn clear_cart(&self) -> Cart {
        self.mutate(CartEvent::Cleared, Cart::clear)
    }

    /// Total of `cart` in this store's currency.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] on overflow.
    pub fn cart_total(
        &self,
        cart: &Cart,
        now: Timestamp,
    ) -> Result<Money<'static, Currency>, PricingError> {
        cart.total(self.currency, now)
    }

    /// Total of the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] on overflow.
    pub fn total(&self, now: Timestamp) -> Result<Money<'static, Currency>, PricingError> {
        self.cart_total(&self.cart(), now)
    }

    /// Units in the persisted cart, for badges.
    pub fn cart_count(&self) -> u64 {
        self.cart().count()
    }

    /// Register an observer called after every mutation.
    pub fn subscribe(&self, observer: impl CartObserver + 'static) -> Subscription {
        self.observers.subscribe(Arc::new(observer))
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Summarise the cart for an order and empty it.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] if the cart is empty, a line exceeds stock,
    /// or pricing fails. The cart is left untouched on error.
    pub fn checkout(&self, now: Timestamp) -> Result<CheckoutSummary<'static>, CheckoutError> {
        let summary = self.try_mutate(|cart| -> Result<_, CheckoutError> {
            let summary = CheckoutSummary::from_cart(cart, self.currency, now)?;
            cart.clear();

            Ok((summary, CartEvent::Cleared))
        })?;

        info!(
            key = %self.key,
            lines = summary.lines().len(),
            total = %summary.total(),
            "checked out cart"
        );

        Ok(summary)
    }

    fn mutate(&self, event: CartEvent, change: impl FnOnce(&mut Cart)) -> Cart {
        let result: Result<Cart, Infallible> = self.try_mutate(|cart| {
            change(cart);
            Ok((cart.clone(), event))
        });

        let Ok(cart) = result;

        cart
    }

    fn try_mutate<T, E>(
        &self,
        change: impl FnOnce(&mut Cart) -> Result<(T, CartEvent), E>,
    ) -> Result<T, E> {
        let (value, event) = {
            let _guard = self.writes.lock().unwrap_or_else(PoisonError::into_inner);

            let mut cart = self.cart();
            let (value, event) = change(&mut cart)?;
            self.persist(&cart);

            debug!(key = %self.key, ?event, lines = cart.len(), "cart changed");

            (value, event)
        };

        self.observers.notify(&event);

        Ok(value)
    }

    fn persist(&self, cart: &Cart) {
        if cart.is_empty() {
            if let Err(err) = self.storage.remove(&self.key) {
                error!(key = %self.key, error = %err, "failed to remove cart");
            }
            return;
        }

        let json = match serde_json::to_string(cart) {
            Ok(json) => json,
            Err(err) => {
                error!(key = %self.key, error = %err, "failed to serialize cart");
                return;
            }
        };

        if let Err(err) = self.storage.write(&self.key, &json) {
            error!(key = %self.key, error = %err, "failed to persist cart");
        }
    }
}
