//! Cart change notifications
//!
//! Observers are told *that* the cart changed, with a hint of what happened.
//! The hint is advisory: consumers that need the full state should read the
//! cart again rather than replaying events.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError, Weak},
};

use slotmap::{SlotMap, new_key_type};

use crate::products::ProductUuid;

new_key_type! {
    /// Subscription Key
    pub struct SubscriptionKey;
}

/// What a mutation did to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEvent {
    /// One unit of the product was added
    Added(ProductUuid),

    /// The product's line was removed, or a removal found nothing to remove
    Removed(ProductUuid),

    /// The product's quantity was set
    QuantityUpdated(ProductUuid, u32),

    /// Every line was removed
    Cleared,
}

/// Receives a callback after every cart mutation.
pub trait CartObserver: Send + Sync {
    /// Called once per mutation, after the cart has been persisted.
    fn on_cart_changed(&self, event: &CartEvent);
}

impl<F> CartObserver for F
where
    F: Fn(&CartEvent) + Send + Sync,
{
    fn on_cart_changed(&self, event: &CartEvent) {
        self(event);
    }
}

type Observers = Mutex<SlotMap<SubscriptionKey, Arc<dyn CartObserver>>>;

/// The observers registered on a store.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: Arc<Observers>,
}

impl ObserverRegistry {
    pub(crate) fn subscribe(&self, observer: Arc<dyn CartObserver>) -> Subscription {
        let key = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(observer);

        Subscription {
            observers: Arc::downgrade(&self.observers),
            key: Some(key),
        }
    }

    /// Call every observer.
    ///
    /// Observers are snapshotted first so a callback may subscribe, unsubscribe
    /// or read the store without deadlocking.
    pub(crate) fn notify(&self, event: &CartEvent) {
        let observers: Vec<_> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for observer in observers {
            observer.on_cart_changed(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

/// Handle for a registered observer.
///
/// Dropping the handle unsubscribes. Use [`Subscription::detach`] to keep the
/// observer for as long as the store lives.
#[must_use = "dropping a subscription unsubscribes the observer immediately"]
pub struct Subscription {
    observers: Weak<Observers>,
    key: Option<SubscriptionKey>,
}

impl Subscription {
    /// Stop receiving notifications.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the observer registered until the store is dropped.
    pub fn detach(mut self) {
        self.key = None;
    }

    /// Whether the observer is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let Some(key) = self.key else {
            return false;
        };

        self.observers.upgrade().is_some_and(|observers| {
            observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(key)
        })
    }

    fn release(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        if let Some(observers) = self.observers.upgrade() {
            observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(key);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
