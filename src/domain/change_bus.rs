//! Synchronous subscriber registry for change notifications.
//!
//! [`ChangeBus`] delivers [`StoreEvent`]s to registered callbacks inline
//! on the mutating call, in registration order. Delivery is serialized by
//! the bus lock, which matches the single-writer, single-consumer model:
//! one notification per logical mutation, processed in the order raised.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::StoreEvent;

type Callback = Box<dyn Fn(&StoreEvent) + Send + Sync>;

struct SubscriberEntry {
    id: u64,
    detached: bool,
    callback: Callback,
}

struct BusInner {
    subscribers: Vec<SubscriberEntry>,
    next_id: u64,
}

/// Options controlling a subscription's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct SubscribeOptions {
    /// When `true` (the default), the subscription survives
    /// [`super::Store::teardown`] and fires for the lifetime of the
    /// process. When `false`, teardown releases it.
    pub detached: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self { detached: true }
    }
}

/// Handle identifying one registered subscriber.
///
/// Returned by [`ChangeBus::subscribe`]; pass it back to
/// [`ChangeBus::unsubscribe`] to release the callback explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
}

/// Synchronous broadcast bus for [`StoreEvent`]s.
///
/// Callbacks run inline while the bus lock is held: they must not
/// subscribe, unsubscribe, or tear down from within a notification.
#[derive(Clone)]
pub struct ChangeBus {
    inner: Arc<Mutex<BusInner>>,
}

impl ChangeBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of callbacks invoked. With no subscribers the
    /// event is silently dropped.
    pub fn publish(&self, event: &StoreEvent) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in &inner.subscribers {
            (entry.callback)(event);
        }
        inner.subscribers.len()
    }

    /// Registers a callback for all future events.
    pub fn subscribe(
        &self,
        options: SubscribeOptions,
        callback: impl Fn(&StoreEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = inner.next_id;
        inner.next_id = inner.next_id.wrapping_add(1);
        inner.subscribers.push(SubscriberEntry {
            id,
            detached: options.detached,
            callback: Box::new(callback),
        });
        Subscription { id }
    }

    /// Removes a subscriber. Returns `true` if it was still registered.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.subscribers.len();
        inner.subscribers.retain(|entry| entry.id != subscription.id);
        inner.subscribers.len() < before
    }

    /// Releases every subscriber registered with `detached: false`.
    ///
    /// Called on store teardown; detached subscribers keep firing.
    pub fn release_attached(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.subscribers.retain(|entry| entry.detached);
    }

    /// Returns the current number of subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("receiver_count", &self.receiver_count())
            .finish()
    }
}
