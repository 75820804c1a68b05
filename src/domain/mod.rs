//! Domain layer: store identity, live state, and the change system.
//!
//! This module contains the state-container model: store identity, the
//! live mutable [`Store`], change events raised on every mutation, and
//! the synchronous [`ChangeBus`] that delivers them to subscribers.

pub mod change_bus;
pub mod store;
pub mod store_event;
pub mod store_id;

pub use change_bus::{ChangeBus, SubscribeOptions, Subscription};
pub use store::Store;
pub use store_event::{MutationKind, StoreEvent};
pub use store_id::StoreId;
