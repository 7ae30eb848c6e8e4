//! Registries of in-flight transactions.

use crate::types::TransactionId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A registered item behind its own lock.
///
/// Work on one transaction holds only that transaction's mutex, never the
/// registry's.
pub type Slot<T> = Arc<Mutex<T>>;

/// Tracks in-flight items by transaction id.
///
/// The registry owns the id counter: ids are handed out by [`Registry::store`]
/// only, start at 1 and are never reused.
pub trait Registry<T>: Send + Sync {
    /// Registers an item under a fresh id.
    fn store(&self, item: T) -> TransactionId;

    /// Looks up an item.
    fn retrieve(&self, id: TransactionId) -> Option<Slot<T>>;

    /// Unregisters an item, returning it if it was present.
    fn remove(&self, id: TransactionId) -> Option<Slot<T>>;

    /// Unregisters the items that must end before a new one is stored.
    ///
    /// The processor force-ends everything returned here before running the
    /// next `init`.
    fn evict_for_store(&self) -> Vec<(TransactionId, Slot<T>)> {
        Vec::new()
    }

    /// Returns the number of registered items.
    fn len(&self) -> usize;

    /// Returns true if nothing is registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A registry for any number of concurrent transactions.
#[derive(Debug)]
pub struct MapRegistry<T> {
    next_id: AtomicU64,
    slots: RwLock<HashMap<TransactionId, Slot<T>>>,
}

impl<T> MapRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Default for MapRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Registry<T> for MapRegistry<T> {
    fn store(&self, item: T) -> TransactionId {
        let id = TransactionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.slots.write().insert(id, Arc::new(Mutex::new(item)));
        id
    }

    fn retrieve(&self, id: TransactionId) -> Option<Slot<T>> {
        self.slots.read().get(&id).cloned()
    }

    fn remove(&self, id: TransactionId) -> Option<Slot<T>> {
        self.slots.write().remove(&id)
    }

    fn len(&self) -> usize {
        self.slots.read().len()
    }
}

/// A single-slot registry for single-writer deployments.
///
/// Only one transaction is in flight at a time. Storing a new one evicts
/// the current one, which the processor aborts before the new `init` runs.
#[derive(Debug)]
pub struct SerialRegistry<T> {
    next_id: AtomicU64,
    current: Mutex<Option<(TransactionId, Slot<T>)>>,
}

impl<T> SerialRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            current: Mutex::new(None),
        }
    }
}

impl<T> Default for SerialRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Registry<T> for SerialRegistry<T> {
    fn store(&self, item: T) -> TransactionId {
        let id = TransactionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        *self.current.lock() = Some((id, Arc::new(Mutex::new(item))));
        id
    }

    fn retrieve(&self, id: TransactionId) -> Option<Slot<T>> {
        match &*self.current.lock() {
            Some((current, slot)) if *current == id => Some(Arc::clone(slot)),
            _ => None,
        }
    }

    fn remove(&self, id: TransactionId) -> Option<Slot<T>> {
        let mut current = self.current.lock();
        match current.take() {
            Some((held, slot)) if held == id => Some(slot),
            other => {
                *current = other;
                None
            }
        }
    }

    fn evict_for_store(&self) -> Vec<(TransactionId, Slot<T>)> {
        self.current.lock().take().into_iter().collect()
    }

    fn len(&self) -> usize {
        usize::from(self.current.lock().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_ids_are_monotonic() {
        let registry = MapRegistry::new();
        let a = registry.store("a");
        let b = registry.store("b");
        assert_eq!(a.as_u64(), 1);
        assert!(b > a);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn map_ids_are_not_reused() {
        let registry = MapRegistry::new();
        let a = registry.store(1);
        registry.remove(a).unwrap();
        let b = registry.store(2);
        assert_ne!(a, b);
    }

    #[test]
    fn map_retrieve_and_remove() {
        let registry = MapRegistry::new();
        let id = registry.store(String::from("txn"));

        assert_eq!(*registry.retrieve(id).unwrap().lock(), "txn");
        assert!(registry.remove(id).is_some());
        assert!(registry.retrieve(id).is_none());
        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn map_never_evicts() {
        let registry = MapRegistry::new();
        registry.store(1);
        assert!(registry.evict_for_store().is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn map_slots_lock_independently() {
        let registry = MapRegistry::new();
        let a = registry.store(0u32);
        let b = registry.store(0u32);

        let slot_a = registry.retrieve(a).unwrap();
        let _held = slot_a.lock();
        // b is reachable and lockable while a is held
        *registry.retrieve(b).unwrap().lock() += 1;
        assert_eq!(*registry.retrieve(b).unwrap().lock(), 1);
    }

    #[test]
    fn serial_holds_one() {
        let registry = SerialRegistry::new();
        let a = registry.store("a");
        let b = registry.store("b");

        assert_eq!(registry.len(), 1);
        assert!(registry.retrieve(a).is_none());
        assert_eq!(*registry.retrieve(b).unwrap().lock(), "b");
    }

    #[test]
    fn serial_remove_ignores_stale_id() {
        let registry = SerialRegistry::new();
        let a = registry.store("a");
        let b = registry.store("b");

        assert!(registry.remove(a).is_none());
        assert!(registry.retrieve(b).is_some());
        assert!(registry.remove(b).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn serial_evicts_current() {
        let registry = SerialRegistry::new();
        let a = registry.store("a");

        let evicted = registry.evict_for_store();
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, a);
        assert!(registry.is_empty());
        assert!(registry.evict_for_store().is_empty());
    }
}
