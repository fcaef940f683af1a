//! Named lock slots.
//!
//! A `LockTable` hands out one shared slot per name. The table's own mutex
//! is only held while a slot is looked up or pruned, never while the slot
//! itself is locked, so work on different names never contends.
//!
//! The locks here guard no data of their own, so a poisoned lock is simply
//! recovered.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

pub(crate) struct LockTable<L> {
    slots: Mutex<HashMap<String, Arc<L>>>,
}

impl<L: Default> LockTable<L> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the slot for `name`, creating it on first use.
    pub(crate) fn slot(&self, name: &str) -> Arc<L> {
        let mut slots = lock(&self.slots);
        match slots.get(name) {
            Some(slot) => Arc::clone(slot),
            None => {
                let slot = Arc::new(L::default());
                slots.insert(name.to_string(), Arc::clone(&slot));
                slot
            }
        }
    }

    /// Give a slot back, dropping it from the table if nobody else holds it.
    ///
    /// New clones are only made under the table mutex, so a strong count of
    /// one observed here cannot race with another `slot` call.
    pub(crate) fn release(&self, name: &str, slot: Arc<L>) {
        let mut slots = lock(&self.slots);
        drop(slot);
        if slots
            .get(name)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            slots.remove(name);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.slots).len()
    }
}

impl<L: Default> Default for LockTable<L> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_shares_a_slot() {
        let table: LockTable<Mutex<()>> = LockTable::new();
        let a = table.slot("alpha");
        let b = table.slot("alpha");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn release_prunes_unused_slots() {
        let table: LockTable<Mutex<()>> = LockTable::new();
        let slot = table.slot("alpha");
        table.release("alpha", slot);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn release_keeps_slots_still_in_use() {
        let table: LockTable<Mutex<()>> = LockTable::new();
        let first = table.slot("alpha");
        let second = table.slot("alpha");
        table.release("alpha", first);
        assert_eq!(table.len(), 1);
        table.release("alpha", second);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let shared = Arc::new(RwLock::new(()));
        let poisoner = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(shared.is_poisoned());
        let _guard = write(&shared);
    }
}
