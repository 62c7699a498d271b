//! # Slot Registry
//!
//! Arena of reusable slots backing the subscriber and interceptor lists.
//!
//! ## Overview
//!
//! Every publish walks all living registrations, so removal must never shift
//! or reallocate the backing storage. Removing a registration tombstones its
//! slot and pushes the index onto a free list; the next `add` reuses it.
//!
//! ```text
//! slots:  [ A ][ ✝ ][ C ][ ✝ ]      free: [3, 1]
//! add(D)  [ A ][ D ][ C ][ ✝ ]      free: [3]
//! ```
//!
//! ## Key Properties
//!
//! - **Stable keys**: a live slot keeps its index for as long as it stays registered
//! - **Generations**: each add stamps a fresh generation, so a stale [`SlotKey`]
//!   can never remove whoever reused the index
//! - **Tombstone-aware iteration**: [`SlotRegistry::iter`] yields live values only
//!
//! The registry itself is not synchronised; owners wrap it in a lock.

/// Handle to exactly one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    index: usize,
    generation: u64,
}

impl SlotKey {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

/// Growable slot store with O(1) add/remove and index reuse.
#[derive(Debug)]
pub struct SlotRegistry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    live: usize,
    next_generation: u64,
}

impl<T> SlotRegistry<T> {
    pub fn new() -> Self {
        Self::with_capacity(crate::constants::DEFAULT_SLOT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            live: 0,
            next_generation: 0,
        }
    }

    /// Store a value, reusing a tombstoned slot when one is free.
    pub fn add(&mut self, value: T) -> SlotKey {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.live += 1;

        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Slot {
                    generation,
                    value: Some(value),
                };
                SlotKey { index, generation }
            }
            None => {
                let index = self.slots.len();
                self.slots.push(Slot {
                    generation,
                    value: Some(value),
                });
                SlotKey { index, generation }
            }
        }
    }

    /// Remove the registration behind `key`. Stale or unknown keys are a no-op.
    pub fn remove_key(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.free.push(key.index);
        self.live -= 1;
        Some(value)
    }

    /// Remove the first live value matching `predicate`.
    pub fn remove_first(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.value.as_ref().is_some_and(&mut predicate))?;
        let value = self.slots[index].value.take();
        self.free.push(index);
        self.live -= 1;
        value
    }

    /// Tombstone every slot, keeping the storage for reuse.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            slot.value = None;
            self.free.push(index);
        }
        self.live = 0;
    }

    /// Lazily iterate live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }

    /// Live values together with their keys.
    pub fn entries(&self) -> impl Iterator<Item = (SlotKey, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    SlotKey {
                        index,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    pub fn contains_key(&self, key: SlotKey) -> bool {
        self.slots
            .get(key.index)
            .is_some_and(|slot| slot.generation == key.generation && slot.value.is_some())
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated, live or tombstoned.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Default for SlotRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_add_reuses_single_slot() {
        let mut registry = SlotRegistry::with_capacity(1);

        let first = registry.add("a");
        assert_eq!(registry.remove_key(first), Some("a"));
        let second = registry.add("b");

        assert_eq!(registry.slot_count(), 1);
        assert_eq!(second.index(), first.index());
        assert_eq!(registry.iter().collect::<Vec<_>>(), vec![&"b"]);
    }

    #[test]
    fn test_stale_key_does_not_remove_reused_slot() {
        let mut registry = SlotRegistry::new();

        let stale = registry.add(1);
        registry.remove_key(stale);
        let current = registry.add(2);

        assert_eq!(registry.remove_key(stale), None);
        assert!(registry.contains_key(current));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_live_index_is_stable_across_other_removals() {
        let mut registry = SlotRegistry::new();
        let a = registry.add('a');
        let b = registry.add('b');
        let c = registry.add('c');

        registry.remove_key(a);
        registry.remove_key(b);

        let live: Vec<_> = registry.entries().collect();
        assert_eq!(live, vec![(c, &'c')]);
        assert_eq!(c.index(), 2);
    }

    #[test]
    fn test_remove_first_only_removes_one_duplicate() {
        let mut registry = SlotRegistry::new();
        registry.add(7);
        registry.add(7);

        assert_eq!(registry.remove_first(|v| *v == 7), Some(7));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.remove_first(|v| *v == 42), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear_keeps_storage_and_reuses_from_front() {
        let mut registry = SlotRegistry::new();
        for i in 0..4 {
            registry.add(i);
        }

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.iter().count(), 0);

        let key = registry.add(10);
        assert_eq!(key.index(), 0);
        assert_eq!(registry.slot_count(), 4);
    }
}
