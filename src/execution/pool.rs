//! # Context Pool
//!
//! Bounded pool of reusable scratch values rented for the duration of a single
//! publish. Renting hands out an RAII guard; dropping the guard resets the value
//! and returns it to the pool, so release happens on success, failure, and when
//! a cancelled publish future is simply dropped.

use crossbeam::queue::ArrayQueue;
use std::ops::{Deref, DerefMut};

/// Scratch values that can be cleared and handed out again.
pub trait Poolable: Default + Send {
    /// Drop per-publish contents while keeping allocated capacity.
    fn reset(&mut self);
}

/// Lock-free bounded pool.
pub struct ContextPool<T: Poolable> {
    idle: ArrayQueue<T>,
}

impl<T: Poolable> ContextPool<T> {
    /// Pool retaining at most `capacity` idle values (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Take an idle value, or build a fresh one when the pool is empty.
    pub fn rent(&self) -> Pooled<'_, T> {
        Pooled {
            pool: self,
            value: self.idle.pop().unwrap_or_default(),
        }
    }

    /// Idle values currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    pub fn capacity(&self) -> usize {
        self.idle.capacity()
    }
}

impl<T: Poolable> std::fmt::Debug for ContextPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPool")
            .field("idle", &self.idle.len())
            .field("capacity", &self.idle.capacity())
            .finish()
    }
}

/// Rented value; returned to its pool on drop.
pub struct Pooled<'a, T: Poolable> {
    pool: &'a ContextPool<T>,
    value: T,
}

impl<T: Poolable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Poolable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Poolable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        let mut value = std::mem::take(&mut self.value);
        value.reset();
        // A full pool just lets the value go.
        let _ = self.pool.idle.push(value);
    }
}
