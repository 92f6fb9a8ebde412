//! Object pool for transient scratch collections.
//!
//! Dispatch snapshots an interest set into a scratch buffer every frame. The
//! pool hands those buffers out and takes them back so the steady state does
//! no allocation. A [`Pooled`] guard returns its value when dropped, which
//! also covers early returns and unwinding out of a system callback.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// Values that can be cleared before going back into a pool.
pub trait Reset {
    /// Restore the empty state, keeping any allocated capacity.
    fn reset(&mut self);
}

impl<T> Reset for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T> Reset for VecDeque<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: Eq + Hash> Reset for HashSet<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

/// A single-threaded pool of reusable values.
///
/// Values beyond `max_cached` are dropped on release instead of cached.
#[derive(Debug)]
pub struct ObjectPool<T> {
    cache: RefCell<Vec<T>>,
    max_cached: usize,
}

impl<T: Reset + Default> ObjectPool<T> {
    /// Cache limit used by [`ObjectPool::new`].
    pub const DEFAULT_MAX_CACHED: usize = 32;

    /// Create a pool with the default cache limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_cached(Self::DEFAULT_MAX_CACHED)
    }

    /// Create a pool that caches at most `max_cached` values.
    #[must_use]
    pub fn with_max_cached(max_cached: usize) -> Self {
        Self {
            cache: RefCell::new(Vec::new()),
            max_cached,
        }
    }

    /// Take a value from the cache, or create a fresh one.
    ///
    /// The returned guard gives the value back when dropped.
    #[must_use]
    pub fn obtain(self: &Rc<Self>) -> Pooled<T> {
        let value = self.cache.borrow_mut().pop().unwrap_or_default();
        Pooled {
            value,
            pool: Rc::clone(self),
        }
    }

    /// Reset `value` and cache it, unless the cache is full.
    pub fn release(&self, mut value: T) {
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= self.max_cached {
            return;
        }
        value.reset();
        cache.push(value);
    }

    /// Number of values currently cached.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl<T: Reset + Default> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A value on loan from an [`ObjectPool`].
pub struct Pooled<T: Reset + Default> {
    value: T,
    pool: Rc<ObjectPool<T>>,
}

impl<T: Reset + Default> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Reset + Default> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Reset + Default> Drop for Pooled<T> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.value));
    }
}

impl<T: Reset + Default + std::fmt::Debug> std::fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pooled").field(&self.value).finish()
    }
}
