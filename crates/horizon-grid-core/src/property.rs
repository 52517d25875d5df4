//! Property system for Horizon Grid.
//!
//! This module provides reactive properties with change detection and a
//! lazily computed cache with explicit invalidation. Properties are the data
//! backbone of the signal/slot system: when a property changes, its owner
//! emits a signal to notify interested parties.
//!
//! # Property Types
//!
//! - **Property<T>**: A value with change detection on `set()`
//! - **Cached<T>**: A lazily computed value that is recomputed after invalidation
//! - **Invalidator**: A clonable handle that marks a `Cached<T>` dirty
//!
//! # Example
//!
//! ```
//! use horizon_grid_core::{Property, Signal};
//!
//! struct Spacing {
//!     value: Property<i32>,
//!     value_changed: Signal<i32>,
//! }
//!
//! impl Spacing {
//!     fn set_value(&self, new_value: i32) {
//!         if self.value.set(new_value) {
//!             self.value_changed.emit(new_value);
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

/// A reactive property that tracks changes.
///
/// `Property<T>` wraps a value and provides change detection. When `set()` is
/// called, it compares the new value with the current one and returns whether
/// the value actually changed.
///
/// # Example
///
/// ```
/// use horizon_grid_core::Property;
///
/// let prop = Property::new(42);
/// assert_eq!(prop.get(), 42);
///
/// assert!(!prop.set(42));
/// assert!(prop.set(100));
/// assert_eq!(prop.get(), 100);
/// ```
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value without change detection.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    ///
    /// The caller should emit the associated notification signal when this
    /// returns `true`.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }

    /// Set the value, returning the old value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        if *current != value {
            Some(std::mem::replace(&mut *current, value))
        } else {
            None
        }
    }
}

impl<T: Clone> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

/// A lazily computed value with explicit invalidation.
///
/// `Cached<T>` stores the last computed value behind an `Arc`, so repeated
/// reads without an intervening invalidation hand out the *same* allocation.
/// The computation itself is supplied on each read, which lets the owner
/// compute from whatever state it holds at that moment.
///
/// The computation may legitimately produce nothing (`None`); that outcome
/// is cached too.
///
/// # Example
///
/// ```
/// use horizon_grid_core::Cached;
/// use std::sync::Arc;
///
/// let cache = Cached::new();
/// let first = cache.get_or_compute(|| Some(vec![1, 2, 3])).unwrap();
/// let second = cache.get_or_compute(|| Some(vec![4])).unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
///
/// cache.invalidate();
/// let third = cache.get_or_compute(|| Some(vec![4])).unwrap();
/// assert_eq!(*third, vec![4]);
/// ```
pub struct Cached<T> {
    /// Cached value.
    value: RwLock<Option<Arc<T>>>,
    /// Whether the cache needs refreshing.
    dirty: Arc<AtomicBool>,
}

impl<T> Cached<T> {
    /// Create an empty, dirty cache.
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
            dirty: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get the cached value, running `compute` first if the cache is dirty.
    pub fn get_or_compute<F>(&self, compute: F) -> Option<Arc<T>>
    where
        F: FnOnce() -> Option<T>,
    {
        // Clear the flag before computing so an invalidation that races the
        // computation leaves the cache dirty.
        if self.dirty.swap(false, Ordering::AcqRel) {
            let value = compute().map(Arc::new);
            *self.value.write() = value.clone();
            value
        } else {
            self.value.read().clone()
        }
    }

    /// Return the cached value without computing, `None` if dirty or empty.
    pub fn peek(&self) -> Option<Arc<T>> {
        if self.is_dirty() {
            None
        } else {
            self.value.read().clone()
        }
    }

    /// Mark the cache as dirty, causing recalculation on next read.
    ///
    /// Returns `true` if the cache was clean before this call.
    pub fn invalidate(&self) -> bool {
        !self.dirty.swap(true, Ordering::AcqRel)
    }

    /// Check if the cache needs recalculation.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Create a handle that can invalidate this cache from elsewhere,
    /// typically from inside a signal slot.
    pub fn invalidator(&self) -> Invalidator {
        Invalidator {
            dirty: self.dirty.clone(),
        }
    }
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Cached<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cached")
            .field("dirty", &self.is_dirty())
            .field("value", &*self.value.read())
            .finish()
    }
}

/// A clonable handle that marks a [`Cached`] value dirty.
#[derive(Clone)]
pub struct Invalidator {
    dirty: Arc<AtomicBool>,
}

impl Invalidator {
    /// Mark the associated cache dirty.
    ///
    /// Returns `true` if the cache was clean before this call.
    pub fn invalidate(&self) -> bool {
        !self.dirty.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for Invalidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invalidator")
            .field("dirty", &self.dirty.load(Ordering::Acquire))
            .finish()
    }
}

static_assertions::assert_impl_all!(Property<i32>: Send, Sync);
static_assertions::assert_impl_all!(Cached<Vec<i32>>: Send, Sync);
static_assertions::assert_impl_all!(Invalidator: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_property_set_detects_change() {
        let prop = Property::new(10);

        assert!(!prop.set(10));
        assert_eq!(prop.get(), 10);

        assert!(prop.set(20));
        assert_eq!(prop.get(), 20);
    }

    #[test]
    fn test_property_replace() {
        let prop = Property::new(Some(5));

        assert!(prop.replace(Some(5)).is_none());
        assert_eq!(prop.replace(None), Some(Some(5)));
        assert_eq!(prop.get(), None);
    }

    #[test]
    fn test_property_with_closure() {
        let prop = Property::new(vec![1, 2, 3]);
        let sum: i32 = prop.with(|v| v.iter().sum());
        assert_eq!(sum, 6);
    }

    #[test]
    fn test_cached_lazy_evaluation() {
        let call_count = AtomicUsize::new(0);
        let cache = Cached::new();
        let compute = || {
            call_count.fetch_add(1, Ordering::SeqCst);
            Some(42)
        };

        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        assert!(cache.peek().is_none());

        let first = cache.get_or_compute(compute);
        assert_eq!(first.as_deref(), Some(&42));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        let second = cache.get_or_compute(compute);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));

        assert!(cache.invalidate());
        assert!(!cache.invalidate());
        cache.get_or_compute(compute);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cached_none_is_cached() {
        let call_count = AtomicUsize::new(0);
        let cache: Cached<i32> = Cached::new();
        let compute = || {
            call_count.fetch_add(1, Ordering::SeqCst);
            None
        };

        assert!(cache.get_or_compute(compute).is_none());
        assert!(cache.get_or_compute(compute).is_none());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalidator_marks_dirty() {
        let cache = Cached::new();
        cache.get_or_compute(|| Some("sizes"));
        assert!(!cache.is_dirty());

        let invalidator = cache.invalidator();
        assert!(invalidator.clone().invalidate());
        assert!(cache.is_dirty());
        assert!(cache.peek().is_none());
    }
}
