//! Read-only snapshots rebuilt wholesale on refresh.
//!
//! A [`Snapshot`] owns an immutable value behind an [`ArcSwap`]. Readers take a
//! cheap `Arc` to the current value and keep using it for as long as they like;
//! a refresh builds a complete replacement first and only then swaps it in, so
//! nobody ever observes a half-built value and nothing is mutated in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::core::errors::Result;

/// Thread-safe holder of an immutable value that can be replaced atomically.
#[derive(Debug)]
pub struct Snapshot<T> {
    current: ArcSwap<T>,
    generation: AtomicU64,
}

impl<T> Snapshot<T> {
    /// Create a snapshot holding `initial` as generation 0.
    pub fn new(initial: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            generation: AtomicU64::new(0),
        }
    }

    /// Current value.
    pub fn load(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Number of successful replacements so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Swap in `next`, returning the previous value.
    pub fn replace(&self, next: T) -> Arc<T> {
        let previous = self.current.swap(Arc::new(next));
        self.generation.fetch_add(1, Ordering::AcqRel);
        previous
    }

    /// Build a replacement with `build` and swap it in.
    ///
    /// When `build` fails the current value stays in place.
    pub fn refresh_with<F>(&self, build: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let next = Arc::new(build()?);
        self.current.store(Arc::clone(&next));
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(next)
    }
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::QualgateError;

    #[test]
    fn readers_keep_their_copy_across_refresh() {
        let snapshot = Snapshot::new(vec![1, 2, 3]);
        let before = snapshot.load();

        snapshot.replace(vec![4]);

        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(*snapshot.load(), vec![4]);
        assert_eq!(snapshot.generation(), 1);
    }

    #[test]
    fn failed_refresh_keeps_current_value() {
        let snapshot = Snapshot::new("stable".to_string());

        let result = snapshot.refresh_with(|| Err(QualgateError::store("db down")));

        assert!(result.is_err());
        assert_eq!(snapshot.load().as_str(), "stable");
        assert_eq!(snapshot.generation(), 0);
    }

    #[test]
    fn refresh_is_visible_from_other_threads() {
        let snapshot = Arc::new(Snapshot::new(0_u32));
        snapshot.refresh_with(|| Ok(7)).expect("refresh");

        let reader = Arc::clone(&snapshot);
        let seen = std::thread::spawn(move || *reader.load())
            .join()
            .expect("reader thread");
        assert_eq!(seen, 7);
    }
}
