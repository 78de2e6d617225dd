//! Open-reader bookkeeping for vault objects.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// One-shot callback fired when the last reader of a key closes.
pub type CloseCallback = Box<dyn FnOnce() + Send>;

/// Per-key open counts with at most one pending "fully closed" callback.
///
/// Not internally synchronized: the vault only touches it while holding its
/// own lock, which keeps "check count, decide, mutate" a single step.
pub struct OpenTracker<K> {
    counts: HashMap<K, usize>,
    callbacks: HashMap<K, CloseCallback>,
}

impl<K: Eq + Hash + Clone> OpenTracker<K> {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            callbacks: HashMap::new(),
        }
    }

    /// Register one more open reader for `key`.
    pub fn open(&mut self, key: K) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Release one reader of `key`.
    ///
    /// When the count reaches zero the pending callback, if any, runs before
    /// the entry is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `key` has no open readers: an unbalanced close is a caller
    /// bug, not a recoverable condition.
    pub fn close(&mut self, key: &K) {
        let count = self
            .counts
            .get_mut(key)
            .unwrap_or_else(|| panic!("unbalanced close: key has no open readers"));

        *count -= 1;
        if *count == 0 {
            if let Some(callback) = self.callbacks.remove(key) {
                callback();
            }
            self.counts.remove(key);
        }
    }

    /// `true` iff at least one reader holds `key` open.
    pub fn is_open(&self, key: &K) -> bool {
        self.counts.get(key).is_some_and(|c| *c > 0)
    }

    /// Number of open readers for `key`.
    pub fn open_count(&self, key: &K) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Run `callback` on the next transition of `key` to zero readers.
    /// Replaces any previously registered callback.
    pub fn on_close(&mut self, key: K, callback: CloseCallback) {
        self.callbacks.insert(key, callback);
    }

    /// Drop the pending callback for `key` without running it.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.callbacks.remove(key).is_some()
    }

    /// `true` if a callback is waiting on `key`.
    pub fn has_pending(&self, key: &K) -> bool {
        self.callbacks.contains_key(key)
    }
}

impl<K: Eq + Hash + Clone> Default for OpenTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for OpenTracker<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenTracker")
            .field("open_keys", &self.counts.len())
            .field("pending_callbacks", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_callback(counter: &Arc<AtomicUsize>) -> CloseCallback {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn open_and_close_balance() {
        let mut t = OpenTracker::new();
        assert!(!t.is_open(&"a"));
        t.open("a");
        t.open("a");
        assert_eq!(t.open_count(&"a"), 2);
        t.close(&"a");
        assert!(t.is_open(&"a"));
        t.close(&"a");
        assert!(!t.is_open(&"a"));
        assert_eq!(t.open_count(&"a"), 0);
    }

    #[test]
    fn callback_fires_once_on_last_close() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut t = OpenTracker::new();
        t.open("a");
        t.open("a");
        t.on_close("a", counter_callback(&fired));

        t.close(&"a");
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        t.close(&"a");
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Callback is one-shot.
        t.open("a");
        t.close(&"a");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_close_overwrites_previous_callback() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut t = OpenTracker::new();
        t.open("a");
        t.on_close("a", counter_callback(&first));
        t.on_close("a", counter_callback(&second));
        t.close(&"a");
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_drops_callback_without_running() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut t = OpenTracker::new();
        t.open("a");
        t.on_close("a", counter_callback(&fired));
        assert!(t.has_pending(&"a"));
        assert!(t.cancel(&"a"));
        assert!(!t.has_pending(&"a"));
        t.close(&"a");
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!t.cancel(&"a"));
    }

    #[test]
    #[should_panic(expected = "unbalanced close")]
    fn close_without_open_panics() {
        let mut t: OpenTracker<&str> = OpenTracker::new();
        t.close(&"never-opened");
    }
}
