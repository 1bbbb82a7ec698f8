//! Duplicate-submission guard for write forms.
//!
//! A form keyed by (session owner, form name) cannot be submitted again
//! while the previous submission is still being processed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

type Key = (String, &'static str);

/// Registry of submissions currently being processed.
#[derive(Clone, Default)]
pub struct InFlight {
    active: Arc<Mutex<HashSet<Key>>>,
}

/// Marks a submission as in flight until dropped.
#[must_use = "the submission is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<Key>>>,
    key: Key,
}

impl InFlight {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the (owner, form) slot.
    ///
    /// Returns `None` if the same form of the same owner is already in flight.
    pub fn begin(&self, owner: impl Into<String>, form: &'static str) -> Option<InFlightGuard> {
        let key = (owner.into(), form);
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(key.clone()) {
            tracing::debug!(owner = %key.0, form, "Duplicate submission ignored");
            return None;
        }

        Some(InFlightGuard {
            active: Arc::clone(&self.active),
            key,
        })
    }

    /// Number of submissions currently in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rejected_until_released() {
        let inflight = InFlight::new();

        let guard = inflight.begin("user:1", "cart_add");
        assert!(guard.is_some());
        assert!(inflight.begin("user:1", "cart_add").is_none());

        drop(guard);
        assert!(inflight.is_empty());
        assert!(inflight.begin("user:1", "cart_add").is_some());
    }

    #[test]
    fn test_independent_keys() {
        let inflight = InFlight::new();

        let _a = inflight.begin("user:1", "cart_add");
        let b = inflight.begin("user:2", "cart_add");
        let c = inflight.begin("user:1", "cart_update");
        assert!(b.is_some());
        assert!(c.is_some());
        assert_eq!(inflight.len(), 3);
    }
}
