//! Per-account mutation locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::result::{Error, Result};

/// One mutex per account id, created on first use
///
/// Callers lock every account they mutate before opening a store session.
/// Locks are always taken in ascending id order, so two transfers over the
/// same pair of accounts in opposite directions cannot deadlock.
#[derive(Default)]
pub struct AccountLocks {
    slots: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: i64) -> Result<Arc<Mutex<()>>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| Error::persistence(format!("Lock poisoned: {}", e)))?;
        Ok(Arc::clone(slots.entry(id).or_default()))
    }

    /// Run `work` while holding the locks of all `ids`
    pub fn with_locked<T>(&self, ids: &[i64], work: impl FnOnce() -> Result<T>) -> Result<T> {
        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let slots = ordered
            .iter()
            .map(|id| self.slot(*id))
            .collect::<Result<Vec<_>>>()?;

        let mut guards = Vec::with_capacity(slots.len());
        for slot in &slots {
            // A panic while holding the lock leaves no state behind the
            // mutex itself, so a poisoned slot is still usable.
            guards.push(slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));
        }

        let result = work();
        drop(guards);
        drop(slots);
        self.prune(&ordered);
        result
    }

    /// Drop slots nobody else is holding or waiting on
    fn prune(&self, ids: &[i64]) {
        if let Ok(mut map) = self.slots.lock() {
            for id in ids {
                if map.get(id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
                    map.remove(id);
                }
            }
        }
    }

    /// Number of accounts that currently have a slot
    pub fn tracked(&self) -> usize {
        self.slots.lock().map(|m| m.len()).unwrap_or(0)
    }
}
