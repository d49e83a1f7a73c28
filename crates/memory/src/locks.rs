//! Per-key write serialization.
//!
//! The Memory Store's per-session JSON file and each agent's daily log are
//! read-modify-write; concurrent writes to the *same* key must serialize
//! (spec.md §5 shared-resource policy). This is an in-process lock only — a
//! multi-process deployment would need a file-lock fallback, which spec.md §9
//! explicitly marks as a known limitation out of MVP scope.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("keyed-lock registry poisoned");
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
