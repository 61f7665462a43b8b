//! Last-seen token state backing broadcast change detection

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::TokenRecord;

/// Type alias for an individual state slot (optionally contains a record)
type StateSlot = Arc<RwLock<Option<TokenRecord>>>;

/// Type alias for the state map (address -> state slot)
type StateMap = HashMap<String, StateSlot>;

/// Per-address storage for the most recently broadcast record.
///
/// Each address owns an independent slot, so concurrent broadcasts for
/// different tokens never contend; a single slot's replace is atomic under
/// its own lock, so readers never observe a torn record.
pub struct LastSeenStore {
    states: RwLock<StateMap>,
}

impl LastSeenStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the slot for `address`, creating it on first use
    async fn slot(&self, address: &str) -> StateSlot {
        {
            let states = self.states.read().await;
            if let Some(slot) = states.get(address) {
                return slot.clone();
            }
        }

        let mut states = self.states.write().await;
        states
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(None)))
            .clone()
    }

    /// Gets the last broadcast record for `address`, if any
    pub async fn get(&self, address: &str) -> Option<TokenRecord> {
        let states = self.states.read().await;
        let slot = states.get(address)?.clone();
        drop(states);

        let guard = slot.read().await;
        guard.clone()
    }

    /// Replaces the state for the record's address, returning the previous
    /// record. The swap is atomic per address.
    pub async fn swap(&self, record: TokenRecord) -> Option<TokenRecord> {
        let slot = self.slot(&record.address).await;
        let mut guard = slot.write().await;
        guard.replace(record)
    }
}

impl Default for LastSeenStore {
    fn default() -> Self {
        Self::new()
    }
}
