use std::sync::Arc;

use tracing::warn;

use crate::clock::Clock;
use crate::domain::SourceState;
use crate::errors::ClubFeedError;
use crate::storage::traits::KeyValueStore;

pub const STATE_NAMESPACE: &str = "aggregator_state_";

/// Per-source aggregator state, kept under `aggregator_state_<source>` keys.
///
/// All reads and writes of that state go through this type.
pub struct SourceStateStore<S: KeyValueStore> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> SourceStateStore<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn state_key(source_key: &str) -> String {
        format!("{}{}", STATE_NAMESPACE, source_key)
    }

    /// Load the state for a source, starting fresh when none is stored.
    pub fn load(&self, source_key: &str) -> SourceState {
        let key = Self::state_key(source_key);
        let stored = match self.store.get(&key) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(source = source_key, error = %e, "source state read failed");
                None
            }
        };

        stored
            .and_then(|raw| match serde_json::from_str::<SourceState>(&raw) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!(source = source_key, error = %e, "source state unreadable, resetting");
                    None
                }
            })
            .unwrap_or_else(|| SourceState::new(source_key))
    }

    fn save(&self, state: &SourceState) {
        let key = Self::state_key(&state.source_key);
        let result = serde_json::to_string(state)
            .map_err(ClubFeedError::from)
            .and_then(|raw| self.store.put(&key, &raw));

        if let Err(e) = result {
            warn!(source = state.source_key.as_str(), error = %e, "source state write failed");
        }
    }

    fn update<F: FnOnce(&mut SourceState)>(&self, source_key: &str, f: F) -> SourceState {
        let mut state = self.load(source_key);
        f(&mut state);
        self.save(&state);
        state
    }

    pub fn record_refresh(&self, source_key: &str) -> SourceState {
        let now = self.clock.now();
        self.update(source_key, |state| {
            state.refresh_count += 1;
            state.last_refreshed_at = Some(now);
        })
    }

    pub fn record_fallback(&self, source_key: &str) -> SourceState {
        self.update(source_key, |state| state.fallback_count += 1)
    }

    pub fn mark_seen(&self, source_key: &str, newest_id: &str) -> SourceState {
        self.update(source_key, |state| {
            state.last_seen_id = Some(newest_id.to_string())
        })
    }
}
