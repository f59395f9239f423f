// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Program indicator storage
//!
//! Persistence lives outside this crate; the engine reaches it through
//! [`ProgramIndicatorStore`]. The in-memory store backs tests and the CLI.

use crate::model::ProgramIndicator;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Fetch and save program indicators
pub trait ProgramIndicatorStore: Send + Sync {
    /// Save a new indicator and return its assigned id
    fn save(&self, indicator: ProgramIndicator) -> u64;

    /// Replace the indicator with the same id; `false` when the id is unknown
    fn update(&self, indicator: ProgramIndicator) -> bool;

    /// Remove an indicator by id
    fn delete(&self, id: u64) -> Option<ProgramIndicator>;

    /// Indicator by id
    fn get(&self, id: u64) -> Option<ProgramIndicator>;

    /// Indicator by uid
    fn get_by_uid(&self, uid: &str) -> Option<ProgramIndicator>;

    /// Indicator by display name
    fn get_by_name(&self, name: &str) -> Option<ProgramIndicator>;

    /// Every indicator, ordered by id
    fn all(&self) -> Vec<ProgramIndicator>;
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: u64,
    indicators: FxHashMap<u64, ProgramIndicator>,
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct InMemoryProgramIndicatorStore {
    state: RwLock<StoreState>,
}

impl InMemoryProgramIndicatorStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored indicators
    pub fn len(&self) -> usize {
        self.state.read().indicators.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.state.read().indicators.is_empty()
    }
}

impl ProgramIndicatorStore for InMemoryProgramIndicatorStore {
    fn save(&self, mut indicator: ProgramIndicator) -> u64 {
        let mut state = self.state.write();
        state.next_id += 1;
        let id = state.next_id;
        indicator.id = id;
        state.indicators.insert(id, indicator);
        log::trace!("saved program indicator {id}");
        id
    }

    fn update(&self, indicator: ProgramIndicator) -> bool {
        let mut state = self.state.write();
        match state.indicators.get_mut(&indicator.id) {
            Some(existing) => {
                *existing = indicator;
                true
            }
            None => false,
        }
    }

    fn delete(&self, id: u64) -> Option<ProgramIndicator> {
        self.state.write().indicators.remove(&id)
    }

    fn get(&self, id: u64) -> Option<ProgramIndicator> {
        self.state.read().indicators.get(&id).cloned()
    }

    fn get_by_uid(&self, uid: &str) -> Option<ProgramIndicator> {
        self.state
            .read()
            .indicators
            .values()
            .find(|indicator| indicator.uid == uid)
            .cloned()
    }

    fn get_by_name(&self, name: &str) -> Option<ProgramIndicator> {
        self.state
            .read()
            .indicators
            .values()
            .find(|indicator| indicator.name == name)
            .cloned()
    }

    fn all(&self) -> Vec<ProgramIndicator> {
        let mut indicators: Vec<ProgramIndicator> =
            self.state.read().indicators.values().cloned().collect();
        indicators.sort_by_key(|indicator| indicator.id);
        indicators
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crud() {
        let store = InMemoryProgramIndicatorStore::new();
        let id = store.save(ProgramIndicator::new("pi1", "First", "prog", "1"));
        let second = store.save(ProgramIndicator::new("pi2", "Second", "prog", "2"));
        assert_eq!((id, second), (1, 2));

        let mut indicator = store.get(id).unwrap();
        assert_eq!(indicator.uid, "pi1");
        indicator.expression = "V{event_count}".to_string();
        assert!(store.update(indicator));
        assert_eq!(store.get_by_uid("pi1").unwrap().expression, "V{event_count}");
        assert_eq!(store.get_by_name("Second").unwrap().id, 2);

        assert!(store.delete(id).is_some());
        assert!(store.get(id).is_none());
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_update_unknown_id() {
        let store = InMemoryProgramIndicatorStore::new();
        let mut indicator = ProgramIndicator::new("pi", "Name", "prog", "1");
        indicator.id = 42;
        assert!(!store.update(indicator));
        assert!(store.is_empty());
    }
}
