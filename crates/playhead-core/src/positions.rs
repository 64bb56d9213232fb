//! Saved resume positions, keyed by video id

use crate::types::NO_POSITION;
use std::collections::HashMap;
use tracing::trace;

/// In-memory table of the last known playback position per video
#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    positions: HashMap<String, i64>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a position, overwriting any previous value
    pub fn record(&mut self, id: &str, position_micros: i64) {
        trace!(video_id = id, position_micros, "Recording position");
        self.positions.insert(id.to_string(), position_micros);
    }

    /// Reset the entry for `id` to [`NO_POSITION`]
    pub fn clear(&mut self, id: &str) {
        trace!(video_id = id, "Clearing position");
        self.positions.insert(id.to_string(), NO_POSITION);
    }

    /// Saved position for `id`, or [`NO_POSITION`]
    pub fn read(&self, id: &str) -> i64 {
        self.positions.get(id).copied().unwrap_or(NO_POSITION)
    }

    /// Saved position for `id`, if one is known
    pub fn get(&self, id: &str) -> Option<i64> {
        match self.read(id) {
            NO_POSITION => None,
            position => Some(position),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_id_reads_sentinel() {
        let store = PositionStore::new();
        assert_eq!(store.read("https://cdn.example.com/a.m3u8"), NO_POSITION);
        assert_eq!(store.get("https://cdn.example.com/a.m3u8"), None);
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = PositionStore::new();
        store.record("a", 1_000);
        store.record("a", 5_000);
        store.record("b", 7_000);
        assert_eq!(store.read("a"), 5_000);
        assert_eq!(store.read("b"), 7_000);
    }

    #[test]
    fn test_clear_resets_to_sentinel() {
        let mut store = PositionStore::new();
        store.record("a", 1_000);
        store.clear("a");
        assert_eq!(store.read("a"), NO_POSITION);
        assert_eq!(store.get("a"), None);
        // Clearing an unknown id is harmless
        store.clear("never-seen");
        assert_eq!(store.read("never-seen"), NO_POSITION);
    }
}
