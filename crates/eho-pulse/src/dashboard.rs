use std::collections::VecDeque;

use serde::Serialize;

use eho_core::Coordinate;
use eho_core::time::now_iso8601;

#[derive(Clone, Debug, Serialize)]
pub struct DashboardEntry {
    pub identity: String,
    pub coordinate: Coordinate,
    pub last_accessed: String,
    pub access_count: u64,
}

/// Per-identity latest coordinates, ordered by last update.
/// Overflow evicts the least recently updated entry.
#[derive(Clone, Debug)]
pub struct DashboardCache {
    entries: VecDeque<DashboardEntry>,
    capacity: usize,
}

impl DashboardCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a new coordinate for `identity`, moving it to the most recent slot.
    pub fn upsert(&mut self, identity: &str, coordinate: Coordinate) {
        let access_count = match self.entries.iter().position(|e| e.identity == identity) {
            Some(i) => self.entries.remove(i).map_or(1, |e| e.access_count + 1),
            None => 1,
        };
        self.entries.push_back(DashboardEntry {
            identity: identity.to_string(),
            coordinate,
            last_accessed: now_iso8601(),
            access_count,
        });
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                tracing::debug!(identity = %evicted.identity, "dashboard entry evicted");
            }
        }
    }

    pub fn get(&self, identity: &str) -> Option<&DashboardEntry> {
        self.entries.iter().find(|e| e.identity == identity)
    }

    /// Read access: bumps the counter without changing eviction order.
    pub fn touch(&mut self, identity: &str) -> Option<&DashboardEntry> {
        let entry = self.entries.iter_mut().find(|e| e.identity == identity)?;
        entry.access_count += 1;
        entry.last_accessed = now_iso8601();
        Some(entry)
    }

    /// Up to `n` entries, most recently updated first.
    pub fn recent(&self, n: usize) -> Vec<DashboardEntry> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    /// All entries, oldest first.
    pub fn snapshot(&self) -> Vec<DashboardEntry> {
        self.entries.iter().cloned().collect()
    }
}
