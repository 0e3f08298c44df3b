//! Per-player ledger of first-time boss spawns missed while offline.

use crate::types::{BossRecord, RosterEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps a roster entry's ledger key to the bosses that first spawned while
/// that player was absent. Buckets keep insertion order; a given net id
/// appears at most once per bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissedLedger {
    buckets: BTreeMap<String, Vec<BossRecord>>,
}

impl MissedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a missed boss for the entry. Returns whether the ledger
    /// changed, so callers persist only real mutations.
    pub fn record(&mut self, entry: &RosterEntry, boss: BossRecord) -> bool {
        let bucket = self.buckets.entry(entry.ledger_key()).or_default();
        if bucket.iter().any(|seen| seen.same_boss(&boss)) {
            return false;
        }
        bucket.push(boss);
        true
    }

    /// Non-mutating lookup of the entry's bucket.
    pub fn peek(&self, entry: &RosterEntry) -> Option<&[BossRecord]> {
        self.buckets.get(&entry.ledger_key()).map(Vec::as_slice)
    }

    /// Drop the entry's bucket entirely. Returns whether one existed.
    pub fn clear(&mut self, entry: &RosterEntry) -> bool {
        self.buckets.remove(&entry.ledger_key()).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
