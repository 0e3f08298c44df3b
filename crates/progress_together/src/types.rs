//! Roster and boss record types, plus the identity-matching rules.

use plugin_api::{NpcId, PlayerSession};
use serde::{Deserialize, Serialize};

/// One player required for progression.
///
/// The `uuid` is the client device identity. When it is set, a live session
/// must match both name and uuid to count as this player; when unset, the
/// name alone suffices. The looser form tolerates reinstalls and device
/// changes at the cost of being impersonatable by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl RosterEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: None,
        }
    }

    pub fn with_uuid(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: Some(uuid.into()),
        }
    }

    /// Build an entry from a live session, capturing both name and uuid.
    pub fn from_session(session: &PlayerSession) -> Self {
        Self {
            name: session.name.clone(),
            uuid: Some(session.uuid.clone()),
        }
    }

    /// Does this entry refer to the given live session?
    ///
    /// Name must match; the uuid is checked only when this entry has one.
    pub fn matches_session(&self, session: &PlayerSession) -> bool {
        let mut matches = self.name == session.name;
        if let Some(uuid) = &self.uuid {
            matches = matches && *uuid == session.uuid;
        }
        matches
    }

    /// Does this entry refer to the same player as another entry?
    ///
    /// Deliberately asymmetric: the left operand's uuid-presence decides
    /// whether uuids are compared at all.
    pub fn matches_entry(&self, other: &RosterEntry) -> bool {
        let mut matches = self.name == other.name;
        if let Some(uuid) = &self.uuid {
            matches = matches && Some(uuid) == other.uuid.as_ref();
        }
        matches
    }

    /// Deterministic key for the missed-boss ledger: `name:uuid` when the
    /// entry has a uuid, bare name otherwise.
    pub fn ledger_key(&self) -> String {
        match &self.uuid {
            Some(uuid) => format!("{}:{}", self.name, uuid),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for RosterEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.uuid {
            Some(uuid) => write!(f, "{} ({})", self.name, uuid),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A boss spawn occurrence, as stored in the ledger and the exemption list.
///
/// `net_id` is the authoritative identity: two records are the same boss iff
/// their net ids match, even when the display names differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossRecord {
    pub name: String,
    #[serde(rename = "netId")]
    pub net_id: i32,
}

impl BossRecord {
    pub fn new(name: impl Into<String>, net_id: i32) -> Self {
        Self {
            name: name.into(),
            net_id,
        }
    }

    pub fn same_boss(&self, other: &BossRecord) -> bool {
        self.net_id == other.net_id
    }
}

impl std::fmt::Display for BossRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (net id {})", self.name, self.net_id)
    }
}

/// View of one NPC spawn event, as the gate consumes it.
#[derive(Debug, Clone)]
pub struct NpcSpawn {
    pub npc_id: NpcId,
    pub display_name: String,
    pub net_id: i32,
    pub is_boss: bool,
}

impl NpcSpawn {
    pub fn boss_record(&self) -> BossRecord {
        BossRecord::new(self.display_name.clone(), self.net_id)
    }
}

impl From<&plugin_api::NpcSpawnEvent> for NpcSpawn {
    fn from(event: &plugin_api::NpcSpawnEvent) -> Self {
        Self {
            npc_id: event.npc_id,
            display_name: event.display_name.clone(),
            net_id: event.net_id,
            is_boss: event.is_boss,
        }
    }
}
