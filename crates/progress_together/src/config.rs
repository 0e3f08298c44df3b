//! Plugin configuration: the roster, feature toggles, and the missed-boss
//! ledger, persisted as one JSON document in the host's data directory.
//!
//! Every mutating operation writes the file before returning. Writes go
//! through a temp file and an atomic rename so a crash never leaves a
//! half-written config over live data.

use crate::error::{ConfigError, ConfigResult};
use crate::ledger::MissedLedger;
use crate::types::{BossRecord, NpcSpawn, RosterEntry};
use plugin_api::PlayerSession;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn default_enabled() -> bool {
    true
}

/// The persisted document. Unknown fields are ignored on read; absent
/// fields take these defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(rename = "addOnLogin", default)]
    pub add_on_login: bool,
    #[serde(rename = "logBossSpawns", default)]
    pub log_boss_spawns: bool,
    #[serde(rename = "sendMissedBossesOnJoin", default)]
    pub send_missed_on_join: bool,
    #[serde(default)]
    pub entries: Vec<RosterEntry>,
    #[serde(rename = "missedBosses", default)]
    pub missed_bosses: MissedLedger,
    #[serde(rename = "uncheckedBosses", default)]
    pub unchecked_bosses: Vec<BossRecord>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            add_on_login: false,
            log_boss_spawns: false,
            send_missed_on_join: false,
            entries: Vec::new(),
            missed_bosses: MissedLedger::new(),
            unchecked_bosses: Vec::new(),
        }
    }
}

impl Config {
    /// Any roster entry matching this live session?
    pub fn contains_match_for(&self, session: &PlayerSession) -> bool {
        self.entries.iter().any(|e| e.matches_session(session))
    }

    /// Roster entries with no matching live session, insertion order.
    pub fn absent_entries(&self, online: &[PlayerSession]) -> Vec<RosterEntry> {
        self.entries
            .iter()
            .filter(|entry| !online.iter().any(|s| entry.matches_session(s)))
            .cloned()
            .collect()
    }

    /// Is this spawn exempt from gating? Matched by net id or display name.
    pub fn is_unchecked(&self, npc: &NpcSpawn) -> bool {
        self.unchecked_bosses
            .iter()
            .any(|b| b.net_id == npc.net_id || b.name == npc.display_name)
    }
}

/// Owns the [`Config`] plus its backing file.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
}

impl ConfigStore {
    pub const FILE_NAME: &'static str = "progress-together.json";

    /// Load the config from `path`.
    ///
    /// A missing file is first-run: defaults are constructed and written
    /// out. An unreadable or malformed file is a hard error; the caller
    /// must surface it rather than reset live data.
    pub fn load(path: PathBuf) -> ConfigResult<Self> {
        if !path.exists() {
            info!("No config at {}, creating defaults", path.display());
            let store = Self {
                path,
                config: Config::default(),
            };
            store.write()?;
            return Ok(store);
        }

        let config = Self::read_file(&path)?;
        info!("Loaded config from {}", path.display());
        Ok(Self { path, config })
    }

    fn read_file(path: &Path) -> ConfigResult<Config> {
        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Re-read from disk, replacing in-memory state only on success.
    pub fn reload(&mut self) -> ConfigResult<()> {
        self.config = Self::read_file(&self.path)?;
        info!("Reloaded config from {}", self.path.display());
        Ok(())
    }

    /// Persist the current state: serialize pretty, write a temp file,
    /// fsync, atomic rename.
    pub fn write(&self) -> ConfigResult<()> {
        let json =
            serde_json::to_string_pretty(&self.config).map_err(ConfigError::Serialize)?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| ConfigError::FileCreate(temp_path.clone(), e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| ConfigError::FileWrite(temp_path.clone(), e))?;
        file.sync_all()
            .map_err(|e| ConfigError::FileSync(temp_path.clone(), e))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| ConfigError::FileRename(temp_path, self.path.clone(), e))?;

        debug!("Wrote config to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) -> ConfigResult<()> {
        self.config.enabled = enabled;
        self.write()
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.config.entries
    }

    /// Append an entry unconditionally. Duplicates are permitted; two
    /// accounts may share a display name.
    pub fn add(&mut self, entry: RosterEntry) -> ConfigResult<()> {
        self.config.entries.push(entry);
        self.write()
    }

    /// Remove every entry whose name matches exactly, ignoring uuids.
    /// Persists only when something was removed.
    pub fn remove_all_matching(&mut self, name: &str) -> ConfigResult<usize> {
        let before = self.config.entries.len();
        self.config.entries.retain(|e| e.name != name);
        let removed = before - self.config.entries.len();
        if removed > 0 {
            self.write()?;
        }
        Ok(removed)
    }

    pub fn contains_match_for(&self, session: &PlayerSession) -> bool {
        self.config.contains_match_for(session)
    }

    /// Ledger a missed boss for the entry. Persists only when the ledger
    /// actually changed; returns whether it did.
    pub fn record_missed(&mut self, entry: &RosterEntry, boss: BossRecord) -> ConfigResult<bool> {
        if !self.config.missed_bosses.record(entry, boss) {
            return Ok(false);
        }
        self.write()?;
        Ok(true)
    }

    pub fn missed_for(&self, entry: &RosterEntry) -> Option<&[BossRecord]> {
        self.config.missed_bosses.peek(entry)
    }

    /// Drop the entry's missed bucket, persisting when one existed.
    pub fn clear_missed(&mut self, entry: &RosterEntry) -> ConfigResult<bool> {
        if !self.config.missed_bosses.clear(entry) {
            return Ok(false);
        }
        self.write()?;
        Ok(true)
    }
}
