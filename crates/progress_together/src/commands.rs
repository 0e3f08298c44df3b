//! The `/progress` chat command.
//!
//! Each subcommand maps 1:1 onto a store operation. Bad input produces an
//! error reply and never mutates state; the handler always returns
//! normally.

use crate::config::ConfigStore;
use crate::types::RosterEntry;
use plugin_api::PlayerSession;
use tracing::error;

pub const USAGE: &str = "Usage: /progress <add|remove|status|enable|disable|list|reload> [player]";

/// How a reply should be rendered (maps onto the host's chat colors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandReply {
    pub kind: ReplyKind,
    pub text: String,
}

impl CommandReply {
    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Info,
            text: text.into(),
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Error,
            text: text.into(),
        }
    }
}

/// Handle one `/progress` invocation.
pub fn handle(
    store: &mut ConfigStore,
    online: &[PlayerSession],
    args: &[String],
) -> Vec<CommandReply> {
    match args {
        [sub] => handle_simple(store, online, sub),
        [sub, name] => handle_targeted(store, online, sub, name),
        _ => vec![CommandReply::error(USAGE)],
    }
}

fn handle_simple(
    store: &mut ConfigStore,
    online: &[PlayerSession],
    sub: &str,
) -> Vec<CommandReply> {
    match sub {
        "status" => {
            let mut replies = vec![CommandReply::info(format!(
                "Progress Together is currently {}",
                if store.enabled() { "enabled" } else { "disabled" }
            ))];

            let absent = store.config().absent_entries(online);
            if absent.is_empty() || !store.enabled() {
                replies.push(CommandReply::success(
                    "Bosses that haven't spawned before will spawn freely.",
                ));
            } else {
                replies.push(CommandReply::error(
                    "Bosses that haven't spawned before will be blocked.",
                ));
                let names: Vec<String> = absent.into_iter().map(|e| e.name).collect();
                replies.push(CommandReply::info(format!(
                    "The following players are required for progression: {}",
                    names.join(", ")
                )));
            }
            replies
        }
        "enable" => match store.set_enabled(true) {
            Ok(()) => vec![CommandReply::success("Progress Together is now enabled.")],
            Err(e) => persist_failure(e),
        },
        "disable" => match store.set_enabled(false) {
            Ok(()) => vec![
                CommandReply::success("Progress Together is now disabled."),
                CommandReply::success("Bosses will spawn without restriction."),
            ],
            Err(e) => persist_failure(e),
        },
        "list" => {
            if store.entries().is_empty() {
                return vec![CommandReply::info("No players are required for progression.")];
            }
            let lines: Vec<String> = store.entries().iter().map(|e| e.to_string()).collect();
            vec![CommandReply::success(format!(
                "The following players are required for progression:\n{}",
                lines.join("\n")
            ))]
        }
        "reload" => match store.reload() {
            Ok(()) => vec![CommandReply::success("Config reloaded.")],
            Err(e) => {
                error!("Reload failed: {}", e);
                vec![CommandReply::error("Failed to reload config.")]
            }
        },
        _ => vec![CommandReply::error(USAGE)],
    }
}

fn handle_targeted(
    store: &mut ConfigStore,
    online: &[PlayerSession],
    sub: &str,
    name: &str,
) -> Vec<CommandReply> {
    match sub {
        "add" => {
            // The entry is built from the live session so it captures the
            // device uuid; an offline name has no identity to capture.
            let session = match online.iter().find(|s| s.name == name) {
                Some(session) => session,
                None => return vec![CommandReply::error("Player not found.")],
            };
            match store.add(RosterEntry::from_session(session)) {
                Ok(()) => vec![CommandReply::success(format!(
                    "{} is now required for progression.",
                    name
                ))],
                Err(e) => persist_failure(e),
            }
        }
        "remove" => match store.remove_all_matching(name) {
            Ok(0) => vec![CommandReply::error("Player not found.")],
            Ok(_) => vec![CommandReply::success(
                "Player was removed from progression requirements.",
            )],
            Err(e) => persist_failure(e),
        },
        _ => vec![CommandReply::error(USAGE)],
    }
}

fn persist_failure(e: crate::error::ConfigError) -> Vec<CommandReply> {
    error!("Failed to persist config: {}", e);
    vec![CommandReply::error("Failed to save config.")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugin_api::PlayerId;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::load(dir.path().join(ConfigStore::FILE_NAME)).unwrap()
    }

    fn session(name: &str, uuid: &str) -> PlayerSession {
        PlayerSession {
            id: PlayerId::new(),
            name: name.to_string(),
            uuid: uuid.to_string(),
        }
    }

    fn args(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_and_overlong_input_is_usage_error() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let replies = handle(&mut store, &[], &args(&[]));
        assert_eq!(replies, vec![CommandReply::error(USAGE)]);

        let replies = handle(&mut store, &[], &args(&["add", "Al", "extra"]));
        assert_eq!(replies, vec![CommandReply::error(USAGE)]);

        let replies = handle(&mut store, &[], &args(&["frobnicate"]));
        assert_eq!(replies, vec![CommandReply::error(USAGE)]);
    }

    #[test]
    fn enable_disable_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let replies = handle(&mut store, &[], &args(&["disable"]));
        assert_eq!(replies[0].kind, ReplyKind::Success);
        assert!(!store.enabled());

        let replies = handle(&mut store, &[], &args(&["enable"]));
        assert_eq!(replies[0].kind, ReplyKind::Success);
        assert!(store.enabled());
    }

    #[test]
    fn add_captures_live_identity() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let online = vec![session("Al", "device-1")];

        let replies = handle(&mut store, &online, &args(&["add", "Al"]));
        assert_eq!(replies[0].kind, ReplyKind::Success);
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.entries()[0].uuid.as_deref(), Some("device-1"));
    }

    #[test]
    fn add_offline_player_is_error_without_mutation() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let replies = handle(&mut store, &[], &args(&["add", "Al"]));
        assert_eq!(replies, vec![CommandReply::error("Player not found.")]);
        assert!(store.entries().is_empty());
    }

    #[test]
    fn remove_reports_misses() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(RosterEntry::new("Al")).unwrap();

        let replies = handle(&mut store, &[], &args(&["remove", "Bob"]));
        assert_eq!(replies[0].kind, ReplyKind::Error);
        assert_eq!(store.entries().len(), 1);

        let replies = handle(&mut store, &[], &args(&["remove", "Al"]));
        assert_eq!(replies[0].kind, ReplyKind::Success);
        assert!(store.entries().is_empty());
    }

    #[test]
    fn status_reflects_gating_state() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add(RosterEntry::new("Al")).unwrap();

        // Al offline: bosses blocked.
        let replies = handle(&mut store, &[], &args(&["status"]));
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[1].kind, ReplyKind::Error);
        assert!(replies[2].text.contains("Al"));

        // Al online: spawns freely.
        let online = vec![session("Al", "device-1")];
        let replies = handle(&mut store, &online, &args(&["status"]));
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].kind, ReplyKind::Success);

        // Disabled: spawns freely regardless of roster.
        store.set_enabled(false).unwrap();
        let replies = handle(&mut store, &[], &args(&["status"]));
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].kind, ReplyKind::Success);
    }

    #[test]
    fn list_shows_entries_in_order() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let replies = handle(&mut store, &[], &args(&["list"]));
        assert_eq!(replies[0].kind, ReplyKind::Info);

        store.add(RosterEntry::new("Al")).unwrap();
        store.add(RosterEntry::with_uuid("Bob", "device-1")).unwrap();
        let replies = handle(&mut store, &[], &args(&["list"]));
        assert!(replies[0].text.contains("Al\nBob (device-1)"));
    }

    #[test]
    fn reload_picks_up_external_edits() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        std::fs::write(
            store.path(),
            r#"{"enabled": false, "entries": [{"name": "Al"}]}"#,
        )
        .unwrap();
        let replies = handle(&mut store, &[], &args(&["reload"]));
        assert_eq!(replies[0].kind, ReplyKind::Success);
        assert!(!store.enabled());
        assert_eq!(store.entries().len(), 1);

        std::fs::write(store.path(), "garbage").unwrap();
        let replies = handle(&mut store, &[], &args(&["reload"]));
        assert_eq!(replies, vec![CommandReply::error("Failed to reload config.")]);
        // State unchanged by the failed reload.
        assert_eq!(store.entries().len(), 1);
    }
}
