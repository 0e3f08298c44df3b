//! The spawn gate: one synchronous decision per NPC spawn event.

use crate::config::Config;
use crate::types::{NpcSpawn, RosterEntry};
use plugin_api::PlayerSession;

/// Outcome of gating one spawn event.
#[derive(Debug, Clone, PartialEq)]
pub enum SpawnDecision {
    /// Let the spawn stand. `record_for` carries the absent roster entries
    /// whose ledgers should receive this boss; `log_first_spawn` is set
    /// when the spawn-log toggle wants a "first spawn" line.
    Allow {
        log_first_spawn: bool,
        record_for: Vec<RosterEntry>,
    },
    /// Despawn the entity and broadcast; `absent` names the players the
    /// spawn is waiting on.
    Block { absent: Vec<String> },
}

impl SpawnDecision {
    fn allow_nothing() -> Self {
        SpawnDecision::Allow {
            log_first_spawn: false,
            record_for: Vec::new(),
        }
    }
}

/// Decide block/allow for one spawn.
///
/// `already_defeated` comes from the host's world-progress oracle. Blocks
/// require all of: a boss, never defeated, gating enabled, not exempt, and
/// at least one roster member offline. Ledger recording happens only for
/// allowed first spawns, independent of the enabled flag and exemption: an
/// exempt boss that first-spawns while a roster member is away was still
/// missed by them.
pub fn evaluate(
    config: &Config,
    npc: &NpcSpawn,
    already_defeated: bool,
    online: &[PlayerSession],
) -> SpawnDecision {
    if !npc.is_boss {
        return SpawnDecision::allow_nothing();
    }

    let first_spawn = !already_defeated;
    let exempt = config.is_unchecked(npc);
    let absent = config.absent_entries(online);

    let should_block = !absent.is_empty() && config.enabled && first_spawn && !exempt;
    if should_block {
        return SpawnDecision::Block {
            absent: absent.into_iter().map(|e| e.name).collect(),
        };
    }

    let record_for = if config.send_missed_on_join && first_spawn {
        absent
    } else {
        Vec::new()
    };

    SpawnDecision::Allow {
        log_first_spawn: config.log_boss_spawns && first_spawn,
        record_for,
    }
}

/// Broadcast line for a blocked spawn. Singular "is" for exactly one
/// absent player.
pub fn blocked_broadcast(npc: &NpcSpawn, absent: &[String]) -> String {
    let adjective = if absent.len() > 1 { "are" } else { "is" };
    format!(
        "Spawning {} is blocked because {} {} not online",
        npc.display_name,
        absent.join(", "),
        adjective
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BossRecord;
    use plugin_api::{NpcId, PlayerId};

    fn session(name: &str, uuid: &str) -> PlayerSession {
        PlayerSession {
            id: PlayerId::new(),
            name: name.to_string(),
            uuid: uuid.to_string(),
        }
    }

    fn boss(name: &str, net_id: i32) -> NpcSpawn {
        NpcSpawn {
            npc_id: NpcId(7),
            display_name: name.to_string(),
            net_id,
            is_boss: true,
        }
    }

    fn gating_config() -> Config {
        let mut config = Config::default();
        config.entries = vec![RosterEntry::new("Al")];
        config
    }

    #[test]
    fn blocks_first_spawn_with_absent_roster() {
        let config = gating_config();
        let decision = evaluate(&config, &boss("Eye of Cthulhu", 4), false, &[]);
        assert_eq!(
            decision,
            SpawnDecision::Block {
                absent: vec!["Al".to_string()]
            }
        );
    }

    #[test]
    fn allows_once_roster_is_online() {
        let config = gating_config();
        let online = vec![session("Al", "device-1")];
        let decision = evaluate(&config, &boss("Eye of Cthulhu", 4), false, &online);
        assert!(matches!(decision, SpawnDecision::Allow { .. }));
    }

    #[test]
    fn allows_non_bosses_unconditionally() {
        let config = gating_config();
        let mut npc = boss("Blue Slime", 1);
        npc.is_boss = false;
        let decision = evaluate(&config, &npc, false, &[]);
        assert_eq!(decision, SpawnDecision::allow_nothing());
    }

    #[test]
    fn allows_already_defeated_bosses() {
        let config = gating_config();
        let decision = evaluate(&config, &boss("Eye of Cthulhu", 4), true, &[]);
        assert!(matches!(decision, SpawnDecision::Allow { .. }));
    }

    #[test]
    fn allows_when_disabled() {
        let mut config = gating_config();
        config.enabled = false;
        let decision = evaluate(&config, &boss("Eye of Cthulhu", 4), false, &[]);
        assert!(matches!(decision, SpawnDecision::Allow { .. }));
    }

    #[test]
    fn allows_exempt_bosses_by_net_id_and_name() {
        let mut config = gating_config();
        config.unchecked_bosses = vec![BossRecord::new("Eye of Cthulhu", 4)];

        let by_id = evaluate(&config, &boss("Renamed Eye", 4), false, &[]);
        assert!(matches!(by_id, SpawnDecision::Allow { .. }));

        let by_name = evaluate(&config, &boss("Eye of Cthulhu", 999), false, &[]);
        assert!(matches!(by_name, SpawnDecision::Allow { .. }));
    }

    #[test]
    fn records_absent_entries_on_allowed_first_spawn() {
        let mut config = gating_config();
        config.enabled = false;
        config.send_missed_on_join = true;

        let decision = evaluate(&config, &boss("Eye of Cthulhu", 4), false, &[]);
        match decision {
            SpawnDecision::Allow { record_for, .. } => {
                assert_eq!(record_for.len(), 1);
                assert_eq!(record_for[0].name, "Al");
            }
            other => panic!("expected allow, got {:?}", other),
        }
    }

    #[test]
    fn does_not_record_repeat_spawns() {
        let mut config = gating_config();
        config.enabled = false;
        config.send_missed_on_join = true;

        let decision = evaluate(&config, &boss("Eye of Cthulhu", 4), true, &[]);
        match decision {
            SpawnDecision::Allow { record_for, .. } => assert!(record_for.is_empty()),
            other => panic!("expected allow, got {:?}", other),
        }
    }

    #[test]
    fn does_not_record_without_toggle() {
        let mut config = gating_config();
        config.enabled = false;

        let decision = evaluate(&config, &boss("Eye of Cthulhu", 4), false, &[]);
        match decision {
            SpawnDecision::Allow {
                record_for,
                log_first_spawn,
            } => {
                assert!(record_for.is_empty());
                assert!(!log_first_spawn);
            }
            other => panic!("expected allow, got {:?}", other),
        }
    }

    #[test]
    fn first_spawn_logging_follows_toggle() {
        let mut config = Config::default();
        config.log_boss_spawns = true;

        let decision = evaluate(&config, &boss("Eye of Cthulhu", 4), false, &[]);
        match decision {
            SpawnDecision::Allow { log_first_spawn, .. } => assert!(log_first_spawn),
            other => panic!("expected allow, got {:?}", other),
        }

        let decision = evaluate(&config, &boss("Eye of Cthulhu", 4), true, &[]);
        match decision {
            SpawnDecision::Allow { log_first_spawn, .. } => assert!(!log_first_spawn),
            other => panic!("expected allow, got {:?}", other),
        }
    }

    #[test]
    fn broadcast_grammar_agrees_with_count() {
        let npc = boss("Eye of Cthulhu", 4);
        assert_eq!(
            blocked_broadcast(&npc, &["Al".to_string()]),
            "Spawning Eye of Cthulhu is blocked because Al is not online"
        );
        assert_eq!(
            blocked_broadcast(&npc, &["Al".to_string(), "Bob".to_string()]),
            "Spawning Eye of Cthulhu is blocked because Al, Bob are not online"
        );
    }
}
