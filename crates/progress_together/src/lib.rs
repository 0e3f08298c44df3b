//! Progress Together - Boss Progression Gating Plugin
//!
//! Holds back the first spawn of boss NPCs until every player on a
//! configured roster is online, remembers which first-time spawns each
//! absent roster member missed, and tells them when they reconnect.
//!
//! The plugin reacts to two host events (`npc_spawn`, `player_joined`) plus
//! the `/progress` chat command, and keeps all of its state in one
//! JSON-backed [`config::ConfigStore`] guarded by a single mutex - the host
//! delivers events serially, so that is the whole concurrency story.

use async_trait::async_trait;
use plugin_api::{
    create_simple_plugin, EventError, EventSystem, LogLevel, MessageColor, NpcSpawnEvent,
    PlayerCommandEvent, PlayerJoinedEvent, PlayerSession, PluginError, ServerContext,
    SimplePlugin,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

pub mod commands;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod reconciler;
pub mod types;

pub use crate::config::{Config, ConfigStore};
pub use crate::gate::SpawnDecision;
pub use crate::types::{BossRecord, NpcSpawn, RosterEntry};

use crate::commands::ReplyKind;

type SharedStore = Arc<Mutex<Option<ConfigStore>>>;

pub struct ProgressTogetherPlugin {
    name: String,
    state: SharedStore,
}

impl ProgressTogetherPlugin {
    pub fn new() -> Self {
        Self {
            name: "progress_together".to_string(),
            state: Arc::new(Mutex::new(None)),
        }
    }
}

impl Default for ProgressTogetherPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_store(state: &SharedStore) -> Result<MutexGuard<'_, Option<ConfigStore>>, EventError> {
    state
        .lock()
        .map_err(|_| EventError::HandlerExecution("plugin state poisoned".to_string()))
}

/// Gate one spawn event: evaluate, then apply the side effects the
/// decision calls for. Ledger persistence failures are logged and never
/// reverse the decision already made for this event.
fn handle_spawn(store: &mut ConfigStore, context: &dyn ServerContext, event: &NpcSpawnEvent) {
    let npc = NpcSpawn::from(event);
    let online = context.online_players();
    let already_defeated = context.boss_defeated(npc.net_id);

    match gate::evaluate(store.config(), &npc, already_defeated, &online) {
        SpawnDecision::Allow {
            log_first_spawn,
            record_for,
        } => {
            if log_first_spawn {
                context.log(
                    LogLevel::Info,
                    &format!("First spawn of {} (net id {})", npc.display_name, npc.net_id),
                );
            }
            for entry in record_for {
                if let Err(e) = store.record_missed(&entry, npc.boss_record()) {
                    error!(
                        "Failed to persist missed boss for {}: {}",
                        entry.ledger_key(),
                        e
                    );
                }
            }
        }
        SpawnDecision::Block { absent } => {
            if let Err(e) = context.despawn_npc(npc.npc_id) {
                error!("Failed to despawn blocked boss {}: {}", npc.npc_id, e);
            }
            let message = gate::blocked_broadcast(&npc, &absent);
            if let Err(e) = context.broadcast(&message, MessageColor::RED) {
                error!("Failed to broadcast block message: {}", e);
            }
            if store.config().log_boss_spawns {
                context.log(
                    LogLevel::Info,
                    &format!("Blocked spawn of {}: waiting on {}", npc.display_name, absent.join(", ")),
                );
            }
        }
    }
}

fn handle_join(store: &mut ConfigStore, context: &dyn ServerContext, event: &PlayerJoinedEvent) {
    let session = PlayerSession {
        id: event.player_id,
        name: event.name.clone(),
        uuid: event.uuid.clone(),
    };

    let outcome = reconciler::on_player_join(store, &session);
    if outcome.auto_added {
        context.log(
            LogLevel::Info,
            &format!("Added {} to the progression roster", session.name),
        );
    }
    if let Some(message) = outcome.delivery {
        if let Err(e) = context.send_to_player(session.id, &message, MessageColor::YELLOW) {
            error!("Failed to deliver missed bosses to {}: {}", session.name, e);
        }
    }
}

fn handle_command(store: &mut ConfigStore, context: &dyn ServerContext, event: &PlayerCommandEvent) {
    let online = context.online_players();
    for reply in commands::handle(store, &online, &event.args) {
        let color = match reply.kind {
            ReplyKind::Info => MessageColor::YELLOW,
            ReplyKind::Success => MessageColor::GREEN,
            ReplyKind::Error => MessageColor::RED,
        };
        if let Err(e) = context.send_to_player(event.player_id, &reply.text, color) {
            error!("Failed to send command reply: {}", e);
        }
    }
}

#[async_trait]
impl SimplePlugin for ProgressTogetherPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    async fn register_handlers(
        &mut self,
        events: Arc<EventSystem>,
        context: Arc<dyn ServerContext>,
    ) -> Result<(), PluginError> {
        let path = context.data_dir().join(ConfigStore::FILE_NAME);
        let store = ConfigStore::load(path)
            .map_err(|e| PluginError::InitializationFailed(e.to_string()))?;

        {
            let mut guard = self
                .state
                .lock()
                .map_err(|_| PluginError::InitializationFailed("state poisoned".to_string()))?;
            *guard = Some(store);
        }

        let state = Arc::clone(&self.state);
        let ctx = Arc::clone(&context);
        events
            .on_core("npc_spawn", move |event: NpcSpawnEvent| {
                let mut guard = lock_store(&state)?;
                if let Some(store) = guard.as_mut() {
                    handle_spawn(store, ctx.as_ref(), &event);
                }
                Ok(())
            })
            .await
            .map_err(|e| PluginError::InitializationFailed(e.to_string()))?;

        let state = Arc::clone(&self.state);
        let ctx = Arc::clone(&context);
        events
            .on_core("player_joined", move |event: PlayerJoinedEvent| {
                let mut guard = lock_store(&state)?;
                if let Some(store) = guard.as_mut() {
                    handle_join(store, ctx.as_ref(), &event);
                }
                Ok(())
            })
            .await
            .map_err(|e| PluginError::InitializationFailed(e.to_string()))?;

        let state = Arc::clone(&self.state);
        let ctx = Arc::clone(&context);
        events
            .on_client("chat", "command", move |event: PlayerCommandEvent| {
                if event.command != "progress" {
                    return Ok(());
                }
                let mut guard = lock_store(&state)?;
                if let Some(store) = guard.as_mut() {
                    handle_command(store, ctx.as_ref(), &event);
                }
                Ok(())
            })
            .await
            .map_err(|e| PluginError::InitializationFailed(e.to_string()))?;

        Ok(())
    }

    async fn on_init(&mut self, context: Arc<dyn ServerContext>) -> Result<(), PluginError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| PluginError::InitializationFailed("state poisoned".to_string()))?;
        if let Some(store) = guard.as_ref() {
            context.log(
                LogLevel::Info,
                &format!(
                    "Progress Together {} with {} roster entries",
                    if store.enabled() { "enabled" } else { "disabled" },
                    store.entries().len()
                ),
            );
        }
        Ok(())
    }

    async fn on_shutdown(&mut self, context: Arc<dyn ServerContext>) -> Result<(), PluginError> {
        context.log(LogLevel::Info, "Progress Together shutting down");
        Ok(())
    }
}

create_simple_plugin!(ProgressTogetherPlugin);
