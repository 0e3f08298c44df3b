//! Minimal in-process host demonstrating the plugin seam.
//!
//! Run with `cargo run --example local_host`. Scripts a session: a boss
//! spawn gets blocked while the roster is offline, the player joins, and
//! the same boss then spawns freely.

use anyhow::Result;
use plugin_api::{
    create_event_system, EventSystem, LogLevel, MessageColor, NpcId, NpcSpawnEvent, PlayerId,
    PlayerJoinedEvent, PlayerSession, ServerContext, ServerError, SimplePlugin,
};
use progress_together::ProgressTogetherPlugin;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

struct LocalHost {
    events: Arc<EventSystem>,
    data_dir: PathBuf,
    online: Mutex<Vec<PlayerSession>>,
}

impl ServerContext for LocalHost {
    fn events(&self) -> Arc<EventSystem> {
        Arc::clone(&self.events)
    }

    fn log(&self, _level: LogLevel, message: &str) {
        info!("[plugin] {}", message);
    }

    fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    fn online_players(&self) -> Vec<PlayerSession> {
        self.online.lock().unwrap().clone()
    }

    fn boss_defeated(&self, _net_id: i32) -> bool {
        false
    }

    fn broadcast(&self, message: &str, _color: MessageColor) -> Result<(), ServerError> {
        info!("[broadcast] {}", message);
        Ok(())
    }

    fn send_to_player(
        &self,
        _player_id: PlayerId,
        message: &str,
        _color: MessageColor,
    ) -> Result<(), ServerError> {
        info!("[whisper] {}", message);
        Ok(())
    }

    fn despawn_npc(&self, npc_id: NpcId) -> Result<(), ServerError> {
        info!("[world] despawned npc slot {}", npc_id);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    let data_dir = std::env::temp_dir().join("progress-together-demo");
    std::fs::create_dir_all(&data_dir)?;
    std::fs::write(
        data_dir.join("progress-together.json"),
        r#"{"enabled": true, "sendMissedBossesOnJoin": true, "entries": [{"name": "Al"}]}"#,
    )?;

    let host = Arc::new(LocalHost {
        events: create_event_system(),
        data_dir,
        online: Mutex::new(Vec::new()),
    });
    let context: Arc<dyn ServerContext> = host.clone();

    let mut plugin = ProgressTogetherPlugin::new();
    plugin
        .register_handlers(host.events(), Arc::clone(&context))
        .await?;
    plugin.on_init(Arc::clone(&context)).await?;

    info!("--- boss spawns while Al is offline ---");
    host.events()
        .emit_core(
            "npc_spawn",
            &NpcSpawnEvent {
                npc_id: NpcId(7),
                display_name: "Eye of Cthulhu".to_string(),
                net_id: 10,
                is_boss: true,
                timestamp: plugin_api::current_timestamp(),
            },
        )
        .await?;

    info!("--- Al joins ---");
    let al = PlayerSession {
        id: PlayerId::new(),
        name: "Al".to_string(),
        uuid: "al-device".to_string(),
    };
    host.online.lock().unwrap().push(al.clone());
    host.events()
        .emit_core(
            "player_joined",
            &PlayerJoinedEvent {
                player_id: al.id,
                name: al.name.clone(),
                uuid: al.uuid.clone(),
                timestamp: plugin_api::current_timestamp(),
            },
        )
        .await?;

    info!("--- the same boss spawns with the roster online ---");
    host.events()
        .emit_core(
            "npc_spawn",
            &NpcSpawnEvent {
                npc_id: NpcId(8),
                display_name: "Eye of Cthulhu".to_string(),
                net_id: 10,
                is_boss: true,
                timestamp: plugin_api::current_timestamp(),
            },
        )
        .await?;

    plugin.on_shutdown(context).await?;
    Ok(())
}
