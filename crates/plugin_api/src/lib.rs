//! Host-facing plugin API.
//!
//! This crate is the seam between the game server and its plugins: a typed
//! event bus for server events, the plugin lifecycle traits, and the
//! [`ServerContext`] handle through which a plugin reads host-global state
//! (live sessions, world progress) and issues chat or entity calls.
//!
//! The host delivers events serially, so context calls are synchronous;
//! handler registration and emission are async like the rest of the server.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// ============================================================================
// Core Types
// ============================================================================

/// Unique identifier for a connected player session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slot identifier for a live NPC entity in the world.
///
/// Distinct from the NPC's net id: the slot identifies one spawned instance,
/// the net id identifies the kind of NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NpcId(pub i32);

impl std::fmt::Display for NpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live, connected player as the host sees it.
///
/// The `uuid` is the client-supplied device identity string, not the
/// session's [`PlayerId`]; it survives reconnects from the same install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSession {
    pub id: PlayerId,
    pub name: String,
    pub uuid: String,
}

/// Chat message color, as rendered by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl MessageColor {
    pub const RED: MessageColor = MessageColor { r: 255, g: 0, b: 0 };
    pub const GREEN: MessageColor = MessageColor { r: 0, g: 255, b: 0 };
    pub const YELLOW: MessageColor = MessageColor {
        r: 255,
        g: 255,
        b: 0,
    };
    pub const WHITE: MessageColor = MessageColor {
        r: 255,
        g: 255,
        b: 255,
    };
}

// ============================================================================
// Event Traits and Core Infrastructure
// ============================================================================

pub trait Event: Send + Sync + Any + std::fmt::Debug {
    fn type_name() -> &'static str
    where
        Self: Sized;
    fn serialize(&self) -> Result<Vec<u8>, EventError>;
    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;
    fn as_any(&self) -> &dyn Any;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + std::fmt::Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(EventError::Serialization)
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(EventError::Deserialization)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, data: &[u8]) -> Result<(), EventError>;
    fn expected_type_id(&self) -> TypeId;
    fn handler_name(&self) -> &str;
}

pub struct TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    handler: F,
    name: String,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, F> TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    pub fn new(name: String, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> EventHandler for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    async fn handle(&self, data: &[u8]) -> Result<(), EventError> {
        let event = T::deserialize(data)?;
        (self.handler)(event)
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Event System
// ============================================================================

pub struct EventSystem {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    stats: RwLock<EventSystemStats>,
}

impl EventSystem {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            stats: RwLock::new(EventSystemStats::default()),
        }
    }

    /// Register a core server event handler
    pub async fn on_core<T, F>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = format!("core:{}", event_name);
        self.register_typed_handler(event_key, handler).await
    }

    /// Register a client event handler with namespace
    pub async fn on_client<T, F>(
        &self,
        namespace: &str,
        event_name: &str,
        handler: F,
    ) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = format!("client:{}:{}", namespace, event_name);
        self.register_typed_handler(event_key, handler).await
    }

    /// Register a plugin event handler
    pub async fn on_plugin<T, F>(
        &self,
        plugin_name: &str,
        event_name: &str,
        handler: F,
    ) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = format!("plugin:{}:{}", plugin_name, event_name);
        self.register_typed_handler(event_key, handler).await
    }

    async fn register_typed_handler<T, F>(
        &self,
        event_key: String,
        handler: F,
    ) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let handler_name = format!("{}::{}", event_key, T::type_name());
        let typed_handler = TypedEventHandler::new(handler_name, handler);
        let handler_arc: Arc<dyn EventHandler> = Arc::new(typed_handler);

        let mut handlers = self.handlers.write().await;
        handlers
            .entry(event_key.clone())
            .or_insert_with(Vec::new)
            .push(handler_arc);

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;

        info!("Registered handler for {}", event_key);
        Ok(())
    }

    /// Emit a core event
    pub async fn emit_core<T>(&self, event_name: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = format!("core:{}", event_name);
        self.emit_event(&event_key, event).await
    }

    /// Emit a client event
    pub async fn emit_client<T>(
        &self,
        namespace: &str,
        event_name: &str,
        event: &T,
    ) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = format!("client:{}:{}", namespace, event_name);
        self.emit_event(&event_key, event).await
    }

    /// Emit a plugin event
    pub async fn emit_plugin<T>(
        &self,
        plugin_name: &str,
        event_name: &str,
        event: &T,
    ) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = format!("plugin:{}:{}", plugin_name, event_name);
        self.emit_event(&event_key, event).await
    }

    /// Handler failures are logged, never propagated back to the emitter.
    async fn emit_event<T>(&self, event_key: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let data = event.serialize()?;
        let handlers = self.handlers.read().await;

        if let Some(event_handlers) = handlers.get(event_key) {
            debug!("Emitting {} to {} handlers", event_key, event_handlers.len());

            for handler in event_handlers {
                if let Err(e) = handler.handle(&data).await {
                    error!("Handler {} failed: {}", handler.handler_name(), e);
                }
            }

            let mut stats = self.stats.write().await;
            stats.events_emitted += 1;
        } else {
            warn!("No handlers for event: {}", event_key);
        }

        Ok(())
    }

    pub async fn get_stats(&self) -> EventSystemStats {
        let stats = self.stats.read().await;
        stats.clone()
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_event_system() -> Arc<EventSystem> {
    Arc::new(EventSystem::new())
}

// ============================================================================
// Core Server Events
// ============================================================================

/// A player finished joining the server (core infrastructure event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerJoinedEvent {
    pub player_id: PlayerId,
    pub name: String,
    pub uuid: String,
    pub timestamp: u64,
}

/// An NPC entity was spawned into the world (core infrastructure event).
///
/// Emitted after the entity exists; a handler that wants to veto the spawn
/// despawns the slot through [`ServerContext::despawn_npc`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcSpawnEvent {
    pub npc_id: NpcId,
    pub display_name: String,
    pub net_id: i32,
    pub is_boss: bool,
    pub timestamp: u64,
}

/// A chat command issued by a player (client event, namespace `chat`,
/// event `command`). `command` is the slash-command name without the slash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCommandEvent {
    pub player_id: PlayerId,
    pub command: String,
    pub args: Vec<String>,
}

// ============================================================================
// Statistics and Error Types
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct EventSystemStats {
    pub total_handlers: usize,
    pub events_emitted: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}

// ============================================================================
// Server Context Interface
// ============================================================================

/// Handle through which a plugin talks to the host.
///
/// Everything here is synchronous: the host serializes event delivery, so a
/// context call completes before the next event is dispatched.
pub trait ServerContext: Send + Sync {
    fn events(&self) -> Arc<EventSystem>;
    fn log(&self, level: LogLevel, message: &str);

    /// Durable storage root for plugin-owned files.
    fn data_dir(&self) -> PathBuf;

    /// Snapshot of every connected session.
    fn online_players(&self) -> Vec<PlayerSession>;

    /// World-progress oracle: has this boss kind ever been defeated in this
    /// world? Keyed by net id.
    fn boss_defeated(&self, net_id: i32) -> bool;

    /// Server-wide chat message.
    fn broadcast(&self, message: &str, color: MessageColor) -> Result<(), ServerError>;

    /// Chat message to a single session.
    fn send_to_player(
        &self,
        player_id: PlayerId,
        message: &str,
        color: MessageColor,
    ) -> Result<(), ServerError>;

    /// Deactivate a live NPC slot, removing the entity from the world.
    fn despawn_npc(&self, npc_id: NpcId) -> Result<(), ServerError>;
}

// ============================================================================
// Plugin Lifecycle
// ============================================================================

/// Simplified plugin trait that doesn't require unsafe code.
#[async_trait]
pub trait SimplePlugin: Send + Sync + 'static {
    /// Plugin name
    fn name(&self) -> &str;

    /// Plugin version
    fn version(&self) -> &str;

    /// Register event handlers during pre-initialization
    async fn register_handlers(
        &mut self,
        events: Arc<EventSystem>,
        context: Arc<dyn ServerContext>,
    ) -> Result<(), PluginError>;

    /// Initialize the plugin
    async fn on_init(&mut self, _context: Arc<dyn ServerContext>) -> Result<(), PluginError> {
        Ok(())
    }

    /// Shutdown the plugin
    async fn on_shutdown(&mut self, _context: Arc<dyn ServerContext>) -> Result<(), PluginError> {
        Ok(())
    }
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str;

    async fn pre_init(&mut self, context: Arc<dyn ServerContext>) -> Result<(), PluginError>;
    async fn init(&mut self, context: Arc<dyn ServerContext>) -> Result<(), PluginError>;
    async fn shutdown(&mut self, context: Arc<dyn ServerContext>) -> Result<(), PluginError>;
}

#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin initialization failed: {0}")]
    InitializationFailed(String),
    #[error("Plugin execution error: {0}")]
    ExecutionError(String),
    #[error("Plugin not found: {0}")]
    NotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Macro to create a plugin with minimal boilerplate.
#[macro_export]
macro_rules! create_simple_plugin {
    ($plugin_type:ty) => {
        /// Wrapper to bridge SimplePlugin and Plugin traits
        pub struct PluginWrapper {
            inner: $plugin_type,
        }

        #[async_trait::async_trait]
        impl $crate::Plugin for PluginWrapper {
            fn name(&self) -> &str {
                $crate::SimplePlugin::name(&self.inner)
            }

            fn version(&self) -> &str {
                $crate::SimplePlugin::version(&self.inner)
            }

            async fn pre_init(
                &mut self,
                context: ::std::sync::Arc<dyn $crate::ServerContext>,
            ) -> Result<(), $crate::PluginError> {
                let events = context.events();
                self.inner.register_handlers(events, context).await
            }

            async fn init(
                &mut self,
                context: ::std::sync::Arc<dyn $crate::ServerContext>,
            ) -> Result<(), $crate::PluginError> {
                self.inner.on_init(context).await
            }

            async fn shutdown(
                &mut self,
                context: ::std::sync::Arc<dyn $crate::ServerContext>,
            ) -> Result<(), $crate::PluginError> {
                self.inner.on_shutdown(context).await
            }
        }

        /// Plugin creation function - required export
        #[no_mangle]
        pub unsafe extern "C" fn create_plugin() -> *mut dyn $crate::Plugin {
            let plugin = Box::new(PluginWrapper {
                inner: <$plugin_type>::new(),
            });
            Box::into_raw(plugin)
        }

        /// Plugin destruction function - required export
        #[no_mangle]
        pub unsafe extern "C" fn destroy_plugin(plugin: *mut dyn $crate::Plugin) {
            if !plugin.is_null() {
                let _ = Box::from_raw(plugin);
            }
        }
    };
}

// ============================================================================
// Utility Functions
// ============================================================================

pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
