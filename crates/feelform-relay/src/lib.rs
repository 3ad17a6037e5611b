//! WebSocket tilt relay plus the HTTP analysis endpoints.

pub mod api;
pub mod config;
pub mod connection;
pub mod hub;
pub mod registry;
pub mod server;

pub use config::{AppConfig, ConfigError, LlmConfig, ServerConfig};
pub use hub::{HubEvent, RelayHub, RelayStats};
pub use registry::RoomRegistry;
pub use server::{build_router, start, AppState, GeneratorSlot, ServerHandle};
