//! Configuration for rdpdrive sessions
//!
//! Serializable client settings, the hook slots attached to a session, and
//! TOML file loading.

mod hooks;
mod manager;
mod settings;

pub use hooks::{ConnectHook, PaintHook, PaintUpdate, SessionConfig, SessionHooks};
pub use manager::{parse_settings, render_settings, ConfigManager};
pub use settings::{
    ClientSettings, DEFAULT_PORT, DEFAULT_WAIT_TIMEOUT_MS, MAX_EVENT_SOURCES, MAX_PERIOD_SECS,
    MAX_WAIT_TIMEOUT_MS,
};
