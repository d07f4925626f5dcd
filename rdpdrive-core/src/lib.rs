//! `rdpdrive` Core Library
//!
//! This crate provides the session lifecycle driver for the `rdpdrive`
//! remote desktop client: immutable session configuration, the backend
//! trait the driver calls into, the event loop with cooperative
//! cancellation, and a TCP transport backend.

pub mod cancel;
pub mod capabilities;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod session;
pub mod transport;

pub use cancel::CancelToken;
pub use capabilities::{DrawingOrder, GdiFlags, OrderSupport};
pub use config::{
    ClientSettings, ConfigManager, PaintUpdate, SessionConfig, SessionHooks, MAX_EVENT_SOURCES,
};
pub use driver::{DriverHandle, RunSummary, SessionDriver};
pub use error::{ConfigError, ConfigResult, SessionError, SessionResult};
pub use event::{EventSources, WaitStatus};
pub use session::{SessionBackend, SessionLifecycle, SessionState};
pub use transport::{TransportBackend, TransportSession, TransportSource};
