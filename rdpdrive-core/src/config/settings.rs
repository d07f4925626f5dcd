//! Client settings
//!
//! Connection parameters and capability flags, fully populated before a
//! session starts and never mutated while it runs.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capabilities::{GdiFlags, OrderSupport};
use crate::error::{ConfigError, ConfigResult};

/// Default RDP port
pub const DEFAULT_PORT: u16 = 3389;

/// Default upper bound on how long one wait for event sources may block
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 100;

/// Maximum number of event sources a session may expose
pub const MAX_EVENT_SOURCES: usize = 64;

/// Upper bound for the connect timeout and the keepalive period, in seconds
pub const MAX_PERIOD_SECS: u64 = 24 * 60 * 60;

/// Upper bound for a single wait on event sources, in milliseconds
pub const MAX_WAIT_TIMEOUT_MS: u64 = 60 * 60 * 1000;

/// Settings for one remote desktop session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Target hostname or IP address
    pub host: String,

    /// Target port (default: 3389)
    pub port: u16,

    /// Username for authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for authentication (runtime only, never serialized)
    #[serde(skip)]
    pub password: Option<SecretString>,

    /// Domain for authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Desktop width
    pub width: u16,

    /// Desktop height
    pub height: u16,

    /// Color depth (8, 15, 16, 24 or 32)
    pub color_depth: u8,

    /// Connection timeout in seconds
    pub timeout_secs: u64,

    /// Upper bound for a single wait on event sources, in milliseconds
    pub wait_timeout_ms: u64,

    /// Capacity of the per-iteration event source set
    pub max_event_sources: usize,

    /// Keepalive timer period in seconds (0 disables the timer source)
    pub keepalive_secs: u64,

    /// Client name announced to the server
    pub client_name: String,

    /// Drawing orders advertised as supported
    pub order_support: OrderSupport,

    /// GDI color conversion flags
    pub gdi: GdiFlags,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            domain: None,
            width: 1024,
            height: 768,
            color_depth: 32,
            timeout_secs: 30,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            max_event_sources: MAX_EVENT_SOURCES,
            keepalive_secs: 60,
            client_name: default_client_name(),
            order_support: OrderSupport::default(),
            gdi: GdiFlags::default(),
        }
    }
}

impl PartialEq for ClientSettings {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
            && self.port == other.port
            && self.username == other.username
            && self.domain == other.domain
            && self.width == other.width
            && self.height == other.height
            && self.color_depth == other.color_depth
            && self.timeout_secs == other.timeout_secs
            && self.wait_timeout_ms == other.wait_timeout_ms
            && self.max_event_sources == other.max_event_sources
            && self.keepalive_secs == other.keepalive_secs
            && self.client_name == other.client_name
            && self.order_support == other.order_support
            && self.gdi == other.gdi
        // password is runtime-only and excluded
    }
}

/// Local hostname, or a fixed name when it cannot be read
fn default_client_name() -> String {
    hostname::get().map_or_else(
        |_| "rdpdrive".to_string(),
        |h| h.to_string_lossy().into_owned(),
    )
}

impl ClientSettings {
    /// Creates settings for the specified host
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub const fn with_resolution(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub const fn with_color_depth(mut self, depth: u8) -> Self {
        self.color_depth = depth;
        self
    }

    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    #[must_use]
    pub const fn with_wait_timeout_ms(mut self, millis: u64) -> Self {
        self.wait_timeout_ms = millis;
        self
    }

    #[must_use]
    pub const fn with_max_event_sources(mut self, capacity: usize) -> Self {
        self.max_event_sources = capacity;
        self
    }

    #[must_use]
    pub const fn with_keepalive_secs(mut self, secs: u64) -> Self {
        self.keepalive_secs = secs;
        self
    }

    #[must_use]
    pub const fn with_order_support(mut self, support: OrderSupport) -> Self {
        self.order_support = support;
        self
    }

    /// Returns the server address as "host:port"
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Keepalive period, `None` when the timer is disabled
    #[must_use]
    pub const fn keepalive(&self) -> Option<Duration> {
        if self.keepalive_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.keepalive_secs))
        }
    }

    /// Checks that the settings describe a session that can be started
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::validation("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(ConfigError::validation("port", "must not be zero"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::validation(
                "resolution",
                format!("{}x{} has a zero dimension", self.width, self.height),
            ));
        }
        if !matches!(self.color_depth, 8 | 15 | 16 | 24 | 32) {
            return Err(ConfigError::validation(
                "color_depth",
                format!("unsupported depth {}", self.color_depth),
            ));
        }
        if self.timeout_secs == 0 || self.timeout_secs > MAX_PERIOD_SECS {
            return Err(ConfigError::validation(
                "timeout_secs",
                format!("must be between 1 and {MAX_PERIOD_SECS}"),
            ));
        }
        if self.wait_timeout_ms == 0 || self.wait_timeout_ms > MAX_WAIT_TIMEOUT_MS {
            return Err(ConfigError::validation(
                "wait_timeout_ms",
                format!("must be between 1 and {MAX_WAIT_TIMEOUT_MS}"),
            ));
        }
        if self.keepalive_secs > MAX_PERIOD_SECS {
            return Err(ConfigError::validation(
                "keepalive_secs",
                format!("must be at most {MAX_PERIOD_SECS} (0 disables it)"),
            ));
        }
        if self.max_event_sources == 0 || self.max_event_sources > MAX_EVENT_SOURCES {
            return Err(ConfigError::validation(
                "max_event_sources",
                format!("must be between 1 and {MAX_EVENT_SOURCES}"),
            ));
        }
        Ok(())
    }
}
