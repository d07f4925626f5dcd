//! Error types for `rdpdrive`
//!
//! This module defines the error types used by the session driver and the
//! settings layer. Every session fault is terminal for the run it occurs in;
//! the driver never retries.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionState;

/// Errors raised while driving a remote session
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend could not allocate a session context
    #[error("Failed to allocate session context: {0}")]
    ContextAllocation(String),

    /// Connection establishment was refused or the server is unreachable
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection establishment did not complete in time
    #[error("Connection timed out")]
    Timeout,

    /// The session reported no waitable event sources while connected
    #[error("Failed to enumerate event sources: {0}")]
    EventEnumeration(String),

    /// The wait primitive itself faulted (a plain timeout is not an error)
    #[error("Wait for event sources failed: {0}")]
    Wait(String),

    /// The session can no longer process events
    #[error("Failed to dispatch session events: {0}")]
    Dispatch(String),

    /// The session exposed more event sources than the configured capacity
    #[error("Event source capacity exceeded: capacity is {capacity}")]
    CapacityExceeded {
        /// Configured capacity of the source set
        capacity: usize,
    },

    /// A lifecycle transition that would move the session backwards
    #[error("Invalid session state transition from {from} to {to}")]
    InvalidTransition {
        /// State before the rejected transition
        from: SessionState,
        /// Requested target state
        to: SessionState,
    },

    /// The worker thread running the session panicked
    #[error("Session worker panicked")]
    WorkerPanicked,
}

impl SessionError {
    /// Returns true for faults raised while establishing the connection
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::Timeout)
    }

    /// Short, stable name of the fault kind, used as a log field
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ContextAllocation(_) => "context_allocation",
            Self::ConnectionFailed(_) | Self::Timeout => "connection",
            Self::EventEnumeration(_) => "event_enumeration",
            Self::Wait(_) => "wait",
            Self::Dispatch(_) => "dispatch",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::WorkerPanicked => "worker_panicked",
        }
    }
}

/// Errors related to client settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a settings file or value
    #[error("Failed to parse settings: {0}")]
    Parse(String),

    /// Invalid settings value
    #[error("Invalid settings value for {field}: {reason}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// The reason for validation failure
        reason: String,
    },

    /// Settings file not found
    #[error("Settings file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read settings file
    #[error("Failed to read settings: {0}")]
    Read(String),

    /// Failed to serialize settings
    #[error("Failed to serialize settings: {0}")]
    Serialize(String),
}

impl ConfigError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Result type alias for settings operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
