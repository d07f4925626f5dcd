//! Session connectivity state
//!
//! Transitions only move forward:
//! `NotConnected -> Connecting -> Connected -> Disconnecting -> Disconnected`,
//! with `Failed` reachable from `Connecting` or `Connected` and always
//! leading to `Disconnecting`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SessionError, SessionResult};

/// Represents the connectivity state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// Context allocated, connection not attempted yet
    #[default]
    NotConnected,
    /// Connection attempt in progress
    Connecting,
    /// Connected and running the event loop
    Connected,
    /// Connection attempt or event loop faulted
    Failed,
    /// Teardown in progress
    Disconnecting,
    /// Terminal state
    Disconnected,
}

impl SessionState {
    /// Returns true if `next` is a legal successor of this state
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotConnected, Self::Connecting)
                | (Self::Connecting, Self::Connected | Self::Failed)
                | (Self::Connected, Self::Failed | Self::Disconnecting)
                | (Self::Failed, Self::Disconnecting)
                | (Self::NotConnected | Self::Disconnecting, Self::Disconnected)
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "NotConnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Failed => write!(f, "Failed"),
            Self::Disconnecting => write!(f, "Disconnecting"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Tracks the state of one session and records every transition
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    history: Vec<SessionState>,
    reached_connected: bool,
}

impl SessionLifecycle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            history: vec![SessionState::NotConnected],
            reached_connected: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.history
            .last()
            .copied()
            .unwrap_or(SessionState::NotConnected)
    }

    /// Every state the session has been in, oldest first
    #[must_use]
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// True once the session has been `Connected`, even if it later failed
    #[must_use]
    pub const fn reached_connected(&self) -> bool {
        self.reached_connected
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` if `next` is not a legal
    /// successor; the state is left unchanged.
    pub fn transition(&mut self, next: SessionState) -> SessionResult<()> {
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: current,
                to: next,
            });
        }
        tracing::debug!(from = %current, to = %next, "Session state transition");
        if next == SessionState::Connected {
            self.reached_connected = true;
        }
        self.history.push(next);
        Ok(())
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
