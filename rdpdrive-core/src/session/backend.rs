//! The session-management collaborator driven by [`SessionDriver`]
//!
//! [`SessionDriver`]: crate::driver::SessionDriver

use std::time::Duration;

use crate::config::SessionConfig;
use crate::error::SessionResult;
use crate::event::{EventSources, WaitStatus};

/// Trait for backends that own the protocol side of a session.
///
/// The driver is the only caller and never calls two methods concurrently.
/// It calls `disconnect` at most once per session and `release_context`
/// exactly once per successfully allocated context.
pub trait SessionBackend {
    /// Backend-specific session context
    type Session;

    /// Opaque waitable event source exposed by a session
    type Source;

    /// Allocates a session context from the configuration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ContextAllocation` if the context cannot be created.
    fn create_context(&mut self, config: &SessionConfig) -> SessionResult<Self::Session>;

    /// Establishes the connection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ConnectionFailed` or `SessionError::Timeout`.
    fn connect(&mut self, session: &mut Self::Session) -> SessionResult<()>;

    /// Appends the session's current event sources to `sources`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EventEnumeration` if the sources cannot be
    /// reported, or `SessionError::CapacityExceeded` if they do not fit.
    fn event_sources(
        &mut self,
        session: &Self::Session,
        sources: &mut EventSources<Self::Source>,
    ) -> SessionResult<()>;

    /// Blocks until a source in `sources` is ready or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Wait` only if the wait mechanism itself fails.
    fn wait_any(
        &mut self,
        session: &mut Self::Session,
        sources: &EventSources<Self::Source>,
        timeout: Duration,
    ) -> SessionResult<WaitStatus>;

    /// Returns true if the session itself wants to end (e.g. server closed it)
    fn shall_disconnect(&self, session: &Self::Session) -> bool;

    /// Advances session processing for whatever became ready.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Dispatch` if the session can no longer process events.
    fn dispatch(&mut self, session: &mut Self::Session) -> SessionResult<()>;

    /// Disconnects the session. Best effort; failures are only logged.
    fn disconnect(&mut self, session: &mut Self::Session);

    /// Releases the session context.
    fn release_context(&mut self, session: Self::Session);
}
