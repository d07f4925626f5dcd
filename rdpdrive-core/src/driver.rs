//! Session driver
//!
//! Runs exactly one session end to end:
//!
//! 1. allocate a context and connect,
//! 2. loop: collect event sources, wait (bounded by the wait timeout),
//!    check the disconnect signal, dispatch,
//! 3. tear down: disconnect once if the session ever connected, then
//!    release the context exactly once.
//!
//! The driver can run inline via [`SessionDriver::run`] or on a dedicated
//! worker thread via [`SessionDriver::spawn`]. Cancellation is cooperative
//! through a [`CancelToken`]; the loop observes it within one wait timeout
//! plus one dispatch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::thread::JoinHandle;
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::event::{EventSources, WaitStatus};
use crate::session::{SessionBackend, SessionLifecycle, SessionState};

/// Name given to the session worker thread
pub const WORKER_THREAD_NAME: &str = "rdpdrive-session";

/// Statistics of a session that ended without a fault
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Identifier assigned to this run, used in log spans
    pub session_id: Uuid,
    /// Server address as "host:port"
    pub server: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Loop iterations that enumerated event sources
    pub iterations: u64,
    /// Successful dispatch calls
    pub dispatches: u64,
    /// Waits that ended without a ready source
    pub timeouts: u64,
    /// Every state the session passed through
    pub states: Vec<SessionState>,
}

impl RunSummary {
    /// Wall-clock duration of the run
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }

    #[must_use]
    pub fn final_state(&self) -> SessionState {
        self.states.last().copied().unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct LoopStats {
    iterations: u64,
    dispatches: u64,
    timeouts: u64,
}

/// Drives one session of backend `B` from connect through teardown
pub struct SessionDriver<B: SessionBackend> {
    backend: B,
    cancel: CancelToken,
    last_history: Vec<SessionState>,
}

impl<B: SessionBackend> SessionDriver<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_cancel_token(backend, CancelToken::new())
    }

    /// Creates a driver that observes an existing cancellation token
    #[must_use]
    pub const fn with_cancel_token(backend: B, cancel: CancelToken) -> Self {
        Self {
            backend,
            cancel,
            last_history: Vec::new(),
        }
    }

    /// Returns a token that requests a graceful disconnect when cancelled
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// States passed through by the most recent run, whatever its outcome
    #[must_use]
    pub fn last_history(&self) -> &[SessionState] {
        &self.last_history
    }

    #[must_use]
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Runs the session to completion on the calling thread.
    ///
    /// Teardown always runs once a context exists, whatever ended the run.
    ///
    /// # Errors
    ///
    /// Returns the first fault: `ContextAllocation`, `ConnectionFailed`,
    /// `Timeout`, `EventEnumeration`, `CapacityExceeded`, `Wait` or `Dispatch`.
    pub fn run(&mut self, config: &SessionConfig) -> SessionResult<RunSummary> {
        let session_id = Uuid::new_v4();
        let server = config.settings.server_address();
        let span = tracing::info_span!("session", id = %session_id, server = %server);
        let _entered = span.enter();

        let started_at = Utc::now();
        let mut lifecycle = SessionLifecycle::new();

        let mut session = match self.backend.create_context(config) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(kind = e.kind(), "Couldn't create session context: {e}");
                self.last_history = lifecycle.history().to_vec();
                return Err(e);
            }
        };

        let mut stats = LoopStats::default();
        let outcome = self.connect_and_run(config, &mut session, &mut lifecycle, &mut stats);

        if let Err(e) = &outcome {
            report_fault(e);
        }

        self.teardown(session, &mut lifecycle);
        self.last_history = lifecycle.history().to_vec();

        tracing::info!(
            iterations = stats.iterations,
            dispatches = stats.dispatches,
            timeouts = stats.timeouts,
            "Session ended"
        );

        outcome.map(|()| RunSummary {
            session_id,
            server,
            started_at,
            ended_at: Utc::now(),
            iterations: stats.iterations,
            dispatches: stats.dispatches,
            timeouts: stats.timeouts,
            states: self.last_history.clone(),
        })
    }

    fn connect_and_run(
        &mut self,
        config: &SessionConfig,
        session: &mut B::Session,
        lifecycle: &mut SessionLifecycle,
        stats: &mut LoopStats,
    ) -> SessionResult<()> {
        if self.cancel.is_cancelled() {
            tracing::info!("Disconnect requested before connecting");
            return Ok(());
        }

        lifecycle.transition(SessionState::Connecting)?;
        tracing::info!("Connecting");
        if let Err(e) = self.backend.connect(session) {
            lifecycle.transition(SessionState::Failed)?;
            return Err(e);
        }

        lifecycle.transition(SessionState::Connected)?;
        tracing::info!("Connected");

        if let Err(e) = self.event_loop(config, session, stats) {
            lifecycle.transition(SessionState::Failed)?;
            return Err(e);
        }
        Ok(())
    }

    fn event_loop(
        &mut self,
        config: &SessionConfig,
        session: &mut B::Session,
        stats: &mut LoopStats,
    ) -> SessionResult<()> {
        let timeout = config.wait_timeout();
        let mut sources = EventSources::with_capacity(config.source_capacity());

        while !self.shall_disconnect(session) {
            stats.iterations += 1;

            // One snapshot of sources per iteration
            sources.clear();
            self.backend.event_sources(session, &mut sources)?;
            if sources.is_empty() {
                return Err(SessionError::EventEnumeration(
                    "session reported no event sources".to_string(),
                ));
            }

            match self.backend.wait_any(session, &sources, timeout)? {
                WaitStatus::Ready(index) => {
                    tracing::trace!(index, count = sources.len(), "Event source ready");
                }
                WaitStatus::TimedOut => {
                    stats.timeouts += 1;
                    tracing::trace!(count = sources.len(), "Wait timed out");
                }
            }

            if self.shall_disconnect(session) {
                break;
            }

            self.backend.dispatch(session)?;
            stats.dispatches += 1;
        }
        Ok(())
    }

    fn shall_disconnect(&self, session: &B::Session) -> bool {
        if self.cancel.is_cancelled() {
            tracing::debug!("Disconnect requested by caller");
            return true;
        }
        if self.backend.shall_disconnect(session) {
            tracing::debug!("Disconnect requested by session");
            return true;
        }
        false
    }

    fn teardown(&mut self, mut session: B::Session, lifecycle: &mut SessionLifecycle) {
        if lifecycle.state() != SessionState::NotConnected {
            advance(lifecycle, SessionState::Disconnecting);
        }

        if lifecycle.reached_connected() {
            tracing::info!("Disconnecting");
            self.backend.disconnect(&mut session);
        }
        self.backend.release_context(session);

        advance(lifecycle, SessionState::Disconnected);
    }
}

impl<B> SessionDriver<B>
where
    B: SessionBackend + Send + 'static,
{
    /// Runs the session on a dedicated worker thread.
    ///
    /// The returned handle can request disconnect and join the worker.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ContextAllocation` if the thread cannot be spawned.
    pub fn spawn(mut self, config: SessionConfig) -> SessionResult<DriverHandle> {
        let cancel = self.cancel.clone();
        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || self.run(&config))
            .map_err(|e| {
                SessionError::ContextAllocation(format!("Failed to spawn session worker: {e}"))
            })?;

        Ok(DriverHandle {
            thread: Some(thread),
            cancel,
        })
    }
}

/// Transition used during teardown, where a rejected transition is only logged
fn advance(lifecycle: &mut SessionLifecycle, next: SessionState) {
    if let Err(e) = lifecycle.transition(next) {
        tracing::warn!("{e}");
    }
}

fn report_fault(error: &SessionError) {
    match error {
        SessionError::ConnectionFailed(_) | SessionError::Timeout => {
            tracing::error!(kind = error.kind(), "Connection failure: {error}");
        }
        SessionError::EventEnumeration(_) => {
            tracing::error!(kind = error.kind(), "Failed to get event sources: {error}");
        }
        SessionError::Wait(_) => {
            tracing::error!(kind = error.kind(), "Waiting on event sources failed: {error}");
        }
        SessionError::Dispatch(_) => {
            tracing::error!(kind = error.kind(), "Failed to check event sources: {error}");
        }
        _ => tracing::error!(kind = error.kind(), "Session fault: {error}"),
    }
}

/// Handle to a session running on its worker thread
///
/// Dropping the handle requests disconnect and joins the worker.
pub struct DriverHandle {
    thread: Option<JoinHandle<SessionResult<RunSummary>>>,
    cancel: CancelToken,
}

impl DriverHandle {
    /// Requests a graceful disconnect
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Returns true once the worker thread has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits, without a bound, for the worker to finish.
    ///
    /// # Errors
    ///
    /// Returns the session's fault, or `SessionError::WorkerPanicked`.
    pub fn join(mut self) -> SessionResult<RunSummary> {
        self.join_inner()
    }

    fn join_inner(&mut self) -> SessionResult<RunSummary> {
        let thread = self.thread.take().ok_or(SessionError::WorkerPanicked)?;
        thread.join().map_err(|_| SessionError::WorkerPanicked)?
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
            let _ = self.join_inner();
        }
    }
}
