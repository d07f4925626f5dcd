//! TCP transport backend
//!
//! A [`SessionBackend`] that owns the transport side of a session without
//! decoding the protocol: it connects to the server, exposes socket
//! readiness and a keepalive timer as event sources, and drains received
//! bytes on dispatch, bracketing each non-empty read with the paint hooks.
//!
//! Each session gets its own current-thread Tokio runtime, so the backend
//! must be driven from a thread that is not already inside a runtime.

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use uuid::Uuid;

use crate::config::{ClientSettings, PaintUpdate, SessionConfig, SessionHooks};
use crate::error::{SessionError, SessionResult};
use crate::event::{EventSources, WaitStatus};
use crate::session::SessionBackend;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Upper bound on bytes drained by a single dispatch
const MAX_DRAIN_PER_DISPATCH: usize = 4 * READ_BUFFER_SIZE;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Event sources exposed by a transport session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSource {
    /// The server socket has data (or EOF) to read
    Socket,
    /// The keepalive timer fired
    Keepalive,
}

/// Session context for [`TransportBackend`]
pub struct TransportSession {
    id: Uuid,
    settings: ClientSettings,
    hooks: SessionHooks,
    stream: Option<TcpStream>,
    keepalive: Option<Interval>,
    last_ready: Option<TransportSource>,
    peer_closed: bool,
    updates: u64,
    bytes_received: u64,
    read_buf: Vec<u8>,
    // Dropped last: the stream and timer are registered with this runtime
    runtime: Runtime,
}

impl TransportSession {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Total bytes received from the server
    #[must_use]
    pub const fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Number of screen updates delivered to the paint hooks
    #[must_use]
    pub const fn updates(&self) -> u64 {
        self.updates
    }
}

/// Backend connecting sessions over plain TCP
#[derive(Debug, Default, Clone, Copy)]
pub struct TransportBackend;

impl TransportBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SessionBackend for TransportBackend {
    type Session = TransportSession;
    type Source = TransportSource;

    fn create_context(&mut self, config: &SessionConfig) -> SessionResult<TransportSession> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                SessionError::ContextAllocation(format!("Failed to create Tokio runtime: {e}"))
            })?;

        Ok(TransportSession {
            id: Uuid::new_v4(),
            settings: config.settings.clone(),
            hooks: config.hooks.clone(),
            stream: None,
            keepalive: None,
            last_ready: None,
            peer_closed: false,
            updates: 0,
            bytes_received: 0,
            read_buf: vec![0; READ_BUFFER_SIZE],
            runtime,
        })
    }

    fn connect(&mut self, session: &mut TransportSession) -> SessionResult<()> {
        if !session.hooks.pre_connect(&session.settings) {
            return Err(SessionError::ConnectionFailed(
                "pre-connect hook rejected the connection".to_string(),
            ));
        }

        let server_addr = session.settings.server_address();
        let connect_timeout = session.settings.connect_timeout();
        tracing::debug!(
            %server_addr,
            client_name = %session.settings.client_name,
            orders = session.settings.order_support.enabled().len(),
            gdi_flags = session.settings.gdi.bits(),
            "Opening transport"
        );

        let tcp_result = session.runtime.block_on(async {
            tokio::time::timeout(connect_timeout, TcpStream::connect(&server_addr)).await
        });

        let stream = match tcp_result {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(SessionError::ConnectionFailed(format!(
                    "Failed to connect to {server_addr}: {e}"
                )));
            }
            Err(_) => return Err(SessionError::Timeout),
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!("Failed to set TCP_NODELAY: {e}");
        }
        if let Ok(local_addr) = stream.local_addr() {
            tracing::debug!(%local_addr, "Transport connected");
        }

        session.stream = Some(stream);
        if let Some(period) = session.settings.keepalive() {
            let _guard = session.runtime.enter();
            let start = Instant::now().checked_add(period).ok_or_else(|| {
                SessionError::ConnectionFailed(format!(
                    "keepalive period of {}s is out of range",
                    period.as_secs()
                ))
            })?;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            session.keepalive = Some(interval);
        }

        if !session.hooks.post_connect(&session.settings) {
            return Err(SessionError::ConnectionFailed(
                "post-connect hook failed".to_string(),
            ));
        }
        Ok(())
    }

    fn event_sources(
        &mut self,
        session: &TransportSession,
        sources: &mut EventSources<TransportSource>,
    ) -> SessionResult<()> {
        if session.stream.is_none() {
            return Ok(());
        }
        sources.push(TransportSource::Socket)?;
        if session.keepalive.is_some() {
            sources.push(TransportSource::Keepalive)?;
        }
        Ok(())
    }

    fn wait_any(
        &mut self,
        session: &mut TransportSession,
        sources: &EventSources<TransportSource>,
        timeout: Duration,
    ) -> SessionResult<WaitStatus> {
        let socket_index = sources.position(&TransportSource::Socket);
        let keepalive_index = sources.position(&TransportSource::Keepalive);

        let TransportSession {
            runtime,
            stream,
            keepalive,
            last_ready,
            ..
        } = session;

        let status = runtime.block_on(async {
            tokio::select! {
                result = socket_ready(stream.as_ref()), if socket_index.is_some() => result
                    .map(|()| socket_index.map_or(WaitStatus::TimedOut, WaitStatus::Ready))
                    .map_err(|e| SessionError::Wait(format!("Socket readiness failed: {e}"))),
                () = keepalive_tick(keepalive.as_mut()), if keepalive_index.is_some() => {
                    Ok(keepalive_index.map_or(WaitStatus::TimedOut, WaitStatus::Ready))
                }
                () = tokio::time::sleep(timeout) => Ok(WaitStatus::TimedOut),
            }
        })?;

        *last_ready = match status {
            WaitStatus::Ready(index) => sources.get(index).copied(),
            WaitStatus::TimedOut => None,
        };
        Ok(status)
    }

    fn shall_disconnect(&self, session: &TransportSession) -> bool {
        session.peer_closed
    }

    fn dispatch(&mut self, session: &mut TransportSession) -> SessionResult<()> {
        if session.last_ready.take() == Some(TransportSource::Keepalive) {
            tracing::trace!("Keepalive timer fired");
        }

        let _guard = session.runtime.enter();
        let Some(stream) = session.stream.as_ref() else {
            return Err(SessionError::Dispatch("transport is not connected".to_string()));
        };

        let mut received = 0usize;
        while received < MAX_DRAIN_PER_DISPATCH {
            match stream.try_read(&mut session.read_buf) {
                Ok(0) => {
                    tracing::info!("Server closed the connection");
                    session.peer_closed = true;
                    break;
                }
                Ok(n) => received += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(SessionError::Dispatch(format!("Read error: {e}")));
                }
            }
        }

        if received == 0 {
            return Ok(());
        }

        session.updates += 1;
        session.bytes_received += received as u64;
        let update = PaintUpdate {
            sequence: session.updates,
            bytes: received,
        };

        if !session.hooks.begin_paint(&update) {
            return Err(SessionError::Dispatch("begin_paint hook failed".to_string()));
        }
        if !session.hooks.end_paint(&update) {
            return Err(SessionError::Dispatch("end_paint hook failed".to_string()));
        }
        Ok(())
    }

    fn disconnect(&mut self, session: &mut TransportSession) {
        session.keepalive = None;
        let Some(mut stream) = session.stream.take() else {
            return;
        };

        let result = session
            .runtime
            .block_on(async { tokio::time::timeout(SHUTDOWN_TIMEOUT, stream.shutdown()).await });
        match result {
            Ok(Ok(())) => tracing::debug!("Transport shut down"),
            Ok(Err(e)) => tracing::warn!("Transport shutdown failed: {e}"),
            Err(_) => tracing::warn!("Transport shutdown timed out"),
        }
    }

    fn release_context(&mut self, session: TransportSession) {
        tracing::debug!(
            session = %session.id,
            updates = session.updates,
            bytes = session.bytes_received,
            "Releasing transport context"
        );
        drop(session);
    }
}

async fn socket_ready(stream: Option<&TcpStream>) -> std::io::Result<()> {
    match stream {
        Some(stream) => stream.readable().await,
        None => std::future::pending().await,
    }
}

async fn keepalive_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
