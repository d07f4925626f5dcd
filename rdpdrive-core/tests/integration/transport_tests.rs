//! Transport backend sessions against a loopback listener

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use rdpdrive_core::{
    ClientSettings, SessionConfig, SessionDriver, SessionError, SessionHooks, SessionState,
    TransportBackend,
};

fn local_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn loopback_settings(port: u16) -> ClientSettings {
    ClientSettings::new("127.0.0.1")
        .with_port(port)
        .with_timeout_secs(5)
        .with_wait_timeout_ms(20)
        .with_keepalive_secs(0)
}

/// Accepts one client, writes `payload`, then closes the connection
fn serve_once(listener: TcpListener, payload: Vec<u8>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(&payload).unwrap();
        stream.flush().unwrap();
    })
}

// ============================================================================
// Connection establishment
// ============================================================================

#[test]
fn test_refused_connection_is_connection_failure() {
    let (listener, port) = local_listener();
    drop(listener);

    let mut driver = SessionDriver::new(TransportBackend::new());
    let err = driver
        .run(&SessionConfig::new(loopback_settings(port)))
        .unwrap_err();

    assert!(matches!(err, SessionError::ConnectionFailed(_)), "{err:?}");
    assert!(err.is_connection_error());
}

#[test]
fn test_rejecting_pre_connect_hook_prevents_connection() {
    let (listener, port) = local_listener();
    listener.set_nonblocking(true).unwrap();

    let post_connect_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&post_connect_calls);
    let hooks = SessionHooks::new()
        .with_pre_connect(|_| false)
        .with_post_connect(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            true
        });

    let config = SessionConfig::new(loopback_settings(port)).with_hooks(hooks);
    let err = SessionDriver::new(TransportBackend::new())
        .run(&config)
        .unwrap_err();

    assert!(matches!(err, SessionError::ConnectionFailed(_)));
    assert_eq!(post_connect_calls.load(Ordering::SeqCst), 0);
    assert!(listener.accept().is_err());
}

#[test]
fn test_pre_connect_sees_configured_settings() {
    let (listener, port) = local_listener();
    let server = serve_once(listener, Vec::new());

    let seen_port = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&seen_port);
    let hooks = SessionHooks::new().with_pre_connect(move |settings| {
        seen.store(usize::from(settings.port), Ordering::SeqCst);
        true
    });

    let config = SessionConfig::new(loopback_settings(port)).with_hooks(hooks);
    SessionDriver::new(TransportBackend::new())
        .run(&config)
        .unwrap();
    server.join().unwrap();

    assert_eq!(seen_port.load(Ordering::SeqCst), usize::from(port));
}

// ============================================================================
// Active sessions
// ============================================================================

#[test]
fn test_server_close_ends_session_cleanly() {
    let (listener, port) = local_listener();
    let payload = vec![0xAB; 4096];
    let server = serve_once(listener, payload.clone());

    let painted = Arc::new(AtomicU64::new(0));
    let begun = Arc::new(AtomicU64::new(0));
    let painted_hook = Arc::clone(&painted);
    let begun_hook = Arc::clone(&begun);
    let hooks = SessionHooks::new()
        .with_begin_paint(move |update| {
            begun_hook.fetch_add(1, Ordering::SeqCst);
            update.bytes > 0
        })
        .with_end_paint(move |update| {
            painted_hook.fetch_add(update.bytes as u64, Ordering::SeqCst);
            true
        });

    let config = SessionConfig::new(loopback_settings(port)).with_hooks(hooks);
    let summary = SessionDriver::new(TransportBackend::new())
        .run(&config)
        .unwrap();
    server.join().unwrap();

    assert_eq!(painted.load(Ordering::SeqCst), payload.len() as u64);
    assert!(begun.load(Ordering::SeqCst) >= 1);
    assert_eq!(summary.final_state(), SessionState::Disconnected);
    assert!(summary.states.contains(&SessionState::Connected));
    assert!(!summary.states.contains(&SessionState::Failed));
}

#[test]
fn test_failing_end_paint_hook_fails_session() {
    let (listener, port) = local_listener();
    let server = serve_once(listener, b"update".to_vec());

    let hooks = SessionHooks::new().with_end_paint(|_| false);
    let config = SessionConfig::new(loopback_settings(port)).with_hooks(hooks);
    let err = SessionDriver::new(TransportBackend::new())
        .run(&config)
        .unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, SessionError::Dispatch(_)), "{err:?}");
}

#[test]
fn test_cancelled_worker_disconnects_idle_session() {
    let (listener, port) = local_listener();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        // Hold the connection open without sending anything
        let _ = release_rx.recv_timeout(Duration::from_secs(10));
        drop(stream);
    });

    let handle = SessionDriver::new(TransportBackend::new())
        .spawn(SessionConfig::new(loopback_settings(port)))
        .unwrap();

    thread::sleep(Duration::from_millis(150));
    assert!(!handle.is_finished());

    handle.cancel();
    let summary = handle.join().unwrap();
    release_tx.send(()).ok();
    server.join().unwrap();

    assert!(summary.timeouts >= 1);
    assert_eq!(
        summary.states,
        vec![
            SessionState::NotConnected,
            SessionState::Connecting,
            SessionState::Connected,
            SessionState::Disconnecting,
            SessionState::Disconnected,
        ]
    );
}

#[test]
fn test_keepalive_source_wakes_idle_loop() {
    let (listener, port) = local_listener();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let _ = release_rx.recv_timeout(Duration::from_secs(10));
        drop(stream);
    });

    let settings = loopback_settings(port)
        .with_wait_timeout_ms(5_000)
        .with_keepalive_secs(1);
    let handle = SessionDriver::new(TransportBackend::new())
        .spawn(SessionConfig::new(settings))
        .unwrap();

    thread::sleep(Duration::from_millis(1_500));
    handle.cancel();
    let summary = handle.join().unwrap();
    release_tx.send(()).ok();
    server.join().unwrap();

    assert!(summary.dispatches >= 1);
    assert_eq!(summary.timeouts, 0);
}

#[test]
fn test_unschedulable_keepalive_fails_connect_and_releases_socket() {
    let (listener, port) = local_listener();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        // EOF once the client context has been released
        let mut buf = [0u8; 16];
        stream.read(&mut buf).unwrap()
    });

    let settings = loopback_settings(port).with_keepalive_secs(u64::MAX);
    let handle = SessionDriver::new(TransportBackend::new())
        .spawn(SessionConfig::new(settings))
        .unwrap();
    let err = handle.join().unwrap_err();

    assert!(matches!(err, SessionError::ConnectionFailed(_)), "{err:?}");
    assert_eq!(server.join().unwrap(), 0);
}
