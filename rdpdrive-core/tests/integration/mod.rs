//! Integration tests for the TCP transport backend
//!
//! These tests verify connection establishment, hook invocation and teardown
//! of sessions driven against a local listener.

pub mod transport_tests;
