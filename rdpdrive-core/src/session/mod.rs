//! Session lifecycle types
//!
//! This module defines the connectivity state machine and the backend trait
//! that the session driver calls into.

mod backend;
mod state;

pub use backend::SessionBackend;
pub use state::{SessionLifecycle, SessionState};
