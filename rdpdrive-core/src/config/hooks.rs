//! Session hooks and the immutable session configuration
//!
//! Hooks are attached by value before a session starts. Backends invoke them
//! around connection establishment and around each screen update.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::ClientSettings;

/// Hook invoked before or after connection establishment.
///
/// Returning `false` aborts the connection.
pub type ConnectHook = Arc<dyn Fn(&ClientSettings) -> bool + Send + Sync>;

/// Hook invoked at the start or end of a screen update.
///
/// Returning `false` marks the session as unable to process further events.
pub type PaintHook = Arc<dyn Fn(&PaintUpdate) -> bool + Send + Sync>;

/// Describes one screen update passed to paint hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintUpdate {
    /// Monotonic update counter, starting at 1
    pub sequence: u64,
    /// Number of bytes received for this update
    pub bytes: usize,
}

/// Named hook slots for a session
#[derive(Clone, Default)]
pub struct SessionHooks {
    pub pre_connect: Option<ConnectHook>,
    pub post_connect: Option<ConnectHook>,
    pub begin_paint: Option<PaintHook>,
    pub end_paint: Option<PaintHook>,
}

impl SessionHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pre_connect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ClientSettings) -> bool + Send + Sync + 'static,
    {
        self.pre_connect = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_post_connect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ClientSettings) -> bool + Send + Sync + 'static,
    {
        self.post_connect = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_begin_paint<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PaintUpdate) -> bool + Send + Sync + 'static,
    {
        self.begin_paint = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_end_paint<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PaintUpdate) -> bool + Send + Sync + 'static,
    {
        self.end_paint = Some(Arc::new(hook));
        self
    }

    /// Runs the pre-connect hook; an absent hook always succeeds
    #[must_use]
    pub fn pre_connect(&self, settings: &ClientSettings) -> bool {
        self.pre_connect.as_ref().is_none_or(|hook| hook(settings))
    }

    /// Runs the post-connect hook; an absent hook always succeeds
    #[must_use]
    pub fn post_connect(&self, settings: &ClientSettings) -> bool {
        self.post_connect.as_ref().is_none_or(|hook| hook(settings))
    }

    #[must_use]
    pub fn begin_paint(&self, update: &PaintUpdate) -> bool {
        self.begin_paint.as_ref().is_none_or(|hook| hook(update))
    }

    #[must_use]
    pub fn end_paint(&self, update: &PaintUpdate) -> bool {
        self.end_paint.as_ref().is_none_or(|hook| hook(update))
    }
}

impl fmt::Debug for SessionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHooks")
            .field("pre_connect", &self.pre_connect.is_some())
            .field("post_connect", &self.post_connect.is_some())
            .field("begin_paint", &self.begin_paint.is_some())
            .field("end_paint", &self.end_paint.is_some())
            .finish()
    }
}

/// Complete, immutable configuration for one session run
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub settings: ClientSettings,
    pub hooks: SessionHooks,
}

impl SessionConfig {
    #[must_use]
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            hooks: SessionHooks::default(),
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: SessionHooks) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        self.settings.wait_timeout()
    }

    #[must_use]
    pub const fn source_capacity(&self) -> usize {
        self.settings.max_event_sources
    }
}
