//! Event sources and wait results
//!
//! A session exposes opaque waitable sources (socket readiness, timers).
//! The driver collects one snapshot of them per loop iteration into a
//! capacity-checked set and waits on that snapshot.

use crate::error::{SessionError, SessionResult};

/// Fixed-capacity set of event sources collected for one wait
#[derive(Debug, Clone)]
pub struct EventSources<S> {
    sources: Vec<S>,
    capacity: usize,
}

impl<S> EventSources<S> {
    /// Creates an empty set that accepts at most `capacity` sources
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sources: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds a source.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::CapacityExceeded` when the set is full; the
    /// source is not added and nothing already in the set is dropped.
    pub fn push(&mut self, source: S) -> SessionResult<()> {
        if self.sources.len() >= self.capacity {
            return Err(SessionError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.sources.push(source);
        Ok(())
    }

    /// Removes all sources, keeping the capacity
    pub fn clear(&mut self) {
        self.sources.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&S> {
        self.sources.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[S] {
        &self.sources
    }
}

impl<S: PartialEq> EventSources<S> {
    /// Index of the first occurrence of `source`
    #[must_use]
    pub fn position(&self, source: &S) -> Option<usize> {
        self.sources.iter().position(|s| s == source)
    }
}

/// Result of a wait on an event source snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// The source at this index in the snapshot became ready
    Ready(usize),
    /// No source became ready before the timeout elapsed
    TimedOut,
}

impl WaitStatus {
    #[must_use]
    pub const fn is_timeout(self) -> bool {
        matches!(self, Self::TimedOut)
    }
}
