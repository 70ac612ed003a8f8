//! Injected observation for the protocol stack.
//!
//! Protocol components never call a process-wide logging facility directly;
//! they hold a [`SharedObserver`] handed to them at construction. The
//! default [`TracingObserver`] forwards to `tracing`.

use std::fmt;
use std::sync::Arc;

/// Receives diagnostic events from the transport core.
pub trait Observer: Send + Sync {
    fn trace(&self, _msg: fmt::Arguments<'_>) {}

    fn debug(&self, _msg: fmt::Arguments<'_>) {}

    fn warn(&self, _msg: fmt::Arguments<'_>) {}
}

pub type SharedObserver = Arc<dyn Observer>;

/// Forwards events to the `tracing` facade.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn trace(&self, msg: fmt::Arguments<'_>) {
        tracing::trace!("{}", msg);
    }

    fn debug(&self, msg: fmt::Arguments<'_>) {
        tracing::debug!("{}", msg);
    }

    fn warn(&self, msg: fmt::Arguments<'_>) {
        tracing::warn!("{}", msg);
    }
}

/// Discards every event. Useful in tests.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

pub fn default_observer() -> SharedObserver {
    Arc::new(TracingObserver)
}

pub fn noop_observer() -> SharedObserver {
    Arc::new(NoopObserver)
}
