//! Host runtime seam
//!
//! The host language runs with a single exclusive execution lock. Code that
//! touches host objects must hold it; code that may block must not. This
//! module models that lock and the two disciplines around it:
//!
//! - [`HostRuntime::acquire`] returns a [`HostGuard`] that releases the lock
//!   when dropped, on every exit path. Completion callbacks running on
//!   event-loop threads hold one for their whole body and lend it to the
//!   caller's continuation.
//! - [`HostGuard::allow_threads`] releases the lock around a closure and
//!   reacquires it afterwards. Transport submission runs inside it.
//!
//! Errors raised on a thread that has no caller to return to (the completion
//! path) go to the runtime's unraised-error channel, handed out once by
//! [`HostRuntime::new`].


use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use parking_lot::MutexGuard;
use tokio::sync::mpsc;
use tracing::warn;

use crate::ClientError;

/// Receiving side of the unraised-error channel
pub type UnraisedErrors = mpsc::UnboundedReceiver<ClientError>;

pub struct HostRuntime {
    lock: Mutex<()>,
    unraised: mpsc::UnboundedSender<ClientError>,
}

impl HostRuntime {
    pub fn new() -> (Arc<Self>, UnraisedErrors) {
        let (unraised, rx) = mpsc::unbounded_channel();
        let runtime = Arc::new(Self {
            lock: Mutex::new(()),
            unraised,
        });
        (runtime, rx)
    }

    /// Blocks until the calling thread holds the host lock
    pub fn acquire(&self) -> HostGuard<'_> {
        HostGuard {
            runtime: self,
            guard: self.lock.lock(),
        }
    }

    pub fn try_acquire_for(
        &self,
        timeout: Duration,
    ) -> Option<HostGuard<'_>> {
        self.lock.try_lock_for(timeout).map(|guard| HostGuard {
            runtime: self,
            guard,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}

/// Proof that the current thread holds the host lock
pub struct HostGuard<'a> {
    runtime: &'a HostRuntime,
    guard: MutexGuard<'a, ()>,
}

impl HostGuard<'_> {
    /// Runs `f` with the host lock released, reacquiring it before returning
    pub fn allow_threads<F, R>(
        &mut self,
        f: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        MutexGuard::unlocked(&mut self.guard, f)
    }

    /// Raises `error` on the host's unraised-error channel
    pub fn raise(
        &self,
        error: ClientError,
    ) {
        if let Err(e) = self.runtime.unraised.send(error) {
            warn!("host error channel closed, dropping error: {}", e.0);
        }
    }

    pub fn runtime(&self) -> &HostRuntime {
        self.runtime
    }
}
