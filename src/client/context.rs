//! Per-request state that outlives the issuing call
//!
//! A [`RequestContext`] is owned by exactly one party at a time: the
//! orchestrator until the transport accepts the write, then the
//! [`Completion`](super::Completion) travelling with the in-flight operation.
//! It is destroyed on exactly one terminal transition.

use std::fmt::Display;

use tracing::trace;

use crate::ClientError;
use crate::HostGuard;
use crate::Key;
use crate::Value;

/// Callback invoked with the translated key once a write commits
///
/// Any `FnOnce(&mut HostGuard<'_>, Value) -> Result<(), E>` closure is a
/// continuation. It runs on an event-loop thread holding the host lock, and
/// the guard it receives is the one the dispatcher holds, so the callback can
/// issue further client calls such as [`Client::put_async`](super::Client::put_async).
/// An `Err` is reported as a client-side failure of the callback itself.
pub trait Continuation: Send + 'static {
    fn call(
        self: Box<Self>,
        guard: &mut HostGuard<'_>,
        key: Value,
    ) -> std::result::Result<(), String>;
}

impl<F, E> Continuation for F
where
    F: FnOnce(&mut HostGuard<'_>, Value) -> std::result::Result<(), E> + Send + 'static,
    E: Display,
{
    fn call(
        self: Box<Self>,
        guard: &mut HostGuard<'_>,
        key: Value,
    ) -> std::result::Result<(), String> {
        (*self)(guard, key).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Created,
    /// Handed to the transport
    Submitted,
    /// Completion ran
    Dispatched,
    /// Rejected synchronously before the transport accepted it
    Abandoned,
}

impl ContextState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ContextState::Dispatched | ContextState::Abandoned)
    }
}

pub struct RequestContext {
    key: Key,
    error: Option<ClientError>,
    continuation: Option<Box<dyn Continuation>>,
    /// Id of the issuing client, informational only
    owner: u32,
    state: ContextState,
}

impl RequestContext {
    /// Boxed so ownership moves between orchestrator and completion without
    /// copying. An allocation failure aborts the process.
    pub(crate) fn create(
        key: Key,
        continuation: Box<dyn Continuation>,
        owner: u32,
    ) -> Box<Self> {
        Box::new(Self {
            key,
            error: None,
            continuation: Some(continuation),
            owner,
            state: ContextState::Created,
        })
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    pub(crate) fn set_error(
        &mut self,
        error: ClientError,
    ) {
        self.error = Some(error);
    }

    pub(crate) fn take_continuation(&mut self) -> Option<Box<dyn Continuation>> {
        self.continuation.take()
    }

    pub fn owner(&self) -> u32 {
        self.owner
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub(crate) fn mark_submitted(&mut self) {
        debug_assert_eq!(self.state, ContextState::Created);
        self.state = ContextState::Submitted;
    }

    /// Releases the key, then the context itself
    ///
    /// Consuming the box makes a second destroy impossible.
    pub(crate) fn destroy(
        self: Box<Self>,
        terminal: ContextState,
    ) {
        debug_assert!(terminal.is_terminal());
        let RequestContext {
            key,
            error,
            continuation,
            owner,
            state,
        } = *self;

        trace!(
            "destroying request context: client={}, ns={}, {:?} -> {:?}, error={}",
            owner,
            key.namespace(),
            state,
            terminal,
            error.is_some()
        );
        drop(key);
        drop(continuation);
    }
}
