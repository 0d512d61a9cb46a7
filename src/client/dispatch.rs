use std::fmt::Debug;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::ContextState;
use super::RequestContext;
use crate::utils::scoped_timer::ScopedTimer;
use crate::ClientError;
use crate::Error;
use crate::HostRuntime;
use crate::Key;
use crate::ServerError;
use crate::Value;

/// Handle for one in-flight write
///
/// Owns the request context. Consuming it through [`Completion::complete`]
/// runs the dispatcher; [`Completion::abandon`] disposes of a write that was
/// never accepted. A completion dropped without either is dispatched with a
/// `CLIENT_ABORT` error, so every accepted write reports back exactly once.
pub struct Completion {
    context: Option<Box<RequestContext>>,
    host: Arc<HostRuntime>,
}

impl Debug for Completion {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("key", &self.context.as_ref().map(|c| c.key()))
            .field("state", &self.context.as_ref().map(|c| c.state()))
            .finish()
    }
}

impl Completion {
    pub(crate) fn new(
        context: Box<RequestContext>,
        host: Arc<HostRuntime>,
    ) -> Self {
        Self {
            context: Some(context),
            host,
        }
    }

    /// Key the write targets
    pub fn key(&self) -> &Key {
        match &self.context {
            Some(context) => context.key(),
            // Only `None` once consumed, which takes `self`
            None => unreachable!(),
        }
    }

    /// Reports the outcome of the write and releases the request state
    ///
    /// Must be called from a thread that does not hold the host lock.
    pub fn complete(
        mut self,
        outcome: std::result::Result<(), ServerError>,
    ) {
        if let Some(context) = self.context.take() {
            dispatch(&self.host, context, outcome);
        }
    }

    /// Disposes of a write the transport never accepted; nothing is dispatched
    pub(crate) fn abandon(mut self) {
        if let Some(context) = self.context.take() {
            context.destroy(ContextState::Abandoned);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            warn!("completion dropped before the write finished, aborting");
            dispatch(&self.host, context, Err(ServerError::client_abort()));
        }
    }
}

/// Runs on an event-loop thread, once per submitted request
fn dispatch(
    host: &HostRuntime,
    mut context: Box<RequestContext>,
    outcome: std::result::Result<(), ServerError>,
) {
    let _timer = ScopedTimer::new("client::dispatch");
    let mut guard = host.acquire();
    let key = context.key().to_value();

    match outcome {
        Err(server_error) => {
            debug!("write failed: {}", server_error);
            let error = ClientError::from(server_error).with_key(key).with_bin(Value::Nil);
            context.set_error(error.clone());
            guard.raise(error);
        }
        Ok(()) => {
            if let Some(continuation) = context.take_continuation() {
                if let Err(reason) = continuation.call(&mut guard, key.clone()) {
                    warn!("put_async callback failed: {}", reason);
                    let error = ClientError::from(Error::Callback(reason)).with_key(key);
                    context.set_error(error.clone());
                    guard.raise(error);
                }
            }
        }
    }

    // No retry: the context is always released here
    context.destroy(ContextState::Dispatched);
    drop(guard);
}
