//! Transport abstraction for the asynchronous write path
//!
//! The binding never talks to the network itself. It hands a converted write
//! to a [`Transport`] together with a [`Completion`]; the transport owns the
//! completion from then on and must call [`Completion::complete`] exactly once,
//! normally from one of its event-loop threads.
//!
//! When a submission is rejected synchronously the transport returns the
//! completion inside [`SubmitError`], so the caller, not the transport,
//! disposes of the request state.
mod event_loop;
mod memory;

pub use event_loop::*;
pub use memory::*;


#[cfg(test)]
use mockall::automock;

use crate::Completion;
use crate::Record;
use crate::ServerError;
use crate::WritePolicy;

/// Synchronous submission failure
///
/// Carries the unsubmitted completion back to the caller.
#[derive(Debug)]
pub struct SubmitError {
    pub error: ServerError,
    pub completion: Completion,
}

impl SubmitError {
    pub fn new(
        error: ServerError,
        completion: Completion,
    ) -> Self {
        Self { error, completion }
    }
}

#[cfg_attr(test, automock)]
pub trait Transport: Send + Sync + 'static {
    /// Establishes the cluster connection from the seed hosts
    ///
    /// # Errors
    /// A [`ServerError`] with [`crate::ResultCode::Cluster`] when no seed host
    /// is usable.
    fn connect(
        &self,
        hosts: &[String],
    ) -> std::result::Result<(), ServerError>;

    /// Queues a write of `record` under the completion's key
    ///
    /// On `Ok(())` the transport owns `completion` and completes it exactly
    /// once. The call may block briefly on internal queues; callers invoke it
    /// with the host lock released.
    ///
    /// # Errors
    /// [`SubmitError`] when the write was not queued; the completion inside
    /// has not been completed.
    fn submit_write(
        &self,
        policy: &WritePolicy,
        record: &Record,
        completion: Completion,
    ) -> std::result::Result<(), SubmitError>;

    /// Drops the cluster connection; later submissions are rejected
    fn close(&self);
}
