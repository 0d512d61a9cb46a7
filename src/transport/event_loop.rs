use std::future::Future;

use config::ConfigError;
use tokio::runtime::Builder;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::Error;
use crate::EventLoopConfig;
use crate::Result;

/// Thread pool that runs transport work and completions
///
/// Completions dispatched from here run on threads named `event-loop`, never
/// on the thread that submitted the request.
pub struct EventLoop {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl EventLoop {
    pub fn new(config: &EventLoopConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name("event-loop")
            .enable_time()
            .build()
            .map_err(|e| Error::Config(ConfigError::Message(format!("failed to start event loop: {e}"))))?;
        debug!("event loop started with {} worker(s)", config.worker_threads);

        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    pub fn spawn<F>(
        &self,
        task: F,
    ) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(task)
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // Dropping a runtime blocks, which panics inside async contexts.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
