use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Completion thread pool settings
///
/// ```toml
/// [event_loop]
/// worker_threads = 2
/// max_pending_commands = 5000  # 0 means unbounded
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventLoopConfig {
    /// Threads running completions
    /// Default: 1
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// In-flight writes accepted before submissions are rejected with
    /// `ASYNC_QUEUE_FULL`
    /// Default: 0 (unbounded)
    #[serde(default)]
    pub max_pending_commands: usize,
}

fn default_worker_threads() -> usize {
    1
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            max_pending_commands: 0,
        }
    }
}

impl EventLoopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(Error::Config(ConfigError::Message(
                "event_loop.worker_threads must be greater than 0".to_string(),
            )));
        }
        Ok(())
    }
}
