//! Configuration management for the client binding.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH` or an explicit override file)
//! - Environment variable overrides (`KVBIND__` prefix, highest priority)
mod cluster;
mod event_loop;
pub use cluster::*;
pub use event_loop::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;
use crate::Serializer;
use crate::WritePolicy;

/// Default policies applied when a call leaves fields unset
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PoliciesConfig {
    #[serde(default)]
    pub write: WritePolicy,
}

/// Main configuration container for a client
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ClientConfig {
    /// Seed hosts and connection parameters
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Completion thread pool
    #[serde(default)]
    pub event_loop: EventLoopConfig,
    /// Default policies
    #[serde(default)]
    pub policies: PoliciesConfig,
    /// Serializer used by calls that do not pick one
    #[serde(default)]
    pub serializer: Serializer,
}

impl Debug for ClientConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("cluster", &self.cluster)
            .field("event_loop", &self.event_loop)
            .finish()
    }
}

impl ClientConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `KVBIND__` prefix (highest priority)
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("KVBIND__EVENT_LOOP__WORKER_THREADS", "4");
    /// let cfg = ClientConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.cluster.validate()?;
        self.event_loop.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("KVBIND")
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
