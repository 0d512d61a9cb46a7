use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    /// Seed hosts, `host:port`
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,
}

fn default_hosts() -> Vec<String> {
    vec!["127.0.0.1:3000".to_string()]
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "cluster.hosts must list at least one seed host".to_string(),
            )));
        }
        if let Some(bad) = self.hosts.iter().find(|h| h.trim().is_empty()) {
            return Err(Error::Config(ConfigError::Message(format!(
                "cluster.hosts contains an empty entry: {bad:?}"
            ))));
        }
        Ok(())
    }
}
