use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use super::Client;
use super::ClientInner;
use crate::utils::time::next_client_id;
use crate::ClientConfig;
use crate::HostRuntime;
use crate::Result;
use crate::Transport;
use crate::UserSerializer;
use crate::Value;

pub struct ClientBuilder {
    config: ClientConfig,
    host: Arc<HostRuntime>,
    transport: Option<Arc<dyn Transport>>,
    user_serializer: Option<UserSerializer>,
}

impl ClientBuilder {
    /// Create a new builder with default config
    pub fn new(host: Arc<HostRuntime>) -> Self {
        Self {
            config: ClientConfig::default(),
            host,
            transport: None,
            user_serializer: None,
        }
    }

    /// Completely replaces the default configuration
    pub fn set_config(
        mut self,
        config: ClientConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Transport the client submits writes to
    ///
    /// A client built without one rejects every call with `PARAM`.
    pub fn transport<T: Transport>(
        mut self,
        transport: Arc<T>,
    ) -> Self {
        self.transport = Some(transport as Arc<dyn Transport>);
        self
    }

    /// Serializer used by calls choosing [`crate::Serializer::User`]
    pub fn user_serializer<F>(
        mut self,
        serializer: F,
    ) -> Self
    where
        F: Fn(&Value) -> std::result::Result<Vec<u8>, String> + Send + Sync + 'static,
    {
        self.user_serializer = Some(Arc::new(serializer));
        self
    }

    /// Build the client with current configuration
    ///
    /// The client starts disconnected; call [`Client::connect`].
    pub fn build(self) -> Result<Client> {
        let config = self.config.validate()?;
        let client_id = next_client_id();
        debug!("building client {}: {:?}", client_id, config);

        let inner = ClientInner {
            transport: self.transport,
            client_id,
            config,
            host: self.host,
            user_serializer: self.user_serializer,
        };
        Ok(Client {
            inner: Arc::new(ArcSwap::from_pointee(inner)),
            connected: Arc::new(AtomicBool::new(false)),
        })
    }
}
