//! Client binding for the asynchronous write path
//!
//! - [`Client`] - connection state and the [`put_async`](Client::put_async)
//!   entry point
//! - [`ClientBuilder`] - wires configuration, transport and host runtime
//! - [`RequestContext`] / [`Completion`] - per-request state and the
//!   dispatcher that reports each write exactly once
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//!
//! use kvbind::{Client, ClientConfig, HostGuard, HostRuntime, MemoryTransport, Value};
//!
//! let config = ClientConfig::new().unwrap().validate().unwrap();
//! let (host, _unraised) = HostRuntime::new();
//! let transport = Arc::new(MemoryTransport::new(&config.event_loop).unwrap());
//!
//! let client = Client::builder(host.clone())
//!     .set_config(config)
//!     .transport(transport)
//!     .build()
//!     .unwrap();
//! client.connect().unwrap();
//!
//! let key = Value::map([("ns", "test".into()), ("set", "demo".into()), ("key", "k1".into())]);
//! let bins = Value::map([("a", Value::from(1))]);
//!
//! let mut guard = host.acquire();
//! client
//!     .put_async(&mut guard, &key, &bins, None, None, None, |_: &mut HostGuard<'_>, key: Value| {
//!         println!("stored {:?}", key);
//!         Ok::<(), String>(())
//!     })
//!     .unwrap();
//! ```

mod builder;
mod context;
mod dispatch;
mod put_async;

pub use builder::*;
pub use context::*;
pub use dispatch::*;


use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::ClientConfig;
use crate::ClientError;
use crate::Error;
use crate::HostRuntime;
use crate::Transport;
use crate::UserSerializer;

/// Handle to one cluster connection
///
/// Clones share the same connection state. Created through
/// [`builder()`](Client::builder).
#[derive(Clone)]
pub struct Client {
    pub(super) inner: Arc<ArcSwap<ClientInner>>,
    pub(super) connected: Arc<AtomicBool>,
}

#[derive(Clone)]
pub struct ClientInner {
    /// `None` once the client is closed
    pub(super) transport: Option<Arc<dyn Transport>>,
    pub(super) client_id: u32,
    pub(super) config: ClientConfig,
    pub(super) host: Arc<HostRuntime>,
    pub(super) user_serializer: Option<UserSerializer>,
}

impl Client {
    /// Create a client builder bound to `host`
    ///
    /// Completions acquire `host`'s lock before calling back into host code.
    pub fn builder(host: Arc<HostRuntime>) -> ClientBuilder {
        ClientBuilder::new(host)
    }

    /// Connects the transport to the configured seed hosts
    pub fn connect(&self) -> std::result::Result<(), ClientError> {
        let inner = self.inner.load();
        let transport = inner
            .transport
            .as_ref()
            .ok_or_else(|| ClientError::from(Error::InvalidClient))?;

        transport.connect(&inner.config.cluster.hosts)?;
        self.connected.store(true, Ordering::Release);
        info!("client {} connected to {:?}", inner.client_id, inner.config.cluster.hosts);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Closes the transport and detaches it from the client
    ///
    /// Writes already accepted still complete. Later calls fail with `PARAM`.
    pub fn close(&self) {
        let old_inner = self.inner.load_full();
        if let Some(transport) = &old_inner.transport {
            transport.close();
        }
        self.connected.store(false, Ordering::Release);

        let mut new_inner = ClientInner::clone(&old_inner);
        new_inner.transport = None;
        self.inner.store(Arc::new(new_inner));
        info!("client {} closed", old_inner.client_id);
    }

    pub fn client_id(&self) -> u32 {
        self.inner.load().client_id
    }

    pub fn config(&self) -> ClientConfig {
        self.inner.load().config.clone()
    }
}
