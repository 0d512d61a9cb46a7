use std::sync::Arc;
use std::time::Duration;

use kvbind::Client;
use kvbind::ClientConfig;
use kvbind::ClientError;
use kvbind::HostGuard;
use kvbind::HostRuntime;
use kvbind::MemoryTransport;
use kvbind::UnraisedErrors;
use kvbind::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const WAIT_FOR_COMPLETION_IN_SEC: u64 = 5;

pub struct TestClient {
    pub client: Client,
    pub host: Arc<HostRuntime>,
    pub transport: Arc<MemoryTransport>,
    pub unraised: UnraisedErrors,
}

pub fn connected_client(config: ClientConfig) -> TestClient {
    connected_client_with_transport(config.clone(), MemoryTransport::new(&config.event_loop).unwrap())
}

pub fn connected_client_with_transport(
    config: ClientConfig,
    transport: MemoryTransport,
) -> TestClient {
    let (host, unraised) = HostRuntime::new();
    let transport = Arc::new(transport);
    let client = Client::builder(host.clone())
        .set_config(config)
        .transport(transport.clone())
        .build()
        .unwrap();
    client.connect().unwrap();

    TestClient {
        client,
        host,
        transport,
        unraised,
    }
}

pub fn key(name: &str) -> Value {
    Value::map([
        ("ns", Value::from("test")),
        ("set", Value::from("demo")),
        ("key", Value::from(name)),
    ])
}

/// Continuation forwarding the translated key to a channel
pub fn forward_to(
    tx: mpsc::UnboundedSender<Value>
) -> impl FnOnce(&mut HostGuard<'_>, Value) -> Result<(), String> + Send + 'static {
    move |_: &mut HostGuard<'_>, key: Value| tx.send(key).map_err(|e| e.to_string())
}

pub async fn next_key(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    timeout(Duration::from_secs(WAIT_FOR_COMPLETION_IN_SEC), rx.recv())
        .await
        .expect("completion timed out")
        .expect("continuation channel closed")
}

pub async fn next_error(unraised: &mut UnraisedErrors) -> ClientError {
    timeout(Duration::from_secs(WAIT_FOR_COMPLETION_IN_SEC), unraised.recv())
        .await
        .expect("no error raised in time")
        .expect("error channel closed")
}
