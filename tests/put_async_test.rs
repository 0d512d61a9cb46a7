mod common;

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kvbind::convert_partition_filter;
use kvbind::BinValue;
use kvbind::ClientConfig;
use kvbind::ErrorKind;
use kvbind::EventLoopConfig;
use kvbind::HostGuard;
use kvbind::Key;
use kvbind::MemoryTransport;
use kvbind::PartitionFilter;
use kvbind::ResultCode;
use kvbind::UserKey;
use kvbind::Value;
use tokio::sync::mpsc;
use tracing_test::traced_test;

use crate::common::connected_client;
use crate::common::connected_client_with_transport;
use crate::common::forward_to;
use crate::common::key;
use crate::common::next_error;
use crate::common::next_key;
use crate::common::TestClient;

fn stored_key(name: &str) -> Key {
    Key::new("test", Some("demo".to_string()), UserKey::Str(name.to_string())).unwrap()
}

#[tokio::test]
#[traced_test]
async fn accepted_put_calls_continuation_with_key() {
    let mut ctx = connected_client(ClientConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let bins = Value::map([("a", Value::from(1))]);

    {
        let mut guard = ctx.host.acquire();
        ctx.client
            .put_async(&mut guard, &key("k1"), &bins, None, None, None, forward_to(tx))
            .unwrap();
    }

    assert_eq!(next_key(&mut rx).await, key("k1"));
    assert!(rx.recv().await.is_none());
    assert!(ctx.unraised.try_recv().is_err());

    let stored = ctx.transport.get(&stored_key("k1")).unwrap();
    assert_eq!(stored.bin("a"), Some(&BinValue::Int(1)));
    assert_eq!(stored.generation, 1);
}

#[tokio::test]
async fn unconnected_client_fails_with_cluster_error() {
    let config = ClientConfig::default();
    let (host, mut unraised) = kvbind::HostRuntime::new();
    let transport = Arc::new(MemoryTransport::new(&config.event_loop).unwrap());
    let client = kvbind::Client::builder(host.clone())
        .set_config(config)
        .transport(transport.clone())
        .build()
        .unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let error = {
        let mut guard = host.acquire();
        client
            .put_async(
                &mut guard,
                &key("k1"),
                &Value::map([("a", Value::from(1))]),
                None,
                None,
                None,
                forward_to(tx),
            )
            .unwrap_err()
    };

    assert_eq!(error.code, ResultCode::Cluster);
    assert_eq!(error.kind(), ErrorKind::Cluster);
    assert!(rx.recv().await.is_none());
    assert!(unraised.try_recv().is_err());
    assert!(transport.is_empty());
}

#[tokio::test]
async fn server_error_is_raised_with_caller_key() {
    let mut ctx = connected_client(ClientConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let update_only = Value::map([("exists", Value::from(2))]);

    {
        let mut guard = ctx.host.acquire();
        ctx.client
            .put_async(
                &mut guard,
                &key("missing"),
                &Value::map([("a", Value::from(1))]),
                None,
                Some(&update_only),
                None,
                forward_to(tx),
            )
            .unwrap();
    }

    let error = next_error(&mut ctx.unraised).await;
    assert_eq!(error.code, ResultCode::RecordNotFound);
    assert_eq!(error.kind(), ErrorKind::Record);
    assert_eq!(error.key, Some(key("missing")));
    assert_eq!(error.bin, Some(Value::Nil));
    // The continuation was released without being called
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn continuation_can_chain_a_follow_up_write() {
    let mut ctx = connected_client(ClientConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let bins = Value::map([("a", Value::from(1))]);

    let client = ctx.client.clone();
    let follow_up_tx = tx.clone();
    let chain = move |guard: &mut HostGuard<'_>, first: Value| {
        client
            .put_async(
                guard,
                &key("k2"),
                &Value::map([("after", first)]),
                None,
                None,
                None,
                forward_to(follow_up_tx),
            )
            .map_err(|e| e.to_string())
    };
    {
        let mut guard = ctx.host.acquire();
        ctx.client
            .put_async(&mut guard, &key("k1"), &bins, None, None, None, chain)
            .unwrap();
    }
    drop(tx);

    assert_eq!(next_key(&mut rx).await, key("k2"));
    assert!(rx.recv().await.is_none());
    assert!(ctx.unraised.try_recv().is_err());
    assert!(ctx.transport.get(&stored_key("k1")).is_some());
    assert!(ctx.transport.get(&stored_key("k2")).is_some());
}

#[tokio::test]
async fn concurrent_puts_complete_exactly_once() {
    const WRITERS: usize = 4;
    const PUTS_PER_WRITER: usize = 25;

    let config = ClientConfig {
        event_loop: EventLoopConfig {
            worker_threads: 2,
            ..EventLoopConfig::default()
        },
        ..ClientConfig::default()
    };
    let mut ctx = connected_client(config);
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let client = ctx.client.clone();
            let host = ctx.host.clone();
            let calls = calls.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                for i in 0..PUTS_PER_WRITER {
                    let calls = calls.clone();
                    let tx = tx.clone();
                    let mut guard = host.acquire();
                    client
                        .put_async(
                            &mut guard,
                            &key(&format!("w{w}-{i}")),
                            &Value::map([("i", Value::from(i as i64))]),
                            None,
                            None,
                            None,
                            move |_: &mut HostGuard<'_>, key: Value| {
                                calls.fetch_add(1, Ordering::SeqCst);
                                tx.send(key).map_err(|e| e.to_string())
                            },
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    drop(tx);
    for writer in writers {
        writer.join().unwrap();
    }

    let mut completed = 0;
    while rx.recv().await.is_some() {
        completed += 1;
    }

    assert_eq!(completed, WRITERS * PUTS_PER_WRITER);
    assert_eq!(calls.load(Ordering::SeqCst), WRITERS * PUTS_PER_WRITER);
    assert_eq!(ctx.transport.len(), WRITERS * PUTS_PER_WRITER);
    assert_eq!(ctx.transport.pending(), 0);
    assert!(ctx.unraised.try_recv().is_err());
}

#[tokio::test]
async fn full_queue_rejects_synchronously_with_annotations() {
    let config = ClientConfig {
        event_loop: EventLoopConfig {
            max_pending_commands: 1,
            ..EventLoopConfig::default()
        },
        ..ClientConfig::default()
    };
    let transport = MemoryTransport::new(&config.event_loop)
        .unwrap()
        .with_latency(Duration::from_millis(200));
    let mut ctx = connected_client_with_transport(config, transport);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let bins = Value::map([("a", Value::from(1))]);

    let rejected = {
        let mut guard = ctx.host.acquire();
        ctx.client
            .put_async(&mut guard, &key("k1"), &bins, None, None, None, forward_to(tx.clone()))
            .unwrap();
        ctx.client
            .put_async(&mut guard, &key("k2"), &bins, None, None, None, forward_to(tx))
            .unwrap_err()
    };

    assert_eq!(rejected.code, ResultCode::AsyncQueueFull);
    assert_eq!(rejected.key, Some(key("k2")));
    assert_eq!(rejected.bin, Some(bins));

    assert_eq!(next_key(&mut rx).await, key("k1"));
    assert!(rx.recv().await.is_none());
    assert!(ctx.unraised.try_recv().is_err());
}

#[tokio::test]
async fn closing_keeps_in_flight_writes_and_rejects_new_ones() {
    let config = ClientConfig::default();
    let transport = MemoryTransport::new(&config.event_loop)
        .unwrap()
        .with_latency(Duration::from_millis(50));
    let ctx = connected_client_with_transport(config, transport);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let bins = Value::map([("a", Value::from(1))]);

    {
        let mut guard = ctx.host.acquire();
        ctx.client
            .put_async(&mut guard, &key("k1"), &bins, None, None, None, forward_to(tx.clone()))
            .unwrap();
    }
    ctx.client.close();
    assert!(!ctx.client.is_connected());

    let error = {
        let mut guard = ctx.host.acquire();
        ctx.client
            .put_async(&mut guard, &key("k2"), &bins, None, None, None, forward_to(tx))
            .unwrap_err()
    };
    assert_eq!(error.code, ResultCode::Param);

    assert_eq!(next_key(&mut rx).await, key("k1"));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn write_past_total_timeout_raises_timeout() {
    let config = ClientConfig::default();
    let transport = MemoryTransport::new(&config.event_loop)
        .unwrap()
        .with_latency(Duration::from_millis(300));
    let mut ctx = connected_client_with_transport(config, transport);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let policy = Value::map([("total_timeout", Value::from(20))]);

    {
        let mut guard = ctx.host.acquire();
        ctx.client
            .put_async(
                &mut guard,
                &key("slow"),
                &Value::map([("a", Value::from(1))]),
                None,
                Some(&policy),
                None,
                forward_to(tx),
            )
            .unwrap();
    }

    let error = next_error(&mut ctx.unraised).await;
    assert_eq!(error.code, ResultCode::Timeout);
    assert_eq!(error.kind(), ErrorKind::Timeout);
    assert_eq!(error.key, Some(key("slow")));
    assert!(rx.recv().await.is_none());
    assert!(ctx.transport.is_empty());
}

#[tokio::test]
async fn dropping_the_transport_aborts_in_flight_writes() {
    let config = ClientConfig::default();
    let transport = MemoryTransport::new(&config.event_loop)
        .unwrap()
        .with_latency(Duration::from_secs(30));
    let TestClient {
        client,
        host,
        transport,
        mut unraised,
    } = connected_client_with_transport(config, transport);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let no_deadline = Value::map([("total_timeout", Value::from(0))]);

    {
        let mut guard = host.acquire();
        client
            .put_async(
                &mut guard,
                &key("k1"),
                &Value::map([("a", Value::from(1))]),
                None,
                Some(&no_deadline),
                None,
                forward_to(tx),
            )
            .unwrap();
    }
    assert_eq!(transport.pending(), 1);

    client.close();
    drop(client);
    drop(transport);

    let error = next_error(&mut unraised).await;
    assert_eq!(error.code, ResultCode::ClientAbort);
    assert_eq!(error.kind(), ErrorKind::Client);
    assert!(error.in_doubt);
    assert_eq!(error.key, Some(key("k1")));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn metadata_and_policy_reach_the_store() {
    let ctx = connected_client(ClientConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let meta = Value::map([("ttl", Value::from(-1))]);
    let policy = Value::map([("key", Value::from(1))]);

    {
        let mut guard = ctx.host.acquire();
        ctx.client
            .put_async(
                &mut guard,
                &key("k1"),
                &Value::map([("a", Value::from("x"))]),
                Some(&meta),
                Some(&policy),
                None,
                forward_to(tx),
            )
            .unwrap();
    }
    next_key(&mut rx).await;

    let stored = ctx.transport.get(&stored_key("k1")).unwrap();
    assert_eq!(stored.ttl, kvbind::TTL_NEVER_EXPIRE);
    assert_eq!(stored.user_key, Some(UserKey::Str("k1".to_string())));
}

#[test]
fn partition_filter_descriptor_is_decoded_leniently() {
    let descriptor = Value::map([
        ("begin", Value::from(10)),
        ("count", Value::from("many")),
        (
            "digest",
            Value::map([
                ("init", Value::from(1)),
                ("value", Value::from("0123456789abcdefghijKLMN")),
            ]),
        ),
    ]);

    let filter = convert_partition_filter(&descriptor);

    assert_eq!(filter.begin, 10);
    assert_eq!(filter.count, 0);
    assert!(filter.digest.init);
    assert_eq!(&filter.digest.value, b"0123456789abcdefghij");
    assert_eq!(convert_partition_filter(&Value::map(Vec::<(&str, Value)>::new())), PartitionFilter::default());
}
