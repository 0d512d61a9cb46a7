//! In-memory transport
//!
//! Stores records in a concurrent map and completes every accepted write on
//! its own [`EventLoop`]. Keys are identified by digest when one is given and
//! by user key otherwise; digests are never derived from user keys.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use tracing::warn;

use super::EventLoop;
use super::SubmitError;
use super::Transport;
use crate::Bin;
use crate::BinValue;
use crate::Completion;
use crate::Digest;
use crate::EventLoopConfig;
use crate::ExistsPolicy;
use crate::GenerationPolicy;
use crate::Key;
use crate::KeyPolicy;
use crate::Record;
use crate::Result;
use crate::ResultCode;
use crate::ServerError;
use crate::UserKey;
use crate::WritePolicy;

/// Largest record the store accepts
pub const DEFAULT_MAX_RECORD_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    Digest(Digest),
    User(UserKey),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub namespace: String,
    pub set: Option<String>,
    pub id: RecordId,
}

impl From<&Key> for StoreKey {
    fn from(key: &Key) -> Self {
        let id = match (key.digest(), key.user_key()) {
            (Some(digest), _) => RecordId::Digest(*digest),
            (None, Some(user_key)) => RecordId::User(user_key.clone()),
            // Keys are validated to carry one or the other
            (None, None) => RecordId::Digest(Digest::default()),
        };
        Self {
            namespace: key.namespace().to_string(),
            set: key.set().map(str::to_string),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub bins: Vec<Bin>,
    pub generation: u16,
    pub ttl: u32,
    /// Present when written with [`KeyPolicy::Send`]
    pub user_key: Option<UserKey>,
}

impl StoredRecord {
    pub fn bin(
        &self,
        name: &str,
    ) -> Option<&BinValue> {
        self.bins.iter().find(|b| b.name == name).map(|b| &b.value)
    }
}

pub struct MemoryTransport {
    event_loop: EventLoop,
    store: Arc<DashMap<StoreKey, StoredRecord>>,
    connected: AtomicBool,
    pending: Arc<AtomicUsize>,
    max_pending: usize,
    max_record_size: usize,
    latency: Duration,
}

impl MemoryTransport {
    pub fn new(config: &EventLoopConfig) -> Result<Self> {
        Ok(Self {
            event_loop: EventLoop::new(config)?,
            store: Arc::new(DashMap::new()),
            connected: AtomicBool::new(false),
            pending: Arc::new(AtomicUsize::new(0)),
            max_pending: config.max_pending_commands,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            latency: Duration::ZERO,
        })
    }

    /// Delay applied before each write is executed
    pub fn with_latency(
        mut self,
        latency: Duration,
    ) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_max_record_size(
        mut self,
        max_record_size: usize,
    ) -> Self {
        self.max_record_size = max_record_size;
        self
    }

    pub fn get(
        &self,
        key: &Key,
    ) -> Option<StoredRecord> {
        self.store.get(&StoreKey::from(key)).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Writes accepted but not yet completed
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl Transport for MemoryTransport {
    fn connect(
        &self,
        hosts: &[String],
    ) -> std::result::Result<(), ServerError> {
        if hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(ServerError::new(ResultCode::Cluster, "No usable seed host"));
        }
        self.connected.store(true, Ordering::Release);
        debug!("memory transport connected via {:?}", hosts);
        Ok(())
    }

    fn submit_write(
        &self,
        policy: &WritePolicy,
        record: &Record,
        completion: Completion,
    ) -> std::result::Result<(), SubmitError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(SubmitError::new(
                ServerError::new(ResultCode::Cluster, "Transport is not connected"),
                completion,
            ));
        }

        let in_flight = self.pending.fetch_add(1, Ordering::AcqRel);
        if self.max_pending > 0 && in_flight >= self.max_pending {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            warn!("async queue full: {} writes in flight", in_flight);
            return Err(SubmitError::new(
                ServerError::new(
                    ResultCode::AsyncQueueFull,
                    format!("Async delay queue is full: {in_flight}"),
                ),
                completion,
            ));
        }

        let store = self.store.clone();
        let pending = self.pending.clone();
        let key = StoreKey::from(completion.key());
        let user_key = completion.key().user_key().cloned();
        let policy = policy.clone();
        let record = record.clone();
        let latency = self.latency;
        let max_record_size = self.max_record_size;
        let total_timeout = Duration::from_millis(u64::from(policy.total_timeout_in_ms));

        self.event_loop.spawn(async move {
            let write = async move {
                if !latency.is_zero() {
                    tokio::time::sleep(latency).await;
                }
                apply_write(&store, key, user_key, &policy, &record, max_record_size)
            };
            // Zero means no deadline
            let outcome = if total_timeout.is_zero() {
                write.await
            } else {
                match tokio::time::timeout(total_timeout, write).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        debug!("write timed out after {:?}", total_timeout);
                        Err(ServerError::timeout())
                    }
                }
            };
            pending.fetch_sub(1, Ordering::AcqRel);
            completion.complete(outcome);
        });
        Ok(())
    }

    fn close(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

fn apply_write(
    store: &DashMap<StoreKey, StoredRecord>,
    key: StoreKey,
    user_key: Option<UserKey>,
    policy: &WritePolicy,
    record: &Record,
    max_record_size: usize,
) -> std::result::Result<(), ServerError> {
    if record.estimated_size() > max_record_size {
        return Err(ServerError::new(ResultCode::RecordTooBig, "Record too big"));
    }
    let user_key = match policy.key {
        KeyPolicy::Send => user_key,
        KeyPolicy::Digest => None,
    };

    match store.entry(key) {
        Entry::Occupied(mut entry) => {
            let stored = entry.get_mut();
            if policy.exists == ExistsPolicy::Create {
                return Err(ServerError::record_exists());
            }
            match policy.generation {
                GenerationPolicy::Eq if record.generation != stored.generation => {
                    return Err(ServerError::generation())
                }
                GenerationPolicy::Gt if record.generation <= stored.generation => {
                    return Err(ServerError::generation())
                }
                _ => {}
            }
            if let Some(expression) = &policy.expression {
                if !expression.matches(&stored.bins) {
                    return Err(ServerError::new(ResultCode::FilteredOut, "Transaction filtered out"));
                }
            }

            match policy.exists {
                ExistsPolicy::Replace | ExistsPolicy::CreateOrReplace => {
                    stored.bins = live_bins(&record.bins);
                }
                _ => merge_bins(&mut stored.bins, &record.bins),
            }
            stored.generation = stored.generation.wrapping_add(1);
            stored.ttl = record.ttl;
            if user_key.is_some() {
                stored.user_key = user_key;
            }
            Ok(())
        }
        Entry::Vacant(entry) => {
            if matches!(policy.exists, ExistsPolicy::Update | ExistsPolicy::Replace) {
                return Err(ServerError::record_not_found());
            }
            entry.insert(StoredRecord {
                bins: live_bins(&record.bins),
                generation: 1,
                ttl: record.ttl,
                user_key,
            });
            Ok(())
        }
    }
}

/// `Nil` bins delete; they are never stored
fn live_bins(bins: &[Bin]) -> Vec<Bin> {
    bins.iter()
        .filter(|b| b.value != BinValue::Nil)
        .cloned()
        .collect()
}

fn merge_bins(
    stored: &mut Vec<Bin>,
    incoming: &[Bin],
) {
    for bin in incoming {
        stored.retain(|b| b.name != bin.name);
        if bin.value != BinValue::Nil {
            stored.push(bin.clone());
        }
    }
}
