use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

static CLIENT_SEQ: AtomicU32 = AtomicU32::new(0);

/// return second
pub(crate) fn get_now_as_u64() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// return second as u32
pub(crate) fn get_now_as_u32() -> u32 {
    get_now_as_u64() as u32
}

/// Client identifier: start time in seconds, offset by a process-wide
/// sequence so clients created in the same second differ
pub(crate) fn next_client_id() -> u32 {
    get_now_as_u32().wrapping_add(CLIENT_SEQ.fetch_add(1, Ordering::Relaxed))
}
