use tracing::debug;

use super::PartitionDigest;
use super::PartitionFilter;
use super::DIGEST_VALUE_SIZE;
use crate::Value;

/// Converts a host partition descriptor into a [`PartitionFilter`]
///
/// Recognised entries, each optional:
/// - `begin`: int
/// - `count`: int
/// - `digest`: dict with `init` (int, non-zero means set) and `value` (str)
///
/// Booleans count as integers here, `true` as 1 and `false` as 0.
///
/// An entry that is missing, of the wrong type, or an integer outside the
/// `u16` range of the layout keeps its default: `begin = 0`, `count = 0`,
/// `digest.init = false` with an all-zero value. `digest.value` is copied
/// like a C string: up to the first NUL byte or [`DIGEST_VALUE_SIZE`] bytes,
/// whichever comes first, zero-filling the rest. Longer values are truncated
/// without complaint.
///
/// Lenient by contract: no descriptor makes this fail.
pub fn convert_partition_filter(descriptor: &Value) -> PartitionFilter {
    let mut filter = PartitionFilter::default();

    if let Some(begin) = descriptor.get("begin").and_then(|v| u16_entry("begin", v)) {
        filter.begin = begin;
    }

    if let Some(count) = descriptor.get("count").and_then(|v| u16_entry("count", v)) {
        filter.count = count;
    }

    if let Some(digest) = descriptor.get("digest").filter(|v| v.as_map().is_some()) {
        filter.digest = convert_digest(digest);
    }

    filter
}

fn convert_digest(descriptor: &Value) -> PartitionDigest {
    let mut digest = PartitionDigest::default();

    if let Some(init) = descriptor.get("init").and_then(int_entry) {
        digest.init = init != 0;
    }

    if let Some(value) = descriptor.get("value").and_then(Value::as_str) {
        let bytes = value.as_bytes();
        let len = bytes
            .iter()
            .take(DIGEST_VALUE_SIZE)
            .position(|b| *b == 0)
            .unwrap_or(bytes.len().min(DIGEST_VALUE_SIZE));
        digest.value[..len].copy_from_slice(&bytes[..len]);
    }

    digest
}

fn u16_entry(
    name: &str,
    value: &Value,
) -> Option<u16> {
    let v = int_entry(value)?;
    match u16::try_from(v) {
        Ok(v) => Some(v),
        Err(_) => {
            debug!("partition filter {name} = {v} does not fit, using default");
            None
        }
    }
}

fn int_entry(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}
