//! Partition ranges for scans and queries
//!
//! A [`PartitionFilter`] selects `count` consecutive partitions starting at
//! `begin`, optionally resuming from a record digest inside the first one.

mod filter;

pub use filter::*;


/// Size of a record digest
pub const DIGEST_VALUE_SIZE: usize = 20;

/// Partitions per namespace
pub const PARTITIONS: u16 = 4096;

/// Digest anchor of a partition filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionDigest {
    pub init: bool,
    pub value: [u8; DIGEST_VALUE_SIZE],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionFilter {
    pub begin: u16,
    pub count: u16,
    pub digest: PartitionDigest,
}

impl PartitionFilter {
    /// Every partition of the namespace
    pub fn all() -> Self {
        Self::by_range(0, PARTITIONS)
    }

    pub fn by_id(id: u16) -> Self {
        Self::by_range(id, 1)
    }

    pub fn by_range(
        begin: u16,
        count: u16,
    ) -> Self {
        Self {
            begin,
            count,
            digest: PartitionDigest::default(),
        }
    }

    /// Resume after `digest`, inside the partition that owns it
    pub fn by_digest(digest: &[u8; DIGEST_VALUE_SIZE]) -> Self {
        Self {
            begin: partition_id(digest),
            count: 1,
            digest: PartitionDigest {
                init: true,
                value: *digest,
            },
        }
    }
}

/// Partition that owns `digest`: the first two digest bytes, little endian,
/// masked to the partition count
pub fn partition_id(digest: &[u8; DIGEST_VALUE_SIZE]) -> u16 {
    u16::from_le_bytes([digest[0], digest[1]]) & (PARTITIONS - 1)
}
