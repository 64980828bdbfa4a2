//! Username to partition routing.
//!
//! User rows are spread over `N` identically shaped tables `users_0 .. users_{N-1}`.
//! The partition of a user is the sum of the username's code points modulo `N`.
//!
//! `N` is fixed per deployment. Changing it moves almost every username to a
//! different table and makes existing rows unreachable until the data is
//! migrated; nothing in this service performs that migration.

use std::num::NonZeroU32;

/// Prefix shared by every partition table name.
pub const TABLE_PREFIX: &str = "users";

/// Maps a username to a partition in `[0, partitions)`.
///
/// Pure and deterministic. The empty username maps to partition 0.
pub fn shard(username: &str, partitions: NonZeroU32) -> u32 {
    let sum = username
        .chars()
        .fold(0u64, |acc, c| acc.wrapping_add(u64::from(u32::from(c))));
    (sum % u64::from(partitions.get())) as u32
}

#[derive(Debug, Clone, Copy)]
pub struct ShardRouter {
    partitions: NonZeroU32,
}

impl ShardRouter {
    pub fn new(partitions: NonZeroU32) -> Self {
        Self { partitions }
    }

    pub fn partitions(&self) -> NonZeroU32 {
        self.partitions
    }

    pub fn partition(&self, username: &str) -> u32 {
        shard(username, self.partitions)
    }

    /// Physical table holding `username`.
    pub fn table_for(&self, username: &str) -> String {
        table_name(self.partition(username))
    }

    /// Every partition table, in partition order.
    pub fn tables(&self) -> impl Iterator<Item = String> {
        (0..self.partitions.get()).map(table_name)
    }
}

pub fn table_name(partition: u32) -> String {
    format!("{TABLE_PREFIX}_{partition}")
}
