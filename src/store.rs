//! Storage seams for polls, the voter ledger and the tally counters.
//!
//! Each trait describes one concern of a shared, network-accessed store. Every
//! method must be atomic on its own: callers never combine a read with a
//! follow-up write to decide ledger membership or counter values, so
//! implementations must offer test-and-set and increment as single calls.

mod memory;
#[cfg(feature = "postgres")]
pub mod pg;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::voting::{CreatePollSettings, Id, Poll, PollId, WeakId};

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use pg::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[cfg(feature = "postgres")]
    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[cfg(feature = "postgres")]
    #[error("connection pool failed: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

/// Poll and option records plus the listing indices.
pub trait PollStore: Send + Sync {
    /// Allocates a fresh id and persists the poll with all of its options.
    fn create_poll(&self, settings: CreatePollSettings, creator_id: Id, created_at: DateTime<Utc>) -> Result<PollId, StoreError>;

    fn get_poll(&self, poll_id: PollId) -> Result<Option<Poll>, StoreError>;

    /// Flips a poll to closed. Returns `false` if the poll does not exist.
    fn close_poll(&self, poll_id: PollId) -> Result<bool, StoreError>;

    /// Removes the poll, its options and its index entries. Returns `false`
    /// if there was nothing to remove.
    fn delete_poll(&self, poll_id: PollId) -> Result<bool, StoreError>;

    /// Most recently created first.
    fn list_polls(&self, offset: usize, count: usize) -> Result<Vec<Poll>, StoreError>;

    /// Most recently created first, restricted to one creator.
    fn list_polls_by_creator(&self, creator_id: Id, offset: usize, count: usize) -> Result<Vec<Poll>, StoreError>;

    fn count_polls(&self) -> Result<u64, StoreError>;
}

/// Which voters have voted on which poll.
pub trait VoteLedger: Send + Sync {
    fn has_voted(&self, poll_id: PollId, voter_id: Id) -> Result<bool, StoreError>;

    /// Atomic add-if-absent. Exactly one caller per `(poll_id, voter_id)`
    /// observes `true`.
    fn reserve_voter(&self, poll_id: PollId, voter_id: Id, voted_at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Compensates a reservation whose vote never landed.
    fn unreserve_voter(&self, poll_id: PollId, voter_id: Id) -> Result<(), StoreError>;

    fn voter_count(&self, poll_id: PollId) -> Result<u64, StoreError>;

    fn delete_voters(&self, poll_id: PollId) -> Result<(), StoreError>;
}

/// Per-option vote counters. Counters only ever grow while the poll exists.
pub trait TallyAggregator: Send + Sync {
    /// Atomic increment, returning the new count.
    fn increment_option(&self, poll_id: PollId, option_id: WeakId) -> Result<u64, StoreError>;

    /// Options that never received a vote may be absent from the map.
    fn get_counts(&self, poll_id: PollId) -> Result<BTreeMap<WeakId, u64>, StoreError>;

    fn delete_counts(&self, poll_id: PollId) -> Result<(), StoreError>;
}
