//! In-process backend. Each concern sits behind its own lock so that, like a
//! networked store, no operation spans more than one of them.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};

use super::{PollStore, StoreError, TallyAggregator, VoteLedger};
use crate::voting::{CreatePollSettings, Id, Poll, PollId, PollStatus, WeakId};

#[derive(Debug)]
pub struct MemoryStore {
    next_poll_id: AtomicI32,
    polls: RwLock<BTreeMap<PollId, Poll>>,
    voters: Mutex<HashMap<PollId, HashMap<Id, DateTime<Utc>>>>,
    tallies: Mutex<HashMap<PollId, BTreeMap<WeakId, u64>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            next_poll_id: AtomicI32::new(1),
            polls: RwLock::new(BTreeMap::new()),
            voters: Mutex::new(HashMap::new()),
            tallies: Mutex::new(HashMap::new()),
        }
    }

    fn voters(&self) -> Result<MutexGuard<'_, HashMap<PollId, HashMap<Id, DateTime<Utc>>>>, StoreError> {
        self.voters.lock().map_err(|_| poisoned("voters"))
    }

    fn tallies(&self) -> Result<MutexGuard<'_, HashMap<PollId, BTreeMap<WeakId, u64>>>, StoreError> {
        self.tallies.lock().map_err(|_| poisoned("tallies"))
    }
}

fn poisoned(what: &str) -> StoreError {
    StoreError::Unavailable(format!("{what} lock poisoned"))
}

fn page<'a>(polls: impl Iterator<Item = &'a Poll>, offset: usize, count: usize) -> Vec<Poll> {
    polls.skip(offset).take(count).cloned().collect()
}

impl PollStore for MemoryStore {
    fn create_poll(&self, settings: CreatePollSettings, creator_id: Id, created_at: DateTime<Utc>) -> Result<PollId, StoreError> {
        let id = PollId(self.next_poll_id.fetch_add(1, Ordering::SeqCst));
        let poll = settings.into_poll(id, creator_id, created_at);
        self.polls.write().map_err(|_| poisoned("polls"))?.insert(id, poll);
        Ok(id)
    }

    fn get_poll(&self, poll_id: PollId) -> Result<Option<Poll>, StoreError> {
        let polls = self.polls.read().map_err(|_| poisoned("polls"))?;
        Ok(polls.get(&poll_id).cloned())
    }

    fn close_poll(&self, poll_id: PollId) -> Result<bool, StoreError> {
        let mut polls = self.polls.write().map_err(|_| poisoned("polls"))?;
        match polls.get_mut(&poll_id) {
            Some(poll) => {
                poll.status = PollStatus::Closed;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    fn delete_poll(&self, poll_id: PollId) -> Result<bool, StoreError> {
        let mut polls = self.polls.write().map_err(|_| poisoned("polls"))?;
        Ok(polls.remove(&poll_id).is_some())
    }

    fn list_polls(&self, offset: usize, count: usize) -> Result<Vec<Poll>, StoreError> {
        let polls = self.polls.read().map_err(|_| poisoned("polls"))?;
        // ids are allocated in creation order
        Ok(page(polls.values().rev(), offset, count))
    }

    fn list_polls_by_creator(&self, creator_id: Id, offset: usize, count: usize) -> Result<Vec<Poll>, StoreError> {
        let polls = self.polls.read().map_err(|_| poisoned("polls"))?;
        Ok(page(polls.values().rev().filter(|p| p.creator_id == creator_id), offset, count))
    }

    fn count_polls(&self) -> Result<u64, StoreError> {
        let polls = self.polls.read().map_err(|_| poisoned("polls"))?;
        Ok(polls.len() as u64)
    }
}

impl VoteLedger for MemoryStore {
    fn has_voted(&self, poll_id: PollId, voter_id: Id) -> Result<bool, StoreError> {
        let voters = self.voters()?;
        Ok(voters.get(&poll_id).is_some_and(|v| v.contains_key(&voter_id)))
    }

    fn reserve_voter(&self, poll_id: PollId, voter_id: Id, voted_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut voters = self.voters()?;
        let poll_voters = voters.entry(poll_id).or_default();
        if poll_voters.contains_key(&voter_id) {
            return Ok(false);
        }
        poll_voters.insert(voter_id, voted_at);
        Ok(true)
    }

    fn unreserve_voter(&self, poll_id: PollId, voter_id: Id) -> Result<(), StoreError> {
        let mut voters = self.voters()?;
        if let Some(poll_voters) = voters.get_mut(&poll_id) {
            poll_voters.remove(&voter_id);
        }
        Ok(())
    }

    fn voter_count(&self, poll_id: PollId) -> Result<u64, StoreError> {
        let voters = self.voters()?;
        Ok(voters.get(&poll_id).map_or(0, |v| v.len() as u64))
    }

    fn delete_voters(&self, poll_id: PollId) -> Result<(), StoreError> {
        self.voters()?.remove(&poll_id);
        Ok(())
    }
}

impl TallyAggregator for MemoryStore {
    fn increment_option(&self, poll_id: PollId, option_id: WeakId) -> Result<u64, StoreError> {
        let mut tallies = self.tallies()?;
        let count = tallies.entry(poll_id).or_default().entry(option_id).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    fn get_counts(&self, poll_id: PollId) -> Result<BTreeMap<WeakId, u64>, StoreError> {
        let tallies = self.tallies()?;
        Ok(tallies.get(&poll_id).cloned().unwrap_or_default())
    }

    fn delete_counts(&self, poll_id: PollId) -> Result<(), StoreError> {
        self.tallies()?.remove(&poll_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::voting::UnvalidatedCreatePollSettings;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    fn settings(title: &str) -> CreatePollSettings {
        let unvalidated = UnvalidatedCreatePollSettings {
            title: String::from(title),
            options: vec![String::from("A"), String::from("B")],
            ..Default::default()
        };
        CreatePollSettings::try_from((unvalidated, now())).unwrap()
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let store = MemoryStore::new();
        let a = store.create_poll(settings("a"), Id::nil(), now()).unwrap();
        let b = store.create_poll(settings("b"), Id::nil(), now()).unwrap();
        assert!(b > a);
        assert_eq!(store.get_poll(a).unwrap().map(|p| p.title), Some(String::from("a")));
    }

    #[test]
    fn listing_is_newest_first_and_paged() {
        let store = MemoryStore::new();
        let alice = Id::new();
        let bob = Id::new();
        for (i, creator) in [alice, bob, alice, bob, alice].into_iter().enumerate() {
            store.create_poll(settings(&format!("poll {i}")), creator, now() + Duration::seconds(i as i64)).unwrap();
        }

        let titles = |polls: Vec<Poll>| polls.into_iter().map(|p| p.title).collect::<Vec<_>>();
        assert_eq!(titles(store.list_polls(0, 2).unwrap()), vec!["poll 4", "poll 3"]);
        assert_eq!(titles(store.list_polls(3, 10).unwrap()), vec!["poll 1", "poll 0"]);
        assert_eq!(titles(store.list_polls_by_creator(alice, 1, 10).unwrap()), vec!["poll 2", "poll 0"]);
        assert_eq!(store.count_polls().unwrap(), 5);
    }

    #[test]
    fn reserve_is_add_if_absent() {
        let store = MemoryStore::new();
        let voter = Id::new();
        assert!(!store.has_voted(PollId(1), voter).unwrap());
        assert!(store.reserve_voter(PollId(1), voter, now()).unwrap());
        assert!(!store.reserve_voter(PollId(1), voter, now()).unwrap());
        assert!(store.has_voted(PollId(1), voter).unwrap());
        assert!(!store.has_voted(PollId(2), voter).unwrap());

        store.unreserve_voter(PollId(1), voter).unwrap();
        assert!(!store.has_voted(PollId(1), voter).unwrap());
        assert!(store.reserve_voter(PollId(1), voter, now()).unwrap());
    }

    #[test]
    fn concurrent_reservations_admit_one() {
        let store = MemoryStore::new();
        let voter = Id::new();
        let barrier = Barrier::new(16);
        let admitted: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| {
                    barrier.wait();
                    store.reserve_voter(PollId(1), voter, now()).unwrap()
                }))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap() as usize).sum()
        });
        assert_eq!(admitted, 1);
        assert_eq!(store.voter_count(PollId(1)).unwrap(), 1);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let store = MemoryStore::new();
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        store.increment_option(PollId(1), WeakId(0)).unwrap();
                    }
                });
            }
        });
        assert_eq!(store.get_counts(PollId(1)).unwrap().get(&WeakId(0)), Some(&800));
    }

    #[test]
    fn deletes_only_touch_their_poll() {
        let store = MemoryStore::new();
        let voter = Id::new();
        store.reserve_voter(PollId(1), voter, now()).unwrap();
        store.reserve_voter(PollId(2), voter, now()).unwrap();
        store.increment_option(PollId(1), WeakId(0)).unwrap();
        store.increment_option(PollId(2), WeakId(0)).unwrap();

        store.delete_voters(PollId(1)).unwrap();
        store.delete_counts(PollId(1)).unwrap();

        assert!(!store.has_voted(PollId(1), voter).unwrap());
        assert!(store.get_counts(PollId(1)).unwrap().is_empty());
        assert!(store.has_voted(PollId(2), voter).unwrap());
        assert_eq!(store.get_counts(PollId(2)).unwrap().get(&WeakId(0)), Some(&1));
    }

    #[test]
    fn close_and_delete_report_missing_polls() {
        let store = MemoryStore::new();
        let id = store.create_poll(settings("x"), Id::nil(), now()).unwrap();
        assert!(store.close_poll(id).unwrap());
        assert_eq!(store.get_poll(id).unwrap().map(|p| p.status), Some(PollStatus::Closed));
        assert!(store.delete_poll(id).unwrap());
        assert!(!store.delete_poll(id).unwrap());
        assert!(!store.close_poll(id).unwrap());
        assert_eq!(store.get_poll(id).unwrap(), None);
    }
}
