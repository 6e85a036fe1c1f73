//! Poll operations on top of the storage seams.
//!
//! Vote admission hinges on [`VoteLedger::reserve_voter`]: everything before
//! it is read-only, everything after it is tally bookkeeping. A failure after
//! the reservation is compensated by releasing it, best effort.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::PollError;
use crate::store::{PollStore, TallyAggregator, VoteLedger};
use crate::voting::{
    lifecycle, Clock, CreatePollSettings, EffectiveStatus, Id, Poll, PollId, PollView, Requester,
    SystemClock, UnvalidatedCreatePollSettings, ViewerState, WeakId,
};


#[derive(Clone)]
pub struct PollService {
    polls: Arc<dyn PollStore>,
    ledger: Arc<dyn VoteLedger>,
    tallies: Arc<dyn TallyAggregator>,
    clock: Arc<dyn Clock>,
}

impl PollService {
    pub fn new(
        polls: Arc<dyn PollStore>,
        ledger: Arc<dyn VoteLedger>,
        tallies: Arc<dyn TallyAggregator>,
        clock: Arc<dyn Clock>,
    ) -> PollService {
        PollService { polls, ledger, tallies, clock }
    }

    /// Uses one backend for all three concerns and the system clock.
    pub fn with_backend<B>(backend: Arc<B>) -> PollService
    where
        B: PollStore + VoteLedger + TallyAggregator + 'static,
    {
        PollService::new(backend.clone(), backend.clone(), backend, Arc::new(SystemClock))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> PollService {
        self.clock = clock;
        self
    }

    pub fn create(&self, creator_id: Id, settings: UnvalidatedCreatePollSettings) -> Result<PollId, PollError> {
        let now = self.clock.now();
        let settings = CreatePollSettings::try_from((settings, now))?;
        let option_count = settings.options().len();
        let poll_id = self.polls.create_poll(settings, creator_id, now)?;
        info!(%poll_id, %creator_id, option_count, "poll created");
        Ok(poll_id)
    }

    pub fn get(&self, poll_id: PollId, requester: Option<&Requester>) -> Result<PollView, PollError> {
        let poll = self.load(poll_id)?;
        let now = self.clock.now();

        let viewer = match requester {
            Some(requester) => {
                let has_voted = self.ledger.has_voted(poll_id, requester.id)?;
                Some(ViewerState {
                    has_voted,
                    can_vote: !has_voted && lifecycle::can_vote(&poll, now),
                    can_delete: lifecycle::can_delete(&poll, requester),
                })
            },
            None => None,
        };

        let view = self.view(poll)?;
        Ok(match viewer {
            Some(viewer) => view.with_viewer(viewer),
            None => view,
        })
    }

    pub fn vote(&self, poll_id: PollId, voter_id: Id, option_ids: &[WeakId]) -> Result<(), PollError> {
        let poll = self.load(poll_id)?;
        let now = self.clock.now();

        let status = lifecycle::effective_status(&poll, now);
        if status != EffectiveStatus::Active {
            return Err(PollError::NotActive { poll_id, status });
        }

        let ballot = lifecycle::validate_choice(&poll, option_ids)?;

        if !self.ledger.reserve_voter(poll_id, voter_id, now)? {
            debug!(%poll_id, %voter_id, "duplicate vote rejected");
            return Err(PollError::AlreadyVoted { poll_id, voter_id });
        }

        for option_id in ballot.selections() {
            if let Err(err) = self.tallies.increment_option(poll_id, *option_id) {
                if let Err(undo) = self.ledger.unreserve_voter(poll_id, voter_id) {
                    error!(%poll_id, %voter_id, error = %undo, "failed to release voter after tally failure");
                }
                return Err(err.into());
            }
        }

        debug!(%poll_id, %voter_id, selections = ?ballot.selections(), "vote recorded");
        Ok(())
    }

    pub fn has_voted(&self, poll_id: PollId, voter_id: Id) -> Result<bool, PollError> {
        Ok(self.ledger.has_voted(poll_id, voter_id)?)
    }

    /// Stops a poll from accepting further votes. Closing a closed poll is a no-op.
    pub fn close(&self, poll_id: PollId, requester: &Requester) -> Result<(), PollError> {
        let poll = self.load(poll_id)?;
        if !lifecycle::can_delete(&poll, requester) {
            return Err(PollError::Permission { poll_id, requester_id: requester.id });
        }
        if !self.polls.close_poll(poll_id)? {
            return Err(PollError::NotFound(poll_id));
        }
        info!(%poll_id, requester_id = %requester.id, "poll closed");
        Ok(())
    }

    /// Removes the poll record first so readers see it gone before its
    /// ledger and counters are purged.
    ///
    /// Deleting a poll that is already gone still purges its ledger and
    /// counters before reporting `NotFound`, so retrying a delete whose purge
    /// failed finishes the job.
    pub fn delete(&self, poll_id: PollId, requester: &Requester) -> Result<(), PollError> {
        let Some(poll) = self.polls.get_poll(poll_id)? else {
            self.purge(poll_id)?;
            return Err(PollError::NotFound(poll_id));
        };
        if !lifecycle::can_delete(&poll, requester) {
            return Err(PollError::Permission { poll_id, requester_id: requester.id });
        }

        let deleted = self.polls.delete_poll(poll_id)?;
        self.purge(poll_id)?;
        if !deleted {
            return Err(PollError::NotFound(poll_id));
        }

        info!(%poll_id, requester_id = %requester.id, "poll deleted");
        Ok(())
    }

    pub fn list(&self, offset: usize, count: usize) -> Result<Vec<PollView>, PollError> {
        self.polls.list_polls(offset, count)?
            .into_iter()
            .map(|poll| self.view(poll))
            .collect()
    }

    pub fn list_by_creator(&self, creator_id: Id, offset: usize, count: usize) -> Result<Vec<PollView>, PollError> {
        self.polls.list_polls_by_creator(creator_id, offset, count)?
            .into_iter()
            .map(|poll| self.view(poll))
            .collect()
    }

    pub fn count(&self) -> Result<u64, PollError> {
        Ok(self.polls.count_polls()?)
    }

    fn load(&self, poll_id: PollId) -> Result<Poll, PollError> {
        self.polls.get_poll(poll_id)?.ok_or(PollError::NotFound(poll_id))
    }

    fn purge(&self, poll_id: PollId) -> Result<(), PollError> {
        self.ledger.delete_voters(poll_id)?;
        self.tallies.delete_counts(poll_id)?;
        Ok(())
    }

    fn view(&self, poll: Poll) -> Result<PollView, PollError> {
        let counts = self.tallies.get_counts(poll.id)?;
        let total_votes = self.ledger.voter_count(poll.id)?;
        Ok(PollView::new(poll, &counts, total_votes, self.clock.now()))
    }
}
