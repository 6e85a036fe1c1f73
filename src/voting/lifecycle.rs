//! Status derivation and the rules deciding who may do what with a poll.
//!
//! Everything here is a pure function of a loaded [`Poll`] and the caller's
//! inputs; nothing touches the store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ballot::{Ballot, UnvalidatedBallot};
use super::id::{Id, WeakId};
use super::poll::{EffectiveStatus, Poll, PollStatus};
use crate::error::ValidationError;

/// The user on whose behalf an operation runs. Admin status is resolved by
/// the caller's user directory.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Requester {
    pub id: Id,
    pub is_admin: bool,
}

impl Requester {
    pub const fn user(id: Id) -> Requester {
        Requester { id, is_admin: false }
    }
    pub const fn admin(id: Id) -> Requester {
        Requester { id, is_admin: true }
    }
}

pub fn effective_status(poll: &Poll, now: DateTime<Utc>) -> EffectiveStatus {
    match poll.status {
        PollStatus::Closed => EffectiveStatus::Closed,
        PollStatus::Active => match poll.end_time {
            Some(ends) if now > ends => EffectiveStatus::Expired,
            _ => EffectiveStatus::Active,
        },
    }
}

pub fn can_vote(poll: &Poll, now: DateTime<Utc>) -> bool {
    effective_status(poll, now) == EffectiveStatus::Active
}

/// Deleting and closing are both reserved to the creator and admins.
pub fn can_delete(poll: &Poll, requester: &Requester) -> bool {
    requester.id == poll.creator_id || requester.is_admin
}

pub fn validate_choice(poll: &Poll, option_ids: &[WeakId]) -> Result<Ballot, ValidationError> {
    Ballot::try_from((UnvalidatedBallot::from(option_ids.to_vec()), poll))
}

/// Time left before the poll expires; `None` when it never does.
pub fn time_remaining(poll: &Poll, now: DateTime<Utc>) -> Option<Duration> {
    poll.end_time.map(|ends| (ends - now).max(Duration::zero()))
}
