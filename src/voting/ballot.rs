use serde::{Deserialize, Serialize};

use super::id::{PollId, WeakId};
use super::poll::Poll;
use crate::error::{self, ValidationError};

/// Option ids as submitted by a voter.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct UnvalidatedBallot {
    pub selections: Vec<WeakId>,
}

impl From<Vec<WeakId>> for UnvalidatedBallot {
    fn from(selections: Vec<WeakId>) -> Self {
        UnvalidatedBallot { selections }
    }
}

/// A selection that is non-empty, duplicate-free, refers only to options of
/// `poll_id`, and has a single entry when the poll is single choice.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Ballot {
    poll_id: PollId,
    selections: Vec<WeakId>,
}

impl Ballot {
    pub fn poll_id(&self) -> PollId {
        self.poll_id
    }
    pub fn selections(&self) -> &[WeakId] {
        &self.selections
    }
}

impl TryFrom<(UnvalidatedBallot, &Poll)> for Ballot {
    type Error = ValidationError;
    fn try_from((ballot, poll): (UnvalidatedBallot, &Poll)) -> Result<Self, Self::Error> {
        let UnvalidatedBallot { selections } = ballot;

        if selections.is_empty() {
            return Err(error::ballot_empty());
        }

        for (i, option_id) in selections.iter().enumerate() {
            if poll.option(*option_id).is_none() {
                return Err(error::ballot_invalid_selection(poll.id, *option_id));
            }
            if let Some(first) = selections[..i].iter().position(|other| other == option_id) {
                return Err(error::ballot_duplicate_selection(*option_id, (first, i)));
            }
        }

        if !poll.multiple_choice && selections.len() > 1 {
            return Err(error::ballot_multiple_selection_not_allowed(poll.id, selections.len()));
        }

        Ok(Ballot { poll_id: poll.id, selections })
    }
}
