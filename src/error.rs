use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::store::StoreError;
use crate::voting::{EffectiveStatus, Id, PollId, WeakId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: {}", self.message)
    }
}

impl Error for ValidationError {}

pub fn poll_title_invalid_size(limits: RangeInclusive<usize>, len: usize) -> ValidationError {
    ValidationError {
        message: format!("poll's title must be between {} and {} characters, got {len}", limits.start(), limits.end()),
    }
}

pub fn poll_option_limit_exceeded(limits: RangeInclusive<usize>, count: usize) -> ValidationError {
    ValidationError {
        message: format!("poll must have between {} and {} options, got {count}", limits.start(), limits.end()),
    }
}

pub fn poll_option_too_long(index: usize, max: usize, len: usize) -> ValidationError {
    ValidationError {
        message: format!("poll option {index} must be at most {max} characters, got {len}"),
    }
}

pub fn poll_end_time_invalid(now: &DateTime<Utc>, ends: &DateTime<Utc>) -> ValidationError {
    ValidationError {
        message: format!("poll cannot end before it starts, now {now}, ends {ends}"),
    }
}

pub fn ballot_empty() -> ValidationError {
    ValidationError {
        message: String::from("ballot is empty"),
    }
}

pub fn ballot_invalid_selection(poll_id: PollId, option_id: WeakId) -> ValidationError {
    ValidationError {
        message: format!("poll {poll_id} has no option {option_id}"),
    }
}

pub fn ballot_duplicate_selection(option_id: WeakId, indices: (usize, usize)) -> ValidationError {
    ValidationError {
        message: format!("poll option {option_id} is selected more than once at indices {indices:?}"),
    }
}

pub fn ballot_multiple_selection_not_allowed(poll_id: PollId, count: usize) -> ValidationError {
    ValidationError {
        message: format!("poll {poll_id} is single choice, got {count} selections"),
    }
}

/// Stable discriminant of [`PollError`], for callers that translate errors
/// into transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    NotActive,
    AlreadyVoted,
    Permission,
    Store,
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("poll {0} not found")]
    NotFound(PollId),

    #[error("poll {poll_id} is not accepting votes, status is {status}")]
    NotActive { poll_id: PollId, status: EffectiveStatus },

    #[error("voter {voter_id} has already voted on poll {poll_id}")]
    AlreadyVoted { poll_id: PollId, voter_id: Id },

    #[error("user {requester_id} may not modify poll {poll_id}")]
    Permission { poll_id: PollId, requester_id: Id },

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::Validation(_) => ErrorKind::Validation,
            PollError::NotFound(_) => ErrorKind::NotFound,
            PollError::NotActive { .. } => ErrorKind::NotActive,
            PollError::AlreadyVoted { .. } => ErrorKind::AlreadyVoted,
            PollError::Permission { .. } => ErrorKind::Permission,
            PollError::Store(_) => ErrorKind::Store,
        }
    }
}
