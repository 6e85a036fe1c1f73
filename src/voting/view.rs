use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::{Id, PollId, WeakId};
use super::lifecycle;
use super::poll::{EffectiveStatus, Poll};

/// A poll merged with its current tallies, ready for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: PollId,
    pub title: String,
    pub description: String,
    pub creator_id: Id,
    pub created_at: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub multiple_choice: bool,
    pub anonymous: bool,
    pub status: EffectiveStatus,
    pub options: Vec<OptionView>,
    /// Distinct voters, not the sum of option counts.
    pub total_votes: u64,
    /// Milliseconds until the poll expires, absent when it never does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ViewerState>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct OptionView {
    pub id: WeakId,
    pub text: String,
    pub votes: u64,
    pub percentage: u32,
}

/// What the requesting user may do with the poll.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerState {
    pub has_voted: bool,
    pub can_vote: bool,
    pub can_delete: bool,
}

impl PollView {
    pub fn new(poll: Poll, counts: &BTreeMap<WeakId, u64>, total_votes: u64, now: DateTime<Utc>) -> PollView {
        let status = lifecycle::effective_status(&poll, now);
        let time_remaining = lifecycle::time_remaining(&poll, now).map(|d| d.num_milliseconds());
        let options = poll.options.into_iter()
            .map(|option| {
                let votes = counts.get(&option.id).copied().unwrap_or(0);
                OptionView {
                    id: option.id,
                    text: option.text,
                    votes,
                    percentage: percentage(votes, total_votes),
                }
            })
            .collect();

        PollView {
            id: poll.id,
            title: poll.title,
            description: poll.description,
            creator_id: poll.creator_id,
            created_at: poll.created_at,
            end_time: poll.end_time,
            multiple_choice: poll.multiple_choice,
            anonymous: poll.anonymous,
            status,
            options,
            total_votes,
            time_remaining,
            viewer: None,
        }
    }

    pub fn with_viewer(mut self, viewer: ViewerState) -> PollView {
        self.viewer = Some(viewer);
        self
    }
}

/// Share of voters that picked an option, rounded to the nearest whole percent.
pub fn percentage(votes: u64, total_votes: u64) -> u32 {
    if total_votes == 0 {
        return 0;
    }
    (votes as f64 / total_votes as f64 * 100.0).round() as u32
}
