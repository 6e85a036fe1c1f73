use std::fmt::{self, Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{Id, PollId, WeakId};
use crate::error::{self, ValidationError};

pub const TITLE_LIMITS: RangeInclusive<usize> = 1..=300;
pub const OPTION_LIMITS: RangeInclusive<usize> = 2..=10;
pub const OPTION_TEXT_MAX: usize = 300;

/// Persisted poll status. `expired` is never stored, see [`EffectiveStatus`].
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Active,
    Closed,
}

impl PollStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PollStatus::Active => "active",
            PollStatus::Closed => "closed",
        }
    }
}

impl Display for PollStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PollStatus::Active),
            "closed" => Ok(PollStatus::Closed),
            other => Err(format!("unknown poll status {other:?}")),
        }
    }
}

/// Status as seen at a point in time, derived from [`PollStatus`] and the end time.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveStatus {
    Active,
    Expired,
    Closed,
}

impl Display for EffectiveStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            EffectiveStatus::Active => "active",
            EffectiveStatus::Expired => "expired",
            EffectiveStatus::Closed => "closed",
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    pub description: String,
    pub options: Vec<PollOption>,

    pub multiple_choice: bool,
    pub anonymous: bool,
    pub end_time: Option<DateTime<Utc>>,
    pub status: PollStatus,

    pub creator_id: Id,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub fn option(&self, id: WeakId) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: WeakId,
    pub text: String,
}


/// Poll settings as submitted by a caller, before any trimming or limit checks.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct UnvalidatedCreatePollSettings {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub multiple_choice: bool,
    pub anonymous: bool,
    pub end_time: Option<DateTime<Utc>>,
}

/// Settings that satisfy every creation invariant. Only obtainable through
/// `TryFrom<(UnvalidatedCreatePollSettings, DateTime<Utc>)>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreatePollSettings {
    title: String,
    description: String,
    options: Vec<String>,
    multiple_choice: bool,
    anonymous: bool,
    end_time: Option<DateTime<Utc>>,
}

impl CreatePollSettings {
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn options(&self) -> &[String] {
        &self.options
    }
    pub fn multiple_choice(&self) -> bool {
        self.multiple_choice
    }
    pub fn anonymous(&self) -> bool {
        self.anonymous
    }
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Materializes the poll record a store persists under `id`.
    pub fn into_poll(self, id: PollId, creator_id: Id, created_at: DateTime<Utc>) -> Poll {
        let options = self.options.into_iter()
            .enumerate()
            .map(|(i, text)| PollOption { id: WeakId(i as u32), text })
            .collect();
        Poll {
            id,
            title: self.title,
            description: self.description,
            options,
            multiple_choice: self.multiple_choice,
            anonymous: self.anonymous,
            end_time: self.end_time,
            status: PollStatus::Active,
            creator_id,
            created_at,
        }
    }
}

impl TryFrom<(UnvalidatedCreatePollSettings, DateTime<Utc>)> for CreatePollSettings {
    type Error = ValidationError;
    fn try_from((settings, now): (UnvalidatedCreatePollSettings, DateTime<Utc>)) -> Result<Self, Self::Error> {
        let UnvalidatedCreatePollSettings {
            title,
            description,
            options,
            multiple_choice,
            anonymous,
            end_time,
        } = settings;

        let title = title.trim().to_owned();
        let title_len = title.chars().count();
        if !TITLE_LIMITS.contains(&title_len) {
            return Err(error::poll_title_invalid_size(TITLE_LIMITS, title_len));
        }

        // blank options are dropped and anything past the limit is ignored
        let options: Vec<String> = options.iter()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .take(*OPTION_LIMITS.end())
            .map(String::from)
            .collect();
        if !OPTION_LIMITS.contains(&options.len()) {
            return Err(error::poll_option_limit_exceeded(OPTION_LIMITS, options.len()));
        }
        for (i, text) in options.iter().enumerate() {
            let len = text.chars().count();
            if len > OPTION_TEXT_MAX {
                return Err(error::poll_option_too_long(i, OPTION_TEXT_MAX, len));
            }
        }

        if let Some(ends) = &end_time {
            if *ends <= now {
                return Err(error::poll_end_time_invalid(&now, ends));
            }
        }

        Ok(CreatePollSettings {
            title,
            description: description.unwrap_or_default(),
            options,
            multiple_choice,
            anonymous,
            end_time,
        })
    }
}
