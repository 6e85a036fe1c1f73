use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema;
use crate::store::StoreError;
use crate::voting;

#[derive(Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::polls)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Poll {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub multiple_choice: bool,
    pub anonymous: bool,
    pub end_time: Option<DateTime<Utc>>,
    pub status: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    /// Joins the row with its options, which must already be in ordinal order.
    pub fn into_voting(self, options: Vec<PollOption>) -> Result<voting::Poll, StoreError> {
        let Self {
            id,
            title,
            description,
            multiple_choice,
            anonymous,
            end_time,
            status,
            creator_id,
            created_at,
        } = self;

        let status = status.parse::<voting::PollStatus>()
            .map_err(|e| StoreError::Corrupt(format!("poll {id}: {e}")))?;
        let options = options.into_iter()
            .map(voting::PollOption::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(voting::Poll {
            id: voting::PollId(id),
            title,
            description,
            options,
            multiple_choice,
            anonymous,
            end_time,
            status,
            creator_id: voting::Id(creator_id),
            created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::polls)]
pub struct CreatePollSettings<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub multiple_choice: bool,
    pub anonymous: bool,
    pub end_time: Option<DateTime<Utc>>,
    pub status: &'a str,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl<'a> CreatePollSettings<'a> {
    pub fn from(creator_id: &voting::Id, created_at: DateTime<Utc>, settings: &'a voting::CreatePollSettings) -> Self {
        Self {
            title: settings.title(),
            description: settings.description(),
            multiple_choice: settings.multiple_choice(),
            anonymous: settings.anonymous(),
            end_time: settings.end_time(),
            status: voting::PollStatus::Active.as_str(),
            creator_id: creator_id.0,
            created_at,
        }
    }
}

#[derive(Associations, Identifiable, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::polloptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(primary_key(poll_id, id))]
#[diesel(belongs_to(Poll))]
pub struct PollOption {
    pub poll_id: i32,
    pub id: i32,
    pub text: String,
}

impl TryFrom<PollOption> for voting::PollOption {
    type Error = StoreError;
    fn try_from(option: PollOption) -> Result<Self, Self::Error> {
        let id = u32::try_from(option.id)
            .map_err(|_| StoreError::Corrupt(format!("poll {} has option id {}", option.poll_id, option.id)))?;
        Ok(voting::PollOption {
            id: voting::WeakId(id),
            text: option.text,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::poll_voters)]
pub struct Voter {
    pub poll_id: i32,
    pub voter_id: Uuid,
    pub voted_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = schema::poll_tallies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Tally {
    pub option_id: i32,
    pub votes: i64,
}
