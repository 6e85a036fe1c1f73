//! Postgres backend.
//!
//! Each trait method maps onto a single statement, or a single transaction
//! where a logical record spans tables: ids come from `SERIAL`, voter
//! reservation is `INSERT .. ON CONFLICT DO NOTHING` and counters are upserts
//! with `votes = votes + 1`.

pub mod models;
pub mod schema;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use tracing::info;

use super::{PollStore, StoreError, TallyAggregator, VoteLedger};
use crate::config::Config;
use crate::voting::{self, CreatePollSettings, Id, PollId, WeakId};
use schema::{poll_tallies, poll_voters, polloptions, polls};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> PgStore {
        PgStore { pool }
    }

    pub fn connect(config: &Config) -> Result<PgStore, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connect_timeout)
            .build(manager)?;
        info!(pool_size = config.pool_size, "connected to poll database");
        Ok(PgStore::new(pool))
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        Ok(self.pool.get()?)
    }
}

fn limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn load_page(conn: &mut PgConnection, creator_id: Option<Id>, offset: usize, count: usize) -> Result<Vec<voting::Poll>, StoreError> {
    let rows: Vec<(models::Poll, Vec<models::PollOption>)> = conn.build_transaction()
        .repeatable_read()
        .read_only()
        .run(|conn| {
            let mut query = polls::table
                .select(models::Poll::as_select())
                .order((polls::created_at.desc(), polls::id.desc()))
                .offset(limit(offset))
                .limit(limit(count))
                .into_boxed();
            if let Some(creator_id) = creator_id {
                query = query.filter(polls::creator_id.eq(creator_id.0));
            }
            let page: Vec<models::Poll> = query.load(conn)?;

            let options: Vec<models::PollOption> = models::PollOption::belonging_to(&page)
                .select(models::PollOption::as_select())
                .order((polloptions::poll_id.asc(), polloptions::id.asc()))
                .load(conn)?;
            let grouped = options.grouped_by(&page);

            Ok::<_, diesel::result::Error>(page.into_iter().zip(grouped).collect())
        })?;

    rows.into_iter()
        .map(|(poll, options)| poll.into_voting(options))
        .collect()
}

impl PollStore for PgStore {
    fn create_poll(&self, settings: CreatePollSettings, creator_id: Id, created_at: DateTime<Utc>) -> Result<PollId, StoreError> {
        let mut conn = self.conn()?;
        let id = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let id: i32 = diesel::insert_into(polls::table)
                .values(models::CreatePollSettings::from(&creator_id, created_at, &settings))
                .returning(polls::id)
                .get_result(conn)?;

            let options: Vec<models::PollOption> = settings.options().iter()
                .enumerate()
                .map(|(i, text)| models::PollOption { poll_id: id, id: i as i32, text: text.clone() })
                .collect();
            diesel::insert_into(polloptions::table)
                .values(&options)
                .execute(conn)?;

            Ok(id)
        })?;
        Ok(PollId(id))
    }

    fn get_poll(&self, poll_id: PollId) -> Result<Option<voting::Poll>, StoreError> {
        let mut conn = self.conn()?;
        let found = conn.build_transaction()
            .repeatable_read()
            .read_only()
            .run(|conn| {
                let poll: Option<models::Poll> = polls::table
                    .find(poll_id.0)
                    .select(models::Poll::as_select())
                    .first(conn)
                    .optional()?;
                let Some(poll) = poll else {
                    return Ok::<_, diesel::result::Error>(None);
                };

                let options: Vec<models::PollOption> = models::PollOption::belonging_to(&poll)
                    .select(models::PollOption::as_select())
                    .order(polloptions::id.asc())
                    .load(conn)?;
                Ok(Some((poll, options)))
            })?;

        found.map(|(poll, options)| poll.into_voting(options)).transpose()
    }

    fn close_poll(&self, poll_id: PollId) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let updated = diesel::update(polls::table.find(poll_id.0))
            .set(polls::status.eq(voting::PollStatus::Closed.as_str()))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    fn delete_poll(&self, poll_id: PollId) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let deleted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(polloptions::table.filter(polloptions::poll_id.eq(poll_id.0)))
                .execute(conn)?;
            diesel::delete(polls::table.find(poll_id.0)).execute(conn)
        })?;
        Ok(deleted > 0)
    }

    fn list_polls(&self, offset: usize, count: usize) -> Result<Vec<voting::Poll>, StoreError> {
        load_page(&mut *self.conn()?, None, offset, count)
    }

    fn list_polls_by_creator(&self, creator_id: Id, offset: usize, count: usize) -> Result<Vec<voting::Poll>, StoreError> {
        load_page(&mut *self.conn()?, Some(creator_id), offset, count)
    }

    fn count_polls(&self) -> Result<u64, StoreError> {
        let mut conn = self.conn()?;
        let count: i64 = polls::table.count().get_result(&mut conn)?;
        Ok(count.max(0) as u64)
    }
}

impl VoteLedger for PgStore {
    fn has_voted(&self, poll_id: PollId, voter_id: Id) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let voted = diesel::select(diesel::dsl::exists(poll_voters::table.find((poll_id.0, voter_id.0))))
            .get_result(&mut conn)?;
        Ok(voted)
    }

    fn reserve_voter(&self, poll_id: PollId, voter_id: Id, voted_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let inserted = diesel::insert_into(poll_voters::table)
            .values(models::Voter { poll_id: poll_id.0, voter_id: voter_id.0, voted_at })
            .on_conflict_do_nothing()
            .execute(&mut conn)?;
        Ok(inserted == 1)
    }

    fn unreserve_voter(&self, poll_id: PollId, voter_id: Id) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        diesel::delete(poll_voters::table.find((poll_id.0, voter_id.0)))
            .execute(&mut conn)?;
        Ok(())
    }

    fn voter_count(&self, poll_id: PollId) -> Result<u64, StoreError> {
        let mut conn = self.conn()?;
        let count: i64 = poll_voters::table
            .filter(poll_voters::poll_id.eq(poll_id.0))
            .count()
            .get_result(&mut conn)?;
        Ok(count.max(0) as u64)
    }

    fn delete_voters(&self, poll_id: PollId) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        diesel::delete(poll_voters::table.filter(poll_voters::poll_id.eq(poll_id.0)))
            .execute(&mut conn)?;
        Ok(())
    }
}

impl TallyAggregator for PgStore {
    fn increment_option(&self, poll_id: PollId, option_id: WeakId) -> Result<u64, StoreError> {
        let mut conn = self.conn()?;
        let votes: i64 = diesel::insert_into(poll_tallies::table)
            .values((
                poll_tallies::poll_id.eq(poll_id.0),
                poll_tallies::option_id.eq(option_id.0 as i32),
                poll_tallies::votes.eq(1i64),
            ))
            .on_conflict((poll_tallies::poll_id, poll_tallies::option_id))
            .do_update()
            .set(poll_tallies::votes.eq(poll_tallies::votes + 1i64))
            .returning(poll_tallies::votes)
            .get_result(&mut conn)?;
        Ok(votes.max(0) as u64)
    }

    fn get_counts(&self, poll_id: PollId) -> Result<BTreeMap<WeakId, u64>, StoreError> {
        let mut conn = self.conn()?;
        let rows: Vec<models::Tally> = poll_tallies::table
            .filter(poll_tallies::poll_id.eq(poll_id.0))
            .select(models::Tally::as_select())
            .load(&mut conn)?;

        rows.into_iter()
            .map(|row| {
                let option_id = u32::try_from(row.option_id)
                    .map_err(|_| StoreError::Corrupt(format!("poll {poll_id} has tally for option {}", row.option_id)))?;
                let votes = u64::try_from(row.votes)
                    .map_err(|_| StoreError::Corrupt(format!("poll {poll_id} option {option_id} has {} votes", row.votes)))?;
                Ok((WeakId(option_id), votes))
            })
            .collect()
    }

    fn delete_counts(&self, poll_id: PollId) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        diesel::delete(poll_tallies::table.filter(poll_tallies::poll_id.eq(poll_id.0)))
            .execute(&mut conn)?;
        Ok(())
    }
}
