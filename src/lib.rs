//! Poll engine: poll and option lifecycle, one-vote-per-voter admission and
//! tally bookkeeping against a shared store.
//!
//! Storage is reached through the [`store`] traits so any number of service
//! instances can share one backend. Correctness rests on the backend's atomic
//! primitives, never on in-process locks:
//!
//! - poll ids come from an atomic counter,
//! - a voter is admitted by a single add-if-absent on the ledger,
//! - option counters are incremented in place.
//!
//! ```
//! use std::sync::Arc;
//!
//! use polls::store::MemoryStore;
//! use polls::voting::{Id, UnvalidatedCreatePollSettings, WeakId};
//! use polls::PollService;
//!
//! let service = PollService::with_backend(Arc::new(MemoryStore::new()));
//! let poll_id = service.create(Id::new(), UnvalidatedCreatePollSettings {
//!     title: String::from("Lunch?"),
//!     options: vec![String::from("Pizza"), String::from("Tacos")],
//!     ..Default::default()
//! }).unwrap();
//!
//! service.vote(poll_id, Id::new(), &[WeakId(1)]).unwrap();
//! let view = service.get(poll_id, None).unwrap();
//! assert_eq!(view.total_votes, 1);
//! assert_eq!(view.options[1].percentage, 100);
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod voting;

pub use config::{Config, ConfigError};
pub use error::{ErrorKind, PollError, ValidationError};
pub use service::PollService;
