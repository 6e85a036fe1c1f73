mod ballot;
mod clock;
mod id;
pub mod lifecycle;
mod poll;
mod view;

pub use ballot::{Ballot, UnvalidatedBallot};
pub use clock::{Clock, FixedClock, SystemClock};
pub use id::{Id, PollId, WeakId};
pub use lifecycle::Requester;
pub use poll::{
    CreatePollSettings, EffectiveStatus, Poll, PollOption, PollStatus, UnvalidatedCreatePollSettings,
    OPTION_LIMITS, OPTION_TEXT_MAX, TITLE_LIMITS,
};
pub use view::{OptionView, PollView, ViewerState};
