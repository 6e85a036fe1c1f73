use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a user: poll creators, voters and requesters.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Id(pub Uuid);
impl Id {
    pub const fn nil() -> Id {
        Id(Uuid::nil())
    }
    pub fn new() -> Id {
        Id(Uuid::new_v4())
    }
}
impl Default for Id {
    fn default() -> Self {
        Id::nil()
    }
}
impl Display for Id {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// Store-allocated poll identifier, monotonically increasing in creation order.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(pub i32);
impl Display for PollId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// Ordinal of an option within its poll.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeakId(pub u32);
impl Display for WeakId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl PartialEq<u32> for WeakId {
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}
