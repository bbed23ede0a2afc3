//! Timer core. [collection::TimerCollection] owns every [timer::ProjectTimer] and makes sure only
//! one of them runs at a time, [schedule::TickScheduler] decides when each of them ticks.

use std::fmt::Display;

pub mod collection;
pub mod schedule;
pub mod summary;
pub mod timer;

/// Identity of a timer inside its collection. Project ids are user input and can repeat, so they
/// can't be used for this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
