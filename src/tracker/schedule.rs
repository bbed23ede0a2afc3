use std::{collections::HashMap, future::poll_fn, time::Duration};

use tokio_util::time::{delay_queue::Key, DelayQueue};
use tracing::trace;

use super::TimerId;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Holds at most one pending tick per timer.
///
/// A tick is not re-armed automatically. Whoever receives it from [TickScheduler::next_due] is
/// expected to process it and call [TickScheduler::schedule] again, which keeps ticks of one timer
/// strictly sequential. Cancelling a timer drops its pending tick, so nothing fires for a timer
/// that no longer exists.
pub struct TickScheduler {
    queue: DelayQueue<TimerId>,
    pending: HashMap<TimerId, Key>,
    interval: Duration,
}

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            queue: DelayQueue::new(),
            pending: HashMap::new(),
            interval,
        }
    }

    /// Arms the next tick of `id` one interval from now. Does nothing if a tick is already
    /// pending, so a timer never ends up with two tick chains.
    pub fn schedule(&mut self, id: TimerId) {
        if self.pending.contains_key(&id) {
            return;
        }
        let key = self.queue.insert(id, self.interval);
        self.pending.insert(id, key);
        trace!("Scheduled tick for {id}");
    }

    /// Returns true if there was a pending tick.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.pending.remove(&id) {
            Some(key) => {
                self.queue.remove(&key);
                trace!("Cancelled tick for {id}");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Waits for the next due tick. Resolves to `None` right away when nothing is scheduled.
    ///
    /// This is cancel safe, a tick is only taken out of the queue once it is returned.
    pub async fn next_due(&mut self) -> Option<TimerId> {
        let expired = poll_fn(|cx| self.queue.poll_expired(cx)).await?;
        let id = expired.into_inner();
        self.pending.remove(&id);
        Some(id)
    }
}
