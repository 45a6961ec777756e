//! Discrete-event timer service.
//!
//! Time only moves when the session waits for a tick. Timeouts are kept in a
//! min-heap keyed by deadline; cancelling a timeout just forgets its handle and
//! the stale heap entry is skipped when it surfaces.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::thread;
use std::time::Duration;

use arq_lab_abstract::Pacing;
use tracing::debug;

/// Identifies one scheduled timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Deadline {
    at: u64,
    id: u64,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.id == other.id
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earliest deadline is the greatest so BinaryHeap pops it first
        other.at.cmp(&self.at).then_with(|| other.id.cmp(&self.id))
    }
}

pub struct TimerService {
    now_ms: u64,
    tick_ms: u64,
    pacing: Pacing,
    next_id: u64,
    queue: BinaryHeap<Deadline>,
    live: HashSet<u64>,
}

impl TimerService {
    pub fn new(tick_ms: u64, pacing: Pacing) -> Self {
        Self {
            now_ms: 0,
            tick_ms,
            pacing,
            next_id: 0,
            queue: BinaryHeap::new(),
            live: HashSet::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    pub fn schedule_timeout(&mut self, delay_ms: u64) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(Deadline {
            at: self.now_ms + delay_ms,
            id,
        });
        self.live.insert(id);
        debug!("Timer {} armed for {} ms (at {} ms)", id, delay_ms, self.now_ms + delay_ms);
        TimerHandle(id)
    }

    /// Returns `false` when the handle already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let cancelled = self.live.remove(&handle.0);
        if cancelled {
            debug!("Timer {} cancelled", handle.0);
        }
        cancelled
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.live.contains(&handle.0)
    }

    /// Wait one quantum and return the timeouts that expired during it.
    pub fn wait_tick(&mut self) -> Vec<TimerHandle> {
        if self.pacing == Pacing::RealTime {
            thread::sleep(Duration::from_millis(self.tick_ms));
        }
        self.now_ms += self.tick_ms;

        let mut fired = Vec::new();
        while let Some(top) = self.queue.peek() {
            if top.at > self.now_ms {
                break;
            }
            let Some(deadline) = self.queue.pop() else {
                break;
            };
            // Cancelled entries are no longer live and are skipped here.
            if self.live.remove(&deadline.id) {
                debug!("Timer {} expired at {} ms", deadline.id, self.now_ms);
                fired.push(TimerHandle(deadline.id));
            }
        }
        fired
    }
}
