//! Time-bounded queue of pending usage updates.
//!
//! Input that cannot be applied yet (no connection, or a report still in
//! flight) waits here in arrival order. Old entries are purged, but only in
//! batches where every key-down is matched by its key-up inside the same
//! batch: dropping a press without its release would leave the key stuck
//! down on the host once the queue is replayed.

use heapless::Deque;

use crate::usage::Usage;
use crate::TargetReport;

/// One queued usage update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueuedEvent {
    /// Report the usage belongs to.
    pub target: TargetReport,
    /// Usage id and the delta to apply (+1 press, -1 release).
    pub usage: Usage,
    /// Arrival time in milliseconds.
    pub timestamp: u32,
}

/// What happened while enqueueing an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnqueueOutcome {
    /// Stale events purged to make room.
    pub purged: usize,
    /// The queue had to be dropped entirely; usage tables must be cleared too.
    pub reset: bool,
    /// The new event was stored.
    pub queued: bool,
}

/// Bounded FIFO of [`QueuedEvent`]s, oldest first.
pub struct EventQueue<const N: usize> {
    events: Deque<QueuedEvent, N>,
    expiration_ms: u32,
}

impl<const N: usize> EventQueue<N> {
    /// Create an empty queue whose entries go stale after `expiration_ms`.
    pub const fn new(expiration_ms: u32) -> Self {
        Self {
            events: Deque::new(),
            expiration_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.is_full()
    }

    pub fn expiration_ms(&self) -> u32 {
        self.expiration_ms
    }

    /// Queued events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedEvent> + '_ {
        self.events.iter()
    }

    /// Drop every queued event.
    pub fn reset(&mut self) {
        self.events.clear();
    }

    /// Take the oldest event.
    pub fn drain_one(&mut self) -> Option<QueuedEvent> {
        self.events.pop_front()
    }

    /// Append an update received at `now`.
    ///
    /// Stale events are purged first. If the queue is still full and
    /// `aggressive` is set (nothing has been reported yet), cleanup is
    /// retried as if time had advanced to each queued event's expiry. As a
    /// last resort the whole queue is dropped and the caller must clear its
    /// usage tables to stay consistent.
    pub fn enqueue(
        &mut self,
        target: TargetReport,
        usage_id: u16,
        delta: i16,
        now: u32,
        aggressive: bool,
    ) -> EnqueueOutcome {
        let mut outcome = EnqueueOutcome {
            purged: self.cleanup(now),
            ..Default::default()
        };

        if self.is_full() && aggressive {
            // Nothing is removed unless a pass succeeds, so the positions
            // stay valid until the loop exits.
            for idx in 0..self.len() {
                let Some(timestamp) = self.events.iter().nth(idx).map(|e| e.timestamp) else {
                    break;
                };
                outcome.purged += self.cleanup(timestamp.wrapping_add(self.expiration_ms));
                if !self.is_full() {
                    break;
                }
            }
        }

        if self.is_full() {
            warn!("Queue is full, all {} events are dropped!", self.len());
            self.reset();
            outcome.reset = true;
        }

        let event = QueuedEvent {
            target,
            usage: Usage {
                usage_id,
                value: delta,
            },
            timestamp: now,
        };
        outcome.queued = match self.events.push_back(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("Failed to store HID event for usage {}", usage_id);
                false
            }
        };

        outcome
    }

    /// Purge stale events, returning how many were removed.
    ///
    /// Only events older than the expiration window are candidates, and
    /// only as a contiguous prefix of the queue. A candidate press can go
    /// only together with the release that brings its usage back to zero;
    /// the first press whose release is not among the stale events stops
    /// the scan. A release left over after a purged batch is dropped only
    /// as part of a later paired batch.
    pub fn cleanup(&mut self, now: u32) -> usize {
        let expiration = self.expiration_ms;
        let mut first_valid = self
            .events
            .iter()
            .position(|e| now.wrapping_sub(e.timestamp) < expiration)
            .unwrap_or(self.events.len());

        let mut purged = 0;
        // Only the queue head, or the end of a found pair, closes a batch.
        let mut maxfound = Some(0);
        let mut cur = 0;

        while cur < first_valid {
            let Some(event) = self.events.iter().nth(cur).copied() else {
                break;
            };

            if event.usage.value > 0 {
                let mut hits = i32::from(event.usage.value);
                let pair = self
                    .events
                    .iter()
                    .enumerate()
                    .take(first_valid)
                    .skip(cur + 1)
                    .filter(|(_, e)| {
                        e.target == event.target && e.usage.usage_id == event.usage.usage_id
                    })
                    .find_map(|(pos, e)| {
                        hits += i32::from(e.usage.value);
                        (hits == 0).then_some(pos)
                    });

                match pair {
                    Some(pos) => maxfound = maxfound.max(Some(pos)),
                    None => break,
                }
            }

            if maxfound == Some(cur) {
                // Everything up to here is paired and can go.
                let count = cur + 1;
                self.purge_front(count);
                purged += count;
                first_valid -= count;
                maxfound = None;
                cur = 0;
                continue;
            }

            cur += 1;
        }

        if purged > 0 {
            warn!("{} stale events removed from the queue!", purged);
        }
        purged
    }

    fn purge_front(&mut self, count: usize) {
        for _ in 0..count {
            self.events.pop_front();
        }
    }
}
