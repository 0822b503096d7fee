//! HID aggregation state machine.
//!
//! [`HidState`] is the single owner of the usage tables, the event queue and
//! the report dispatcher. Every input is handled to completion inside
//! [`HidState::handle`], which is the only entry point.

use crate::config::{HID_EVENT_QUEUE_SIZE, HID_REPORT_EXPIRATION_MS, HID_STATE_ITEM_COUNT};
use crate::dispatch::Dispatcher;
use crate::event::{EventSink, InputEvent, OutputEvent};
use crate::eventq::EventQueue;
use crate::keymap::Keymap;
use crate::stats::DropStats;
use crate::usage::{Update, UsageTable};
use crate::TargetReport;

/// Connection lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No host subscribed. Input is queued.
    Disconnected,
    /// Connected with nothing in flight. Input is applied and reported at once.
    ConnectedIdle,
    /// Connected with a report in flight. Input is queued until it completes.
    ConnectedBusy,
}

type Tables = [UsageTable<HID_STATE_ITEM_COUNT>; TargetReport::COUNT];

/// Aggregation context: turns input events into paced HID reports.
pub struct HidState {
    keymap: Keymap,
    tables: Tables,
    queue: EventQueue<HID_EVENT_QUEUE_SIZE>,
    state: State,
    dispatcher: Dispatcher,
    stats: DropStats,
    initialized: bool,
}

impl HidState {
    /// Create a disconnected state using the configured staleness window.
    pub fn new(keymap: Keymap) -> Self {
        Self::with_expiration(keymap, HID_REPORT_EXPIRATION_MS)
    }

    /// Create a disconnected state with a custom staleness window (ms).
    pub fn with_expiration(keymap: Keymap, expiration_ms: u32) -> Self {
        Self {
            keymap,
            tables: [UsageTable::new(), UsageTable::new(), UsageTable::new()],
            queue: EventQueue::new(expiration_ms),
            state: State::Disconnected,
            dispatcher: Dispatcher::new(),
            stats: DropStats::new(),
            initialized: false,
        }
    }

    /// Process one input event received at `now` (ms).
    ///
    /// Reports and activity pings are pushed into `sink` before returning.
    pub fn handle(&mut self, event: InputEvent, now: u32, sink: &mut impl EventSink) {
        match event {
            InputEvent::Button { key_id, pressed } => {
                let Some((usage_id, target)) = self.keymap.resolve(key_id) else {
                    warn!("No translation found for key {}, button ignored", key_id);
                    self.stats.unmapped_keys = self.stats.unmapped_keys.saturating_add(1);
                    return;
                };
                let delta = if pressed { 1 } else { -1 };
                self.update(target, usage_id, delta, now, sink);
                sink.submit(OutputEvent::ActivityPing);
            }
            InputEvent::Motion { dx, dy } => {
                self.dispatcher.add_motion(dx, dy);
                if self.state == State::ConnectedIdle {
                    self.send(TargetReport::Mouse, sink);
                }
                sink.submit(OutputEvent::ActivityPing);
            }
            InputEvent::Wheel { wheel } => {
                self.dispatcher.add_wheel(wheel);
                if self.state == State::ConnectedIdle {
                    self.send(TargetReport::Mouse, sink);
                }
                sink.submit(OutputEvent::ActivityPing);
            }
            InputEvent::ReportSent(target) => self.report_sent(target, sink),
            InputEvent::Subscription { enabled: true } => self.connect(now, sink),
            InputEvent::Subscription { enabled: false } => self.disconnect(),
            InputEvent::Ready => self.init(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Usage table for `target`.
    pub fn table(&self, target: TargetReport) -> &UsageTable<HID_STATE_ITEM_COUNT> {
        &self.tables[target.index()]
    }

    pub fn queue(&self) -> &EventQueue<HID_EVENT_QUEUE_SIZE> {
        &self.queue
    }

    /// Reports of kind `target` not acknowledged yet.
    pub fn in_flight(&self, target: TargetReport) -> u32 {
        self.dispatcher.in_flight(target)
    }

    /// Motion and wheel accumulated since the last mouse report.
    pub fn pending_motion(&self) -> (i32, i32, i32) {
        self.dispatcher.pending_motion()
    }

    pub fn stats(&self) -> &DropStats {
        &self.stats
    }

    fn init(&mut self) {
        assert!(!self.initialized, "HID state initialized twice");
        self.initialized = true;

        info!("Init HID state!");
        self.queue.reset();
    }

    fn connect(&mut self, now: u32, sink: &mut impl EventSink) {
        if self.state != State::Disconnected {
            warn!("Subscription enabled while already connected, ignored");
            return;
        }

        info!("HID report subscription enabled");
        self.dispatcher.clear_motion();

        if !self.queue.is_empty() {
            let purged = self.queue.cleanup(now);
            self.stats.record_purged(purged);
        }

        if self.queue.is_empty() {
            self.state = State::ConnectedIdle;
        } else {
            self.state = State::ConnectedBusy;
            self.drain(sink);
        }
    }

    fn disconnect(&mut self) {
        // A failed connection attempt also ends up here.
        if self.state == State::Disconnected {
            return;
        }

        info!("HID report subscription disabled");
        self.state = State::Disconnected;
        self.clear_tables();
        self.queue.reset();
        self.dispatcher.reset_in_flight();
    }

    fn report_sent(&mut self, target: TargetReport, sink: &mut impl EventSink) {
        if self.dispatcher.in_flight(target) == 0 {
            warn!("Report sent without one in flight, ignored");
            return;
        }

        if self.state != State::Disconnected {
            self.drain(sink);
        }
        self.dispatcher.acknowledge(target);
    }

    /// Apply a usage change now, or queue it if it cannot be reported yet.
    fn update(
        &mut self,
        target: TargetReport,
        usage_id: u16,
        delta: i16,
        now: u32,
        sink: &mut impl EventSink,
    ) {
        match self.state {
            State::ConnectedIdle => {
                if self.apply(target, usage_id, delta) {
                    self.send(target, sink);
                }
            }
            State::Disconnected | State::ConnectedBusy => {
                let aggressive = self.state == State::Disconnected;
                let outcome = self.queue.enqueue(target, usage_id, delta, now, aggressive);

                self.stats.record_purged(outcome.purged);
                if outcome.reset {
                    self.stats.hard_resets = self.stats.hard_resets.saturating_add(1);
                    self.clear_tables();
                }
                if !outcome.queued {
                    self.stats.queue_push_failed = self.stats.queue_push_failed.saturating_add(1);
                }
            }
        }
    }

    /// Feed queued events into the tables until one changes a report.
    ///
    /// With nothing left to apply the state becomes idle, but pending mouse
    /// motion still gets its report.
    fn drain(&mut self, sink: &mut impl EventSink) {
        while let Some(event) = self.queue.drain_one() {
            if self.apply(event.target, event.usage.usage_id, event.usage.value) {
                self.send(event.target, sink);
                return;
            }
        }

        self.state = State::ConnectedIdle;
        if self.dispatcher.has_pending_motion() {
            self.send(TargetReport::Mouse, sink);
        }
    }

    fn apply(&mut self, target: TargetReport, usage_id: u16, delta: i16) -> bool {
        match self.tables[target.index()].apply(usage_id, delta) {
            Update::Changed => true,
            Update::OrphanRelease => false,
            Update::TableFull => {
                self.stats.table_full = self.stats.table_full.saturating_add(1);
                false
            }
        }
    }

    fn send(&mut self, target: TargetReport, sink: &mut impl EventSink) {
        self.dispatcher.send(target, &self.tables, sink);
        self.state = State::ConnectedBusy;
    }

    fn clear_tables(&mut self) {
        for table in self.tables.iter_mut() {
            table.clear();
        }
    }
}
