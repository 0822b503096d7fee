//! Report rendering and in-flight tracking.
//!
//! Turns the usage tables into keyboard and mouse reports, owns the mouse
//! motion accumulated between mouse reports, and counts reports the
//! transport has not acknowledged yet.

use crate::config::{KEYBOARD_REPORT_KEY_COUNT, MOUSE_BUTTON_COUNT};
use crate::event::{EventSink, OutputEvent};
use crate::hid::{HidReport, KeyboardReport, MouseReport};
use crate::usage::UsageTable;
use crate::TargetReport;

/// Renders reports and tracks how many of each kind are in flight.
#[derive(Clone, Debug, Default)]
pub struct Dispatcher {
    in_flight: [u32; TargetReport::COUNT],
    dx: i32,
    dy: i32,
    wheel: i32,
}

impl Dispatcher {
    pub const fn new() -> Self {
        Self {
            in_flight: [0; TargetReport::COUNT],
            dx: 0,
            dy: 0,
            wheel: 0,
        }
    }

    /// Render and submit a report of kind `target`.
    ///
    /// Whenever a report leaves its kind with exactly one in flight, an
    /// extra mouse report follows so the link has a report to sample on
    /// every connection event. A filler can itself trigger one more; the
    /// chain stops once two mouse reports are in flight.
    pub fn send<const N: usize>(
        &mut self,
        target: TargetReport,
        tables: &[UsageTable<N>; TargetReport::COUNT],
        sink: &mut impl EventSink,
    ) {
        let mut next = Some(target);
        while let Some(target) = next {
            self.send_one(target, tables, sink);
            next = (self.in_flight[target.index()] == 1).then_some(TargetReport::Mouse);
        }
    }

    fn send_one<const N: usize>(
        &mut self,
        target: TargetReport,
        tables: &[UsageTable<N>; TargetReport::COUNT],
        sink: &mut impl EventSink,
    ) {
        let report = match target {
            TargetReport::Keyboard => {
                HidReport::Keyboard(render_keyboard(&tables[TargetReport::Keyboard.index()]))
            }
            TargetReport::Mouse => {
                let report = self.render_mouse(&tables[TargetReport::Mouse.index()]);
                self.clear_motion();
                HidReport::Mouse(report)
            }
            TargetReport::MediaPlayer => panic!("Media player reports are not supported"),
        };

        trace!("Sending {:?}", report);
        sink.submit(OutputEvent::Report(report));
        let count = &mut self.in_flight[target.index()];
        *count = count.saturating_add(1);
    }

    /// Mark one report of kind `target` as delivered.
    ///
    /// Returns `false` if no report of that kind was in flight.
    pub fn acknowledge(&mut self, target: TargetReport) -> bool {
        let count = &mut self.in_flight[target.index()];
        match count.checked_sub(1) {
            Some(remaining) => {
                *count = remaining;
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self, target: TargetReport) -> u32 {
        self.in_flight[target.index()]
    }

    /// Forget all in-flight reports.
    pub fn reset_in_flight(&mut self) {
        self.in_flight = [0; TargetReport::COUNT];
    }

    pub fn add_motion(&mut self, dx: i16, dy: i16) {
        self.dx = self.dx.saturating_add(i32::from(dx));
        self.dy = self.dy.saturating_add(i32::from(dy));
    }

    pub fn add_wheel(&mut self, wheel: i16) {
        self.wheel = self.wheel.saturating_add(i32::from(wheel));
    }

    /// Motion or wheel rotation not reported yet.
    pub fn has_pending_motion(&self) -> bool {
        self.dx != 0 || self.dy != 0 || self.wheel != 0
    }

    /// Accumulated `(dx, dy, wheel)`.
    pub fn pending_motion(&self) -> (i32, i32, i32) {
        (self.dx, self.dy, self.wheel)
    }

    pub fn clear_motion(&mut self) {
        self.dx = 0;
        self.dy = 0;
        self.wheel = 0;
    }

    fn render_mouse<const N: usize>(&self, table: &UsageTable<N>) -> MouseReport {
        let buttons = table.iter().fold(0u8, |bm, item| {
            assert!(
                (1..=MOUSE_BUTTON_COUNT).contains(&item.usage_id),
                "Mouse button usage out of range"
            );
            bm | (1 << (item.usage_id - 1))
        });

        MouseReport {
            buttons,
            x: clamp_i16(self.dx),
            y: clamp_i16(self.dy),
            wheel: clamp_i16(self.wheel),
        }
    }
}

/// Keyboard report from the highest tracked usages down.
pub fn render_keyboard<const N: usize>(table: &UsageTable<N>) -> KeyboardReport {
    let mut report = KeyboardReport::empty();
    for (slot, item) in report
        .keycodes
        .iter_mut()
        .zip(table.iter().rev().take(KEYBOARD_REPORT_KEY_COUNT))
    {
        assert!(item.usage_id <= 0xFF, "Keyboard usage exceeds 8 bits");
        *slot = item.usage_id as u8;
    }
    report
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::OutputEvent;

    type Tables = [UsageTable<4>; TargetReport::COUNT];

    fn tables() -> Tables {
        [UsageTable::new(), UsageTable::new(), UsageTable::new()]
    }

    fn reports(sink: &heapless::Vec<OutputEvent, 8>) -> std::vec::Vec<HidReport> {
        sink.iter()
            .filter_map(|e| match e {
                OutputEvent::Report(r) => Some(*r),
                OutputEvent::ActivityPing => None,
            })
            .collect()
    }

    #[test]
    fn keyboard_report_lists_highest_usages_first() {
        let mut table = UsageTable::<8>::new();
        for usage in [0x04, 0x1E, 0x05] {
            table.apply(usage, 1);
        }
        let report = render_keyboard(&table);
        assert_eq!(report.keycodes, [0x1E, 0x05, 0x04, 0, 0, 0]);
        assert_eq!(report.modifier, 0);
    }

    #[test]
    fn keyboard_report_is_limited_to_six_keys() {
        let mut table = UsageTable::<8>::new();
        for usage in 0x04..0x0C {
            table.apply(usage, 1);
        }
        let report = render_keyboard(&table);
        assert_eq!(report.keycodes, [0x0B, 0x0A, 0x09, 0x08, 0x07, 0x06]);
    }

    #[test]
    fn first_keyboard_report_chains_two_mouse_reports() {
        let mut tables = tables();
        tables[TargetReport::Keyboard.index()].apply(0x04, 1);
        let mut dispatcher = Dispatcher::new();
        let mut sink = heapless::Vec::<OutputEvent, 8>::new();

        dispatcher.send(TargetReport::Keyboard, &tables, &mut sink);

        let sent = reports(&sink);
        assert_eq!(sent.len(), 3);
        assert!(sent[0].is_keyboard());
        assert!(sent[1].is_mouse());
        assert!(sent[2].is_mouse());
        assert_eq!(dispatcher.in_flight(TargetReport::Keyboard), 1);
        assert_eq!(dispatcher.in_flight(TargetReport::Mouse), 2);

        // Second keyboard report: nothing extra.
        dispatcher.send(TargetReport::Keyboard, &tables, &mut sink);
        assert_eq!(reports(&sink).len(), 4);
        assert_eq!(dispatcher.in_flight(TargetReport::Keyboard), 2);
    }

    #[test]
    fn keyboard_report_adds_one_mouse_report_when_mouse_is_in_flight() {
        let tables = tables();
        let mut dispatcher = Dispatcher::new();
        let mut sink = heapless::Vec::<OutputEvent, 8>::new();
        dispatcher.send(TargetReport::Mouse, &tables, &mut sink);
        assert_eq!(dispatcher.in_flight(TargetReport::Mouse), 2);
        assert!(dispatcher.acknowledge(TargetReport::Mouse));
        sink.clear();

        dispatcher.send(TargetReport::Keyboard, &tables, &mut sink);

        let sent = reports(&sink);
        assert_eq!(sent.len(), 2);
        assert!(sent[1].is_mouse());
        assert_eq!(dispatcher.in_flight(TargetReport::Mouse), 2);
    }

    #[test]
    fn mouse_report_carries_and_clears_motion() {
        let mut tables = tables();
        tables[TargetReport::Mouse.index()].apply(1, 1);
        tables[TargetReport::Mouse.index()].apply(3, 1);
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_motion(5, -3);
        dispatcher.add_motion(1, 1);
        dispatcher.add_wheel(2);
        assert!(dispatcher.has_pending_motion());
        let mut sink = heapless::Vec::<OutputEvent, 8>::new();

        dispatcher.send(TargetReport::Mouse, &tables, &mut sink);

        let sent = reports(&sink);
        assert_eq!(
            sent[0],
            HidReport::Mouse(MouseReport {
                buttons: 0b101,
                x: 6,
                y: -2,
                wheel: 2
            })
        );
        // Pipeline filler only repeats the buttons.
        assert_eq!(
            sent[1],
            HidReport::Mouse(MouseReport {
                buttons: 0b101,
                ..MouseReport::empty()
            })
        );
        assert!(!dispatcher.has_pending_motion());
        assert_eq!(dispatcher.in_flight(TargetReport::Mouse), 2);
    }

    #[test]
    fn motion_is_clamped_to_report_range() {
        let tables = tables();
        let mut dispatcher = Dispatcher::new();
        for _ in 0..3 {
            dispatcher.add_motion(i16::MAX, i16::MIN);
        }
        let mut sink = heapless::Vec::<OutputEvent, 8>::new();
        dispatcher.send(TargetReport::Mouse, &tables, &mut sink);

        match reports(&sink)[0] {
            HidReport::Mouse(m) => {
                assert_eq!(m.x, i16::MAX);
                assert_eq!(m.y, i16::MIN);
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn acknowledge_counts_down() {
        let tables = tables();
        let mut dispatcher = Dispatcher::new();
        let mut sink = heapless::Vec::<OutputEvent, 8>::new();
        dispatcher.send(TargetReport::Keyboard, &tables, &mut sink);

        assert!(dispatcher.acknowledge(TargetReport::Keyboard));
        assert!(!dispatcher.acknowledge(TargetReport::Keyboard));
        assert_eq!(dispatcher.in_flight(TargetReport::Keyboard), 0);

        dispatcher.reset_in_flight();
        assert_eq!(dispatcher.in_flight(TargetReport::Mouse), 0);
    }

    #[test]
    #[should_panic]
    fn media_player_report_is_fatal() {
        let tables = tables();
        let mut dispatcher = Dispatcher::new();
        let mut sink = heapless::Vec::<OutputEvent, 8>::new();
        dispatcher.send(TargetReport::MediaPlayer, &tables, &mut sink);
    }

    #[test]
    #[should_panic]
    fn mouse_usage_above_eight_is_fatal() {
        let mut tables = tables();
        tables[TargetReport::Mouse.index()].apply(9, 1);
        let mut dispatcher = Dispatcher::new();
        let mut sink = heapless::Vec::<OutputEvent, 8>::new();
        dispatcher.send(TargetReport::Mouse, &tables, &mut sink);
    }
}
