//! Host-testable library interface for hid-state.
//!
//! Everything that decides *what* to report and *when* lives here and builds
//! without embedded hardware. The firmware binary (`main.rs`, feature
//! `embedded`) only wires these types to USB, GPIO and the executor.
//!
//! Usage: `cargo test`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main].

#![cfg_attr(not(test), no_std)]

// fmt must come first so its macros are visible to every module below.
#[macro_use]
mod fmt;

// ═══════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod eventq;
pub mod hid;
pub mod keymap;
pub mod state;
pub mod stats;
pub mod usage;

pub use error::Error;
pub use event::{EventSink, InputEvent, OutputEvent};
pub use hid::{HidReport, KeyboardReport, MouseReport, TargetReport};
pub use keymap::{Keymap, KeymapEntry};
pub use state::{HidState, State};
pub use stats::DropStats;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - whole pipeline from input event to serialized report
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_KEYMAP, HID_EVENT_QUEUE_SIZE, HID_REPORT_EXPIRATION_MS};
    use crate::hid::keyboard::KEYBOARD_REPORT_SIZE;
    use crate::hid::mouse::MOUSE_REPORT_SIZE;

    type Sink = heapless::Vec<OutputEvent, 64>;

    fn ready_state() -> (HidState, Sink) {
        let keymap = Keymap::new(DEFAULT_KEYMAP).unwrap();
        let mut hs = HidState::new(keymap);
        let mut sink = Sink::new();
        hs.handle(InputEvent::Ready, 0, &mut sink);
        (hs, sink)
    }

    fn serialized(sink: &Sink) -> std::vec::Vec<std::vec::Vec<u8>> {
        sink.iter()
            .filter_map(|e| match e {
                OutputEvent::Report(r) => {
                    let mut buf = [0u8; 8];
                    let len = r.serialize(&mut buf);
                    Some(buf[..len].to_vec())
                }
                OutputEvent::ActivityPing => None,
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════════════════
    // Default keymap
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn default_keymap_is_valid() {
        let keymap = Keymap::new(DEFAULT_KEYMAP).unwrap();
        assert_eq!(keymap.len(), DEFAULT_KEYMAP.len());
        assert_eq!(keymap.resolve(0x0004), Some((0x04, TargetReport::Keyboard)));
        assert_eq!(keymap.resolve(0x0001), Some((0x01, TargetReport::Mouse)));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Pipeline to bytes
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn key_press_reaches_the_wire_as_boot_keyboard_report() {
        let (mut hs, mut sink) = ready_state();
        hs.handle(InputEvent::Subscription { enabled: true }, 1, &mut sink);
        hs.handle(
            InputEvent::Button {
                key_id: 0x0007,
                pressed: true,
            },
            2,
            &mut sink,
        );

        let frames = serialized(&sink);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].len(), KEYBOARD_REPORT_SIZE);
        assert_eq!(frames[0], [0x00u8, 0x00, 0x28, 0, 0, 0, 0, 0]);
        for filler in &frames[1..] {
            assert_eq!(filler.len(), MOUSE_REPORT_SIZE);
            assert_eq!(filler[..], [0u8; MOUSE_REPORT_SIZE]);
        }
    }

    #[test]
    fn button_and_motion_share_one_mouse_report() {
        let (mut hs, mut sink) = ready_state();
        hs.handle(InputEvent::Subscription { enabled: true }, 1, &mut sink);
        hs.handle(
            InputEvent::Button {
                key_id: 0x0002,
                pressed: true,
            },
            2,
            &mut sink,
        );
        hs.handle(InputEvent::Motion { dx: -2, dy: 260 }, 3, &mut sink);

        sink.clear();
        hs.handle(InputEvent::ReportSent(TargetReport::Mouse), 4, &mut sink);

        let frames = serialized(&sink);
        assert_eq!(frames, [[0x02u8, 0xFE, 0xFF, 0x04, 0x01, 0x00].to_vec()]);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Drop statistics
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn overflow_reset_is_counted() {
        let (mut hs, mut sink) = ready_state();
        // Four keyboard keys, pressed again and again without release.
        let keys = [0x0004, 0x0005, 0x0006, 0x0007];
        for i in 0..=HID_EVENT_QUEUE_SIZE {
            hs.handle(
                InputEvent::Button {
                    key_id: keys[i % keys.len()],
                    pressed: true,
                },
                i as u32,
                &mut sink,
            );
        }

        assert_eq!(hs.stats().hard_resets, 1);
        assert_eq!(hs.queue().len(), 1);
    }

    #[test]
    fn stale_pairs_are_counted_as_purged() {
        let (mut hs, mut sink) = ready_state();
        for (key_id, pressed, now) in [(0x0004, true, 0), (0x0004, false, 10)] {
            hs.handle(InputEvent::Button { key_id, pressed }, now, &mut sink);
        }

        hs.handle(
            InputEvent::Subscription { enabled: true },
            10 + HID_REPORT_EXPIRATION_MS,
            &mut sink,
        );

        assert_eq!(hs.state(), State::ConnectedIdle);
        assert_eq!(hs.stats().purged, 2);
        assert_eq!(hs.stats().total_dropped(), 2);
    }
}
