//! Application-wide constants and compile-time configuration.
//!
//! Table sizes, timing parameters and the board keymap live here so they
//! can be tuned in one place.

use crate::keymap::KeymapEntry;
use crate::TargetReport;

// HID state

/// Maximum number of usages tracked at once per target report.
///
/// Must cover the maximum number of simultaneously pressed keys, otherwise
/// presses beyond this count are dropped.
pub const HID_STATE_ITEM_COUNT: usize = 10;

/// Number of input events that can wait for a connection or a free link.
pub const HID_EVENT_QUEUE_SIZE: usize = 12;

/// Age (ms) after which a queued event may be purged.
pub const HID_REPORT_EXPIRATION_MS: u32 = 500;

/// Key slots in a keyboard report (6KRO boot layout).
pub const KEYBOARD_REPORT_KEY_COUNT: usize = 6;

/// Highest mouse button usage that fits in the button bitmap.
pub const MOUSE_BUTTON_COUNT: u16 = 8;

// Firmware channels

/// Depth of the channel carrying input events into the HID state task.
pub const INPUT_CHANNEL_SIZE: usize = 16;

/// Depth of the channel carrying produced reports to the transport.
pub const OUTPUT_CHANNEL_SIZE: usize = 16;

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "hid-state";
pub const USB_PRODUCT: &str = "HID State Keyboard/Mouse";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 1;

// GPIO buttons (nRF52840-DK defaults)
//
//   Button 1 → P0.11  key id 0x0001 (mouse left)
//   Button 2 → P0.12  key id 0x0002 (mouse right)
//   Button 3 → P0.24  key id 0x0004 (keyboard 'a')
//   Button 4 → P0.25  key id 0x0005 (keyboard 'b')

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 20;

/// Inactivity timeout before the power manager drops to idle (seconds).
pub const IDLE_TIMEOUT_SECS: u64 = 60;

// Keymap

/// Key id → HID usage table for the board. Must be sorted by key id.
pub const DEFAULT_KEYMAP: &[KeymapEntry] = &[
    KeymapEntry::new(0x0001, 0x01, TargetReport::Mouse),
    KeymapEntry::new(0x0002, 0x02, TargetReport::Mouse),
    KeymapEntry::new(0x0003, 0x03, TargetReport::Mouse),
    KeymapEntry::new(0x0004, 0x04, TargetReport::Keyboard),
    KeymapEntry::new(0x0005, 0x05, TargetReport::Keyboard),
    KeymapEntry::new(0x0006, 0x06, TargetReport::Keyboard),
    KeymapEntry::new(0x0007, 0x28, TargetReport::Keyboard),
    KeymapEntry::new(0x0008, 0x2C, TargetReport::Keyboard),
];
