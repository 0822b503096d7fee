//! Events consumed and produced by the HID state.

use crate::hid::HidReport;
use crate::TargetReport;

/// Everything the HID state reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    /// A key or button changed state.
    Button { key_id: u16, pressed: bool },
    /// Relative pointer motion from the motion sensor.
    Motion { dx: i16, dy: i16 },
    /// Scroll wheel rotation.
    Wheel { wheel: i16 },
    /// The transport finished sending a report of this kind.
    ReportSent(TargetReport),
    /// The host enabled or disabled report notifications.
    Subscription { enabled: bool },
    /// The system finished booting. Must arrive exactly once.
    Ready,
}

/// Everything the HID state emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputEvent {
    /// A report to hand to the transport.
    Report(HidReport),
    /// User input was accepted; the device should stay awake.
    ActivityPing,
}

/// Receiver of [`OutputEvent`]s.
///
/// `submit` is called from inside event handling and must not block.
pub trait EventSink {
    fn submit(&mut self, event: OutputEvent);
}

impl<const N: usize> EventSink for heapless::Vec<OutputEvent, N> {
    fn submit(&mut self, event: OutputEvent) {
        if self.push(event).is_err() {
            warn!("Output buffer full, event dropped");
        }
    }
}
