//! HID report types produced by the aggregation state.

pub mod keyboard;
pub mod mouse;

pub use keyboard::KeyboardReport;
pub use mouse::MouseReport;

/// Outgoing HID report a usage belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TargetReport {
    Keyboard,
    Mouse,
    /// Reserved for media-player controls; not rendered.
    MediaPlayer,
}

impl TargetReport {
    /// Number of target report kinds.
    pub const COUNT: usize = 3;

    /// Slot of this kind in per-report arrays.
    pub const fn index(self) -> usize {
        match self {
            TargetReport::Keyboard => 0,
            TargetReport::Mouse => 1,
            TargetReport::MediaPlayer => 2,
        }
    }
}

/// A rendered report ready for the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReport {
    Keyboard(KeyboardReport),
    Mouse(MouseReport),
}

impl HidReport {
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match self {
            HidReport::Keyboard(k) => k.serialize(buf),
            HidReport::Mouse(m) => m.serialize(buf),
        }
    }

    /// Report kind to acknowledge once the transport has sent it.
    pub fn target(&self) -> TargetReport {
        match self {
            HidReport::Keyboard(_) => TargetReport::Keyboard,
            HidReport::Mouse(_) => TargetReport::Mouse,
        }
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self, HidReport::Keyboard(_))
    }

    pub fn is_mouse(&self) -> bool {
        matches!(self, HidReport::Mouse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_indices_are_distinct() {
        let indices = [
            TargetReport::Keyboard.index(),
            TargetReport::Mouse.index(),
            TargetReport::MediaPlayer.index(),
        ];
        assert_eq!(indices, [0, 1, 2]);
        assert!(indices.iter().all(|&i| i < TargetReport::COUNT));
    }

    #[test]
    fn hid_report_serialize_keyboard() {
        let report = HidReport::Keyboard(KeyboardReport {
            modifier: 0,
            reserved: 0,
            keycodes: [0x04, 0, 0, 0, 0, 0],
        });
        let mut buf = [0u8; 8];
        assert_eq!(report.serialize(&mut buf), 8);
        assert_eq!(buf[2], 0x04);
        assert_eq!(report.target(), TargetReport::Keyboard);
    }

    #[test]
    fn hid_report_type_checks() {
        let kb = HidReport::Keyboard(KeyboardReport::empty());
        assert!(kb.is_keyboard());
        assert!(!kb.is_mouse());

        let mouse = HidReport::Mouse(MouseReport::empty());
        assert!(mouse.is_mouse());
        assert!(!mouse.is_keyboard());
        assert_eq!(mouse.target(), TargetReport::Mouse);
    }
}
