//! Unified error type for hid-state.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Configuration and transport errors.
///
/// Runtime input problems (full tables, stale queue entries, orphaned
/// releases) are not errors: they are logged, counted and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Keymap
    /// Key ids are not strictly ascending at `index`.
    UnsortedKeymap { index: usize },

    /// The entry targets a report kind the dispatcher cannot render.
    UnsupportedTarget { key_id: u16 },

    /// The usage id cannot be represented in its target report.
    InvalidUsage { key_id: u16, usage_id: u16 },

    // USB
    /// USB endpoint write failed.
    Usb,
}
