//! Key id → HID usage translation.
//!
//! The board supplies a static table sorted by key id. Sorting is checked
//! once when the [`Keymap`] is built, lookups are a binary search.

use crate::config::MOUSE_BUTTON_COUNT;
use crate::error::Error;
use crate::TargetReport;

/// One row of the board keymap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeymapEntry {
    /// Hardware key id reported by the button driver.
    pub key_id: u16,
    /// HID usage id the key produces.
    pub usage_id: u16,
    /// Report the usage belongs to.
    pub target: TargetReport,
}

impl KeymapEntry {
    pub const fn new(key_id: u16, usage_id: u16, target: TargetReport) -> Self {
        Self {
            key_id,
            usage_id,
            target,
        }
    }
}

/// Validated, sorted keymap.
#[derive(Clone, Copy, Debug)]
pub struct Keymap {
    entries: &'static [KeymapEntry],
}

impl Keymap {
    /// Validate `entries` and wrap them for lookup.
    ///
    /// Fails if key ids are not strictly ascending or if an entry cannot be
    /// rendered into its target report.
    pub fn new(entries: &'static [KeymapEntry]) -> Result<Self, Error> {
        for (index, pair) in entries.windows(2).enumerate() {
            if pair[0].key_id >= pair[1].key_id {
                return Err(Error::UnsortedKeymap { index: index + 1 });
            }
        }

        for entry in entries {
            let valid = match entry.target {
                TargetReport::Keyboard => entry.usage_id != 0 && entry.usage_id <= 0xFF,
                TargetReport::Mouse => (1..=MOUSE_BUTTON_COUNT).contains(&entry.usage_id),
                TargetReport::MediaPlayer => {
                    return Err(Error::UnsupportedTarget {
                        key_id: entry.key_id,
                    })
                }
            };
            if !valid {
                return Err(Error::InvalidUsage {
                    key_id: entry.key_id,
                    usage_id: entry.usage_id,
                });
            }
        }

        Ok(Self { entries })
    }

    /// Translate a key id into its usage and target report.
    pub fn resolve(&self, key_id: u16) -> Option<(u16, TargetReport)> {
        self.entries
            .binary_search_by_key(&key_id, |entry| entry.key_id)
            .ok()
            .map(|idx| {
                let entry = &self.entries[idx];
                (entry.usage_id, entry.target)
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
