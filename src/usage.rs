//! Per-report usage table.
//!
//! Each target report owns a small fixed array of `(usage id, value)`
//! pairs. For keys and buttons the value is a reference count: every press
//! adds one, every release subtracts one, and the usage is dropped from the
//! table once it returns to zero.
//!
//! Layout invariant: the array is sorted ascending by usage id. Empty slots
//! carry usage id 0, so they always sit at the low end and the occupied
//! usages form the sorted tail `items[N - count..]`.

/// A single usage and its accumulated value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Usage {
    /// HID usage id, 0 marks an empty slot.
    pub usage_id: u16,
    /// Reference count (buttons, keys) or raw accumulated value.
    pub value: i16,
}

impl Usage {
    pub const EMPTY: Self = Self {
        usage_id: 0,
        value: 0,
    };

    pub const fn is_empty(&self) -> bool {
        self.usage_id == 0
    }
}

/// Result of applying a delta to a [`UsageTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Update {
    /// The usage changed; a report must be issued.
    Changed,
    /// Release of a usage that is not tracked (its press was lost). Ignored.
    OrphanRelease,
    /// New usage could not be recorded because the table is full. Dropped.
    TableFull,
}

impl Update {
    pub const fn is_changed(self) -> bool {
        matches!(self, Update::Changed)
    }
}

/// Fixed-capacity table of active usages for one target report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageTable<const N: usize> {
    items: [Usage; N],
    count: usize,
}

impl<const N: usize> Default for UsageTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> UsageTable<N> {
    pub const fn new() -> Self {
        Self {
            items: [Usage::EMPTY; N],
            count: 0,
        }
    }

    /// Add `delta` to the value of `usage_id`.
    ///
    /// A value reaching zero frees the slot. Values never go negative: a
    /// release for an untracked usage is ignored.
    pub fn apply(&mut self, usage_id: u16, delta: i16) -> Update {
        assert!(usage_id != 0, "usage id 0 is reserved for empty slots");
        debug_assert!(delta != 0, "zero delta brings no change");

        let occupied = N - self.count;
        let found = self.items[occupied..]
            .binary_search_by_key(&usage_id, |item| item.usage_id)
            .ok()
            .map(|idx| idx + occupied);

        let update = match found {
            Some(idx) => {
                let item = &mut self.items[idx];
                item.value = item.value.saturating_add(delta);
                if item.value <= 0 {
                    *item = Usage::EMPTY;
                    self.count -= 1;
                    self.sort();
                }
                Update::Changed
            }
            None if delta < 0 => {
                debug!("Release of untracked usage {}, ignored", usage_id);
                Update::OrphanRelease
            }
            None if self.count >= N => {
                warn!("No place on the list to store HID usage {}!", usage_id);
                Update::TableFull
            }
            None => {
                // Last free slot, right below the occupied tail.
                let idx = N - self.count - 1;
                debug_assert!(self.items[idx].is_empty());
                self.items[idx] = Usage {
                    usage_id,
                    value: delta,
                };
                self.count += 1;
                self.sort();
                Update::Changed
            }
        };

        debug_assert!(self.is_consistent());
        update
    }

    /// Current value of `usage_id`, if tracked.
    pub fn get(&self, usage_id: u16) -> Option<i16> {
        self.iter()
            .find(|item| item.usage_id == usage_id)
            .map(|item| item.value)
    }

    /// Tracked usages, ascending by usage id.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Usage> + '_ {
        self.items[N - self.count..].iter()
    }

    /// Raw slot array including empty slots.
    pub fn as_slice(&self) -> &[Usage] {
        &self.items
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= N
    }

    pub fn clear(&mut self) {
        self.items = [Usage::EMPTY; N];
        self.count = 0;
    }

    fn sort(&mut self) {
        // Usage ids are unique and empty slots are identical, so an
        // unstable sort gives the same order as a stable one.
        self.items.sort_unstable_by_key(|item| item.usage_id);
    }

    fn is_consistent(&self) -> bool {
        let sorted = self
            .items
            .windows(2)
            .all(|w| w[0].usage_id < w[1].usage_id || w[0].is_empty());
        let occupied = self.items.iter().filter(|item| !item.is_empty()).count();
        sorted && occupied == self.count && self.iter().all(|item| item.value > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_inserts_and_release_removes() {
        let mut table = UsageTable::<4>::new();

        assert_eq!(table.apply(0x04, 1), Update::Changed);
        assert_eq!(table.count(), 1);
        assert_eq!(table.get(0x04), Some(1));

        assert_eq!(table.apply(0x04, -1), Update::Changed);
        assert!(table.is_empty());
        assert_eq!(table.get(0x04), None);
        assert!(table.as_slice().iter().all(Usage::is_empty));
    }

    #[test]
    fn value_is_reference_counted() {
        let mut table = UsageTable::<4>::new();

        table.apply(0x05, 1);
        assert_eq!(table.apply(0x05, 1), Update::Changed);
        assert_eq!(table.get(0x05), Some(2));
        assert_eq!(table.count(), 1);

        assert_eq!(table.apply(0x05, -1), Update::Changed);
        assert_eq!(table.get(0x05), Some(1));
        assert_eq!(table.apply(0x05, -1), Update::Changed);
        assert!(table.is_empty());
    }

    #[test]
    fn orphan_release_is_ignored() {
        let mut table = UsageTable::<4>::new();
        table.apply(0x10, 1);

        assert_eq!(table.apply(0x11, -1), Update::OrphanRelease);
        assert!(!Update::OrphanRelease.is_changed());
        assert_eq!(table.count(), 1);
        assert_eq!(table.get(0x11), None);
    }

    #[test]
    fn repeated_orphan_releases_never_go_negative() {
        let mut table = UsageTable::<4>::new();
        for _ in 0..5 {
            assert!(!table.apply(0x04, -1).is_changed());
        }
        assert!(table.is_empty());

        table.apply(0x04, 1);
        assert_eq!(table.get(0x04), Some(1));
    }

    #[test]
    fn table_full_drops_new_usage() {
        let mut table = UsageTable::<3>::new();
        assert_eq!(table.capacity(), 3);
        for usage in [0x07, 0x05, 0x06] {
            assert!(table.apply(usage, 1).is_changed());
        }
        assert!(table.is_full());

        assert_eq!(table.apply(0x08, 1), Update::TableFull);
        assert_eq!(table.count(), 3);
        assert_eq!(table.get(0x08), None);

        // Tracked usages still update while full.
        assert_eq!(table.apply(0x05, 1), Update::Changed);
        assert_eq!(table.get(0x05), Some(2));
    }

    #[test]
    fn occupied_slots_stay_sorted_at_the_high_end() {
        let mut table = UsageTable::<5>::new();
        for usage in [0x30, 0x10, 0x20] {
            table.apply(usage, 1);
        }

        let ids: [u16; 5] = core::array::from_fn(|i| table.as_slice()[i].usage_id);
        assert_eq!(ids, [0, 0, 0x10, 0x20, 0x30]);

        table.apply(0x20, -1);
        let ids: [u16; 5] = core::array::from_fn(|i| table.as_slice()[i].usage_id);
        assert_eq!(ids, [0, 0, 0, 0x10, 0x30]);

        table.apply(0x05, 1);
        let pressed: std::vec::Vec<u16> = table.iter().map(|u| u.usage_id).collect();
        assert_eq!(pressed, [0x05, 0x10, 0x30]);
    }

    #[test]
    fn clear_empties_table() {
        let mut table = UsageTable::<3>::new();
        table.apply(0x01, 1);
        table.apply(0x02, 1);
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table, UsageTable::<3>::new());
    }

    #[test]
    #[should_panic]
    fn usage_zero_is_rejected() {
        let mut table = UsageTable::<3>::new();
        table.apply(0, 1);
    }
}
