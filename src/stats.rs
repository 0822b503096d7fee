//! Counters for input that was dropped on purpose.

/// Saturating data-loss counters kept by the HID state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DropStats {
    /// Stale queued events removed by cleanup.
    pub purged: u32,
    /// Presses dropped because the usage table was full.
    pub table_full: u32,
    /// Times the queue and usage tables were cleared on overflow.
    pub hard_resets: u32,
    /// Incoming events that could not be stored in the queue.
    pub queue_push_failed: u32,
    /// Button events with no keymap entry.
    pub unmapped_keys: u32,
}

impl DropStats {
    pub const fn new() -> Self {
        Self {
            purged: 0,
            table_full: 0,
            hard_resets: 0,
            queue_push_failed: 0,
            unmapped_keys: 0,
        }
    }

    pub(crate) fn record_purged(&mut self, count: usize) {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        self.purged = self.purged.saturating_add(count);
    }

    /// Total number of input events lost, excluding hard resets.
    pub fn total_dropped(&self) -> u32 {
        self.purged
            .saturating_add(self.table_full)
            .saturating_add(self.queue_push_failed)
            .saturating_add(self.unmapped_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purged_count_saturates() {
        let mut stats = DropStats::new();
        stats.record_purged(3);
        assert_eq!(stats.purged, 3);

        stats.purged = u32::MAX - 1;
        stats.record_purged(5);
        assert_eq!(stats.purged, u32::MAX);
    }

    #[test]
    fn total_dropped_sums_loss_counters() {
        let stats = DropStats {
            purged: 2,
            table_full: 1,
            hard_resets: 7,
            queue_push_failed: 1,
            unmapped_keys: 3,
        };
        assert_eq!(stats.total_dropped(), 7);
        assert_eq!(DropStats::default(), DropStats::new());
    }
}
