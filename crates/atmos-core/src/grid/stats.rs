//! Processing statistics collection trait

/// Trait for collecting processing statistics
///
/// Systems report what they did through this so hosts can plug in their own
/// counters without the engine knowing about them.
pub trait AtmosStats {
    /// Record that a queued tile finished its per-cell update
    fn record_tile_processed(&mut self);

    /// Record that at least one reaction fired on a tile
    fn record_reaction(&mut self);

    /// Record a pressure difference observed by the high-pressure stage
    fn record_pressure_delta(&mut self, delta: f32);

    /// Record a zone equalization or depressurization that moved gas
    fn record_equalization(&mut self) {}
}

/// A no-op implementation for when stats collection is not needed
#[derive(Default)]
pub struct NoopStats;

impl AtmosStats for NoopStats {
    fn record_tile_processed(&mut self) {}
    fn record_reaction(&mut self) {}
    fn record_pressure_delta(&mut self, _delta: f32) {}
}

/// Forwards every record to two sinks
pub(crate) struct StatsTee<'a> {
    pub first: &'a mut dyn AtmosStats,
    pub second: &'a mut dyn AtmosStats,
}

impl AtmosStats for StatsTee<'_> {
    fn record_tile_processed(&mut self) {
        self.first.record_tile_processed();
        self.second.record_tile_processed();
    }

    fn record_reaction(&mut self) {
        self.first.record_reaction();
        self.second.record_reaction();
    }

    fn record_pressure_delta(&mut self, delta: f32) {
        self.first.record_pressure_delta(delta);
        self.second.record_pressure_delta(delta);
    }

    fn record_equalization(&mut self) {
        self.first.record_equalization();
        self.second.record_equalization();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingStats {
        tiles: u32,
        reactions: u32,
        equalizations: u32,
        max_delta: f32,
    }

    impl AtmosStats for CountingStats {
        fn record_tile_processed(&mut self) {
            self.tiles += 1;
        }

        fn record_reaction(&mut self) {
            self.reactions += 1;
        }

        fn record_pressure_delta(&mut self, delta: f32) {
            self.max_delta = self.max_delta.max(delta);
        }

        fn record_equalization(&mut self) {
            self.equalizations += 1;
        }
    }

    #[test]
    fn test_noop_stats_all_methods() {
        let mut stats = NoopStats;
        for _ in 0..100 {
            stats.record_tile_processed();
            stats.record_reaction();
            stats.record_pressure_delta(1.0);
            stats.record_equalization();
        }
    }

    #[test]
    fn test_tee_forwards_to_both() {
        let mut a = CountingStats::default();
        let mut b = CountingStats::default();
        {
            let mut tee = StatsTee {
                first: &mut a,
                second: &mut b,
            };
            tee.record_tile_processed();
            tee.record_tile_processed();
            tee.record_reaction();
            tee.record_pressure_delta(12.5);
            tee.record_pressure_delta(3.0);
            tee.record_equalization();
        }

        for stats in [&a, &b] {
            assert_eq!(stats.tiles, 2);
            assert_eq!(stats.reactions, 1);
            assert_eq!(stats.equalizations, 1);
            assert_eq!(stats.max_delta, 12.5);
        }
    }
}
