//! Tick orchestration
//!
//! A full pass archives every tile, walks a snapshot of the active set
//! (sharing, reacting and grouping tile by tile) and then runs the
//! grid-wide stages: excited groups, hotspots, superconduction and the
//! high-pressure check. The walk can stop at any tile boundary when the
//! per-call budget runs out; the next call resumes from the same cursor.

use std::time::Duration;

#[cfg(not(feature = "client"))]
use std::time::Instant;
#[cfg(feature = "client")]
use web_time::Instant;

use atmos_simulation::{AtmosConfig, Direction, GAS_COUNT, TileFlags};
use serde::{Deserialize, Serialize};

use super::excited_group_system::ExcitedGroupSystem;
use super::grid::GridAtmos;
use super::hotspot_system::HotspotSystem;
use super::monstermos_system::{EqualizeOutcome, MonstermosSystem};
use super::reaction_system::{ReactionOutcome, ReactionSystem};
use super::share_system::ShareSystem;
use super::stats::{AtmosStats, NoopStats, StatsTee};
use super::superconduction_system::SuperconductionSystem;
use crate::error::AtmosResult;
use crate::mixture::{Exchange, archive, compare_exchange, pressure, refresh_heat_capacity};

/// The wall clock is only read every this many tiles
const TIME_CHECK_INTERVAL: usize = 30;

/// Position inside a pass that ran out of budget
#[derive(Debug, Clone, Default)]
pub(crate) struct PassCursor {
    queue: Vec<usize>,
    position: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    /// The whole queue was drained and every stage ran
    #[default]
    Complete,
    /// The budget ran out mid-queue; call again to resume
    Partial,
}

/// Per-call statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub tiles_processed: usize,
    pub active_tiles: usize,
    pub hotspot_tiles: usize,
    pub superconducting_tiles: usize,
    pub excited_groups: usize,
    pub reactions_triggered: usize,
    pub max_pressure_delta: f32,
    pub completion: Completion,
}

impl ProcessResult {
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Complete
    }

    fn capture_counts(&mut self, grid: &GridAtmos) {
        self.active_tiles = grid.active_tiles.len();
        self.hotspot_tiles = grid.hotspot_tiles.len();
        self.superconducting_tiles = grid.superconduct_tiles.len();
        self.excited_groups = grid.excited_group_count();
    }
}

impl AtmosStats for ProcessResult {
    fn record_tile_processed(&mut self) {
        self.tiles_processed += 1;
    }

    fn record_reaction(&mut self) {
        self.reactions_triggered += 1;
    }

    fn record_pressure_delta(&mut self, delta: f32) {
        self.max_pressure_delta = self.max_pressure_delta.max(delta);
    }
}

/// Work allowance for one call
struct Budget {
    started: Instant,
    time_limit: Duration,
    tile_limit: Option<usize>,
}

impl Budget {
    fn start(config: &AtmosConfig) -> Self {
        Self {
            started: Instant::now(),
            time_limit: Duration::from_micros(config.max_process_time_us),
            tile_limit: config.tile_budget(),
        }
    }

    fn exhausted(&self, consumed: usize) -> bool {
        if self.tile_limit.is_some_and(|limit| consumed >= limit) {
            return true;
        }
        consumed % TIME_CHECK_INTERVAL == 0 && self.started.elapsed() >= self.time_limit
    }
}

impl GridAtmos {
    /// Run (or resume) one full pass
    pub fn process(&mut self, config: &AtmosConfig) -> ProcessResult {
        self.process_with_stats(config, &mut NoopStats)
    }

    /// Run (or resume) one full pass, also reporting to `stats`
    pub fn process_with_stats(
        &mut self,
        config: &AtmosConfig,
        stats: &mut dyn AtmosStats,
    ) -> ProcessResult {
        #[cfg(feature = "detailed_profiling")]
        let _span = tracing::info_span!("atmos_process", tiles = self.tiles.len()).entered();

        self.run_stage(stats, |grid, stats| {
            if grid.run_active_queue(config, stats) == Completion::Partial {
                return Completion::Partial;
            }
            grid.run_grid_stages(config, stats);
            Completion::Complete
        })
    }

    /// Walk the active queue only, without the grid-wide stages
    pub fn process_active_tiles(&mut self, config: &AtmosConfig) -> ProcessResult {
        self.run_stage(&mut NoopStats, |grid, stats| grid.run_active_queue(config, stats))
    }

    pub fn process_excited_groups(&mut self, config: &AtmosConfig) -> ProcessResult {
        self.run_stage(&mut NoopStats, |grid, _| {
            if config.excited_groups_enabled {
                ExcitedGroupSystem::process(grid, config);
            }
            Completion::Complete
        })
    }

    pub fn process_hotspots(&mut self, config: &AtmosConfig) -> ProcessResult {
        self.run_stage(&mut NoopStats, |grid, _| {
            HotspotSystem::process(grid, config);
            Completion::Complete
        })
    }

    /// Conduct every superconducting tile, ignoring the pass interval
    pub fn process_superconductivity(&mut self, config: &AtmosConfig) -> ProcessResult {
        self.run_stage(&mut NoopStats, |grid, _| {
            if config.superconduction_enabled {
                SuperconductionSystem::process(grid, config);
            }
            Completion::Complete
        })
    }

    pub fn process_high_pressure(&mut self, config: &AtmosConfig) -> ProcessResult {
        self.run_stage(&mut NoopStats, |grid, stats| {
            MonstermosSystem::process_high_pressure(grid, config, stats);
            Completion::Complete
        })
    }

    /// Re-derive caches and repair bookkeeping after external edits
    pub fn process_revalidate(&mut self, config: &AtmosConfig) -> ProcessResult {
        self.run_stage(&mut NoopStats, |grid, _| {
            grid.revalidate(config);
            Completion::Complete
        })
    }

    /// Equalize the zone around a tile right now
    pub fn equalize_pressure_zone(
        &mut self,
        index: usize,
        config: &AtmosConfig,
    ) -> AtmosResult<EqualizeOutcome> {
        self.check_index(index)?;
        Ok(MonstermosSystem::equalize_pressure_in_zone(self, index, config))
    }

    /// Vent the zone around a tile into space right now
    pub fn explosive_depressurize(
        &mut self,
        index: usize,
        config: &AtmosConfig,
    ) -> AtmosResult<EqualizeOutcome> {
        self.check_index(index)?;
        Ok(MonstermosSystem::explosive_depressurize(self, index, config))
    }

    /// Expose a tile to a flame; returns whether a fire is now burning there
    pub fn ignite_hotspot(
        &mut self,
        index: usize,
        temperature: f32,
        volume: f32,
        config: &AtmosConfig,
    ) -> AtmosResult<bool> {
        self.check_index(index)?;
        Ok(HotspotSystem::ignite(self, index, temperature, volume, config))
    }

    pub fn extinguish_hotspot(&mut self, index: usize) -> AtmosResult<()> {
        self.check_index(index)?;
        HotspotSystem::extinguish(self, index);
        Ok(())
    }

    pub fn archive_tile(&mut self, index: usize, config: &AtmosConfig) -> AtmosResult<()> {
        archive(self.tile_mut(index)?, config);
        Ok(())
    }

    pub fn archive_all(&mut self, config: &AtmosConfig) {
        for tile in &mut self.tiles {
            archive(tile, config);
        }
    }

    fn run_stage(
        &mut self,
        stats: &mut dyn AtmosStats,
        stage: impl FnOnce(&mut Self, &mut dyn AtmosStats) -> Completion,
    ) -> ProcessResult {
        let mut result = ProcessResult::default();
        let completion = {
            let mut tee = StatsTee {
                first: &mut result,
                second: stats,
            };
            stage(self, &mut tee)
        };
        result.completion = completion;
        result.capture_counts(self);
        result
    }

    fn begin_pass(&mut self, config: &AtmosConfig) {
        self.update_counter += 1;
        for tile in &mut self.tiles {
            archive(tile, config);
            tile.last_share = 0.0;
            tile.flags.remove(TileFlags::ZONE_ABORTED);
        }
        for index in self.active_tiles.iter() {
            self.tiles[index].flags.remove(TileFlags::PROCESSED);
        }
        self.pass = Some(PassCursor {
            queue: self.active_tiles.to_vec(),
            position: 0,
        });
    }

    /// Process queued tiles until the queue drains or the budget runs out
    fn run_active_queue(&mut self, config: &AtmosConfig, stats: &mut dyn AtmosStats) -> Completion {
        #[cfg(feature = "detailed_profiling")]
        let _span = tracing::info_span!("active_tiles").entered();

        if self.pass.is_none() {
            self.begin_pass(config);
        }
        let Some(mut cursor) = self.pass.take() else {
            return Completion::Complete;
        };

        let budget = Budget::start(config);
        let mut consumed = 0;
        while cursor.position < cursor.queue.len() {
            let index = cursor.queue[cursor.position];
            cursor.position += 1;
            consumed += 1;

            if index < self.tiles.len() {
                let tile = &self.tiles[index];
                if config.monstermos_enabled
                    && tile.is_active()
                    && tile.last_cycle < self.update_counter
                {
                    let outcome = MonstermosSystem::equalize_pressure_in_zone(self, index, config);
                    if outcome.moved_gas() {
                        stats.record_equalization();
                    }
                }
                if self.process_cell(index, config, stats) {
                    stats.record_tile_processed();
                }
            }

            if cursor.position < cursor.queue.len() && budget.exhausted(consumed) {
                log::trace!(
                    "Pass {} paused at {}/{}",
                    self.update_counter,
                    cursor.position,
                    cursor.queue.len()
                );
                self.pass = Some(cursor);
                return Completion::Partial;
            }
        }

        for &index in &cursor.queue {
            if let Some(tile) = self.tiles.get_mut(index) {
                tile.flags.remove(TileFlags::PROCESSED);
            }
        }
        Completion::Complete
    }

    fn run_grid_stages(&mut self, config: &AtmosConfig, stats: &mut dyn AtmosStats) {
        if config.excited_groups_enabled {
            #[cfg(feature = "detailed_profiling")]
            let _span = tracing::info_span!("excited_groups").entered();
            ExcitedGroupSystem::process(self, config);
        }

        {
            #[cfg(feature = "detailed_profiling")]
            let _span = tracing::info_span!("hotspots").entered();
            HotspotSystem::process(self, config);
        }

        let interval = i64::from(config.superconduction_interval.max(1));
        if config.superconduction_enabled && self.update_counter % interval == 0 {
            #[cfg(feature = "detailed_profiling")]
            let _span = tracing::info_span!("superconduction").entered();
            SuperconductionSystem::process(self, config);
        }

        #[cfg(feature = "detailed_profiling")]
        let _span = tracing::info_span!("high_pressure").entered();
        MonstermosSystem::process_high_pressure(self, config, stats);
    }

    /// Share, react and regroup one queued tile; false if it was skipped
    fn process_cell(&mut self, index: usize, config: &AtmosConfig, stats: &mut dyn AtmosStats) -> bool {
        let update_counter = self.update_counter;
        let tile = &mut self.tiles[index];
        if tile.flags.contains(TileFlags::PROCESSED) || !tile.is_active() {
            return false;
        }
        if tile.is_immutable() {
            self.deactivate(index, true);
            return false;
        }
        tile.flags |= TileFlags::PROCESSED;
        tile.last_cycle = update_counter;

        let adjacent_count = tile.open_direction_count();
        let mut exchanged = false;

        for direction in Direction::ALL {
            let Some(neighbor) = self.open_neighbor(index, direction) else {
                continue;
            };
            let other = &self.tiles[neighbor];
            if other.last_cycle >= update_counter {
                continue;
            }
            if other.is_immutable() {
                // Gas leaks into space but walls are inert
                if other.is_space() && self.share_into_space(index, neighbor, adjacent_count, config) {
                    exchanged = true;
                }
                continue;
            }

            let tile = &self.tiles[index];
            let grouped = config.excited_groups_enabled
                && tile.excited_group_id >= 0
                && other.excited_group_id >= 0;
            if !grouped {
                if compare_exchange(tile, other, &config.constants) == Exchange::None {
                    continue;
                }
                self.activate(neighbor);
            }
            if config.excited_groups_enabled {
                ExcitedGroupSystem::link(self, index, neighbor);
            }

            let (tile, other) = self.pair_mut(index, neighbor);
            ShareSystem::share(tile, other, adjacent_count, config);
            exchanged = true;

            if !config.monstermos_enabled {
                self.record_share_pressure(index, neighbor, direction, config);
            }
            ExcitedGroupSystem::last_share_check(self, index, config);
        }

        let outcome = ReactionSystem::react(&mut self.tiles[index], config);
        let reacted = outcome.reacted();
        if reacted {
            stats.record_reaction();
            if outcome.contains(ReactionOutcome::FIRE_SPREAD) {
                let temperature = self.tiles[index].temperature;
                HotspotSystem::ignite(self, index, temperature, config.constants.cell_volume, config);
            }
        }

        if self.tiles[index].temperature > config.constants.minimum_temperature_start_superconduction
            && SuperconductionSystem::consider_superconductivity(self, index, true, config)
        {
            return true;
        }

        let tile = &self.tiles[index];
        let settled = if config.excited_groups_enabled {
            tile.excited_group_id < 0 && !reacted
        } else {
            !exchanged && !reacted
        };
        if settled && !tile.hotspot_state.is_lit() {
            self.deactivate(index, true);
        }
        true
    }

    fn share_into_space(
        &mut self,
        index: usize,
        space: usize,
        adjacent_count: usize,
        config: &AtmosConfig,
    ) -> bool {
        if compare_exchange(&self.tiles[index], &self.tiles[space], &config.constants)
            == Exchange::None
        {
            return false;
        }
        let (tile, space) = self.pair_mut(index, space);
        ShareSystem::share(tile, space, adjacent_count, config);
        true
    }

    fn record_share_pressure(
        &mut self,
        index: usize,
        neighbor: usize,
        direction: Direction,
        config: &AtmosConfig,
    ) {
        let difference = pressure(&self.tiles[index], &config.constants)
            - pressure(&self.tiles[neighbor], &config.constants);
        if difference >= 0.0 {
            self.consider_pressure_difference(index, direction, difference);
        } else {
            self.consider_pressure_difference(neighbor, direction.opposite(), -difference);
        }
    }

    fn revalidate(&mut self, config: &AtmosConfig) {
        let dropped = self.drop_dangling_adjacency();

        for tile in &mut self.tiles {
            tile.moles[GAS_COUNT..].fill(0.0);
            tile.moles_archived[GAS_COUNT..].fill(0.0);
            refresh_heat_capacity(tile, config);
        }

        let immutable: Vec<usize> = (0..self.tiles.len())
            .filter(|&i| self.tiles[i].is_active() && self.tiles[i].is_immutable())
            .collect();
        for &index in &immutable {
            self.deactivate(index, true);
        }

        // The flags are authoritative; the lists are rebuilt from them in index order
        for tile in &mut self.tiles {
            if tile.is_hotspot() && !tile.hotspot_state.is_lit() {
                tile.flags.remove(TileFlags::HOTSPOT);
            }
        }
        let tiles = &self.tiles;
        self.active_tiles
            .rebuild((0..tiles.len()).filter(|&i| tiles[i].is_active()));
        self.hotspot_tiles
            .rebuild((0..tiles.len()).filter(|&i| tiles[i].is_hotspot()));
        self.superconduct_tiles.rebuild(
            (0..tiles.len()).filter(|&i| tiles[i].flags.contains(TileFlags::SUPERCONDUCT)),
        );

        log::debug!(
            "Revalidated {} tiles: {dropped} dangling links dropped, {} immutable tiles deactivated",
            self.tiles.len(),
            immutable.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::layout::RectLayout;
    use atmos_simulation::{GasId, GasMixture, HotspotState, TileAtmos};
    use glam::IVec2;

    fn quiet_config() -> AtmosConfig {
        AtmosConfig {
            monstermos_enabled: false,
            ..AtmosConfig::deterministic(0)
        }
    }

    fn oxygen_row(grid: &mut GridAtmos, amounts: &[f32]) -> RectLayout {
        let mut amounts = amounts.iter();
        RectLayout::build(grid, amounts.len(), 1, |position| {
            let moles = amounts.next().copied().unwrap_or(0.0);
            TileAtmos::with_mixture(position, &GasMixture::new(293.15).with_gas(GasId::OXYGEN, moles))
        })
        .unwrap()
    }

    #[test]
    fn test_pass_shares_and_counts() {
        let config = quiet_config();
        let mut grid = GridAtmos::new();
        oxygen_row(&mut grid, &[100.0, 0.0]);
        grid.add_active_tile(0).unwrap();

        let result = grid.process(&config);

        assert!(result.is_complete());
        assert_eq!(result.tiles_processed, 1);
        assert_eq!(grid.update_counter(), 2);
        assert!(grid.tile(1).unwrap().moles[GasId::OXYGEN] > 0.0);
        assert!(grid.tile(1).unwrap().is_active());
        assert_eq!(result.excited_groups, 1);
        assert!(!grid.pass_in_flight());
    }

    #[test]
    fn test_settled_tile_leaves_active_set() {
        let config = quiet_config();
        let mut grid = GridAtmos::new();
        oxygen_row(&mut grid, &[50.0, 50.0]);
        grid.add_active_tile(0).unwrap();

        let result = grid.process(&config);

        assert_eq!(result.active_tiles, 0);
        assert_eq!(grid.active_tile_count(), 0);
    }

    #[test]
    fn test_tile_budget_pauses_and_resumes() {
        let config = AtmosConfig {
            max_tiles_per_call: 2,
            ..quiet_config()
        };
        let mut grid = GridAtmos::new();
        let layout = oxygen_row(&mut grid, &[80.0, 0.0, 80.0, 0.0, 80.0, 0.0]);
        layout.activate_all(&mut grid).unwrap();

        let first = grid.process(&config);
        assert_eq!(first.completion, Completion::Partial);
        assert!(first.tiles_processed <= 2);
        assert!(grid.pass_in_flight());
        assert_eq!(grid.update_counter(), 2);

        let second = grid.process(&config);
        assert_eq!(second.completion, Completion::Partial);
        assert_eq!(grid.update_counter(), 2);

        let mut calls = 2;
        while grid.process(&config).completion == Completion::Partial {
            calls += 1;
            assert!(calls < 10);
        }
        assert!(!grid.pass_in_flight());
    }

    #[test]
    fn test_immutable_queue_entries_are_dropped() {
        let config = quiet_config();
        let mut grid = GridAtmos::new();
        oxygen_row(&mut grid, &[10.0, 10.0]);
        grid.add_active_tile(1).unwrap();
        // Flip the flag behind the grid's back so the queue still holds it
        grid.tile_mut(1).unwrap().flags |= TileFlags::IMMUTABLE;

        let result = grid.process(&config);

        assert!(!grid.tile(1).unwrap().is_active());
        assert_eq!(result.tiles_processed, 0);
        assert_eq!(grid.active_tile_count(), 0);
    }

    #[test]
    fn test_space_neighbour_drains_gas_without_monstermos() {
        let config = quiet_config();
        let mut grid = GridAtmos::new();
        let layout = oxygen_row(&mut grid, &[100.0, 0.0]);
        layout.make_space(&mut grid, 1, 0, &config).unwrap();
        grid.add_active_tile(0).unwrap();

        grid.process(&config);

        assert!(grid.tile(0).unwrap().total_moles() < 100.0);
        assert_eq!(grid.tile(1).unwrap().total_moles(), 0.0);
    }

    #[test]
    fn test_monstermos_runs_before_sharing() {
        let config = AtmosConfig::deterministic(0);
        let mut grid = GridAtmos::new();
        oxygen_row(&mut grid, &[90.0, 0.0, 0.0]);
        grid.add_active_tile(0).unwrap();

        grid.process(&config);

        for tile in grid.tiles() {
            assert!((tile.total_moles() - 30.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_oversized_zone_falls_back_to_sharing() {
        let mut config = AtmosConfig::deterministic(0);
        config.constants.monstermos_hard_tile_limit = 4;
        let mut grid = GridAtmos::new();
        oxygen_row(&mut grid, &[100.0, 100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        grid.add_active_tile(0).unwrap();
        grid.add_active_tile(1).unwrap();
        let queue_cycle = grid.queue_cycle;

        grid.process(&config);

        // One flood for the whole zone, then plain sharing
        assert_eq!(grid.queue_cycle, queue_cycle + 1);
        assert!(grid.tile(2).unwrap().moles[GasId::OXYGEN] > 0.0);
        assert_eq!(grid.tile(4).unwrap().moles[GasId::OXYGEN], 0.0);
        assert!(grid.tile(1).unwrap().flags.contains(TileFlags::ZONE_ABORTED));

        grid.process(&config);

        assert_eq!(grid.queue_cycle, queue_cycle + 2);
        assert!(grid.tile(3).unwrap().moles[GasId::OXYGEN] > 0.0);
    }

    #[test]
    fn test_reaction_fire_lights_hotspot() {
        let config = quiet_config();
        let mut grid = GridAtmos::new();
        let mixture = GasMixture::new(1200.0)
            .with_gas(GasId::PLASMA, 10.0)
            .with_gas(GasId::OXYGEN, 100.0);
        grid.add_tile(TileAtmos::with_mixture(IVec2::ZERO, &mixture));
        grid.add_active_tile(0).unwrap();

        let result = grid.process(&config);

        assert_eq!(result.reactions_triggered, 1);
        assert!(grid.tile(0).unwrap().hotspot_state.is_lit());
        assert!(grid.tile(0).unwrap().is_active());
    }

    #[test]
    fn test_single_stage_entry_points() {
        let config = quiet_config();
        let mut grid = GridAtmos::new();
        oxygen_row(&mut grid, &[100.0, 0.0]);
        grid.add_active_tile(0).unwrap();

        let result = grid.process_active_tiles(&config);
        assert_eq!(result.tiles_processed, 1);
        assert_eq!(result.excited_groups, 1);

        assert_eq!(grid.process_excited_groups(&config).excited_groups, 1);
        assert_eq!(grid.process_hotspots(&config).hotspot_tiles, 0);
        assert_eq!(grid.process_superconductivity(&config).superconducting_tiles, 0);
        assert!(grid.process_high_pressure(&config).is_complete());
    }

    #[test]
    fn test_high_pressure_reports_max_delta() {
        let config = quiet_config();
        let mut grid = GridAtmos::new();
        oxygen_row(&mut grid, &[100.0, 0.0]);
        grid.add_active_tile(0).unwrap();

        let result = grid.process(&config);

        assert!(result.max_pressure_delta > 0.0);
        assert!(grid.tiles().iter().all(|t| t.pressure_difference == 0.0));
    }

    #[test]
    fn test_revalidate_repairs_bookkeeping() {
        let config = quiet_config();
        let mut grid = GridAtmos::new();
        oxygen_row(&mut grid, &[10.0, 10.0, 10.0]);
        grid.add_active_tile(0).unwrap();
        {
            let tile = grid.tile_mut(0).unwrap();
            tile.flags |= TileFlags::IMMUTABLE;
            tile.adjacent[Direction::North.index()] = 99;
            tile.adjacent_bits |= Direction::North.bit();
        }
        {
            let tile = grid.tile_mut(1).unwrap();
            tile.flags |= TileFlags::HOTSPOT;
            tile.hotspot_state = HotspotState::Growing;
            tile.hotspot_temperature = 500.0;
        }
        grid.tile_mut(2).unwrap().flags |= TileFlags::SUPERCONDUCT;

        grid.process_revalidate(&config);

        assert_eq!(grid.active_tile_count(), 0);
        assert_eq!(grid.tile(0).unwrap().neighbor(Direction::North), None);
        assert_eq!(grid.hotspot_tiles(), &[1]);
        assert_eq!(grid.superconducting_tiles(), &[2]);
    }

    #[test]
    fn test_event_wrappers_check_indices() {
        let config = quiet_config();
        let mut grid = GridAtmos::new();
        oxygen_row(&mut grid, &[10.0]);

        assert!(grid.ignite_hotspot(5, 1000.0, 1.0, &config).is_err());
        assert!(grid.extinguish_hotspot(5).is_err());
        assert!(grid.equalize_pressure_zone(5, &config).is_err());
        assert!(grid.archive_tile(5, &config).is_err());
        assert_eq!(grid.ignite_hotspot(0, 1000.0, 1.0, &config), Ok(false));
    }
}
