//! Zone-wide pressure equalization and explosive depressurization
//!
//! Local sharing only moves gas one neighbour per pass, which is far too
//! slow when a door opens between a full room and an empty one. The
//! equalizer floods the connected zone, works out how much every tile must
//! give or take to reach the average, routes those amounts along neighbour
//! edges and then moves the gas in one step.
//!
//! A flood that touches space instead vents the zone outward, layer by
//! layer, starting from the tiles next to the breach.

use atmos_simulation::{AtmosConfig, Direction, NO_DIRECTION, TileFlags};
use serde::{Deserialize, Serialize};

use super::grid::GridAtmos;
use super::stats::AtmosStats;
use crate::mixture::{Exchange, compare_exchange, merge, remove_amount, remove_ratio};

/// What an equalization request ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EqualizeOutcome {
    /// The start tile already matches its neighbours
    Skipped,
    /// Gas was redistributed across `tiles` tiles
    Equalized { tiles: usize },
    /// The zone touched space and was vented
    Depressurized { tiles: usize, space_tiles: usize },
    /// The zone is larger than the hard limit; local sharing handles it
    Aborted,
}

impl EqualizeOutcome {
    pub fn moved_gas(self) -> bool {
        matches!(self, Self::Equalized { .. } | Self::Depressurized { .. })
    }
}

/// One step of a venting route: `index` pushes gas into `target`
#[derive(Debug, Clone, Copy)]
struct VentStep {
    index: usize,
    target: usize,
    direction: Direction,
}

/// Handles large-scale pressure equalization
pub struct MonstermosSystem;

impl MonstermosSystem {
    /// Equalize the zone connected to `start`
    pub fn equalize_pressure_in_zone(
        grid: &mut GridAtmos,
        start: usize,
        config: &AtmosConfig,
    ) -> EqualizeOutcome {
        let c = &config.constants;
        let update_counter = grid.update_counter;
        let tile = &grid.tiles[start];
        if tile.last_cycle >= update_counter || tile.flags.contains(TileFlags::ZONE_ABORTED) {
            return EqualizeOutcome::Skipped;
        }

        grid.tiles[start].clear_equalize_scratch();
        if grid.tiles[start].is_immutable() || !Self::differs_from_open_neighbor(grid, start, config) {
            grid.tiles[start].last_cycle = update_counter;
            return EqualizeOutcome::Skipped;
        }

        let queue_cycle = grid.next_queue_cycle();
        grid.tiles[start].last_queue_cycle = queue_cycle;
        let mut zone = vec![start];

        let mut i = 0;
        while i < zone.len() {
            let exploring = zone[i];
            for direction in Direction::ALL {
                let Some(neighbor) = grid.open_neighbor(exploring, direction) else {
                    continue;
                };
                let tile = &grid.tiles[neighbor];
                if tile.last_queue_cycle == queue_cycle {
                    continue;
                }
                if tile.is_space() {
                    if config.spacing_enabled {
                        return Self::explosive_depressurize(grid, start, config);
                    }
                    continue;
                }
                if tile.is_immutable() {
                    continue;
                }
                if zone.len() >= c.monstermos_hard_tile_limit {
                    // Visited tiles fall back to local sharing until the next pass
                    for &index in &zone {
                        let tile = &mut grid.tiles[index];
                        tile.last_queue_cycle = 0;
                        tile.flags |= TileFlags::ZONE_ABORTED;
                    }
                    log::debug!(
                        "Equalization from tile {start} aborted past {} tiles",
                        c.monstermos_hard_tile_limit
                    );
                    return EqualizeOutcome::Aborted;
                }

                let tile = &mut grid.tiles[neighbor];
                tile.clear_equalize_scratch();
                tile.last_queue_cycle = queue_cycle;
                zone.push(neighbor);
            }
            i += 1;
        }

        if zone.len() > c.monstermos_tile_limit {
            for &index in &zone[c.monstermos_tile_limit..] {
                grid.tiles[index].last_queue_cycle = 0;
            }
            zone.truncate(c.monstermos_tile_limit);
        }

        let total: f32 = zone.iter().map(|&i| grid.tiles[i].total_moles()).sum();
        let average = total / zone.len() as f32;
        for &index in &zone {
            let tile = &mut grid.tiles[index];
            tile.last_cycle = update_counter;
            tile.mole_delta = tile.total_moles() - average;
        }

        let log_n = (zone.len() as f32).log2();
        let (givers, takers) = Self::split_givers(grid, &zone);
        let (givers, takers) = if givers.len() as f32 > log_n && takers.len() as f32 > log_n {
            Self::fast_path(grid, &zone, queue_cycle);
            Self::split_givers(grid, &zone)
        } else {
            (givers, takers)
        };

        if givers.len() < takers.len() {
            for giver in givers {
                Self::route_from(grid, giver, queue_cycle, true);
            }
        } else {
            for taker in takers {
                Self::route_from(grid, taker, queue_cycle, false);
            }
        }

        for &index in &zone {
            Self::finalize_eq(grid, index, config);
        }

        for &index in &zone {
            for direction in Direction::ALL {
                let Some(neighbor) = grid.open_neighbor(index, direction) else {
                    continue;
                };
                let exchange =
                    compare_exchange(&grid.tiles[index], &grid.tiles[neighbor], &config.constants);
                if exchange != Exchange::None {
                    grid.activate(neighbor);
                    break;
                }
            }
        }

        EqualizeOutcome::Equalized { tiles: zone.len() }
    }

    fn differs_from_open_neighbor(grid: &GridAtmos, index: usize, config: &AtmosConfig) -> bool {
        let moles = grid.tiles[index].total_moles();
        Direction::ALL.into_iter().any(|direction| {
            grid.open_neighbor(index, direction).is_some_and(|n| {
                (grid.tiles[n].total_moles() - moles).abs()
                    > config.constants.minimum_moles_delta_to_move
            })
        })
    }

    fn split_givers(grid: &GridAtmos, zone: &[usize]) -> (Vec<usize>, Vec<usize>) {
        zone.iter()
            .copied()
            .partition(|&index| grid.tiles[index].mole_delta > 0.0)
    }

    /// Push each giver's surplus evenly to neighbours not yet settled,
    /// visiting tiles from the largest deficit to the largest surplus
    fn fast_path(grid: &mut GridAtmos, zone: &[usize], queue_cycle: i64) {
        let mut sorted = zone.to_vec();
        sorted.sort_by(|&a, &b| grid.tiles[a].mole_delta.total_cmp(&grid.tiles[b].mole_delta));

        for index in sorted {
            grid.tiles[index].fast_done = true;
            let delta = grid.tiles[index].mole_delta;
            if delta <= 0.0 {
                continue;
            }

            let mut eligible: [Option<usize>; 4] = [None; 4];
            let mut count = 0;
            for direction in Direction::ALL {
                if let Some(neighbor) = grid.open_neighbor(index, direction) {
                    let other = &grid.tiles[neighbor];
                    if !other.fast_done && other.last_queue_cycle == queue_cycle {
                        eligible[direction.index()] = Some(neighbor);
                        count += 1;
                    }
                }
            }
            if count == 0 {
                continue;
            }

            let share = delta / count as f32;
            for direction in Direction::ALL {
                if let Some(neighbor) = eligible[direction.index()] {
                    Self::adjust_eq_movement(grid, index, neighbor, direction, share);
                    grid.tiles[index].mole_delta -= share;
                    grid.tiles[neighbor].mole_delta += share;
                }
            }
        }
    }

    /// Breadth-first match one source tile against tiles of the opposite sign
    ///
    /// With `giving` the source has a surplus and searches for deficits;
    /// otherwise it has a deficit and searches for surpluses. Matched
    /// amounts are then carried back along the search tree.
    fn route_from(grid: &mut GridAtmos, source: usize, queue_cycle: i64, giving: bool) {
        let sign = if giving { 1.0 } else { -1.0 };
        let slow_cycle = grid.next_queue_cycle();

        let tile = &mut grid.tiles[source];
        tile.current_transfer_direction = NO_DIRECTION;
        tile.current_transfer_amount = 0.0;
        tile.last_slow_queue_cycle = slow_cycle;

        // (tile, parent, direction from tile to parent)
        let mut queue: Vec<(usize, usize, Direction)> = Vec::new();
        let mut frontier = vec![source];
        let mut i = 0;
        while i < frontier.len() && sign * grid.tiles[source].mole_delta > 0.0 {
            let current = frontier[i];
            for direction in Direction::ALL {
                if sign * grid.tiles[source].mole_delta <= 0.0 {
                    break;
                }
                let Some(neighbor) = grid.open_neighbor(current, direction) else {
                    continue;
                };
                let other = &grid.tiles[neighbor];
                if other.last_queue_cycle != queue_cycle || other.last_slow_queue_cycle == slow_cycle {
                    continue;
                }

                let back = direction.opposite();
                let other = &mut grid.tiles[neighbor];
                other.last_slow_queue_cycle = slow_cycle;
                other.current_transfer_direction = back as i32;
                other.current_transfer_amount = 0.0;
                frontier.push(neighbor);
                queue.push((neighbor, current, back));

                let need = -sign * other.mole_delta;
                if need > 0.0 {
                    let available = sign * grid.tiles[source].mole_delta;
                    let moved = need.min(available);
                    let other = &mut grid.tiles[neighbor];
                    other.current_transfer_amount -= sign * moved;
                    other.mole_delta += sign * moved;
                    grid.tiles[source].mole_delta -= sign * moved;
                }
            }
            i += 1;
        }

        for &(index, parent, direction) in queue.iter().rev() {
            let amount = grid.tiles[index].current_transfer_amount;
            if amount == 0.0 {
                continue;
            }
            Self::adjust_eq_movement(grid, index, parent, direction, amount);
            grid.tiles[parent].current_transfer_amount += amount;
            grid.tiles[index].current_transfer_amount = 0.0;
        }
    }

    /// Record that `amount` moles should move from `index` towards `neighbor`
    pub(crate) fn adjust_eq_movement(
        grid: &mut GridAtmos,
        index: usize,
        neighbor: usize,
        direction: Direction,
        amount: f32,
    ) {
        grid.tiles[index].transfer_directions[direction.index()] += amount;
        grid.tiles[neighbor].transfer_directions[direction.opposite().index()] -= amount;
    }

    /// Move the gas recorded in a tile's transfer directions
    ///
    /// A tile that owes more than it holds first settles the neighbours that
    /// owe it. Each tile clears its own record on entry, so the recursion
    /// visits every tile at most once.
    pub(crate) fn finalize_eq(grid: &mut GridAtmos, index: usize, config: &AtmosConfig) {
        let transfers = grid.tiles[index].transfer_directions;
        if transfers.iter().all(|&amount| amount == 0.0) {
            return;
        }
        grid.tiles[index].transfer_directions = [0.0; 4];

        for direction in Direction::ALL {
            let amount = transfers[direction.index()];
            if amount <= 0.0 {
                continue;
            }
            let Some(neighbor) = grid.open_neighbor(index, direction) else {
                continue;
            };

            if grid.tiles[index].total_moles() < amount {
                for creditor_direction in Direction::ALL {
                    if transfers[creditor_direction.index()] >= 0.0 {
                        continue;
                    }
                    if let Some(creditor) = grid.open_neighbor(index, creditor_direction) {
                        Self::finalize_eq(grid, creditor, config);
                    }
                }
            }

            let total = grid.tiles[index].total_moles();
            if total <= 0.0 {
                continue;
            }

            grid.tiles[neighbor].transfer_directions[direction.opposite().index()] = 0.0;
            let (tile, other) = grid.pair_mut(index, neighbor);
            let mut moved = remove_ratio(tile, amount / total, config);
            merge(other, &mut moved, config);
            grid.consider_pressure_difference(index, direction, amount);
        }
    }

    /// Vent the zone around `start` into space
    pub fn explosive_depressurize(
        grid: &mut GridAtmos,
        start: usize,
        config: &AtmosConfig,
    ) -> EqualizeOutcome {
        if !config.spacing_enabled {
            return EqualizeOutcome::Skipped;
        }
        let c = &config.constants;
        let hard_limit = c.monstermos_hard_tile_limit;
        let update_counter = grid.update_counter;
        let queue_cycle = grid.next_queue_cycle();

        let tile = &mut grid.tiles[start];
        tile.last_queue_cycle = queue_cycle;
        tile.current_transfer_direction = NO_DIRECTION;
        tile.current_transfer_amount = 0.0;

        let mut tiles = vec![start];
        let mut space_tiles = 0;
        // Tiles touching space, with the space tile they vent into
        let mut breaches: Vec<VentStep> = Vec::new();

        let mut i = 0;
        while i < tiles.len() {
            let index = tiles[i];
            grid.tiles[index].last_cycle = update_counter;

            for direction in Direction::ALL {
                let Some(neighbor) = grid.open_neighbor(index, direction) else {
                    continue;
                };
                let other = &grid.tiles[neighbor];
                if other.is_space() {
                    breaches.push(VentStep {
                        index,
                        target: neighbor,
                        direction,
                    });
                    if other.last_queue_cycle != queue_cycle {
                        grid.tiles[neighbor].last_queue_cycle = queue_cycle;
                        space_tiles += 1;
                    }
                    continue;
                }
                if other.last_queue_cycle == queue_cycle || other.is_immutable() {
                    continue;
                }
                if tiles.len() >= hard_limit {
                    continue;
                }
                let other = &mut grid.tiles[neighbor];
                other.last_queue_cycle = queue_cycle;
                other.current_transfer_direction = NO_DIRECTION;
                other.current_transfer_amount = 0.0;
                tiles.push(neighbor);
            }
            i += 1;
        }

        // Progression order: tiles next to space first, then outward
        let slow_cycle = grid.next_queue_cycle();
        let mut order: Vec<VentStep> = Vec::with_capacity(tiles.len());
        for step in breaches {
            let tile = &mut grid.tiles[step.index];
            if tile.last_slow_queue_cycle == slow_cycle {
                continue;
            }
            tile.last_slow_queue_cycle = slow_cycle;
            tile.current_transfer_direction = step.direction as i32;
            order.push(step);
        }

        let mut i = 0;
        while i < order.len() {
            let index = order[i].index;
            for direction in Direction::ALL {
                let Some(neighbor) = grid.open_neighbor(index, direction) else {
                    continue;
                };
                let other = &grid.tiles[neighbor];
                if other.last_queue_cycle != queue_cycle
                    || other.last_slow_queue_cycle == slow_cycle
                    || other.is_immutable()
                {
                    continue;
                }
                let back = direction.opposite();
                let other = &mut grid.tiles[neighbor];
                other.last_slow_queue_cycle = slow_cycle;
                other.current_transfer_direction = back as i32;
                other.current_transfer_amount = 0.0;
                order.push(VentStep {
                    index: neighbor,
                    target: index,
                    direction: back,
                });
            }
            i += 1;
        }

        let mut vented = 0.0;
        for step in order.iter().rev() {
            grid.activate(step.index);
            let tile = &mut grid.tiles[step.index];
            let total = tile.total_moles();

            let mut sum = total;
            if config.spacing_escape_ratio < 1.0 {
                sum *= config.spacing_escape_ratio;
                if sum < config.spacing_min_gas {
                    sum = config.spacing_min_gas.min(total);
                }
                if sum + tile.current_transfer_amount > config.spacing_max_wind {
                    sum = config
                        .spacing_min_gas
                        .max(config.spacing_max_wind - tile.current_transfer_amount);
                }
            }
            let sum = sum.min(total);
            tile.current_transfer_amount += sum;
            let wind = tile.current_transfer_amount;

            let mut removed = if total - sum > config.spacing_min_gas * 0.1 {
                let removed = remove_amount(tile, sum, config);
                let remaining = (total - sum) / total;
                tile.temperature = (tile.temperature * (0.9 + 0.1 * remaining)).max(c.tcmb);
                removed
            } else {
                let removed = remove_ratio(tile, 1.0, config);
                tile.temperature = c.tcmb;
                removed
            };
            vented += sum;

            let target = &mut grid.tiles[step.target];
            target.current_transfer_amount += wind;
            merge(target, &mut removed, config);
            grid.consider_pressure_difference(step.index, step.direction, wind);
        }

        log::debug!(
            "Explosive depressurization from tile {start}: {} tiles, {space_tiles} space tiles, {vented:.1} mol vented",
            tiles.len()
        );

        EqualizeOutcome::Depressurized {
            tiles: tiles.len(),
            space_tiles,
        }
    }

    /// Equalize around tiles whose recorded pressure difference is too large
    ///
    /// Returns the largest difference seen. Every listed tile has its
    /// difference reset, and the list is emptied.
    pub fn process_high_pressure(
        grid: &mut GridAtmos,
        config: &AtmosConfig,
        stats: &mut dyn AtmosStats,
    ) -> f32 {
        let listed = std::mem::take(&mut grid.high_pressure_tiles);
        let mut max_delta: f32 = 0.0;

        for index in listed {
            let tile = &mut grid.tiles[index];
            let delta = tile.pressure_difference;
            tile.pressure_difference = 0.0;
            tile.current_transfer_direction = NO_DIRECTION;
            max_delta = max_delta.max(delta);
            stats.record_pressure_delta(delta);

            if config.monstermos_enabled && delta > config.monstermos_rupture_pressure {
                let outcome = Self::equalize_pressure_in_zone(grid, index, config);
                if outcome.moved_gas() {
                    stats.record_equalization();
                }
            }
        }

        max_delta
    }
}
