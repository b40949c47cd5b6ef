//! Heat conduction through walls and windows
//!
//! Hot tiles with a conductive material pass heat across edges that block
//! gas. The heat pulls neighbours into superconduction in turn, so a fire
//! behind a wall slowly warms the rooms around it.

use atmos_simulation::{AtmosConfig, Direction, TileFlags};

use super::grid::GridAtmos;
use super::share_system::ShareSystem;
use crate::mixture::{refresh_heat_capacity, tile_heat_capacity};

/// Handles superconduction
pub struct SuperconductionSystem;

impl SuperconductionSystem {
    /// Register a tile as superconducting if it is hot and conductive enough
    ///
    /// `starting` selects the higher threshold used for tiles that are not
    /// yet conducting.
    pub fn consider_superconductivity(
        grid: &mut GridAtmos,
        index: usize,
        starting: bool,
        config: &AtmosConfig,
    ) -> bool {
        if !config.superconduction_enabled {
            return false;
        }
        let c = &config.constants;
        let tile = &grid.tiles[index];
        if tile.is_immutable() || tile.thermal_conductivity <= 0.0 {
            return false;
        }

        let threshold = if starting {
            c.minimum_temperature_start_superconduction
        } else {
            c.minimum_temperature_for_superconduction
        };
        if tile.temperature < threshold || tile_heat_capacity(tile, config) < c.mcell_with_ratio {
            return false;
        }

        grid.register_superconductor(index);
        true
    }

    /// Conduct every registered tile once, returning how many still conduct
    pub fn process(grid: &mut GridAtmos, config: &AtmosConfig) -> usize {
        let generation = grid.next_queue_cycle();
        let conducting = grid.superconduct_tiles.to_vec();
        for index in conducting {
            Self::superconduct(grid, index, generation, config);
        }
        grid.superconduct_tiles.len()
    }

    fn superconduct(grid: &mut GridAtmos, index: usize, generation: i64, config: &AtmosConfig) {
        let c = &config.constants;
        if grid.tiles[index].last_slow_queue_cycle == generation {
            return;
        }
        grid.tiles[index].last_slow_queue_cycle = generation;

        if !grid.tiles[index].flags.contains(TileFlags::SUPERCONDUCT) {
            grid.unregister_superconductor(index);
            return;
        }

        for direction in Direction::ALL {
            let Some(neighbor) = grid.neighbor(index, direction) else {
                continue;
            };

            if grid.tiles[neighbor].is_space() {
                let space_temperature = grid.tiles[neighbor].temperature;
                let tile = &mut grid.tiles[index];
                tile.temperature_archived = tile.temperature;
                let coefficient = c.window_heat_transfer_coefficient * tile.thermal_conductivity;
                ShareSystem::temperature_share_solid(
                    tile,
                    coefficient,
                    space_temperature,
                    c.heat_capacity_vacuum,
                    config,
                );
                continue;
            }

            // Open edges already exchange heat through gas sharing
            if grid.tiles[index].is_open(direction) {
                continue;
            }
            if grid.tiles[neighbor].last_slow_queue_cycle == generation {
                continue;
            }

            let (tile, other) = grid.pair_mut(index, neighbor);
            let conductivity = tile.thermal_conductivity.min(other.thermal_conductivity);
            if conductivity <= 0.0 {
                continue;
            }
            // Conduct on live temperatures; the pass archive may be stale here
            tile.temperature_archived = tile.temperature;
            other.temperature_archived = other.temperature;
            let heat = ShareSystem::temperature_share(
                tile,
                other,
                c.window_heat_transfer_coefficient * conductivity,
                config,
            );
            if heat != 0.0 {
                grid.activate(neighbor);
                Self::consider_superconductivity(grid, neighbor, false, config);
            }
        }

        let tile = &mut grid.tiles[index];
        refresh_heat_capacity(tile, config);
        if tile.temperature < c.minimum_temperature_for_superconduction
            || tile.heat_capacity < c.mcell_with_ratio
        {
            grid.unregister_superconductor(index);
        } else {
            grid.activate(index);
        }
    }
}
