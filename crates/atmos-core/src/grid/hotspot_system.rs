//! Fire propagation
//!
//! A hotspot is a fire living on top of a tile. It has its own temperature
//! and volume, burns the tile's fuel every pass, leaks heat into the tile
//! and spreads to neighbours with fuel once it is hot enough.

use atmos_simulation::{AtmosConfig, Direction, GasId, HotspotState, TileAtmos};

use super::grid::GridAtmos;
use super::reaction_system::ReactionSystem;
use crate::mixture::{refresh_heat_capacity, tile_heat_capacity};

/// Smallest share of the hotspot's heat a live fire exposes per pass
const MINIMUM_EXPOSURE: f32 = 0.05;
/// Dying fires lose at least this many kelvin per pass
const MINIMUM_DECAY: f32 = 5.0;
const DECAY_RATIO: f32 = 0.1;
const FUEL_THRESHOLD: f32 = 0.5;

/// Handles hotspot ignition, burning, decay and spread
pub struct HotspotSystem;

impl HotspotSystem {
    /// Whether the tile holds enough fuel and oxidiser to carry a fire
    pub fn has_fuel(tile: &TileAtmos) -> bool {
        (tile.moles[GasId::PLASMA] >= FUEL_THRESHOLD || tile.moles[GasId::TRITIUM] >= FUEL_THRESHOLD)
            && tile.moles[GasId::OXYGEN] >= FUEL_THRESHOLD
    }

    /// Light (or feed) a fire on a tile
    ///
    /// Returns false when the tile cannot burn. A live fire keeps the higher
    /// of its current and the offered temperature and volume.
    pub fn ignite(
        grid: &mut GridAtmos,
        index: usize,
        temperature: f32,
        volume: f32,
        config: &AtmosConfig,
    ) -> bool {
        let c = &config.constants;
        let tile = &mut grid.tiles[index];
        if tile.is_space()
            || tile.is_immutable()
            || volume <= 0.0
            || temperature < c.plasma_minimum_burn_temperature
            || !Self::has_fuel(tile)
        {
            return false;
        }

        let volume = volume.min(c.cell_volume);
        let temperature = temperature.min(c.tmax);
        if tile.hotspot_state.is_lit() {
            tile.hotspot_temperature = tile.hotspot_temperature.max(temperature);
            tile.hotspot_volume = tile.hotspot_volume.max(volume);
            if tile.hotspot_state == HotspotState::Dying {
                tile.hotspot_state = HotspotState::Growing;
            }
        } else {
            tile.hotspot_state = HotspotState::Growing;
            tile.hotspot_temperature = temperature;
            tile.hotspot_volume = volume;
            log::trace!("Ignited hotspot at {} ({temperature:.1} K)", tile.grid_position);
        }

        grid.register_hotspot(index);
        grid.activate(index);
        true
    }

    /// Put a fire out immediately
    pub fn extinguish(grid: &mut GridAtmos, index: usize) {
        let tile = &mut grid.tiles[index];
        tile.hotspot_state = HotspotState::None;
        tile.hotspot_temperature = 0.0;
        tile.hotspot_volume = 0.0;
        grid.unregister_hotspot(index);
    }

    /// Advance every hotspot one pass, returning how many are still lit
    ///
    /// Fires lit by spreading during this pass start burning next pass.
    pub fn process(grid: &mut GridAtmos, config: &AtmosConfig) -> usize {
        let hotspots = grid.hotspot_tiles.to_vec();
        for index in hotspots {
            Self::process_hotspot(grid, index, config);
        }
        grid.hotspot_tiles.len()
    }

    fn process_hotspot(grid: &mut GridAtmos, index: usize, config: &AtmosConfig) {
        let c = &config.constants;
        let tile = &mut grid.tiles[index];
        if !tile.hotspot_state.is_lit() || tile.is_immutable() {
            Self::extinguish(grid, index);
            return;
        }

        let burn_temperature = tile.hotspot_temperature.max(tile.temperature);
        let burn = ReactionSystem::burn_hotspot_fuel(tile, burn_temperature, config);

        if burn.burned() {
            let capacity = tile_heat_capacity(tile, config);
            tile.hotspot_temperature = (burn_temperature + burn.energy / capacity).min(c.tmax);
            tile.hotspot_volume =
                (tile.hotspot_volume + burn.energy / c.fire_growth_rate).min(c.cell_volume);
            tile.hotspot_state = if tile.hotspot_temperature > c.fire_minimum_temperature_to_spread {
                HotspotState::Burning
            } else {
                HotspotState::Growing
            };

            if tile.hotspot_temperature > tile.temperature {
                let exposure = (tile.hotspot_volume / c.cell_volume).clamp(MINIMUM_EXPOSURE, 1.0);
                tile.temperature += (tile.hotspot_temperature - tile.temperature) * exposure;
                tile.temperature = tile.temperature.min(c.tmax);
            }
            refresh_heat_capacity(tile, config);
        } else {
            tile.hotspot_state = HotspotState::Dying;
            tile.hotspot_temperature -= (tile.hotspot_temperature * DECAY_RATIO).max(MINIMUM_DECAY);
            tile.hotspot_volume *= 0.5;
        }

        if tile.hotspot_temperature < c.fire_minimum_temperature_to_exist {
            log::trace!("Hotspot at {} burned out", tile.grid_position);
            Self::extinguish(grid, index);
            return;
        }

        let state = tile.hotspot_state;
        let radiated = tile.hotspot_temperature * c.fire_spread_radiosity_scale;
        grid.activate(index);

        if state == HotspotState::Burning {
            Self::spread(grid, index, radiated, config);
        }
    }

    fn spread(grid: &mut GridAtmos, index: usize, temperature: f32, config: &AtmosConfig) {
        for direction in Direction::ALL {
            let Some(neighbor) = grid.open_neighbor(index, direction) else {
                continue;
            };
            let tile = &grid.tiles[neighbor];
            if tile.hotspot_state.is_lit() || tile.is_space() || tile.is_immutable() {
                continue;
            }
            Self::ignite(grid, neighbor, temperature, 1.0, config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmos_simulation::GasMixture;
    use glam::IVec2;

    fn fuel_tile(x: i32, plasma: f32, oxygen: f32, temperature: f32) -> TileAtmos {
        let mixture = GasMixture::new(temperature)
            .with_gas(GasId::PLASMA, plasma)
            .with_gas(GasId::OXYGEN, oxygen);
        TileAtmos::with_mixture(IVec2::new(x, 0), &mixture)
    }

    fn row(tiles: Vec<TileAtmos>) -> GridAtmos {
        let mut grid = GridAtmos::new();
        let count = tiles.len();
        for tile in tiles {
            grid.add_tile(tile);
        }
        for i in 1..count {
            grid.set_adjacency(i - 1, Direction::East, Some(i)).unwrap();
            grid.set_adjacency(i, Direction::West, Some(i - 1)).unwrap();
        }
        grid
    }

    #[test]
    fn test_ignite_requires_fuel_and_heat() {
        let config = AtmosConfig::default();
        let mut grid = row(vec![
            fuel_tile(0, 5.0, 5.0, 400.0),
            fuel_tile(1, 0.0, 5.0, 400.0),
        ]);

        assert!(!HotspotSystem::ignite(&mut grid, 0, 300.0, 10.0, &config));
        assert!(!HotspotSystem::ignite(&mut grid, 0, 400.0, 0.0, &config));
        assert!(!HotspotSystem::ignite(&mut grid, 1, 400.0, 10.0, &config));
        assert!(HotspotSystem::ignite(&mut grid, 0, 400.0, 10.0, &config));

        let tile = grid.tile(0).unwrap();
        assert_eq!(tile.hotspot_state, HotspotState::Growing);
        assert!(tile.is_hotspot());
        assert!(tile.is_active());
        assert_eq!(grid.hotspot_tiles(), &[0]);
    }

    #[test]
    fn test_space_never_ignites() {
        let config = AtmosConfig::default();
        let mut space = TileAtmos::space(IVec2::ZERO, 2.7);
        space.moles[GasId::PLASMA] = 5.0;
        space.moles[GasId::OXYGEN] = 5.0;
        let mut grid = row(vec![space]);

        assert!(!HotspotSystem::ignite(&mut grid, 0, 1000.0, 10.0, &config));
        assert!(grid.hotspot_tiles().is_empty());
    }

    #[test]
    fn test_reignite_raises_temperature_and_volume() {
        let config = AtmosConfig::default();
        let mut grid = row(vec![fuel_tile(0, 5.0, 5.0, 400.0)]);

        HotspotSystem::ignite(&mut grid, 0, 500.0, 10.0, &config);
        HotspotSystem::ignite(&mut grid, 0, 450.0, 50.0, &config);

        let tile = grid.tile(0).unwrap();
        assert_eq!(tile.hotspot_temperature, 500.0);
        assert_eq!(tile.hotspot_volume, 50.0);
        assert_eq!(grid.hotspot_tiles().len(), 1);
    }

    #[test]
    fn test_fuelless_hotspot_cools_until_out() {
        let config = AtmosConfig::default();
        let mut grid = row(vec![fuel_tile(0, 5.0, 5.0, 400.0)]);
        assert!(HotspotSystem::ignite(&mut grid, 0, 2000.0, 100.0, &config));
        grid.tile_mut(0).unwrap().moles[GasId::PLASMA] = 0.0;

        let mut previous = grid.tile(0).unwrap().hotspot_temperature;
        let mut passes = 0;
        while grid.tile(0).unwrap().hotspot_state != HotspotState::None {
            HotspotSystem::process(&mut grid, &config);
            let tile = grid.tile(0).unwrap();
            if tile.hotspot_state != HotspotState::None {
                assert_eq!(tile.hotspot_state, HotspotState::Dying);
                assert!(tile.hotspot_temperature < previous);
                previous = tile.hotspot_temperature;
            }
            passes += 1;
            assert!(passes < 100, "hotspot never went out");
        }

        assert!(!grid.tile(0).unwrap().is_hotspot());
        assert!(grid.hotspot_tiles().is_empty());
    }

    #[test]
    fn test_burning_hotspot_heats_tile() {
        let config = AtmosConfig::default();
        let mut grid = row(vec![fuel_tile(0, 10.0, 100.0, 400.0)]);
        HotspotSystem::ignite(&mut grid, 0, 1000.0, 100.0, &config);

        HotspotSystem::process(&mut grid, &config);

        let tile = grid.tile(0).unwrap();
        assert!(tile.hotspot_state.is_lit());
        assert!(tile.temperature > 400.0);
        assert!(tile.moles[GasId::PLASMA] < 10.0);
    }

    #[test]
    fn test_burning_hotspot_spreads_to_fuel() {
        let config = AtmosConfig::default();
        let mut grid = row(vec![
            fuel_tile(0, 10.0, 100.0, 400.0),
            fuel_tile(1, 10.0, 100.0, 293.15),
            fuel_tile(2, 0.0, 100.0, 293.15),
        ]);
        HotspotSystem::ignite(&mut grid, 0, 2000.0, 500.0, &config);

        HotspotSystem::process(&mut grid, &config);

        assert_eq!(grid.tile(0).unwrap().hotspot_state, HotspotState::Burning);
        assert_eq!(grid.tile(1).unwrap().hotspot_state, HotspotState::Growing);
        assert_eq!(grid.tile(2).unwrap().hotspot_state, HotspotState::None);
    }

    #[test]
    fn test_blocked_edge_stops_spread() {
        let config = AtmosConfig::default();
        let mut grid = row(vec![
            fuel_tile(0, 10.0, 100.0, 400.0),
            fuel_tile(1, 10.0, 100.0, 293.15),
        ]);
        grid.set_blocked(0, Direction::East, true).unwrap();
        HotspotSystem::ignite(&mut grid, 0, 2000.0, 500.0, &config);

        HotspotSystem::process(&mut grid, &config);

        assert_eq!(grid.tile(1).unwrap().hotspot_state, HotspotState::None);
    }

    #[test]
    fn test_extinguish_clears_state() {
        let config = AtmosConfig::default();
        let mut grid = row(vec![fuel_tile(0, 5.0, 5.0, 400.0)]);
        HotspotSystem::ignite(&mut grid, 0, 800.0, 10.0, &config);

        HotspotSystem::extinguish(&mut grid, 0);

        let tile = grid.tile(0).unwrap();
        assert_eq!(tile.hotspot_state, HotspotState::None);
        assert_eq!(tile.hotspot_volume, 0.0);
        assert!(!tile.is_hotspot());
        assert!(grid.hotspot_tiles().is_empty());
    }
}
