//! Seeded station generator for benchmarks
//!
//! Lays out a square grid of rooms separated by walls with doorways, fills
//! them with breathable air and sprinkles in plasma leaks and hull breaches.

use anyhow::Result;
use atmos_core::{AtmosConfig, GasId, GasMixture, GridAtmos, RectLayout, TileAtmos};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Generation knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationSpec {
    pub size: usize,
    pub seed: u64,
    /// Room edge length including one wall
    pub room_size: usize,
    /// Chance per room of a plasma leak
    pub leak_chance: f64,
    /// Chance per room of an open hull breach
    pub breach_chance: f64,
}

impl StationSpec {
    pub fn new(size: usize, seed: u64) -> Self {
        Self {
            size,
            seed,
            room_size: 8,
            leak_chance: 0.1,
            breach_chance: 0.02,
        }
    }
}

/// Standard air: 21.8 mol oxygen and 82.2 mol nitrogen at 20°C
pub fn station_air() -> GasMixture {
    GasMixture::new(293.15)
        .with_gas(GasId::OXYGEN, 21.8)
        .with_gas(GasId::NITROGEN, 82.2)
}

/// Build the station into `grid` and put every mutable tile in the active set
pub fn generate(
    grid: &mut GridAtmos,
    spec: &StationSpec,
    config: &AtmosConfig,
) -> Result<RectLayout> {
    let mut rng = Xoshiro256StarStar::seed_from_u64(spec.seed);
    let air = station_air();
    let layout = RectLayout::build(grid, spec.size, spec.size, |position| {
        let mut tile = TileAtmos::with_mixture(position, &air);
        tile.thermal_conductivity = 0.5;
        tile
    })?;

    let room = spec.room_size.max(3) as i32;
    let size = spec.size as i32;

    // Walls on every room boundary, doorway in the middle of each segment
    for y in 0..size {
        for x in 0..size {
            let on_wall = x % room == 0 || y % room == 0;
            let doorway = (x % room == room / 2) || (y % room == room / 2);
            if on_wall && !doorway {
                layout.make_wall(grid, x, y)?;
            }
        }
    }

    let mut leaks = 0;
    let mut breaches = 0;
    for room_y in (0..size).step_by(room as usize) {
        for room_x in (0..size).step_by(room as usize) {
            let x = (room_x + rng.gen_range(1..room)).min(size - 1);
            let y = (room_y + rng.gen_range(1..room)).min(size - 1);
            let index = layout.index_at(x, y)?;
            if grid.tile(index)?.is_immutable() {
                continue;
            }

            if rng.gen_bool(spec.leak_chance) {
                let tile = grid.tile_mut(index)?;
                tile.moles[GasId::PLASMA] += rng.gen_range(5.0..40.0);
                tile.moles[GasId::OXYGEN] += 40.0;
                tile.temperature = rng.gen_range(500.0..900.0);
                leaks += 1;
            } else if rng.gen_bool(spec.breach_chance) {
                layout.make_space(grid, x, y, config)?;
                breaches += 1;
            }
        }
    }

    layout.activate_all(grid)?;
    grid.process_revalidate(config);
    log::info!(
        "Generated {0}x{0} station (seed {1}): {leaks} plasma leaks, {breaches} breaches",
        spec.size,
        spec.seed
    );
    Ok(layout)
}
