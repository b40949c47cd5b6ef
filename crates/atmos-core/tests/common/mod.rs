//! Grid builders shared by the integration tests

#![allow(dead_code)]

use atmos_core::{AtmosConfig, GasId, GasMixture, GridAtmos, RectLayout, TileAtmos};
use atmos_core::mixture::thermal_energy;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Sealed room of inert gas with scattered interior walls
///
/// Only oxygen, nitrogen and CO2 are used so nothing reacts.
pub fn random_room(seed: u64, width: usize, height: usize) -> (GridAtmos, RectLayout) {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let mut grid = GridAtmos::with_capacity(width * height);
    let layout = RectLayout::build(&mut grid, width, height, |position| {
        let mixture = GasMixture::new(rng.gen_range(250.0..350.0))
            .with_gas(GasId::OXYGEN, rng.gen_range(0.0..60.0))
            .with_gas(GasId::NITROGEN, rng.gen_range(0.0..120.0))
            .with_gas(GasId::CO2, rng.gen_range(0.0..10.0));
        TileAtmos::with_mixture(position, &mixture)
    })
    .unwrap();

    for _ in 0..(width * height / 10) {
        let x = rng.gen_range(0..width as i32);
        let y = rng.gen_range(0..height as i32);
        layout.make_wall(&mut grid, x, y).unwrap();
    }
    layout.activate_all(&mut grid).unwrap();
    (grid, layout)
}

pub fn species_totals(grid: &GridAtmos) -> [f32; 3] {
    let mut totals = [0.0; 3];
    for tile in grid.tiles() {
        totals[0] += tile.moles[GasId::OXYGEN];
        totals[1] += tile.moles[GasId::NITROGEN];
        totals[2] += tile.moles[GasId::CO2];
    }
    totals
}

/// Energy held by tiles that carry gas
pub fn gas_energy(grid: &GridAtmos, config: &AtmosConfig) -> f32 {
    grid.tiles()
        .iter()
        .filter(|t| !t.is_immutable())
        .map(|t| thermal_energy(t, config))
        .sum()
}

pub fn assert_close(actual: f32, expected: f32, relative: f32) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() / scale <= relative,
        "{actual} differs from {expected} by more than {relative}"
    );
}
