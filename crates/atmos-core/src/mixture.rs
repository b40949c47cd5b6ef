//! Gas mixture algebra on tile records
//!
//! Pure per-tile operations with no grid traversal: heat capacity, thermal
//! energy, merging, splitting and archiving. Every function honours
//! [`TileFlags::IMMUTABLE`]: immutable tiles can be read and copied from but
//! are never depleted or heated.

use atmos_simulation::{
    AtmosConfig, AtmosConstants, GAS_ARRAY_SIZE, GAS_COUNT, GasArray, GasMixture, TileAtmos,
};

/// Space tiles with less gas than this count as hard vacuum
const SPACE_VACUUM_MOLES: f32 = 0.0001;

/// Result of comparing two neighbouring tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// This species differs enough to move
    Gas(usize),
    /// Composition is close but temperatures differ
    Temperature,
    /// Nothing worth sharing
    None,
}

/// Sum of `moles[i] * specific_heat[i]`, without floors
pub fn raw_heat_capacity(moles: &GasArray, specific_heats: &GasArray) -> f32 {
    moles
        .iter()
        .zip(specific_heats.iter())
        .take(GAS_COUNT)
        .map(|(m, c)| m * c)
        .sum()
}

/// Heat capacity floored at the vacuum minimum; near-empty space reports the space sink value
pub fn heat_capacity(moles: &GasArray, space: bool, config: &AtmosConfig) -> f32 {
    let constants = &config.constants;
    if space && moles[..GAS_COUNT].iter().sum::<f32>() < SPACE_VACUUM_MOLES {
        return constants.space_heat_capacity;
    }
    raw_heat_capacity(moles, &config.specific_heats).max(constants.minimum_heat_capacity)
}

pub fn tile_heat_capacity(tile: &TileAtmos, config: &AtmosConfig) -> f32 {
    heat_capacity(&tile.moles, tile.is_space(), config)
}

pub fn heat_capacity_archived(tile: &TileAtmos, config: &AtmosConfig) -> f32 {
    heat_capacity(&tile.moles_archived, tile.is_space(), config)
}

pub fn mixture_heat_capacity(mixture: &GasMixture, config: &AtmosConfig) -> f32 {
    heat_capacity(&mixture.moles, false, config)
}

pub fn thermal_energy(tile: &TileAtmos, config: &AtmosConfig) -> f32 {
    tile_heat_capacity(tile, config) * tile.temperature
}

/// Recompute the cached heat capacity after the moles changed
pub fn refresh_heat_capacity(tile: &mut TileAtmos, config: &AtmosConfig) {
    tile.heat_capacity = tile_heat_capacity(tile, config);
}

/// Ideal gas pressure in kPa
pub fn pressure(tile: &TileAtmos, constants: &AtmosConstants) -> f32 {
    if constants.cell_volume <= 0.0 {
        return 0.0;
    }
    tile.total_moles() * constants.r * tile.temperature / constants.cell_volume
}

/// Snapshot moles and temperature for the pass about to run
pub fn archive(tile: &mut TileAtmos, config: &AtmosConfig) {
    tile.moles_archived = tile.moles;
    tile.temperature_archived = tile.temperature;
    refresh_heat_capacity(tile, config);
}

/// Add `giver_moles` at `giver_temperature` into `receiver`, mixing energy
fn merge_moles(
    receiver: &mut TileAtmos,
    giver_moles: &GasArray,
    giver_temperature: f32,
    config: &AtmosConfig,
) {
    let receiver_capacity = raw_heat_capacity(&receiver.moles, &config.specific_heats);
    let giver_capacity = raw_heat_capacity(giver_moles, &config.specific_heats);
    let combined = receiver_capacity + giver_capacity;

    if combined > config.constants.minimum_heat_capacity {
        receiver.temperature = (receiver.temperature * receiver_capacity
            + giver_temperature * giver_capacity)
            / combined;
    }

    for (moles, added) in receiver.moles.iter_mut().zip(giver_moles).take(GAS_COUNT) {
        *moles += added;
    }
    refresh_heat_capacity(receiver, config);
}

/// Merge a free mixture into a tile and empty the mixture
///
/// Temperature becomes the energy-weighted average. A side with no heat
/// capacity contributes nothing. Immutable receivers are left untouched.
pub fn merge(receiver: &mut TileAtmos, giver: &mut GasMixture, config: &AtmosConfig) {
    if receiver.is_immutable() {
        return;
    }
    merge_moles(receiver, &giver.moles, giver.temperature, config);
    giver.moles = [0.0; GAS_ARRAY_SIZE];
}

/// Merge one tile's gas into another, emptying the giver unless it is immutable
pub fn merge_tiles(receiver: &mut TileAtmos, giver: &mut TileAtmos, config: &AtmosConfig) {
    if receiver.is_immutable() {
        return;
    }
    merge_moles(receiver, &giver.moles, giver.temperature, config);
    if !giver.is_immutable() {
        giver.moles = [0.0; GAS_ARRAY_SIZE];
        refresh_heat_capacity(giver, config);
    }
}

/// Extract `ratio` of every species into a new mixture at the tile temperature
pub fn remove_ratio(tile: &mut TileAtmos, ratio: f32, config: &AtmosConfig) -> GasMixture {
    let mut removed = GasMixture::new(tile.temperature);
    // Also rejects NaN
    if !(ratio > 0.0) || tile.total_moles() <= 0.0 {
        return removed;
    }
    let ratio = ratio.min(1.0);
    let immutable = tile.is_immutable();

    for gas in 0..GAS_COUNT {
        let taken = tile.moles[gas] * ratio;
        removed.moles[gas] = taken;
        if !immutable {
            tile.moles[gas] -= taken;
            if tile.moles[gas] < config.constants.gas_min_moles {
                tile.moles[gas] = 0.0;
            }
        }
    }

    if !immutable {
        refresh_heat_capacity(tile, config);
    }
    removed
}

/// Extract `amount` moles spread proportionally across species
pub fn remove_amount(tile: &mut TileAtmos, amount: f32, config: &AtmosConfig) -> GasMixture {
    let total = tile.total_moles();
    if !(amount > 0.0) || total <= 0.0 {
        return GasMixture::new(tile.temperature);
    }
    remove_ratio(tile, amount / total, config)
}

/// Decide whether two neighbours should exchange gas or heat
pub fn compare_exchange(a: &TileAtmos, b: &TileAtmos, constants: &AtmosConstants) -> Exchange {
    let mut total = 0.0;

    for gas in 0..GAS_COUNT {
        let moles = a.moles[gas];
        let delta = (moles - b.moles[gas]).abs();
        if delta > constants.minimum_moles_delta_to_move
            && delta > moles * constants.minimum_air_ratio_to_move
        {
            return Exchange::Gas(gas);
        }
        total += moles;
    }

    if total > constants.minimum_moles_delta_to_move
        && (a.temperature - b.temperature).abs() > constants.minimum_temperature_delta_to_suspend
    {
        return Exchange::Temperature;
    }

    Exchange::None
}
