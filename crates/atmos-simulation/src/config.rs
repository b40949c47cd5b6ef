//! Engine constants and per-call configuration
//!
//! Everything is plain data with serde derives so hosts can load overrides
//! from RON. Missing fields fall back to [`Default`], which carries the
//! standard tuning.

use crate::gases::{GAS_ARRAY_SIZE, GasArray, Gases};
use serde::{Deserialize, Serialize};

/// Physical constants and tuning thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosConstants {
    /// Ideal gas constant (J/(mol·K))
    pub r: f32,
    /// kPa
    pub one_atmosphere: f32,
    /// Cosmic microwave background temperature
    pub tcmb: f32,
    pub t0c: f32,
    pub t20c: f32,
    pub tmax: f32,
    /// Litres per tile
    pub cell_volume: f32,
    /// Species below this many moles snap to zero
    pub gas_min_moles: f32,
    pub open_heat_transfer_coefficient: f32,
    pub window_heat_transfer_coefficient: f32,
    pub heat_capacity_vacuum: f32,

    pub minimum_air_ratio_to_suspend: f32,
    pub minimum_air_ratio_to_move: f32,
    pub minimum_air_to_suspend: f32,
    pub minimum_moles_delta_to_move: f32,
    pub minimum_temperature_to_move: f32,
    pub minimum_temperature_delta_to_suspend: f32,
    pub minimum_temperature_delta_to_consider: f32,
    pub minimum_temperature_start_superconduction: f32,
    pub minimum_temperature_for_superconduction: f32,
    pub minimum_heat_capacity: f32,
    pub space_heat_capacity: f32,
    /// Heat capacity a tile needs before it may superconduct
    pub mcell_with_ratio: f32,

    pub fire_minimum_temperature_to_exist: f32,
    pub fire_minimum_temperature_to_spread: f32,
    pub fire_spread_radiosity_scale: f32,
    pub fire_plasma_energy_released: f32,
    pub fire_hydrogen_energy_released: f32,
    pub fire_growth_rate: f32,

    pub plasma_minimum_burn_temperature: f32,
    pub plasma_upper_temperature: f32,
    pub plasma_oxygen_fullburn: f32,
    pub plasma_burn_rate_delta: f32,
    pub oxygen_burn_rate_base: f32,
    pub super_saturation_threshold: f32,
    pub tritium_burn_oxy_factor: f32,
    pub tritium_burn_trit_factor: f32,

    pub frezon_cool_lower_temperature: f32,
    pub frezon_cool_mid_temperature: f32,
    pub frezon_cool_maximum_energy_modifier: f32,
    pub frezon_nitrogen_cool_ratio: f32,
    pub frezon_cool_energy_released: f32,
    pub frezon_cool_rate_modifier: f32,

    pub excited_group_breakdown_cycles: u32,
    pub excited_group_dismantle_cycles: u32,
    pub monstermos_hard_tile_limit: usize,
    pub monstermos_tile_limit: usize,
}

impl AtmosConstants {
    /// Moles in one standard tile (one atmosphere at 20°C)
    pub fn moles_cell_standard(&self) -> f32 {
        (self.one_atmosphere * self.cell_volume) / (self.t20c * self.r)
    }

    /// Recompute the thresholds derived from the standard tile
    pub fn with_derived_thresholds(mut self) -> Self {
        let standard = self.moles_cell_standard();
        self.minimum_air_to_suspend = standard * self.minimum_air_ratio_to_suspend;
        self.minimum_moles_delta_to_move = standard * self.minimum_air_ratio_to_move;
        self.mcell_with_ratio = standard * 0.005;
        self
    }
}

impl Default for AtmosConstants {
    fn default() -> Self {
        let t0c = 273.15;
        let t20c = 293.15;
        Self {
            r: 8.314_462_6,
            one_atmosphere: 101.325,
            tcmb: 2.7,
            t0c,
            t20c,
            tmax: 262_144.0,
            cell_volume: 2500.0,
            gas_min_moles: 0.000_000_05,
            open_heat_transfer_coefficient: 0.4,
            window_heat_transfer_coefficient: 0.1,
            heat_capacity_vacuum: 7000.0,
            minimum_air_ratio_to_suspend: 0.1,
            minimum_air_ratio_to_move: 0.001,
            minimum_air_to_suspend: 0.0,
            minimum_moles_delta_to_move: 0.0,
            minimum_temperature_to_move: t20c + 100.0,
            minimum_temperature_delta_to_suspend: 4.0,
            minimum_temperature_delta_to_consider: 0.01,
            minimum_temperature_start_superconduction: t20c + 400.0,
            minimum_temperature_for_superconduction: t20c + 80.0,
            minimum_heat_capacity: 0.0003,
            space_heat_capacity: 7000.0,
            mcell_with_ratio: 0.0,
            fire_minimum_temperature_to_exist: t0c + 100.0,
            fire_minimum_temperature_to_spread: t0c + 150.0,
            fire_spread_radiosity_scale: 0.85,
            fire_plasma_energy_released: 160_000.0,
            fire_hydrogen_energy_released: 284_000.0,
            fire_growth_rate: 40_000.0,
            plasma_minimum_burn_temperature: t0c + 100.0,
            plasma_upper_temperature: t0c + 1370.0,
            plasma_oxygen_fullburn: 10.0,
            plasma_burn_rate_delta: 9.0,
            oxygen_burn_rate_base: 1.4,
            super_saturation_threshold: 96.0,
            tritium_burn_oxy_factor: 100.0,
            tritium_burn_trit_factor: 10.0,
            frezon_cool_lower_temperature: 23.15,
            frezon_cool_mid_temperature: 373.15,
            frezon_cool_maximum_energy_modifier: 10.0,
            frezon_nitrogen_cool_ratio: 5.0,
            frezon_cool_energy_released: -600_000.0,
            frezon_cool_rate_modifier: 20.0,
            excited_group_breakdown_cycles: 4,
            excited_group_dismantle_cycles: 16,
            monstermos_hard_tile_limit: 2000,
            monstermos_tile_limit: 200,
        }
        .with_derived_thresholds()
    }
}

/// Engine configuration, read-only for the duration of a processing call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosConfig {
    /// Per-species heat capacity in tile array layout
    pub specific_heats: GasArray,
    pub constants: AtmosConstants,
    /// Wall-clock budget per `process` call
    pub max_process_time_us: u64,
    /// Tile budget per `process` call, zero or less means unlimited
    pub max_tiles_per_call: i64,
    pub speedup: f32,
    pub heat_scale: f32,
    pub monstermos_enabled: bool,
    pub excited_groups_enabled: bool,
    pub superconduction_enabled: bool,
    pub spacing_enabled: bool,
    /// Fraction of a tile's gas that may escape per venting step
    pub spacing_escape_ratio: f32,
    /// Tiles with less gas than this vent completely
    pub spacing_min_gas: f32,
    /// Upper bound on moles moved per venting step
    pub spacing_max_wind: f32,
    /// Recorded pressure difference above which a high-pressure tile forces a
    /// zone equalization (moles moved by equalization, kPa from sharing)
    pub monstermos_rupture_pressure: f32,
    /// Full process runs superconduction every N update cycles
    pub superconduction_interval: u32,
}

impl AtmosConfig {
    /// Per-call tile budget, `None` when unlimited
    pub fn tile_budget(&self) -> Option<usize> {
        (self.max_tiles_per_call > 0).then_some(self.max_tiles_per_call as usize)
    }

    /// Config with an unlimited wall-clock budget and a fixed tile budget
    pub fn deterministic(max_tiles_per_call: i64) -> Self {
        Self {
            max_process_time_us: u64::MAX,
            max_tiles_per_call,
            ..Self::default()
        }
    }
}

impl Default for AtmosConfig {
    fn default() -> Self {
        let constants = AtmosConstants::default();
        let mut specific_heats = Gases::new().specific_heats();
        debug_assert_eq!(specific_heats.len(), GAS_ARRAY_SIZE);
        specific_heats[crate::gases::GAS_COUNT..].fill(0.0);
        Self {
            specific_heats,
            monstermos_rupture_pressure: constants.one_atmosphere * 2.0,
            constants,
            max_process_time_us: 5000,
            max_tiles_per_call: 0,
            speedup: 1.0,
            heat_scale: 1.0,
            monstermos_enabled: true,
            excited_groups_enabled: true,
            superconduction_enabled: true,
            spacing_enabled: true,
            spacing_escape_ratio: 0.9,
            spacing_min_gas: 2.0,
            spacing_max_wind: 500.0,
            superconduction_interval: 1,
        }
    }
}
