//! Gas reactions: combustion, frezon chemistry and decomposition
//!
//! Reactions run once per tile per pass, in a fixed order. Each one mutates
//! the tile's moles and folds released (or absorbed) energy into its
//! temperature using the heat capacity before and after the change.

use atmos_simulation::{AtmosConfig, GasId, TileAtmos};
use bitflags::bitflags;

use crate::mixture::{raw_heat_capacity, refresh_heat_capacity, thermal_energy};

/// Tiles holding less thermal energy than this never react
const MINIMUM_REACTION_ENERGY: f32 = 1000.0;

/// Trace amount below which a reactant does not participate
const REACTANT_THRESHOLD: f32 = 0.5;

/// Frezon production runs at full efficiency below this temperature
const FREZON_PRODUCTION_FULL_EFFICIENCY_TEMPERATURE: f32 = 73.15;
const FREZON_PRODUCTION_OXYGEN_RATIO: f32 = 50.0;
const FREZON_PRODUCTION_NITROGEN_RATIO: f32 = 10.0;

const WATER_CONDENSATION_RATE: f32 = 0.05;
const N2O_DECOMPOSITION_ENERGY: f32 = 20_000.0;
const AMMONIA_OXYGEN_RATIO: f32 = 0.75;

bitflags! {
    /// Reactions that fired during one `react` call
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ReactionOutcome: u8 {
        const PLASMA_FIRE = 1 << 0;
        const TRITIUM_FIRE = 1 << 1;
        const FREZON_PRODUCTION = 1 << 2;
        const FREZON_COOLANT = 1 << 3;
        const WATER_CONDENSATION = 1 << 4;
        const N2O_DECOMPOSITION = 1 << 5;
        const AMMONIA_OXIDATION = 1 << 6;
        /// Combustion pushed the tile past the fire spread threshold
        const FIRE_SPREAD = 1 << 7;
    }
}

impl ReactionOutcome {
    pub const NONE: Self = Self::empty();

    /// Whether any chemistry happened (spread is a consequence, not a reaction)
    pub fn reacted(self) -> bool {
        !(self - Self::FIRE_SPREAD).is_empty()
    }

    pub fn is_fire(self) -> bool {
        self.intersects(Self::PLASMA_FIRE | Self::TRITIUM_FIRE)
    }
}

/// Fuel consumed by a hotspot in one pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FuelBurn {
    pub fuel: f32,
    pub oxygen: f32,
    /// Joules released, already divided by the heat scale
    pub energy: f32,
}

impl FuelBurn {
    pub fn burned(&self) -> bool {
        self.fuel > 0.0
    }
}

/// Handles per-tile chemistry
pub struct ReactionSystem;

impl ReactionSystem {
    /// Run every reaction on the tile in order
    pub fn react(tile: &mut TileAtmos, config: &AtmosConfig) -> ReactionOutcome {
        if tile.is_immutable() || thermal_energy(tile, config) < MINIMUM_REACTION_ENERGY {
            return ReactionOutcome::NONE;
        }

        let reactions: [(fn(&mut TileAtmos, &AtmosConfig) -> bool, ReactionOutcome); 7] = [
            (Self::plasma_fire, ReactionOutcome::PLASMA_FIRE),
            (Self::tritium_fire, ReactionOutcome::TRITIUM_FIRE),
            (Self::frezon_production, ReactionOutcome::FREZON_PRODUCTION),
            (Self::frezon_coolant, ReactionOutcome::FREZON_COOLANT),
            (Self::water_condensation, ReactionOutcome::WATER_CONDENSATION),
            (Self::n2o_decomposition, ReactionOutcome::N2O_DECOMPOSITION),
            (Self::ammonia_oxidation, ReactionOutcome::AMMONIA_OXIDATION),
        ];

        let mut outcome = ReactionOutcome::NONE;
        for (reaction, flag) in reactions {
            if reaction(tile, config) {
                outcome |= flag;
            }
        }

        if outcome.is_fire() && tile.temperature > config.constants.fire_minimum_temperature_to_spread {
            outcome |= ReactionOutcome::FIRE_SPREAD;
        }
        if outcome.reacted() {
            refresh_heat_capacity(tile, config);
        }
        outcome
    }

    /// Burn plasma and tritium at the hotspot's temperature
    ///
    /// The released energy is returned instead of heating the tile; the fire
    /// subsystem decides where it goes.
    pub fn burn_hotspot_fuel(tile: &mut TileAtmos, temperature: f32, config: &AtmosConfig) -> FuelBurn {
        let c = &config.constants;
        let mut burn = FuelBurn::default();
        if tile.is_immutable() || temperature < c.plasma_minimum_burn_temperature {
            return burn;
        }

        let plasma = tile.moles[GasId::PLASMA];
        let oxygen = tile.moles[GasId::OXYGEN];
        if plasma > REACTANT_THRESHOLD && oxygen > REACTANT_THRESHOLD {
            let scale = Self::plasma_temperature_scale(temperature, config);
            let oxygen_burn_rate = c.oxygen_burn_rate_base - scale;
            let oxygen_factor = if oxygen > plasma * c.plasma_oxygen_fullburn {
                1.0
            } else {
                oxygen / (plasma * c.plasma_oxygen_fullburn)
            };
            let burned = (scale * oxygen_factor).min(plasma).min(oxygen / oxygen_burn_rate);

            if scale > 0.0 && burned > c.gas_min_moles {
                let oxygen_used = burned * oxygen_burn_rate;
                Self::burn_plasma(tile, burned, oxygen_used);
                burn.fuel += burned;
                burn.oxygen += oxygen_used;
                burn.energy += c.fire_plasma_energy_released * burned;
            }
        }

        let tritium = tile.moles[GasId::TRITIUM];
        let oxygen = tile.moles[GasId::OXYGEN];
        if tritium > REACTANT_THRESHOLD && oxygen > REACTANT_THRESHOLD {
            let burned = tritium
                .min(oxygen / c.tritium_burn_oxy_factor)
                .min(c.tritium_burn_trit_factor);
            if burned > c.gas_min_moles {
                let oxygen_used = burned * c.tritium_burn_oxy_factor;
                tile.moles[GasId::TRITIUM] -= burned;
                tile.moles[GasId::OXYGEN] -= oxygen_used;
                tile.moles[GasId::WATER_VAPOR] += burned;
                burn.fuel += burned;
                burn.oxygen += oxygen_used;
                burn.energy += c.fire_hydrogen_energy_released * burned;
            }
        }

        burn.energy /= config.heat_scale;
        if burn.burned() {
            refresh_heat_capacity(tile, config);
        }
        burn
    }

    fn plasma_temperature_scale(temperature: f32, config: &AtmosConfig) -> f32 {
        let c = &config.constants;
        if temperature > c.plasma_upper_temperature {
            1.0
        } else {
            (temperature - c.plasma_minimum_burn_temperature)
                / (c.plasma_upper_temperature - c.plasma_minimum_burn_temperature)
        }
    }

    fn burn_plasma(tile: &mut TileAtmos, plasma: f32, oxygen: f32) {
        tile.moles[GasId::PLASMA] = (tile.moles[GasId::PLASMA] - plasma).max(0.0);
        tile.moles[GasId::OXYGEN] = (tile.moles[GasId::OXYGEN] - oxygen).max(0.0);
        tile.moles[GasId::CO2] += plasma * 0.75;
        tile.moles[GasId::WATER_VAPOR] += plasma * 0.25;
    }

    /// Fold `energy` into the tile given its heat capacity before the moles changed
    fn apply_energy(tile: &mut TileAtmos, old_capacity: f32, energy: f32, config: &AtmosConfig) {
        let c = &config.constants;
        let new_capacity = raw_heat_capacity(&tile.moles, &config.specific_heats);
        if new_capacity > c.minimum_heat_capacity {
            let energy = energy / config.heat_scale;
            tile.temperature =
                ((tile.temperature * old_capacity + energy) / new_capacity).clamp(c.tcmb, c.tmax);
        }
    }

    fn plasma_fire(tile: &mut TileAtmos, config: &AtmosConfig) -> bool {
        let c = &config.constants;
        let oxygen = tile.moles[GasId::OXYGEN];
        let plasma = tile.moles[GasId::PLASMA];
        if plasma < REACTANT_THRESHOLD
            || oxygen < REACTANT_THRESHOLD
            || tile.temperature < c.plasma_minimum_burn_temperature
        {
            return false;
        }

        let scale = Self::plasma_temperature_scale(tile.temperature, config);
        if scale <= 0.0 {
            return false;
        }

        let oxygen_burn_rate = c.oxygen_burn_rate_base - scale;
        let rate = if oxygen > plasma * c.plasma_oxygen_fullburn {
            plasma * scale / c.plasma_burn_rate_delta
        } else {
            (scale * (oxygen / plasma)) / (c.plasma_burn_rate_delta * c.plasma_oxygen_fullburn)
        };
        if rate <= c.gas_min_moles {
            return false;
        }

        let burned = rate.min(plasma).min(oxygen / oxygen_burn_rate);
        let old_capacity = raw_heat_capacity(&tile.moles, &config.specific_heats);
        Self::burn_plasma(tile, burned, burned * oxygen_burn_rate);
        Self::apply_energy(tile, old_capacity, c.fire_plasma_energy_released * burned, config);
        true
    }

    fn tritium_fire(tile: &mut TileAtmos, config: &AtmosConfig) -> bool {
        let c = &config.constants;
        let oxygen = tile.moles[GasId::OXYGEN];
        let tritium = tile.moles[GasId::TRITIUM];
        if tritium < REACTANT_THRESHOLD
            || oxygen < REACTANT_THRESHOLD
            || tile.temperature < c.plasma_minimum_burn_temperature
        {
            return false;
        }

        let burned = tritium.min(oxygen / c.tritium_burn_oxy_factor);
        if burned < c.gas_min_moles {
            return false;
        }

        let old_capacity = raw_heat_capacity(&tile.moles, &config.specific_heats);
        tile.moles[GasId::TRITIUM] -= burned;
        tile.moles[GasId::OXYGEN] = (oxygen - burned * c.tritium_burn_oxy_factor).max(0.0);
        tile.moles[GasId::WATER_VAPOR] += burned;
        Self::apply_energy(tile, old_capacity, c.fire_hydrogen_energy_released * burned, config);
        true
    }

    fn frezon_production(tile: &mut TileAtmos, config: &AtmosConfig) -> bool {
        let c = &config.constants;
        let oxygen = tile.moles[GasId::OXYGEN];
        let tritium = tile.moles[GasId::TRITIUM];
        let nitrogen = tile.moles[GasId::NITROGEN];
        if tritium < REACTANT_THRESHOLD
            || oxygen < REACTANT_THRESHOLD
            || nitrogen < REACTANT_THRESHOLD
            || tile.temperature > c.frezon_cool_mid_temperature
        {
            return false;
        }

        let efficiency = if tile.temperature < FREZON_PRODUCTION_FULL_EFFICIENCY_TEMPERATURE {
            1.0
        } else {
            1.0 - (tile.temperature - FREZON_PRODUCTION_FULL_EFFICIENCY_TEMPERATURE)
                / (c.frezon_cool_mid_temperature - FREZON_PRODUCTION_FULL_EFFICIENCY_TEMPERATURE)
        };
        if efficiency <= 0.0 {
            return false;
        }

        let tritium_used = tritium
            .min(oxygen / FREZON_PRODUCTION_OXYGEN_RATIO)
            .min(nitrogen * FREZON_PRODUCTION_NITROGEN_RATIO);
        let produced = tritium_used * efficiency / FREZON_PRODUCTION_OXYGEN_RATIO;
        if produced < c.gas_min_moles {
            return false;
        }

        let old_capacity = raw_heat_capacity(&tile.moles, &config.specific_heats);
        tile.moles[GasId::TRITIUM] -= tritium_used;
        tile.moles[GasId::OXYGEN] = (oxygen - tritium_used * FREZON_PRODUCTION_OXYGEN_RATIO).max(0.0);
        tile.moles[GasId::NITROGEN] =
            (nitrogen - tritium_used / FREZON_PRODUCTION_NITROGEN_RATIO).max(0.0);
        tile.moles[GasId::FREZON] += produced;
        Self::apply_energy(tile, old_capacity, 0.0, config);
        true
    }

    /// Frezon and nitrogen absorb heat, producing N2O
    fn frezon_coolant(tile: &mut TileAtmos, config: &AtmosConfig) -> bool {
        let c = &config.constants;
        let frezon = tile.moles[GasId::FREZON];
        let nitrogen = tile.moles[GasId::NITROGEN];
        if frezon < REACTANT_THRESHOLD || nitrogen < REACTANT_THRESHOLD {
            return false;
        }

        let mut scale = (tile.temperature - c.frezon_cool_lower_temperature)
            / (c.frezon_cool_mid_temperature - c.frezon_cool_lower_temperature);
        if scale <= 0.0 {
            return false;
        }
        let mut energy_modifier = 1.0;
        if scale > 1.0 {
            energy_modifier = scale.min(c.frezon_cool_maximum_energy_modifier);
            scale = 1.0;
        }

        let old_capacity = raw_heat_capacity(&tile.moles, &config.specific_heats);
        if old_capacity < c.minimum_heat_capacity {
            return false;
        }
        let burn_rate = frezon * scale / c.frezon_cool_rate_modifier;
        if burn_rate < c.gas_min_moles {
            return false;
        }

        let nitrogen_used = (burn_rate * c.frezon_nitrogen_cool_ratio).min(nitrogen);
        let frezon_used = burn_rate.min(frezon);
        tile.moles[GasId::NITROGEN] -= nitrogen_used;
        tile.moles[GasId::FREZON] -= frezon_used;
        tile.moles[GasId::N2O] += nitrogen_used + frezon_used;

        let energy = burn_rate * c.frezon_cool_energy_released * energy_modifier;
        Self::apply_energy(tile, old_capacity, energy, config);
        true
    }

    fn water_condensation(tile: &mut TileAtmos, config: &AtmosConfig) -> bool {
        let c = &config.constants;
        let water = tile.moles[GasId::WATER_VAPOR];
        if water < REACTANT_THRESHOLD || tile.temperature > c.t0c + 100.0 {
            return false;
        }
        let condensed = water * WATER_CONDENSATION_RATE;
        if condensed < c.gas_min_moles {
            return false;
        }
        tile.moles[GasId::WATER_VAPOR] -= condensed;
        true
    }

    fn n2o_decomposition(tile: &mut TileAtmos, config: &AtmosConfig) -> bool {
        let c = &config.constants;
        let n2o = tile.moles[GasId::N2O];
        if n2o < REACTANT_THRESHOLD || tile.temperature < c.t0c + 250.0 {
            return false;
        }
        let reacted = n2o / 2.0;
        if reacted < c.gas_min_moles {
            return false;
        }

        let old_capacity = raw_heat_capacity(&tile.moles, &config.specific_heats);
        tile.moles[GasId::N2O] -= reacted;
        tile.moles[GasId::NITROGEN] += reacted;
        tile.moles[GasId::OXYGEN] += reacted * 0.5;
        Self::apply_energy(tile, old_capacity, reacted * N2O_DECOMPOSITION_ENERGY, config);
        true
    }

    fn ammonia_oxidation(tile: &mut TileAtmos, config: &AtmosConfig) -> bool {
        let c = &config.constants;
        let ammonia = tile.moles[GasId::AMMONIA];
        let oxygen = tile.moles[GasId::OXYGEN];
        if ammonia < REACTANT_THRESHOLD
            || oxygen < REACTANT_THRESHOLD
            || tile.temperature < c.t0c + 100.0
        {
            return false;
        }

        let used = ammonia.min(oxygen / AMMONIA_OXYGEN_RATIO) / 10.0;
        if used < c.gas_min_moles {
            return false;
        }

        let old_capacity = raw_heat_capacity(&tile.moles, &config.specific_heats);
        tile.moles[GasId::AMMONIA] -= used;
        tile.moles[GasId::OXYGEN] -= used * AMMONIA_OXYGEN_RATIO;
        tile.moles[GasId::NITROGEN] += used * 0.5;
        tile.moles[GasId::WATER_VAPOR] += used * 1.5;
        Self::apply_energy(tile, old_capacity, 0.0, config);
        true
    }
}
