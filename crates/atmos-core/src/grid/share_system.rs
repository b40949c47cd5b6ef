//! Gas and heat exchange between neighbouring tiles
//!
//! Gradients are always read from the archive so the order in which pairs
//! are visited within a pass does not change the outcome.

use atmos_simulation::{AtmosConfig, GAS_COUNT, TileAtmos};

use crate::mixture::tile_heat_capacity;

/// Handles diffusion: per-species mole sharing plus conduction
pub struct ShareSystem;

impl ShareSystem {
    /// Exchange gas between `receiver` and `sharer`, returning net moles moved
    ///
    /// Positive results mean gas flowed from receiver to sharer. The
    /// receiver splits its outflow across `adjacent_count` open neighbours.
    pub fn share(
        receiver: &mut TileAtmos,
        sharer: &mut TileAtmos,
        adjacent_count: usize,
        config: &AtmosConfig,
    ) -> f32 {
        let constants = &config.constants;
        let receiver_immutable = receiver.is_immutable();
        let sharer_immutable = sharer.is_immutable();

        Self::temperature_share(
            receiver,
            sharer,
            constants.open_heat_transfer_coefficient,
            config,
        );

        let receiver_capacity = tile_heat_capacity(receiver, config);
        let sharer_capacity = tile_heat_capacity(sharer, config);
        let divisor = 1.0 / (adjacent_count as f32 + 1.0);

        let mut capacity_to_sharer = 0.0;
        let mut capacity_to_receiver = 0.0;
        let mut moved = 0.0;
        let mut moved_abs = 0.0;

        for gas in 0..GAS_COUNT {
            let mut delta = (receiver.moles_archived[gas] - sharer.moles_archived[gas]) * divisor;
            // Never take more than the giving side currently holds
            if delta > 0.0 && !receiver_immutable {
                delta = delta.min(receiver.moles[gas]);
            } else if delta < 0.0 && !sharer_immutable {
                delta = delta.max(-sharer.moles[gas]);
            }
            if delta.abs() < constants.gas_min_moles {
                continue;
            }

            let capacity = delta * config.specific_heats[gas];
            if delta > 0.0 {
                capacity_to_sharer += capacity;
            } else {
                capacity_to_receiver -= capacity;
            }

            if !receiver_immutable {
                receiver.moles[gas] -= delta;
            }
            if !sharer_immutable {
                sharer.moles[gas] += delta;
            }
            moved += delta;
            moved_abs += delta.abs();
        }

        receiver.last_share = moved_abs;
        sharer.last_share = moved_abs;

        if moved_abs > 0.0 {
            // Moved gas carries the archived temperature of the side it left
            let carried_out = capacity_to_sharer * receiver.temperature_archived;
            let carried_in = capacity_to_receiver * sharer.temperature_archived;

            if !receiver_immutable {
                let capacity = receiver_capacity - capacity_to_sharer + capacity_to_receiver;
                if capacity > constants.minimum_heat_capacity {
                    let energy = receiver.temperature * receiver_capacity - carried_out + carried_in;
                    receiver.temperature = (energy / capacity).max(constants.tcmb);
                }
                receiver.heat_capacity = tile_heat_capacity(receiver, config);
            }
            if !sharer_immutable {
                let capacity = sharer_capacity + capacity_to_sharer - capacity_to_receiver;
                if capacity > constants.minimum_heat_capacity {
                    let energy = sharer.temperature * sharer_capacity + carried_out - carried_in;
                    sharer.temperature = (energy / capacity).max(constants.tcmb);
                }
                sharer.heat_capacity = tile_heat_capacity(sharer, config);
            }
        }

        moved
    }

    /// Conduct heat between two gas tiles, returning the heat moved
    ///
    /// `heat = k * dT_archived * (C_r * C_s / (C_r + C_s))`, positive when
    /// heat flows from receiver to sharer.
    pub fn temperature_share(
        receiver: &mut TileAtmos,
        sharer: &mut TileAtmos,
        coefficient: f32,
        config: &AtmosConfig,
    ) -> f32 {
        let constants = &config.constants;
        let delta = receiver.temperature_archived - sharer.temperature_archived;
        if delta.abs() <= constants.minimum_temperature_delta_to_consider {
            return 0.0;
        }

        let receiver_capacity = tile_heat_capacity(receiver, config);
        let sharer_capacity = tile_heat_capacity(sharer, config);
        let heat = coefficient
            * delta
            * (receiver_capacity * sharer_capacity / (receiver_capacity + sharer_capacity));

        if !receiver.is_immutable() {
            receiver.temperature = (receiver.temperature - heat / receiver_capacity).max(constants.tcmb);
        }
        if !sharer.is_immutable() {
            sharer.temperature = (sharer.temperature + heat / sharer_capacity).max(constants.tcmb);
        }
        heat
    }

    /// Conduct heat between a tile and a fixed reservoir (wall, hull, vacuum)
    ///
    /// Returns the reservoir's new temperature.
    pub fn temperature_share_solid(
        tile: &mut TileAtmos,
        coefficient: f32,
        other_temperature: f32,
        other_heat_capacity: f32,
        config: &AtmosConfig,
    ) -> f32 {
        let constants = &config.constants;
        let delta = tile.temperature_archived - other_temperature;
        if delta.abs() <= constants.minimum_temperature_delta_to_consider
            || other_heat_capacity <= constants.minimum_heat_capacity
        {
            return other_temperature;
        }

        let capacity = tile_heat_capacity(tile, config);
        let heat = coefficient * delta * (capacity * other_heat_capacity / (capacity + other_heat_capacity));

        if !tile.is_immutable() {
            tile.temperature = (tile.temperature - heat / capacity).max(constants.tcmb);
        }
        (other_temperature + heat / other_heat_capacity).max(constants.tcmb)
    }
}
