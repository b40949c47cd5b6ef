//! Excited groups: clusters of active tiles that settle together
//!
//! Tiles that exchange gas are linked into a group. Quiet groups are
//! periodically averaged in one step (breakdown) and, if they stay quiet,
//! dismantled so their members can leave the active set.

use atmos_simulation::{AtmosConfig, Direction, GAS_ARRAY_SIZE, GAS_COUNT, NO_GROUP};

use super::grid::GridAtmos;
use crate::mixture::{Exchange, compare_exchange, raw_heat_capacity, refresh_heat_capacity};

/// Handles excited group bookkeeping
pub struct ExcitedGroupSystem;

impl ExcitedGroupSystem {
    /// Put two exchanging tiles into the same group
    ///
    /// Grouped pairs merge their groups; a lone tile joins its partner's
    /// group; two lone tiles found a new one.
    pub fn link(grid: &mut GridAtmos, a: usize, b: usize) -> usize {
        let group_a = grid.tiles[a].excited_group_id;
        let group_b = grid.tiles[b].excited_group_id;
        match (group_a, group_b) {
            (NO_GROUP, NO_GROUP) => {
                let group = grid.create_group();
                grid.add_to_group(group, a);
                grid.add_to_group(group, b);
                group
            }
            (NO_GROUP, group) => {
                grid.add_to_group(group as usize, a);
                group as usize
            }
            (group, NO_GROUP) => {
                grid.add_to_group(group as usize, b);
                group as usize
            }
            (group_a, group_b) => grid.merge_groups(group_a as usize, group_b as usize),
        }
    }

    /// Keep a tile's group awake after a large exchange
    pub fn last_share_check(grid: &mut GridAtmos, index: usize, config: &AtmosConfig) {
        let tile = &grid.tiles[index];
        let group = tile.excited_group_id;
        if group < 0 {
            return;
        }
        let Some(g) = grid.excited_groups.get_mut(group as usize) else {
            return;
        };
        let c = &config.constants;
        if tile.last_share > c.minimum_air_to_suspend {
            g.breakdown_cooldown = 0;
            g.dismantle_cooldown = 0;
        } else if tile.last_share > c.minimum_moles_delta_to_move {
            g.dismantle_cooldown = 0;
        }
    }

    /// Advance every live group's cooldowns, returning how many remain
    pub fn process(grid: &mut GridAtmos, config: &AtmosConfig) -> usize {
        let c = &config.constants;
        let live: Vec<usize> = grid.excited_groups().map(|g| g.id).collect();

        for id in live {
            let group = &mut grid.excited_groups[id];
            group.breakdown_cooldown += 1;
            group.dismantle_cooldown += 1;

            if group.breakdown_cooldown > c.excited_group_breakdown_cycles {
                Self::self_breakdown(grid, id, config);
            } else if group.dismantle_cooldown > c.excited_group_dismantle_cycles {
                Self::dismantle(grid, id, config);
            }
        }

        grid.excited_group_count()
    }

    /// Set every mutable member to the group's average mixture
    pub fn self_breakdown(grid: &mut GridAtmos, group: usize, config: &AtmosConfig) {
        let members: Vec<usize> = grid.excited_groups[group]
            .tiles
            .iter()
            .copied()
            .filter(|&i| !grid.tiles[i].is_immutable())
            .collect();
        grid.excited_groups[group].breakdown_cooldown = 0;
        if members.is_empty() {
            return;
        }

        let mut moles = [0.0; GAS_ARRAY_SIZE];
        let mut energy = 0.0;
        let mut capacity = 0.0;
        for &index in &members {
            let tile = &grid.tiles[index];
            for (total, m) in moles.iter_mut().zip(&tile.moles).take(GAS_COUNT) {
                *total += m;
            }
            let tile_capacity = raw_heat_capacity(&tile.moles, &config.specific_heats);
            energy += tile_capacity * tile.temperature;
            capacity += tile_capacity;
        }

        let count = members.len() as f32;
        for m in moles.iter_mut() {
            *m /= count;
        }
        let temperature = if capacity > config.constants.minimum_heat_capacity {
            Some(energy / capacity)
        } else {
            None
        };

        for index in members {
            let tile = &mut grid.tiles[index];
            tile.moles = moles;
            if let Some(temperature) = temperature {
                tile.temperature = temperature;
            }
            refresh_heat_capacity(tile, config);
        }
    }

    /// Retire a group; members that have settled leave the active set
    pub fn dismantle(grid: &mut GridAtmos, group: usize, config: &AtmosConfig) {
        let members = grid.excited_groups[group].tiles.clone();
        grid.dispose_group(group);
        log::trace!("Dismantled excited group {group} ({} tiles)", members.len());

        for index in members {
            if !grid.tiles[index].is_active() {
                continue;
            }
            if !Self::differs_from_neighbors(grid, index, config) {
                grid.deactivate(index, false);
            }
        }
    }

    /// Whether any open neighbour would still exchange with this tile
    pub fn differs_from_neighbors(grid: &GridAtmos, index: usize, config: &AtmosConfig) -> bool {
        let tile = &grid.tiles[index];
        Direction::ALL.into_iter().any(|direction| {
            grid.open_neighbor(index, direction).is_some_and(|n| {
                compare_exchange(tile, &grid.tiles[n], &config.constants) != Exchange::None
            })
        })
    }
}
