//! GridAtmos - owns the tile arena and every per-grid list

use atmos_simulation::{
    DIRECTIONS, Direction, GAS_COUNT, NO_DIRECTION, NO_GROUP, NO_TILE, TileAtmos, TileFlags,
};
use smallvec::SmallVec;

use super::processor::PassCursor;
use super::tile_set::TileSet;
use crate::error::{AtmosError, AtmosResult};

/// A cluster of neighbouring active tiles processed as one
#[derive(Debug, Clone, Default)]
pub struct ExcitedGroup {
    pub id: usize,
    pub breakdown_cooldown: u32,
    pub dismantle_cooldown: u32,
    pub tiles: SmallVec<[usize; 16]>,
    pub disposed: bool,
}

/// Convert a raw direction index (N=0, S=1, E=2, W=3)
pub fn parse_direction(raw: i32) -> AtmosResult<Direction> {
    usize::try_from(raw)
        .ok()
        .and_then(Direction::from_index)
        .ok_or(AtmosError::InvalidDirection(raw))
}

/// One independent atmosphere grid
///
/// Tiles live in a contiguous arena and are referenced by index everywhere.
/// Indices stay stable until [`GridAtmos::reset`].
#[derive(Debug, Clone)]
pub struct GridAtmos {
    pub(crate) tiles: Vec<TileAtmos>,
    pub(crate) active_tiles: TileSet,
    pub(crate) hotspot_tiles: TileSet,
    pub(crate) superconduct_tiles: TileSet,
    pub(crate) high_pressure_tiles: Vec<usize>,
    pub(crate) excited_groups: Vec<ExcitedGroup>,
    pub(crate) update_counter: i64,
    pub(crate) queue_cycle: i64,
    pub(crate) pass: Option<PassCursor>,
}

impl GridAtmos {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tiles: Vec::with_capacity(capacity),
            active_tiles: TileSet::with_capacity(capacity / 4),
            hotspot_tiles: TileSet::new(),
            superconduct_tiles: TileSet::new(),
            high_pressure_tiles: Vec::new(),
            excited_groups: Vec::new(),
            update_counter: 1,
            queue_cycle: 0,
            pass: None,
        }
    }

    /// Drop every tile, list and group; counters restart
    pub fn reset(&mut self) {
        self.tiles.clear();
        self.active_tiles.clear();
        self.hotspot_tiles.clear();
        self.superconduct_tiles.clear();
        self.high_pressure_tiles.clear();
        self.excited_groups.clear();
        self.update_counter = 1;
        self.queue_cycle = 0;
        self.pass = None;
    }

    /// Append a tile and return its index
    ///
    /// List membership is derived from the record's EXCITED, HOTSPOT and
    /// SUPERCONDUCT flags.
    pub fn add_tile(&mut self, mut tile: TileAtmos) -> usize {
        let index = self.tiles.len();
        tile.moles[GAS_COUNT..].fill(0.0);
        tile.moles_archived[GAS_COUNT..].fill(0.0);
        tile.excited_group_id = NO_GROUP;
        let excited = tile.flags.contains(TileFlags::EXCITED);
        tile.flags.remove(TileFlags::EXCITED | TileFlags::PROCESSED);
        self.tiles.push(tile);

        if tile.is_hotspot() {
            self.hotspot_tiles.insert(index);
        }
        if tile.flags.contains(TileFlags::SUPERCONDUCT) {
            self.superconduct_tiles.insert(index);
        }
        if excited && !tile.is_immutable() {
            self.activate(index);
        }
        index
    }

    /// Replace a tile's atmosphere while keeping the engine's bookkeeping
    pub fn update_tile(&mut self, index: usize, mut tile: TileAtmos) -> AtmosResult<()> {
        let old = *self.tile(index)?;

        let bookkeeping = TileFlags::EXCITED | TileFlags::PROCESSED | TileFlags::ZONE_ABORTED;
        tile.flags = (tile.flags - bookkeeping) | (old.flags & bookkeeping);
        tile.excited_group_id = old.excited_group_id;
        tile.last_cycle = old.last_cycle;
        tile.last_queue_cycle = old.last_queue_cycle;
        tile.last_slow_queue_cycle = old.last_slow_queue_cycle;
        tile.moles[GAS_COUNT..].fill(0.0);
        self.tiles[index] = tile;

        if tile.is_hotspot() {
            self.hotspot_tiles.insert(index);
        } else {
            self.hotspot_tiles.remove(index);
        }
        if tile.flags.contains(TileFlags::SUPERCONDUCT) {
            self.superconduct_tiles.insert(index);
        } else {
            self.superconduct_tiles.remove(index);
        }
        if tile.is_immutable() {
            self.deactivate(index, true);
        }
        Ok(())
    }

    pub fn tile(&self, index: usize) -> AtmosResult<&TileAtmos> {
        let count = self.tiles.len();
        self.tiles
            .get(index)
            .ok_or(AtmosError::TileOutOfRange { index, count })
    }

    pub fn tile_mut(&mut self, index: usize) -> AtmosResult<&mut TileAtmos> {
        let count = self.tiles.len();
        self.tiles
            .get_mut(index)
            .ok_or(AtmosError::TileOutOfRange { index, count })
    }

    /// Link `index` to `adjacent` in one direction (`None` removes the link)
    pub fn set_adjacency(
        &mut self,
        index: usize,
        direction: Direction,
        adjacent: Option<usize>,
    ) -> AtmosResult<()> {
        if let Some(other) = adjacent {
            self.check_index(other)?;
        }
        let tile = self.tile_mut(index)?;
        match adjacent {
            Some(other) => {
                tile.adjacent[direction.index()] = other as i32;
                tile.adjacent_bits |= direction.bit();
            }
            None => {
                tile.adjacent[direction.index()] = NO_TILE;
                tile.adjacent_bits &= !direction.bit();
            }
        }
        Ok(())
    }

    /// Mark a direction impassable to gas (heat may still superconduct)
    pub fn set_blocked(
        &mut self,
        index: usize,
        direction: Direction,
        blocked: bool,
    ) -> AtmosResult<()> {
        let tile = self.tile_mut(index)?;
        if blocked {
            tile.blocked_bits |= direction.bit();
        } else {
            tile.blocked_bits &= !direction.bit();
        }
        Ok(())
    }

    pub fn tiles(&self) -> &[TileAtmos] {
        &self.tiles
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn add_active_tile(&mut self, index: usize) -> AtmosResult<()> {
        self.check_index(index)?;
        self.activate(index);
        Ok(())
    }

    /// Remove from the active set, disposing the tile's excited group
    pub fn remove_active_tile(&mut self, index: usize) -> AtmosResult<()> {
        self.check_index(index)?;
        self.deactivate(index, true);
        Ok(())
    }

    pub fn active_tile_count(&self) -> usize {
        self.active_tiles.len()
    }

    pub fn active_tiles(&self) -> &[usize] {
        self.active_tiles.as_slice()
    }

    pub fn hotspot_tiles(&self) -> &[usize] {
        self.hotspot_tiles.as_slice()
    }

    pub fn superconducting_tiles(&self) -> &[usize] {
        self.superconduct_tiles.as_slice()
    }

    /// Live (not disposed) excited groups
    pub fn excited_groups(&self) -> impl Iterator<Item = &ExcitedGroup> {
        self.excited_groups.iter().filter(|g| !g.disposed)
    }

    pub fn excited_group_count(&self) -> usize {
        self.excited_groups().count()
    }

    /// Number of full passes started so far
    pub fn update_counter(&self) -> i64 {
        self.update_counter
    }

    /// True while a time-sliced pass is waiting to be resumed
    pub fn pass_in_flight(&self) -> bool {
        self.pass.is_some()
    }

    pub(crate) fn check_index(&self, index: usize) -> AtmosResult<()> {
        if index < self.tiles.len() {
            Ok(())
        } else {
            Err(AtmosError::TileOutOfRange {
                index,
                count: self.tiles.len(),
            })
        }
    }

    /// Open neighbour index, dropping links that point outside the arena or back at the tile
    pub(crate) fn open_neighbor(&self, index: usize, direction: Direction) -> Option<usize> {
        self.tiles[index]
            .open_neighbor(direction)
            .filter(|&n| n < self.tiles.len() && n != index)
    }

    /// Existing neighbour index regardless of blocking
    pub(crate) fn neighbor(&self, index: usize, direction: Direction) -> Option<usize> {
        self.tiles[index]
            .neighbor(direction)
            .filter(|&n| n < self.tiles.len() && n != index)
    }

    /// Two distinct tiles borrowed mutably at once
    pub(crate) fn pair_mut(&mut self, a: usize, b: usize) -> (&mut TileAtmos, &mut TileAtmos) {
        debug_assert_ne!(a, b);
        if a < b {
            let (left, right) = self.tiles.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.tiles.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    pub(crate) fn next_queue_cycle(&mut self) -> i64 {
        self.queue_cycle += 1;
        self.queue_cycle
    }

    pub(crate) fn activate(&mut self, index: usize) {
        let tile = &mut self.tiles[index];
        if tile.is_active() || tile.is_immutable() {
            return;
        }
        tile.flags |= TileFlags::EXCITED;
        self.active_tiles.insert(index);
    }

    pub(crate) fn deactivate(&mut self, index: usize, dispose_group: bool) {
        let tile = &mut self.tiles[index];
        if !tile.is_active() {
            return;
        }
        tile.flags.remove(TileFlags::EXCITED);
        let group = tile.excited_group_id;
        self.active_tiles.remove(index);

        if group >= 0 {
            let group = group as usize;
            if dispose_group {
                self.dispose_group(group);
            } else {
                self.remove_from_group(group, index);
            }
        }
    }

    pub(crate) fn register_hotspot(&mut self, index: usize) {
        self.tiles[index].flags |= TileFlags::HOTSPOT;
        self.hotspot_tiles.insert(index);
    }

    pub(crate) fn unregister_hotspot(&mut self, index: usize) {
        self.tiles[index].flags.remove(TileFlags::HOTSPOT);
        self.hotspot_tiles.remove(index);
    }

    pub(crate) fn register_superconductor(&mut self, index: usize) {
        let tile = &mut self.tiles[index];
        if tile.flags.contains(TileFlags::SUPERCONDUCT) {
            return;
        }
        tile.flags |= TileFlags::SUPERCONDUCT;
        self.superconduct_tiles.insert(index);
    }

    pub(crate) fn unregister_superconductor(&mut self, index: usize) {
        self.tiles[index].flags.remove(TileFlags::SUPERCONDUCT);
        self.superconduct_tiles.remove(index);
    }

    /// Record the largest pressure difference seen for a tile this pass
    pub(crate) fn consider_pressure_difference(
        &mut self,
        index: usize,
        direction: Direction,
        difference: f32,
    ) {
        let difference = difference.abs();
        let tile = &mut self.tiles[index];
        if difference <= tile.pressure_difference {
            return;
        }
        if tile.pressure_difference == 0.0 {
            self.high_pressure_tiles.push(index);
        }
        tile.pressure_difference = difference;
        tile.current_transfer_direction = direction as i32;
    }

    pub(crate) fn create_group(&mut self) -> usize {
        let slot = self.excited_groups.iter().position(|g| g.disposed);
        let id = slot.unwrap_or(self.excited_groups.len());
        let group = ExcitedGroup {
            id,
            ..ExcitedGroup::default()
        };
        match slot {
            Some(id) => self.excited_groups[id] = group,
            None => self.excited_groups.push(group),
        }
        log::trace!("Created excited group {id}");
        id
    }

    pub(crate) fn add_to_group(&mut self, group: usize, index: usize) {
        let Some(g) = self.excited_groups.get_mut(group) else {
            return;
        };
        if g.disposed {
            return;
        }
        g.tiles.push(index);
        self.tiles[index].excited_group_id = group as i32;
    }

    pub(crate) fn remove_from_group(&mut self, group: usize, index: usize) {
        if let Some(g) = self.excited_groups.get_mut(group)
            && !g.disposed
        {
            if let Some(pos) = g.tiles.iter().position(|&t| t == index) {
                g.tiles.swap_remove(pos);
            }
        }
        self.tiles[index].excited_group_id = NO_GROUP;
    }

    /// Union two groups; the larger absorbs the smaller. Returns the survivor.
    pub(crate) fn merge_groups(&mut self, a: usize, b: usize) -> usize {
        if a == b {
            return a;
        }
        let (survivor, victim) = if self.excited_groups[a].tiles.len() >= self.excited_groups[b].tiles.len()
        {
            (a, b)
        } else {
            (b, a)
        };
        let moved = std::mem::take(&mut self.excited_groups[victim].tiles);
        self.excited_groups[victim].disposed = true;
        for &index in &moved {
            self.tiles[index].excited_group_id = survivor as i32;
        }
        let group = &mut self.excited_groups[survivor];
        group.tiles.extend(moved);
        group.breakdown_cooldown = 0;
        group.dismantle_cooldown = 0;
        survivor
    }

    /// Retire a group; members become ungrouped but stay in the active set
    pub(crate) fn dispose_group(&mut self, group: usize) {
        let Some(g) = self.excited_groups.get_mut(group) else {
            return;
        };
        if g.disposed {
            return;
        }
        g.disposed = true;
        let members = std::mem::take(&mut g.tiles);
        for index in members {
            self.tiles[index].excited_group_id = NO_GROUP;
        }
    }

    pub(crate) fn reset_group_cooldowns(&mut self, group: usize) {
        if let Some(g) = self.excited_groups.get_mut(group) {
            g.breakdown_cooldown = 0;
            g.dismantle_cooldown = 0;
        }
    }

    /// Neighbour link repair used by revalidation
    pub(crate) fn drop_dangling_adjacency(&mut self) -> usize {
        let count = self.tiles.len();
        let mut dropped = 0;
        for (index, tile) in self.tiles.iter_mut().enumerate() {
            for direction in Direction::ALL {
                let raw = tile.adjacent[direction.index()];
                let bit_set = tile.adjacent_bits & direction.bit() != 0;
                let dangling = raw >= count as i32 || raw == index as i32 || (raw < 0 && bit_set);
                if dangling {
                    tile.adjacent[direction.index()] = NO_TILE;
                    tile.adjacent_bits &= !direction.bit();
                    dropped += 1;
                } else if raw >= 0 && !bit_set {
                    tile.adjacent_bits |= direction.bit();
                }
            }
            tile.adjacent_bits &= Direction::ALL_BITS;
            if tile.current_transfer_direction >= DIRECTIONS as i32 {
                tile.current_transfer_direction = NO_DIRECTION;
            }
        }
        dropped
    }
}

impl Default for GridAtmos {
    fn default() -> Self {
        Self::new()
    }
}
