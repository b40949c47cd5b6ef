//! Rectangular grid builder
//!
//! Hosts with a square map can lay out tiles row-major and address them by
//! coordinate instead of wiring adjacency by hand.

use atmos_simulation::{AtmosConfig, Direction, GasMixture, TileAtmos, TileFlags};
use glam::IVec2;

use super::grid::GridAtmos;
use crate::error::{AtmosError, AtmosResult};

/// A `width` x `height` block of tiles stored row-major from `base`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectLayout {
    pub width: usize,
    pub height: usize,
    base: usize,
}

impl RectLayout {
    /// Append a rectangle of tiles produced by `fill` and link every pair of
    /// orthogonal neighbours both ways
    pub fn build(
        grid: &mut GridAtmos,
        width: usize,
        height: usize,
        mut fill: impl FnMut(IVec2) -> TileAtmos,
    ) -> AtmosResult<Self> {
        let layout = Self {
            width,
            height,
            base: grid.tile_count(),
        };

        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let position = IVec2::new(x, y);
                let mut tile = fill(position);
                tile.grid_position = position;
                grid.add_tile(tile);
            }
        }

        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let index = layout.index_at(x, y)?;
                for direction in Direction::ALL {
                    let offset = direction.offset();
                    let neighbor = layout.index(x + offset.x, y + offset.y);
                    grid.set_adjacency(index, direction, neighbor)?;
                }
            }
        }

        log::debug!("Built {width}x{height} layout at tile {}", layout.base);
        Ok(layout)
    }

    /// Rectangle where every tile holds the same mixture
    pub fn filled(
        grid: &mut GridAtmos,
        width: usize,
        height: usize,
        mixture: &GasMixture,
    ) -> AtmosResult<Self> {
        Self::build(grid, width, height, |position| {
            TileAtmos::with_mixture(position, mixture)
        })
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tile index at a coordinate, `None` outside the rectangle
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        let inside = x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height;
        inside.then(|| self.base + y as usize * self.width + x as usize)
    }

    pub fn index_at(&self, x: i32, y: i32) -> AtmosResult<usize> {
        self.index(x, y)
            .ok_or(AtmosError::PositionOutOfBounds(IVec2::new(x, y)))
    }

    pub fn position(&self, index: usize) -> Option<IVec2> {
        let local = index.checked_sub(self.base)?;
        (local < self.len()).then(|| {
            IVec2::new((local % self.width) as i32, (local / self.width) as i32)
        })
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.base..self.base + self.len()
    }

    /// Block or unblock the edge leaving (x, y) in `direction`, from both sides
    pub fn set_edge_blocked(
        &self,
        grid: &mut GridAtmos,
        x: i32,
        y: i32,
        direction: Direction,
        blocked: bool,
    ) -> AtmosResult<()> {
        let index = self.index_at(x, y)?;
        grid.set_blocked(index, direction, blocked)?;
        let offset = direction.offset();
        if let Some(other) = self.index(x + offset.x, y + offset.y) {
            grid.set_blocked(other, direction.opposite(), blocked)?;
        }
        Ok(())
    }

    /// Turn a tile into a sealed, gas-free wall
    pub fn make_wall(&self, grid: &mut GridAtmos, x: i32, y: i32) -> AtmosResult<()> {
        let index = self.index_at(x, y)?;
        let old = *grid.tile(index)?;
        let mut wall = TileAtmos::new(old.grid_position, old.temperature);
        wall.flags = TileFlags::IMMUTABLE;
        wall.thermal_conductivity = old.thermal_conductivity;
        wall.adjacent = old.adjacent;
        wall.adjacent_bits = old.adjacent_bits;
        grid.update_tile(index, wall)?;
        for direction in Direction::ALL {
            self.set_edge_blocked(grid, x, y, direction, true)?;
        }
        Ok(())
    }

    /// Replace a tile with open space, keeping its links
    pub fn make_space(
        &self,
        grid: &mut GridAtmos,
        x: i32,
        y: i32,
        config: &AtmosConfig,
    ) -> AtmosResult<()> {
        let index = self.index_at(x, y)?;
        let old = *grid.tile(index)?;
        let mut space = TileAtmos::space(old.grid_position, config.constants.tcmb);
        space.adjacent = old.adjacent;
        space.adjacent_bits = old.adjacent_bits;
        space.blocked_bits = old.blocked_bits;
        grid.update_tile(index, space)
    }

    /// Put every mutable tile of the rectangle into the active set
    pub fn activate_all(&self, grid: &mut GridAtmos) -> AtmosResult<()> {
        for index in self.indices() {
            if !grid.tile(index)?.is_immutable() {
                grid.add_active_tile(index)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmos_simulation::GasId;

    #[test]
    fn test_build_links_neighbours() {
        let mut grid = GridAtmos::new();
        let layout = RectLayout::filled(&mut grid, 3, 2, &GasMixture::new(293.15)).unwrap();

        assert_eq!(grid.tile_count(), 6);
        let centre = layout.index(1, 0).unwrap();
        let tile = grid.tile(centre).unwrap();
        assert_eq!(tile.neighbor(Direction::West), layout.index(0, 0));
        assert_eq!(tile.neighbor(Direction::East), layout.index(2, 0));
        assert_eq!(tile.neighbor(Direction::South), layout.index(1, 1));
        assert_eq!(tile.neighbor(Direction::North), None);
        assert_eq!(tile.open_direction_count(), 3);
    }

    #[test]
    fn test_index_round_trip_with_offset() {
        let mut grid = GridAtmos::new();
        grid.add_tile(TileAtmos::default());
        let layout = RectLayout::filled(&mut grid, 4, 3, &GasMixture::new(293.15)).unwrap();

        assert_eq!(layout.index(0, 0), Some(1));
        assert_eq!(layout.index(3, 2), Some(12));
        assert_eq!(layout.position(12), Some(IVec2::new(3, 2)));
        assert_eq!(layout.position(0), None);
        assert_eq!(layout.index(4, 0), None);
        assert_eq!(
            layout.index_at(-1, 0),
            Err(AtmosError::PositionOutOfBounds(IVec2::new(-1, 0)))
        );
    }

    #[test]
    fn test_blocked_edge_is_blocked_both_ways() {
        let mut grid = GridAtmos::new();
        let layout = RectLayout::filled(&mut grid, 2, 1, &GasMixture::new(293.15)).unwrap();

        layout.set_edge_blocked(&mut grid, 0, 0, Direction::East, true).unwrap();

        assert!(!grid.tile(0).unwrap().is_open(Direction::East));
        assert!(!grid.tile(1).unwrap().is_open(Direction::West));
        assert_eq!(grid.tile(0).unwrap().neighbor(Direction::East), Some(1));
    }

    #[test]
    fn test_wall_and_space_helpers() {
        let config = AtmosConfig::default();
        let mixture = GasMixture::new(293.15).with_gas(GasId::OXYGEN, 20.0);
        let mut grid = GridAtmos::new();
        let layout = RectLayout::filled(&mut grid, 3, 1, &mixture).unwrap();

        layout.make_wall(&mut grid, 1, 0).unwrap();
        layout.make_space(&mut grid, 2, 0, &config).unwrap();

        let wall = grid.tile(1).unwrap();
        assert!(wall.is_immutable() && !wall.is_space());
        assert_eq!(wall.total_moles(), 0.0);
        assert!(!grid.tile(0).unwrap().is_open(Direction::East));

        let space = grid.tile(2).unwrap();
        assert!(space.is_space() && space.is_immutable());
        assert_eq!(space.neighbor(Direction::West), Some(1));
    }

    #[test]
    fn test_activate_all_skips_immutable() {
        let config = AtmosConfig::default();
        let mut grid = GridAtmos::new();
        let layout = RectLayout::filled(&mut grid, 3, 1, &GasMixture::new(293.15)).unwrap();
        layout.make_space(&mut grid, 0, 0, &config).unwrap();

        layout.activate_all(&mut grid).unwrap();

        assert_eq!(grid.active_tile_count(), 2);
    }
}
