//! Tile atmosphere record and its bookkeeping types
//!
//! A [`TileAtmos`] is one grid cell's gas mixture plus all the scratch state
//! the engine needs to process it. The record is a flat `#[repr(C)]` value so
//! grids can keep their tiles in one contiguous arena.

use crate::gases::{GAS_ARRAY_SIZE, GAS_COUNT, GasArray};
use bitflags::bitflags;
use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Number of cardinal neighbours per tile
pub const DIRECTIONS: usize = 4;

/// Sentinel for "no neighbour in this direction"
pub const NO_TILE: i32 = -1;

/// Sentinel for "not a member of any excited group"
pub const NO_GROUP: i32 = -1;

/// Sentinel for "no transfer direction recorded"
pub const NO_DIRECTION: i32 = -1;

/// Cardinal direction, in adjacency array order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
}

impl Direction {
    pub const ALL: [Direction; DIRECTIONS] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Mask with every direction bit set
    pub const ALL_BITS: u8 = 0x0F;

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Grid offset, with north as -y
    pub fn offset(self) -> IVec2 {
        match self {
            Direction::North => IVec2::new(0, -1),
            Direction::South => IVec2::new(0, 1),
            Direction::East => IVec2::new(1, 0),
            Direction::West => IVec2::new(-1, 0),
        }
    }
}

bitflags! {
    /// State flags for a tile
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TileFlags: u8 {
        /// Open to space: infinite heat sink, vents gas
        const SPACE = 1 << 0;
        /// Member of the active set
        const EXCITED = 1 << 1;
        /// Currently on fire
        const HOTSPOT = 1 << 2;
        /// Never mutated by the engine
        const IMMUTABLE = 1 << 3;
        /// Atmosphere is authored by the map
        const MAP_ATMOS = 1 << 4;
        /// Conducting heat through blocked boundaries
        const SUPERCONDUCT = 1 << 5;
        /// Already handled in the pass in flight
        const PROCESSED = 1 << 6;
        /// Inside a zone too large to equalize this pass
        const ZONE_ABORTED = 1 << 7;
    }
}

/// Fire state machine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HotspotState {
    #[default]
    None = 0,
    Growing = 1,
    Burning = 2,
    Dying = 3,
}

impl HotspotState {
    pub fn is_lit(self) -> bool {
        self != HotspotState::None
    }
}

/// A free-standing gas mixture (removal results, merge givers, scenario fills)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GasMixture {
    pub moles: GasArray,
    pub temperature: f32,
}

impl GasMixture {
    pub fn new(temperature: f32) -> Self {
        Self {
            moles: [0.0; GAS_ARRAY_SIZE],
            temperature,
        }
    }

    /// Builder-style helper for setting a single species
    pub fn with_gas(mut self, gas: usize, moles: f32) -> Self {
        if gas < GAS_COUNT {
            self.moles[gas] = moles.max(0.0);
        }
        self
    }

    pub fn total_moles(&self) -> f32 {
        self.moles[..GAS_COUNT].iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_moles() <= 0.0
    }
}

impl Default for GasMixture {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// One grid cell's atmosphere and simulation bookkeeping
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct TileAtmos {
    pub moles: GasArray,
    /// Snapshot taken at the start of the pass; neighbours read this
    pub moles_archived: GasArray,
    pub temperature: f32,
    pub temperature_archived: f32,
    /// Cached gas heat capacity
    pub heat_capacity: f32,
    /// Material conductivity in 0..=1; zero never superconducts
    pub thermal_conductivity: f32,
    pub pressure_difference: f32,
    /// Absolute moles moved by the most recent share
    pub last_share: f32,

    pub grid_position: IVec2,
    /// Neighbour indices in N, S, E, W order, [`NO_TILE`] when absent
    pub adjacent: [i32; DIRECTIONS],
    pub adjacent_bits: u8,
    /// Directions impassable to gas regardless of neighbour existence
    pub blocked_bits: u8,
    pub flags: TileFlags,
    pub hotspot_state: HotspotState,

    pub hotspot_temperature: f32,
    pub hotspot_volume: f32,

    // Pressure equalizer scratch, only valid during one equalization
    pub mole_delta: f32,
    pub transfer_directions: [f32; DIRECTIONS],
    pub current_transfer_amount: f32,
    pub current_transfer_direction: i32,

    pub last_cycle: i64,
    pub last_queue_cycle: i64,
    pub last_slow_queue_cycle: i64,
    pub excited_group_id: i32,

    pub fast_done: bool,
}

impl TileAtmos {
    /// Empty, isolated tile at the given temperature
    pub fn new(grid_position: IVec2, temperature: f32) -> Self {
        Self {
            moles: [0.0; GAS_ARRAY_SIZE],
            moles_archived: [0.0; GAS_ARRAY_SIZE],
            temperature,
            temperature_archived: temperature,
            heat_capacity: 0.0,
            thermal_conductivity: 0.0,
            pressure_difference: 0.0,
            last_share: 0.0,
            grid_position,
            adjacent: [NO_TILE; DIRECTIONS],
            adjacent_bits: 0,
            blocked_bits: 0,
            flags: TileFlags::empty(),
            hotspot_state: HotspotState::None,
            hotspot_temperature: 0.0,
            hotspot_volume: 0.0,
            mole_delta: 0.0,
            transfer_directions: [0.0; DIRECTIONS],
            current_transfer_amount: 0.0,
            current_transfer_direction: NO_DIRECTION,
            last_cycle: 0,
            last_queue_cycle: 0,
            last_slow_queue_cycle: 0,
            excited_group_id: NO_GROUP,
            fast_done: false,
        }
    }

    /// Tile holding the given mixture
    pub fn with_mixture(grid_position: IVec2, mixture: &GasMixture) -> Self {
        let mut tile = Self::new(grid_position, mixture.temperature);
        tile.moles = mixture.moles;
        tile.moles[GAS_COUNT..].fill(0.0);
        tile.moles_archived = tile.moles;
        tile
    }

    /// Immutable vacuum tile open to space
    pub fn space(grid_position: IVec2, cosmic_temperature: f32) -> Self {
        let mut tile = Self::new(grid_position, cosmic_temperature);
        tile.flags = TileFlags::SPACE | TileFlags::IMMUTABLE;
        tile
    }

    pub fn is_space(&self) -> bool {
        self.flags.contains(TileFlags::SPACE)
    }

    pub fn is_immutable(&self) -> bool {
        self.flags.contains(TileFlags::IMMUTABLE)
    }

    pub fn is_active(&self) -> bool {
        self.flags.contains(TileFlags::EXCITED)
    }

    pub fn is_hotspot(&self) -> bool {
        self.flags.contains(TileFlags::HOTSPOT)
    }

    pub fn total_moles(&self) -> f32 {
        self.moles[..GAS_COUNT].iter().sum()
    }

    pub fn total_moles_archived(&self) -> f32 {
        self.moles_archived[..GAS_COUNT].iter().sum()
    }

    /// Neighbour index if one exists in this direction (blocked or not)
    pub fn neighbor(&self, direction: Direction) -> Option<usize> {
        if self.adjacent_bits & direction.bit() == 0 {
            return None;
        }
        let index = self.adjacent[direction.index()];
        (index >= 0).then_some(index as usize)
    }

    /// Whether gas can flow in this direction
    pub fn is_open(&self, direction: Direction) -> bool {
        self.adjacent_bits & direction.bit() != 0 && self.blocked_bits & direction.bit() == 0
    }

    /// Neighbour index if gas can flow to it
    pub fn open_neighbor(&self, direction: Direction) -> Option<usize> {
        if self.blocked_bits & direction.bit() != 0 {
            return None;
        }
        self.neighbor(direction)
    }

    pub fn open_direction_count(&self) -> usize {
        (self.adjacent_bits & !self.blocked_bits & Direction::ALL_BITS).count_ones() as usize
    }

    /// Current contents as a free-standing mixture
    pub fn mixture(&self) -> GasMixture {
        GasMixture {
            moles: self.moles,
            temperature: self.temperature,
        }
    }

    /// Reset equalizer scratch before a flood visits this tile
    pub fn clear_equalize_scratch(&mut self) {
        self.mole_delta = 0.0;
        self.fast_done = false;
        self.transfer_directions = [0.0; DIRECTIONS];
        self.current_transfer_amount = 0.0;
        self.current_transfer_direction = NO_DIRECTION;
    }
}

impl Default for TileAtmos {
    fn default() -> Self {
        Self::new(IVec2::ZERO, 0.0)
    }
}
