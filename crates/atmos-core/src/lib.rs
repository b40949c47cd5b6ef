//! Tile-grid atmospherics engine
//!
//! - `grid`: the tile arena and every system that advances it
//! - `mixture`: gas algebra on single tiles, usable without a grid
//! - `diagnostics`: version and CPU feature reporting

pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod mixture;

pub use diagnostics::{ENGINE_VERSION, engine_version, simd_level};
pub use error::{AtmosError, AtmosResult};
pub use grid::{
    AtmosStats, Completion, EqualizeOutcome, GridAtmos, NoopStats, ProcessResult, RectLayout,
};

// Re-export the data crate so hosts only need one dependency
pub use atmos_simulation::{
    AtmosConfig, AtmosConstants, DIRECTIONS, Direction, GAS_ARRAY_SIZE, GAS_COUNT, GasArray,
    GasDef, GasId, GasMixture, Gases, HotspotState, NO_GROUP, NO_TILE, TileAtmos, TileFlags,
};
