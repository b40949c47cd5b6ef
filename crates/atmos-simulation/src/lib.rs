//! Gas and tile data for the atmos engine
//!
//! This crate provides the foundational data types for atmospherics:
//! - Gas species (GasId, GasDef, Gases)
//! - Tile records (TileAtmos, TileFlags, Direction, HotspotState, GasMixture)
//! - Tuning (AtmosConstants, AtmosConfig)

mod config;
mod gases;
mod tile;

pub use config::{AtmosConfig, AtmosConstants};
pub use gases::{GAS_ARRAY_SIZE, GAS_COUNT, GasArray, GasDef, GasId, Gases};
pub use tile::{
    DIRECTIONS, Direction, GasMixture, HotspotState, NO_DIRECTION, NO_GROUP, NO_TILE, TileAtmos,
    TileFlags,
};
