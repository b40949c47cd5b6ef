//! # Atmos - headless runner for the tile atmospherics engine
//!
//! Loads layered configuration, generates benchmark stations and drives
//! RON scenarios against `atmos-core`.

#[cfg(not(target_arch = "wasm32"))]
pub mod config;
pub mod bench;
pub mod scenario;
pub mod station;

pub use atmos_core as engine;

/// Common imports for internal use
pub mod prelude {
    pub use atmos_core::{AtmosConfig, GasId, GasMixture, GridAtmos, RectLayout, TileAtmos};
    pub use glam::IVec2;
}
