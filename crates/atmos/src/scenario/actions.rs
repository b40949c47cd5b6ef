//! Scenario actions

use atmos_core::Direction;
use serde::{Deserialize, Serialize};

use super::verification::{Region, VerificationCondition};

/// Moles of one named gas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasAmount {
    /// Registry name, e.g. "oxygen" or "co2"
    pub gas: String,
    pub moles: f32,
}

/// One step of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioAction {
    // === GRID EDITS ===
    /// Replace the gas in a region with the given mixture
    FillGas {
        region: Region,
        gases: Vec<GasAmount>,
        temperature: f32,
    },

    /// Add gas on top of whatever is there
    AddGas { region: Region, gas: GasAmount },

    SetTemperature { region: Region, temperature: f32 },

    SetConductivity { region: Region, conductivity: f32 },

    /// Seal a region with gas-free walls
    Wall { region: Region },

    /// Open a region to space
    Breach { region: Region },

    /// Block or unblock one edge from both sides
    BlockEdge {
        x: i32,
        y: i32,
        direction: Direction,
        blocked: bool,
    },

    /// Put a region into the active set
    Activate { region: Region },

    // === EVENTS ===
    Ignite {
        x: i32,
        y: i32,
        temperature: f32,
        volume: f32,
    },

    Extinguish { x: i32, y: i32 },

    /// Equalize the zone around a tile immediately
    Equalize { x: i32, y: i32 },

    /// Vent the zone around a tile into space immediately
    Depressurize { x: i32, y: i32 },

    // === TIME ===
    /// Simulate this many ticks
    RunTicks { ticks: usize },

    /// Tick until the condition holds
    RunUntil {
        condition: VerificationCondition,
        max_ticks: usize,
    },

    /// Re-derive caches after a batch of edits
    Revalidate,

    /// Write a message into the execution log
    Log { message: String },
}
