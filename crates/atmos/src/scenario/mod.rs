//! RON-driven atmos scenarios
//!
//! A scenario lays out a rectangular grid, edits it, runs the engine and
//! then checks the resulting state.

mod actions;
mod definition;
mod executor;
mod results;
mod verification;

pub use actions::{GasAmount, ScenarioAction};
pub use definition::{LayoutDefinition, ScenarioDefinition};
pub use executor::{ScenarioExecutor, ScenarioExecutorConfig, ScenarioState};
pub use results::{ExecutionReport, PerformanceMetrics};
pub use verification::{Region, VerificationCondition, VerificationResult};
