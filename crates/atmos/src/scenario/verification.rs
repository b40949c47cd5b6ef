//! Verification conditions and state checks for scenarios

use atmos_core::{Completion, HotspotState, RectLayout};
use serde::{Deserialize, Serialize};

use super::executor::ScenarioState;

/// Conditions that can be verified against grid state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VerificationCondition {
    // === GAS CHECKS ===
    /// Moles over the whole grid, of one gas or of everything
    TotalMoles {
        gas: Option<String>,
        min: f32,
        max: f32,
    },

    /// Moles of one gas on one tile
    GasAt {
        x: i32,
        y: i32,
        gas: String,
        min: f32,
        max: f32,
    },

    // === THERMAL CHECKS ===
    /// Every tile in the region lies within the range
    TemperatureRange { region: Region, min: f32, max: f32 },

    HotspotAt {
        x: i32,
        y: i32,
        expected: HotspotState,
    },

    HotspotCount { min: usize, max: usize },

    // === ENGINE CHECKS ===
    ActiveTilesAtMost { max: usize },

    /// How the most recent processing call ended
    LastPass { expected: Completion },

    // === LOGICAL OPERATORS ===
    /// All conditions must pass
    All {
        conditions: Vec<VerificationCondition>,
    },

    /// Any condition must pass
    Any {
        conditions: Vec<VerificationCondition>,
    },

    /// Condition must NOT pass
    Not {
        condition: Box<VerificationCondition>,
    },
}

/// Tiles a condition or action applies to, in layout coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Tile { x: i32, y: i32 },

    /// Inclusive rectangle, clipped to the layout
    Rect {
        min_x: i32,
        min_y: i32,
        max_x: i32,
        max_y: i32,
    },

    Whole,
}

impl Region {
    /// Coordinates covered by the region; `None` when a single tile lies outside
    pub fn positions(&self, layout: &RectLayout) -> Option<Vec<(i32, i32)>> {
        let (min_x, min_y, max_x, max_y) = match *self {
            Region::Tile { x, y } => {
                layout.index(x, y)?;
                return Some(vec![(x, y)]);
            }
            Region::Rect {
                min_x,
                min_y,
                max_x,
                max_y,
            } => (min_x, min_y, max_x, max_y),
            Region::Whole => (0, 0, layout.width as i32 - 1, layout.height as i32 - 1),
        };

        let mut positions = Vec::new();
        for y in min_y.max(0)..=max_y.min(layout.height as i32 - 1) {
            for x in min_x.max(0)..=max_x.min(layout.width as i32 - 1) {
                positions.push((x, y));
            }
        }
        Some(positions)
    }
}

/// Result of a verification check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub passed: bool,
    pub message: String,
    pub actual_value: Option<String>, // For debugging
}

impl VerificationResult {
    fn failed(message: String) -> Self {
        Self {
            passed: false,
            message,
            actual_value: None,
        }
    }
}

impl VerificationCondition {
    /// Evaluate condition against scenario state
    pub fn evaluate(&self, state: &ScenarioState) -> VerificationResult {
        match self {
            VerificationCondition::TotalMoles { gas, min, max } => {
                let gas_id = match gas {
                    Some(name) => match state.gas_id(name) {
                        Some(id) => Some(id),
                        None => return VerificationResult::failed(format!("Unknown gas {name:?}")),
                    },
                    None => None,
                };
                let actual: f32 = state
                    .grid
                    .tiles()
                    .iter()
                    .filter(|t| !t.is_space())
                    .map(|t| match gas_id {
                        Some(id) => t.moles[id],
                        None => t.total_moles(),
                    })
                    .sum();
                let passed = actual >= *min && actual <= *max;

                VerificationResult {
                    passed,
                    message: format!(
                        "Total {} moles: expected {min}-{max}, got {actual:.3}",
                        gas.as_deref().unwrap_or("gas")
                    ),
                    actual_value: Some(actual.to_string()),
                }
            }

            VerificationCondition::GasAt {
                x,
                y,
                gas,
                min,
                max,
            } => {
                let Some(id) = state.gas_id(gas) else {
                    return VerificationResult::failed(format!("Unknown gas {gas:?}"));
                };
                let Some(tile) = state.tile_at(*x, *y) else {
                    return VerificationResult::failed(format!("({x}, {y}) is outside the layout"));
                };
                let actual = tile.moles[id];
                let passed = actual >= *min && actual <= *max;

                VerificationResult {
                    passed,
                    message: format!(
                        "{gas} at ({x}, {y}): expected {min}-{max}, got {actual:.3}"
                    ),
                    actual_value: Some(actual.to_string()),
                }
            }

            VerificationCondition::TemperatureRange { region, min, max } => {
                let Some(positions) = region.positions(&state.layout) else {
                    return VerificationResult::failed(format!("{region:?} is outside the layout"));
                };
                let temperatures: Vec<f32> = positions
                    .iter()
                    .filter_map(|&(x, y)| state.tile_at(x, y))
                    .filter(|t| !t.is_immutable())
                    .map(|t| t.temperature)
                    .collect();
                let lowest = temperatures.iter().copied().fold(f32::INFINITY, f32::min);
                let highest = temperatures.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let passed = !temperatures.is_empty() && lowest >= *min && highest <= *max;

                VerificationResult {
                    passed,
                    message: format!(
                        "Temperature in {region:?}: expected {min}-{max}, got {lowest:.2}-{highest:.2}"
                    ),
                    actual_value: Some(format!("{lowest}..{highest}")),
                }
            }

            VerificationCondition::HotspotAt { x, y, expected } => {
                let Some(tile) = state.tile_at(*x, *y) else {
                    return VerificationResult::failed(format!("({x}, {y}) is outside the layout"));
                };
                let actual = tile.hotspot_state;

                VerificationResult {
                    passed: actual == *expected,
                    message: format!("Hotspot at ({x}, {y}): expected {expected:?}, got {actual:?}"),
                    actual_value: Some(format!("{actual:?}")),
                }
            }

            VerificationCondition::HotspotCount { min, max } => {
                let actual = state.grid.hotspot_tiles().len();

                VerificationResult {
                    passed: actual >= *min && actual <= *max,
                    message: format!("Hotspot count: expected {min}-{max}, got {actual}"),
                    actual_value: Some(actual.to_string()),
                }
            }

            VerificationCondition::ActiveTilesAtMost { max } => {
                let actual = state.grid.active_tile_count();

                VerificationResult {
                    passed: actual <= *max,
                    message: format!("Active tiles: expected at most {max}, got {actual}"),
                    actual_value: Some(actual.to_string()),
                }
            }

            VerificationCondition::LastPass { expected } => {
                let actual = state.last_result.map(|r| r.completion);

                VerificationResult {
                    passed: actual == Some(*expected),
                    message: format!("Last pass: expected {expected:?}, got {actual:?}"),
                    actual_value: actual.map(|c| format!("{c:?}")),
                }
            }

            VerificationCondition::All { conditions } => {
                let results: Vec<_> = conditions.iter().map(|c| c.evaluate(state)).collect();
                let passed = results.iter().all(|r| r.passed);
                let failures: Vec<_> = results
                    .iter()
                    .filter(|r| !r.passed)
                    .map(|r| r.message.as_str())
                    .collect();

                VerificationResult {
                    passed,
                    message: if passed {
                        format!("All {} conditions passed", conditions.len())
                    } else {
                        format!("Failed: {}", failures.join("; "))
                    },
                    actual_value: None,
                }
            }

            VerificationCondition::Any { conditions } => {
                let results: Vec<_> = conditions.iter().map(|c| c.evaluate(state)).collect();
                let passed = results.iter().any(|r| r.passed);

                VerificationResult {
                    passed,
                    message: if passed {
                        "At least one condition passed".to_string()
                    } else {
                        format!("None of {} conditions passed", conditions.len())
                    },
                    actual_value: None,
                }
            }

            VerificationCondition::Not { condition } => {
                let result = condition.evaluate(state);

                VerificationResult {
                    passed: !result.passed,
                    message: format!("NOT ({})", result.message),
                    actual_value: result.actual_value,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmos_core::{GasId, GasMixture, GridAtmos};

    fn state() -> ScenarioState {
        let mut grid = GridAtmos::new();
        let air = GasMixture::new(300.0).with_gas(GasId::OXYGEN, 10.0);
        let layout = RectLayout::filled(&mut grid, 3, 2, &air).unwrap();
        ScenarioState::new(grid, layout)
    }

    #[test]
    fn test_region_positions() {
        let state = state();
        let rect = Region::Rect {
            min_x: -5,
            min_y: 0,
            max_x: 1,
            max_y: 9,
        };

        assert_eq!(rect.positions(&state.layout).unwrap().len(), 4);
        assert_eq!(Region::Whole.positions(&state.layout).unwrap().len(), 6);
        assert!(Region::Tile { x: 3, y: 0 }.positions(&state.layout).is_none());
    }

    #[test]
    fn test_gas_checks() {
        let state = state();

        let total = VerificationCondition::TotalMoles {
            gas: Some("oxygen".to_string()),
            min: 59.9,
            max: 60.1,
        };
        assert!(total.evaluate(&state).passed);

        let unknown = VerificationCondition::GasAt {
            x: 0,
            y: 0,
            gas: "phlogiston".to_string(),
            min: 0.0,
            max: 1.0,
        };
        assert!(!unknown.evaluate(&state).passed);

        let outside = VerificationCondition::GasAt {
            x: 9,
            y: 0,
            gas: "oxygen".to_string(),
            min: 0.0,
            max: 100.0,
        };
        assert!(!outside.evaluate(&state).passed);
    }

    #[test]
    fn test_logical_operators() {
        let state = state();
        let warm = VerificationCondition::TemperatureRange {
            region: Region::Whole,
            min: 290.0,
            max: 310.0,
        };
        let cold = VerificationCondition::TemperatureRange {
            region: Region::Whole,
            min: 0.0,
            max: 100.0,
        };

        let all = VerificationCondition::All {
            conditions: vec![warm.clone(), cold.clone()],
        };
        let any = VerificationCondition::Any {
            conditions: vec![warm, cold.clone()],
        };
        let not = VerificationCondition::Not {
            condition: Box::new(cold),
        };

        assert!(!all.evaluate(&state).passed);
        assert!(any.evaluate(&state).passed);
        assert!(not.evaluate(&state).passed);
    }

    #[test]
    fn test_last_pass_needs_a_pass() {
        let state = state();
        let condition = VerificationCondition::LastPass {
            expected: Completion::Complete,
        };
        assert!(!condition.evaluate(&state).passed);
    }
}
