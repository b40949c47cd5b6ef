//! Scenario definition and RON file loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::actions::{GasAmount, ScenarioAction};
use super::verification::VerificationCondition;

/// Grid the scenario starts from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDefinition {
    pub width: usize,
    pub height: usize,

    /// Gas every tile starts with; empty means vacuum
    #[serde(default)]
    pub gases: Vec<GasAmount>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Material conductivity of every tile
    #[serde(default)]
    pub conductivity: f32,
}

fn default_temperature() -> f32 {
    293.15
}

/// Top-level scenario definition loaded from RON files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Scenario name
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    pub layout: LayoutDefinition,

    /// Grid edits run before the main actions; the grid is revalidated after
    #[serde(default)]
    pub setup: Vec<ScenarioAction>,

    /// Main scenario actions
    pub actions: Vec<ScenarioAction>,

    /// Verification checks to run after scenario
    #[serde(default)]
    pub verify: Vec<VerificationCondition>,
}

impl ScenarioDefinition {
    /// Load scenario from RON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;

        Self::from_ron(&content)
            .with_context(|| format!("Failed to parse RON scenario: {}", path.display()))
    }

    pub fn from_ron(content: &str) -> Result<Self> {
        ron::from_str(content).context("Invalid scenario RON")
    }

    /// Save scenario to RON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let ron = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize scenario to RON")?;

        std::fs::write(path.as_ref(), ron).with_context(|| {
            format!("Failed to write scenario file: {}", path.as_ref().display())
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::verification::Region;

    fn sample() -> ScenarioDefinition {
        ScenarioDefinition {
            name: "Test Scenario".to_string(),
            description: "A test scenario".to_string(),
            layout: LayoutDefinition {
                width: 3,
                height: 1,
                gases: vec![GasAmount {
                    gas: "oxygen".to_string(),
                    moles: 20.0,
                }],
                temperature: 293.15,
                conductivity: 0.0,
            },
            setup: vec![ScenarioAction::Breach {
                region: Region::Tile { x: 2, y: 0 },
            }],
            actions: vec![
                ScenarioAction::RunTicks { ticks: 5 },
                ScenarioAction::Log {
                    message: "Test message".to_string(),
                },
            ],
            verify: vec![VerificationCondition::TotalMoles {
                gas: Some("oxygen".to_string()),
                min: 0.0,
                max: 40.0,
            }],
        }
    }

    #[test]
    fn test_scenario_serialization() {
        let scenario = sample();

        let ron = ron::ser::to_string_pretty(&scenario, ron::ser::PrettyConfig::default()).unwrap();
        assert!(ron.contains("Test Scenario"));
        assert!(ron.contains("Breach"));

        let deserialized = ScenarioDefinition::from_ron(&ron).unwrap();
        assert_eq!(deserialized.name, scenario.name);
        assert_eq!(deserialized.actions, scenario.actions);
        assert_eq!(deserialized.layout, scenario.layout);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.ron");
        sample().to_file(&path).unwrap();

        let loaded = ScenarioDefinition::from_file(&path).unwrap();
        assert_eq!(loaded.setup, sample().setup);
    }

    #[test]
    fn test_layout_defaults() {
        let scenario = ScenarioDefinition::from_ron(
            r#"(name: "bare", layout: (width: 2, height: 2), actions: [])"#,
        )
        .unwrap();
        assert_eq!(scenario.layout.temperature, 293.15);
        assert!(scenario.layout.gases.is_empty());
        assert!(scenario.verify.is_empty());
    }
}
