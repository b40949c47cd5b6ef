//! Gas species definitions and registry

use serde::{Deserialize, Serialize};

/// Number of simulated gas species
pub const GAS_COUNT: usize = 9;

/// Capacity of per-tile mole arrays. Slots past [`GAS_COUNT`] are reserved and stay zero.
pub const GAS_ARRAY_SIZE: usize = 12;

/// Per-species values in the fixed tile layout
pub type GasArray = [f32; GAS_ARRAY_SIZE];

/// Built-in gas IDs (indices into tile mole arrays)
pub struct GasId;

impl GasId {
    pub const OXYGEN: usize = 0;
    pub const NITROGEN: usize = 1;
    pub const CO2: usize = 2;
    pub const PLASMA: usize = 3;
    pub const TRITIUM: usize = 4;
    pub const WATER_VAPOR: usize = 5;
    pub const AMMONIA: usize = 6;
    pub const N2O: usize = 7;
    pub const FREZON: usize = 8;
}

/// Definition of a gas species
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GasDef {
    pub id: usize,
    pub name: String,
    /// Heat capacity per mole (J/K/mol)
    pub specific_heat: f32,
    /// Burns in the presence of oxygen
    pub flammable: bool,
}

impl Default for GasDef {
    fn default() -> Self {
        Self {
            id: 0,
            name: "unknown".to_string(),
            specific_heat: 20.0,
            flammable: false,
        }
    }
}

/// Registry of all gas species
pub struct Gases {
    gases: Vec<GasDef>,
}

impl Gases {
    pub fn new() -> Self {
        let mut gases = Self {
            gases: Vec::with_capacity(GAS_COUNT),
        };
        gases.register_defaults();
        gases
    }

    fn register_defaults(&mut self) {
        self.register(GasDef {
            id: GasId::OXYGEN,
            name: "oxygen".to_string(),
            specific_heat: 20.0,
            ..Default::default()
        });

        self.register(GasDef {
            id: GasId::NITROGEN,
            name: "nitrogen".to_string(),
            specific_heat: 20.0,
            ..Default::default()
        });

        self.register(GasDef {
            id: GasId::CO2,
            name: "co2".to_string(),
            specific_heat: 30.0,
            ..Default::default()
        });

        self.register(GasDef {
            id: GasId::PLASMA,
            name: "plasma".to_string(),
            specific_heat: 200.0,
            flammable: true,
        });

        self.register(GasDef {
            id: GasId::TRITIUM,
            name: "tritium".to_string(),
            specific_heat: 10.0,
            flammable: true,
        });

        self.register(GasDef {
            id: GasId::WATER_VAPOR,
            name: "water_vapor".to_string(),
            specific_heat: 40.0,
            ..Default::default()
        });

        self.register(GasDef {
            id: GasId::AMMONIA,
            name: "ammonia".to_string(),
            specific_heat: 20.0,
            ..Default::default()
        });

        self.register(GasDef {
            id: GasId::N2O,
            name: "n2o".to_string(),
            specific_heat: 40.0,
            ..Default::default()
        });

        self.register(GasDef {
            id: GasId::FREZON,
            name: "frezon".to_string(),
            specific_heat: 600.0,
            ..Default::default()
        });
    }

    fn register(&mut self, gas: GasDef) {
        let id = gas.id;
        if id >= GAS_COUNT {
            log::warn!("Ignoring gas '{}' with out-of-range id {}", gas.name, id);
            return;
        }
        if id >= self.gases.len() {
            self.gases.resize(id + 1, GasDef::default());
        }
        self.gases[id] = gas;
    }

    /// Get gas definition by ID
    pub fn get(&self, id: usize) -> Option<&GasDef> {
        self.gases.get(id)
    }

    /// Look up a gas ID by its registry name
    pub fn id_by_name(&self, name: &str) -> Option<usize> {
        self.gases
            .iter()
            .find(|gas| gas.name.eq_ignore_ascii_case(name))
            .map(|gas| gas.id)
    }

    /// Specific heats in tile array layout (reserved slots are zero)
    pub fn specific_heats(&self) -> GasArray {
        let mut heats = [0.0; GAS_ARRAY_SIZE];
        for gas in &self.gases {
            heats[gas.id] = gas.specific_heat;
        }
        heats
    }

    pub fn iter(&self) -> impl Iterator<Item = &GasDef> {
        self.gases.iter()
    }
}

impl Default for Gases {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_species_registered() {
        let gases = Gases::new();
        assert_eq!(gases.iter().count(), GAS_COUNT);
        for (i, gas) in gases.iter().enumerate() {
            assert_eq!(gas.id, i);
            assert!(gas.specific_heat > 0.0);
        }
    }

    #[test]
    fn test_reserved_slots_have_no_heat() {
        let heats = Gases::new().specific_heats();
        for heat in &heats[GAS_COUNT..] {
            assert_eq!(*heat, 0.0);
        }
        assert_eq!(heats[GasId::PLASMA], 200.0);
        assert_eq!(heats[GasId::FREZON], 600.0);
    }

    #[test]
    fn test_lookup_by_name() {
        let gases = Gases::new();
        assert_eq!(gases.id_by_name("oxygen"), Some(GasId::OXYGEN));
        assert_eq!(gases.id_by_name("Water_Vapor"), Some(GasId::WATER_VAPOR));
        assert_eq!(gases.id_by_name("phlogiston"), None);
    }
}
