//! Scenario execution engine

use anyhow::{Context, Result, bail};
use atmos_core::{
    AtmosConfig, AtmosResult, Direction, GasMixture, Gases, GridAtmos, ProcessResult, RectLayout,
    TileAtmos,
};
use web_time::Instant;

use super::actions::{GasAmount, ScenarioAction};
use super::definition::{LayoutDefinition, ScenarioDefinition};
use super::results::ExecutionReport;
use super::verification::{Region, VerificationCondition};

/// Configuration for scenario executor
#[derive(Debug, Clone, Default)]
pub struct ScenarioExecutorConfig {
    /// Verbose logging
    pub verbose: bool,

    /// Log a line after every simulated tick
    pub log_ticks: bool,
}

/// Grid under test plus what the last processing call reported
pub struct ScenarioState {
    pub grid: GridAtmos,
    pub layout: RectLayout,
    pub last_result: Option<ProcessResult>,
    gases: Gases,
}

impl ScenarioState {
    pub fn new(grid: GridAtmos, layout: RectLayout) -> Self {
        Self {
            grid,
            layout,
            last_result: None,
            gases: Gases::new(),
        }
    }

    /// Build a fresh grid from a layout definition
    pub fn from_layout(definition: &LayoutDefinition) -> Result<Self> {
        if definition.width == 0 || definition.height == 0 {
            bail!(
                "Layout must not be empty ({}x{})",
                definition.width,
                definition.height
            );
        }

        let gases = Gases::new();
        let mixture = resolve_mixture(&gases, &definition.gases, definition.temperature)?;
        let conductivity = definition.conductivity;
        let mut grid = GridAtmos::with_capacity(definition.width * definition.height);
        let layout = RectLayout::build(&mut grid, definition.width, definition.height, |position| {
            let mut tile = TileAtmos::with_mixture(position, &mixture);
            tile.thermal_conductivity = conductivity;
            tile
        })?;

        Ok(Self {
            grid,
            layout,
            last_result: None,
            gases,
        })
    }

    /// Registry id of a gas name
    pub fn gas_id(&self, name: &str) -> Option<usize> {
        self.gases.id_by_name(name)
    }

    pub fn tile_at(&self, x: i32, y: i32) -> Option<&TileAtmos> {
        let index = self.layout.index(x, y)?;
        self.grid.tile(index).ok()
    }

    fn region_indices(&self, region: &Region) -> Result<Vec<usize>> {
        let positions = region
            .positions(&self.layout)
            .with_context(|| format!("{region:?} lies outside the layout"))?;
        let indices = positions
            .into_iter()
            .map(|(x, y)| self.layout.index_at(x, y))
            .collect::<AtmosResult<Vec<_>>>()?;
        Ok(indices)
    }
}

fn resolve_mixture(gases: &Gases, amounts: &[GasAmount], temperature: f32) -> Result<GasMixture> {
    let mut mixture = GasMixture::new(temperature);
    for amount in amounts {
        let Some(id) = gases.id_by_name(&amount.gas) else {
            bail!("Unknown gas {:?}", amount.gas);
        };
        if amount.moles < 0.0 {
            bail!("Negative amount of {}: {}", amount.gas, amount.moles);
        }
        mixture.moles[id] += amount.moles;
    }
    Ok(mixture)
}

/// Executes scenario actions against a grid
pub struct ScenarioExecutor {
    /// Configuration
    config: ScenarioExecutorConfig,

    /// Ticks simulated so far
    tick_count: usize,

    /// Action execution log
    log: Vec<String>,

    /// Processing calls made (several per tick when sped up)
    update_count: usize,

    /// Calls that ran out of budget
    partial_count: usize,

    tiles_processed: usize,

    /// Tick timings (milliseconds)
    tick_times: Vec<f64>,

    /// Grid was edited since the last revalidation
    dirty: bool,
}

impl ScenarioExecutor {
    /// Create new executor with default config
    pub fn new() -> Self {
        Self::with_config(ScenarioExecutorConfig::default())
    }

    /// Create new executor with custom config
    pub fn with_config(config: ScenarioExecutorConfig) -> Self {
        Self {
            config,
            tick_count: 0,
            log: Vec::new(),
            update_count: 0,
            partial_count: 0,
            tiles_processed: 0,
            tick_times: Vec::new(),
            dirty: false,
        }
    }

    /// Execute a complete scenario on a fresh grid
    pub fn execute_scenario(
        &mut self,
        scenario: &ScenarioDefinition,
        engine: &AtmosConfig,
    ) -> Result<ExecutionReport> {
        let start_time = Instant::now();
        let mut report = ExecutionReport::new(scenario.name.clone());

        self.log.clear();
        self.tick_count = 0;
        self.update_count = 0;
        self.partial_count = 0;
        self.tiles_processed = 0;
        self.tick_times.clear();
        self.dirty = false;

        self.log(&format!("Starting scenario: {}", scenario.name));
        if !scenario.description.is_empty() {
            self.log(&format!("Description: {}", scenario.description));
        }

        // Build the grid and run setup actions
        let setup_start = Instant::now();
        let mut state = ScenarioState::from_layout(&scenario.layout)
            .with_context(|| format!("Invalid layout in scenario {}", scenario.name))?;
        self.log(&format!(
            "Built {}x{} grid",
            scenario.layout.width, scenario.layout.height
        ));
        if !scenario.setup.is_empty() {
            self.log(&format!("Running {} setup actions", scenario.setup.len()));
            for (idx, action) in scenario.setup.iter().enumerate() {
                if let Err(e) = self.execute_action(action, &mut state, engine) {
                    let msg = format!("Setup action {} failed: {}", idx, e);
                    self.log(&msg);
                    report.log = self.log.clone();
                    return Err(anyhow::anyhow!(msg));
                }
            }
        }
        // Setup edits leave caches stale until the grid is revalidated
        state.grid.process_revalidate(engine);
        self.dirty = false;
        report.performance.setup_duration_ms = setup_start.elapsed().as_secs_f64() * 1000.0;

        // Execute main actions
        let action_start = Instant::now();
        self.log(&format!("Running {} main actions", scenario.actions.len()));
        for (idx, action) in scenario.actions.iter().enumerate() {
            if let Err(e) = self.execute_action(action, &mut state, engine) {
                let msg = format!("Action {} failed: {}", idx, e);
                self.log(&msg);
                report.log = self.log.clone();
                return Err(anyhow::anyhow!(msg));
            }
        }
        report.performance.action_duration_ms = action_start.elapsed().as_secs_f64() * 1000.0;

        report.actions_executed = scenario.setup.len() + scenario.actions.len();

        // Run verifications
        let verify_start = Instant::now();
        if !scenario.verify.is_empty() {
            self.log(&format!("Running {} verifications", scenario.verify.len()));
            for condition in &scenario.verify {
                let result = condition.evaluate(&state);
                self.log(&format!(
                    "  {} {}",
                    if result.passed { "✓" } else { "✗" },
                    result.message
                ));

                if !result.passed {
                    report.verification_failures.push(result);
                }
            }
        }
        report.performance.verification_duration_ms = verify_start.elapsed().as_secs_f64() * 1000.0;

        // Finalize report
        report.ticks_executed = self.tick_count;
        report.passed = report.verification_failures.is_empty();

        report.performance.total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        report.performance.update_count = self.update_count;
        report.performance.partial_updates = self.partial_count;
        report.performance.tiles_processed = self.tiles_processed;

        if !self.tick_times.is_empty() {
            let total_tick_time: f64 = self.tick_times.iter().sum();
            report.performance.avg_tick_time_ms = total_tick_time / self.tick_times.len() as f64;
            report.performance.peak_tick_time_ms =
                self.tick_times.iter().copied().fold(0.0, f64::max);
        }

        self.log(&format!(
            "Scenario complete: {} ({} ticks, {:.1}ms)",
            if report.passed { "PASSED" } else { "FAILED" },
            self.tick_count,
            report.performance.total_duration_ms
        ));
        self.log(&format!("  Performance: {}", report.performance.summary()));
        report.log = self.log.clone();

        Ok(report)
    }

    /// Execute a single action
    fn execute_action(
        &mut self,
        action: &ScenarioAction,
        state: &mut ScenarioState,
        engine: &AtmosConfig,
    ) -> Result<()> {
        if self.config.verbose {
            self.log(&format!("[Tick {}] {:?}", self.tick_count, action));
        }

        if matches!(
            action,
            ScenarioAction::FillGas { .. }
                | ScenarioAction::AddGas { .. }
                | ScenarioAction::Wall { .. }
                | ScenarioAction::Breach { .. }
        ) {
            self.dirty = true;
        }

        match action {
            ScenarioAction::FillGas {
                region,
                gases,
                temperature,
            } => {
                let mixture = resolve_mixture(&state.gases, gases, *temperature)?;
                let indices = state.region_indices(region)?;
                let mut filled = 0;
                for &index in &indices {
                    let mut tile = *state.grid.tile(index)?;
                    if tile.is_immutable() {
                        continue;
                    }
                    tile.moles = mixture.moles;
                    tile.temperature = mixture.temperature;
                    state.grid.update_tile(index, tile)?;
                    state.grid.add_active_tile(index)?;
                    filled += 1;
                }
                self.log(&format!("  Filled {filled} tiles at {temperature} K"));
            }

            ScenarioAction::AddGas { region, gas } => {
                let mixture = resolve_mixture(&state.gases, std::slice::from_ref(gas), 0.0)?;
                for index in state.region_indices(region)? {
                    let mut tile = *state.grid.tile(index)?;
                    if tile.is_immutable() {
                        continue;
                    }
                    for (moles, added) in tile.moles.iter_mut().zip(mixture.moles.iter()) {
                        *moles += added;
                    }
                    state.grid.update_tile(index, tile)?;
                    state.grid.add_active_tile(index)?;
                }
                self.log(&format!("  Added {} mol {} per tile", gas.moles, gas.gas));
            }

            ScenarioAction::SetTemperature {
                region,
                temperature,
            } => {
                if *temperature <= 0.0 || !temperature.is_finite() {
                    bail!("Temperature must be positive, got {temperature}");
                }
                for index in state.region_indices(region)? {
                    let tile = state.grid.tile_mut(index)?;
                    if tile.is_immutable() {
                        continue;
                    }
                    tile.temperature = *temperature;
                    state.grid.add_active_tile(index)?;
                }
                self.log(&format!("  Set temperature of {region:?} to {temperature} K"));
            }

            ScenarioAction::SetConductivity {
                region,
                conductivity,
            } => {
                for index in state.region_indices(region)? {
                    state.grid.tile_mut(index)?.thermal_conductivity = *conductivity;
                }
                self.log(&format!("  Set conductivity of {region:?} to {conductivity}"));
            }

            ScenarioAction::Wall { region } => {
                let positions = region
                    .positions(&state.layout)
                    .with_context(|| format!("{region:?} lies outside the layout"))?;
                for &(x, y) in &positions {
                    state.layout.make_wall(&mut state.grid, x, y)?;
                }
                self.log(&format!("  Walled {} tiles", positions.len()));
            }

            ScenarioAction::Breach { region } => {
                let positions = region
                    .positions(&state.layout)
                    .with_context(|| format!("{region:?} lies outside the layout"))?;
                for &(x, y) in &positions {
                    state.layout.make_space(&mut state.grid, x, y, engine)?;
                    // Open the breach toward everything except walls
                    let index = state.layout.index_at(x, y)?;
                    for direction in Direction::ALL {
                        let Some(neighbor) = state.grid.tile(index)?.neighbor(direction) else {
                            continue;
                        };
                        if !state.grid.tile(neighbor)?.is_immutable() {
                            state
                                .layout
                                .set_edge_blocked(&mut state.grid, x, y, direction, false)?;
                            state.grid.add_active_tile(neighbor)?;
                        }
                    }
                }
                self.log(&format!("  Breached {} tiles", positions.len()));
            }

            ScenarioAction::BlockEdge {
                x,
                y,
                direction,
                blocked,
            } => {
                state
                    .layout
                    .set_edge_blocked(&mut state.grid, *x, *y, *direction, *blocked)?;
                if !blocked {
                    let index = state.layout.index_at(*x, *y)?;
                    if !state.grid.tile(index)?.is_immutable() {
                        state.grid.add_active_tile(index)?;
                    }
                }
                self.log(&format!(
                    "  {} edge {direction:?} of ({x}, {y})",
                    if *blocked { "Blocked" } else { "Opened" }
                ));
            }

            ScenarioAction::Activate { region } => {
                let mut activated = 0;
                for index in state.region_indices(region)? {
                    if !state.grid.tile(index)?.is_immutable() {
                        state.grid.add_active_tile(index)?;
                        activated += 1;
                    }
                }
                self.log(&format!("  Activated {activated} tiles"));
            }

            ScenarioAction::Ignite {
                x,
                y,
                temperature,
                volume,
            } => {
                let index = state.layout.index_at(*x, *y)?;
                let lit = state
                    .grid
                    .ignite_hotspot(index, *temperature, *volume, engine)?;
                self.log(&format!(
                    "  Exposed ({x}, {y}) to {temperature} K: {}",
                    if lit { "fire started" } else { "nothing caught" }
                ));
            }

            ScenarioAction::Extinguish { x, y } => {
                let index = state.layout.index_at(*x, *y)?;
                state.grid.extinguish_hotspot(index)?;
                self.log(&format!("  Extinguished ({x}, {y})"));
            }

            ScenarioAction::Equalize { x, y } => {
                let index = state.layout.index_at(*x, *y)?;
                let outcome = state.grid.equalize_pressure_zone(index, engine)?;
                self.log(&format!("  Equalized around ({x}, {y}): {outcome:?}"));
            }

            ScenarioAction::Depressurize { x, y } => {
                let index = state.layout.index_at(*x, *y)?;
                let outcome = state.grid.explosive_depressurize(index, engine)?;
                self.log(&format!("  Depressurized around ({x}, {y}): {outcome:?}"));
            }

            ScenarioAction::RunTicks { ticks } => {
                for _ in 0..*ticks {
                    self.tick(state, engine);
                }
                self.log(&format!("  Ran {} ticks", ticks));
            }

            ScenarioAction::RunUntil {
                condition,
                max_ticks,
            } => {
                self.run_until(state, engine, condition, *max_ticks)?;
            }

            ScenarioAction::Revalidate => {
                self.dirty = false;
                let result = state.grid.process_revalidate(engine);
                self.log(&format!(
                    "  Revalidated: {} active tiles",
                    result.active_tiles
                ));
            }

            ScenarioAction::Log { message } => {
                self.log(&format!("  [LOG] {}", message));
            }
        }

        Ok(())
    }

    /// One simulated tick; the engine's speedup turns it into several calls
    fn tick(&mut self, state: &mut ScenarioState, engine: &AtmosConfig) {
        #[cfg(feature = "detailed_profiling")]
        let _span = tracing::info_span!("scenario_tick", tick = self.tick_count).entered();

        if std::mem::take(&mut self.dirty) {
            state.grid.process_revalidate(engine);
        }

        let calls = engine.speedup.round().max(1.0) as usize;
        let tick_start = Instant::now();
        for _ in 0..calls {
            let result = state.grid.process(engine);
            self.update_count += 1;
            self.tiles_processed += result.tiles_processed;
            if !result.is_complete() {
                self.partial_count += 1;
            }
            state.last_result = Some(result);
        }
        let elapsed = tick_start.elapsed().as_secs_f64() * 1000.0;
        self.tick_times.push(elapsed);
        self.tick_count += 1;

        if self.config.log_ticks
            && let Some(result) = state.last_result
        {
            self.log(&format!(
                "  [Tick {}] {} tiles, {} active, {} fires, {:.2}ms",
                self.tick_count,
                result.tiles_processed,
                result.active_tiles,
                result.hotspot_tiles,
                elapsed
            ));
        }
    }

    fn run_until(
        &mut self,
        state: &mut ScenarioState,
        engine: &AtmosConfig,
        condition: &VerificationCondition,
        max_ticks: usize,
    ) -> Result<()> {
        for waited in 0..=max_ticks {
            let result = condition.evaluate(state);
            if result.passed {
                self.log(&format!(
                    "  Condition met after {} ticks: {}",
                    waited, result.message
                ));
                return Ok(());
            }
            if waited < max_ticks {
                self.tick(state, engine);
            }
        }

        let result = condition.evaluate(state);
        bail!(
            "Condition not met within {} ticks: {}",
            max_ticks,
            result.message
        )
    }

    /// Add message to log
    fn log(&mut self, message: &str) {
        log::info!("{}", message);
        self.log.push(message.to_string());
    }
}

impl Default for ScenarioExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::actions::GasAmount;
    use crate::scenario::definition::LayoutDefinition;
    use atmos_core::{Completion, GasId, HotspotState};

    fn oxygen(moles: f32) -> Vec<GasAmount> {
        vec![GasAmount {
            gas: "oxygen".to_string(),
            moles,
        }]
    }

    fn scenario(
        actions: Vec<ScenarioAction>,
        verify: Vec<VerificationCondition>,
    ) -> ScenarioDefinition {
        ScenarioDefinition {
            name: "test".to_string(),
            description: String::new(),
            layout: LayoutDefinition {
                width: 4,
                height: 1,
                gases: Vec::new(),
                temperature: 293.15,
                conductivity: 0.0,
            },
            setup: vec![ScenarioAction::FillGas {
                region: Region::Tile { x: 0, y: 0 },
                gases: oxygen(40.0),
                temperature: 293.15,
            }],
            actions,
            verify,
        }
    }

    #[test]
    fn test_layout_gases_resolved() {
        let layout = LayoutDefinition {
            width: 2,
            height: 2,
            gases: vec![GasAmount {
                gas: "Nitrogen".to_string(),
                moles: 5.0,
            }],
            temperature: 250.0,
            conductivity: 0.3,
        };
        let state = ScenarioState::from_layout(&layout).unwrap();

        let tile = state.tile_at(1, 1).unwrap();
        assert_eq!(tile.moles[GasId::NITROGEN], 5.0);
        assert_eq!(tile.temperature, 250.0);
        assert_eq!(tile.thermal_conductivity, 0.3);
    }

    #[test]
    fn test_unknown_gas_rejected() {
        let layout = LayoutDefinition {
            width: 1,
            height: 1,
            gases: vec![GasAmount {
                gas: "aether".to_string(),
                moles: 1.0,
            }],
            temperature: 293.15,
            conductivity: 0.0,
        };
        assert!(ScenarioState::from_layout(&layout).is_err());
    }

    #[test]
    fn test_gas_spreads_and_is_conserved() {
        let scenario = scenario(
            vec![ScenarioAction::RunTicks { ticks: 20 }],
            vec![
                VerificationCondition::TotalMoles {
                    gas: Some("oxygen".to_string()),
                    min: 39.99,
                    max: 40.01,
                },
                VerificationCondition::GasAt {
                    x: 3,
                    y: 0,
                    gas: "oxygen".to_string(),
                    min: 0.01,
                    max: 40.0,
                },
                VerificationCondition::LastPass {
                    expected: Completion::Complete,
                },
            ],
        );

        let mut executor = ScenarioExecutor::new();
        let report = executor
            .execute_scenario(&scenario, &AtmosConfig::deterministic(0))
            .unwrap();

        assert!(report.passed, "{:?}", report.verification_failures);
        assert_eq!(report.ticks_executed, 20);
        assert_eq!(report.performance.update_count, 20);
    }

    #[test]
    fn test_speedup_runs_extra_calls() {
        let scenario = scenario(vec![ScenarioAction::RunTicks { ticks: 3 }], Vec::new());
        let engine = AtmosConfig {
            speedup: 2.0,
            ..AtmosConfig::deterministic(0)
        };

        let report = ScenarioExecutor::new()
            .execute_scenario(&scenario, &engine)
            .unwrap();

        assert_eq!(report.ticks_executed, 3);
        assert_eq!(report.performance.update_count, 6);
    }

    #[test]
    fn test_run_until_times_out() {
        let scenario = scenario(
            vec![ScenarioAction::RunUntil {
                condition: VerificationCondition::HotspotAt {
                    x: 0,
                    y: 0,
                    expected: HotspotState::Burning,
                },
                max_ticks: 5,
            }],
            Vec::new(),
        );

        let result = ScenarioExecutor::new().execute_scenario(&scenario, &AtmosConfig::deterministic(0));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Condition not met within 5 ticks"));
    }

    #[test]
    fn test_failed_verification_reported() {
        let scenario = scenario(
            Vec::new(),
            vec![VerificationCondition::TotalMoles {
                gas: None,
                min: 100.0,
                max: 200.0,
            }],
        );

        let report = ScenarioExecutor::new()
            .execute_scenario(&scenario, &AtmosConfig::deterministic(0))
            .unwrap();

        assert!(!report.passed);
        assert_eq!(report.verification_failures.len(), 1);
        assert!(report.log.iter().any(|line| line.contains("FAILED")));
    }

    #[test]
    fn test_action_outside_layout_fails() {
        let scenario = scenario(vec![ScenarioAction::Extinguish { x: 10, y: 0 }], Vec::new());
        let result = ScenarioExecutor::new().execute_scenario(&scenario, &AtmosConfig::deterministic(0));
        assert!(result.is_err());
    }
}
