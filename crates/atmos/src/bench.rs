//! Station benchmark: generate a seeded station and time a run of ticks

use anyhow::{Context, Result};
use atmos_core::{AtmosConfig, GridAtmos, ProcessResult, engine_version, simd_level};
use serde::{Deserialize, Serialize};
use std::path::Path;
use web_time::Instant;

use crate::station::{self, StationSpec};

/// What a benchmark run measured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub engine_version: String,
    pub simd_level: u8,
    pub station_size: usize,
    pub seed: u64,
    pub ticks: usize,
    pub tile_count: usize,

    /// Station generation time (milliseconds)
    pub generate_ms: f64,
    pub total_ms: f64,
    pub avg_tick_ms: f64,
    pub peak_tick_ms: f64,

    pub tiles_processed: usize,
    pub partial_ticks: usize,
    pub reactions_triggered: usize,

    /// State after the last tick
    pub final_active_tiles: usize,
    pub final_hotspots: usize,
    pub final_excited_groups: usize,
}

impl BenchReport {
    pub fn summary(&self) -> String {
        format!(
            "{0}x{0} station, {1} ticks: avg {2:.3}ms, peak {3:.3}ms, {4} tiles processed, {5} partial, {6} still active",
            self.station_size,
            self.ticks,
            self.avg_tick_ms,
            self.peak_tick_ms,
            self.tiles_processed,
            self.partial_ticks,
            self.final_active_tiles
        )
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize bench report")?;
        std::fs::write(path.as_ref(), json).with_context(|| {
            format!("Failed to write bench report: {}", path.as_ref().display())
        })
    }
}

/// Generate a station and process it `ticks` times
pub fn run(
    spec: &StationSpec,
    ticks: usize,
    config: &AtmosConfig,
    log_ticks: bool,
) -> Result<BenchReport> {
    let mut grid = GridAtmos::with_capacity(spec.size * spec.size);

    let generate_start = Instant::now();
    station::generate(&mut grid, spec, config)?;
    let generate_ms = generate_start.elapsed().as_secs_f64() * 1000.0;

    let mut tick_times = Vec::with_capacity(ticks);
    let mut totals = ProcessResult::default();
    let mut partial_ticks = 0;
    let run_start = Instant::now();

    for tick in 0..ticks {
        #[cfg(feature = "detailed_profiling")]
        let _span = tracing::info_span!("bench_tick", tick).entered();

        let tick_start = Instant::now();
        let result = grid.process(config);
        let elapsed = tick_start.elapsed().as_secs_f64() * 1000.0;
        tick_times.push(elapsed);

        totals.tiles_processed += result.tiles_processed;
        totals.reactions_triggered += result.reactions_triggered;
        if !result.is_complete() {
            partial_ticks += 1;
        }
        if log_ticks {
            log::info!(
                "[Tick {tick}] {} tiles, {} active, {} fires, {} groups, {elapsed:.3}ms",
                result.tiles_processed,
                result.active_tiles,
                result.hotspot_tiles,
                result.excited_groups
            );
        }
    }

    let total_ms = run_start.elapsed().as_secs_f64() * 1000.0;
    let report = BenchReport {
        engine_version: engine_version().to_string(),
        simd_level: simd_level(),
        station_size: spec.size,
        seed: spec.seed,
        ticks,
        tile_count: grid.tile_count(),
        generate_ms,
        total_ms,
        avg_tick_ms: if ticks > 0 { total_ms / ticks as f64 } else { 0.0 },
        peak_tick_ms: tick_times.iter().copied().fold(0.0, f64::max),
        tiles_processed: totals.tiles_processed,
        partial_ticks,
        reactions_triggered: totals.reactions_triggered,
        final_active_tiles: grid.active_tile_count(),
        final_hotspots: grid.hotspot_tiles().len(),
        final_excited_groups: grid.excited_group_count(),
    };
    log::info!("{}", report.summary());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_bench_run() {
        let spec = StationSpec::new(16, 4);
        let report = run(&spec, 5, &AtmosConfig::deterministic(0), false).unwrap();

        assert_eq!(report.ticks, 5);
        assert_eq!(report.tile_count, 256);
        assert_eq!(report.partial_ticks, 0);
        assert!(report.tiles_processed > 0);
        assert!(report.summary().contains("16x16 station"));
    }

    #[test]
    fn test_tile_budget_shows_partial_ticks() {
        let spec = StationSpec::new(32, 4);
        let report = run(&spec, 3, &AtmosConfig::deterministic(10), false).unwrap();
        assert_eq!(report.partial_ticks, 3);
    }
}
