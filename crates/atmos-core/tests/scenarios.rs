//! Small end-to-end situations driven through the public API

mod common;

use atmos_core::mixture::thermal_energy;
use atmos_core::{
    AtmosConfig, Direction, EqualizeOutcome, GasId, GasMixture, GridAtmos, HotspotState,
    RectLayout, TileAtmos,
};
use common::assert_close;
use glam::IVec2;

fn share_only() -> AtmosConfig {
    AtmosConfig {
        monstermos_enabled: false,
        ..AtmosConfig::deterministic(0)
    }
}

#[test]
fn test_oxygen_flows_into_vacuum() {
    let config = share_only();
    let mut grid = GridAtmos::new();
    let a = grid.add_tile(TileAtmos::with_mixture(
        IVec2::ZERO,
        &GasMixture::new(293.0).with_gas(GasId::OXYGEN, 10.0),
    ));
    let b = grid.add_tile(TileAtmos::new(IVec2::X, config.constants.tcmb));
    grid.set_adjacency(a, Direction::East, Some(b)).unwrap();
    grid.set_adjacency(b, Direction::West, Some(a)).unwrap();
    grid.add_active_tile(a).unwrap();
    let energy_before: f32 = grid.tiles().iter().map(|t| thermal_energy(t, &config)).sum();

    grid.process(&config);

    let tile_a = grid.tile(a).unwrap();
    let tile_b = grid.tile(b).unwrap();
    let gained = tile_b.moles[GasId::OXYGEN];
    assert!(gained > 0.0);
    assert_close(tile_a.moles[GasId::OXYGEN], 10.0 - gained, 1e-6);
    assert!(tile_a.temperature < 293.0);
    assert!(tile_b.temperature > config.constants.tcmb);
    let energy_after: f32 = grid.tiles().iter().map(|t| thermal_energy(t, &config)).sum();
    assert_close(energy_after, energy_before, 1e-4);
    assert!(tile_b.is_active());
}

#[test]
fn test_plasma_fire_burns_out() {
    let config = AtmosConfig::deterministic(0);
    let mut grid = GridAtmos::new();
    let index = grid.add_tile(TileAtmos::with_mixture(
        IVec2::ZERO,
        &GasMixture::new(400.0)
            .with_gas(GasId::PLASMA, 5.0)
            .with_gas(GasId::OXYGEN, 5.0),
    ));

    assert!(grid.ignite_hotspot(index, 400.0, 10.0, &config).unwrap());
    assert_eq!(grid.tile(index).unwrap().hotspot_state, HotspotState::Growing);

    let mut peak = 400.0_f32;
    let mut saw_dying = false;
    let mut passes = 0;
    while grid.tile(index).unwrap().hotspot_state != HotspotState::None {
        grid.process(&config);
        let tile = grid.tile(index).unwrap();
        peak = peak.max(tile.temperature);
        saw_dying |= tile.hotspot_state == HotspotState::Dying;
        passes += 1;
        assert!(passes < 5000, "fire never burned out");
    }

    let tile = grid.tile(index).unwrap();
    assert!(saw_dying);
    assert!(peak > 400.0);
    assert!(tile.moles[GasId::PLASMA] < 5.0);
    assert!(tile.moles[GasId::OXYGEN] < 0.5 || tile.moles[GasId::PLASMA] < 0.5);
    assert!(tile.moles[GasId::CO2] > 0.0);
    assert!(grid.hotspot_tiles().is_empty());
}

#[test]
fn test_hull_breach_vents_room() {
    let config = AtmosConfig::deterministic(0);
    let air = GasMixture::new(293.15)
        .with_gas(GasId::OXYGEN, 21.8)
        .with_gas(GasId::NITROGEN, 82.2);
    let mut grid = GridAtmos::new();
    let layout = RectLayout::filled(&mut grid, 5, 3, &air).unwrap();
    layout.make_space(&mut grid, 4, 1, &config).unwrap();
    let before: f32 = grid.tiles().iter().map(|t| t.total_moles()).sum();

    let outcome = grid
        .explosive_depressurize(layout.index(0, 1).unwrap(), &config)
        .unwrap();

    assert!(matches!(outcome, EqualizeOutcome::Depressurized { space_tiles: 1, .. }));
    let after: f32 = grid.tiles().iter().map(|t| t.total_moles()).sum();
    assert!(after < before);
    let space = grid.tile(layout.index(4, 1).unwrap()).unwrap();
    assert_eq!(space.total_moles(), 0.0);
}

#[test]
fn test_wall_keeps_rooms_apart() {
    let config = AtmosConfig::deterministic(0);
    let mut grid = GridAtmos::new();
    let layout = RectLayout::build(&mut grid, 5, 1, |position| {
        let moles = if position.x < 2 { 100.0 } else { 10.0 };
        TileAtmos::with_mixture(position, &GasMixture::new(293.15).with_gas(GasId::NITROGEN, moles))
    })
    .unwrap();
    layout.make_wall(&mut grid, 2, 0).unwrap();
    layout.activate_all(&mut grid).unwrap();

    for _ in 0..10 {
        grid.process(&config);
    }

    for x in 0..2 {
        let tile = grid.tile(layout.index(x, 0).unwrap()).unwrap();
        assert_close(tile.total_moles(), 100.0, 1e-4);
    }
    for x in 3..5 {
        let tile = grid.tile(layout.index(x, 0).unwrap()).unwrap();
        assert_close(tile.total_moles(), 10.0, 1e-4);
    }
}

#[test]
fn test_fire_behind_window_warms_next_room() {
    let config = share_only();
    let mut grid = GridAtmos::new();
    let layout = RectLayout::build(&mut grid, 2, 1, |position| {
        let temperature = if position.x == 0 { 2000.0 } else { 293.15 };
        let mut tile = TileAtmos::with_mixture(
            position,
            &GasMixture::new(temperature).with_gas(GasId::NITROGEN, 80.0),
        );
        tile.thermal_conductivity = 1.0;
        tile
    })
    .unwrap();
    layout
        .set_edge_blocked(&mut grid, 0, 0, Direction::East, true)
        .unwrap();
    grid.add_active_tile(0).unwrap();

    let result = grid.process(&config);

    assert!(result.superconducting_tiles >= 1);
    assert!(grid.tile(1).unwrap().temperature > 293.15);
    assert!(grid.tile(0).unwrap().temperature < 2000.0);
    assert_eq!(grid.tile(1).unwrap().total_moles(), 80.0);
}

#[test]
fn test_walled_pair_cools_without_crossing() {
    let config = share_only();
    let mut grid = GridAtmos::new();
    let layout = RectLayout::build(&mut grid, 2, 1, |position| {
        let (temperature, moles) = if position.x == 0 { (800.0, 10.0) } else { (293.15, 100.0) };
        let mut tile = TileAtmos::with_mixture(
            position,
            &GasMixture::new(temperature).with_gas(GasId::NITROGEN, moles),
        );
        tile.thermal_conductivity = 1.0;
        tile
    })
    .unwrap();
    layout
        .set_edge_blocked(&mut grid, 0, 0, Direction::East, true)
        .unwrap();
    grid.add_active_tile(0).unwrap();

    let mut passes = 0;
    for pass in 0..500 {
        grid.process(&config);
        passes = pass + 1;
        let hot = grid.tile(0).unwrap().temperature;
        let cold = grid.tile(1).unwrap().temperature;
        assert!(hot >= cold, "pass {pass}: hot={hot} cold={cold}");
        if grid.superconducting_tiles().is_empty() {
            break;
        }
    }

    assert!(passes < 500, "the pair never stopped conducting");
    assert!(grid.tile(0).unwrap().temperature < config.constants.minimum_temperature_for_superconduction);
    assert!(grid.tile(1).unwrap().temperature > 293.15);
    assert_eq!(grid.tile(1).unwrap().total_moles(), 100.0);
}

#[test]
fn test_fire_without_fuel_only_cools() {
    let config = AtmosConfig::deterministic(0);
    let mut grid = GridAtmos::new();
    let index = grid.add_tile(TileAtmos::with_mixture(
        IVec2::ZERO,
        &GasMixture::new(1000.0)
            .with_gas(GasId::PLASMA, 5.0)
            .with_gas(GasId::OXYGEN, 5.0),
    ));
    assert!(grid.ignite_hotspot(index, 1000.0, 10.0, &config).unwrap());
    grid.tile_mut(index).unwrap().moles[GasId::PLASMA] = 0.0;

    let mut temperature = grid.tile(index).unwrap().temperature;
    let mut hotspot_temperature = grid.tile(index).unwrap().hotspot_temperature;
    for pass in 0..100 {
        grid.process(&config);
        let tile = grid.tile(index).unwrap();
        assert!(tile.temperature <= temperature, "pass {pass}: tile warmed to {}", tile.temperature);
        if tile.hotspot_state == HotspotState::None {
            break;
        }
        assert_eq!(tile.hotspot_state, HotspotState::Dying);
        assert!(tile.hotspot_temperature < hotspot_temperature);
        temperature = tile.temperature;
        hotspot_temperature = tile.hotspot_temperature;
    }

    let tile = grid.tile(index).unwrap();
    assert_eq!(tile.hotspot_state, HotspotState::None);
    assert!(grid.hotspot_tiles().is_empty());
    assert_eq!(tile.moles[GasId::OXYGEN], 5.0);
}
