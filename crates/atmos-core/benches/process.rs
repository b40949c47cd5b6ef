use atmos_core::{AtmosConfig, GasId, GasMixture, GridAtmos, RectLayout, TileAtmos};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use std::hint::black_box;

fn mixed_station(size: usize, seed: u64) -> GridAtmos {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let mut grid = GridAtmos::with_capacity(size * size);
    let layout = RectLayout::build(&mut grid, size, size, |position| {
        let mut mixture = GasMixture::new(rng.gen_range(270.0..330.0))
            .with_gas(GasId::OXYGEN, rng.gen_range(10.0..30.0))
            .with_gas(GasId::NITROGEN, rng.gen_range(60.0..90.0));
        if rng.gen_bool(0.02) {
            mixture = mixture.with_gas(GasId::PLASMA, 5.0).with_gas(GasId::OXYGEN, 40.0);
            mixture.temperature = 600.0;
        }
        TileAtmos::with_mixture(position, &mixture)
    })
    .expect("layout fits");
    layout.activate_all(&mut grid).expect("indices are in range");
    grid
}

fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process");
    group.sample_size(20);

    for size in [32_usize, 64, 128] {
        let config = AtmosConfig::deterministic(0);
        group.bench_function(format!("full_pass_{size}x{size}"), |b| {
            b.iter_batched(
                || mixed_station(size, 0xA7_05),
                |mut grid| {
                    for _ in 0..4 {
                        black_box(grid.process(&config));
                    }
                },
                BatchSize::LargeInput,
            );
        });

        let config = AtmosConfig {
            monstermos_enabled: false,
            ..AtmosConfig::deterministic(0)
        };
        group.bench_function(format!("share_only_{size}x{size}"), |b| {
            b.iter_batched(
                || mixed_station(size, 0xA7_05),
                |mut grid| black_box(grid.process(&config)),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_equalize(c: &mut Criterion) {
    let config = AtmosConfig::deterministic(0);
    c.bench_function("equalize_zone_14x14", |b| {
        b.iter_batched(
            || {
                let mut grid = GridAtmos::new();
                RectLayout::build(&mut grid, 14, 14, |position| {
                    let moles = if position.x < 7 { 200.0 } else { 20.0 };
                    TileAtmos::with_mixture(
                        position,
                        &GasMixture::new(293.15).with_gas(GasId::NITROGEN, moles),
                    )
                })
                .expect("layout fits");
                grid
            },
            |mut grid| black_box(grid.equalize_pressure_zone(0, &config)),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_process, bench_equalize);
criterion_main!(benches);
