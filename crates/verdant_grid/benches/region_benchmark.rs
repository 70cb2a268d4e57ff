//! Region query benchmark: cost must track occupant count, not box volume.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use verdant_core::EntityId;
use verdant_grid::{GridBounds, VoxelCoord, VoxelGrid};

fn sparse_grid(occupants: i32) -> VoxelGrid {
    let grid = VoxelGrid::new(1024, 1024, 64);
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for id in 0..occupants {
        let coord = VoxelCoord::new(
            rng.gen_range(0..1024),
            rng.gen_range(0..1024),
            rng.gen_range(0..64),
        );
        grid.set_entity(coord, EntityId(id)).expect("in bounds");
    }
    grid
}

fn bench_region_queries(c: &mut Criterion) {
    let grid = sparse_grid(4_000);

    // Huge box, few occupants: must stay cheap.
    let huge = GridBounds::new(VoxelCoord::new(0, 0, 0), VoxelCoord::new(1023, 1023, 63));
    c.bench_function("region_query_full_world", |b| {
        b.iter(|| black_box(grid.entities_in_region(black_box(&huge))));
    });

    // Perception-sized window.
    let window = GridBounds::around(VoxelCoord::new(512, 512, 32), 8, 2);
    c.bench_function("region_query_perception_window", |b| {
        b.iter(|| black_box(grid.entities_in_region(black_box(&window))));
    });
}

criterion_group!(benches, bench_region_queries);
criterion_main!(benches);
