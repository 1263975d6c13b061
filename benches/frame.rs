//! Frame throughput: how fast the pipeline advances a generated world.

use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use armada::game::mapgen::{SolarSystemGenerator, WorldGenerator};
use armada::game::moves::{Move, MoveQueue};
use armada::game::{FrameProcessor, GameConstants, World};

fn generated_world(players: u8) -> World {
    let constants = GameConstants::default();
    SolarSystemGenerator::for_constants(&constants)
        .generate(240, 160, 42, players)
        .map(|g| g.world)
        .unwrap_or_else(|e| panic!("bench map: {e}"))
}

/// Every ship thrusts toward the map centre.
fn converge(world: &World) -> MoveQueue {
    let center = world.center();
    let mut queue = MoveQueue::new();
    for ship in world.ships.values() {
        queue.entry(ship.owner()).or_default().push(Move::Thrust {
            ship: ship.id,
            magnitude: GameConstants::default().max_speed,
            angle_degrees: (center - ship.position).heading_degrees(),
        });
    }
    queue
}

fn bench_frames(c: &mut Criterion) {
    for players in [2u8, 4] {
        let world = generated_world(players);
        c.bench_function(&format!("frame_{players}p_converging"), |b| {
            b.iter_batched(
                || FrameProcessor::new(world.clone(), GameConstants::default(), 300),
                |mut processor| {
                    for _ in 0..50 {
                        let moves = converge(processor.world());
                        processor.process_frame(moves, &BTreeSet::new());
                    }
                    black_box(processor.world().compute_hash())
                },
                BatchSize::SmallInput,
            )
        });
    }

    let world = generated_world(4);
    c.bench_function("world_hash", |b| b.iter(|| black_box(world.compute_hash())));
}

criterion_group!(benches, bench_frames);
criterion_main!(benches);
