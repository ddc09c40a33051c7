use criterion::{criterion_group, criterion_main, Criterion, black_box};

use glam::Vec3;

use meadow::agent::{Agent, AgentInput, CapsuleShape, MotionConfig, PlaneBody};
use meadow::terrain::{generate_cpu, HeightFieldSampler, HeightResolution, TerrainFootprint, TerrainParams};
use meadow::vegetation::{build_indirect_args, GridLayout, MeshData};

fn bench_generate_cpu_256(c: &mut Criterion) {
    let params = TerrainParams::default();

    c.bench_function("generate_cpu_256", |b| {
        b.iter(|| generate_cpu(black_box(&params), HeightResolution::R256));
    });
}

fn bench_sampler_lookup(c: &mut Criterion) {
    let field = generate_cpu(&TerrainParams::default(), HeightResolution::R256);
    let mut sampler: HeightFieldSampler<()> = HeightFieldSampler::new(TerrainFootprint::default(), 1.0);

    c.bench_function("sampler_lookup", |b| {
        let mut x = 0.0f32;
        b.iter(|| {
            x = (x + 7.3) % 1000.0;
            black_box(sampler.sample(black_box(Vec3::new(x, 50.0, 1000.0 - x)), Some(&field)))
        });
    });
}

fn bench_agent_tick(c: &mut Criterion) {
    let field = generate_cpu(&TerrainParams::default(), HeightResolution::R256);
    let shape = CapsuleShape::default();
    let body = PlaneBody::new(Vec3::new(500.0, 120.0, 500.0), shape.feet_offset(), None);
    let mut agent: Agent<PlaneBody, ()> =
        Agent::new(body, shape, MotionConfig::default(), TerrainFootprint::default());
    let input = AgentInput { forward: 1.0, horizontal: 0.3, jump: false };

    c.bench_function("agent_tick", |b| {
        b.iter(|| black_box(agent.tick(black_box(&input), 1.0 / 60.0, Some(&field))));
    });
}

fn bench_grid_layout(c: &mut Criterion) {
    c.bench_function("grid_layout_1m", |b| {
        b.iter(|| GridLayout::new(black_box(1_000_000)));
    });
}

fn bench_indirect_args(c: &mut Criterion) {
    let mesh = MeshData::flower(6, 0.6, 0.12);
    let metadata = &mesh.metadata;

    c.bench_function("indirect_args_flower", |b| {
        b.iter(|| build_indirect_args(black_box(Some(metadata)), black_box(10_000), black_box(2)));
    });
}

criterion_group!(
    benches,
    bench_generate_cpu_256,
    bench_sampler_lookup,
    bench_agent_tick,
    bench_grid_layout,
    bench_indirect_args,
);
criterion_main!(benches);
