//! Agent grounding against CPU height fields.

use glam::Vec3;

use meadow::agent::{Agent, AgentInput, CapsuleShape, KinematicBody, MotionConfig, MotionState, PlaneBody};
use meadow::terrain::{
    generate_cpu, HeightField, HeightFieldSampler, HeightResolution, ReadbackStatus, TerrainFootprint, TerrainParams,
};

const DT: f32 = 1.0 / 60.0;

fn agent_at(spawn: Vec3, footprint: TerrainFootprint, plane: Option<f32>) -> Agent<PlaneBody, ()> {
    let shape = CapsuleShape::default();
    let body = PlaneBody::new(spawn, shape.feet_offset(), plane);
    Agent::new(body, shape, MotionConfig::default(), footprint)
}

fn feet(agent: &Agent<PlaneBody, ()>) -> f32 {
    agent.position().y - CapsuleShape::default().feet_offset()
}

fn idle() -> AgentInput {
    AgentInput::default()
}

#[test]
fn test_falls_and_lands_on_generated_terrain() {
    let field = generate_cpu(&TerrainParams::default(), HeightResolution::R64);
    let footprint = TerrainFootprint::default();
    let mut agent = agent_at(Vec3::new(500.0, 120.0, 500.0), footprint, None);
    let mut ground: HeightFieldSampler<()> = HeightFieldSampler::new(footprint, 1.0);

    let mut landed_at = None;
    for tick in 0..600 {
        if agent.tick(&idle(), DT, Some(&field)) == MotionState::Grounded {
            landed_at = Some(tick);
            break;
        }
    }
    assert!(landed_at.is_some(), "agent never landed");

    let surface = ground.sample(agent.position(), Some(&field));
    assert!((feet(&agent) - surface).abs() < 1e-3);
    assert_eq!(agent.sampler().status(), ReadbackStatus::Ready);
    assert_eq!(agent.sampler().allocations(), 1);
}

#[test]
fn test_walking_never_sinks_below_surface() {
    let field = generate_cpu(&TerrainParams::default(), HeightResolution::R128);
    let footprint = TerrainFootprint::default();
    let mut agent = agent_at(Vec3::new(100.0, 110.0, 100.0), footprint, None);
    let mut ground: HeightFieldSampler<()> = HeightFieldSampler::new(footprint, 1.0);

    let inputs = [
        AgentInput { forward: 1.0, ..Default::default() },
        AgentInput { horizontal: 1.0, ..Default::default() },
        AgentInput { horizontal: -1.0, forward: -1.0, ..Default::default() },
    ];

    for input in inputs {
        for _ in 0..400 {
            agent.tick(&input, DT, Some(&field));
            let surface = ground.sample(agent.position(), Some(&field));
            assert!(
                feet(&agent) >= surface - 1e-3,
                "feet {} under surface {} at {:?}",
                feet(&agent),
                surface,
                agent.position()
            );
        }
    }
}

#[test]
fn test_jump_leaves_and_returns_to_surface() {
    let field = HeightField::filled(16, 16, 0.5);
    let footprint = TerrainFootprint::default();
    let mut agent = agent_at(Vec3::new(500.0, 51.0, 500.0), footprint, None);

    // Pivot sits 1.0 above the 50.0 surface; the first tick lands it
    assert_eq!(agent.tick(&idle(), DT, Some(&field)), MotionState::Grounded);

    let jump = AgentInput { jump: true, ..Default::default() };
    assert_eq!(agent.tick(&jump, DT, Some(&field)), MotionState::Airborne);

    let mut peak: f32 = feet(&agent);
    let mut ticks = 0;
    while agent.tick(&idle(), DT, Some(&field)) == MotionState::Airborne {
        peak = peak.max(feet(&agent));
        ticks += 1;
        assert!(ticks < 300, "jump never came down");
    }

    let apex = peak - 50.0;
    assert!(apex > 2.5 && apex < 3.5, "apex {}", apex);
    assert!((feet(&agent) - 50.0).abs() < 1e-3);
}

#[test]
fn test_unbound_field_uses_body_collision() {
    let footprint = TerrainFootprint::default();
    let mut agent = agent_at(Vec3::new(10.0, 5.0, 10.0), footprint, Some(0.0));

    let mut state = MotionState::Airborne;
    for _ in 0..240 {
        state = agent.tick::<HeightField>(&idle(), DT, None);
        if state == MotionState::Grounded {
            break;
        }
    }
    assert_eq!(state, MotionState::Grounded);
    assert!(agent.body().is_grounded());
    assert!((feet(&agent) - 0.0).abs() < 1e-4);
    assert_eq!(agent.sampler().status(), ReadbackStatus::Unbound);
    assert_eq!(agent.sampler().allocations(), 0);
}

#[test]
fn test_unbound_without_collision_keeps_falling() {
    let mut agent = agent_at(Vec3::new(0.0, 50.0, 0.0), TerrainFootprint::default(), None);

    let mut last = agent.position().y;
    let mut last_velocity = 0.0;
    for _ in 0..30 {
        assert_eq!(agent.tick::<HeightField>(&idle(), DT, None), MotionState::Airborne);
        let velocity = agent.controller().vertical_velocity();
        assert!(agent.position().y < last);
        assert!(velocity < last_velocity);
        last = agent.position().y;
        last_velocity = velocity;
    }
}

#[test]
fn test_field_bound_mid_flight_takes_over() {
    let field = HeightField::filled(8, 8, 0.2);
    let footprint = TerrainFootprint::default();
    let mut agent = agent_at(Vec3::new(500.0, 40.0, 500.0), footprint, None);

    for _ in 0..10 {
        agent.tick::<HeightField>(&idle(), DT, None);
    }
    assert_eq!(agent.sampler().status(), ReadbackStatus::Unbound);

    let mut state = MotionState::Airborne;
    for _ in 0..300 {
        state = agent.tick(&idle(), DT, Some(&field));
        if state == MotionState::Grounded {
            break;
        }
    }
    assert_eq!(state, MotionState::Grounded);
    assert!((feet(&agent) - 20.0).abs() < 1e-3);
}

#[test]
fn test_outside_footprint_samples_edge_texels() {
    let field = HeightField::from_fn(4, 4, |x, y| (x + 4 * y) as f32 / 15.0);
    let footprint = TerrainFootprint {
        origin: Vec3::new(0.0, 0.0, 0.0),
        world_size: Vec3::new(40.0, 30.0, 40.0),
    };
    let mut sampler: HeightFieldSampler<()> = HeightFieldSampler::new(footprint, 1.0);

    let corner = sampler.sample(Vec3::new(-100.0, 0.0, -100.0), Some(&field));
    assert_eq!(corner, sampler.sample(Vec3::ZERO, Some(&field)));

    let far = sampler.sample(Vec3::new(1e6, 0.0, 1e6), Some(&field));
    assert!((far - 30.0).abs() < 1e-5);

    // Past the +X edge on the first row
    let edge = sampler.sample(Vec3::new(90.0, 0.0, 0.0), Some(&field));
    assert!((edge - 3.0 / 15.0 * 30.0).abs() < 1e-5);
}

#[test]
fn test_agent_clamps_at_footprint_edge() {
    let field = HeightField::from_fn(8, 8, |x, _| x as f32 / 7.0);
    let footprint = TerrainFootprint {
        origin: Vec3::ZERO,
        world_size: Vec3::new(16.0, 10.0, 16.0),
    };
    let mut agent = agent_at(Vec3::new(15.0, 20.0, 8.0), footprint, None);

    let mut state = MotionState::Airborne;
    for _ in 0..300 {
        state = agent.tick(&idle(), DT, Some(&field));
        if state == MotionState::Grounded {
            break;
        }
    }
    assert_eq!(state, MotionState::Grounded);

    // Walk out past +X; the last column holds the agent up
    agent.look_mut().set_orientation(-std::f32::consts::FRAC_PI_2, 0.0);
    let walk = AgentInput { forward: 1.0, ..Default::default() };
    for _ in 0..120 {
        agent.tick(&walk, DT, Some(&field));
    }
    assert!(agent.position().x > 16.0);
    assert!((feet(&agent) - 10.0).abs() < 1e-3);
}

#[test]
fn test_gpu_height_field_readback() {
    let Some((device, queue)) = meadow::render::context::headless_device() else {
        return;
    };
    let footprint = TerrainFootprint::default();
    let mut generator = meadow::terrain::TerrainHeightGenerator::new(&device, &TerrainParams::default());
    let field = generator.generate(&device, &queue, HeightResolution::R32);
    let source = field.source(&device, &queue);

    let mut sampler: HeightFieldSampler<wgpu::Buffer> = HeightFieldSampler::new(footprint, 1.0);
    let mut heights = Vec::new();
    for p in [Vec3::ZERO, Vec3::new(500.0, 0.0, 500.0), Vec3::new(-20.0, 0.0, 2000.0)] {
        let h = sampler.try_sample(p, Some(&source));
        let h = h.expect("readback failed");
        assert!((0.0..=footprint.world_size.y).contains(&h), "height {}", h);
        heights.push(h);
    }
    assert_eq!(sampler.status(), ReadbackStatus::Ready);
    assert_eq!(sampler.allocations(), 1);

    // Same texel twice reads the same value
    assert_eq!(sampler.try_sample(Vec3::new(500.0, 0.0, 500.0), Some(&source)), Some(heights[1]));
}
