use std::sync::atomic::AtomicBool;

use bevy_sph_fluid::cpu::kernels::w_poly6;
use bevy_sph_fluid::{SimConfig, SphError, SphPipeline};
use glam::{UVec3, Vec3};

// no gravity, no pressure, no viscosity
fn inert_config(counts: UVec3) -> SimConfig {
    SimConfig {
        spawn_counts: counts,
        spawn_jitter: 0.0,
        gravity: Vec3::ZERO,
        gas_constant: 0.0,
        viscosity: 0.0,
        seed: Some(1),
        ..Default::default()
    }
}

#[test]
fn one_tick_of_free_fall() {
    let config = SimConfig {
        spawn_counts: UVec3::new(2, 2, 2),
        spawn_point: Vec3::ZERO,
        particle_radius: 0.1,
        spawn_jitter: 0.0,
        gravity: Vec3::new(0.0, -9.8, 0.0),
        gas_constant: 0.0,
        viscosity: 0.0,
        box_size: Vec3::new(4.0, 10.0, 3.0),
        ..Default::default()
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    assert_eq!(sph.particles().len(), 8);

    sph.tick(0.007).unwrap();

    let half = sph.params().half_extents;
    assert_eq!(half, Vec3::new(2.0, 5.0, 1.5));
    for p in sph.particles() {
        assert!((p.velocity.y - (-0.0686)).abs() < 1e-6, "vy = {}", p.velocity.y);
        assert_eq!(p.velocity.x, 0.0);
        assert_eq!(p.velocity.z, 0.0);
        assert!(p.position.abs().cmplt(half).all());
    }
}

#[test]
fn zero_forces_is_pure_drift() {
    let mut sph = SphPipeline::initialize(&inert_config(UVec3::new(3, 3, 3))).unwrap();
    let dt = sph.params().dt;

    for (i, p) in sph.store_mut().particles_mut().iter_mut().enumerate() {
        p.velocity = Vec3::new(0.1, -0.05, 0.02) * (i as f32 % 3.0);
    }
    let mut expected: Vec<_> = sph.particles().iter().map(|p| (p.position, p.velocity)).collect();

    for _ in 0..25 {
        sph.step();
        for (e, p) in expected.iter_mut().zip(sph.particles()) {
            e.0 += e.1 * dt;
            assert_eq!(p.velocity, e.1);
            assert_eq!(p.position, e.0);
            assert_eq!(p.force, Vec3::ZERO);
        }
    }
}

#[test]
fn density_ignores_pairs_at_or_beyond_h() {
    // two particles exactly h apart
    let config = SimConfig {
        smoothing_radius: 0.4,
        particle_radius: 0.2,
        ..inert_config(UVec3::new(2, 1, 1))
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    sph.step();

    let params = *sph.params();
    let peak = params.mass * w_poly6(0.0, &params);
    assert_eq!(peak, params.mass * params.poly6_coeff * params.h2 * params.h2 * params.h2);
    for p in sph.particles() {
        assert_eq!(p.density, peak);
    }

    // closer than h: the neighbour adds to the density
    let config = SimConfig { smoothing_radius: 0.5, ..config };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    sph.step();
    let params = *sph.params();
    let peak = params.mass * w_poly6(0.0, &params);
    for p in sph.particles() {
        assert!(p.density > peak);
    }
}

#[test]
fn pressure_follows_equation_of_state() {
    let config = SimConfig {
        gas_constant: 3.0,
        resting_density: 2.0,
        seed: Some(9),
        spawn_counts: UVec3::new(3, 3, 3),
        ..Default::default()
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    sph.step();
    for p in sph.particles() {
        let expected = 3.0 * (p.density - 2.0);
        assert!((p.pressure - expected).abs() <= 1e-5 * expected.abs().max(1.0));
    }
}

#[test]
fn pressure_pushes_a_pair_apart_symmetrically() {
    let config = SimConfig {
        particle_radius: 0.2,
        gas_constant: 2.0,
        resting_density: 0.0,
        ..inert_config(UVec3::new(2, 1, 1))
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    let gap_before = sph.particles()[1].position.x - sph.particles()[0].position.x;
    sph.step();

    let [a, b] = [sph.particles()[0], sph.particles()[1]];
    assert!(a.pressure > 0.0 && b.pressure > 0.0);
    // a sits at -x of b, so repulsion pushes it further to -x
    assert!(a.force.x < 0.0 && b.force.x > 0.0);
    assert!((a.force.x + b.force.x).abs() <= 1e-5 * a.force.x.abs());
    assert_eq!(a.force.y, 0.0);
    assert_eq!(a.force.z, 0.0);
    assert!(b.position.x - a.position.x > gap_before);
}

#[test]
fn viscosity_damps_relative_velocity() {
    let config = SimConfig {
        particle_radius: 0.2,
        viscosity: 1.0,
        ..inert_config(UVec3::new(2, 1, 1))
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    {
        let particles = sph.store_mut().particles_mut();
        particles[0].velocity = Vec3::new(0.0, 1.0, 0.0);
        particles[1].velocity = Vec3::new(0.0, -1.0, 0.0);
    }
    sph.step();

    let [a, b] = [sph.particles()[0], sph.particles()[1]];
    let relative = a.velocity.y - b.velocity.y;
    assert!(relative < 2.0 && relative > 0.0, "relative vy = {relative}");
    assert!(a.force.y < 0.0 && b.force.y > 0.0);
}

#[test]
fn stale_force_is_overwritten_every_tick() {
    let config = SimConfig {
        spawn_counts: UVec3::new(3, 3, 3),
        seed: Some(21),
        ..Default::default()
    };
    let mut clean = SphPipeline::initialize(&config).unwrap();
    let mut planted = SphPipeline::initialize(&config).unwrap();
    for p in planted.store_mut().particles_mut() {
        p.force = Vec3::splat(1e6);
    }

    clean.step();
    planted.step();
    assert_eq!(planted.particles(), clean.particles());
    for p in planted.particles() {
        assert_ne!(p.force, Vec3::splat(1e6));
    }
}

#[test]
fn particle_count_never_changes_and_box_contains_everything() {
    let config = SimConfig {
        spawn_counts: UVec3::new(6, 6, 6),
        spawn_point: Vec3::new(-1.5, 0.0, -1.0),
        smoothing_radius: 0.25,
        box_size: Vec3::new(2.0, 2.0, 2.0),
        seed: Some(11),
        ..Default::default()
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();

    for _ in 0..60 {
        sph.step();
        assert_eq!(sph.particles().len(), 216);
        let half = sph.params().half_extents;
        for p in sph.particles() {
            assert!(p.position.is_finite());
            assert!(p.position.cmple(half).all() && p.position.cmpge(-half).all(), "{:?}", p.position);
        }
    }
}

#[test]
fn boundary_bounce_is_damped_and_clamped() {
    let config = SimConfig {
        box_size: Vec3::splat(2.0),
        boundary_damping: -0.3,
        timestep: 0.01,
        ..inert_config(UVec3::ONE)
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    {
        let p = &mut sph.store_mut().particles_mut()[0];
        p.position = Vec3::new(0.99, 0.0, 0.0);
        p.velocity = Vec3::new(2.0, 0.0, 0.0);
    }
    sph.step();

    let p = sph.particles()[0];
    assert_eq!(p.position.x, 1.0);
    assert!((p.velocity.x - (-0.6)).abs() < 1e-6);
}

#[test]
fn bounce_on_several_axes_in_one_tick() {
    let config = SimConfig {
        box_size: Vec3::splat(2.0),
        boundary_damping: -0.5,
        timestep: 0.01,
        ..inert_config(UVec3::ONE)
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    {
        let p = &mut sph.store_mut().particles_mut()[0];
        p.position = Vec3::new(0.99, -0.99, 0.99);
        p.velocity = Vec3::new(2.0, -2.0, 2.0);
    }
    sph.step();

    let p = sph.particles()[0];
    assert_eq!(p.position, Vec3::new(1.0, -1.0, 1.0));
    assert_eq!(p.velocity, Vec3::new(-1.0, 1.0, -1.0));
}

#[test]
fn replay_with_same_seed_is_identical() {
    let config = SimConfig {
        spawn_counts: UVec3::new(5, 5, 5),
        smoothing_radius: 0.3,
        seed: Some(1234),
        ..Default::default()
    };
    let mut a = SphPipeline::initialize(&config).unwrap();
    let mut b = SphPipeline::initialize(&config).unwrap();
    for _ in 0..20 {
        a.step();
        b.step();
    }
    assert_eq!(a.particles(), b.particles());
    assert_eq!(a.last_stats(), b.last_stats());
}

#[test]
fn tiny_density_is_floored() {
    let config = SimConfig {
        particle_mass: 1e-30,
        spawn_counts: UVec3::new(2, 1, 1),
        seed: Some(5),
        ..Default::default()
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    let stats = sph.tick(0.01).unwrap();
    assert_eq!(stats.recovered, 0);
    for p in sph.particles() {
        assert!(p.velocity.is_finite() && p.position.is_finite());
        assert!((p.velocity.y - (-9.81 * 0.01)).abs() < 1e-4, "vy = {}", p.velocity.y);
    }
}

#[test]
fn broken_particle_is_recovered_without_touching_the_rest() {
    let config = SimConfig {
        spawn_counts: UVec3::new(3, 3, 1),
        seed: Some(2),
        ..Default::default()
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    let start = sph.particles()[4].position;
    sph.store_mut().particles_mut()[4].velocity = Vec3::splat(f32::NAN);

    let stats = sph.step();
    assert_eq!(stats.recovered, 1);
    let broken = sph.particles()[4];
    assert_eq!(broken.velocity, Vec3::ZERO);
    assert_eq!(broken.position, start);
    for p in sph.particles() {
        assert!(p.velocity.is_finite() && p.position.is_finite());
    }
}

#[test]
fn invalid_config_fails_before_any_tick() {
    let cases = [
        ("smoothing_radius", SimConfig { smoothing_radius: 0.0, ..Default::default() }),
        ("timestep", SimConfig { timestep: -0.01, ..Default::default() }),
        ("particle_mass", SimConfig { particle_mass: 0.0, ..Default::default() }),
        ("smoothing_radius", SimConfig { smoothing_radius: f32::NAN, ..Default::default() }),
        ("boundary_damping", SimConfig { boundary_damping: 0.5, ..Default::default() }),
        ("box_size.y", SimConfig { box_size: Vec3::new(1.0, 0.0, 1.0), ..Default::default() }),
        ("smoothing_radius", SimConfig { smoothing_radius: 1e-5, ..Default::default() }),
        ("spawn_point.y", SimConfig { spawn_point: Vec3::new(0.0, f32::NAN, 0.0), ..Default::default() }),
    ];
    for (field, config) in cases {
        match SphPipeline::initialize(&config) {
            Err(SphError::InvalidConfig { field: got, .. }) => assert_eq!(got, field),
            other => panic!("expected invalid `{field}`, got {other:?}"),
        }
    }
}

#[test]
fn capacity_is_checked_at_spawn() {
    let config = SimConfig { max_particles: 999, ..Default::default() };
    let err = SphPipeline::initialize(&config).unwrap_err();
    assert_eq!(err, SphError::Capacity { requested: 1000, limit: 999 });
}

#[test]
fn reconfigure_is_all_or_nothing() {
    let mut config = inert_config(UVec3::new(2, 2, 2));
    let mut sph = SphPipeline::initialize(&config).unwrap();
    let before = *sph.params();

    config.box_size = Vec3::new(6.0, 6.0, 6.0);
    config.timestep = 0.0;
    assert!(sph.reconfigure(&config).is_err());
    assert_eq!(*sph.params(), before);

    config.timestep = 0.002;
    sph.reconfigure(&config).unwrap();
    assert_eq!(sph.params().half_extents, Vec3::splat(3.0));
    assert_eq!(sph.params().dt, 0.002);

    assert!(sph.tick(0.0).is_err());
    assert_eq!(sph.tick_count(), 0);
}

#[test]
fn cancellation_only_between_ticks() {
    let mut sph = SphPipeline::initialize(&inert_config(UVec3::new(2, 2, 2))).unwrap();
    assert_eq!(sph.run_ticks(5, &AtomicBool::new(true)), 0);
    assert_eq!(sph.run_ticks(5, &AtomicBool::new(false)), 5);
    assert_eq!(sph.tick_count(), 5);
}

#[test]
fn renderer_views_share_the_store() {
    let config = SimConfig {
        spawn_counts: UVec3::new(2, 3, 4),
        view_radius: 0.2,
        blend_strength: 0.7,
        ..Default::default()
    };
    let mut sph = SphPipeline::initialize(&config).unwrap();
    sph.set_instance_mesh(bevy_sph_fluid::InstanceMesh { index_count: 36, first_index: 0, base_vertex: 0 });

    let view = sph.render_view();
    assert_eq!(view.particles.len(), 24);
    assert_eq!(view.draw_args.index_count, 36);
    assert_eq!(view.draw_args.instance_count, 24);
    assert_eq!(view.render_size, 8.0);

    let vol = sph.volumetric_view().gpu_params();
    assert_eq!(vol.num_particles, 24);
    assert_eq!(vol.sphere_radius, 0.2);
    assert_eq!(vol.blend_strength, 0.7);
}
