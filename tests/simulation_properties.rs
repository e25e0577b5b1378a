//! Whole-frame properties of the simulation, driven through the public API.

use celestial::prelude::*;
use celestial::universe::BLUEPRINTS;
use celestial::{Effect, EffectCategory, EffectKind, Life, MutatorSet};

const BOUNDS: Vec2 = Vec2::new(400.0, 300.0);

fn config(particles: usize) -> CanvasConfig {
    CanvasConfig {
        width: BOUNDS.x,
        height: BOUNDS.y,
        particle_count: Some(particles),
        ..CanvasConfig::default()
    }
}

fn bare(friction: f32, mutators: &[Mutator]) -> UniverseProfile {
    UniverseProfile {
        friction,
        mutators: mutators.iter().copied().collect::<MutatorSet>(),
        ..UniverseProfile::default()
    }
}

fn dot(pos: Vec2, vel: Vec2) -> Particle {
    Particle::new(pos, vel, 2.0, Vec3::ONE, Species::Dust, 0.0)
}

/// Circle the centre, hold left now and then and click right occasionally.
fn scripted(frame: u64) -> FrameInput {
    let angle = frame as f32 * 0.05;
    FrameInput {
        cursor: BOUNDS * 0.5 + Vec2::new(angle.cos(), angle.sin()) * 90.0,
        left: frame % 50 < 20,
        right: frame % 70 == 35,
    }
}

type Fingerprint = Vec<([u32; 2], [u32; 2], u32, u32, [bool; 4])>;

fn fingerprint(sim: &SimulationContext) -> Fingerprint {
    sim.particles()
        .iter()
        .map(|(_, p)| {
            (
                [p.pos.x.to_bits(), p.pos.y.to_bits()],
                [p.vel.x.to_bits(), p.vel.y.to_bits()],
                p.radius.to_bits(),
                p.opacity.to_bits(),
                [p.infected, p.crystalized, p.entangled, p.coral],
            )
        })
        .collect()
}

#[test]
fn same_seed_and_inputs_replay_identically() {
    for blueprint in BLUEPRINTS.iter().take(8) {
        let profile = UniverseProfile::from_blueprint(blueprint.name).unwrap();
        let mut a = SimulationContext::new(config(120), profile.clone(), Seed(99)).unwrap();
        let mut b = SimulationContext::new(config(120), profile, Seed(99)).unwrap();

        for frame in 0..240 {
            let ra = a.step(scripted(frame));
            let rb = b.step(scripted(frame));
            assert_eq!(ra, rb, "{} diverged at frame {frame}", blueprint.name);
        }
        assert_eq!(fingerprint(&a), fingerprint(&b), "{}", blueprint.name);
        assert_eq!(a.effects().len(), b.effects().len());
    }
}

#[test]
fn different_seeds_diverge() {
    let profile = UniverseProfile::from_blueprint(BLUEPRINTS[0].name).unwrap();
    let a = SimulationContext::new(config(30), profile.clone(), Seed(1)).unwrap();
    let b = SimulationContext::new(config(30), profile, Seed(2)).unwrap();
    assert_ne!(fingerprint(&a), fingerprint(&b));
}

#[test]
fn friction_scales_velocity_geometrically() {
    let mut sim = SimulationContext::new(config(0), bare(0.9, &[]), Seed(3)).unwrap();
    let id = sim.particles_mut().spawn(dot(BOUNDS * 0.5, Vec2::new(2.0, -1.0)));

    for _ in 0..12 {
        sim.step(FrameInput::idle(Vec2::ZERO));
    }
    let p = sim.particles().get(id).unwrap();
    let expected = Vec2::new(2.0, -1.0) * 0.9f32.powi(12);
    assert!((p.vel - expected).length() < 1e-5, "{:?} vs {expected:?}", p.vel);
}

#[test]
fn torus_wins_over_event_horizon() {
    let both = bare(1.0, &[Mutator::EventHorizon, Mutator::TorusField]);
    let mut sim = SimulationContext::new(config(0), both, Seed(4)).unwrap();
    let id = sim.particles_mut().spawn(dot(Vec2::new(395.0, 150.0), Vec2::new(10.0, 0.0)));
    sim.step(FrameInput::idle(Vec2::ZERO));

    let p = sim.particles().get(id).expect("wrapped, not removed");
    assert!((p.pos.x - 5.0).abs() < 1e-3);
}

#[test]
fn event_horizon_removes_leavers() {
    let mut sim = SimulationContext::new(config(0), bare(1.0, &[Mutator::EventHorizon]), Seed(5)).unwrap();
    let leaver = sim.particles_mut().spawn(dot(Vec2::new(395.0, 150.0), Vec2::new(10.0, 0.0)));
    let stayer = sim.particles_mut().spawn(dot(Vec2::new(200.0, 150.0), Vec2::new(1.0, 0.0)));

    let report = sim.step(FrameInput::idle(Vec2::ZERO));
    assert_eq!(report.removed, 1);
    assert!(sim.particles().get(leaver).is_none());
    assert!(sim.particles().get(stayer).is_some());
}

#[test]
fn fading_countdown_only_decreases_opacity() {
    let mut sim = SimulationContext::new(config(0), bare(1.0, &[]), Seed(6)).unwrap();
    let mut p = dot(BOUNDS * 0.5, Vec2::ZERO);
    p.start_fading(30);
    let id = sim.particles_mut().spawn(p);

    let mut last = 1.0;
    let mut frames = 0;
    while let Some(p) = sim.particles().get(id) {
        assert!(p.opacity < last || frames == 0);
        last = p.opacity;
        sim.step(FrameInput::idle(Vec2::ZERO));
        frames += 1;
        assert!(frames <= 30, "fade never finished");
    }
}

#[test]
fn gravity_well_click_toggles() {
    let profile = UniverseProfile {
        left: Some(Power::Discrete(DiscretePower::GravityWell)),
        ..bare(0.98, &[])
    };
    let mut sim = SimulationContext::new(config(10), profile, Seed(7)).unwrap();
    let at = Vec2::new(120.0, 80.0);
    let click = |sim: &mut SimulationContext| {
        sim.step(FrameInput { cursor: at, left: true, right: false });
        sim.step(FrameInput::idle(at));
    };

    click(&mut sim);
    assert_eq!(sim.effects().count(EffectCategory::GravityWells), 1);
    click(&mut sim);
    assert_eq!(sim.effects().count(EffectCategory::GravityWells), 0);
    click(&mut sim);
    assert_eq!(sim.effects().count(EffectCategory::GravityWells), 1);
}

#[test]
fn comet_pull_follows_cursor_offset() {
    let profile = UniverseProfile {
        left: Some(Power::Continuous(ContinuousPower::Comet)),
        ..bare(1.0, &[])
    };
    let mut sim = SimulationContext::new(config(0), profile, Seed(8)).unwrap();
    let id = sim.particles_mut().spawn(dot(Vec2::new(100.0, 150.0), Vec2::ZERO));
    let cursor = Vec2::new(180.0, 150.0);

    let (mut x, mut v) = (100.0f32, 0.0f32);
    for _ in 0..15 {
        sim.step(FrameInput { cursor, left: true, right: false });
        v += (cursor.x - x) * 0.01;
        x += v;
    }
    let p = sim.particles().get(id).unwrap();
    assert!((p.vel.x - v).abs() < 1e-3);
    assert!((p.pos.x - x).abs() < 1e-2);
    assert!(p.pos.y == 150.0);
}

#[test]
fn held_input_triggers_at_frame_one_hundred() {
    let mut sim = SimulationContext::new(config(20), bare(0.98, &[]), Seed(9)).unwrap();
    let held = FrameInput { cursor: BOUNDS * 0.5, left: false, right: true };

    let mut triggered_at = None;
    for _ in 0..150 {
        let report = sim.step(held);
        if report.event == EnergyEvent::Triggered {
            triggered_at = Some(report.frame);
            break;
        }
    }
    assert_eq!(triggered_at, Some(100));
}

#[test]
fn reseeding_cataclysm_restores_population() {
    let profile = UniverseProfile {
        cataclysm: Some(Cataclysm::Supernova),
        ..bare(0.98, &[])
    };
    let mut sim = SimulationContext::new(config(40), profile, Seed(10)).unwrap();
    let held = FrameInput { cursor: BOUNDS * 0.5, left: true, right: false };
    for _ in 0..100 {
        sim.step(held);
    }
    assert!(sim.cataclysm().is_some());

    for _ in 0..Cataclysm::Supernova.duration() {
        sim.step(FrameInput::idle(BOUNDS * 0.5));
    }
    assert!(sim.cataclysm().is_none());
    assert_eq!(sim.energy().state(), Stability::Stable);
    assert_eq!(sim.particles().len(), 40);
}

#[test]
fn coral_never_anchors_to_a_particle_removed_this_frame() {
    let mut sim = SimulationContext::new(config(0), bare(1.0, &[Mutator::Coral]), Seed(11)).unwrap();
    let hole = Vec2::new(100.0, 100.0);
    sim.effects_mut()
        .push(Effect::new(hole, 2.0, Life::Permanent, EffectKind::NegativeSpace));

    let mut reef = dot(hole, Vec2::ZERO);
    reef.coral = true;
    let reef = sim.particles_mut().spawn(reef);
    let mut drifter = dot(hole + Vec2::new(5.0, 0.0), Vec2::ZERO);
    drifter.radius = 1.5;
    let drifter = sim.particles_mut().spawn(drifter);

    sim.step(FrameInput::idle(Vec2::ZERO));
    assert!(sim.particles().get(reef).is_none());
    let p = sim.particles().get(drifter).expect("outside the negative space");
    assert!(!p.coral);
    assert_eq!(p.coral_anchor, None);
}

#[test]
fn entangle_skips_a_partner_removed_this_frame() {
    let profile = UniverseProfile {
        left: Some(Power::Continuous(ContinuousPower::Entangle)),
        ..bare(1.0, &[])
    };
    let mut sim = SimulationContext::new(config(0), profile, Seed(12)).unwrap();
    let hole = Vec2::new(100.0, 100.0);
    sim.effects_mut()
        .push(Effect::new(hole, 2.0, Life::Permanent, EffectKind::NegativeSpace));

    let doomed = sim.particles_mut().spawn(dot(hole, Vec2::ZERO));
    let seeker = sim.particles_mut().spawn(dot(hole + Vec2::new(5.0, 0.0), Vec2::ZERO));
    let far = sim.particles_mut().spawn(dot(hole + Vec2::new(40.0, 0.0), Vec2::ZERO));

    let cursor = hole + Vec2::new(5.0, 0.0);
    sim.step(FrameInput { cursor, left: true, right: false });
    assert!(sim.particles().get(doomed).is_none());
    let p = sim.particles().get(seeker).unwrap();
    assert_eq!(p.bond, Some(far));
    assert!(p.entangled);
}
