//! The per-particle force accumulator.
//!
//! One call to [`update_particle`] runs the whole pipeline for one particle
//! for one frame, possibly several times over (sub-steps) when the particle
//! sits inside time-dilation zones. Each sub-step applies, in this order:
//!
//! 1. veto checks (phased, stasis)
//! 2. countdowns: unravelling, then fading, then consumed
//! 3. velocity freeze for pinned particles
//! 4. anomaly field laws (never vetoed)
//! 5. mutators and relation forces (skipped when phased)
//! 6. continuous powers and gravity wells (skipped when vetoed, pinned or
//!    entangled)
//! 7. radius relaxation
//! 8. friction, integration and the boundary policy, then the radius floor
//!
//! Neighbour and relation look-ups go through [`StepEnv`], which reads the
//! frame [`Snapshot`] and knows which particles were already removed this
//! pass. The accumulator never touches the particle collection itself.

use crate::anomalies::apply_anomalies;
use crate::effects::{EffectCategory, EffectKind, EffectRegistry};
use crate::input::FrameInput;
use crate::mutators::{apply_mutators, Boundary, Mutator};
use crate::particle::{Particle, ParticleId};
use crate::powers::{apply_continuous, Power};
use crate::seed::SimRng;
use crate::snapshot::{ParticleView, Snapshot};
use crate::universe::UniverseProfile;
use glam::Vec2;
use rand::Rng;
use slotmap::SecondaryMap;

/// Per-frame radius decay of an unravelling particle.
const UNRAVEL_SHRINK: f32 = 0.95;
/// Radius given back per sub-step while relaxing toward the initial radius.
const RELAX_STEP: f32 = 0.05;

/// Bond rest length in units of the two radii.
const BOND_REST: f32 = 3.0;
const BOND_STIFFNESS: f32 = 0.002;
/// Slack before a chain link starts pulling.
const CHAIN_SLACK: f32 = 12.0;
const CHAIN_PULL: f32 = 0.01;
const CHAIN_DRAG: f32 = 0.05;
const ENTANGLE_MIRROR: f32 = 0.5;

/// Outcome of a sub-step or a field law.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Fate {
    Alive,
    Removed,
}

/// Everything the accumulator reads during one particle pass.
pub(crate) struct StepEnv<'a> {
    pub effects: &'a EffectRegistry,
    pub profile: &'a UniverseProfile,
    pub snapshot: &'a Snapshot,
    pub input: FrameInput,
    /// Canvas size in pixels.
    pub bounds: Vec2,
    pub frame: u64,
    pub max_substeps: u32,
    pub rng: &'a mut SimRng,
    /// Entangle requests made this pass as `(target, initiator)`.
    pub links: Vec<(ParticleId, ParticleId)>,
    removed: SecondaryMap<ParticleId, ()>,
}

impl<'a> StepEnv<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        effects: &'a EffectRegistry,
        profile: &'a UniverseProfile,
        snapshot: &'a Snapshot,
        input: FrameInput,
        bounds: Vec2,
        frame: u64,
        max_substeps: u32,
        rng: &'a mut SimRng,
    ) -> Self {
        Self {
            effects,
            profile,
            snapshot,
            input,
            bounds,
            frame,
            max_substeps: max_substeps.max(1),
            rng,
            links: Vec::new(),
            removed: SecondaryMap::new(),
        }
    }

    /// Record that `id` was removed earlier in this pass.
    pub fn mark_removed(&mut self, id: ParticleId) {
        self.removed.insert(id, ());
    }

    /// Whether `id` was live at the start of the pass and has not been
    /// removed since.
    pub fn is_live(&self, id: ParticleId) -> bool {
        !self.removed.contains_key(id) && self.snapshot.get(id).is_some()
    }

    /// Live snapshot views within `radius` of `pos`, excluding `skip`.
    pub fn neighbours(
        &self,
        pos: Vec2,
        radius: f32,
        skip: ParticleId,
    ) -> impl Iterator<Item = &'a ParticleView> + '_ {
        let removed = &self.removed;
        self.snapshot
            .neighbours(pos, radius, skip)
            .filter(move |v| !removed.contains_key(v.id))
    }

    /// Every snapshot view not removed earlier in this pass.
    pub fn live_views(&self) -> impl Iterator<Item = &'a ParticleView> + '_ {
        let removed = &self.removed;
        self.snapshot.iter().filter(move |v| !removed.contains_key(v.id))
    }

    /// Snapshot view of a related particle, if it is still live.
    pub fn partner(&self, id: ParticleId) -> Option<&'a ParticleView> {
        if self.removed.contains_key(id) {
            return None;
        }
        self.snapshot.get(id)
    }

    fn any_inside(&self, category: EffectCategory, pos: Vec2) -> bool {
        self.effects.iter(category).any(|e| e.contains(pos))
    }
}

/// Product of the factors of every time-dilation zone containing `pos`.
pub(crate) fn dilation_factor(effects: &EffectRegistry, pos: Vec2) -> f32 {
    effects
        .iter(EffectCategory::TimeDilationZones)
        .filter(|e| e.contains(pos))
        .map(|e| match e.kind {
            EffectKind::TimeDilation { factor } => factor.max(0.0),
            _ => 1.0,
        })
        .product()
}

/// Number of sub-steps a dilation factor grants this frame.
///
/// Fast zones run `floor(factor)` sub-steps, capped at `max`. Slow zones run
/// a single sub-step with probability `factor`.
pub(crate) fn substeps(factor: f32, max: u32, rng: &mut SimRng) -> u32 {
    if factor > 1.0 {
        (factor.floor() as u32).clamp(1, max.max(1))
    } else if factor < 1.0 {
        u32::from(rng.gen::<f32>() < factor)
    } else {
        1
    }
}

/// Run one frame of the pipeline for a single particle.
pub(crate) fn update_particle(p: &mut Particle, id: ParticleId, env: &mut StepEnv<'_>) -> Fate {
    let factor = dilation_factor(env.effects, p.pos);
    let steps = substeps(factor, env.max_substeps, env.rng);
    for _ in 0..steps {
        if substep(p, id, env) == Fate::Removed {
            return Fate::Removed;
        }
    }
    Fate::Alive
}

fn substep(p: &mut Particle, id: ParticleId, env: &mut StepEnv<'_>) -> Fate {
    p.age += 1;
    let profile = env.profile;

    let phased = profile.mutators.contains(Mutator::QuantumPhase)
        || env.any_inside(EffectCategory::PhaseZones, p.pos);
    let stasis = env.any_inside(EffectCategory::StasisFields, p.pos);

    if run_countdowns(p) == Fate::Removed {
        return Fate::Removed;
    }

    if p.crystalized || stasis || p.coral {
        p.vel = Vec2::ZERO;
    }

    if apply_anomalies(p, env) == Fate::Removed {
        return Fate::Removed;
    }

    if !phased {
        apply_mutators(p, id, env);
        apply_relations(p, env);
    }

    if !(phased || stasis || p.crystalized || p.entangled) {
        let input = env.input;
        for (held, power) in [(input.left, profile.left), (input.right, profile.right)] {
            if let (true, Some(Power::Continuous(power))) = (held, power) {
                apply_continuous(power, p, id, input.cursor, env);
            }
        }
        for well in env.effects.iter(EffectCategory::GravityWells) {
            if let EffectKind::GravityWell { strength } = well.kind {
                p.vel += (well.pos - p.pos) * strength;
            }
        }
    }

    if p.radius > p.initial_radius && !profile.mutators.contains(Mutator::Pulsing) {
        p.radius = (p.radius - RELAX_STEP).max(p.initial_radius);
    }

    p.vel *= profile.friction;
    p.pos += p.vel;

    match profile.mutators.boundary() {
        Boundary::Torus => {
            p.pos = Vec2::new(
                p.pos.x.rem_euclid(env.bounds.x),
                p.pos.y.rem_euclid(env.bounds.y),
            );
        }
        Boundary::EventHorizon => {
            let outside = p.pos.x < 0.0
                || p.pos.y < 0.0
                || p.pos.x > env.bounds.x
                || p.pos.y > env.bounds.y;
            if outside {
                return Fate::Removed;
            }
        }
        Boundary::Open => {}
    }

    if p.below_floor() {
        return Fate::Removed;
    }
    Fate::Alive
}

/// Advance removal countdowns. The first countdown to finish wins.
fn run_countdowns(p: &mut Particle) -> Fate {
    if p.unravelling > 0 {
        p.set_radius(p.radius * UNRAVEL_SHRINK);
        p.unravelling -= 1;
        if p.unravelling == 0 {
            return Fate::Removed;
        }
    }
    if p.fading > 0 {
        p.set_opacity(p.opacity - p.opacity / p.fading as f32);
        p.fading -= 1;
        if p.opacity <= 0.0 || p.fading == 0 {
            return Fate::Removed;
        }
    }
    if p.consumed > 0 {
        p.set_radius(p.radius - p.radius / p.consumed as f32);
        p.consumed -= 1;
        if p.consumed == 0 {
            return Fate::Removed;
        }
    }
    Fate::Alive
}

/// Bond springs, chain following and entangled mirroring.
fn apply_relations(p: &mut Particle, env: &StepEnv<'_>) {
    if let Some(partner) = p.bond.and_then(|b| env.partner(b)) {
        if p.entangled {
            p.vel = p.vel.lerp(-partner.vel, ENTANGLE_MIRROR);
        } else {
            let d = partner.pos - p.pos;
            let dist = d.length();
            if dist > 1e-4 {
                let rest = BOND_REST * (p.radius + partner.radius);
                p.vel += d / dist * (dist - rest) * BOND_STIFFNESS;
            }
        }
    }

    if let Some(parent) = p.chain_parent.and_then(|c| env.partner(c)) {
        let d = parent.pos - p.pos;
        let dist = d.length();
        if dist > CHAIN_SLACK {
            p.vel += d / dist * (dist - CHAIN_SLACK) * CHAIN_PULL;
        }
        p.vel = p.vel.lerp(parent.vel, CHAIN_DRAG);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{Effect, Life};
    use crate::mutators::MutatorSet;
    use crate::particle::{Particles, Species};
    use crate::powers::ContinuousPower;
    use crate::seed::Seed;
    use glam::Vec3;

    const BOUNDS: Vec2 = Vec2::new(400.0, 300.0);

    fn dot(pos: Vec2, vel: Vec2) -> Particle {
        Particle::new(pos, vel, 3.0, Vec3::ONE, Species::Orb, 0.25)
    }

    fn profile(friction: f32, mutators: &[Mutator]) -> UniverseProfile {
        UniverseProfile {
            friction,
            mutators: mutators.iter().copied().collect::<MutatorSet>(),
            ..UniverseProfile::default()
        }
    }

    /// Run `frames` frames of a lone particle and return it, or `None` once
    /// removed.
    fn run(
        mut p: Particle,
        profile: &UniverseProfile,
        effects: &EffectRegistry,
        input: FrameInput,
        frames: u64,
    ) -> Option<Particle> {
        let mut particles = Particles::new(4);
        let id = particles.spawn(p.clone());
        let snapshot = Snapshot::capture(&particles);
        let mut rng = Seed(3).rng();
        for frame in 0..frames {
            let mut env = StepEnv::new(effects, profile, &snapshot, input, BOUNDS, frame, 4, &mut rng);
            if update_particle(&mut p, id, &mut env) == Fate::Removed {
                return None;
            }
        }
        Some(p)
    }

    #[test]
    fn test_substep_counts() {
        let mut rng = Seed(1).rng();
        assert_eq!(substeps(1.0, 4, &mut rng), 1);
        assert_eq!(substeps(2.7, 4, &mut rng), 2);
        assert_eq!(substeps(50.0, 4, &mut rng), 4);
        assert_eq!(substeps(0.0, 4, &mut rng), 0);
        let ran: u32 = (0..1000).map(|_| substeps(0.5, 4, &mut rng)).sum();
        assert!((400..600).contains(&ran), "ran {ran}");
    }

    #[test]
    fn test_dilation_factors_multiply() {
        let mut effects = EffectRegistry::new();
        for factor in [2.0, 1.5] {
            effects.push(Effect::new(
                Vec2::ZERO,
                50.0,
                Life::Permanent,
                EffectKind::TimeDilation { factor },
            ));
        }
        assert_eq!(dilation_factor(&effects, Vec2::new(10.0, 0.0)), 3.0);
        assert_eq!(dilation_factor(&effects, Vec2::new(100.0, 0.0)), 1.0);
    }

    #[test]
    fn test_friction_decays_speed() {
        let profile = profile(0.9, &[]);
        let effects = EffectRegistry::new();
        let p = run(
            dot(Vec2::new(200.0, 150.0), Vec2::new(2.0, 0.0)),
            &profile,
            &effects,
            FrameInput::default(),
            10,
        )
        .unwrap();
        let expected = 2.0 * 0.9f32.powi(10);
        assert!((p.vel.length() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_torus_wraps_and_event_horizon_removes() {
        let effects = EffectRegistry::new();
        let start = dot(Vec2::new(398.0, 150.0), Vec2::new(5.0, 0.0));

        let torus = profile(1.0, &[Mutator::TorusField]);
        let p = run(start.clone(), &torus, &effects, FrameInput::default(), 1).unwrap();
        assert!((p.pos.x - 3.0).abs() < 1e-4);

        let horizon = profile(1.0, &[Mutator::EventHorizon]);
        assert!(run(start.clone(), &horizon, &effects, FrameInput::default(), 1).is_none());

        // Both present: the torus wins.
        let both = profile(1.0, &[Mutator::EventHorizon, Mutator::TorusField]);
        assert!(run(start, &both, &effects, FrameInput::default(), 1).is_some());
    }

    #[test]
    fn test_fading_is_monotonic_until_removal() {
        let profile = profile(0.98, &[Mutator::Flicker]);
        let effects = EffectRegistry::new();
        let mut p = dot(Vec2::new(100.0, 100.0), Vec2::ZERO);
        p.start_fading(20);

        let mut particles = Particles::new(4);
        let id = particles.spawn(p.clone());
        let snapshot = Snapshot::capture(&particles);
        let mut rng = Seed(9).rng();
        let mut last = p.opacity;
        let mut frames = 0;
        loop {
            let mut env = StepEnv::new(&effects, &profile, &snapshot, FrameInput::default(), BOUNDS, frames, 4, &mut rng);
            if update_particle(&mut p, id, &mut env) == Fate::Removed {
                break;
            }
            assert!(p.opacity <= last);
            last = p.opacity;
            frames += 1;
            assert!(frames < 100, "never removed");
        }
        assert_eq!(frames, 19);
    }

    #[test]
    fn test_comet_recurrence() {
        let profile = UniverseProfile {
            left: Some(Power::Continuous(ContinuousPower::Comet)),
            ..profile(1.0, &[])
        };
        let effects = EffectRegistry::new();
        let cursor = Vec2::new(150.0, 100.0);
        let input = FrameInput {
            cursor,
            left: true,
            right: false,
        };
        let mut p = dot(Vec2::new(100.0, 100.0), Vec2::ZERO);

        let mut particles = Particles::new(4);
        let id = particles.spawn(p.clone());
        let snapshot = Snapshot::capture(&particles);
        let mut rng = Seed(4).rng();

        let (mut x, mut v) = (100.0f32, 0.0f32);
        for frame in 0..10 {
            let mut env = StepEnv::new(&effects, &profile, &snapshot, input, BOUNDS, frame, 4, &mut rng);
            assert_eq!(update_particle(&mut p, id, &mut env), Fate::Alive);
            v += (cursor.x - x) * 0.01;
            x += v;
            assert!((p.vel.x - v).abs() < 1e-4, "step {frame}: {} vs {v}", p.vel.x);
            assert!((p.pos.x - x).abs() < 1e-3);
        }
    }

    #[test]
    fn test_stasis_blocks_powers_but_not_anomalies() {
        let profile = UniverseProfile {
            left: Some(Power::Continuous(ContinuousPower::Attract)),
            ..profile(1.0, &[])
        };
        let mut effects = EffectRegistry::new();
        effects.push(Effect::new(Vec2::new(100.0, 100.0), 50.0, Life::Permanent, EffectKind::StasisField));
        let input = FrameInput {
            cursor: Vec2::new(200.0, 100.0),
            left: true,
            right: false,
        };
        let p = run(dot(Vec2::new(100.0, 100.0), Vec2::new(1.0, 0.0)), &profile, &effects, input, 3).unwrap();
        assert_eq!(p.vel, Vec2::ZERO);
        assert_eq!(p.pos, Vec2::new(100.0, 100.0));

        effects.push(Effect::new(Vec2::new(100.0, 100.0), 60.0, Life::Shrinking { rate: 0.05 }, EffectKind::NegativeSpace));
        assert!(run(dot(Vec2::new(100.0, 100.0), Vec2::ZERO), &profile, &effects, input, 1).is_none());
    }

    #[test]
    fn test_radius_relaxes_to_initial() {
        let profile = profile(1.0, &[]);
        let effects = EffectRegistry::new();
        let mut p = dot(Vec2::new(50.0, 50.0), Vec2::ZERO);
        p.radius = 3.12;
        let p = run(p, &profile, &effects, FrameInput::default(), 5).unwrap();
        assert_eq!(p.radius, p.initial_radius);
    }

    #[test]
    fn test_relations_ignore_removed_partners() {
        let profile = profile(1.0, &[]);
        let effects = EffectRegistry::new();
        let mut particles = Particles::new(4);
        let a = particles.spawn(dot(Vec2::new(0.0, 0.0), Vec2::ZERO));
        let b = particles.spawn(dot(Vec2::new(100.0, 0.0), Vec2::ZERO));
        let snapshot = Snapshot::capture(&particles);
        let mut rng = Seed(5).rng();

        let mut p = particles.get(a).unwrap().clone();
        p.chain_parent = Some(b);
        let mut env = StepEnv::new(&effects, &profile, &snapshot, FrameInput::default(), BOUNDS, 0, 4, &mut rng);
        let mut pulled = p.clone();
        apply_relations(&mut pulled, &env);
        assert!(pulled.vel.x > 0.0);

        env.mark_removed(b);
        assert!(!env.is_live(b));
        let mut untouched = p.clone();
        apply_relations(&mut untouched, &env);
        assert_eq!(untouched.vel, Vec2::ZERO);
    }

    #[test]
    fn test_neighbour_scans_skip_removed() {
        let profile = profile(1.0, &[Mutator::Coral, Mutator::Gravitational]);
        let effects = EffectRegistry::new();
        let mut particles = Particles::new(4);
        let mut reef = dot(Vec2::new(100.0, 100.0), Vec2::ZERO);
        reef.coral = true;
        let a = particles.spawn(reef);
        let b = particles.spawn(dot(Vec2::new(105.0, 100.0), Vec2::ZERO));
        let snapshot = Snapshot::capture(&particles);
        let mut rng = Seed(6).rng();
        let p = particles.get(b).unwrap().clone();

        let mut env = StepEnv::new(&effects, &profile, &snapshot, FrameInput::default(), BOUNDS, 0, 4, &mut rng);
        let mut grown = p.clone();
        apply_mutators(&mut grown, b, &mut env);
        assert!(grown.coral);
        assert_eq!(grown.coral_anchor, Some(a));

        env.mark_removed(a);
        assert_eq!(env.neighbours(p.pos, 50.0, b).count(), 0);
        assert_eq!(env.live_views().count(), 1);
        let mut loose = p.clone();
        apply_mutators(&mut loose, b, &mut env);
        assert!(!loose.coral);
        assert_eq!(loose.coral_anchor, None);
        assert_eq!(loose.vel, Vec2::ZERO);
    }

    /// Step a dying particle under Pulsing and a held Grow power, recording
    /// its radius after every frame it survives.
    fn shrink_trace(p: Particle, limit: u64) -> (Vec<f32>, Particle) {
        let profile = UniverseProfile {
            left: Some(Power::Continuous(ContinuousPower::Grow)),
            ..profile(1.0, &[Mutator::Pulsing])
        };
        let effects = EffectRegistry::new();
        let input = FrameInput {
            cursor: p.pos,
            left: true,
            right: false,
        };
        let mut p = p;
        let mut particles = Particles::new(4);
        let id = particles.spawn(p.clone());
        let snapshot = Snapshot::capture(&particles);
        let mut rng = Seed(7).rng();

        let mut radii = vec![p.radius];
        for frame in 0..limit {
            let mut env = StepEnv::new(&effects, &profile, &snapshot, input, BOUNDS, frame, 4, &mut rng);
            if update_particle(&mut p, id, &mut env) == Fate::Removed {
                return (radii, p);
            }
            radii.push(p.radius);
        }
        panic!("still alive after {limit} frames");
    }

    #[test]
    fn test_consumed_only_shrinks_until_removal() {
        let mut p = dot(Vec2::new(100.0, 100.0), Vec2::ZERO);
        p.start_consumed(4);
        let (radii, last) = shrink_trace(p, 20);

        // 3.0 -> 2.25 -> 1.5 -> 0.75, removed on the fourth frame.
        assert_eq!(radii.len(), 4);
        assert!(radii.windows(2).all(|w| w[1] < w[0]), "{radii:?}");
        assert!((radii[3] - 0.75).abs() < 1e-5);
        assert_eq!(last.consumed, 0);
    }

    #[test]
    fn test_unravelling_only_shrinks_until_removal() {
        let mut p = dot(Vec2::new(100.0, 100.0), Vec2::ZERO);
        p.start_unravelling(5);
        let (radii, last) = shrink_trace(p, 20);

        assert_eq!(radii.len(), 5);
        assert!(radii.windows(2).all(|w| w[1] < w[0]), "{radii:?}");
        assert!((radii[4] - 3.0 * 0.95f32.powi(4)).abs() < 1e-5);
        assert_eq!(last.unravelling, 0);
        assert!(!last.below_floor());
    }

    #[test]
    fn test_countdowns_resolve_in_order() {
        // Unravelling finishes first and stops the pass before fading ticks.
        let mut p = dot(Vec2::new(100.0, 100.0), Vec2::ZERO);
        p.start_unravelling(2);
        p.start_fading(2);
        assert_eq!(run_countdowns(&mut p), Fate::Alive);
        assert_eq!((p.unravelling, p.fading), (1, 1));
        assert_eq!(run_countdowns(&mut p), Fate::Removed);
        assert_eq!((p.unravelling, p.fading), (0, 1));

        // Fading ends before consumed would, and consumed still ticks alongside.
        let mut p = dot(Vec2::new(100.0, 100.0), Vec2::ZERO);
        p.start_fading(3);
        p.start_consumed(10);
        let (radii, last) = shrink_trace(p, 20);
        assert_eq!(radii.len(), 3);
        assert!(radii.windows(2).all(|w| w[1] < w[0]), "{radii:?}");
        assert_eq!(last.fading, 0);
        assert_eq!(last.consumed, 8);

        // A running countdown is never restarted.
        let mut p = dot(Vec2::new(100.0, 100.0), Vec2::ZERO);
        p.start_consumed(4);
        run_countdowns(&mut p);
        p.start_consumed(30);
        assert_eq!(p.consumed, 3);
    }
}
