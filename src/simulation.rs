//! The simulation context and the per-frame step.
//!
//! [`SimulationContext`] owns everything a universe needs: the particle
//! arena, the effect registry, the energy state, the running cataclysm and
//! the single RNG stream. One call to [`SimulationContext::step`] advances
//! one frame; the renderer only ever reads the result.
//!
//! ```ignore
//! let profile = UniverseProfile::from_seed(seed);
//! let mut sim = SimulationContext::new(CanvasConfig::default(), profile, seed)?;
//! loop {
//!     let report = sim.step(input.frame_input(canvas));
//!     renderer.draw(sim.particles(), sim.effects(), sim.profile());
//! }
//! ```

use crate::accumulator::{update_particle, Fate, StepEnv};
use crate::anomalies::{emit_spawns, place_effect};
use crate::cataclysm::{Cataclysm, CataclysmSequence};
use crate::config::CanvasConfig;
use crate::effects::EffectRegistry;
use crate::energy::{EnergyEvent, EnergyState, Stability};
use crate::error::ConfigError;
use crate::input::FrameInput;
use crate::mutators::{Boundary, Mutator};
use crate::particle::{ParticleId, Particles};
use crate::powers::{apply_discrete, DiscreteCtx, Power};
use crate::seed::{Seed, SimRng};
use crate::snapshot::Snapshot;
use crate::spawn::SpawnContext;
use crate::universe::UniverseProfile;
use glam::Vec2;
use rand::Rng;
use tracing::{debug, info};

/// Particles seeded as coral when the Coral mutator is active.
const CORAL_SEEDS: usize = 3;
/// Top speed of freshly seeded particles.
const SEED_SPEED: f32 = 0.5;

/// Summary of one frame, for logging and the headless driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    /// Live particles after the frame.
    pub particles: usize,
    /// Live effects after the frame.
    pub effects: usize,
    pub energy: f32,
    pub stability: Stability,
    pub event: EnergyEvent,
    /// The cataclysm in progress, if any.
    pub cataclysm: Option<Cataclysm>,
    /// Particles compacted away this frame.
    pub removed: usize,
    /// Particles emitted by anomaly spawners this frame.
    pub spawned: usize,
}

/// One running universe.
pub struct SimulationContext {
    config: CanvasConfig,
    profile: UniverseProfile,
    seed: Seed,
    rng: SimRng,
    particles: Particles,
    effects: EffectRegistry,
    energy: EnergyState,
    cataclysm: Option<CataclysmSequence>,
    last_input: FrameInput,
    frame: u64,
}

impl SimulationContext {
    /// Create a universe and seed its population and initial anomalies.
    pub fn new(config: CanvasConfig, profile: UniverseProfile, seed: Seed) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut sim = Self {
            particles: Particles::new(config.particle_cap),
            energy: EnergyState::new(config.energy),
            rng: seed.derive("simulation"),
            effects: EffectRegistry::new(),
            cataclysm: None,
            last_input: FrameInput::default(),
            frame: 0,
            config,
            profile,
            seed,
        };
        sim.seed_population();
        sim.seed_anomalies();
        info!(
            universe = %sim.profile.name,
            seed = %seed,
            particles = sim.particles.len(),
            effects = sim.effects.len(),
            "universe created"
        );
        Ok(sim)
    }

    /// Advance one frame.
    pub fn step(&mut self, input: FrameInput) -> FrameReport {
        self.frame += 1;
        let bounds = self.bounds();

        if let Some(sequence) = self.cataclysm.as_mut() {
            let kind = sequence.kind();
            let finished = sequence.advance(&mut self.particles, &mut self.effects, &mut self.rng, bounds);
            self.effects.tick();
            let removed = self.particles.compact();
            self.last_input = input;
            if finished {
                self.cataclysm = None;
                self.complete_cataclysm(kind);
            }
            return self.report(EnergyEvent::None, removed, 0);
        }

        let event = self.energy.update(input.any_held());
        let mut reset_after = false;
        if event == EnergyEvent::Triggered {
            match self.profile.cataclysm {
                Some(kind) => {
                    info!(cataclysm = kind.name(), frame = self.frame, "cataclysm triggered");
                    self.cataclysm = Some(CataclysmSequence::new(kind));
                }
                None => {
                    info!(frame = self.frame, "energy threshold reached, resetting anomalies");
                    reset_after = true;
                }
            }
        }

        self.fire_discrete_powers(input, bounds);
        self.run_periodic_events(bounds);

        let links = self.particle_pass(input, bounds);
        self.commit_links(links);

        let born = {
            let mut spawner = SpawnContext::new(
                &mut self.rng,
                self.profile.aesthetic.palette,
                &self.profile.aesthetic.shapes,
                bounds,
            );
            emit_spawns(&mut self.effects, &mut spawner)
        };
        let spawned = born.len();
        for particle in born {
            self.particles.spawn(particle);
        }

        let removed = self.particles.compact();
        self.effects.tick();
        if self.profile.mutators.boundary() == Boundary::Open {
            self.recycle_strays(bounds);
        }
        self.last_input = input;

        let report = self.report(event, removed, spawned);
        if reset_after {
            self.reset_anomalies();
        }
        report
    }

    // ========== Accessors ==========

    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    /// Mutable particle access for tools and tests. The step never holds
    /// a reference across frames, so edits take effect on the next step.
    pub fn particles_mut(&mut self) -> &mut Particles {
        &mut self.particles
    }

    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectRegistry {
        &mut self.effects
    }

    pub fn profile(&self) -> &UniverseProfile {
        &self.profile
    }

    pub fn energy(&self) -> &EnergyState {
        &self.energy
    }

    /// The cataclysm in progress, if any.
    pub fn cataclysm(&self) -> Option<&CataclysmSequence> {
        self.cataclysm.as_ref()
    }

    /// Frames stepped so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn seed(&self) -> Seed {
        self.seed
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Canvas size in pixels.
    pub fn bounds(&self) -> Vec2 {
        Vec2::new(self.config.width, self.config.height)
    }

    /// Change the canvas size. Particles keep their positions.
    pub fn resize(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.config.width = width;
            self.config.height = height;
        }
    }

    // ========== Frame phases ==========

    fn fire_discrete_powers(&mut self, input: FrameInput, bounds: Vec2) {
        let edges = [
            (input.left && !self.last_input.left, self.profile.left),
            (input.right && !self.last_input.right, self.profile.right),
        ];
        for (clicked, binding) in edges {
            if let (true, Some(Power::Discrete(power))) = (clicked, binding) {
                let mut ctx = DiscreteCtx {
                    particles: &mut self.particles,
                    effects: &mut self.effects,
                    rng: &mut self.rng,
                    profile: &self.profile,
                    bounds,
                };
                apply_discrete(power, input.cursor, &mut ctx);
            }
        }
    }

    fn run_periodic_events(&mut self, bounds: Vec2) {
        for event in &self.profile.periodic_events {
            if event.interval == 0 || self.frame % u64::from(event.interval) != 0 {
                continue;
            }
            if self.rng.gen::<f32>() >= event.chance {
                continue;
            }
            let pos = random_canvas_point(&mut self.rng, bounds);
            let effect = place_effect(event.category, pos, &mut self.rng, self.profile.aesthetic.palette, bounds);
            debug!(category = event.category.name(), x = pos.x, y = pos.y, "periodic anomaly");
            self.effects.push(effect);
        }
    }

    /// Run the accumulator over every live particle in insertion order.
    ///
    /// Returns the entangle requests made during the pass.
    fn particle_pass(&mut self, input: FrameInput, bounds: Vec2) -> Vec<(ParticleId, ParticleId)> {
        let snapshot = Snapshot::capture(&self.particles);
        let mut env = StepEnv::new(
            &self.effects,
            &self.profile,
            &snapshot,
            input,
            bounds,
            self.frame,
            self.config.max_substeps,
            &mut self.rng,
        );

        for id in self.particles.ids() {
            let Some(p) = self.particles.get_mut(id) else {
                continue;
            };
            if update_particle(p, id, &mut env) == Fate::Removed {
                self.particles.remove(id);
                env.mark_removed(id);
            }
        }
        std::mem::take(&mut env.links)
    }

    /// Pair entangled particles with the targets they picked.
    ///
    /// A target that was removed or bonded elsewhere during the pass
    /// refuses the link and the initiator is released.
    fn commit_links(&mut self, links: Vec<(ParticleId, ParticleId)>) {
        for (target, initiator) in links {
            let accepts = self
                .particles
                .get(target)
                .is_some_and(|t| t.bond.is_none() || t.bond == Some(initiator));
            if accepts {
                if let Some(t) = self.particles.get_mut(target) {
                    t.bond = Some(initiator);
                    t.entangled = true;
                }
            } else if let Some(p) = self.particles.get_mut(initiator) {
                if p.bond == Some(target) {
                    p.bond = None;
                    p.entangled = false;
                }
            }
        }
    }

    /// Without a boundary mutator, particles that drift far off the canvas
    /// come back at a random point.
    fn recycle_strays(&mut self, bounds: Vec2) {
        let margin = self.config.recycle_margin;
        for id in self.particles.ids() {
            let Some(p) = self.particles.get_mut(id) else {
                continue;
            };
            let stray = p.pos.x < -margin
                || p.pos.y < -margin
                || p.pos.x > bounds.x + margin
                || p.pos.y > bounds.y + margin;
            if stray {
                p.pos = random_canvas_point(&mut self.rng, bounds);
                p.history.clear();
            }
        }
    }

    // ========== Seeding and resets ==========

    fn seed_population(&mut self) {
        let count = self
            .config
            .particle_count
            .unwrap_or(self.profile.particle_count)
            .min(self.particles.cap());
        let bounds = self.bounds();
        let mut spawner = SpawnContext::new(
            &mut self.rng,
            self.profile.aesthetic.palette,
            &self.profile.aesthetic.shapes,
            bounds,
        );
        let coral = self.profile.mutators.contains(Mutator::Coral);
        for i in 0..count {
            let pos = spawner.random_on_canvas();
            let vel = spawner.random_velocity(SEED_SPEED);
            let mut particle = spawner.particle(pos, vel);
            if coral && i < CORAL_SEEDS {
                particle.coral = true;
                particle.vel = Vec2::ZERO;
            }
            self.particles.spawn(particle);
        }
    }

    fn seed_anomalies(&mut self) {
        let bounds = self.bounds();
        for seed in &self.profile.initial_anomalies {
            for _ in 0..seed.count {
                let pos = random_canvas_point(&mut self.rng, bounds);
                let effect = place_effect(seed.category, pos, &mut self.rng, self.profile.aesthetic.palette, bounds);
                self.effects.push(effect);
            }
        }
    }

    /// Clear the registry, calm the energy and place the initial anomalies
    /// again. The population is kept.
    fn reset_anomalies(&mut self) {
        self.effects.reset();
        self.energy.reset();
        self.seed_anomalies();
    }

    fn complete_cataclysm(&mut self, kind: Cataclysm) {
        self.reset_anomalies();
        if kind.reseeds() {
            self.particles.clear();
            self.seed_population();
        }
        info!(
            cataclysm = kind.name(),
            frame = self.frame,
            particles = self.particles.len(),
            "cataclysm complete"
        );
    }

    fn report(&self, event: EnergyEvent, removed: usize, spawned: usize) -> FrameReport {
        FrameReport {
            frame: self.frame,
            particles: self.particles.len(),
            effects: self.effects.len(),
            energy: self.energy.energy(),
            stability: self.energy.state(),
            event,
            cataclysm: self.cataclysm.as_ref().map(CataclysmSequence::kind),
            removed,
            spawned,
        }
    }
}

fn random_canvas_point(rng: &mut SimRng, bounds: Vec2) -> Vec2 {
    Vec2::new(
        rng.gen_range(0.0..bounds.x.max(1.0)),
        rng.gen_range(0.0..bounds.y.max(1.0)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectCategory;
    use crate::powers::{ContinuousPower, DiscretePower};
    use crate::universe::{AnomalySeed, PeriodicEvent};

    fn config() -> CanvasConfig {
        CanvasConfig {
            width: 400.0,
            height: 300.0,
            particle_count: Some(50),
            ..CanvasConfig::default()
        }
    }

    fn held(cursor: Vec2) -> FrameInput {
        FrameInput {
            cursor,
            left: true,
            right: false,
        }
    }

    #[test]
    fn test_seeds_population_and_anomalies() {
        let profile = UniverseProfile {
            initial_anomalies: vec![AnomalySeed {
                category: EffectCategory::Nebulas,
                count: 2,
            }],
            ..UniverseProfile::default()
        };
        let sim = SimulationContext::new(config(), profile, Seed(1)).unwrap();
        assert_eq!(sim.particles().len(), 50);
        assert_eq!(sim.effects().count(EffectCategory::Nebulas), 2);
    }

    #[test]
    fn test_coral_mutator_seeds_coral() {
        let profile = UniverseProfile {
            mutators: [Mutator::Coral].into_iter().collect(),
            ..UniverseProfile::default()
        };
        let sim = SimulationContext::new(config(), profile, Seed(1)).unwrap();
        let coral = sim.particles().iter().filter(|(_, p)| p.coral).count();
        assert_eq!(coral, CORAL_SEEDS);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let bad = CanvasConfig {
            particle_cap: 0,
            ..CanvasConfig::default()
        };
        assert!(SimulationContext::new(bad, UniverseProfile::default(), Seed(1)).is_err());
    }

    #[test]
    fn test_discrete_power_fires_on_click_edge_only() {
        let profile = UniverseProfile {
            left: Some(Power::Discrete(DiscretePower::GravityWell)),
            ..UniverseProfile::default()
        };
        let mut sim = SimulationContext::new(config(), profile, Seed(2)).unwrap();
        let at = Vec2::new(100.0, 100.0);
        sim.step(held(at));
        sim.step(held(at));
        sim.step(held(at));
        assert_eq!(sim.effects().count(EffectCategory::GravityWells), 1);

        sim.step(FrameInput::idle(at));
        sim.step(held(at));
        assert_eq!(sim.effects().count(EffectCategory::GravityWells), 0);
    }

    #[test]
    fn test_cataclysm_runs_and_resets() {
        let profile = UniverseProfile {
            left: Some(Power::Continuous(ContinuousPower::Calm)),
            cataclysm: Some(Cataclysm::Inversion),
            ..UniverseProfile::default()
        };
        let mut sim = SimulationContext::new(config(), profile, Seed(3)).unwrap();
        let cursor = Vec2::new(200.0, 150.0);
        for _ in 0..99 {
            assert_eq!(sim.step(held(cursor)).stability, Stability::Stable);
        }
        let report = sim.step(held(cursor));
        assert_eq!(report.event, EnergyEvent::Triggered);
        assert_eq!(report.stability, Stability::Unstable);
        assert_eq!(report.cataclysm, Some(Cataclysm::Inversion));

        for _ in 0..Cataclysm::Inversion.duration() {
            sim.step(FrameInput::idle(cursor));
        }
        assert!(sim.cataclysm().is_none());
        assert_eq!(sim.energy().state(), Stability::Stable);
        assert_eq!(sim.energy().energy(), 0.0);
        // Inversion keeps the population.
        assert_eq!(sim.particles().len(), 50);
    }

    #[test]
    fn test_threshold_without_cataclysm_resets_next_frame() {
        let mut sim = SimulationContext::new(config(), UniverseProfile::default(), Seed(4)).unwrap();
        let cursor = Vec2::new(10.0, 10.0);
        for _ in 0..99 {
            sim.step(held(cursor));
        }
        let report = sim.step(held(cursor));
        assert_eq!(report.event, EnergyEvent::Triggered);
        assert_eq!(report.stability, Stability::Unstable);
        assert_eq!(sim.energy().state(), Stability::Stable);
        assert!(sim.cataclysm().is_none());
    }

    #[test]
    fn test_periodic_event_with_certain_chance() {
        let profile = UniverseProfile {
            periodic_events: vec![PeriodicEvent {
                category: EffectCategory::Stars,
                interval: 10,
                chance: 1.0,
            }],
            ..UniverseProfile::default()
        };
        let mut sim = SimulationContext::new(config(), profile, Seed(5)).unwrap();
        for _ in 0..25 {
            sim.step(FrameInput::default());
        }
        assert_eq!(sim.effects().count(EffectCategory::Stars), 2);
    }

    #[test]
    fn test_strays_are_recycled_without_boundary() {
        let mut sim = SimulationContext::new(config(), UniverseProfile::default(), Seed(6)).unwrap();
        let id = sim.particles().ids()[0];
        if let Some(p) = sim.particles_mut().get_mut(id) {
            p.pos = Vec2::new(-5000.0, 0.0);
            p.vel = Vec2::ZERO;
        }
        sim.step(FrameInput::default());
        let p = sim.particles().get(id).unwrap();
        assert!(p.pos.x >= 0.0 && p.pos.x < 400.0);
    }
}
