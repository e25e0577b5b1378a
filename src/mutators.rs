//! Profile-level mutators.
//!
//! A mutator is a toggle on the universe profile that alters how every
//! particle behaves for the lifetime of the universe. Most are small
//! per-particle perturbations; `Clustering`, `Repulsion`, `Gravitational`,
//! `Infectious` and `Coral` scan the frame snapshot for live neighbours.
//!
//! Three mutators have no per-particle rule of their own and are read
//! elsewhere in the pipeline:
//!
//! - `QuantumPhase` phases every particle (see the veto checks)
//! - `TorusField` and `EventHorizon` select the boundary policy

use crate::accumulator::StepEnv;
use crate::color::{desaturate, hsv_to_rgb};
use crate::particle::{Particle, ParticleId};
use crate::seed::{jitter, random_direction};
use glam::{Vec2, Vec3};
use rand::Rng;
use std::f32::consts::TAU;

/// Color infected particles drift toward.
const INFECTED_TINT: Vec3 = Vec3::new(0.45, 1.0, 0.3);

/// A named profile-level behavior toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mutator {
    /// Colors cycle through the hue wheel.
    Rainbow,
    /// Occasional random kicks.
    Erratic,
    /// Opacity twinkles.
    Flicker,
    /// Constant small velocity noise.
    Noisy,
    /// Weak pull toward the local centroid.
    Clustering,
    /// Short-range push apart.
    Repulsion,
    /// Every particle heads in the same direction, which rotates slowly.
    Synchronized,
    /// Radius oscillates around its initial value.
    Pulsing,
    /// Positions wrap at the canvas edges.
    TorusField,
    /// Particles leaving the canvas are removed.
    EventHorizon,
    /// Every particle is phased.
    QuantumPhase,
    /// Infection spreads between neighbours.
    Infectious,
    /// Particles touching coral become coral.
    Coral,
    /// Weak n-body attraction.
    Gravitational,
    /// Colors wash out and motion grows more disordered with age.
    Entropic,
}

impl Mutator {
    /// All mutators in catalog order.
    pub const ALL: [Mutator; 15] = [
        Mutator::Rainbow,
        Mutator::Erratic,
        Mutator::Flicker,
        Mutator::Noisy,
        Mutator::Clustering,
        Mutator::Repulsion,
        Mutator::Synchronized,
        Mutator::Pulsing,
        Mutator::TorusField,
        Mutator::EventHorizon,
        Mutator::QuantumPhase,
        Mutator::Infectious,
        Mutator::Coral,
        Mutator::Gravitational,
        Mutator::Entropic,
    ];

    /// Display name as used in profiles (`"Torus Field"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Mutator::Rainbow => "Rainbow",
            Mutator::Erratic => "Erratic",
            Mutator::Flicker => "Flicker",
            Mutator::Noisy => "Noisy",
            Mutator::Clustering => "Clustering",
            Mutator::Repulsion => "Repulsion",
            Mutator::Synchronized => "Synchronized",
            Mutator::Pulsing => "Pulsing",
            Mutator::TorusField => "Torus Field",
            Mutator::EventHorizon => "Event Horizon",
            Mutator::QuantumPhase => "Quantum Phase",
            Mutator::Infectious => "Infectious",
            Mutator::Coral => "Coral",
            Mutator::Gravitational => "Gravitational",
            Mutator::Entropic => "Entropic",
        }
    }

    /// Resolve a mutator name. Case, spaces, dashes and underscores are
    /// ignored, so `"Torus Field"`, `"torusField"` and `"torus_field"` all
    /// resolve.
    pub fn from_name(name: &str) -> Option<Self> {
        let key = normalize(name);
        Self::ALL.into_iter().find(|m| normalize(m.name()) == key)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Boundary policy selected by the mutator set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// No clamp. Far-off particles are recycled by population maintenance.
    Open,
    /// Wrap modulo canvas size.
    Torus,
    /// Remove on exit.
    EventHorizon,
}

/// The active mutators of a profile, deduplicated, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutatorSet {
    active: Vec<Mutator>,
}

impl MutatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mutator. Duplicates are ignored.
    pub fn insert(&mut self, mutator: Mutator) {
        if !self.active.contains(&mutator) {
            self.active.push(mutator);
        }
    }

    pub fn contains(&self, mutator: Mutator) -> bool {
        self.active.contains(&mutator)
    }

    pub fn iter(&self) -> impl Iterator<Item = Mutator> + '_ {
        self.active.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// The single boundary policy in force. `TorusField` takes precedence
    /// when both boundary mutators are present.
    pub fn boundary(&self) -> Boundary {
        if self.contains(Mutator::TorusField) {
            Boundary::Torus
        } else if self.contains(Mutator::EventHorizon) {
            Boundary::EventHorizon
        } else {
            Boundary::Open
        }
    }
}

impl FromIterator<Mutator> for MutatorSet {
    fn from_iter<I: IntoIterator<Item = Mutator>>(iter: I) -> Self {
        let mut set = MutatorSet::new();
        for m in iter {
            set.insert(m);
        }
        set
    }
}

/// Apply every active mutator's rule to one particle.
pub(crate) fn apply_mutators(p: &mut Particle, id: ParticleId, env: &mut StepEnv<'_>) {
    let frame = env.frame as f32;
    let profile = env.profile;
    for mutator in profile.mutators.iter() {
        match mutator {
            Mutator::Rainbow => {
                if !p.color_locked {
                    p.color = hsv_to_rgb(frame * 0.002 + p.seed, 0.7, 1.0);
                }
            }
            Mutator::Erratic => {
                if env.rng.gen::<f32>() < 0.02 {
                    p.vel += random_direction(env.rng, 1.5);
                }
            }
            Mutator::Flicker => {
                if !p.is_dying() {
                    let phase = frame * 0.15 + p.seed * TAU;
                    p.set_opacity(0.55 + 0.45 * phase.sin().abs());
                }
            }
            Mutator::Noisy => {
                p.vel += jitter(env.rng, 0.05);
            }
            Mutator::Clustering => {
                let mut sum = Vec2::ZERO;
                let mut count = 0u32;
                for other in env.neighbours(p.pos, 100.0, id) {
                    sum += other.pos;
                    count += 1;
                }
                if count > 0 {
                    let centroid = sum / count as f32;
                    p.vel += (centroid - p.pos) * 0.0005;
                }
            }
            Mutator::Repulsion => {
                const RANGE: f32 = 40.0;
                for other in env.neighbours(p.pos, RANGE, id) {
                    let away = p.pos - other.pos;
                    let dist = away.length();
                    if dist > 1e-3 {
                        p.vel += away / dist * 0.05 * (1.0 - dist / RANGE);
                    }
                }
            }
            Mutator::Synchronized => {
                let speed = p.vel.length();
                if speed > 1e-4 {
                    let angle = frame * 0.01;
                    p.vel = Vec2::new(angle.cos(), angle.sin()) * speed;
                }
            }
            Mutator::Pulsing => {
                if !p.is_dying() {
                    let phase = frame * 0.05 + p.seed * TAU;
                    p.set_radius(p.initial_radius * (1.0 + 0.3 * phase.sin()));
                }
            }
            Mutator::Infectious => {
                if !p.infected {
                    let exposed = env.neighbours(p.pos, 25.0, id).any(|o| o.infected);
                    if exposed && env.rng.gen::<f32>() < 0.05 {
                        p.infected = true;
                    }
                }
            }
            Mutator::Coral => {
                if !p.coral {
                    let reach = p.radius + 2.0;
                    let anchor = env
                        .neighbours(p.pos, reach + 8.0, id)
                        .find(|o| o.coral && o.pos.distance(p.pos) <= reach + o.radius);
                    if let Some(anchor) = anchor {
                        p.coral = true;
                        p.coral_anchor = Some(anchor.id);
                        p.vel = Vec2::ZERO;
                    }
                }
            }
            Mutator::Gravitational => {
                let mut pull = Vec2::ZERO;
                for other in env.live_views() {
                    if other.id == id {
                        continue;
                    }
                    let d = other.pos - p.pos;
                    let dist_sq = d.length_squared().max(400.0);
                    pull += d.normalize_or_zero() * other.radius / dist_sq;
                }
                p.vel += pull * 0.02;
            }
            Mutator::Entropic => {
                if !p.color_locked {
                    p.color = desaturate(p.color, 0.002);
                }
                let disorder = (p.age as f32 * 1e-5).min(0.1);
                p.vel += jitter(env.rng, disorder);
            }
            Mutator::TorusField | Mutator::EventHorizon | Mutator::QuantumPhase => {}
        }
    }

    if p.infected && !p.color_locked {
        p.color = p.color.lerp(INFECTED_TINT, 0.02);
    }
}
