//! Scripted cataclysm sequences.
//!
//! When the energy threshold is crossed, the profile's cataclysm runs as a
//! multi-frame script. While it runs, the simulation step is a pass-through:
//! only the script moves particles. On completion the simulation context
//! resets the registry and energy and reseeds the initial anomalies;
//! cataclysms that [`reseed`](Cataclysm::reseeds) also replace the whole
//! population.

use crate::color::desaturate;
use crate::effects::{Effect, EffectKind, EffectRegistry, Life};
use crate::particle::{Particles, Species};
use crate::seed::{random_direction, SimRng};
use glam::{Vec2, Vec3};
use rand::Rng;
use std::f32::consts::FRAC_1_SQRT_2;

/// Whole-population events fired by the energy state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cataclysm {
    /// Everything collapses into the centre.
    BigCrunch,
    /// Outward blast, everything fades.
    Supernova,
    /// Colors drain and motion stops.
    HeatDeath,
    /// Velocities and colors invert. The population survives.
    Inversion,
    /// Particles shatter into shards. The population survives.
    Shatter,
}

impl Cataclysm {
    pub const ALL: [Cataclysm; 5] = [
        Cataclysm::BigCrunch,
        Cataclysm::Supernova,
        Cataclysm::HeatDeath,
        Cataclysm::Inversion,
        Cataclysm::Shatter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Cataclysm::BigCrunch => "bigCrunch",
            Cataclysm::Supernova => "supernova",
            Cataclysm::HeatDeath => "heatDeath",
            Cataclysm::Inversion => "inversion",
            Cataclysm::Shatter => "shatter",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Length of the script, in frames.
    pub fn duration(&self) -> u32 {
        match self {
            Cataclysm::BigCrunch => 120,
            Cataclysm::Supernova => 90,
            Cataclysm::HeatDeath => 150,
            Cataclysm::Inversion => 60,
            Cataclysm::Shatter => 45,
        }
    }

    /// Whether completion replaces the population.
    pub fn reseeds(&self) -> bool {
        matches!(
            self,
            Cataclysm::BigCrunch | Cataclysm::Supernova | Cataclysm::HeatDeath
        )
    }
}

/// A cataclysm in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct CataclysmSequence {
    kind: Cataclysm,
    frame: u32,
}

impl CataclysmSequence {
    pub fn new(kind: Cataclysm) -> Self {
        Self { kind, frame: 0 }
    }

    pub fn kind(&self) -> Cataclysm {
        self.kind
    }

    /// Frames already played.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Progress through the script in `0..=1`.
    pub fn progress(&self) -> f32 {
        self.frame as f32 / self.kind.duration().max(1) as f32
    }

    pub fn is_finished(&self) -> bool {
        self.frame >= self.kind.duration()
    }

    /// Play one frame of the script. Returns `true` once finished.
    pub(crate) fn advance(
        &mut self,
        particles: &mut Particles,
        effects: &mut EffectRegistry,
        rng: &mut SimRng,
        bounds: Vec2,
    ) -> bool {
        if self.is_finished() {
            return true;
        }
        let first = self.frame == 0;
        let center = bounds * 0.5;

        match self.kind {
            Cataclysm::BigCrunch => {
                for p in particles.values_mut() {
                    p.vel = (center - p.pos) * 0.08;
                    p.pos += p.vel;
                }
            }
            Cataclysm::Supernova => {
                if first {
                    for p in particles.values_mut() {
                        let dir = (p.pos - center).normalize_or_zero();
                        let dir = if dir == Vec2::ZERO {
                            random_direction(rng, 1.0)
                        } else {
                            dir
                        };
                        p.vel = dir * rng.gen_range(4.0..10.0);
                    }
                    effects.push(Effect::new(
                        center,
                        0.0,
                        Life::Expanding { rate: 12.0, max_radius: bounds.length() },
                        EffectKind::Shockwave { strength: 0.0, width: 24.0 },
                    ));
                }
                for p in particles.values_mut() {
                    p.pos += p.vel;
                    p.vel *= 0.97;
                    p.set_opacity(p.opacity * 0.96);
                }
            }
            Cataclysm::HeatDeath => {
                for p in particles.values_mut() {
                    if !p.color_locked {
                        p.color = desaturate(p.color, 0.05);
                    }
                    p.vel *= 0.9;
                    p.pos += p.vel;
                }
            }
            Cataclysm::Inversion => {
                if first {
                    for p in particles.values_mut() {
                        p.vel = -p.vel;
                        if !p.color_locked {
                            p.color = Vec3::ONE - p.color;
                        }
                    }
                }
                for p in particles.values_mut() {
                    p.pos += p.vel;
                }
            }
            Cataclysm::Shatter => {
                if first {
                    shatter(particles, rng);
                }
                for p in particles.values_mut() {
                    p.pos += p.vel;
                    p.vel *= 0.98;
                }
            }
        }

        self.frame += 1;
        self.is_finished()
    }
}

/// Split every particle large enough into two shards, up to the cap.
fn shatter(particles: &mut Particles, rng: &mut SimRng) {
    let mut shards = Vec::new();
    for id in particles.ids() {
        if particles.len() + shards.len() >= particles.cap() {
            break;
        }
        let Some(p) = particles.get_mut(id) else {
            continue;
        };
        let half = p.radius * FRAC_1_SQRT_2;
        if half <= Species::Shard.min_radius() || p.is_dying() {
            continue;
        }
        let speed = rng.gen_range(1.0..3.0);
        let kick = random_direction(rng, speed);
        p.radius = half;
        p.initial_radius = half;
        p.species = Species::Shard;
        let mut shard = p.offspring();
        p.vel += kick;
        shard.vel -= kick;
        shards.push(shard);
    }
    for shard in shards {
        particles.spawn(shard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use crate::seed::Seed;

    fn population(n: usize) -> Particles {
        let mut particles = Particles::new(100);
        for i in 0..n {
            particles.spawn(Particle::new(
                Vec2::new(10.0 * i as f32, 20.0),
                Vec2::new(1.0, 0.0),
                3.0,
                Vec3::new(0.2, 0.4, 0.6),
                Species::Orb,
                0.5,
            ));
        }
        particles
    }

    fn run(kind: Cataclysm, particles: &mut Particles) -> u32 {
        let mut effects = EffectRegistry::new();
        let mut rng = Seed(8).rng();
        let mut seq = CataclysmSequence::new(kind);
        let mut frames = 0;
        while !seq.advance(particles, &mut effects, &mut rng, Vec2::new(400.0, 300.0)) {
            frames += 1;
            assert!(frames < 1000, "never finished");
        }
        frames + 1
    }

    #[test]
    fn test_names_roundtrip() {
        for c in Cataclysm::ALL {
            assert_eq!(Cataclysm::from_name(c.name()), Some(c));
        }
        assert_eq!(Cataclysm::from_name("bigBang"), None);
    }

    #[test]
    fn test_runs_for_its_duration() {
        for kind in Cataclysm::ALL {
            let mut particles = population(4);
            assert_eq!(run(kind, &mut particles), kind.duration(), "{}", kind.name());
        }
    }

    #[test]
    fn test_big_crunch_collapses_to_center() {
        let mut particles = population(5);
        run(Cataclysm::BigCrunch, &mut particles);
        for (_, p) in particles.iter() {
            assert!(p.pos.distance(Vec2::new(200.0, 150.0)) < 1.0);
        }
    }

    #[test]
    fn test_inversion_flips_velocity_and_color() {
        let mut particles = population(1);
        let mut effects = EffectRegistry::new();
        let mut rng = Seed(1).rng();
        let mut seq = CataclysmSequence::new(Cataclysm::Inversion);
        seq.advance(&mut particles, &mut effects, &mut rng, Vec2::splat(100.0));
        let (_, p) = particles.iter().next().unwrap();
        assert_eq!(p.vel, Vec2::new(-1.0, 0.0));
        assert!((p.color - Vec3::new(0.8, 0.6, 0.4)).length() < 1e-5);
    }

    #[test]
    fn test_shatter_respects_cap() {
        let mut particles = Particles::new(6);
        for i in 0..4 {
            particles.spawn(Particle::new(
                Vec2::new(i as f32, 0.0),
                Vec2::ZERO,
                3.0,
                Vec3::ONE,
                Species::Orb,
                0.0,
            ));
        }
        shatter(&mut particles, &mut Seed(2).rng());
        assert_eq!(particles.len(), 6);
        let area: f32 = particles.iter().map(|(_, p)| p.radius * p.radius).sum();
        // Two unshattered particles at 9 plus two shattered pairs at 4.5 each.
        assert!((area - 36.0).abs() < 1e-3);
    }
}
