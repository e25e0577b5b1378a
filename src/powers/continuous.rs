//! Held-button powers.

use crate::accumulator::StepEnv;
use crate::color::hsv_to_rgb;
use crate::particle::{Particle, ParticleId};
use crate::seed::jitter;
use glam::Vec2;
use std::f32::consts::{FRAC_PI_4, TAU};

/// Lattice spacing used by `regrid`.
const GRID: f32 = 40.0;
/// Ring radius `scribe` snaps onto.
const SCRIBE_RING: f32 = 20.0;
/// Preferred orbit radius for `orbit`.
const ORBIT_RADIUS: f32 = 120.0;
/// Speed cap for `accelerate`.
const MAX_ACCELERATED_SPEED: f32 = 12.0;

// Countdown lengths, in sub-steps.
const DRAIN_STEPS: u32 = 60;
const UNRAVEL_STEPS: u32 = 45;
const CONSUME_STEPS: u32 = 30;

/// A power applied every sub-step while its button is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContinuousPower {
    Comet,
    Attract,
    Repel,
    Vortex,
    Orbit,
    Spiral,
    Scribe,
    Align,
    Regrid,
    Paint,
    Freeze,
    Chaos,
    Wind,
    Grow,
    Shrink,
    Drain,
    Unravel,
    Consume,
    Infect,
    Cure,
    Crystallize,
    Entangle,
    Magnetize,
    Lens,
    Shear,
    Pulse,
    Calm,
    Accelerate,
    Prism,
    Tide,
}

impl ContinuousPower {
    pub const ALL: [ContinuousPower; 30] = [
        ContinuousPower::Comet,
        ContinuousPower::Attract,
        ContinuousPower::Repel,
        ContinuousPower::Vortex,
        ContinuousPower::Orbit,
        ContinuousPower::Spiral,
        ContinuousPower::Scribe,
        ContinuousPower::Align,
        ContinuousPower::Regrid,
        ContinuousPower::Paint,
        ContinuousPower::Freeze,
        ContinuousPower::Chaos,
        ContinuousPower::Wind,
        ContinuousPower::Grow,
        ContinuousPower::Shrink,
        ContinuousPower::Drain,
        ContinuousPower::Unravel,
        ContinuousPower::Consume,
        ContinuousPower::Infect,
        ContinuousPower::Cure,
        ContinuousPower::Crystallize,
        ContinuousPower::Entangle,
        ContinuousPower::Magnetize,
        ContinuousPower::Lens,
        ContinuousPower::Shear,
        ContinuousPower::Pulse,
        ContinuousPower::Calm,
        ContinuousPower::Accelerate,
        ContinuousPower::Prism,
        ContinuousPower::Tide,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ContinuousPower::Comet => "comet",
            ContinuousPower::Attract => "attract",
            ContinuousPower::Repel => "repel",
            ContinuousPower::Vortex => "vortex",
            ContinuousPower::Orbit => "orbit",
            ContinuousPower::Spiral => "spiral",
            ContinuousPower::Scribe => "scribe",
            ContinuousPower::Align => "align",
            ContinuousPower::Regrid => "regrid",
            ContinuousPower::Paint => "paint",
            ContinuousPower::Freeze => "freeze",
            ContinuousPower::Chaos => "chaos",
            ContinuousPower::Wind => "wind",
            ContinuousPower::Grow => "grow",
            ContinuousPower::Shrink => "shrink",
            ContinuousPower::Drain => "drain",
            ContinuousPower::Unravel => "unravel",
            ContinuousPower::Consume => "consume",
            ContinuousPower::Infect => "infect",
            ContinuousPower::Cure => "cure",
            ContinuousPower::Crystallize => "crystallize",
            ContinuousPower::Entangle => "entangle",
            ContinuousPower::Magnetize => "magnetize",
            ContinuousPower::Lens => "lens",
            ContinuousPower::Shear => "shear",
            ContinuousPower::Pulse => "pulse",
            ContinuousPower::Calm => "calm",
            ContinuousPower::Accelerate => "accelerate",
            ContinuousPower::Prism => "prism",
            ContinuousPower::Tide => "tide",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Activation radius around the cursor, in pixels.
    pub fn radius(&self) -> f32 {
        match self {
            ContinuousPower::Comet => 400.0,
            ContinuousPower::Attract => 300.0,
            ContinuousPower::Repel => 250.0,
            ContinuousPower::Vortex => 300.0,
            ContinuousPower::Orbit => 400.0,
            ContinuousPower::Spiral => 350.0,
            ContinuousPower::Scribe => 100.0,
            ContinuousPower::Align => 250.0,
            ContinuousPower::Regrid => 200.0,
            ContinuousPower::Paint => 150.0,
            ContinuousPower::Freeze => 200.0,
            ContinuousPower::Chaos => 250.0,
            ContinuousPower::Wind => 500.0,
            ContinuousPower::Grow => 150.0,
            ContinuousPower::Shrink => 150.0,
            ContinuousPower::Drain => 120.0,
            ContinuousPower::Unravel => 120.0,
            ContinuousPower::Consume => 100.0,
            ContinuousPower::Infect => 150.0,
            ContinuousPower::Cure => 200.0,
            ContinuousPower::Crystallize => 120.0,
            ContinuousPower::Entangle => 150.0,
            ContinuousPower::Magnetize => 300.0,
            ContinuousPower::Lens => 300.0,
            ContinuousPower::Shear => 400.0,
            ContinuousPower::Pulse => 300.0,
            ContinuousPower::Calm => 800.0,
            ContinuousPower::Accelerate => 300.0,
            ContinuousPower::Prism => 200.0,
            ContinuousPower::Tide => 600.0,
        }
    }
}

/// Apply a continuous power to one particle.
///
/// The caller has already vetoed phased, stasis, crystalized and entangled
/// particles. Particles outside the power's radius are left untouched.
pub(crate) fn apply_continuous(
    power: ContinuousPower,
    p: &mut Particle,
    id: ParticleId,
    cursor: Vec2,
    env: &mut StepEnv<'_>,
) {
    let d = cursor - p.pos;
    let dist_sq = d.length_squared();
    let radius = power.radius();
    if dist_sq > radius * radius {
        return;
    }
    let dist = dist_sq.sqrt();
    // Unit vector toward the cursor; zero on top of it.
    let dir = d.normalize_or_zero();
    let tangent = dir.perp();
    let frame = env.frame as f32;

    match power {
        ContinuousPower::Comet => p.vel += d * 0.01,
        ContinuousPower::Attract => p.vel += dir * 0.15,
        ContinuousPower::Repel => p.vel -= dir * 0.2,
        ContinuousPower::Vortex => p.vel += tangent * 0.15,
        ContinuousPower::Orbit => {
            p.vel += tangent * 0.1 + dir * (dist - ORBIT_RADIUS) * 0.001;
        }
        ContinuousPower::Spiral => p.vel += tangent * 0.12 + dir * 0.05,
        ContinuousPower::Scribe => {
            let out = if dir == Vec2::ZERO {
                Vec2::from_angle(p.seed * TAU)
            } else {
                -dir
            };
            p.pos = cursor + out * SCRIBE_RING;
            p.vel = Vec2::ZERO;
        }
        ContinuousPower::Align => {
            let speed = p.vel.length();
            if speed > 1e-4 {
                let angle = p.vel.y.atan2(p.vel.x);
                let snapped = (angle / FRAC_PI_4).round() * FRAC_PI_4;
                p.vel = Vec2::from_angle(snapped) * speed;
            }
        }
        ContinuousPower::Regrid => p.pos = (p.pos / GRID).round() * GRID,
        ContinuousPower::Paint => {
            p.color = env.profile.aesthetic.palette.sample(dist / radius);
            p.color_locked = true;
        }
        ContinuousPower::Freeze => p.vel *= 0.8,
        ContinuousPower::Chaos => p.vel += jitter(env.rng, 0.5),
        ContinuousPower::Wind => {
            let side = if p.pos.x >= cursor.x { 1.0 } else { -1.0 };
            p.vel.x += side * 0.3;
        }
        ContinuousPower::Grow => {
            if !p.is_dying() {
                let cap = p.initial_radius * 3.0;
                if p.radius < cap {
                    p.set_radius((p.radius + 0.15).min(cap));
                }
            }
        }
        ContinuousPower::Shrink => p.set_radius(p.radius - 0.1),
        ContinuousPower::Drain => p.start_fading(DRAIN_STEPS),
        ContinuousPower::Unravel => p.start_unravelling(UNRAVEL_STEPS),
        ContinuousPower::Consume => p.start_consumed(CONSUME_STEPS),
        ContinuousPower::Infect => p.infected = true,
        ContinuousPower::Cure => p.infected = false,
        ContinuousPower::Crystallize => {
            p.crystalized = true;
            p.vel = Vec2::ZERO;
        }
        ContinuousPower::Entangle => {
            if p.bond.is_none() {
                let snapshot = env.snapshot;
                let partner = snapshot
                    .nearest_by(p.pos, radius, |v| {
                        v.id != id && v.bond.is_none() && !v.entangled && env.is_live(v.id)
                    })
                    .map(|v| v.id);
                if let Some(partner) = partner {
                    p.bond = Some(partner);
                    p.entangled = true;
                    env.links.push((partner, id));
                }
            }
        }
        ContinuousPower::Magnetize => p.vel += dir * 0.1 * p.species.polarity(),
        ContinuousPower::Lens => p.vel = Vec2::from_angle(0.02).rotate(p.vel),
        ContinuousPower::Shear => p.vel.x += d.y * 0.002,
        ContinuousPower::Pulse => p.vel -= dir * 0.3 * (frame * 0.2).sin(),
        ContinuousPower::Calm => p.vel *= 0.95,
        ContinuousPower::Accelerate => {
            p.vel = (p.vel * 1.05).clamp_length_max(MAX_ACCELERATED_SPEED);
        }
        ContinuousPower::Prism => {
            let angle = (-d.y).atan2(-d.x);
            p.color = hsv_to_rgb(angle / TAU, 0.9, 1.0);
        }
        ContinuousPower::Tide => {
            if d.y.abs() > 1e-3 {
                p.vel.y += d.y.signum() * 0.08;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for power in ContinuousPower::ALL {
            assert_eq!(ContinuousPower::from_name(power.name()), Some(power));
        }
        assert_eq!(ContinuousPower::from_name("Comet"), None);
    }

    #[test]
    fn test_radii_in_observed_range() {
        for power in ContinuousPower::ALL {
            let r = power.radius();
            assert!((100.0..=800.0).contains(&r), "{} radius {}", power.name(), r);
        }
        assert_eq!(ContinuousPower::Comet.radius(), 400.0);
        assert_eq!(ContinuousPower::Calm.radius(), 800.0);
    }
}
