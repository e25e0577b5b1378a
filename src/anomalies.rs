//! Anomaly field laws, placement defaults and spawners.
//!
//! Every registry category with a field law is applied to every particle on
//! every sub-step, regardless of the phase/stasis veto. Categories with no
//! field law here (`timeDilationZones`, `phaseZones`, `stasisFields`,
//! `gravityWells`) are read by the accumulator directly.
//!
//! # Field laws
//!
//! | Category | Law |
//! |----------|-----|
//! | black holes | inverse-square pull, removal inside the horizon |
//! | white holes | inverse-square push |
//! | stars, supergiants | inverse-square pull |
//! | pulsars | push along two rotating beams |
//! | quasars | push along two rotating jets |
//! | rifts | teleport to the paired exit, or swallow |
//! | clouds, nebulas | drag and tint |
//! | crystalline fields | slow particles crystalize, fast ones snap to 60° |
//! | microwave background | global velocity noise |
//! | spacetime foam | local velocity noise |
//! | accelerator rings | 45° direction lock and boost on the ring |
//! | echoing voids | record history, echo back to the oldest position |
//! | negative spaces | removal |
//! | shockwaves | push on the ring front |

use crate::accumulator::{Fate, StepEnv};
use crate::color::Palette;
use crate::effects::{Effect, EffectCategory, EffectKind, EffectRegistry, Life};
use crate::particle::{Particle, Species, HISTORY_LEN};
use crate::seed::{jitter, SimRng};
use crate::spawn::SpawnContext;
use glam::{Vec2, Vec3};
use rand::Rng;
use std::f32::consts::{FRAC_PI_3, FRAC_PI_4, PI, TAU};

/// Squared-distance floor for inverse-square laws.
const SOFTENING: f32 = 100.0;
/// Speed cap for accelerator ring boosts.
const RING_MAX_SPEED: f32 = 8.0;

/// Build an effect of `category` at `pos` with its default parameters.
pub fn place_effect(
    category: EffectCategory,
    pos: Vec2,
    rng: &mut SimRng,
    palette: Palette,
    bounds: Vec2,
) -> Effect {
    use EffectCategory as C;
    let (radius, life, kind) = match category {
        C::Nebulas => (
            120.0,
            Life::Countdown(1200),
            EffectKind::Nebula { color: palette.random(rng) },
        ),
        C::BlackHoles => (
            250.0,
            Life::Permanent,
            EffectKind::BlackHole { mass: 150.0, horizon: 12.0 },
        ),
        C::WhiteHoles => (
            200.0,
            Life::Countdown(900),
            EffectKind::WhiteHole { strength: 100.0, emit_every: 20, timer: 0 },
        ),
        C::Stars => (
            200.0,
            Life::Permanent,
            EffectKind::Star { mass: 60.0, color: Vec3::new(1.0, 0.85, 0.55) },
        ),
        C::Supergiants => (
            300.0,
            Life::Countdown(1500),
            EffectKind::Supergiant { mass: 200.0, emit_every: 45, timer: 0 },
        ),
        C::Pulsars => (
            350.0,
            Life::Permanent,
            EffectKind::Pulsar {
                angle: rng.gen_range(0.0..TAU),
                spin: 0.03,
                beam_width: 0.12,
                strength: 0.4,
            },
        ),
        C::Quasars => (
            400.0,
            Life::Countdown(1200),
            EffectKind::Quasar {
                angle: rng.gen_range(0.0..TAU),
                spin: 0.01,
                jet_width: 0.15,
                strength: 0.6,
                emit_every: 10,
                timer: 0,
            },
        ),
        C::Rifts => {
            let exit = Vec2::new(
                rng.gen_range(0.0..bounds.x.max(1.0)),
                rng.gen_range(0.0..bounds.y.max(1.0)),
            );
            (40.0, Life::Countdown(900), EffectKind::Rift { exit: Some(exit) })
        }
        C::Clouds => (
            100.0,
            Life::Countdown(900),
            EffectKind::Cloud { drag: 0.03, color: palette.random(rng) },
        ),
        C::CrystallineFields => (
            120.0,
            Life::Countdown(1200),
            EffectKind::CrystallineField { snap_below: 0.3 },
        ),
        C::MicrowaveBackground => (
            0.0,
            Life::Permanent,
            EffectKind::MicrowaveBackground { amplitude: 0.02 },
        ),
        C::SpacetimeFoam => (
            150.0,
            Life::Countdown(900),
            EffectKind::SpacetimeFoam { amplitude: 0.3 },
        ),
        C::AcceleratorRings => (
            120.0,
            Life::Countdown(1200),
            EffectKind::AcceleratorRing { width: 8.0, boost: 1.02 },
        ),
        C::EchoingVoids => (90.0, Life::Countdown(1200), EffectKind::EchoingVoid),
        C::NegativeSpaces => (40.0, Life::Shrinking { rate: 0.05 }, EffectKind::NegativeSpace),
        C::PhaseZones => (100.0, Life::Countdown(900), EffectKind::PhaseZone),
        C::StasisFields => (90.0, Life::Countdown(600), EffectKind::StasisField),
        C::TimeDilationZones => (
            120.0,
            Life::Countdown(900),
            EffectKind::TimeDilation { factor: 2.0 },
        ),
        C::GravityWells => (
            WELL_RADIUS,
            Life::Permanent,
            EffectKind::GravityWell { strength: 0.0005 },
        ),
        C::Shockwaves => (
            0.0,
            Life::Expanding { rate: 6.0, max_radius: 400.0 },
            EffectKind::Shockwave { strength: 1.5, width: 14.0 },
        ),
    };
    Effect::new(pos, radius, life, kind)
}

/// Drawn size of a gravity well.
const WELL_RADIUS: f32 = 30.0;

/// Apply every anomaly field law to one particle.
pub(crate) fn apply_anomalies(p: &mut Particle, env: &mut StepEnv<'_>) -> Fate {
    let effects = env.effects;

    for effect in effects.iter_all() {
        let offset = p.pos - effect.pos;
        let dist_sq = offset.length_squared();
        let inside = dist_sq < effect.radius * effect.radius;
        // Unit vector from the effect toward the particle.
        let out = offset.normalize_or_zero();

        match effect.kind {
            EffectKind::BlackHole { mass, horizon } => {
                if dist_sq < horizon * horizon {
                    return Fate::Removed;
                }
                if inside {
                    p.vel -= out * (mass / dist_sq.max(SOFTENING));
                }
            }
            EffectKind::WhiteHole { strength, .. } => {
                if inside {
                    p.vel += out * (strength / dist_sq.max(SOFTENING));
                }
            }
            EffectKind::Star { mass, color } => {
                if inside {
                    p.vel -= out * (mass / dist_sq.max(SOFTENING));
                    if !p.color_locked && dist_sq < 900.0 {
                        p.color = p.color.lerp(color, 0.05);
                    }
                }
            }
            EffectKind::Supergiant { mass, .. } => {
                if inside {
                    p.vel -= out * (mass / dist_sq.max(SOFTENING));
                }
            }
            EffectKind::Pulsar { angle, beam_width, strength, .. } => {
                if inside && in_twin_beam(offset, angle, beam_width) {
                    p.vel += out * strength;
                }
            }
            EffectKind::Quasar { angle, jet_width, strength, .. } => {
                if inside {
                    if in_twin_beam(offset, angle, jet_width) {
                        p.vel += out * strength;
                    } else {
                        // Accretion outside the jets
                        p.vel -= out * 0.02;
                    }
                }
            }
            EffectKind::Rift { exit } => {
                if inside {
                    match exit {
                        Some(exit) => p.pos = exit + offset * 0.5,
                        None => return Fate::Removed,
                    }
                }
            }
            EffectKind::Cloud { drag, color } => {
                if inside {
                    p.vel *= 1.0 - drag.clamp(0.0, 1.0);
                    if !p.color_locked {
                        p.color = p.color.lerp(color, 0.02);
                    }
                }
            }
            EffectKind::Nebula { color } => {
                if inside {
                    p.vel *= 0.99;
                    if !p.color_locked {
                        p.color = p.color.lerp(color, 0.01);
                    }
                }
            }
            EffectKind::CrystallineField { snap_below } => {
                if inside {
                    let speed = p.vel.length();
                    if speed < snap_below {
                        p.crystalized = true;
                        p.vel = Vec2::ZERO;
                    } else {
                        p.vel = snap_direction(p.vel, FRAC_PI_3);
                    }
                }
            }
            EffectKind::MicrowaveBackground { amplitude } => {
                p.vel += jitter(env.rng, amplitude);
            }
            EffectKind::SpacetimeFoam { amplitude } => {
                if inside {
                    p.vel += jitter(env.rng, amplitude);
                }
            }
            EffectKind::AcceleratorRing { width, boost } => {
                let dist = dist_sq.sqrt();
                if (dist - effect.radius).abs() < width {
                    p.vel = (snap_direction(p.vel, FRAC_PI_4) * boost)
                        .clamp_length_max(RING_MAX_SPEED);
                }
            }
            EffectKind::EchoingVoid => {
                if inside {
                    p.record_history();
                    if p.history.len() == HISTORY_LEN {
                        if let Some(&oldest) = p.history.front() {
                            p.pos = oldest;
                        }
                        p.history.clear();
                    }
                }
            }
            EffectKind::NegativeSpace => {
                if inside {
                    return Fate::Removed;
                }
            }
            EffectKind::Shockwave { strength, width } => {
                let dist = dist_sq.sqrt();
                if (dist - effect.radius).abs() < width {
                    p.vel += out * strength;
                }
            }
            EffectKind::PhaseZone
            | EffectKind::StasisField
            | EffectKind::TimeDilation { .. }
            | EffectKind::GravityWell { .. } => {}
        }
    }
    Fate::Alive
}

/// Whether `offset` lies within `width` radians of either beam.
fn in_twin_beam(offset: Vec2, angle: f32, width: f32) -> bool {
    if offset == Vec2::ZERO {
        return false;
    }
    let theta = offset.y.atan2(offset.x);
    // Angular distance to the beam axis, folding the opposite beam onto it.
    let diff = (theta - angle).rem_euclid(PI);
    diff.min(PI - diff) < width
}

/// Snap a velocity's direction to the nearest multiple of `step`.
fn snap_direction(vel: Vec2, step: f32) -> Vec2 {
    let speed = vel.length();
    if speed < 1e-6 {
        return vel;
    }
    let angle = vel.y.atan2(vel.x);
    Vec2::from_angle((angle / step).round() * step) * speed
}

/// Advance spawner timers and emit particles from white holes, quasars and
/// supergiants.
pub(crate) fn emit_spawns(effects: &mut EffectRegistry, spawner: &mut SpawnContext<'_>) -> Vec<Particle> {
    let mut born = Vec::new();

    for effect in effects.iter_mut(EffectCategory::WhiteHoles) {
        if let EffectKind::WhiteHole { emit_every, timer, .. } = &mut effect.kind {
            if tick_timer(timer, *emit_every) {
                let pos = spawner.random_in_disc(effect.pos, 6.0);
                let vel = spawner.outward(effect.pos, pos, 2.0);
                born.push(spawner.particle_of(Species::Spark, pos, vel));
            }
        }
    }

    for effect in effects.iter_mut(EffectCategory::Quasars) {
        if let EffectKind::Quasar { angle, emit_every, timer, .. } = &mut effect.kind {
            if tick_timer(timer, *emit_every) {
                let side = if spawner.random() < 0.5 { 0.0 } else { PI };
                let dir = Vec2::from_angle(*angle + side);
                let pos = effect.pos + dir * 8.0;
                born.push(spawner.particle_of(Species::Comet, pos, dir * 4.0));
            }
        }
    }

    for effect in effects.iter_mut(EffectCategory::Supergiants) {
        if let EffectKind::Supergiant { emit_every, timer, .. } = &mut effect.kind {
            if tick_timer(timer, *emit_every) {
                let pos = spawner.random_in_disc(effect.pos, effect.radius * 0.1);
                let vel = spawner.outward(effect.pos, pos, 1.0);
                born.push(spawner.particle_of(Species::Star, pos, vel));
            }
        }
    }

    born
}

fn tick_timer(timer: &mut u32, every: u32) -> bool {
    *timer += 1;
    if *timer >= every.max(1) {
        *timer = 0;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::Seed;

    #[test]
    fn test_every_category_has_a_default() {
        let mut rng = Seed(1).rng();
        for category in EffectCategory::ALL {
            let effect = place_effect(category, Vec2::ZERO, &mut rng, Palette::Cosmic, Vec2::splat(500.0));
            assert_eq!(effect.category(), category);
        }
    }

    #[test]
    fn test_twin_beam() {
        // Beam along +x; the opposite beam covers -x.
        assert!(in_twin_beam(Vec2::new(10.0, 0.5), 0.0, 0.1));
        assert!(in_twin_beam(Vec2::new(-10.0, 0.5), 0.0, 0.1));
        assert!(!in_twin_beam(Vec2::new(0.0, 10.0), 0.0, 0.1));
    }

    #[test]
    fn test_snap_direction_keeps_speed() {
        let v = snap_direction(Vec2::new(3.0, 0.4), FRAC_PI_4);
        assert!((v.length() - Vec2::new(3.0, 0.4).length()).abs() < 1e-4);
        assert!(v.y.abs() < 1e-4);
    }

    #[test]
    fn test_white_hole_emits_on_schedule() {
        let mut effects = EffectRegistry::new();
        let mut rng = Seed(2).rng();
        let hole = place_effect(EffectCategory::WhiteHoles, Vec2::splat(100.0), &mut rng, Palette::Ice, Vec2::splat(500.0));
        effects.push(hole);
        let mut spawner = SpawnContext::new(&mut rng, Palette::Ice, &[], Vec2::splat(500.0));
        let mut total = 0;
        for _ in 0..40 {
            total += emit_spawns(&mut effects, &mut spawner).len();
        }
        assert_eq!(total, 2);
    }
}
