//! Click powers.

use crate::anomalies::place_effect;
use crate::effects::{Effect, EffectCategory, EffectKind, EffectRegistry, Life};
use crate::particle::{ParticleId, Particles};
use crate::seed::{random_direction, SimRng};
use crate::spawn::SpawnContext;
use crate::universe::UniverseProfile;
use glam::Vec2;
use rand::Rng;
use std::f32::consts::FRAC_1_SQRT_2;
use tracing::debug;

/// Clicking this close to an existing gravity well removes it.
pub const WELL_TOGGLE_RADIUS: f32 = 30.0;

/// A power applied once per click edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiscretePower {
    // Anomaly placement
    GravityWell,
    BlackHole,
    WhiteHole,
    Star,
    Supergiant,
    Pulsar,
    Quasar,
    Nebula,
    Rift,
    Cloud,
    CrystallineField,
    SpacetimeFoam,
    AcceleratorRing,
    EchoingVoid,
    NegativeSpace,
    PhaseZone,
    StasisField,
    TimeDilation,
    Shockwave,
    // Population edits
    Supernova,
    Spawn,
    Clone,
    Purge,
    Merge,
    Split,
    Scatter,
    Recolor,
    Thaw,
    Mend,
    Bond,
    Chain,
    Sever,
}

impl DiscretePower {
    pub const ALL: [DiscretePower; 32] = [
        DiscretePower::GravityWell,
        DiscretePower::BlackHole,
        DiscretePower::WhiteHole,
        DiscretePower::Star,
        DiscretePower::Supergiant,
        DiscretePower::Pulsar,
        DiscretePower::Quasar,
        DiscretePower::Nebula,
        DiscretePower::Rift,
        DiscretePower::Cloud,
        DiscretePower::CrystallineField,
        DiscretePower::SpacetimeFoam,
        DiscretePower::AcceleratorRing,
        DiscretePower::EchoingVoid,
        DiscretePower::NegativeSpace,
        DiscretePower::PhaseZone,
        DiscretePower::StasisField,
        DiscretePower::TimeDilation,
        DiscretePower::Shockwave,
        DiscretePower::Supernova,
        DiscretePower::Spawn,
        DiscretePower::Clone,
        DiscretePower::Purge,
        DiscretePower::Merge,
        DiscretePower::Split,
        DiscretePower::Scatter,
        DiscretePower::Recolor,
        DiscretePower::Thaw,
        DiscretePower::Mend,
        DiscretePower::Bond,
        DiscretePower::Chain,
        DiscretePower::Sever,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DiscretePower::GravityWell => "gravityWell",
            DiscretePower::BlackHole => "blackHole",
            DiscretePower::WhiteHole => "whiteHole",
            DiscretePower::Star => "star",
            DiscretePower::Supergiant => "supergiant",
            DiscretePower::Pulsar => "pulsar",
            DiscretePower::Quasar => "quasar",
            DiscretePower::Nebula => "nebula",
            DiscretePower::Rift => "rift",
            DiscretePower::Cloud => "cloud",
            DiscretePower::CrystallineField => "crystallineField",
            DiscretePower::SpacetimeFoam => "spacetimeFoam",
            DiscretePower::AcceleratorRing => "acceleratorRing",
            DiscretePower::EchoingVoid => "echoingVoid",
            DiscretePower::NegativeSpace => "negativeSpace",
            DiscretePower::PhaseZone => "phaseZone",
            DiscretePower::StasisField => "stasisField",
            DiscretePower::TimeDilation => "timeDilation",
            DiscretePower::Shockwave => "shockwave",
            DiscretePower::Supernova => "supernova",
            DiscretePower::Spawn => "spawn",
            DiscretePower::Clone => "clone",
            DiscretePower::Purge => "purge",
            DiscretePower::Merge => "merge",
            DiscretePower::Split => "split",
            DiscretePower::Scatter => "scatter",
            DiscretePower::Recolor => "recolor",
            DiscretePower::Thaw => "thaw",
            DiscretePower::Mend => "mend",
            DiscretePower::Bond => "bond",
            DiscretePower::Chain => "chain",
            DiscretePower::Sever => "sever",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Registry category for the anomaly-placing powers.
    pub fn placed_category(&self) -> Option<EffectCategory> {
        let category = match self {
            DiscretePower::BlackHole => EffectCategory::BlackHoles,
            DiscretePower::WhiteHole => EffectCategory::WhiteHoles,
            DiscretePower::Star => EffectCategory::Stars,
            DiscretePower::Supergiant => EffectCategory::Supergiants,
            DiscretePower::Pulsar => EffectCategory::Pulsars,
            DiscretePower::Quasar => EffectCategory::Quasars,
            DiscretePower::Nebula => EffectCategory::Nebulas,
            DiscretePower::Rift => EffectCategory::Rifts,
            DiscretePower::Cloud => EffectCategory::Clouds,
            DiscretePower::CrystallineField => EffectCategory::CrystallineFields,
            DiscretePower::SpacetimeFoam => EffectCategory::SpacetimeFoam,
            DiscretePower::AcceleratorRing => EffectCategory::AcceleratorRings,
            DiscretePower::EchoingVoid => EffectCategory::EchoingVoids,
            DiscretePower::NegativeSpace => EffectCategory::NegativeSpaces,
            DiscretePower::PhaseZone => EffectCategory::PhaseZones,
            DiscretePower::StasisField => EffectCategory::StasisFields,
            DiscretePower::Shockwave => EffectCategory::Shockwaves,
            _ => return None,
        };
        Some(category)
    }
}

/// Everything a discrete power may touch.
pub struct DiscreteCtx<'a> {
    pub particles: &'a mut Particles,
    pub effects: &'a mut EffectRegistry,
    pub rng: &'a mut SimRng,
    pub profile: &'a UniverseProfile,
    pub bounds: Vec2,
}

impl DiscreteCtx<'_> {
    fn spawner(&mut self) -> SpawnContext<'_> {
        SpawnContext::new(
            self.rng,
            self.profile.aesthetic.palette,
            &self.profile.aesthetic.shapes,
            self.bounds,
        )
    }
}

/// Apply a discrete power at the cursor.
pub(crate) fn apply_discrete(power: DiscretePower, cursor: Vec2, ctx: &mut DiscreteCtx<'_>) {
    debug!(power = power.name(), x = cursor.x, y = cursor.y, "discrete power");

    if let Some(category) = power.placed_category() {
        let effect = place_effect(
            category,
            cursor,
            ctx.rng,
            ctx.profile.aesthetic.palette,
            ctx.bounds,
        );
        ctx.effects.push(effect);
        return;
    }

    match power {
        DiscretePower::GravityWell => {
            let cat = EffectCategory::GravityWells;
            match ctx.effects.find_near(cat, cursor, WELL_TOGGLE_RADIUS) {
                Some(index) => {
                    ctx.effects.remove(cat, index);
                }
                None => {
                    let well = place_effect(cat, cursor, ctx.rng, ctx.profile.aesthetic.palette, ctx.bounds);
                    ctx.effects.push(well);
                }
            }
        }
        DiscretePower::TimeDilation => {
            // Alternate fast and slow zones.
            let fast = ctx.effects.count(EffectCategory::TimeDilationZones) % 2 == 0;
            let factor = if fast { 2.0 } else { 0.5 };
            ctx.effects.push(Effect::new(
                cursor,
                120.0,
                Life::Countdown(900),
                EffectKind::TimeDilation { factor },
            ));
        }
        DiscretePower::Supernova => {
            const BLAST: f32 = 300.0;
            for id in ctx.particles.within(cursor, BLAST) {
                if let Some(p) = ctx.particles.get_mut(id) {
                    let away = p.pos - cursor;
                    let dist = away.length();
                    let dir = if dist > 1e-3 {
                        away / dist
                    } else {
                        random_direction(ctx.rng, 1.0)
                    };
                    p.vel += dir * 6.0 * (1.0 - dist / BLAST);
                }
            }
            ctx.effects.push(Effect::new(
                cursor,
                0.0,
                Life::Expanding { rate: 8.0, max_radius: BLAST },
                EffectKind::Shockwave { strength: 1.0, width: 16.0 },
            ));
        }
        DiscretePower::Spawn => {
            let born: Vec<_> = {
                let mut spawner = ctx.spawner();
                (0..20)
                    .map(|_| {
                        let pos = spawner.random_in_disc(cursor, 20.0);
                        let vel = spawner.random_velocity(2.0);
                        spawner.particle(pos, vel)
                    })
                    .collect()
            };
            for p in born {
                ctx.particles.spawn(p);
            }
        }
        DiscretePower::Clone => {
            let source = ctx
                .particles
                .nearest(cursor, 100.0, None)
                .and_then(|id| ctx.particles.get(id))
                .map(|p| p.offspring());
            if let Some(mut child) = source {
                child.vel += random_direction(ctx.rng, 0.5);
                ctx.particles.spawn(child);
            }
        }
        DiscretePower::Purge => {
            for id in ctx.particles.within(cursor, 150.0) {
                if let Some(p) = ctx.particles.get_mut(id) {
                    p.start_fading(40);
                }
            }
        }
        DiscretePower::Merge => merge(cursor, ctx),
        DiscretePower::Split => split(cursor, ctx),
        DiscretePower::Scatter => {
            for id in ctx.particles.within(cursor, 200.0) {
                let speed = ctx.rng.gen_range(1.0..4.0);
                if let Some(p) = ctx.particles.get_mut(id) {
                    p.vel = random_direction(ctx.rng, speed);
                }
            }
        }
        DiscretePower::Recolor => {
            for id in ctx.particles.within(cursor, 250.0) {
                if let Some(p) = ctx.particles.get_mut(id) {
                    if !p.color_locked {
                        p.color = ctx.profile.aesthetic.palette.random(ctx.rng);
                    }
                }
            }
        }
        DiscretePower::Thaw => {
            for id in ctx.particles.within(cursor, 200.0) {
                if let Some(p) = ctx.particles.get_mut(id) {
                    p.crystalized = false;
                }
            }
        }
        DiscretePower::Mend => {
            for id in ctx.particles.within(cursor, 150.0) {
                if let Some(p) = ctx.particles.get_mut(id) {
                    p.mend();
                }
            }
        }
        DiscretePower::Bond => bond(cursor, ctx),
        DiscretePower::Chain => chain(cursor, ctx),
        DiscretePower::Sever => sever(cursor, ctx),
        // Placement powers returned above.
        _ => {}
    }
}

/// Merge every healthy particle within 80 px into one, conserving area.
fn merge(cursor: Vec2, ctx: &mut DiscreteCtx<'_>) {
    let group: Vec<ParticleId> = ctx
        .particles
        .within(cursor, 80.0)
        .into_iter()
        .filter(|&id| ctx.particles.get(id).is_some_and(|p| !p.is_dying()))
        .collect();
    if group.len() < 2 {
        return;
    }

    let mut area = 0.0;
    let mut pos = Vec2::ZERO;
    let mut vel = Vec2::ZERO;
    let mut largest: Option<(ParticleId, f32)> = None;
    for &id in &group {
        if let Some(p) = ctx.particles.get(id) {
            let a = p.radius * p.radius;
            area += a;
            pos += p.pos * a;
            vel += p.vel * a;
            if largest.map_or(true, |(_, r)| p.radius > r) {
                largest = Some((id, p.radius));
            }
        }
    }
    let Some(mut merged) = largest
        .and_then(|(id, _)| ctx.particles.get(id))
        .map(|p| p.offspring())
    else {
        return;
    };
    if area <= 0.0 {
        return;
    }

    merged.pos = pos / area;
    merged.vel = vel / area;
    merged.radius = area.sqrt();
    merged.initial_radius = merged.radius;
    for id in group {
        ctx.particles.remove(id);
    }
    ctx.particles.spawn(merged);
}

/// Split the nearest particle into two halves of equal area.
fn split(cursor: Vec2, ctx: &mut DiscreteCtx<'_>) {
    let Some(id) = ctx.particles.nearest(cursor, 100.0, None) else {
        return;
    };
    let Some(parent) = ctx.particles.get(id).filter(|p| !p.is_dying()) else {
        return;
    };
    let half = parent.radius * FRAC_1_SQRT_2;
    if half <= parent.species.min_radius() {
        return;
    }

    let kick = random_direction(ctx.rng, 0.8);
    let halves = [kick, -kick].map(|dv| {
        let mut child = parent.offspring();
        child.radius = half;
        child.initial_radius = half;
        child.vel += dv;
        child.pos += dv.normalize_or_zero() * half;
        child
    });
    ctx.particles.remove(id);
    for child in halves {
        ctx.particles.spawn(child);
    }
}

/// Pair up unbonded particles within 100 px, in insertion order.
fn bond(cursor: Vec2, ctx: &mut DiscreteCtx<'_>) {
    let free: Vec<ParticleId> = ctx
        .particles
        .within(cursor, 100.0)
        .into_iter()
        .filter(|&id| ctx.particles.get(id).is_some_and(|p| p.bond.is_none()))
        .collect();
    for pair in free.chunks_exact(2) {
        let (a, b) = (pair[0], pair[1]);
        if let Some(p) = ctx.particles.get_mut(a) {
            p.bond = Some(b);
        }
        if let Some(p) = ctx.particles.get_mut(b) {
            p.bond = Some(a);
        }
    }
}

/// Link unchained particles within 150 px into a chain, nearest first.
fn chain(cursor: Vec2, ctx: &mut DiscreteCtx<'_>) {
    let mut links: Vec<(f32, ParticleId)> = ctx
        .particles
        .within(cursor, 150.0)
        .into_iter()
        .filter_map(|id| {
            ctx.particles
                .get(id)
                .filter(|p| p.chain_parent.is_none() && p.chain_child.is_none())
                .map(|p| (p.pos.distance_squared(cursor), id))
        })
        .collect();
    links.sort_by(|a, b| a.0.total_cmp(&b.0));

    for pair in links.windows(2) {
        let (parent, child) = (pair[0].1, pair[1].1);
        if let Some(p) = ctx.particles.get_mut(parent) {
            p.chain_child = Some(child);
        }
        if let Some(p) = ctx.particles.get_mut(child) {
            p.chain_parent = Some(parent);
        }
    }
}

/// Clear every relation touching particles within 150 px.
fn sever(cursor: Vec2, ctx: &mut DiscreteCtx<'_>) {
    let targets = ctx.particles.within(cursor, 150.0);
    let mut partners = Vec::new();
    for &id in &targets {
        if let Some(p) = ctx.particles.get_mut(id) {
            partners.extend([p.bond, p.chain_parent, p.chain_child].into_iter().flatten());
            p.bond = None;
            p.chain_parent = None;
            p.chain_child = None;
            p.coral_anchor = None;
            p.entangled = false;
        }
    }
    for other in partners {
        if let Some(p) = ctx.particles.get_mut(other) {
            for link in [&mut p.bond, &mut p.chain_parent, &mut p.chain_child] {
                if link.is_some_and(|target| targets.contains(&target)) {
                    *link = None;
                }
            }
            if p.bond.is_none() {
                p.entangled = false;
            }
        }
    }
}
