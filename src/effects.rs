//! The effect registry: every live anomaly, zone and field.
//!
//! Effects are grouped by [`EffectCategory`]. Each category is an ordered
//! collection; insertion order is the consideration and draw order. There is
//! no uniqueness constraint, so overlapping effects simply sum.
//!
//! # Lifecycles
//!
//! | [`Life`] | Removal policy |
//! |----------|----------------|
//! | `Permanent` | Never removed by the lifecycle tick |
//! | `Countdown` | Removed when the frame count reaches zero |
//! | `Shrinking` | Radius shrinks each frame, removed at zero |
//! | `Expanding` | Radius grows each frame, removed past `max_radius` |
//!
//! ```ignore
//! let mut fx = EffectRegistry::new();
//! fx.push(Effect::new(pos, 40.0, Life::Permanent, EffectKind::PhaseZone));
//! for effect in fx.iter(EffectCategory::PhaseZones) { /* ... */ }
//! fx.tick();
//! ```

use glam::{Vec2, Vec3};
use std::collections::VecDeque;

/// Effect category, the registry key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectCategory {
    Nebulas,
    BlackHoles,
    WhiteHoles,
    Stars,
    Supergiants,
    Pulsars,
    Quasars,
    Rifts,
    Clouds,
    CrystallineFields,
    MicrowaveBackground,
    SpacetimeFoam,
    AcceleratorRings,
    EchoingVoids,
    NegativeSpaces,
    PhaseZones,
    StasisFields,
    TimeDilationZones,
    GravityWells,
    Shockwaves,
}

impl EffectCategory {
    /// Number of categories.
    pub const COUNT: usize = 20;

    /// All categories in registry order.
    pub const ALL: [EffectCategory; Self::COUNT] = [
        EffectCategory::Nebulas,
        EffectCategory::BlackHoles,
        EffectCategory::WhiteHoles,
        EffectCategory::Stars,
        EffectCategory::Supergiants,
        EffectCategory::Pulsars,
        EffectCategory::Quasars,
        EffectCategory::Rifts,
        EffectCategory::Clouds,
        EffectCategory::CrystallineFields,
        EffectCategory::MicrowaveBackground,
        EffectCategory::SpacetimeFoam,
        EffectCategory::AcceleratorRings,
        EffectCategory::EchoingVoids,
        EffectCategory::NegativeSpaces,
        EffectCategory::PhaseZones,
        EffectCategory::StasisFields,
        EffectCategory::TimeDilationZones,
        EffectCategory::GravityWells,
        EffectCategory::Shockwaves,
    ];

    /// Registry key as used in profiles (`"blackHoles"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            EffectCategory::Nebulas => "nebulas",
            EffectCategory::BlackHoles => "blackHoles",
            EffectCategory::WhiteHoles => "whiteHoles",
            EffectCategory::Stars => "stars",
            EffectCategory::Supergiants => "supergiants",
            EffectCategory::Pulsars => "pulsars",
            EffectCategory::Quasars => "quasars",
            EffectCategory::Rifts => "rifts",
            EffectCategory::Clouds => "clouds",
            EffectCategory::CrystallineFields => "crystallineFields",
            EffectCategory::MicrowaveBackground => "microwaveBackground",
            EffectCategory::SpacetimeFoam => "spacetimeFoam",
            EffectCategory::AcceleratorRings => "acceleratorRings",
            EffectCategory::EchoingVoids => "echoingVoids",
            EffectCategory::NegativeSpaces => "negativeSpaces",
            EffectCategory::PhaseZones => "phaseZones",
            EffectCategory::StasisFields => "stasisFields",
            EffectCategory::TimeDilationZones => "timeDilationZones",
            EffectCategory::GravityWells => "gravityWells",
            EffectCategory::Shockwaves => "shockwaves",
        }
    }

    /// Resolve a registry key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Maximum live entries in this category.
    pub fn cap(&self) -> usize {
        match self {
            EffectCategory::BlackHoles | EffectCategory::WhiteHoles => 3,
            EffectCategory::Quasars | EffectCategory::Supergiants => 2,
            EffectCategory::MicrowaveBackground => 1,
            EffectCategory::Pulsars | EffectCategory::Rifts => 4,
            EffectCategory::GravityWells => 8,
            EffectCategory::Shockwaves => 12,
            _ => 6,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// How an effect's lifetime advances.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Life {
    /// Lives until removed by a power or a registry reset.
    Permanent,
    /// Frames remaining; removed at zero.
    Countdown(u32),
    /// Radius shrinks by `rate` per frame; removed at zero.
    Shrinking { rate: f32 },
    /// Radius grows by `rate` per frame; removed past `max_radius`.
    Expanding { rate: f32, max_radius: f32 },
}

/// Per-kind parameters of an effect.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectKind {
    Nebula { color: Vec3 },
    BlackHole { mass: f32, horizon: f32 },
    WhiteHole { strength: f32, emit_every: u32, timer: u32 },
    Star { mass: f32, color: Vec3 },
    Supergiant { mass: f32, emit_every: u32, timer: u32 },
    /// Twin-beam rotating pulsar. `angle` advances by `spin` per frame.
    Pulsar { angle: f32, spin: f32, beam_width: f32, strength: f32 },
    Quasar { angle: f32, spin: f32, jet_width: f32, strength: f32, emit_every: u32, timer: u32 },
    /// `exit: None` swallows whatever enters.
    Rift { exit: Option<Vec2> },
    Cloud { drag: f32, color: Vec3 },
    CrystallineField { snap_below: f32 },
    MicrowaveBackground { amplitude: f32 },
    SpacetimeFoam { amplitude: f32 },
    AcceleratorRing { width: f32, boost: f32 },
    EchoingVoid,
    NegativeSpace,
    PhaseZone,
    StasisField,
    TimeDilation { factor: f32 },
    GravityWell { strength: f32 },
    Shockwave { strength: f32, width: f32 },
}

impl EffectKind {
    /// Category this kind is stored under.
    pub fn category(&self) -> EffectCategory {
        match self {
            EffectKind::Nebula { .. } => EffectCategory::Nebulas,
            EffectKind::BlackHole { .. } => EffectCategory::BlackHoles,
            EffectKind::WhiteHole { .. } => EffectCategory::WhiteHoles,
            EffectKind::Star { .. } => EffectCategory::Stars,
            EffectKind::Supergiant { .. } => EffectCategory::Supergiants,
            EffectKind::Pulsar { .. } => EffectCategory::Pulsars,
            EffectKind::Quasar { .. } => EffectCategory::Quasars,
            EffectKind::Rift { .. } => EffectCategory::Rifts,
            EffectKind::Cloud { .. } => EffectCategory::Clouds,
            EffectKind::CrystallineField { .. } => EffectCategory::CrystallineFields,
            EffectKind::MicrowaveBackground { .. } => EffectCategory::MicrowaveBackground,
            EffectKind::SpacetimeFoam { .. } => EffectCategory::SpacetimeFoam,
            EffectKind::AcceleratorRing { .. } => EffectCategory::AcceleratorRings,
            EffectKind::EchoingVoid => EffectCategory::EchoingVoids,
            EffectKind::NegativeSpace => EffectCategory::NegativeSpaces,
            EffectKind::PhaseZone => EffectCategory::PhaseZones,
            EffectKind::StasisField => EffectCategory::StasisFields,
            EffectKind::TimeDilation { .. } => EffectCategory::TimeDilationZones,
            EffectKind::GravityWell { .. } => EffectCategory::GravityWells,
            EffectKind::Shockwave { .. } => EffectCategory::Shockwaves,
        }
    }
}

/// One live anomaly, zone or field.
#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    pub pos: Vec2,
    pub radius: f32,
    pub life: Life,
    pub kind: EffectKind,
}

impl Effect {
    pub fn new(pos: Vec2, radius: f32, life: Life, kind: EffectKind) -> Self {
        Self {
            pos,
            radius: radius.max(0.0),
            life,
            kind,
        }
    }

    /// Category this effect is stored under.
    pub fn category(&self) -> EffectCategory {
        self.kind.category()
    }

    /// Whether `point` lies inside the effect's radius.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        self.pos.distance_squared(point) < self.radius * self.radius
    }

    /// Advance the lifecycle by one frame. Returns `false` once expired.
    fn advance(&mut self) -> bool {
        match &mut self.kind {
            EffectKind::Pulsar { angle, spin, .. } | EffectKind::Quasar { angle, spin, .. } => {
                *angle = (*angle + *spin).rem_euclid(std::f32::consts::TAU);
            }
            _ => {}
        }

        match self.life {
            Life::Permanent => true,
            Life::Countdown(frames) => {
                let left = frames.saturating_sub(1);
                self.life = Life::Countdown(left);
                left > 0
            }
            Life::Shrinking { rate } => {
                self.radius = (self.radius - rate.max(0.0)).max(0.0);
                self.radius > 0.0
            }
            Life::Expanding { rate, max_radius } => {
                self.radius += rate.max(0.0);
                self.radius <= max_radius
            }
        }
    }
}

/// Live effects grouped by category.
#[derive(Clone, Debug)]
pub struct EffectRegistry {
    categories: Vec<VecDeque<Effect>>,
}

impl EffectRegistry {
    /// Create an empty registry with every category present.
    pub fn new() -> Self {
        Self {
            categories: (0..EffectCategory::COUNT).map(|_| VecDeque::new()).collect(),
        }
    }

    /// Clear every category.
    pub fn reset(&mut self) {
        for list in &mut self.categories {
            list.clear();
        }
    }

    /// Append an effect under `category`.
    ///
    /// Past the category cap, the oldest entry is dropped. Returns how many
    /// entries were dropped.
    pub fn add(&mut self, category: EffectCategory, effect: Effect) -> usize {
        debug_assert_eq!(category, effect.category(), "effect stored under wrong category");
        let list = &mut self.categories[category.index()];
        list.push_back(effect);
        let mut dropped = 0;
        while list.len() > category.cap() {
            list.pop_front();
            dropped += 1;
        }
        dropped
    }

    /// Append an effect under its own category.
    pub fn push(&mut self, effect: Effect) -> usize {
        self.add(effect.category(), effect)
    }

    /// Effects of one category in insertion order.
    pub fn iter(&self, category: EffectCategory) -> impl Iterator<Item = &Effect> {
        self.categories[category.index()].iter()
    }

    /// Every effect, category by category.
    pub fn iter_all(&self) -> impl Iterator<Item = &Effect> {
        self.categories.iter().flat_map(|list| list.iter())
    }

    /// Mutable access to one category.
    pub fn iter_mut(&mut self, category: EffectCategory) -> impl Iterator<Item = &mut Effect> {
        self.categories[category.index()].iter_mut()
    }

    /// Number of effects in a category.
    pub fn count(&self, category: EffectCategory) -> usize {
        self.categories[category.index()].len()
    }

    /// Total number of live effects.
    pub fn len(&self) -> usize {
        self.categories.iter().map(|list| list.len()).sum()
    }

    /// Whether the registry holds no effects at all.
    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|list| list.is_empty())
    }

    /// Index of the first effect in `category` within `radius` of `pos`.
    pub fn find_near(&self, category: EffectCategory, pos: Vec2, radius: f32) -> Option<usize> {
        let r_sq = radius * radius;
        self.categories[category.index()]
            .iter()
            .position(|e| e.pos.distance_squared(pos) <= r_sq)
    }

    /// Remove the effect at `index` in `category`.
    pub fn remove(&mut self, category: EffectCategory, index: usize) -> Option<Effect> {
        self.categories[category.index()].remove(index)
    }

    /// Advance every effect's lifecycle by one frame, dropping expired ones.
    ///
    /// Returns how many effects expired.
    pub fn tick(&mut self) -> usize {
        let mut expired = 0;
        for list in &mut self.categories {
            let before = list.len();
            list.retain_mut(|effect| effect.advance());
            expired += before - list.len();
        }
        expired
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well(x: f32) -> Effect {
        Effect::new(
            Vec2::new(x, 0.0),
            20.0,
            Life::Permanent,
            EffectKind::GravityWell { strength: 0.001 },
        )
    }

    #[test]
    fn test_every_category_starts_empty() {
        let fx = EffectRegistry::new();
        for category in EffectCategory::ALL {
            assert_eq!(fx.count(category), 0);
            assert_eq!(fx.iter(category).count(), 0);
        }
        assert!(fx.is_empty());
    }

    #[test]
    fn test_names_roundtrip() {
        for category in EffectCategory::ALL {
            assert_eq!(EffectCategory::from_name(category.name()), Some(category));
        }
        assert_eq!(EffectCategory::from_name("wormholes"), None);
        assert_eq!(EffectCategory::BlackHoles.name(), "blackHoles");
    }

    #[test]
    fn test_duplicates_allowed_in_order() {
        let mut fx = EffectRegistry::new();
        fx.push(well(1.0));
        fx.push(well(1.0));
        fx.push(well(2.0));
        let xs: Vec<f32> = fx.iter(EffectCategory::GravityWells).map(|e| e.pos.x).collect();
        assert_eq!(xs, vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut fx = EffectRegistry::new();
        let cap = EffectCategory::GravityWells.cap();
        for i in 0..(cap + 2) {
            fx.push(well(i as f32));
        }
        assert_eq!(fx.count(EffectCategory::GravityWells), cap);
        assert_eq!(fx.iter(EffectCategory::GravityWells).next().map(|e| e.pos.x), Some(2.0));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut fx = EffectRegistry::new();
        fx.push(well(0.0));
        fx.push(Effect::new(Vec2::ZERO, 10.0, Life::Permanent, EffectKind::PhaseZone));
        fx.reset();
        assert!(fx.is_empty());
    }

    #[test]
    fn test_countdown_expires() {
        let mut fx = EffectRegistry::new();
        fx.push(Effect::new(Vec2::ZERO, 10.0, Life::Countdown(3), EffectKind::StasisField));
        assert_eq!(fx.tick(), 0);
        assert_eq!(fx.tick(), 0);
        assert_eq!(fx.tick(), 1);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_shrinking_and_expanding() {
        let mut fx = EffectRegistry::new();
        fx.push(Effect::new(
            Vec2::ZERO,
            2.0,
            Life::Shrinking { rate: 1.0 },
            EffectKind::Nebula { color: Vec3::ONE },
        ));
        fx.push(Effect::new(
            Vec2::ZERO,
            0.0,
            Life::Expanding { rate: 10.0, max_radius: 25.0 },
            EffectKind::Shockwave { strength: 1.0, width: 5.0 },
        ));
        fx.tick(); // nebula 1.0, shockwave 10
        fx.tick(); // nebula 0.0 (gone), shockwave 20
        assert_eq!(fx.count(EffectCategory::Nebulas), 0);
        assert_eq!(fx.count(EffectCategory::Shockwaves), 1);
        fx.tick(); // shockwave 30 > 25
        assert!(fx.is_empty());
    }

    #[test]
    fn test_pulsar_rotates() {
        let mut fx = EffectRegistry::new();
        fx.push(Effect::new(
            Vec2::ZERO,
            100.0,
            Life::Permanent,
            EffectKind::Pulsar { angle: 0.0, spin: 0.5, beam_width: 0.1, strength: 1.0 },
        ));
        fx.tick();
        let pulsar = fx.iter(EffectCategory::Pulsars).next().unwrap();
        match &pulsar.kind {
            EffectKind::Pulsar { angle, .. } => assert!((angle - 0.5).abs() < 1e-6),
            other => panic!("unexpected {:?}", other),
        };
    }

    #[test]
    fn test_find_near_and_remove() {
        let mut fx = EffectRegistry::new();
        fx.push(well(0.0));
        fx.push(well(100.0));
        let idx = fx.find_near(EffectCategory::GravityWells, Vec2::new(98.0, 0.0), 30.0);
        assert_eq!(idx, Some(1));
        fx.remove(EffectCategory::GravityWells, 1);
        assert_eq!(fx.count(EffectCategory::GravityWells), 1);
    }
}
