//! Particles and the particle arena.
//!
//! Particles live in a generational [`SlotMap`]. Relations between
//! particles (bonds, chains, coral anchors) are [`ParticleId`] handles, so a
//! removed particle's slot being reused can never be mistaken for the
//! original referent.
//!
//! Removal is two-phase: [`Particles::remove`] only tombstones, and
//! [`Particles::compact`] drops tombstoned particles and nulls every
//! relation pointing at them. The force accumulator compacts once per pass.

use glam::{Vec2, Vec3};
use slotmap::{new_key_type, SecondaryMap, SlotMap};
use std::collections::VecDeque;

new_key_type! {
    /// Stable handle for a particle backed by a generational slot map.
    pub struct ParticleId;
}

/// Number of positions kept in a particle's echo history.
pub const HISTORY_LEN: usize = 30;

/// Particle species, which doubles as the shape tag for rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Species {
    #[default]
    Dust,
    Spark,
    Orb,
    Shard,
    Comet,
    Star,
}

impl Species {
    /// All species in catalog order.
    pub const ALL: [Species; 6] = [
        Species::Dust,
        Species::Spark,
        Species::Orb,
        Species::Shard,
        Species::Comet,
        Species::Star,
    ];

    /// Radius at or below which a particle of this species is removed.
    pub fn min_radius(&self) -> f32 {
        match self {
            Species::Dust => 0.3,
            Species::Spark => 0.2,
            Species::Orb => 0.6,
            Species::Shard => 0.25,
            Species::Comet => 0.4,
            Species::Star => 0.5,
        }
    }

    /// Base radius range for freshly spawned particles.
    pub fn radius_range(&self) -> (f32, f32) {
        match self {
            Species::Dust => (1.0, 2.5),
            Species::Spark => (0.8, 1.8),
            Species::Orb => (2.5, 5.0),
            Species::Shard => (1.2, 2.4),
            Species::Comet => (1.5, 3.0),
            Species::Star => (2.0, 4.0),
        }
    }

    /// Resolve a species by its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dust" => Some(Species::Dust),
            "spark" => Some(Species::Spark),
            "orb" => Some(Species::Orb),
            "shard" => Some(Species::Shard),
            "comet" => Some(Species::Comet),
            "star" => Some(Species::Star),
            _ => None,
        }
    }

    /// Index used by the renderer to pick a shape.
    pub fn shape_index(&self) -> u32 {
        *self as u32
    }

    /// Parity used by species-sensitive forces such as `magnetize`.
    pub fn polarity(&self) -> f32 {
        if self.shape_index() % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    }
}

/// A single simulated particle.
#[derive(Clone, Debug)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Reference radius for decay and pulse math. Never mutated.
    pub initial_radius: f32,
    pub color: Vec3,
    /// Locked colors are ignored by ambient recoloring.
    pub color_locked: bool,
    pub opacity: f32,
    pub species: Species,

    pub infected: bool,
    pub crystalized: bool,
    pub entangled: bool,
    pub coral: bool,

    /// Remaining sub-steps of a fade-out.
    pub fading: u32,
    /// Remaining sub-steps of a consumption (shrink to nothing).
    pub consumed: u32,
    /// Remaining sub-steps of an unravelling.
    pub unravelling: u32,

    pub bond: Option<ParticleId>,
    pub chain_parent: Option<ParticleId>,
    pub chain_child: Option<ParticleId>,
    pub coral_anchor: Option<ParticleId>,

    /// Per-particle random phase in `0..1`.
    pub seed: f32,
    /// Recent positions, oldest first.
    pub history: VecDeque<Vec2>,
    /// Sub-steps lived.
    pub age: u64,
    /// Spawn order; smaller is older. Assigned by the arena.
    pub serial: u64,

    tombstoned: bool,
}

impl Particle {
    /// Create a particle with the given kinematics and appearance.
    pub fn new(pos: Vec2, vel: Vec2, radius: f32, color: Vec3, species: Species, seed: f32) -> Self {
        let radius = radius.max(0.0);
        Self {
            pos,
            vel,
            radius,
            initial_radius: radius,
            color,
            color_locked: false,
            opacity: 1.0,
            species,
            infected: false,
            crystalized: false,
            entangled: false,
            coral: false,
            fading: 0,
            consumed: 0,
            unravelling: 0,
            bond: None,
            chain_parent: None,
            chain_child: None,
            coral_anchor: None,
            seed,
            history: VecDeque::new(),
            age: 0,
            serial: 0,
            tombstoned: false,
        }
    }

    /// Copy of this particle suitable for spawning as a new particle.
    ///
    /// Relations, countdowns and history are not inherited.
    pub fn offspring(&self) -> Self {
        let mut child = Particle::new(
            self.pos,
            self.vel,
            self.radius,
            self.color,
            self.species,
            self.seed,
        );
        child.initial_radius = self.initial_radius;
        child.color_locked = self.color_locked;
        child.opacity = self.opacity;
        child.infected = self.infected;
        child
    }

    /// Whether any removal countdown is running.
    pub fn is_dying(&self) -> bool {
        self.fading > 0 || self.consumed > 0 || self.unravelling > 0
    }

    /// Start a fade-out unless a countdown is already running.
    ///
    /// Countdowns are never restarted, so the measured quantity keeps
    /// decreasing monotonically.
    pub fn start_fading(&mut self, steps: u32) {
        if self.fading == 0 && steps > 0 {
            self.fading = steps;
        }
    }

    /// Start a consumption unless one is already running.
    pub fn start_consumed(&mut self, steps: u32) {
        if self.consumed == 0 && steps > 0 {
            self.consumed = steps;
        }
    }

    /// Start an unravelling unless one is already running.
    pub fn start_unravelling(&mut self, steps: u32) {
        if self.unravelling == 0 && steps > 0 {
            self.unravelling = steps;
        }
    }

    /// Cancel every countdown without restoring what they took.
    pub fn mend(&mut self) {
        self.fading = 0;
        self.consumed = 0;
        self.unravelling = 0;
    }

    /// Set opacity, clamped to `0..=1`.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
    }

    /// Set radius, clamped to be non-negative.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = if radius.is_nan() { 0.0 } else { radius.max(0.0) };
    }

    /// Whether the radius has fallen to the species floor.
    pub fn below_floor(&self) -> bool {
        self.radius <= self.species.min_radius()
    }

    /// Record the current position in the echo history.
    pub fn record_history(&mut self) {
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(self.pos);
    }

    /// Whether this particle has been removed but not yet compacted.
    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned
    }
}

/// The particle collection.
///
/// Iteration is insertion order, which keeps seeded runs deterministic.
#[derive(Clone, Debug)]
pub struct Particles {
    arena: SlotMap<ParticleId, Particle>,
    order: Vec<ParticleId>,
    live: usize,
    cap: usize,
    next_serial: u64,
}

impl Particles {
    /// Create an empty collection holding at most `cap` live particles.
    pub fn new(cap: usize) -> Self {
        Self {
            arena: SlotMap::with_key(),
            order: Vec::new(),
            live: 0,
            cap: cap.max(1),
            next_serial: 0,
        }
    }

    /// Maximum number of live particles.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Number of live (non-tombstoned) particles.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether there are no live particles.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Insert a particle, dropping the oldest live particles past the cap.
    pub fn spawn(&mut self, mut particle: Particle) -> ParticleId {
        particle.serial = self.next_serial;
        particle.tombstoned = false;
        self.next_serial += 1;

        let id = self.arena.insert(particle);
        self.order.push(id);
        self.live += 1;

        if self.live > self.cap {
            let excess = self.live - self.cap;
            let oldest: Vec<ParticleId> = self
                .order
                .iter()
                .copied()
                .filter(|&other| other != id && self.contains(other))
                .take(excess)
                .collect();
            for other in oldest {
                self.remove(other);
            }
        }
        id
    }

    /// Whether `id` refers to a live particle.
    pub fn contains(&self, id: ParticleId) -> bool {
        self.arena.get(id).is_some_and(|p| !p.tombstoned)
    }

    /// Live particle by handle.
    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.arena.get(id).filter(|p| !p.tombstoned)
    }

    /// Mutable live particle by handle.
    pub fn get_mut(&mut self, id: ParticleId) -> Option<&mut Particle> {
        self.arena.get_mut(id).filter(|p| !p.tombstoned)
    }

    /// Tombstone a particle. Returns `true` only the first time.
    pub fn remove(&mut self, id: ParticleId) -> bool {
        match self.arena.get_mut(id) {
            Some(p) if !p.tombstoned => {
                p.tombstoned = true;
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Drop tombstoned particles and null relations pointing at them.
    ///
    /// Returns how many particles were dropped.
    pub fn compact(&mut self) -> usize {
        let dead: SecondaryMap<ParticleId, ()> = self
            .order
            .iter()
            .copied()
            .filter(|&id| self.arena.get(id).is_some_and(|p| p.tombstoned))
            .map(|id| (id, ()))
            .collect();
        if dead.is_empty() {
            return 0;
        }

        for id in dead.keys() {
            self.arena.remove(id);
        }
        let arena = &self.arena;
        self.order.retain(|id| arena.contains_key(*id));

        for p in self.arena.values_mut() {
            for link in [
                &mut p.bond,
                &mut p.chain_parent,
                &mut p.chain_child,
                &mut p.coral_anchor,
            ] {
                if link.is_some_and(|other| dead.contains_key(other)) {
                    *link = None;
                }
            }
            if p.bond.is_none() {
                p.entangled = false;
            }
        }
        dead.len()
    }

    /// Handles of live particles in insertion order.
    pub fn ids(&self) -> Vec<ParticleId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.contains(id))
            .collect()
    }

    /// Live particles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ParticleId, &Particle)> {
        self.order.iter().filter_map(move |&id| {
            self.arena
                .get(id)
                .filter(|p| !p.tombstoned)
                .map(|p| (id, p))
        })
    }

    /// Mutable access to every live particle, in slot order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.arena.values_mut().filter(|p| !p.tombstoned)
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.order.clear();
        self.live = 0;
    }

    /// Nearest live particle to `pos` within `max_dist`, excluding `skip`.
    pub fn nearest(&self, pos: Vec2, max_dist: f32, skip: Option<ParticleId>) -> Option<ParticleId> {
        let max_sq = max_dist * max_dist;
        let mut best: Option<(ParticleId, f32)> = None;
        for (id, p) in self.iter() {
            if Some(id) == skip {
                continue;
            }
            let d = p.pos.distance_squared(pos);
            if d <= max_sq && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Live particles within `radius` of `pos`, in insertion order.
    pub fn within(&self, pos: Vec2, radius: f32) -> Vec<ParticleId> {
        let r_sq = radius * radius;
        self.iter()
            .filter(|(_, p)| p.pos.distance_squared(pos) <= r_sq)
            .map(|(id, _)| id)
            .collect()
    }
}
