//! Read-only frame snapshot of the particle population.
//!
//! Neighbour scans and relation look-ups read the snapshot taken before the
//! particle pass, never the live collection, so every particle in a pass
//! sees the same neighbourhood regardless of iteration order.

use crate::particle::{ParticleId, Particles, Species};
use glam::{Vec2, Vec3};
use slotmap::SecondaryMap;

/// What neighbours can see of a particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleView {
    pub id: ParticleId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: Vec3,
    pub species: Species,
    pub infected: bool,
    pub coral: bool,
    pub entangled: bool,
    pub bond: Option<ParticleId>,
}

/// Snapshot of every live particle at the start of a pass.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    views: Vec<ParticleView>,
    index: SecondaryMap<ParticleId, usize>,
}

impl Snapshot {
    /// Capture the live population in insertion order.
    pub fn capture(particles: &Particles) -> Self {
        let mut views = Vec::with_capacity(particles.len());
        let mut index = SecondaryMap::with_capacity(particles.len());
        for (id, p) in particles.iter() {
            index.insert(id, views.len());
            views.push(ParticleView {
                id,
                pos: p.pos,
                vel: p.vel,
                radius: p.radius,
                color: p.color,
                species: p.species,
                infected: p.infected,
                coral: p.coral,
                entangled: p.entangled,
                bond: p.bond,
            });
        }
        Self { views, index }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// View of a particle, if it was live when the snapshot was taken.
    pub fn get(&self, id: ParticleId) -> Option<&ParticleView> {
        self.index.get(id).map(|&i| &self.views[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleView> {
        self.views.iter()
    }

    /// Views within `radius` of `pos`, excluding `skip`.
    pub fn neighbours(
        &self,
        pos: Vec2,
        radius: f32,
        skip: ParticleId,
    ) -> impl Iterator<Item = &ParticleView> {
        let r_sq = radius * radius;
        self.views
            .iter()
            .filter(move |v| v.id != skip && v.pos.distance_squared(pos) <= r_sq)
    }

    /// Nearest view to `pos` within `max_dist` accepted by `filter`.
    pub fn nearest_by(
        &self,
        pos: Vec2,
        max_dist: f32,
        mut filter: impl FnMut(&ParticleView) -> bool,
    ) -> Option<&ParticleView> {
        let max_sq = max_dist * max_dist;
        let mut best: Option<(&ParticleView, f32)> = None;
        for v in &self.views {
            let d = v.pos.distance_squared(pos);
            if d <= max_sq && best.map_or(true, |(_, bd)| d < bd) && filter(v) {
                best = Some((v, d));
            }
        }
        best.map(|(v, _)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;

    fn dot(x: f32) -> Particle {
        Particle::new(Vec2::new(x, 0.0), Vec2::ZERO, 2.0, Vec3::ONE, Species::Dust, 0.0)
    }

    #[test]
    fn test_capture_skips_tombstoned() {
        let mut particles = Particles::new(16);
        let a = particles.spawn(dot(0.0));
        let b = particles.spawn(dot(10.0));
        particles.remove(a);
        let snap = Snapshot::capture(&particles);
        assert_eq!(snap.len(), 1);
        assert!(snap.get(a).is_none());
        assert_eq!(snap.get(b).map(|v| v.pos.x), Some(10.0));
    }

    #[test]
    fn test_neighbours_exclude_self() {
        let mut particles = Particles::new(16);
        let a = particles.spawn(dot(0.0));
        particles.spawn(dot(5.0));
        particles.spawn(dot(100.0));
        let snap = Snapshot::capture(&particles);
        let near: Vec<f32> = snap.neighbours(Vec2::ZERO, 10.0, a).map(|v| v.pos.x).collect();
        assert_eq!(near, vec![5.0]);
    }

    #[test]
    fn test_nearest_by_filter() {
        let mut particles = Particles::new(16);
        particles.spawn(dot(1.0));
        let far = particles.spawn(dot(3.0));
        let snap = Snapshot::capture(&particles);
        let found = snap.nearest_by(Vec2::ZERO, 10.0, |v| v.pos.x > 2.0);
        assert_eq!(found.map(|v| v.id), Some(far));
    }
}
