//! Spawn context for particle creation.
//!
//! Every place that creates particles (the initial population, discrete
//! powers, anomaly spawners, cataclysm reseeding) goes through a
//! [`SpawnContext`] so species, radius and color are drawn the same way.
//!
//! ```ignore
//! let mut ctx = SpawnContext::new(&mut rng, palette, &shapes, bounds);
//! let pos = ctx.random_on_canvas();
//! let vel = ctx.random_velocity(0.5);
//! particles.spawn(ctx.particle(pos, vel));
//! ```

use crate::color::Palette;
use crate::particle::{Particle, Species};
use crate::seed::{random_direction, SimRng};
use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use std::f32::consts::TAU;

/// Helpers for drawing new particles from the simulation RNG.
pub struct SpawnContext<'a> {
    /// Canvas size in pixels.
    pub bounds: Vec2,
    palette: Palette,
    shapes: &'a [Species],
    rng: &'a mut SimRng,
}

impl<'a> SpawnContext<'a> {
    /// Create a spawn context. An empty shape set spawns [`Species::Dust`].
    pub fn new(rng: &'a mut SimRng, palette: Palette, shapes: &'a [Species], bounds: Vec2) -> Self {
        Self {
            bounds,
            palette,
            shapes,
            rng,
        }
    }

    // ========== Random primitives ==========

    /// Random f32 between 0.0 and 1.0.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in the given range. Returns `min` for an empty range.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    // ========== Position helpers ==========

    /// Uniform point on the canvas.
    pub fn random_on_canvas(&mut self) -> Vec2 {
        Vec2::new(
            self.random_range(0.0, self.bounds.x),
            self.random_range(0.0, self.bounds.y),
        )
    }

    /// Uniform point inside a disc.
    pub fn random_in_disc(&mut self, center: Vec2, radius: f32) -> Vec2 {
        let angle = self.rng.gen_range(0.0..TAU);
        // Square root for uniform area distribution
        let r = radius * self.rng.gen::<f32>().sqrt();
        center + Vec2::new(angle.cos(), angle.sin()) * r
    }

    // ========== Velocity helpers ==========

    /// Random direction with speed up to `max_speed`.
    pub fn random_velocity(&mut self, max_speed: f32) -> Vec2 {
        let speed = self.random_range(0.0, max_speed);
        random_direction(&mut *self.rng, speed)
    }

    /// Velocity pointing away from `center` with the given speed.
    pub fn outward(&mut self, center: Vec2, pos: Vec2, speed: f32) -> Vec2 {
        let dir = (pos - center).normalize_or_zero();
        if dir == Vec2::ZERO {
            random_direction(&mut *self.rng, speed)
        } else {
            dir * speed
        }
    }

    // ========== Particles ==========

    /// Species drawn from the shape set.
    pub fn species(&mut self) -> Species {
        self.shapes.choose(&mut *self.rng).copied().unwrap_or_default()
    }

    /// A new particle with random species, radius, color and phase.
    pub fn particle(&mut self, pos: Vec2, vel: Vec2) -> Particle {
        let species = self.species();
        self.particle_of(species, pos, vel)
    }

    /// A new particle of a given species.
    pub fn particle_of(&mut self, species: Species, pos: Vec2, vel: Vec2) -> Particle {
        let (lo, hi) = species.radius_range();
        let radius = self.random_range(lo, hi);
        let color = self.palette.random(&mut *self.rng);
        let seed = self.random();
        Particle::new(pos, vel, radius, color, species, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::Seed;

    #[test]
    fn test_particles_respect_species_range() {
        let mut rng = Seed(3).rng();
        let shapes = [Species::Orb];
        let mut ctx = SpawnContext::new(&mut rng, Palette::Fire, &shapes, Vec2::new(800.0, 600.0));
        for _ in 0..32 {
            let p = ctx.particle(Vec2::ZERO, Vec2::ZERO);
            let (lo, hi) = Species::Orb.radius_range();
            assert_eq!(p.species, Species::Orb);
            assert!(p.radius >= lo && p.radius < hi);
            assert!(!p.below_floor());
        }
    }

    #[test]
    fn test_canvas_points_in_bounds() {
        let mut rng = Seed(4).rng();
        let mut ctx = SpawnContext::new(&mut rng, Palette::Cosmic, &[], Vec2::new(100.0, 50.0));
        for _ in 0..64 {
            let p = ctx.random_on_canvas();
            assert!(p.x >= 0.0 && p.x < 100.0 && p.y >= 0.0 && p.y < 50.0);
        }
        assert_eq!(ctx.species(), Species::Dust);
    }

    #[test]
    fn test_disc_points_in_radius() {
        let mut rng = Seed(5).rng();
        let mut ctx = SpawnContext::new(&mut rng, Palette::Cosmic, &[], Vec2::splat(100.0));
        let center = Vec2::new(50.0, 50.0);
        for _ in 0..64 {
            assert!(ctx.random_in_disc(center, 10.0).distance(center) <= 10.0 + 1e-4);
        }
    }
}
