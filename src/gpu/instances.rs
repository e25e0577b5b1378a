//! CPU-side instance building.
//!
//! Every frame the renderer flattens the effect registry and the particle
//! arena into one instance buffer. Effects go first so particles draw on
//! top of them.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::effects::{Effect, EffectKind, EffectRegistry};
use crate::particle::{Particles, Species};

/// Instance kinds understood by the canvas shader.
pub const KIND_DOT: u32 = 0;
pub const KIND_HALO: u32 = 1;
pub const KIND_RING: u32 = 2;
pub const KIND_SHARD: u32 = 3;
pub const KIND_STAR: u32 = 4;

/// One quad drawn by the canvas shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Instance {
    /// Centre in canvas pixels.
    pub center: [f32; 2],
    pub radius: f32,
    pub kind: u32,
    /// Straight (non-premultiplied) RGBA.
    pub color: [f32; 4],
}

impl Instance {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32, 2 => Uint32, 3 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Instance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }

    fn new(center: Vec2, radius: f32, kind: u32, color: Vec3, alpha: f32) -> Self {
        Self {
            center: center.to_array(),
            radius,
            kind,
            color: [color.x, color.y, color.z, alpha.clamp(0.0, 1.0)],
        }
    }
}

/// Build the draw list for one frame.
pub fn build_instances(particles: &Particles, effects: &EffectRegistry, out: &mut Vec<Instance>) {
    out.clear();
    out.reserve(effects.len() + particles.len());
    for effect in effects.iter_all() {
        if let Some(instance) = effect_instance(effect) {
            out.push(instance);
        }
    }
    for (_, p) in particles.iter() {
        let kind = match p.species {
            Species::Shard => KIND_SHARD,
            Species::Star => KIND_STAR,
            _ => KIND_DOT,
        };
        out.push(Instance::new(p.pos, p.radius, kind, p.color, p.opacity));
    }
}

fn effect_instance(effect: &Effect) -> Option<Instance> {
    let (kind, color, alpha) = match effect.kind {
        EffectKind::Nebula { color } => (KIND_HALO, color, 0.25),
        EffectKind::BlackHole { .. } => (KIND_HALO, Vec3::new(0.35, 0.0, 0.45), 0.5),
        EffectKind::WhiteHole { .. } => (KIND_HALO, Vec3::ONE, 0.35),
        EffectKind::Star { color, .. } => (KIND_HALO, color, 0.3),
        EffectKind::Supergiant { .. } => (KIND_HALO, Vec3::new(1.0, 0.55, 0.2), 0.3),
        EffectKind::Pulsar { .. } => (KIND_HALO, Vec3::new(0.6, 0.8, 1.0), 0.15),
        EffectKind::Quasar { .. } => (KIND_HALO, Vec3::new(0.9, 0.6, 1.0), 0.15),
        EffectKind::Rift { .. } => (KIND_RING, Vec3::new(0.8, 0.2, 1.0), 0.8),
        EffectKind::Cloud { color, .. } => (KIND_HALO, color, 0.2),
        EffectKind::CrystallineField { .. } => (KIND_RING, Vec3::new(0.6, 0.9, 1.0), 0.4),
        // Global: covers the whole canvas, nothing to draw.
        EffectKind::MicrowaveBackground { .. } => return None,
        EffectKind::SpacetimeFoam { .. } => (KIND_HALO, Vec3::new(0.5, 0.5, 0.7), 0.12),
        EffectKind::AcceleratorRing { .. } => (KIND_RING, Vec3::new(1.0, 0.85, 0.3), 0.7),
        EffectKind::EchoingVoid => (KIND_RING, Vec3::new(0.4, 0.4, 0.5), 0.5),
        EffectKind::NegativeSpace => (KIND_HALO, Vec3::ZERO, 0.9),
        EffectKind::PhaseZone => (KIND_RING, Vec3::new(0.3, 1.0, 0.8), 0.4),
        EffectKind::StasisField => (KIND_RING, Vec3::new(0.7, 0.7, 1.0), 0.5),
        EffectKind::TimeDilation { factor } => {
            let tint = if factor >= 1.0 {
                Vec3::new(1.0, 0.5, 0.3)
            } else {
                Vec3::new(0.3, 0.5, 1.0)
            };
            (KIND_RING, tint, 0.4)
        }
        EffectKind::GravityWell { .. } => (KIND_RING, Vec3::new(0.9, 0.9, 0.9), 0.6),
        EffectKind::Shockwave { .. } => (KIND_RING, Vec3::ONE, 0.6),
    };
    if effect.radius <= 0.0 {
        return None;
    }
    Some(Instance::new(effect.pos, effect.radius, kind, color, alpha))
}

/// Screen-shake offset in pixels while the energy warning is active.
pub fn shake_offset(frame: u64, warning: bool) -> Vec2 {
    if !warning {
        return Vec2::ZERO;
    }
    let t = frame as f32;
    Vec2::new((t * 1.7).sin(), (t * 2.3).cos()) * 3.0
}
