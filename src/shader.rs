//! WGSL sources and the uniform block they share with the CPU.

use bytemuck::{Pod, Zeroable};

/// Canvas pass: instanced effects and particles, plus the trail fade.
pub const CANVAS_SOURCE: &str = include_str!("shaders/canvas.wgsl");
/// Copies the canvas texture to the surface.
pub const PRESENT_SOURCE: &str = include_str!("shaders/present.wgsl");

/// Background color the canvas fades toward.
pub const BACKGROUND: [f32; 3] = [0.01, 0.01, 0.03];

/// Mirrors `Uniforms` in `canvas.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Uniforms {
    /// Canvas size in pixels.
    pub canvas: [f32; 2],
    /// Screen-shake offset in pixels.
    pub shake: [f32; 2],
    pub background: [f32; 3],
    pub glow: f32,
    /// Alpha of the per-frame fade quad. `1.0` clears.
    pub fade: f32,
    pub _padding: [f32; 3],
}

impl Uniforms {
    pub fn new(canvas: [f32; 2], shake: [f32; 2], glow: f32, trails: f32) -> Self {
        Self {
            canvas,
            shake,
            background: BACKGROUND,
            glow: glow.max(0.0),
            fade: 1.0 - trails.clamp(0.0, 0.98),
            _padding: [0.0; 3],
        }
    }
}
