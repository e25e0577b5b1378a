//! Input handling.
//!
//! The window layer feeds raw winit events into [`Input`], which tracks
//! instantaneous events (key just pressed) and continuous state (button
//! held). Once per frame it is flattened into a [`FrameInput`], the only
//! input the simulation ever sees.
//!
//! ```ignore
//! let frame = input.frame_input(canvas_size);
//! let report = sim.step(frame);
//! input.begin_frame();
//! ```

use glam::Vec2;
use std::collections::HashSet;
use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};

/// The per-frame input snapshot consumed by the simulation.
///
/// Sampled once at the start of a step and held for its duration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Cursor position in canvas pixels.
    pub cursor: Vec2,
    pub left: bool,
    pub right: bool,
}

impl FrameInput {
    /// No buttons held.
    pub fn idle(cursor: Vec2) -> Self {
        Self {
            cursor,
            left: false,
            right: false,
        }
    }

    pub fn any_held(&self) -> bool {
        self.left || self.right
    }
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn from_winit(btn: WinitMouseButton) -> Option<Self> {
        match btn {
            WinitMouseButton::Left => Some(MouseButton::Left),
            WinitMouseButton::Right => Some(MouseButton::Right),
            WinitMouseButton::Middle => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

/// Keys the canvas responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Pause and resume.
    Space,
    /// Next universe.
    R,
    /// Quit.
    Escape,
    Other(u32),
}

impl From<WinitKeyCode> for KeyCode {
    fn from(key: WinitKeyCode) -> Self {
        match key {
            WinitKeyCode::Space => KeyCode::Space,
            WinitKeyCode::KeyR => KeyCode::R,
            WinitKeyCode::Escape => KeyCode::Escape,
            _ => KeyCode::Other(key as u32),
        }
    }
}

/// Input state tracking for keyboard and mouse.
#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,

    mouse_held: HashSet<MouseButton>,
    mouse_pressed: HashSet<MouseButton>,

    /// Cursor in physical window pixels.
    mouse_position: Vec2,
    window_size: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self {
            window_size: Vec2::new(800.0, 600.0),
            ..Default::default()
        }
    }

    // ========== Key Queries ==========

    /// Check if a key was pressed this frame (just went down).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if a key is currently held down.
    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    // ========== Mouse Queries ==========

    /// Check if a mouse button was pressed this frame.
    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed.contains(&button)
    }

    /// Check if a mouse button is currently held down.
    pub fn mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    /// Mouse position in physical window pixels.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Flatten into the simulation's input snapshot.
    ///
    /// The cursor is mapped from window pixels onto the canvas. A press
    /// released within the same frame still counts as held for that frame,
    /// so quick clicks produce a click edge.
    pub fn frame_input(&self, canvas: Vec2) -> FrameInput {
        let scale = if self.window_size.x > 0.0 && self.window_size.y > 0.0 {
            canvas / self.window_size
        } else {
            Vec2::ONE
        };
        let down = |b| self.mouse_held(b) || self.mouse_pressed(b);
        FrameInput {
            cursor: self.mouse_position * scale,
            left: down(MouseButton::Left),
            right: down(MouseButton::Right),
        }
    }

    // ========== Internal Methods ==========

    /// Called at the end of each frame to clear per-frame state.
    pub(crate) fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_pressed.clear();
    }

    pub(crate) fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = Vec2::new(width as f32, height as f32);
    }

    /// Process a winit window event.
    pub(crate) fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    let key = KeyCode::from(keycode);
                    match event.state {
                        ElementState::Pressed => {
                            // Only fire pressed event if not already held (no repeat)
                            if !self.keys_held.contains(&key) {
                                self.keys_pressed.insert(key);
                            }
                            self.keys_held.insert(key);
                        }
                        ElementState::Released => {
                            self.keys_held.remove(&key);
                        }
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(btn) = MouseButton::from_winit(*button) {
                    match state {
                        ElementState::Pressed => {
                            self.mouse_pressed.insert(btn);
                            self.mouse_held.insert(btn);
                        }
                        ElementState::Released => {
                            self.mouse_held.remove(&btn);
                        }
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = Vec2::new(position.x as f32, position.y as f32);
            }

            WindowEvent::CursorLeft { .. } => {
                // Releases outside the window are never delivered.
                self.mouse_held.clear();
            }

            _ => {}
        }
    }
}
