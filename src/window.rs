//! The interactive canvas window.
//!
//! [`App`] wires winit events into [`Input`], paces simulation frames with
//! [`FrameClock`] and hands the result to the GPU renderer.
//!
//! Controls: left/right mouse for the universe's powers, Space to pause,
//! R for the next universe, Escape to quit.

use std::sync::Arc;

use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::CanvasConfig;
use crate::energy::EnergyEvent;
use crate::error::{GpuError, RunError};
use crate::gpu::GpuState;
use crate::input::{Input, KeyCode};
use crate::seed::Seed;
use crate::simulation::SimulationContext;
use crate::time::FrameClock;
use crate::universe::UniverseProfile;

/// Where the next universe's profile comes from.
#[derive(Clone, Debug)]
pub enum ProfileSource {
    /// Drawn from each seed.
    Seeded,
    /// Always the same profile; R only changes the seed.
    Fixed(UniverseProfile),
}

impl ProfileSource {
    pub fn profile_for(&self, seed: Seed) -> UniverseProfile {
        match self {
            ProfileSource::Seeded => UniverseProfile::from_seed(seed),
            ProfileSource::Fixed(profile) => profile.clone(),
        }
    }
}

pub struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    sim: SimulationContext,
    source: ProfileSource,
    input: Input,
    clock: FrameClock,
    /// First fatal error; returned from [`run`] after the loop exits.
    failure: Option<GpuError>,
}

impl App {
    pub fn new(sim: SimulationContext, source: ProfileSource) -> Self {
        let clock = FrameClock::new(sim.config().frame_rate);
        Self {
            window: None,
            gpu_state: None,
            sim,
            source,
            input: Input::new(),
            clock,
            failure: None,
        }
    }

    /// Replace the running universe with the one for the next seed.
    fn next_universe(&mut self) {
        let seed = self.sim.seed().next();
        let profile = self.source.profile_for(seed);
        let bounds = self.sim.bounds();
        let mut config = self.sim.config().clone();
        config.width = bounds.x;
        config.height = bounds.y;
        match SimulationContext::new(config, profile, seed) {
            Ok(sim) => {
                if let Some(window) = &self.window {
                    window.set_title(&window_title(&sim));
                }
                self.sim = sim;
            }
            Err(e) => error!(seed = %seed, error = %e, "could not start next universe"),
        }
    }

    fn handle_keys(&mut self, event_loop: &ActiveEventLoop) {
        if self.input.key_pressed(KeyCode::Escape) {
            event_loop.exit();
        }
        if self.input.key_pressed(KeyCode::Space) {
            self.clock.toggle_pause();
            info!(paused = self.clock.is_paused(), "pause toggled");
        }
        if self.input.key_pressed(KeyCode::R) {
            self.next_universe();
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.handle_keys(event_loop);

        let frames = self.clock.tick();
        for _ in 0..frames {
            let report = self.sim.step(self.input.frame_input(self.sim.bounds()));
            if report.event == EnergyEvent::Triggered {
                info!(frame = report.frame, cataclysm = ?report.cataclysm, "threshold reached");
            }
        }
        self.input.begin_frame();

        if let Some(gpu_state) = &mut self.gpu_state {
            match gpu_state.render(&self.sim) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    warn!("surface lost, reconfiguring");
                    gpu_state.reconfigure();
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    error!("GPU out of memory");
                    event_loop.exit();
                }
                Err(e) => warn!(error = ?e, "render error"),
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let bounds = self.sim.bounds();
        let window_attrs = Window::default_attributes()
            .with_title(window_title(&self.sim))
            .with_inner_size(winit::dpi::PhysicalSize::new(bounds.x as u32, bounds.y as u32));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!(error = %e, "failed to create window");
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.input.set_window_size(size.width, size.height);

        match pollster::block_on(GpuState::new(window.clone())) {
            Ok(gpu_state) => self.gpu_state = Some(gpu_state),
            Err(e) => {
                error!(error = %e, "GPU initialization failed");
                self.failure = Some(e);
                event_loop.exit();
                return;
            }
        }
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if physical_size.width > 0 && physical_size.height > 0 {
                    self.input.set_window_size(physical_size.width, physical_size.height);
                    self.sim
                        .resize(physical_size.width as f32, physical_size.height as f32);
                }
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn window_title(sim: &SimulationContext) -> String {
    format!("Celestial Canvas - {} ({})", sim.profile().name, sim.seed())
}

/// Open the canvas window and run until it is closed.
pub fn run(config: CanvasConfig, source: ProfileSource, seed: Seed) -> Result<(), RunError> {
    let profile = source.profile_for(seed);
    let sim = SimulationContext::new(config, profile, seed)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(sim, source);
    event_loop.run_app(&mut app)?;

    match app.failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
