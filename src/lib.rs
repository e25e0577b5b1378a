//! # Celestial Canvas
//!
//! An interactive particle universe. Each universe is drawn from a seed:
//! a blueprint picks two mouse-bound powers, a set of always-on mutators,
//! periodic events, starting anomalies and a cataclysm that fires when
//! the player pours in too much energy.
//!
//! The simulation runs on the CPU and is deterministic for a given seed and
//! input sequence. The GPU only draws the result.
//!
//! ## Quick Start
//!
//! ```ignore
//! use celestial::prelude::*;
//!
//! let seed = Seed::parse("andromeda");
//! let profile = UniverseProfile::from_seed(seed);
//! let mut sim = SimulationContext::new(CanvasConfig::default(), profile, seed)?;
//!
//! for frame in 0..600 {
//!     let input = FrameInput {
//!         cursor: Vec2::new(640.0, 360.0),
//!         left: frame % 120 < 40,
//!         right: false,
//!     };
//!     let report = sim.step(input);
//! }
//! ```
//!
//! Or open a window with [`run`].
//!
//! ## Core Concepts
//!
//! ### Particles
//!
//! [`Particles`] is a generational arena. Removal during a frame leaves a
//! tombstone; a single compact pass at the end of the frame drops them and
//! clears every relation (bond, chain, coral anchor) that pointed at one.
//!
//! ### Powers and Mutators
//!
//! A [`ContinuousPower`] acts on particles near the cursor every sub-step
//! while its button is held. A [`DiscretePower`] fires once per click.
//! A [`Mutator`] shapes every particle every sub-step regardless of input.
//!
//! ### Effects
//!
//! Anomalies, hazards and visual markers live in the [`EffectRegistry`],
//! one capped list per [`EffectCategory`].
//!
//! ### Energy and Cataclysms
//!
//! Holding a button charges [`EnergyState`]. Crossing the threshold starts
//! the profile's [`Cataclysm`]; when it completes the universe resets.

mod accumulator;
pub mod anomalies;
pub mod cataclysm;
pub mod color;
pub mod config;
pub mod effects;
pub mod energy;
pub mod error;
mod gpu;
pub mod input;
pub mod mutators;
pub mod particle;
pub mod powers;
pub mod seed;
pub mod shader;
mod simulation;
pub mod snapshot;
pub mod spawn;
pub mod time;
pub mod universe;
mod window;

pub use glam::{Vec2, Vec3};

pub use cataclysm::{Cataclysm, CataclysmSequence};
pub use color::Palette;
pub use config::CanvasConfig;
pub use effects::{Effect, EffectCategory, EffectKind, EffectRegistry, Life};
pub use energy::{EnergyConfig, EnergyEvent, EnergyState, Stability};
pub use error::{ConfigError, GpuError, RunError};
pub use gpu::{build_instances, GpuState, Instance};
pub use input::{FrameInput, Input, KeyCode, MouseButton};
pub use mutators::{Boundary, Mutator, MutatorSet};
pub use particle::{Particle, ParticleId, Particles, Species};
pub use powers::{ContinuousPower, DiscretePower, Power};
pub use seed::{Seed, SimRng};
pub use simulation::{FrameReport, SimulationContext};
pub use spawn::SpawnContext;
pub use time::FrameClock;
pub use universe::{Blueprint, ProfileSpec, UniverseProfile};
pub use window::{run, App, ProfileSource};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use celestial::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cataclysm::Cataclysm;
    pub use crate::config::CanvasConfig;
    pub use crate::effects::{EffectCategory, EffectRegistry};
    pub use crate::energy::{EnergyEvent, Stability};
    pub use crate::input::FrameInput;
    pub use crate::mutators::Mutator;
    pub use crate::particle::{Particle, ParticleId, Particles, Species};
    pub use crate::powers::{ContinuousPower, DiscretePower, Power};
    pub use crate::seed::Seed;
    pub use crate::simulation::{FrameReport, SimulationContext};
    pub use crate::universe::{ProfileSpec, UniverseProfile};
    pub use crate::{Vec2, Vec3};
}
