//! Energy accumulation and the Stable/Unstable state machine.
//!
//! Sustained input charges the universe. Crossing the threshold while
//! stable makes it unstable and starts the profile's cataclysm; only the
//! cataclysm's completion brings it back via [`EnergyState::reset`].

use serde::{Deserialize, Serialize};

/// Whether the universe is charging or has tipped into a cataclysm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stability {
    #[default]
    Stable,
    Unstable,
}

/// What an energy update produced this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnergyEvent {
    None,
    /// At or above the warning fraction. Visual only.
    Warning,
    /// Crossed the threshold; fired exactly once per cycle.
    Triggered,
}

/// Fraction of `max_energy` at which the warning shake starts.
pub const WARNING_FRACTION: f32 = 0.95;

/// Tunable energy constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    pub max_energy: f32,
    /// Added on frames where any button is held.
    pub rise_rate: f32,
    /// Removed on frames with no button held.
    pub decay_rate: f32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            max_energy: 1000.0,
            rise_rate: 10.0,
            decay_rate: 2.0,
        }
    }
}

/// Energy level plus the stability state.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyState {
    energy: f32,
    state: Stability,
    config: EnergyConfig,
}

impl EnergyState {
    pub fn new(config: EnergyConfig) -> Self {
        Self {
            energy: 0.0,
            state: Stability::Stable,
            config,
        }
    }

    pub fn energy(&self) -> f32 {
        self.energy
    }

    pub fn max_energy(&self) -> f32 {
        self.config.max_energy
    }

    pub fn state(&self) -> Stability {
        self.state
    }

    /// Energy as a fraction of the threshold, clamped to `0..=1`.
    pub fn fraction(&self) -> f32 {
        if self.config.max_energy <= 0.0 {
            return 1.0;
        }
        (self.energy / self.config.max_energy).clamp(0.0, 1.0)
    }

    /// Whether the warning shake should be drawn.
    pub fn is_warning(&self) -> bool {
        self.state == Stability::Stable
            && self.energy >= WARNING_FRACTION * self.config.max_energy
    }

    /// Advance one frame.
    pub fn update(&mut self, any_held: bool) -> EnergyEvent {
        if any_held {
            self.energy += self.config.rise_rate.max(0.0);
        } else {
            self.energy -= self.config.decay_rate.max(0.0);
        }
        self.energy = self.energy.max(0.0);

        if self.state != Stability::Stable {
            return EnergyEvent::None;
        }
        if self.energy >= self.config.max_energy {
            self.state = Stability::Unstable;
            EnergyEvent::Triggered
        } else if self.is_warning() {
            EnergyEvent::Warning
        } else {
            EnergyEvent::None
        }
    }

    /// Back to Stable with zero energy. Called when a cataclysm completes.
    pub fn reset(&mut self) {
        self.energy = 0.0;
        self.state = Stability::Stable;
    }
}

impl Default for EnergyState {
    fn default() -> Self {
        Self::new(EnergyConfig::default())
    }
}
