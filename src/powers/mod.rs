//! Player powers bound to mouse buttons.
//!
//! Powers come in two disjoint tables:
//!
//! - [`ContinuousPower`]: applied to every eligible particle on every
//!   sub-step while the bound button is held. Each has an activation radius
//!   around the cursor.
//! - [`DiscretePower`]: applied once per click edge. May scan the whole
//!   population, spawn or remove particles, or push registry effects.
//!
//! Profiles name powers by string; [`Power::from_name`] resolves them once
//! at load time so the per-particle path never matches strings.

mod continuous;
mod discrete;

pub use continuous::ContinuousPower;
pub use discrete::{DiscreteCtx, DiscretePower};

pub(crate) use continuous::apply_continuous;
pub(crate) use discrete::apply_discrete;

/// A resolved power binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Power {
    Continuous(ContinuousPower),
    Discrete(DiscretePower),
}

impl Power {
    /// Resolve a power name from either table.
    pub fn from_name(name: &str) -> Option<Self> {
        ContinuousPower::from_name(name)
            .map(Power::Continuous)
            .or_else(|| DiscretePower::from_name(name).map(Power::Discrete))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Power::Continuous(p) => p.name(),
            Power::Discrete(p) => p.name(),
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, Power::Continuous(_))
    }
}
