//! Universe profiles and the blueprint catalog.
//!
//! A [`UniverseProfile`] is immutable for the lifetime of a universe. It is
//! built by resolving a [`ProfileSpec`] (plain strings, loadable from JSON)
//! against the typed dispatch tables. Names that resolve to nothing are
//! dropped with a debug message, never an error, so blueprints can name
//! powers or mutators this build does not know about.
//!
//! ```ignore
//! let profile = UniverseProfile::from_seed(Seed::parse("andromeda"));
//! let custom = ProfileSpec::load("my_universe.json")?.resolve();
//! ```

use crate::cataclysm::Cataclysm;
use crate::color::Palette;
use crate::effects::EffectCategory;
use crate::error::ConfigError;
use crate::mutators::{Mutator, MutatorSet};
use crate::particle::Species;
use crate::powers::Power;
use crate::seed::Seed;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// An anomaly that may appear every `interval` frames with probability
/// `chance`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodicEvent {
    pub category: EffectCategory,
    pub interval: u32,
    pub chance: f32,
}

/// Anomalies placed when the universe is created or reseeded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnomalySeed {
    pub category: EffectCategory,
    pub count: u32,
}

/// How a universe looks. Read by the renderer and by spawning.
#[derive(Clone, Debug, PartialEq)]
pub struct Aesthetic {
    /// Glow halo multiplier, `0.0` for none.
    pub glow: f32,
    /// Trail persistence in `0..1`; `0.0` clears every frame.
    pub trails: f32,
    /// Species drawn at spawn time.
    pub shapes: Vec<Species>,
    pub palette: Palette,
}

impl Default for Aesthetic {
    fn default() -> Self {
        Self {
            glow: 1.0,
            trails: 0.0,
            shapes: vec![Species::Dust],
            palette: Palette::Cosmic,
        }
    }
}

/// A resolved universe profile.
#[derive(Clone, Debug, PartialEq)]
pub struct UniverseProfile {
    pub name: String,
    pub left: Option<Power>,
    pub right: Option<Power>,
    pub mutators: MutatorSet,
    /// Velocity multiplier applied every sub-step.
    pub friction: f32,
    /// `None` means reaching the threshold only resets the universe.
    pub cataclysm: Option<Cataclysm>,
    pub periodic_events: Vec<PeriodicEvent>,
    pub initial_anomalies: Vec<AnomalySeed>,
    pub aesthetic: Aesthetic,
    pub particle_count: usize,
}

impl Default for UniverseProfile {
    fn default() -> Self {
        Self {
            name: "Void".to_string(),
            left: None,
            right: None,
            mutators: MutatorSet::new(),
            friction: 0.98,
            cataclysm: None,
            periodic_events: Vec::new(),
            initial_anomalies: Vec::new(),
            aesthetic: Aesthetic::default(),
            particle_count: 0,
        }
    }
}

impl UniverseProfile {
    /// Pick a blueprint and palette from the seed.
    ///
    /// Uses a stream derived from the seed so the simulation stream is
    /// untouched by profile selection.
    pub fn from_seed(seed: Seed) -> Self {
        let mut rng = seed.derive("profile");
        let blueprint = &BLUEPRINTS[rng.gen_range(0..BLUEPRINTS.len())];
        let mut profile = blueprint.spec().resolve();
        if rng.gen::<f32>() < 0.5 {
            profile.aesthetic.palette = Palette::ALL[rng.gen_range(0..Palette::ALL.len())];
        }
        info!(
            seed = %seed,
            blueprint = %profile.name,
            palette = profile.aesthetic.palette.name(),
            "universe selected"
        );
        profile
    }

    /// Resolve a named blueprint from the catalog.
    pub fn from_blueprint(name: &str) -> Result<Self, ConfigError> {
        Blueprint::find(name)
            .map(|b| b.spec().resolve())
            .ok_or_else(|| ConfigError::UnknownBlueprint(name.to_string()))
    }
}

/// A periodic event as written in a profile file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PeriodicEventSpec {
    pub category: String,
    pub interval: u32,
    pub chance: f32,
}

/// An initial anomaly as written in a profile file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnomalySpec {
    pub category: String,
    pub count: u32,
}

/// Aesthetic flags as written in a profile file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AestheticSpec {
    pub glow: f32,
    pub trails: f32,
    pub shapes: Vec<String>,
    pub palette: String,
}

impl Default for AestheticSpec {
    fn default() -> Self {
        Self {
            glow: 1.0,
            trails: 0.0,
            shapes: vec!["dust".to_string()],
            palette: "cosmic".to_string(),
        }
    }
}

/// An unresolved profile: every behavior is named by string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileSpec {
    pub name: String,
    pub left: Option<String>,
    pub right: Option<String>,
    pub mutators: Vec<String>,
    pub friction: f32,
    pub cataclysm: Option<String>,
    pub periodic_events: Vec<PeriodicEventSpec>,
    pub initial_anomalies: Vec<AnomalySpec>,
    pub aesthetic: AestheticSpec,
    pub particle_count: usize,
}

impl Default for ProfileSpec {
    fn default() -> Self {
        Self {
            name: "Custom".to_string(),
            left: None,
            right: None,
            mutators: Vec::new(),
            friction: 0.98,
            cataclysm: None,
            periodic_events: Vec::new(),
            initial_anomalies: Vec::new(),
            aesthetic: AestheticSpec::default(),
            particle_count: 600,
        }
    }
}

impl ProfileSpec {
    /// Parse a profile from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a profile from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Save the profile as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolve every name against the dispatch tables.
    ///
    /// Unknown names are dropped. Numeric values are clamped into range.
    pub fn resolve(&self) -> UniverseProfile {
        let binding = |slot: &str, name: &Option<String>| {
            let name = name.as_deref()?;
            let power = Power::from_name(name);
            if power.is_none() {
                debug!(profile = %self.name, slot, power = name, "unknown power dropped");
            }
            power
        };

        let mutators = self
            .mutators
            .iter()
            .filter_map(|name| {
                let m = Mutator::from_name(name);
                if m.is_none() {
                    debug!(profile = %self.name, mutator = %name, "unknown mutator dropped");
                }
                m
            })
            .collect();

        let cataclysm = self.cataclysm.as_deref().and_then(|name| {
            let c = Cataclysm::from_name(name);
            if c.is_none() {
                debug!(profile = %self.name, cataclysm = name, "unknown cataclysm dropped");
            }
            c
        });

        let category = |name: &str| {
            let c = EffectCategory::from_name(name);
            if c.is_none() {
                debug!(profile = %self.name, anomaly = name, "unknown anomaly dropped");
            }
            c
        };

        let periodic_events = self
            .periodic_events
            .iter()
            .filter(|e| e.interval > 0)
            .filter_map(|e| {
                Some(PeriodicEvent {
                    category: category(&e.category)?,
                    interval: e.interval,
                    chance: e.chance.clamp(0.0, 1.0),
                })
            })
            .collect();

        let initial_anomalies = self
            .initial_anomalies
            .iter()
            .filter_map(|a| {
                Some(AnomalySeed {
                    category: category(&a.category)?,
                    count: a.count,
                })
            })
            .collect();

        let mut shapes: Vec<Species> = self
            .aesthetic
            .shapes
            .iter()
            .filter_map(|name| {
                let s = Species::from_name(name);
                if s.is_none() {
                    debug!(profile = %self.name, shape = %name, "unknown shape dropped");
                }
                s
            })
            .collect();
        if shapes.is_empty() {
            shapes.push(Species::Dust);
        }

        let palette = Palette::from_name(&self.aesthetic.palette).unwrap_or_else(|| {
            debug!(profile = %self.name, palette = %self.aesthetic.palette, "unknown palette, using cosmic");
            Palette::Cosmic
        });

        UniverseProfile {
            name: self.name.clone(),
            left: binding("left", &self.left),
            right: binding("right", &self.right),
            mutators,
            friction: if self.friction.is_finite() {
                self.friction.clamp(0.0, 1.0)
            } else {
                0.98
            },
            cataclysm,
            periodic_events,
            initial_anomalies,
            aesthetic: Aesthetic {
                glow: self.aesthetic.glow.max(0.0),
                trails: self.aesthetic.trails.clamp(0.0, 0.99),
                shapes,
                palette,
            },
            particle_count: self.particle_count,
        }
    }
}

/// A static catalog entry.
#[derive(Clone, Copy, Debug)]
pub struct Blueprint {
    pub name: &'static str,
    pub left: &'static str,
    pub right: &'static str,
    pub mutators: &'static [&'static str],
    pub friction: f32,
    pub cataclysm: &'static str,
    /// `(category, interval, chance)`
    pub events: &'static [(&'static str, u32, f32)],
    /// `(category, count)`
    pub anomalies: &'static [(&'static str, u32)],
    pub glow: f32,
    pub trails: f32,
    pub shapes: &'static [&'static str],
    pub palette: &'static str,
    pub particles: usize,
}

impl Blueprint {
    /// Look up a blueprint by name, ignoring case.
    pub fn find(name: &str) -> Option<&'static Blueprint> {
        BLUEPRINTS.iter().find(|b| b.name.eq_ignore_ascii_case(name))
    }

    /// The blueprint as an unresolved profile.
    pub fn spec(&self) -> ProfileSpec {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        ProfileSpec {
            name: self.name.to_string(),
            left: Some(self.left.to_string()),
            right: Some(self.right.to_string()),
            mutators: owned(self.mutators),
            friction: self.friction,
            cataclysm: Some(self.cataclysm.to_string()),
            periodic_events: self
                .events
                .iter()
                .map(|&(category, interval, chance)| PeriodicEventSpec {
                    category: category.to_string(),
                    interval,
                    chance,
                })
                .collect(),
            initial_anomalies: self
                .anomalies
                .iter()
                .map(|&(category, count)| AnomalySpec {
                    category: category.to_string(),
                    count,
                })
                .collect(),
            aesthetic: AestheticSpec {
                glow: self.glow,
                trails: self.trails,
                shapes: owned(self.shapes),
                palette: self.palette.to_string(),
            },
            particle_count: self.particles,
        }
    }
}

/// The blueprint catalog.
pub static BLUEPRINTS: &[Blueprint] = &[
    Blueprint {
        name: "Stellar Nursery",
        left: "attract",
        right: "star",
        mutators: &["Clustering"],
        friction: 0.98,
        cataclysm: "supernova",
        events: &[("nebulas", 600, 0.5)],
        anomalies: &[("nebulas", 2), ("stars", 1)],
        glow: 1.5,
        trails: 0.3,
        shapes: &["dust", "star"],
        palette: "cosmic",
        particles: 700,
    },
    Blueprint {
        name: "Event Horizon",
        left: "vortex",
        right: "blackHole",
        mutators: &["Event Horizon", "Gravitational"],
        friction: 0.99,
        cataclysm: "bigCrunch",
        events: &[("blackHoles", 900, 0.3)],
        anomalies: &[("blackHoles", 1)],
        glow: 1.0,
        trails: 0.6,
        shapes: &["dust", "spark"],
        palette: "fire",
        particles: 800,
    },
    Blueprint {
        name: "Torus Drift",
        left: "wind",
        right: "gravityWell",
        mutators: &["Torus Field", "Noisy"],
        friction: 0.97,
        cataclysm: "inversion",
        events: &[("shockwaves", 300, 0.4)],
        anomalies: &[],
        glow: 0.8,
        trails: 0.2,
        shapes: &["orb", "dust"],
        palette: "ice",
        particles: 600,
    },
    Blueprint {
        name: "Crystal Garden",
        left: "crystallize",
        right: "thaw",
        mutators: &["Coral"],
        friction: 0.96,
        cataclysm: "shatter",
        events: &[("crystallineFields", 500, 0.5)],
        anomalies: &[("crystallineFields", 2)],
        glow: 0.6,
        trails: 0.0,
        shapes: &["shard"],
        palette: "ice",
        particles: 500,
    },
    Blueprint {
        name: "Pulsar Array",
        left: "orbit",
        right: "pulsar",
        mutators: &["Pulsing", "Synchronized"],
        friction: 0.98,
        cataclysm: "supernova",
        events: &[("pulsars", 800, 0.3)],
        anomalies: &[("pulsars", 2)],
        glow: 1.2,
        trails: 0.4,
        shapes: &["spark", "orb"],
        palette: "neon",
        particles: 650,
    },
    Blueprint {
        name: "Quantum Foam",
        left: "chaos",
        right: "phaseZone",
        mutators: &["Quantum Phase", "Flicker"],
        friction: 0.97,
        cataclysm: "heatDeath",
        events: &[("spacetimeFoam", 400, 0.5)],
        anomalies: &[("spacetimeFoam", 2), ("microwaveBackground", 1)],
        glow: 0.9,
        trails: 0.1,
        shapes: &["dust", "spark"],
        palette: "neon",
        particles: 700,
    },
    Blueprint {
        name: "Contagion",
        left: "infect",
        right: "purge",
        mutators: &["Infectious", "Repulsion"],
        friction: 0.97,
        cataclysm: "heatDeath",
        events: &[("clouds", 500, 0.4)],
        anomalies: &[("clouds", 1)],
        glow: 0.7,
        trails: 0.0,
        shapes: &["orb", "dust"],
        palette: "forest",
        particles: 600,
    },
    Blueprint {
        name: "Prismatic Loom",
        left: "prism",
        right: "chain",
        mutators: &["Rainbow"],
        friction: 0.98,
        cataclysm: "inversion",
        events: &[("acceleratorRings", 700, 0.3)],
        anomalies: &[("acceleratorRings", 1)],
        glow: 1.3,
        trails: 0.5,
        shapes: &["spark", "comet"],
        palette: "rainbow",
        particles: 650,
    },
    Blueprint {
        name: "Quasar Reach",
        left: "comet",
        right: "quasar",
        mutators: &["Erratic"],
        friction: 0.985,
        cataclysm: "bigCrunch",
        events: &[("quasars", 1200, 0.25), ("whiteHoles", 900, 0.25)],
        anomalies: &[("quasars", 1)],
        glow: 1.4,
        trails: 0.7,
        shapes: &["comet", "spark"],
        palette: "fire",
        particles: 600,
    },
    Blueprint {
        name: "Echo Chamber",
        left: "scribe",
        right: "echoingVoid",
        mutators: &["Synchronized"],
        friction: 0.97,
        cataclysm: "shatter",
        events: &[("echoingVoids", 600, 0.3)],
        anomalies: &[("echoingVoids", 1)],
        glow: 0.8,
        trails: 0.8,
        shapes: &["dust"],
        palette: "grayscale",
        particles: 500,
    },
    Blueprint {
        name: "Entangled Pairs",
        left: "entangle",
        right: "sever",
        mutators: &["Gravitational"],
        friction: 0.98,
        cataclysm: "inversion",
        events: &[("stasisFields", 700, 0.3)],
        anomalies: &[("stasisFields", 1)],
        glow: 1.0,
        trails: 0.3,
        shapes: &["orb", "spark"],
        palette: "cosmic",
        particles: 550,
    },
    Blueprint {
        name: "Entropy Well",
        left: "drain",
        right: "negativeSpace",
        mutators: &["Entropic"],
        friction: 0.96,
        cataclysm: "heatDeath",
        events: &[("negativeSpaces", 500, 0.3), ("rifts", 800, 0.3)],
        anomalies: &[("rifts", 1)],
        glow: 0.5,
        trails: 0.4,
        shapes: &["dust", "shard"],
        palette: "grayscale",
        particles: 750,
    },
    Blueprint {
        name: "Lattice",
        left: "regrid",
        right: "timeDilation",
        mutators: &["Clustering"],
        friction: 0.95,
        cataclysm: "shatter",
        events: &[("timeDilationZones", 600, 0.4)],
        anomalies: &[("timeDilationZones", 1)],
        glow: 0.6,
        trails: 0.0,
        shapes: &["shard", "orb"],
        palette: "neon",
        particles: 600,
    },
    Blueprint {
        name: "Supergiant",
        left: "spiral",
        right: "supergiant",
        mutators: &["Pulsing"],
        friction: 0.985,
        cataclysm: "supernova",
        events: &[("supergiants", 1500, 0.2)],
        anomalies: &[("supergiants", 1)],
        glow: 1.6,
        trails: 0.5,
        shapes: &["star", "orb"],
        palette: "fire",
        particles: 500,
    },
    Blueprint {
        name: "Weaver",
        left: "shear",
        right: "bond",
        mutators: &["Noisy", "Repulsion"],
        friction: 0.97,
        cataclysm: "bigCrunch",
        events: &[("clouds", 600, 0.3)],
        anomalies: &[],
        glow: 0.9,
        trails: 0.6,
        shapes: &["spark", "dust"],
        palette: "forest",
        particles: 700,
    },
    Blueprint {
        name: "Tidal Sea",
        left: "tide",
        right: "shockwave",
        mutators: &["Flicker", "Torus Field"],
        friction: 0.98,
        cataclysm: "inversion",
        events: &[("shockwaves", 400, 0.5)],
        anomalies: &[("microwaveBackground", 1)],
        glow: 1.1,
        trails: 0.3,
        shapes: &["orb", "comet"],
        palette: "ice",
        particles: 650,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::powers::{ContinuousPower, DiscretePower};

    #[test]
    fn test_every_blueprint_resolves_cleanly() {
        for blueprint in BLUEPRINTS {
            let spec = blueprint.spec();
            let profile = spec.resolve();
            assert!(profile.left.is_some(), "{}: left", blueprint.name);
            assert!(profile.right.is_some(), "{}: right", blueprint.name);
            assert!(profile.cataclysm.is_some(), "{}: cataclysm", blueprint.name);
            assert_eq!(profile.mutators.len(), blueprint.mutators.len(), "{}", blueprint.name);
            assert_eq!(profile.periodic_events.len(), blueprint.events.len(), "{}", blueprint.name);
            assert_eq!(
                profile.initial_anomalies.len(),
                blueprint.anomalies.len(),
                "{}",
                blueprint.name
            );
            assert_eq!(profile.aesthetic.shapes.len(), blueprint.shapes.len(), "{}", blueprint.name);
        }
    }

    #[test]
    fn test_unknown_names_are_dropped() {
        let spec = ProfileSpec {
            left: Some("hyperdrive".into()),
            right: Some("gravityWell".into()),
            mutators: vec!["Rainbow".into(), "Sparkly".into()],
            cataclysm: Some("bigBang".into()),
            initial_anomalies: vec![AnomalySpec { category: "wormholes".into(), count: 2 }],
            ..ProfileSpec::default()
        };
        let profile = spec.resolve();
        assert_eq!(profile.left, None);
        assert_eq!(profile.right, Some(Power::Discrete(DiscretePower::GravityWell)));
        assert_eq!(profile.mutators.len(), 1);
        assert_eq!(profile.cataclysm, None);
        assert!(profile.initial_anomalies.is_empty());
    }

    #[test]
    fn test_json_roundtrip_with_defaults() {
        let json = r#"{ "name": "Tiny", "left": "comet", "friction": 1.0 }"#;
        let profile = ProfileSpec::from_json(json).unwrap().resolve();
        assert_eq!(profile.name, "Tiny");
        assert_eq!(profile.left, Some(Power::Continuous(ContinuousPower::Comet)));
        assert_eq!(profile.friction, 1.0);
        assert_eq!(profile.particle_count, 600);
        assert_eq!(profile.aesthetic.shapes, vec![Species::Dust]);
    }

    #[test]
    fn test_friction_is_clamped() {
        let spec = ProfileSpec { friction: 3.0, ..ProfileSpec::default() };
        assert_eq!(spec.resolve().friction, 1.0);
    }

    #[test]
    fn test_seed_selection_is_deterministic() {
        let a = UniverseProfile::from_seed(Seed(1234));
        let b = UniverseProfile::from_seed(Seed(1234));
        assert_eq!(a, b);
    }

    #[test]
    fn test_blueprint_lookup() {
        assert!(UniverseProfile::from_blueprint("torus drift").is_ok());
        assert!(matches!(
            UniverseProfile::from_blueprint("Nowhere"),
            Err(ConfigError::UnknownBlueprint(_))
        ));
    }
}
