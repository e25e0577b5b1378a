use anyhow::{Context, Result};
use celestial::{
    CanvasConfig, FrameInput, ProfileSource, ProfileSpec, Seed, SimulationContext, UniverseProfile,
};
use clap::Parser;
use glam::Vec2;
use tracing::info;

/// Celestial Canvas: an interactive particle universe.
#[derive(Parser, Debug)]
#[command(name = "celestial", version, about)]
struct Cli {
    /// Universe seed. Numbers are used as-is; any other text is hashed.
    #[arg(short, long)]
    seed: Option<String>,

    /// Run a named blueprint instead of drawing one from the seed.
    #[arg(short, long, conflicts_with = "profile")]
    blueprint: Option<String>,

    /// Load a universe profile from a JSON file.
    #[arg(short, long)]
    profile: Option<std::path::PathBuf>,

    /// Load canvas configuration from a JSON file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Step this many frames without a window and log a summary.
    #[arg(long, value_name = "FRAMES")]
    headless: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CanvasConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CanvasConfig::default(),
    };
    let seed = cli.seed.as_deref().map(Seed::parse).unwrap_or_else(Seed::random);
    let source = profile_source(&cli)?;

    info!(seed = %seed, "starting Celestial Canvas");

    match cli.headless {
        Some(frames) => run_headless(config, source.profile_for(seed), seed, frames),
        None => celestial::run(config, source, seed).context("running canvas window"),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn profile_source(cli: &Cli) -> Result<ProfileSource> {
    if let Some(name) = &cli.blueprint {
        let profile = UniverseProfile::from_blueprint(name)?;
        return Ok(ProfileSource::Fixed(profile));
    }
    if let Some(path) = &cli.profile {
        let spec = ProfileSpec::load(path)
            .with_context(|| format!("loading profile {}", path.display()))?;
        return Ok(ProfileSource::Fixed(spec.resolve()));
    }
    Ok(ProfileSource::Seeded)
}

/// Drive the simulation with a scripted cursor: a slow circle around the
/// centre, holding left for a third of every two seconds and clicking right
/// every five.
fn run_headless(config: CanvasConfig, profile: UniverseProfile, seed: Seed, frames: u64) -> Result<()> {
    let mut sim = SimulationContext::new(config, profile, seed)?;
    info!(blueprint = %sim.profile().name, frames, "running headless");

    for frame in 0..frames {
        let report = sim.step(scripted_input(frame, sim.bounds()));
        if report.frame % 60 == 0 || frame + 1 == frames {
            info!(
                frame = report.frame,
                particles = report.particles,
                effects = report.effects,
                energy = report.energy,
                stability = ?report.stability,
                cataclysm = ?report.cataclysm,
                "frame summary"
            );
        }
    }
    Ok(())
}

fn scripted_input(frame: u64, bounds: Vec2) -> FrameInput {
    let angle = frame as f32 * 0.02;
    let cursor = bounds * 0.5 + Vec2::new(angle.cos(), angle.sin()) * bounds.min_element() * 0.3;
    FrameInput {
        cursor,
        left: frame % 120 < 40,
        right: frame % 300 == 150,
    }
}
