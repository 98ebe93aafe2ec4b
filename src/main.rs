use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use markup_arcade::game::{AttributeRender, ScriptedUpdate};
use markup_arcade::{BatchPolicy, Game, GameConfig};
use std::path::PathBuf;

/// Run a markup game headless for a number of frames
#[derive(Debug, Parser)]
#[command(name = "markup-arcade", version, about)]
struct Args {
    /// Markup document with a <game> root
    markup: PathBuf,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 60)]
    frames: u32,

    /// Frame rate of the simulated clock
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Directory sprite and sound sources resolve against
    /// (defaults to the markup file's directory)
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Keep going when some declared resources fail to load
    #[arg(long)]
    tolerant: bool,

    /// Write the last frame to this PNG file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the final session snapshot to this JSON file
    #[arg(long)]
    state: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    if !(args.fps.is_finite() && args.fps > 0.0) {
        anyhow::bail!("--fps must be a positive number, got {}", args.fps);
    }

    info!("Starting markup-arcade with {}", args.markup.display());

    let text = std::fs::read_to_string(&args.markup)
        .with_context(|| format!("Failed to read {}", args.markup.display()))?;

    let asset_base = match &args.assets {
        Some(path) => path.clone(),
        None => args
            .markup
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let policy = if args.tolerant {
        BatchPolicy::Tolerant
    } else {
        BatchPolicy::AllOrNothing
    };
    let config = GameConfig::new()
        .with_asset_base(asset_base)
        .with_batch_policy(policy);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut game = Game::from_markup(&text, config)?;
    runtime.block_on(game.init())?;
    game.set_update(ScriptedUpdate);
    game.set_render(AttributeRender);

    // Synthetic clock: one frame every 1000 / fps milliseconds
    let interval = 1000.0 / args.fps;
    game.start()?;
    let mut frames = 0;
    while frames < args.frames {
        let timestamp = frames as f64 * interval;
        if !game.tick(timestamp)? {
            break;
        }
        frames += 1;
    }
    game.stop();
    info!(
        "Ran {} frames, {} objects, {:.1} fps",
        frames,
        game.objects().len(),
        game.state().loop_controller().fps()
    );

    if let Some(path) = &args.output {
        if let Some(surface) = game.surface() {
            surface.save_png(path)?;
        }
    }

    if let Some(path) = &args.state {
        let json = game.snapshot().to_json()?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote session state to {}", path.display());
    }

    game.shutdown();
    Ok(())
}
