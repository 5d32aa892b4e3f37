//! lumina_noel: interactive entry point.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use lumina_noel::{run, run_headless, AppConfig};
use noel_formation::Easing;

#[derive(Parser)]
#[command(name = "lumina_noel")]
#[command(about = "Gesture-controlled particle Christmas tree")]
#[command(version)]
struct Cli {
    /// JSON configuration file; missing keys fall back to defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the foliage particle count
    #[arg(long)]
    foliage: Option<usize>,

    /// Run the scripted pipeline for N frames without opening a window
    #[arg(long, value_name = "FRAMES")]
    headless: Option<u64>,

    /// Start with the hand debug overlay visible
    #[arg(long)]
    debug: bool,

    /// Ease by a fixed fraction per rendered frame instead of per 1/60 s
    #[arg(long)]
    per_frame_easing: bool,

    /// Seed for the particle layout
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumina_noel=info,noel_gesture=info,noel_formation=warn".into()),
        )
        .init();

    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    if let Some(n) = cli.foliage {
        cfg.layers.counts.foliage = n;
    }
    if cli.debug {
        cfg.debug = true;
    }
    if cli.per_frame_easing {
        cfg.easing = Easing::PerFrame;
    }
    if cli.seed.is_some() {
        cfg.seed = cli.seed;
    }
    cfg.validate()?;

    if let Some(frames) = cli.headless {
        info!("headless run: {} frames", frames);
        let report = run_headless(cfg, frames)?;
        println!(
            "{} frames  mode {}  gesture {}  camera ({:.2}, {:.2}, {:.2})",
            report.frames,
            report.mode.label(),
            report.gesture.as_str(),
            report.camera.x,
            report.camera.y,
            report.camera.z,
        );
        return Ok(());
    }

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Lumina Noel — Gesture-Controlled Particle Tree        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Input: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Input: keyboard + mouse simulation  (use --features leap for hardware)");
    println!("  Fist: assemble   Open palm: scatter   Click a photo: focus");
    println!();

    run(cfg)?;
    Ok(())
}
