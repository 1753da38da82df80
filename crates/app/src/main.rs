//! Headless simulation driver.
//!
//! Loads a JSON configuration, runs the tick loop on the GPU, and writes one
//! PNG frame per outer tick from the presented field.
//!
//! Usage:
//!   trailsim --config configs/slime.json --ticks 600 --out-dir frames
//!
//! Then, for a video:
//!   ffmpeg -framerate 30 -i frames/%06d.png -pix_fmt yuv420p out.mp4

use std::fs;
use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kernel::{FieldImage, Simulation};
use orchestrator::{build_simulation, SimulationConfig};

fn usage_and_exit(msg: Option<&str>) -> ! {
    if let Some(m) = msg {
        eprintln!("Error: {m}\n");
    }
    eprintln!("trailsim (headless trail-field simulation runner)");
    eprintln!();
    eprintln!("REQUIRED:");
    eprintln!("  --config <PATH>    JSON simulation configuration");
    eprintln!();
    eprintln!("OPTIONAL:");
    eprintln!("  --ticks <N>        Outer ticks to run (default: 300)");
    eprintln!("  --out-dir <DIR>    Frame output directory (default: frames)");
    eprintln!("  --no-frames        Skip PNG export, just run the simulation");
    eprintln!();
    std::process::exit(2);
}

struct Args {
    config: String,
    ticks: u64,
    out_dir: PathBuf,
    export_frames: bool,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut config: Option<String> = None;
    let mut ticks = 300_u64;
    let mut out_dir = PathBuf::from("frames");
    let mut export_frames = true;

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--config" => {
                i += 1;
                config = argv.get(i).cloned();
            }
            "--ticks" => {
                i += 1;
                ticks = argv
                    .get(i)
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or_else(|| usage_and_exit(Some("Invalid --ticks value")));
            }
            "--out-dir" => {
                i += 1;
                out_dir = argv
                    .get(i)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| usage_and_exit(Some("--out-dir requires a value")));
            }
            "--no-frames" => {
                export_frames = false;
            }
            "--help" | "-h" => usage_and_exit(None),
            other => usage_and_exit(Some(&format!("Unknown argument: {other}"))),
        }
        i += 1;
    }

    let config = config.unwrap_or_else(|| usage_and_exit(Some("--config is required")));
    Args {
        config,
        ticks,
        out_dir,
        export_frames,
    }
}

/// Tone-map the f32 RGBA field to 8-bit, clamping to [0, 1].
fn to_rgba8(image: &FieldImage) -> Vec<u8> {
    image
        .pixels
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            // Force alpha opaque so empty field regions stay visible black.
            if i % 4 == 3 {
                255
            } else {
                (v.clamp(0.0, 1.0) * 255.0) as u8
            }
        })
        .collect()
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args();

    let config = match SimulationConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        "running '{}': {}x{}, {} elements, {} ticks",
        config.name,
        config.width,
        config.height,
        config.element_count(),
        args.ticks,
    );

    let mut sim = match build_simulation(&config) {
        Ok(sim) => sim,
        Err(e) => {
            tracing::error!("simulation setup failed: {e}");
            std::process::exit(1);
        }
    };

    if args.export_frames {
        if let Err(e) = fs::create_dir_all(&args.out_dir) {
            tracing::error!("cannot create {}: {e}", args.out_dir.display());
            std::process::exit(1);
        }
    }

    let (width, height) = sim.dimensions();
    for tick in 0..args.ticks {
        sim.tick();

        if args.export_frames {
            let image = sim.present();
            let bytes = to_rgba8(&image);
            let path = args.out_dir.join(format!("{tick:06}.png"));
            let frame = image::RgbaImage::from_raw(width, height, bytes)
                .expect("frame buffer size mismatch");
            if let Err(e) = frame.save(&path) {
                tracing::error!("failed to write {}: {e}", path.display());
                std::process::exit(1);
            }
        }

        if (tick + 1) % 50 == 0 {
            tracing::info!("tick {}/{} ({:.2}s simulated)", tick + 1, args.ticks, sim.time());
        }
    }

    tracing::info!(
        "done: {} ticks, {} steps, {:.2}s simulated",
        args.ticks,
        sim.steps(),
        sim.time(),
    );
}
