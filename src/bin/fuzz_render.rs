//! Render a WAV file through the fuzz offline.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use simple_fuzz::engine::{DEFAULT_GAIN, DEFAULT_MIX, DEFAULT_VOLUME};
use simple_fuzz::render::{self, RenderOptions, DEFAULT_BIT_DEPTH, DEFAULT_BLOCK_SIZE};
use simple_fuzz::FuzzEngine;

#[derive(Parser)]
#[command(name = "fuzz-render")]
#[command(version, about = "Render a WAV file through the Simple Fuzz effect", long_about = None)]
struct Args {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Drive before clipping, 0.0 to 1.0 (maps onto 0-60 dB)
    #[arg(long, default_value_t = DEFAULT_GAIN)]
    gain: f32,

    /// Dry/wet ratio, 0.0 to 1.0
    #[arg(long, default_value_t = DEFAULT_MIX)]
    mix: f32,

    /// Output volume, 0.0 to 0.1
    #[arg(long, default_value_t = DEFAULT_VOLUME)]
    volume: f32,

    /// Processing block size in frames
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value_t = DEFAULT_BIT_DEPTH)]
    bit_depth: u16,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let engine = FuzzEngine::new();
    engine.configure(args.gain, args.mix, args.volume);

    let options = RenderOptions {
        block_size: args.block_size,
        bit_depth: args.bit_depth,
    };
    let summary = render::render_file(&engine, &args.input, &args.output, options)
        .with_context(|| {
            format!(
                "failed to render {} into {}",
                args.input.display(),
                args.output.display()
            )
        })?;

    tracing::info!(
        frames = summary.frames,
        channels = summary.channels,
        seconds = summary.frames as f64 / f64::from(summary.sample_rate),
        "done"
    );

    Ok(())
}
