use crate::config::{Settings, DELAY_LIMIT_SECONDS};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (TOML, JSON or YAML); PULSESYNC_* variables override it
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Also log to the terminal, at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the tick map built from a timeline file
    Map {
        /// Timeline file with [[tempo]] and [[signatures]] tables
        timeline: PathBuf,
    },
    /// Render the pulse train for a timeline file and report what was sent
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Timeline file with [[tempo]] and [[signatures]] tables
    pub timeline: PathBuf,

    /// Length of the render
    #[arg(long, default_value_t = 10.0)]
    pub seconds: f64,

    /// Host position of the first frame
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub start_sample: i64,

    /// Render with the transport stopped at --start-sample
    #[arg(long)]
    pub stopped: bool,

    /// Delay in milliseconds, overrides settings and saved state
    #[arg(long, allow_hyphen_values = true)]
    pub delay_ms: Option<f64>,

    /// Keep sending pulses while stopped
    #[arg(long)]
    pub always_on: bool,

    /// Block size, at most the configured maximum
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Restore delay and always-on from a saved state file
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Save delay and always-on to a state file after rendering
    #[arg(long)]
    pub save_state: Option<PathBuf>,

    /// Write the rendered mono stream as raw little-endian f32
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print every detected pulse
    #[arg(long)]
    pub list_ticks: bool,
}

pub fn validate_render_args(args: &RenderArgs, settings: &Settings) -> Result<(), String> {
    if !(args.seconds.is_finite() && args.seconds > 0.0) {
        return Err(format!(
            "Error: render length must be positive, got {} seconds",
            args.seconds
        ));
    }

    if let Some(delay_ms) = args.delay_ms {
        let limit_ms = DELAY_LIMIT_SECONDS * 1000.0;
        if delay_ms.is_nan() || delay_ms.abs() > limit_ms {
            return Err(format!(
                "Error: delay {} ms is outside -{limit_ms}..={limit_ms} ms",
                delay_ms
            ));
        }
    }

    if let Some(block_size) = args.block_size {
        if block_size == 0 || block_size > settings.max_block_size {
            return Err(format!(
                "Error: block size {} must be between 1 and {}",
                block_size, settings.max_block_size
            ));
        }
    }

    if !settings.sample_rate.is_finite() || settings.sample_rate <= 0.0 {
        return Err(format!(
            "Error: sample rate must be positive, got {}",
            settings.sample_rate
        ));
    }

    if settings.channels == 0 {
        return Err("Error: at least one output channel is required".to_string());
    }

    Ok(())
}
