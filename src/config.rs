// config.rs

use crate::error::Result;
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;

/// Tick resolution the receiving device counts bars in
pub const TICKS_PER_QUARTER: u32 = 24;

/// Tick length at 400.45 BPM, the fastest tempo the device can follow
pub const MIN_TICK_SECONDS: f64 = 0.006242976651267;

/// Tick length at 29.55 BPM, the slowest tempo before the device loses lock
pub const MAX_TICK_SECONDS: f64 = 0.084602368866328;

pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 4096;

/// Largest delay offset, either direction, accepted from the control surface
pub const DELAY_LIMIT_SECONDS: f64 = 0.2;

const ENV_PREFIX: &str = "PULSESYNC";

/// Engine settings, layered from defaults, an optional file and `PULSESYNC_*` variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub sample_rate: f64,
    pub max_block_size: usize,
    pub channels: usize,
    pub delay_ms: f64,
    pub only_when_playing: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            channels: 2,
            delay_ms: 0.0,
            only_when_playing: true,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let mut builder = config::Config::builder()
            .set_default("sample_rate", defaults.sample_rate)?
            .set_default("max_block_size", defaults.max_block_size as i64)?
            .set_default("channels", defaults.channels as i64)?
            .set_default("delay_ms", defaults.delay_ms)?
            .set_default("only_when_playing", defaults.only_when_playing)?;

        if let Some(path) = path {
            info!("Loading settings from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        if !settings.sample_rate.is_finite() || settings.sample_rate <= 0.0 {
            return Err(config::ConfigError::Message(format!(
                "sample_rate must be a positive number of Hz, got {}",
                settings.sample_rate
            ))
            .into());
        }

        debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }

    pub fn delay_seconds(&self) -> f64 {
        self.delay_ms / 1000.0
    }
}
