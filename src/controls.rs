//! User-facing controls shared with the audio thread.
//!
//! Both values are plain atomics: the renderer reads them once at the start
//! of each block, so a change applies from the next tick decision onwards.

use crate::config::DELAY_LIMIT_SECONDS;
use crate::error::{Result, SyncError};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Size of the persisted blob: an f64 delay followed by one flag byte
pub const PERSISTED_STATE_LEN: usize = 9;

#[derive(Debug)]
pub struct Controls {
    delay_bits: AtomicU64,
    always_on: AtomicBool,
}

/// Values read by the renderer for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    pub delay: f64,
    pub always_on: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self::new(0.0, false)
    }
}

impl Controls {
    pub fn new(delay: f64, always_on: bool) -> Self {
        Self {
            delay_bits: AtomicU64::new(clamp_delay(delay).to_bits()),
            always_on: AtomicBool::new(always_on),
        }
    }

    /// Signed delay in seconds; positive values make ticks fire later.
    pub fn delay(&self) -> f64 {
        f64::from_bits(self.delay_bits.load(Ordering::Relaxed))
    }

    /// Stores the delay, limited to the range the control surface offers.
    pub fn set_delay(&self, delay: f64) {
        let clamped = clamp_delay(delay);
        if clamped != delay {
            warn!("Delay {}s out of range, using {}s", delay, clamped);
        }
        self.delay_bits.store(clamped.to_bits(), Ordering::Relaxed);
        info!("Delay set to {:.2} ms", clamped * 1000.0);
    }

    /// Whether pulses keep flowing while the host transport is stopped.
    pub fn always_on(&self) -> bool {
        self.always_on.load(Ordering::Relaxed)
    }

    pub fn set_always_on(&self, always_on: bool) {
        self.always_on.store(always_on, Ordering::Relaxed);
        info!(
            "Signal {}",
            if always_on {
                "sent at all times"
            } else {
                "only sent while playing"
            }
        );
    }

    #[inline]
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            delay: self.delay(),
            always_on: self.always_on(),
        }
    }

    /// Serializes to the persisted layout: little-endian f64 delay, then
    /// 1 if always-on is disabled, 0 otherwise.
    pub fn to_bytes(&self) -> [u8; PERSISTED_STATE_LEN] {
        let mut bytes = [0u8; PERSISTED_STATE_LEN];
        bytes[..8].copy_from_slice(&self.delay().to_le_bytes());
        bytes[8] = u8::from(!self.always_on());
        bytes
    }

    /// Restores from a persisted blob. Short blobs are rejected and leave
    /// the current values untouched; trailing bytes are ignored.
    pub fn restore(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() < PERSISTED_STATE_LEN {
            warn!("Ignoring persisted state of {} bytes", bytes.len());
            return Err(SyncError::MalformedState { len: bytes.len() });
        }

        let mut delay = [0u8; 8];
        delay.copy_from_slice(&bytes[..8]);
        self.set_delay(f64::from_le_bytes(delay));
        self.set_always_on(bytes[8] == 0);
        Ok(())
    }
}

fn clamp_delay(delay: f64) -> f64 {
    if delay.is_nan() {
        0.0
    } else {
        delay.clamp(-DELAY_LIMIT_SECONDS, DELAY_LIMIT_SECONDS)
    }
}
