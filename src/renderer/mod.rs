//! Real-time pulse train synthesis.
//!
//! The renderer turns the current [`TickMap`] into a train of short pulses,
//! one per tick, sample-accurately positioned within each audio block. It
//! runs on the audio thread: after [`PulseRenderer::prepare`] nothing in
//! [`PulseRenderer::render_block`] allocates, locks or logs.
//!
//! Spacing between two pulses is kept within [`SpacingBounds`] whatever the
//! timeline says, so the device never sees a tempo it cannot follow.

pub mod waveform;

use crate::config::{MAX_TICK_SECONDS, MIN_TICK_SECONDS};
use crate::controls::Controls;
use crate::tick_map::{TickMap, TickMapStore};
use log::{info, warn};
use std::sync::Arc;
use waveform::{write_pulse, PendingTail, PulseKind};

/// Whether the host renders in real time or offline (bounce, freeze).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Realtime {
    Yes,
    No,
}

/// Host transport state for one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionInfo {
    /// Absolute position of the first frame, if the host reports one
    pub time_in_samples: Option<i64>,
    pub is_playing: bool,
}

impl PositionInfo {
    pub fn playing(time_in_samples: i64) -> Self {
        Self {
            time_in_samples: Some(time_in_samples),
            is_playing: true,
        }
    }

    pub fn stopped(time_in_samples: i64) -> Self {
        Self {
            time_in_samples: Some(time_in_samples),
            is_playing: false,
        }
    }
}

/// Allowed distance between two pulse starts, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpacingBounds {
    pub min_samples: u32,
    pub max_samples: u32,
}

impl SpacingBounds {
    pub fn for_sample_rate(sample_rate: f64) -> Self {
        Self {
            // ceil keeps the fastest tempo below 400.45 BPM, floor keeps the slowest above 29.55
            min_samples: (MIN_TICK_SECONDS * sample_rate).ceil() as u32,
            max_samples: (MAX_TICK_SECONDS * sample_rate).floor() as u32,
        }
    }
}

/// Timing state carried from one block to the next.
#[derive(Debug, Clone, Copy)]
struct PulseState {
    bounds: SpacingBounds,
    samples_since_last_tick: u32,
    /// Sub-beat index, used to place accents while the transport is stopped
    tick_index: u32,
    regular_tail: Option<PendingTail>,
    accent_tail: Option<PendingTail>,
}

impl PulseState {
    fn new(bounds: SpacingBounds) -> Self {
        Self {
            bounds,
            // The first due tick must not be suppressed
            samples_since_last_tick: bounds.min_samples,
            tick_index: 0,
            regular_tail: None,
            accent_tail: None,
        }
    }

    /// A block of silence: owed pulse tails are dropped and the spacing
    /// counter keeps running.
    fn rest(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        self.regular_tail = None;
        self.accent_tail = None;
        let frames = u32::try_from(out.len()).unwrap_or(u32::MAX);
        self.samples_since_last_tick = self
            .samples_since_last_tick
            .saturating_add(frames)
            .min(self.bounds.max_samples);
    }

    fn render(
        &mut self,
        out: &mut [f32],
        map: &TickMap,
        sample_rate: f64,
        position: &PositionInfo,
        delay: f64,
    ) {
        let block_start = position.time_in_samples.unwrap_or(0);
        let Some(tempo) = map.tempo_at(block_start as f64 / sample_rate) else {
            self.rest(out);
            return;
        };

        let len = out.len();
        let mut i = 0;

        // Stopped transport: ticks are extrapolated from the last emitted one
        let mut next_tick_seconds = -(f64::from(self.samples_since_last_tick) / sample_rate);

        if let Some(tail) = self.regular_tail.take() {
            let (written, rest) = tail.drain(&mut out[i..]);
            i += written;
            self.regular_tail = rest;
        }
        if let Some(tail) = self.accent_tail.take() {
            let (written, rest) = tail.drain(&mut out[i..]);
            i += written;
            self.accent_tail = rest;
        }

        while i < len {
            let (next_tick, accent) = if position.is_playing {
                let at = (block_start + i as i64) as f64 / sample_rate;
                match map.next_tick(at, delay) {
                    Some(tick) => (
                        (tick.position * sample_rate).round() as i64 - block_start,
                        tick.last_tick_before_bar,
                    ),
                    None => (i64::MAX, false),
                }
            } else {
                next_tick_seconds += tempo.tick_length;
                (
                    (next_tick_seconds * sample_rate) as i64,
                    self.tick_index.saturating_add(1) >= tempo.bar_length_ticks,
                )
            };

            // Silence until the tick is due, or until waiting longer would
            // drop below the slowest tempo the device follows
            while i < len
                && (i as i64) < next_tick
                && self.samples_since_last_tick < self.bounds.max_samples
            {
                out[i] = 0.0;
                i += 1;
                self.samples_since_last_tick += 1;
            }

            if i >= len {
                break;
            }

            if self.samples_since_last_tick < self.bounds.min_samples {
                // Too close to the previous pulse; skip this tick
                out[i] = 0.0;
                i += 1;
                self.samples_since_last_tick += 1;
            } else {
                i += self.emit(accent, &mut out[i..]);
            }
        }
    }

    fn emit(&mut self, accent: bool, out: &mut [f32]) -> usize {
        let kind = if accent {
            PulseKind::Accent
        } else {
            PulseKind::Regular
        };

        self.tick_index = if accent { 0 } else { self.tick_index.saturating_add(1) };
        // Counted from the pulse start, so owed tail samples need no bookkeeping
        self.samples_since_last_tick = kind.sample_count() as u32;

        let (written, tail) = write_pulse(kind, out);
        match kind {
            PulseKind::Regular => self.regular_tail = tail,
            PulseKind::Accent => self.accent_tail = tail,
        }
        written
    }
}

/// Audio-thread side of the engine.
pub struct PulseRenderer {
    tick_map: TickMapStore,
    controls: Arc<Controls>,
    sample_rate: f64,
    max_block_size: usize,
    channel_count: usize,
    state: PulseState,
    mono: Vec<f32>,
    prepared: bool,
}

impl PulseRenderer {
    pub fn new(tick_map: TickMapStore, controls: Arc<Controls>) -> Self {
        let sample_rate = crate::config::DEFAULT_SAMPLE_RATE;
        Self {
            tick_map,
            controls,
            sample_rate,
            max_block_size: 0,
            channel_count: 0,
            state: PulseState::new(SpacingBounds::for_sample_rate(sample_rate)),
            mono: Vec::new(),
            prepared: false,
        }
    }

    /// Configures the renderer for a stream and resets all timing state.
    ///
    /// Must be called before the first [`render_block`](Self::render_block)
    /// and again whenever any of the three values changes. A sample rate
    /// that is not finite and positive leaves the renderer unprepared.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize, channel_count: usize) {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            warn!("Refusing to prepare renderer at {} Hz", sample_rate);
            self.prepared = false;
            return;
        }

        let bounds = SpacingBounds::for_sample_rate(sample_rate);
        info!(
            "Preparing renderer: {} Hz, {} frames, {} channels, pulse spacing {}..={} samples",
            sample_rate, max_block_size, channel_count, bounds.min_samples, bounds.max_samples
        );

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.channel_count = channel_count;
        self.state = PulseState::new(bounds);
        self.mono = vec![0.0; max_block_size];
        self.prepared = true;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn bounds(&self) -> SpacingBounds {
        self.state.bounds
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Fills `frame_count` frames of every output channel with the pulse train.
    ///
    /// `frame_count` must not exceed the prepared maximum block size and the
    /// channel count must match the prepared one. Returns `false` only when
    /// the renderer has not been prepared; every other degraded case
    /// (no timeline yet, transport stopped with always-on disabled) renders
    /// silence and returns `true`.
    ///
    /// Timing always follows the prepared sample rate; `samples_per_second`
    /// is informational, like `realtime`.
    pub fn render_block(
        &mut self,
        outputs: &mut [&mut [f32]],
        frame_count: usize,
        _samples_per_second: f64,
        _realtime: Realtime,
        position: &PositionInfo,
    ) -> bool {
        if !self.prepared {
            return false;
        }
        debug_assert!(frame_count <= self.max_block_size);
        debug_assert_eq!(outputs.len(), self.channel_count);

        let frames = frame_count.min(self.mono.len());
        let controls = self.controls.snapshot();
        let map = self.tick_map.load();
        let mono = &mut self.mono[..frames];

        if map.is_empty() || (!position.is_playing && !controls.always_on) {
            self.state.rest(mono);
        } else {
            self.state
                .render(mono, &map, self.sample_rate, position, controls.delay);
        }

        for channel in outputs.iter_mut() {
            let n = frames.min(channel.len());
            channel[..n].copy_from_slice(&self.mono[..n]);
        }
        true
    }
}
