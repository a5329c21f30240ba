//! Offline rendering and analysis of a pulse stream.
//!
//! Drives a [`PulseRenderer`] block by block outside any audio callback and
//! reads the resulting samples back into pulses, so a timeline can be
//! checked without a host.

use crate::error::Result;
use crate::renderer::waveform::{PulseKind, REGULAR_PULSE_LEN};
use crate::renderer::{PositionInfo, PulseRenderer, Realtime};
use log::{debug, info};
use std::io;

/// A pulse found in a rendered stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedPulse {
    /// Frame index of the first non-silent sample
    pub start: u64,
    pub kind: PulseKind,
}

/// Splits a sample stream into pulses.
///
/// Pulses are runs of non-zero samples; runs longer than a regular pulse are
/// accents. A pulse may span several calls to [`feed`](Self::feed).
#[derive(Debug, Default)]
pub struct PulseDetector {
    position: u64,
    run_start: Option<u64>,
    run_len: usize,
    pulses: Vec<DetectedPulse>,
}

impl PulseDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, samples: &[f32]) {
        for &sample in samples {
            if sample != 0.0 {
                if self.run_start.is_none() {
                    self.run_start = Some(self.position);
                }
                self.run_len += 1;
            } else {
                self.close_run();
            }
            self.position += 1;
        }
    }

    /// Closes a pulse still open at the end of the stream.
    pub fn finish(mut self) -> Vec<DetectedPulse> {
        self.close_run();
        self.pulses
    }

    pub fn pulses(&self) -> &[DetectedPulse] {
        &self.pulses
    }

    fn close_run(&mut self) {
        if let Some(start) = self.run_start.take() {
            let kind = if self.run_len > REGULAR_PULSE_LEN {
                PulseKind::Accent
            } else {
                PulseKind::Regular
            };
            self.pulses.push(DetectedPulse { start, kind });
        }
        self.run_len = 0;
    }
}

/// What to render.
#[derive(Debug, Clone, Copy)]
pub struct OfflineRender {
    /// Host position of the first frame
    pub start_sample: i64,
    /// When false the transport stays frozen at `start_sample`
    pub playing: bool,
    pub total_frames: u64,
    pub block_size: usize,
}

/// Summary of a rendered stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub frames: u64,
    pub pulses: Vec<DetectedPulse>,
}

impl RenderReport {
    pub fn pulse_count(&self) -> usize {
        self.pulses.len()
    }

    pub fn accent_count(&self) -> usize {
        self.pulses
            .iter()
            .filter(|p| p.kind == PulseKind::Accent)
            .count()
    }

    /// Distances between consecutive pulse starts, in frames.
    pub fn spacings(&self) -> impl Iterator<Item = u64> + '_ {
        self.pulses.windows(2).map(|w| w[1].start - w[0].start)
    }

    pub fn spacing_range(&self) -> Option<(u64, u64)> {
        self.spacings().fold(None, |range, s| match range {
            None => Some((s, s)),
            Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
        })
    }
}

/// Renders `request.total_frames` frames through a prepared renderer.
///
/// `on_block` receives the first channel of every block, e.g. to write it out.
pub fn render_offline<F>(
    renderer: &mut PulseRenderer,
    request: OfflineRender,
    mut on_block: F,
) -> Result<RenderReport>
where
    F: FnMut(&[f32]) -> io::Result<()>,
{
    let block_size = request.block_size.min(renderer.max_block_size()).max(1);
    let channel_count = renderer.channel_count().max(1);
    let sample_rate = renderer.sample_rate();
    info!(
        "Rendering {} frames in blocks of {} ({})",
        request.total_frames,
        block_size,
        if request.playing { "playing" } else { "stopped" }
    );

    let mut buffers = vec![vec![0.0f32; block_size]; channel_count];
    let mut detector = PulseDetector::new();
    let mut rendered = 0u64;

    while rendered < request.total_frames {
        let frames = (request.total_frames - rendered).min(block_size as u64) as usize;
        let position = if request.playing {
            PositionInfo::playing(request.start_sample + rendered as i64)
        } else {
            PositionInfo::stopped(request.start_sample)
        };

        let mut outputs: Vec<&mut [f32]> = buffers
            .iter_mut()
            .map(|buffer| &mut buffer[..frames])
            .collect();
        if !renderer.render_block(&mut outputs, frames, sample_rate, Realtime::No, &position) {
            return Err(io::Error::new(io::ErrorKind::Other, "renderer is not prepared").into());
        }

        let block = &buffers[0][..frames];
        detector.feed(block);
        on_block(block)?;
        rendered += frames as u64;
    }

    let report = RenderReport {
        frames: rendered,
        pulses: detector.finish(),
    };
    debug!(
        "Rendered {} pulses, {} accents, spacing {:?}",
        report.pulse_count(),
        report.accent_count(),
        report.spacing_range()
    );
    Ok(report)
}
