//! Fixed pulse shapes sent to the device.

const TICK_HEIGHT: f32 = 0.35;
const BAR_TICK_HEIGHT: f32 = 0.95;

pub const REGULAR_PULSE_LEN: usize = 13;
pub const ACCENT_PULSE_LEN: usize = 26;

/// Plateau at tick height, then a ramp down to silence.
pub const REGULAR_PULSE: [f32; REGULAR_PULSE_LEN] = [
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT - (1.0 / 3.0) * TICK_HEIGHT,
    TICK_HEIGHT - (2.0 / 3.0) * TICK_HEIGHT,
];

/// Same opening plateau as the regular pulse, then a ramp up to bar height,
/// a short hold and a ramp down.
pub const ACCENT_PULSE: [f32; ACCENT_PULSE_LEN] = [
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT,
    TICK_HEIGHT + (1.0 / 5.0) * (BAR_TICK_HEIGHT - TICK_HEIGHT),
    TICK_HEIGHT + (2.0 / 5.0) * (BAR_TICK_HEIGHT - TICK_HEIGHT),
    TICK_HEIGHT + (3.0 / 5.0) * (BAR_TICK_HEIGHT - TICK_HEIGHT),
    TICK_HEIGHT + (4.0 / 5.0) * (BAR_TICK_HEIGHT - TICK_HEIGHT),
    BAR_TICK_HEIGHT,
    BAR_TICK_HEIGHT,
    BAR_TICK_HEIGHT,
    BAR_TICK_HEIGHT - (1.0 / 9.0) * BAR_TICK_HEIGHT,
    BAR_TICK_HEIGHT - (2.0 / 9.0) * BAR_TICK_HEIGHT,
    BAR_TICK_HEIGHT - (3.0 / 9.0) * BAR_TICK_HEIGHT,
    BAR_TICK_HEIGHT - (4.0 / 9.0) * BAR_TICK_HEIGHT,
    BAR_TICK_HEIGHT - (5.0 / 9.0) * BAR_TICK_HEIGHT,
    BAR_TICK_HEIGHT - (6.0 / 9.0) * BAR_TICK_HEIGHT,
    BAR_TICK_HEIGHT - (7.0 / 9.0) * BAR_TICK_HEIGHT,
    BAR_TICK_HEIGHT - (8.0 / 9.0) * BAR_TICK_HEIGHT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseKind {
    Regular,
    /// Sent on the last sub-beat of a bar
    Accent,
}

impl PulseKind {
    #[inline]
    pub fn samples(self) -> &'static [f32] {
        match self {
            PulseKind::Regular => &REGULAR_PULSE,
            PulseKind::Accent => &ACCENT_PULSE,
        }
    }

    #[inline]
    pub fn sample_count(self) -> usize {
        self.samples().len()
    }
}

/// Remainder of a pulse cut off by the end of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTail {
    pub kind: PulseKind,
    /// Index of the next waveform sample to write
    pub offset: usize,
    pub remaining: usize,
}

impl PendingTail {
    /// Writes as much of the pulse as fits in `out`; returns what was
    /// written and whether anything is still owed.
    #[inline]
    pub fn drain(self, out: &mut [f32]) -> (usize, Option<PendingTail>) {
        let written = self.remaining.min(out.len());
        let samples = self.kind.samples();
        out[..written].copy_from_slice(&samples[self.offset..self.offset + written]);

        let rest = PendingTail {
            kind: self.kind,
            offset: self.offset + written,
            remaining: self.remaining - written,
        };
        (written, (rest.remaining > 0).then_some(rest))
    }
}

/// Writes the start of a `kind` pulse into `out`; returns the number of
/// samples written and the tail still owed, if the pulse did not fit.
#[inline]
pub fn write_pulse(kind: PulseKind, out: &mut [f32]) -> (usize, Option<PendingTail>) {
    PendingTail {
        kind,
        offset: 0,
        remaining: kind.sample_count(),
    }
    .drain(out)
}
