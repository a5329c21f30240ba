//! Turns a host timeline into a [`TickMap`].
//!
//! Building happens in four passes:
//!
//! 1. time signature changes are reduced to `(quarter, bar length in ticks)`
//!    pairs, each pushed forward onto a bar line of the signature before it;
//! 2. tempo events are reduced to `(time, tick length)` pairs, splitting any
//!    change that falls between two ticks so every pair starts on a tick;
//! 3. both lists are walked together, one tick at a time, emitting a segment
//!    at every tempo change and every signature change;
//! 4. signature changes past the last tempo event are appended at the last
//!    known tempo.
//!
//! Hosts are assumed to space tempo changes further apart than one tick
//! (observed minimum is around 200ms); a second change inside the same tick
//! is not realigned.

use super::{TickMap, TickSegment};
use crate::config::TICKS_PER_QUARTER;
use crate::error::{Result, SyncError};
use crate::precision::Precision;
use crate::timeline::{TempoChangeEvent, TimeSignatureChangeEvent, Timeline};
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq)]
struct SignatureChange {
    quarter_position: u32,
    bar_length_ticks: u32,
}

impl SignatureChange {
    fn tick_index(&self) -> u64 {
        u64::from(self.quarter_position) * u64::from(TICKS_PER_QUARTER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TempoChange {
    time_position: f64,
    tick_length: f64,
}

/// Running position on the tick grid while merging.
#[derive(Debug, Clone, Copy, Default)]
struct GridCursor {
    position: f64,
    tick_index: u64,
    offset_in_bar: u32,
}

impl GridCursor {
    fn step(&mut self, tick_length: f64, bar_length_ticks: u32) {
        self.position += tick_length;
        self.tick_index += 1;
        self.offset_in_bar += 1;
        if self.offset_in_bar >= bar_length_ticks {
            self.offset_in_bar = 0;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TickMapBuilder {
    precision: Precision,
}

impl TickMapBuilder {
    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
    }

    /// Builds a complete map, or explains why the timeline cannot produce one.
    pub fn build(&self, timeline: &Timeline) -> Result<TickMap> {
        if !timeline.is_sufficient() {
            return Err(SyncError::InsufficientTimeline {
                tempo_events: timeline.tempo.len(),
                signature_events: timeline.signatures.len(),
            });
        }

        let signatures = normalize_signatures(&timeline.signatures);
        trace!("Normalized signature changes: {:?}", signatures);

        let tempo_changes = self.normalize_tempo(&timeline.tempo)?;
        trace!("Normalized tempo changes: {:?}", tempo_changes);

        let segments = self.merge(&tempo_changes, &signatures);
        Ok(TickMap::from_segments(segments, self.precision))
    }

    fn normalize_tempo(&self, events: &[TempoChangeEvent]) -> Result<Vec<TempoChange>> {
        let precision = self.precision;
        let mut changes = Vec::with_capacity(events.len());
        let mut next_position = events[0].time_position;

        for i in 0..events.len() - 1 {
            let tick_length = tick_length_between(events, i)?;
            let current_position = next_position;
            changes.push(TempoChange {
                time_position: current_position,
                tick_length,
            });

            if i == events.len() - 2 {
                break;
            }

            next_position = events[i + 1].time_position;

            let mut last_tick = current_position;
            while precision.less_than(last_tick, next_position) {
                last_tick += tick_length;
            }

            if !precision.equals(last_tick, next_position) {
                // The change falls between two ticks: the tick straddling it gets a
                // length blended from both tempos, so the next segment starts on a tick.
                let next_tick_length = tick_length_between(events, i + 1)?;
                let blend = (last_tick - next_position) / tick_length;
                let straddling_length = next_tick_length * blend + tick_length * (1.0 - blend);
                let straddling_start = last_tick - tick_length;

                changes.push(TempoChange {
                    time_position: straddling_start,
                    tick_length: straddling_length,
                });
                next_position = straddling_start + straddling_length;
            }
        }

        Ok(changes)
    }

    fn merge(&self, tempo_changes: &[TempoChange], signatures: &[SignatureChange]) -> Vec<TickSegment> {
        let precision = self.precision;
        let mut segments: Vec<TickSegment> = Vec::with_capacity(tempo_changes.len() + signatures.len());
        let mut signature_index = 0;
        let mut cursor = GridCursor {
            position: tempo_changes[0].time_position,
            ..GridCursor::default()
        };

        for change in tempo_changes {
            if let Some(&previous) = segments.last() {
                let mut last = previous;

                while precision.less_than(cursor.position, change.time_position) {
                    match signatures.get(signature_index + 1) {
                        Some(next_signature) => {
                            while precision.less_than(cursor.position, change.time_position)
                                && cursor.tick_index < next_signature.tick_index()
                            {
                                cursor.step(last.tick_length, last.bar_length_ticks);
                            }

                            if precision.less_than(cursor.position, change.time_position) {
                                signature_index += 1;
                                cursor.offset_in_bar = 0;
                                last = TickSegment {
                                    start_position: cursor.position,
                                    tick_length: last.tick_length,
                                    bar_length_ticks: next_signature.bar_length_ticks,
                                    tick_offset_at_start: 0,
                                };
                                push_segment(&mut segments, last, precision);
                            }
                        }
                        None => cursor.step(last.tick_length, last.bar_length_ticks),
                    }
                }
            }

            // A signature change landing exactly on this tempo change shares its segment
            while signatures
                .get(signature_index + 1)
                .is_some_and(|next| cursor.tick_index == next.tick_index())
            {
                signature_index += 1;
                cursor.offset_in_bar = 0;
            }

            push_segment(
                &mut segments,
                TickSegment {
                    start_position: change.time_position,
                    tick_length: change.tick_length,
                    bar_length_ticks: signatures[signature_index].bar_length_ticks,
                    tick_offset_at_start: cursor.offset_in_bar,
                },
                precision,
            );
        }

        while let Some(next_signature) = signatures.get(signature_index + 1) {
            let last = match segments.last() {
                Some(&last) => last,
                None => break,
            };

            while cursor.tick_index < next_signature.tick_index() {
                cursor.position += last.tick_length;
                cursor.tick_index += 1;
            }

            signature_index += 1;
            cursor.offset_in_bar = 0;
            push_segment(
                &mut segments,
                TickSegment {
                    start_position: cursor.position,
                    tick_length: last.tick_length,
                    bar_length_ticks: next_signature.bar_length_ticks,
                    tick_offset_at_start: 0,
                },
                precision,
            );
        }

        segments
    }
}

/// Seconds per tick between tempo events `i` and `i + 1`.
fn tick_length_between(events: &[TempoChangeEvent], i: usize) -> Result<f64> {
    let delta_time = events[i + 1].time_position - events[i].time_position;
    let delta_quarters = events[i + 1].quarter_position - events[i].quarter_position;
    let tick_length = (delta_time / delta_quarters) / f64::from(TICKS_PER_QUARTER);

    if delta_time > 0.0 && delta_quarters > 0.0 && tick_length.is_finite() && tick_length > 0.0 {
        Ok(tick_length)
    } else {
        Err(SyncError::InvalidTempo { index: i })
    }
}

fn normalize_signatures(events: &[TimeSignatureChangeEvent]) -> Vec<SignatureChange> {
    let mut changes = Vec::with_capacity(events.len());
    let mut previous_quarters_per_bar = 0u32;
    let mut previous_quarter_position = 0u32;

    for event in events {
        // Meters shorter than a quarter note (1/8, 3/16, ...) count as 1/4
        let quarters_per_bar = event
            .numerator
            .saturating_mul(4)
            .checked_div(event.denominator)
            .unwrap_or(0)
            .max(1);
        let mut quarter_position = event.quarter_position.round().max(0.0) as u32;

        if previous_quarters_per_bar != 0 {
            let remainder =
                quarter_position.saturating_sub(previous_quarter_position) % previous_quarters_per_bar;
            if remainder != 0 {
                quarter_position =
                    quarter_position.saturating_add(previous_quarters_per_bar - remainder);
            }
        }

        changes.push(SignatureChange {
            quarter_position,
            bar_length_ticks: TICKS_PER_QUARTER.saturating_mul(quarters_per_bar),
        });

        previous_quarters_per_bar = quarters_per_bar;
        previous_quarter_position = quarter_position;
    }

    changes
}

/// Appends a segment, replacing the last one when both start at the same time.
fn push_segment(segments: &mut Vec<TickSegment>, segment: TickSegment, precision: Precision) {
    if let Some(last) = segments.last_mut() {
        if !precision.less_than(last.start_position, segment.start_position) {
            *last = segment;
            return;
        }
    }
    segments.push(segment);
}
