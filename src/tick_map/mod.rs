//! Piecewise-constant tick grid of a host timeline.
//!
//! A [`TickMap`] is a list of [`TickSegment`]s ordered by start time. Within
//! a segment ticks are evenly spaced; a new segment starts wherever the
//! tempo or the bar length changes. Maps are immutable once built: the
//! [`TickMapBuilder`] produces a replacement and [`TickMapStore`] hands it
//! to the audio thread in one swap.

pub mod builder;
mod store;

pub use builder::TickMapBuilder;
pub use store::TickMapStore;

use crate::config::TICKS_PER_QUARTER;
use crate::precision::Precision;
use std::fmt;

/// A span of the timeline with constant tick spacing and bar length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSegment {
    /// Start of the segment in seconds, always on a tick
    pub start_position: f64,
    /// Seconds between two ticks
    pub tick_length: f64,
    /// Ticks per bar
    pub bar_length_ticks: u32,
    /// Sub-beat index of the tick at `start_position`, below `bar_length_ticks`
    pub tick_offset_at_start: u32,
}

impl TickSegment {
    pub fn bpm(&self) -> f64 {
        60.0 / (self.tick_length * TICKS_PER_QUARTER as f64)
    }

    pub fn quarters_per_bar(&self) -> u32 {
        self.bar_length_ticks / TICKS_PER_QUARTER
    }
}

/// Tick spacing and bar length in effect at a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    pub tick_length: f64,
    pub bar_length_ticks: u32,
}

/// The first tick at or after a queried position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NextTick {
    /// Tick time in seconds, delay included
    pub position: f64,
    /// The tick is the last sub-beat of its bar
    pub last_tick_before_bar: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TickMap {
    segments: Vec<TickSegment>,
    precision: Precision,
}

impl TickMap {
    pub fn empty(precision: Precision) -> Self {
        Self {
            segments: Vec::new(),
            precision,
        }
    }

    pub(crate) fn from_segments(segments: Vec<TickSegment>, precision: Precision) -> Self {
        Self {
            segments,
            precision,
        }
    }

    pub fn segments(&self) -> &[TickSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Last segment starting at or before `position`, or the first one when
    /// `position` precedes the whole map.
    fn covering_segment(&self, position: f64) -> Option<&TickSegment> {
        let upper = self
            .segments
            .partition_point(|s| !self.precision.less_than(position, s.start_position));
        self.segments.get(upper.saturating_sub(1))
    }

    /// Returns `None` only when the map is empty.
    pub fn tempo_at(&self, position: f64) -> Option<Tempo> {
        self.covering_segment(position).map(|segment| Tempo {
            tick_length: segment.tick_length,
            bar_length_ticks: segment.bar_length_ticks,
        })
    }

    /// Finds the first tick at or after `position` with the whole grid shifted by `delay`.
    ///
    /// A positive delay makes ticks fire later relative to the host position.
    /// Positions before the covering segment (pre-roll, or the start of the
    /// timeline under a positive delay) are answered by extending the first
    /// segment's grid backwards.
    pub fn next_tick(&self, position: f64, delay: f64) -> Option<NextTick> {
        let query = position - delay;
        let segment = self.covering_segment(query)?;
        let precision = self.precision;
        let tick_length = segment.tick_length;
        let bar_length = i64::from(segment.bar_length_ticks.max(1));

        let mut tick_position = segment.start_position;
        let mut tick_index = i64::from(segment.tick_offset_at_start);

        if precision.less_than(query, tick_position) {
            let whole_ticks = ((tick_position - query) / tick_length).floor() - 1.0;
            if whole_ticks >= 1.0 {
                let skipped = whole_ticks as i64;
                tick_position -= skipped as f64 * tick_length;
                tick_index = (tick_index - skipped).rem_euclid(bar_length);
            }
            while precision.less_than(query, tick_position - tick_length) {
                tick_position -= tick_length;
                tick_index = if tick_index == 0 {
                    bar_length - 1
                } else {
                    tick_index - 1
                };
            }
        } else {
            let whole_ticks = ((query - tick_position) / tick_length).floor() - 1.0;
            if whole_ticks >= 1.0 {
                let skipped = whole_ticks as i64;
                tick_position += skipped as f64 * tick_length;
                tick_index = (tick_index + skipped) % bar_length;
            }
            while precision.less_than(tick_position, query) {
                tick_position += tick_length;
                tick_index += 1;
                if tick_index == bar_length {
                    tick_index = 0;
                }
            }
        }

        Some(NextTick {
            position: tick_position + delay,
            last_tick_before_bar: tick_index == bar_length - 1,
        })
    }
}

impl fmt::Display for TickMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return writeln!(f, "(empty tick map)");
        }
        for segment in &self.segments {
            writeln!(
                f,
                "@{:.6}: tickLen={:.6} barLen={} tickOffset={}   {:.2} BPM ({}/4)",
                segment.start_position,
                segment.tick_length,
                segment.bar_length_ticks,
                segment.tick_offset_at_start,
                segment.bpm(),
                segment.quarters_per_bar()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK_120: f64 = 60.0 / 120.0 / 24.0;

    fn four_four_at_120() -> TickMap {
        TickMap::from_segments(
            vec![TickSegment {
                start_position: 0.0,
                tick_length: TICK_120,
                bar_length_ticks: 96,
                tick_offset_at_start: 0,
            }],
            Precision::new(44_100.0),
        )
    }

    #[test]
    fn test_empty_map_has_no_answers() {
        let map = TickMap::empty(Precision::new(44_100.0));
        assert!(map.tempo_at(1.0).is_none());
        assert!(map.next_tick(1.0, 0.0).is_none());
    }

    #[test]
    fn test_next_tick_on_a_tick_returns_it() {
        let map = four_four_at_120();
        let tick = map.next_tick(TICK_120 * 10.0, 0.0).unwrap();
        assert!((tick.position - TICK_120 * 10.0).abs() < 1e-9);
        assert!(!tick.last_tick_before_bar);
    }

    #[test]
    fn test_last_tick_of_bar_is_flagged() {
        let map = four_four_at_120();
        let tick = map.next_tick(TICK_120 * 94.5, 0.0).unwrap();
        assert!((tick.position - TICK_120 * 95.0).abs() < 1e-9);
        assert!(tick.last_tick_before_bar);
    }

    #[test]
    fn test_pre_roll_walks_backwards() {
        let map = four_four_at_120();
        let tick = map.next_tick(-TICK_120 * 0.5, 0.0).unwrap();
        assert!(tick.position.abs() < 1e-9);

        // One tick before the origin is the last sub-beat of the previous bar
        let tick = map.next_tick(-TICK_120 * 1.5, 0.0).unwrap();
        assert!((tick.position + TICK_120).abs() < 1e-9);
        assert!(tick.last_tick_before_bar);
    }

    #[test]
    fn test_far_position_matches_stepping() {
        let map = four_four_at_120();
        let ticks = 96 * 500 + 37;
        let mut stepped = 0.0;
        for _ in 0..ticks {
            stepped += TICK_120;
        }
        let tick = map.next_tick(stepped - TICK_120 * 0.3, 0.0).unwrap();
        assert!(map.precision().equals(tick.position, stepped));
    }

    #[test]
    fn test_display_lists_bpm_and_meter() {
        let dump = four_four_at_120().to_string();
        assert!(dump.contains("120.00 BPM (4/4)"));
        assert!(dump.contains("barLen=96"));
    }
}
