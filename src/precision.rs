//! Sample-scale comparison of time values.
//!
//! Tick boundaries are produced by repeated addition, so two positions that
//! should coincide drift apart by tiny amounts. Everything that orders or
//! matches time values goes through [`Precision`] instead of raw `<`/`==`.

use crate::config::DEFAULT_SAMPLE_RATE;

/// Compares times in seconds with a tolerance of half a sample period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Precision {
    sample_rate: f64,
    epsilon: f64,
}

impl Default for Precision {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl Precision {
    /// # Panics
    /// Panics if `sample_rate` is not a finite positive number
    pub fn new(sample_rate: f64) -> Self {
        assert!(
            sample_rate.is_finite() && sample_rate > 0.0,
            "Sample rate must be finite and positive"
        );
        Self {
            sample_rate,
            epsilon: 0.5 / sample_rate,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Half a sample period, in seconds
    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Times at most half a sample apart are equal.
    #[inline]
    pub fn equals(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.epsilon
    }

    #[inline]
    pub fn less_than(&self, a: f64, b: f64) -> bool {
        a < b && !self.equals(a, b)
    }
}
