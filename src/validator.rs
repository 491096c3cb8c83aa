//! Fix-quality gate.
//!
//! A fix whose accuracy radius exceeds the threshold is deferred: it may still
//! move the accuracy circle, but never the marker, the path or the geocoder.

use crate::models::Position;

/// Worst accuracy, in meters, trusted for the path, marker and geocoding.
pub const MIN_GEOCODE_ACCURACY_M: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixVerdict {
    Accept,
    Defer,
}

#[derive(Debug, Clone, Copy)]
pub struct FixValidator {
    max_accuracy_m: f64,
}

impl Default for FixValidator {
    fn default() -> Self {
        Self::new(MIN_GEOCODE_ACCURACY_M)
    }
}

impl FixValidator {
    pub fn new(max_accuracy_m: f64) -> Self {
        Self { max_accuracy_m }
    }

    /// Exactly `max_accuracy_m` is still accepted.
    pub fn accept(&self, sample: &Position) -> FixVerdict {
        if sample.accuracy > self.max_accuracy_m {
            FixVerdict::Defer
        } else {
            FixVerdict::Accept
        }
    }
}
