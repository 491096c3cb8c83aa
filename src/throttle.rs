//! Rate limiting for reverse-geocode lookups.
//!
//! A lookup is attempted only when the fix is accurate enough, has moved far
//! enough from the last attempted fix, and the throttle window since that
//! attempt has elapsed. The gate is charged when an attempt *starts*, so a slow
//! response cannot let a second request slip through the window.

use crate::geo::haversine_distance;
use crate::models::LatLon;
use crate::validator::MIN_GEOCODE_ACCURACY_M;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

pub const GEOCODE_DISTANCE_THRESHOLD_M: f64 = 20.0;
pub const GEOCODE_TIME_THROTTLE_MS: i64 = 1100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodeDecision {
    Attempt,
    Skip,
}

#[derive(Debug, Clone)]
pub struct GeocodeGate {
    min_accuracy_m: f64,
    distance_threshold_m: f64,
    time_throttle: Duration,
    // time and position of the last attempt, always set together
    last_fix: Option<(DateTime<Utc>, LatLon)>,
}

impl Default for GeocodeGate {
    fn default() -> Self {
        Self::new(
            MIN_GEOCODE_ACCURACY_M,
            GEOCODE_DISTANCE_THRESHOLD_M,
            Duration::milliseconds(GEOCODE_TIME_THROTTLE_MS),
        )
    }
}

impl GeocodeGate {
    pub fn new(min_accuracy_m: f64, distance_threshold_m: f64, time_throttle: Duration) -> Self {
        Self {
            min_accuracy_m,
            distance_threshold_m,
            time_throttle,
            last_fix: None,
        }
    }

    pub fn should_geocode(&self, accuracy: f64, position: LatLon, now: DateTime<Utc>) -> GeocodeDecision {
        if accuracy > self.min_accuracy_m {
            return GeocodeDecision::Skip;
        }

        let Some((last_time, last_pos)) = self.last_fix else {
            return GeocodeDecision::Attempt;
        };

        let moved = haversine_distance(last_pos, position);
        if moved < self.distance_threshold_m {
            debug!("Geocode skipped: moved {:.1} m since last attempt", moved);
            return GeocodeDecision::Skip;
        }

        let elapsed = now - last_time;
        if elapsed <= self.time_throttle {
            debug!("Geocode skipped: {} ms since last attempt", elapsed.num_milliseconds());
            return GeocodeDecision::Skip;
        }

        GeocodeDecision::Attempt
    }

    pub fn record_attempt(&mut self, position: LatLon, now: DateTime<Utc>) {
        self.last_fix = Some((now, position));
    }

    pub fn last_attempt(&self) -> Option<(DateTime<Utc>, LatLon)> {
        self.last_fix
    }

    pub fn reset(&mut self) {
        self.last_fix = None;
    }
}
