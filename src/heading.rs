//! Heading low-pass filter over the circular 0-360° domain.
//!
//! Location-derived and orientation-derived headings feed the same
//! [`HeadingSmoother`], so the displayed bearing is one continuous estimate.

/// Default smoothing factor. Lower is steadier but slower to respond.
pub const HEADING_ALPHA: f64 = 0.18;

/// Folds any finite angle into `[0, 360)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid can round a tiny negative up to exactly 360.0
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Shortest signed difference from `from` to `to`, in `(-180, 180]`.
pub fn angular_difference(from: f64, to: f64) -> f64 {
    let d = (to - from + 540.0).rem_euclid(360.0) - 180.0;
    if d == -180.0 {
        180.0
    } else {
        d
    }
}

/// One step of exponential smoothing.
///
/// Non-finite observations leave `previous` untouched; the first valid
/// observation is taken as-is.
pub fn smooth(previous: Option<f64>, observed: f64, alpha: f64) -> Option<f64> {
    if !observed.is_finite() {
        return previous;
    }
    match previous {
        None => Some(normalize_degrees(observed)),
        Some(prev) => {
            let diff = angular_difference(prev, observed);
            Some(normalize_degrees(prev + alpha * diff + 360.0))
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeadingSmoother {
    alpha: f64,
    current: Option<f64>,
}

impl Default for HeadingSmoother {
    fn default() -> Self {
        Self::new(HEADING_ALPHA)
    }
}

impl HeadingSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            current: None,
        }
    }

    pub fn observe(&mut self, heading: f64) -> Option<f64> {
        self.current = smooth(self.current, heading, self.alpha);
        self.current
    }

    pub fn current(&self) -> Option<f64> {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}
