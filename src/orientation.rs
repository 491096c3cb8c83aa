//! Device-orientation heading source.
//!
//! Some platforms deliver orientation events freely, some only after the user
//! grants permission, some not at all. That negotiation lives behind
//! [`OrientationSource::probe`] and [`OrientationSource::request_permission`]
//! so the tracker only ever sees headings. The terminal build uses a keyboard
//! compass: arrow keys turn a simulated device.

use crate::heading::normalize_degrees;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationCapability {
    Granted,
    NeedsPermission,
    Unsupported,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMode {
    Granted,
    Prompt,
    Unsupported,
}

pub trait OrientationSource {
    fn probe(&self) -> OrientationCapability;
    /// Asks for access. Returns whether events will now be delivered.
    fn request_permission(&mut self) -> bool;
    /// Turns the device by `delta` degrees and returns the new raw heading,
    /// or `None` while events are not being delivered.
    fn rotate(&mut self, delta: f64) -> Option<f64>;
}

pub struct KeyboardCompass {
    capability: OrientationCapability,
    grant_on_request: bool,
    heading: f64,
}

impl KeyboardCompass {
    pub fn new(mode: OrientationMode, grant_on_request: bool) -> Self {
        let capability = match mode {
            OrientationMode::Granted => OrientationCapability::Granted,
            OrientationMode::Prompt => OrientationCapability::NeedsPermission,
            OrientationMode::Unsupported => OrientationCapability::Unsupported,
        };
        Self {
            capability,
            grant_on_request,
            heading: 0.0,
        }
    }
}

impl OrientationSource for KeyboardCompass {
    fn probe(&self) -> OrientationCapability {
        self.capability
    }

    fn request_permission(&mut self) -> bool {
        match self.capability {
            OrientationCapability::Granted => true,
            OrientationCapability::Unsupported => false,
            OrientationCapability::NeedsPermission => {
                if self.grant_on_request {
                    info!("Orientation permission granted");
                    self.capability = OrientationCapability::Granted;
                    true
                } else {
                    warn!("Orientation permission denied");
                    false
                }
            }
        }
    }

    fn rotate(&mut self, delta: f64) -> Option<f64> {
        if self.capability != OrientationCapability::Granted {
            return None;
        }
        self.heading = normalize_degrees(self.heading + delta);
        Some(self.heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mode_grants_on_request() {
        let mut compass = KeyboardCompass::new(OrientationMode::Prompt, true);
        assert_eq!(compass.probe(), OrientationCapability::NeedsPermission);
        assert_eq!(compass.rotate(5.0), None);
        assert!(compass.request_permission());
        assert_eq!(compass.probe(), OrientationCapability::Granted);
        assert_eq!(compass.rotate(5.0), Some(5.0));
    }

    #[test]
    fn test_denied_prompt_delivers_nothing() {
        let mut compass = KeyboardCompass::new(OrientationMode::Prompt, false);
        assert!(!compass.request_permission());
        assert_eq!(compass.rotate(10.0), None);
    }

    #[test]
    fn test_unsupported_never_grants() {
        let mut compass = KeyboardCompass::new(OrientationMode::Unsupported, true);
        assert!(!compass.request_permission());
        assert_eq!(compass.probe(), OrientationCapability::Unsupported);
    }

    #[test]
    fn test_rotation_wraps() {
        let mut compass = KeyboardCompass::new(OrientationMode::Granted, false);
        assert_eq!(compass.rotate(-10.0), Some(350.0));
        assert_eq!(compass.rotate(15.0), Some(5.0));
    }
}
