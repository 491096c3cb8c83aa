use crate::location::LocationOptions;
use crate::orientation::OrientationMode;
use crate::tracker::TrackerSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub location: LocationConfig,
    pub tracking: TrackingConfig,
    pub geocode: GeocodeConfig,
    pub storage: StorageConfig,
    pub orientation: OrientationConfig,
    pub ui: UiConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LocationConfig {
    pub high_accuracy: bool,     // Replay the GNSS track if true, IP geolocation otherwise
    pub maximum_age_ms: u64,     // Oldest cached fix handed to a new subscriber
    pub timeout_ms: u64,         // Longest wait for the next fix
    pub track_file: String,      // CSV track: elapsed_ms,lat,lon,accuracy,heading
    pub ip_lookup_address: String,
    pub ip_fix_accuracy_m: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrackingConfig {
    pub min_accuracy_m: f64,
    pub heading_alpha: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GeocodeConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub distance_threshold_m: f64,
    pub time_throttle_ms: i64,
    pub request_timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StorageConfig {
    pub db_path: String,
    pub path_key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrientationConfig {
    pub mode: OrientationMode,
    pub grant_on_request: bool,
    pub step_degrees: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
    pub zoom_span_degrees: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                high_accuracy: true,
                maximum_age_ms: 3000,
                timeout_ms: 10000,
                track_file: "data/track.csv".to_string(),
                ip_lookup_address: "1.1.1.1".to_string(),
                ip_fix_accuracy_m: 5000.0,
            },
            tracking: TrackingConfig {
                min_accuracy_m: 60.0,
                heading_alpha: 0.18,
            },
            geocode: GeocodeConfig {
                endpoint: "https://nominatim.openstreetmap.org".to_string(),
                user_agent: concat!("trailhead/", env!("CARGO_PKG_VERSION")).to_string(),
                distance_threshold_m: 20.0,
                time_throttle_ms: 1100,
                request_timeout_secs: 10,
            },
            storage: StorageConfig {
                db_path: "trailhead.db".to_string(),
                path_key: "trailhead.path".to_string(),
            },
            orientation: OrientationConfig {
                mode: OrientationMode::Prompt,
                grant_on_request: true,
                step_degrees: 5.0,
            },
            ui: UiConfig {
                tick_rate_ms: 150,
                zoom_span_degrees: 0.02,
            },
        }
    }
}

impl Config {
    /// Loads the given file, or writes and returns the defaults if it is
    /// missing or unreadable.
    pub fn load_from<P: AsRef<Path>>(config_path: P) -> Self {
        let config_path = config_path.as_ref();

        if let Ok(content) = fs::read_to_string(config_path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => warn!("Failed to parse {}: {}. Using defaults.", config_path.display(), e),
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(config_path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", config_path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            min_accuracy_m: self.tracking.min_accuracy_m,
            heading_alpha: self.tracking.heading_alpha,
            distance_threshold_m: self.geocode.distance_threshold_m,
            time_throttle_ms: self.geocode.time_throttle_ms,
        }
    }

    pub fn location_options(&self) -> LocationOptions {
        LocationOptions {
            high_accuracy: self.location.high_accuracy,
            maximum_age: Duration::from_millis(self.location.maximum_age_ms),
            timeout: Duration::from_millis(self.location.timeout_ms),
        }
    }
}
