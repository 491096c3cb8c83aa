use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accuracy assumed when the platform reports none, in meters.
pub const DEFAULT_ACCURACY_M: f64 = 20.0;

/// A `(lat, lon)` pair in decimal degrees. Serialized as a two-element array
/// so persisted paths stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }
}

/// A single location fix. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    /// Radius of the 68% confidence circle, meters.
    pub accuracy: f64,
    /// Degrees clockwise from true north, when the platform supplies one.
    pub heading: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(
        lat: f64,
        lon: f64,
        accuracy: Option<f64>,
        heading: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let accuracy = match accuracy {
            Some(a) if a.is_finite() => a.max(0.0),
            _ => DEFAULT_ACCURACY_M,
        };
        Self {
            lat,
            lon,
            accuracy,
            heading: heading.filter(|h| h.is_finite()),
            timestamp,
        }
    }

    pub fn coords(&self) -> LatLon {
        LatLon(self.lat, self.lon)
    }
}

/// Structured address returned by the reverse geocoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub display_name: Option<String>,
    pub house_number: Option<String>,
    pub road: Option<String>,
    pub neighbourhood: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
}

impl AddressRecord {
    /// Short one-line label: "12 Main St, Mission, San Francisco 94110".
    /// Falls back to the provider's display name when no parts are known.
    pub fn summary(&self) -> Option<String> {
        let street = match (&self.house_number, &self.road) {
            (Some(n), Some(r)) => Some(format!("{} {}", n, r)),
            (None, Some(r)) => Some(r.clone()),
            _ => None,
        };
        let district = self.neighbourhood.clone().or_else(|| self.suburb.clone());
        let locality = match (&self.city, &self.postcode) {
            (Some(c), Some(p)) => Some(format!("{} {}", c, p)),
            (Some(c), None) => Some(c.clone()),
            (None, Some(p)) => Some(p.clone()),
            (None, None) => None,
        };

        let parts: Vec<String> = [street, district, locality].into_iter().flatten().collect();
        if parts.is_empty() {
            self.display_name.clone()
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Deserialize)]
pub struct NominatimResponse {
    pub display_name: Option<String>,
    pub address: Option<NominatimAddress>,
    pub error: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct NominatimAddress {
    pub house_number: Option<String>,
    pub road: Option<String>,
    pub neighbourhood: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub postcode: Option<String>,
}

// Nominatim reports the locality under whichever of city/town/village
// applies to the place; collapse them into a single field.
impl From<NominatimResponse> for AddressRecord {
    fn from(res: NominatimResponse) -> Self {
        let addr = res.address.unwrap_or_default();
        Self {
            display_name: res.display_name,
            house_number: addr.house_number,
            road: addr.road,
            neighbourhood: addr.neighbourhood,
            suburb: addr.suburb,
            city: addr.city.or(addr.town).or(addr.village),
            postcode: addr.postcode,
        }
    }
}
