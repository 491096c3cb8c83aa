//! The map-view seam between the tracker and whatever draws it.
//!
//! [`MapView`] is the set of commands the tracker emits. [`MapState`] is the
//! terminal implementation: it keeps the latest value of each command for
//! `ui::render` to draw on the next frame.

use crate::models::{AddressRecord, LatLon};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What the fix popup should say. Formatting is left to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum PopupContent {
    Address(AddressRecord),
    Coordinates(LatLon),
}

pub trait MapView {
    fn set_marker(&mut self, lat: f64, lon: f64, heading: Option<f64>);
    fn remove_marker(&mut self);
    fn set_accuracy_circle(&mut self, lat: f64, lon: f64, radius_m: f64);
    fn set_path(&mut self, points: &[LatLon]);
    fn pan_to(&mut self, lat: f64, lon: f64);
    fn show_popup(&mut self, content: PopupContent);
    fn show_status(&mut self, message: &str, severity: Severity);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub position: LatLon,
    pub heading: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyCircle {
    pub center: LatLon,
    pub radius_m: f64,
}

#[derive(Debug, Clone)]
pub struct MapState {
    pub center: LatLon,
    /// Width of the visible window in degrees of longitude.
    pub span_degrees: f64,
    pub marker: Option<Marker>,
    pub circle: Option<AccuracyCircle>,
    pub path: Vec<LatLon>,
    pub popup: Option<PopupContent>,
    pub status: (String, Severity),
}

impl MapState {
    pub fn new(center: LatLon, span_degrees: f64) -> Self {
        Self {
            center,
            span_degrees,
            marker: None,
            circle: None,
            path: Vec::new(),
            popup: None,
            status: ("Press 's' to start tracking".to_string(), Severity::Info),
        }
    }

    pub fn zoom_in(&mut self) {
        self.span_degrees = (self.span_degrees / 2.0).max(0.0005);
    }

    pub fn zoom_out(&mut self) {
        self.span_degrees = (self.span_degrees * 2.0).min(360.0);
    }

    pub fn popup_text(&self) -> Option<String> {
        match &self.popup {
            Some(PopupContent::Address(record)) => record.summary(),
            Some(PopupContent::Coordinates(p)) => Some(format_coords(*p)),
            None => None,
        }
    }
}

pub fn format_coords(p: LatLon) -> String {
    format!("{:.6}, {:.6}", p.lat(), p.lon())
}

impl MapView for MapState {
    fn set_marker(&mut self, lat: f64, lon: f64, heading: Option<f64>) {
        self.marker = Some(Marker {
            position: LatLon(lat, lon),
            heading,
        });
    }

    fn remove_marker(&mut self) {
        self.marker = None;
        self.popup = None;
    }

    fn set_accuracy_circle(&mut self, lat: f64, lon: f64, radius_m: f64) {
        self.circle = Some(AccuracyCircle {
            center: LatLon(lat, lon),
            radius_m,
        });
    }

    fn set_path(&mut self, points: &[LatLon]) {
        self.path = points.to_vec();
    }

    fn pan_to(&mut self, lat: f64, lon: f64) {
        self.center = LatLon(lat, lon);
    }

    fn show_popup(&mut self, content: PopupContent) {
        self.popup = Some(content);
    }

    fn show_status(&mut self, message: &str, severity: Severity) {
        self.status = (message.to_string(), severity);
    }
}
