//! Position update orchestration.
//!
//! [`Tracker`] owns every piece of per-session state: the fix validator, the
//! shared heading smoother, the persisted path and the geocode gate. Each
//! incoming event is handled to completion against a [`MapView`]; the only
//! deferred work is the address lookup, which the host runs and reports back
//! through [`Tracker::on_address_resolved`].

use crate::api::LookupError;
use crate::db::PathStore;
use crate::heading::HeadingSmoother;
use crate::location::LocationErrorCode;
use crate::models::{AddressRecord, LatLon, Position};
use crate::path::PathAccumulator;
use crate::throttle::{GeocodeDecision, GeocodeGate};
use crate::validator::{FixValidator, FixVerdict};
use crate::view::{MapView, PopupContent, Severity};
use chrono::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    /// Not subscribed to any source.
    Idle,
    /// Subscribed, but no fix has passed the validator yet.
    AwaitingFix,
    /// At least one fix accepted this session.
    Tracking,
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub min_accuracy_m: f64,
    pub heading_alpha: f64,
    pub distance_threshold_m: f64,
    pub time_throttle_ms: i64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            min_accuracy_m: crate::validator::MIN_GEOCODE_ACCURACY_M,
            heading_alpha: crate::heading::HEADING_ALPHA,
            distance_threshold_m: crate::throttle::GEOCODE_DISTANCE_THRESHOLD_M,
            time_throttle_ms: crate::throttle::GEOCODE_TIME_THROTTLE_MS,
        }
    }
}

/// An address lookup the host should start. `seq` increases per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodeRequest {
    pub seq: u64,
    pub position: LatLon,
}

pub struct Tracker<S: PathStore> {
    phase: TrackerPhase,
    validator: FixValidator,
    smoother: HeadingSmoother,
    path: PathAccumulator<S>,
    gate: GeocodeGate,
    orientation_enabled: bool,
    marker: Option<LatLon>,
    next_seq: u64,
    applied_seq: Option<u64>,
    fix_count: u64,
}

impl<S: PathStore> Tracker<S> {
    pub fn new(store: S, settings: &TrackerSettings) -> Self {
        Self {
            phase: TrackerPhase::Idle,
            validator: FixValidator::new(settings.min_accuracy_m),
            smoother: HeadingSmoother::new(settings.heading_alpha),
            path: PathAccumulator::new(store),
            gate: GeocodeGate::new(
                settings.min_accuracy_m,
                settings.distance_threshold_m,
                Duration::milliseconds(settings.time_throttle_ms),
            ),
            orientation_enabled: false,
            marker: None,
            next_seq: 0,
            applied_seq: None,
            fix_count: 0,
        }
    }

    /// Begins a session: restores the saved path and resets the gate.
    pub fn start(&mut self, view: &mut impl MapView) {
        if self.phase != TrackerPhase::Idle {
            return;
        }
        self.gate.reset();
        self.smoother.reset();
        self.fix_count = 0;
        self.path.restore();
        view.set_path(self.path.current());
        view.show_status("Waiting for location fix...", Severity::Info);
        self.phase = TrackerPhase::AwaitingFix;
        info!("Tracking session started ({} saved points)", self.path.len());
    }

    pub fn stop(&mut self, view: &mut impl MapView) {
        if self.halt() {
            view.show_status("Tracking stopped", Severity::Info);
        }
    }

    fn halt(&mut self) -> bool {
        if self.phase == TrackerPhase::Idle {
            return false;
        }
        self.phase = TrackerPhase::Idle;
        info!(
            "Tracking session stopped after {} fixes, path {:.0} m",
            self.fix_count,
            self.path.distance_m()
        );
        true
    }

    /// Handles one location fix. Returns a lookup to start, if the geocode
    /// gate allows one.
    pub fn on_position(&mut self, pos: &Position, view: &mut impl MapView) -> Option<GeocodeRequest> {
        if self.phase == TrackerPhase::Idle {
            return None;
        }

        if self.validator.accept(pos) == FixVerdict::Defer {
            debug!("Deferred fix with accuracy {:.0} m", pos.accuracy);
            view.set_accuracy_circle(pos.lat, pos.lon, pos.accuracy);
            view.show_status(
                &format!("Waiting for accurate fix (±{:.0} m)", pos.accuracy),
                Severity::Warning,
            );
            return None;
        }

        if let Some(h) = pos.heading {
            self.smoother.observe(h);
        }

        let coords = pos.coords();
        self.path.append(coords);
        self.fix_count += 1;

        view.set_marker(pos.lat, pos.lon, self.smoother.current());
        self.marker = Some(coords);
        view.set_path(self.path.current());
        view.set_accuracy_circle(pos.lat, pos.lon, pos.accuracy);
        view.pan_to(pos.lat, pos.lon);

        if self.phase == TrackerPhase::AwaitingFix {
            info!("First accurate fix at ({:.6}, {:.6})", pos.lat, pos.lon);
            self.phase = TrackerPhase::Tracking;
        }
        view.show_status(&format!("Tracking (±{:.0} m)", pos.accuracy), Severity::Info);

        match self.gate.should_geocode(pos.accuracy, coords, pos.timestamp) {
            GeocodeDecision::Attempt => {
                self.gate.record_attempt(coords, pos.timestamp);
                self.next_seq += 1;
                debug!("Geocode attempt #{}", self.next_seq);
                Some(GeocodeRequest {
                    seq: self.next_seq,
                    position: coords,
                })
            }
            GeocodeDecision::Skip => {
                view.show_popup(PopupContent::Coordinates(coords));
                None
            }
        }
    }

    /// Applies a finished lookup. Results that arrive after the marker is gone,
    /// or after a newer result was shown, are dropped.
    pub fn on_address_resolved(
        &mut self,
        request: GeocodeRequest,
        result: Result<AddressRecord, LookupError>,
        view: &mut impl MapView,
    ) {
        if self.marker.is_none() {
            debug!("Dropping address for request #{}: no marker", request.seq);
            return;
        }
        if self.applied_seq.is_some_and(|applied| request.seq < applied) {
            debug!("Dropping stale address for request #{}", request.seq);
            return;
        }
        self.applied_seq = Some(request.seq);

        match result {
            Ok(record) => view.show_popup(PopupContent::Address(record)),
            Err(e) => {
                debug!("Address lookup #{} failed: {}", request.seq, e);
                view.show_popup(PopupContent::Coordinates(request.position));
            }
        }
    }

    pub fn on_orientation(&mut self, heading: f64, view: &mut impl MapView) {
        if !self.orientation_enabled || self.phase == TrackerPhase::Idle {
            return;
        }
        self.smoother.observe(heading);
        if let Some(m) = self.marker {
            view.set_marker(m.lat(), m.lon(), self.smoother.current());
        }
    }

    /// Stream errors end the session.
    pub fn on_location_error(&mut self, code: LocationErrorCode, view: &mut impl MapView) {
        warn!("Location stream error: {:?}", code);
        view.show_status(code.message(), Severity::Error);
        self.halt();
    }

    pub fn clear_path(&mut self, view: &mut impl MapView) {
        self.path.clear();
        self.marker = None;
        view.remove_marker();
        view.set_path(&[]);
        info!("Path cleared");
    }

    pub fn enable_orientation(&mut self) {
        if !self.orientation_enabled {
            info!("Orientation heading enabled");
        }
        self.orientation_enabled = true;
    }

    pub fn disable_orientation(&mut self) {
        self.orientation_enabled = false;
    }

    pub fn orientation_enabled(&self) -> bool {
        self.orientation_enabled
    }

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != TrackerPhase::Idle
    }

    pub fn heading(&self) -> Option<f64> {
        self.smoother.current()
    }

    pub fn path(&self) -> &PathAccumulator<S> {
        &self.path
    }

    pub fn fix_count(&self) -> u64 {
        self.fix_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryPathStore;
    use chrono::{DateTime, TimeZone, Utc};

    #[derive(Debug, Clone, PartialEq)]
    enum ViewCommand {
        Marker(f64, f64, Option<f64>),
        RemoveMarker,
        Circle(f64, f64, f64),
        Path(Vec<LatLon>),
        Pan(f64, f64),
        Popup(PopupContent),
        Status(String, Severity),
    }

    #[derive(Default)]
    struct RecordingView {
        commands: Vec<ViewCommand>,
    }

    impl RecordingView {
        fn take(&mut self) -> Vec<ViewCommand> {
            std::mem::take(&mut self.commands)
        }

        fn paths(&self) -> Vec<usize> {
            self.commands
                .iter()
                .filter_map(|c| match c {
                    ViewCommand::Path(p) => Some(p.len()),
                    _ => None,
                })
                .collect()
        }
    }

    impl MapView for RecordingView {
        fn set_marker(&mut self, lat: f64, lon: f64, heading: Option<f64>) {
            self.commands.push(ViewCommand::Marker(lat, lon, heading));
        }
        fn remove_marker(&mut self) {
            self.commands.push(ViewCommand::RemoveMarker);
        }
        fn set_accuracy_circle(&mut self, lat: f64, lon: f64, radius_m: f64) {
            self.commands.push(ViewCommand::Circle(lat, lon, radius_m));
        }
        fn set_path(&mut self, points: &[LatLon]) {
            self.commands.push(ViewCommand::Path(points.to_vec()));
        }
        fn pan_to(&mut self, lat: f64, lon: f64) {
            self.commands.push(ViewCommand::Pan(lat, lon));
        }
        fn show_popup(&mut self, content: PopupContent) {
            self.commands.push(ViewCommand::Popup(content));
        }
        fn show_status(&mut self, message: &str, severity: Severity) {
            self.commands.push(ViewCommand::Status(message.to_string(), severity));
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn fix(lat: f64, lon: f64, accuracy: f64, heading: Option<f64>, ms: i64) -> Position {
        Position::new(lat, lon, Some(accuracy), heading, at(ms))
    }

    fn started() -> (Tracker<MemoryPathStore>, RecordingView) {
        let mut tracker = Tracker::new(MemoryPathStore::default(), &TrackerSettings::default());
        let mut view = RecordingView::default();
        tracker.start(&mut view);
        view.take();
        (tracker, view)
    }

    #[test]
    fn test_three_fixes_build_chronological_path() {
        let (mut tracker, mut view) = started();

        tracker.on_position(&fix(0.0, 0.0, 5.0, None, 0), &mut view);
        tracker.on_position(&fix(0.0, 0.001, 5.0, None, 2000), &mut view);
        tracker.on_position(&fix(0.0, 0.002, 5.0, None, 4000), &mut view);

        assert_eq!(
            tracker.path().current(),
            &[LatLon(0.0, 0.0), LatLon(0.0, 0.001), LatLon(0.0, 0.002)]
        );
        assert_eq!(view.paths(), vec![1, 2, 3]);
        assert_eq!(tracker.path().store().saves, 3);
        assert_eq!(tracker.fix_count(), 3);
    }

    #[test]
    fn test_accept_emits_marker_path_circle_pan() {
        let (mut tracker, mut view) = started();
        tracker.on_position(&fix(10.0, 20.0, 8.0, Some(90.0), 0), &mut view);

        let cmds = view.take();
        assert_eq!(cmds[0], ViewCommand::Marker(10.0, 20.0, Some(90.0)));
        assert_eq!(cmds[1], ViewCommand::Path(vec![LatLon(10.0, 20.0)]));
        assert_eq!(cmds[2], ViewCommand::Circle(10.0, 20.0, 8.0));
        assert_eq!(cmds[3], ViewCommand::Pan(10.0, 20.0));
        assert_eq!(tracker.phase(), TrackerPhase::Tracking);
    }

    #[test]
    fn test_defer_only_updates_circle_and_status() {
        let (mut tracker, mut view) = started();

        let req = tracker.on_position(&fix(1.0, 1.0, 150.0, Some(45.0), 0), &mut view);
        assert!(req.is_none());
        let cmds = view.take();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], ViewCommand::Circle(1.0, 1.0, 150.0));
        assert!(matches!(cmds[1], ViewCommand::Status(_, Severity::Warning)));
        assert_eq!(tracker.phase(), TrackerPhase::AwaitingFix);
        assert!(tracker.path().is_empty());
        // heading from a rejected fix is not used
        assert_eq!(tracker.heading(), None);
    }

    #[test]
    fn test_later_defer_keeps_tracking_state() {
        let (mut tracker, mut view) = started();
        tracker.on_position(&fix(1.0, 1.0, 10.0, None, 0), &mut view);
        view.take();

        tracker.on_position(&fix(1.5, 1.5, 80.0, None, 3000), &mut view);
        let cmds = view.take();
        assert!(!cmds.iter().any(|c| matches!(c, ViewCommand::Marker(..) | ViewCommand::Path(_))));
        assert_eq!(tracker.phase(), TrackerPhase::Tracking);
        assert_eq!(tracker.path().len(), 1);
    }

    #[test]
    fn test_idle_tracker_ignores_fixes() {
        let mut tracker = Tracker::new(MemoryPathStore::default(), &TrackerSettings::default());
        let mut view = RecordingView::default();
        assert!(tracker.on_position(&fix(1.0, 1.0, 5.0, None, 0), &mut view).is_none());
        assert!(view.commands.is_empty());
        assert!(tracker.path().is_empty());
    }

    #[test]
    fn test_geocode_requests_follow_the_gate() {
        let (mut tracker, mut view) = started();

        let first = tracker.on_position(&fix(0.0, 0.0, 5.0, None, 0), &mut view);
        assert_eq!(first, Some(GeocodeRequest { seq: 1, position: LatLon(0.0, 0.0) }));

        view.take();
        let second = tracker.on_position(&fix(0.0, 0.0, 5.0, None, 500), &mut view);
        assert!(second.is_none());
        assert!(view
            .take()
            .contains(&ViewCommand::Popup(PopupContent::Coordinates(LatLon(0.0, 0.0)))));

        assert!(tracker.on_position(&fix(0.0, 0.0001, 5.0, None, 1200), &mut view).is_none());
        let fourth = tracker.on_position(&fix(0.0, 0.0003, 5.0, None, 1200), &mut view);
        assert_eq!(fourth.map(|r| r.seq), Some(2));
    }

    #[test]
    fn test_geocode_distance_boundary() {
        let (mut tracker, mut view) = started();
        assert!(tracker.on_position(&fix(0.0, 0.0, 5.0, None, 0), &mut view).is_some());
        view.take();

        // just under 20 m: coordinates popup, no lookup
        let short = tracker.on_position(&fix(0.0, 0.0001796631, 5.0, None, 2000), &mut view);
        assert!(short.is_none());
        assert!(view
            .take()
            .contains(&ViewCommand::Popup(PopupContent::Coordinates(LatLon(0.0, 0.0001796631)))));

        // just over 20 m
        let far = tracker.on_position(&fix(0.0, 0.00018, 5.0, None, 2000), &mut view);
        assert_eq!(far, Some(GeocodeRequest { seq: 2, position: LatLon(0.0, 0.00018) }));
        assert!(!view.take().iter().any(|c| matches!(c, ViewCommand::Popup(_))));
    }

    #[test]
    fn test_accept_replaces_defer_warning() {
        let (mut tracker, mut view) = started();
        tracker.on_position(&fix(1.0, 1.0, 10.0, None, 0), &mut view);
        tracker.on_position(&fix(1.0, 1.0, 90.0, None, 1000), &mut view);
        assert_eq!(
            view.take().last(),
            Some(&ViewCommand::Status("Waiting for accurate fix (±90 m)".to_string(), Severity::Warning))
        );

        tracker.on_position(&fix(1.0, 1.0, 12.0, None, 2000), &mut view);
        let statuses: Vec<_> = view
            .take()
            .into_iter()
            .filter(|c| matches!(c, ViewCommand::Status(..)))
            .collect();
        assert_eq!(
            statuses,
            vec![ViewCommand::Status("Tracking (±12 m)".to_string(), Severity::Info)]
        );
    }

    #[test]
    fn test_resolved_address_becomes_popup() {
        let (mut tracker, mut view) = started();
        let req = tracker.on_position(&fix(0.0, 0.0, 5.0, None, 0), &mut view).unwrap();
        view.take();

        let record = AddressRecord {
            road: Some("Main St".to_string()),
            ..Default::default()
        };
        tracker.on_address_resolved(req, Ok(record.clone()), &mut view);
        assert_eq!(view.take(), vec![ViewCommand::Popup(PopupContent::Address(record))]);
    }

    #[test]
    fn test_failed_lookup_falls_back_to_coordinates() {
        let (mut tracker, mut view) = started();
        let req = tracker.on_position(&fix(3.0, 4.0, 5.0, None, 0), &mut view).unwrap();
        view.take();

        tracker.on_address_resolved(req, Err(LookupError::NoResult("none".to_string())), &mut view);
        assert_eq!(
            view.take(),
            vec![ViewCommand::Popup(PopupContent::Coordinates(LatLon(3.0, 4.0)))]
        );
        // path and marker were already updated before the lookup finished
        assert_eq!(tracker.path().len(), 1);
    }

    #[test]
    fn test_late_result_without_marker_is_dropped() {
        let (mut tracker, mut view) = started();
        let req = tracker.on_position(&fix(0.0, 0.0, 5.0, None, 0), &mut view).unwrap();
        tracker.stop(&mut view);
        tracker.clear_path(&mut view);
        view.take();

        tracker.on_address_resolved(req, Ok(AddressRecord::default()), &mut view);
        assert!(view.commands.is_empty());
    }

    #[test]
    fn test_late_result_after_stop_still_applies_to_marker() {
        let (mut tracker, mut view) = started();
        let req = tracker.on_position(&fix(0.0, 0.0, 5.0, None, 0), &mut view).unwrap();
        tracker.stop(&mut view);
        view.take();

        tracker.on_address_resolved(req, Ok(AddressRecord::default()), &mut view);
        assert_eq!(view.take().len(), 1);
    }

    #[test]
    fn test_out_of_order_result_is_dropped() {
        let (mut tracker, mut view) = started();
        let first = tracker.on_position(&fix(0.0, 0.0, 5.0, None, 0), &mut view).unwrap();
        let second = tracker.on_position(&fix(0.0, 0.01, 5.0, None, 2000), &mut view).unwrap();
        view.take();

        tracker.on_address_resolved(second, Ok(AddressRecord::default()), &mut view);
        tracker.on_address_resolved(first, Ok(AddressRecord::default()), &mut view);
        assert_eq!(view.take().len(), 1);
    }

    #[test]
    fn test_orientation_requires_enable() {
        let (mut tracker, mut view) = started();
        tracker.on_position(&fix(0.0, 0.0, 5.0, Some(350.0), 0), &mut view);
        view.take();

        tracker.on_orientation(10.0, &mut view);
        assert!(view.commands.is_empty());
        assert_eq!(tracker.heading(), Some(350.0));

        tracker.enable_orientation();
        tracker.on_orientation(10.0, &mut view);
        let cmds = view.take();
        assert_eq!(cmds.len(), 1);
        match cmds[0] {
            ViewCommand::Marker(lat, lon, Some(h)) => {
                assert_eq!((lat, lon), (0.0, 0.0));
                assert!((h - 353.6).abs() < 1e-9, "got {}", h);
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_orientation_before_first_fix_updates_heading_only() {
        let (mut tracker, mut view) = started();
        tracker.enable_orientation();
        tracker.on_orientation(120.0, &mut view);
        assert!(view.commands.is_empty());
        assert_eq!(tracker.heading(), Some(120.0));

        tracker.on_position(&fix(0.0, 0.0, 5.0, None, 0), &mut view);
        assert_eq!(view.take()[0], ViewCommand::Marker(0.0, 0.0, Some(120.0)));
    }

    #[test]
    fn test_location_error_stops_session() {
        let (mut tracker, mut view) = started();
        tracker.on_location_error(LocationErrorCode::PermissionDenied, &mut view);
        assert_eq!(tracker.phase(), TrackerPhase::Idle);
        assert_eq!(
            view.take(),
            vec![ViewCommand::Status(
                LocationErrorCode::PermissionDenied.message().to_string(),
                Severity::Error
            )]
        );
        assert!(tracker.on_position(&fix(0.0, 0.0, 5.0, None, 0), &mut view).is_none());
    }

    #[test]
    fn test_restart_restores_path_and_resets_gate() {
        let store = MemoryPathStore::with_points(&[LatLon(1.0, 1.0), LatLon(1.0, 1.001)]).unwrap();
        let mut tracker = Tracker::new(store, &TrackerSettings::default());
        let mut view = RecordingView::default();

        tracker.start(&mut view);
        assert_eq!(view.paths(), vec![2]);
        assert!(tracker.on_position(&fix(1.0, 1.002, 5.0, None, 0), &mut view).is_some());
        assert_eq!(tracker.path().len(), 3);

        tracker.stop(&mut view);
        tracker.start(&mut view);
        // same spot, inside the old window: only a fresh gate allows this
        assert!(tracker.on_position(&fix(1.0, 1.002, 5.0, None, 100), &mut view).is_some());
        assert_eq!(tracker.path().current()[0], LatLon(1.0, 1.0));
        assert_eq!(tracker.path().len(), 4);
    }

    #[test]
    fn test_clear_path_removes_marker() {
        let (mut tracker, mut view) = started();
        tracker.on_position(&fix(0.0, 0.0, 5.0, None, 0), &mut view);
        view.take();

        tracker.clear_path(&mut view);
        assert_eq!(view.take(), vec![ViewCommand::RemoveMarker, ViewCommand::Path(vec![])]);
        assert!(tracker.path().is_empty());
        assert_eq!(tracker.path().store().raw(), Some("[]"));
    }
}
