use crate::api::{NominatimClient, ReverseGeocoder};
use crate::config::Config;
use crate::db::{MemoryPathStore, PathStore, SqlitePathStore};
use crate::events::Event;
use crate::location::{IpLocationSource, LocationOptions, LocationSource, Subscription, TrackReplaySource};
use crate::models::LatLon;
use crate::orientation::{KeyboardCompass, OrientationCapability, OrientationSource};
use crate::tracker::{GeocodeRequest, Tracker};
use crate::view::{MapState, MapView, Severity};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

pub struct App {
    pub map: MapState,
    pub tracker: Tracker<Box<dyn PathStore>>,
    pub should_quit: bool,
    pub tick_count: usize,
    pub lookups_in_flight: usize,
    pub source_name: &'static str,
    compass: KeyboardCompass,
    step_degrees: f64,
    source: Arc<dyn LocationSource>,
    options: LocationOptions,
    subscription: Option<Subscription>,
    geocoder: Arc<NominatimClient>,
    tx: UnboundedSender<Event>,
}

impl App {
    pub fn new(config: &Config, tx: UnboundedSender<Event>, persist: bool) -> Result<Self> {
        let store: Box<dyn PathStore> = if persist {
            Box::new(SqlitePathStore::open(&config.storage.db_path, &config.storage.path_key)?)
        } else {
            Box::new(MemoryPathStore::default())
        };

        let options = config.location_options();
        // high accuracy means satellite fixes; otherwise settle for network location
        let source: Arc<dyn LocationSource> = if options.high_accuracy {
            Arc::new(TrackReplaySource::new(&config.location.track_file))
        } else {
            Arc::new(IpLocationSource::new(
                &config.location.ip_lookup_address,
                config.location.ip_fix_accuracy_m,
            ))
        };
        let source_name = if options.high_accuracy { "GNSS track" } else { "IP geolocation" };

        Ok(Self {
            map: MapState::new(LatLon(0.0, 0.0), config.ui.zoom_span_degrees),
            tracker: Tracker::new(store, &config.tracker_settings()),
            should_quit: false,
            tick_count: 0,
            lookups_in_flight: 0,
            source_name,
            compass: KeyboardCompass::new(config.orientation.mode, config.orientation.grant_on_request),
            step_degrees: config.orientation.step_degrees,
            source,
            options,
            subscription: None,
            geocoder: Arc::new(NominatimClient::new(&config.geocode)?),
            tx,
        })
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick => self.on_tick(),
            Event::Input(key) => self.handle_key(key),
            Event::Position(fix) => {
                if let Some(request) = self.tracker.on_position(&fix, &mut self.map) {
                    self.spawn_lookup(request);
                }
            }
            Event::LocationError(code) => {
                self.tracker.on_location_error(code, &mut self.map);
                self.subscription = None;
            }
            Event::AddressResolved { request, result } => {
                self.lookups_in_flight = self.lookups_in_flight.saturating_sub(1);
                self.tracker.on_address_resolved(request, result, &mut self.map);
            }
        }
    }

    pub fn on_tick(&mut self) {
        self.tick_count += 1;
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => {
                self.stop_tracking();
                self.should_quit = true;
            }
            KeyCode::Char('s') => {
                if self.tracker.is_active() {
                    self.stop_tracking();
                } else {
                    self.start_tracking();
                }
            }
            KeyCode::Char('c') => self.tracker.clear_path(&mut self.map),
            KeyCode::Char('o') => self.toggle_orientation(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.map.zoom_in(),
            KeyCode::Char('-') => self.map.zoom_out(),
            KeyCode::Left => self.turn(-self.step_degrees),
            KeyCode::Right => self.turn(self.step_degrees),
            _ => {}
        }
    }

    pub fn start_tracking(&mut self) {
        if self.tracker.is_active() {
            return;
        }
        self.tracker.start(&mut self.map);
        let source = Arc::clone(&self.source);
        self.subscription = Some(source.subscribe(self.tx.clone(), self.options));
        info!("Subscribed to {}", self.source_name);
    }

    /// Unsubscribes the location source. In-flight lookups are left to finish.
    pub fn stop_tracking(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
        }
        self.tracker.stop(&mut self.map);
    }

    fn toggle_orientation(&mut self) {
        if self.tracker.orientation_enabled() {
            self.tracker.disable_orientation();
            self.map.show_status("Compass heading off", Severity::Info);
            return;
        }

        let granted = match self.compass.probe() {
            OrientationCapability::Granted => true,
            OrientationCapability::NeedsPermission => self.compass.request_permission(),
            OrientationCapability::Unsupported => {
                self.map.show_status("Device orientation is not supported", Severity::Warning);
                return;
            }
        };

        if granted {
            self.tracker.enable_orientation();
            self.map.show_status("Compass heading on (use ← →)", Severity::Info);
        } else {
            warn!("Orientation permission refused; using location heading only");
            self.map.show_status("Orientation permission denied", Severity::Warning);
        }
    }

    fn turn(&mut self, delta: f64) {
        if !self.tracker.orientation_enabled() {
            return;
        }
        if let Some(heading) = self.compass.rotate(delta) {
            self.tracker.on_orientation(heading, &mut self.map);
        }
    }

    fn spawn_lookup(&mut self, request: GeocodeRequest) {
        self.lookups_in_flight += 1;
        let geocoder = Arc::clone(&self.geocoder);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let LatLon(lat, lon) = request.position;
            let result = geocoder.resolve_address(lat, lon).await;
            let _ = tx.send(Event::AddressResolved { request, result });
        });
    }
}
