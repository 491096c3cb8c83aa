//! Location stream sources.
//!
//! A [`LocationSource`] pushes [`Event::Position`] and [`Event::LocationError`]
//! into the app's event channel from its own task. Two sources exist:
//! [`TrackReplaySource`] replays a recorded GNSS track at its original
//! cadence, and [`IpLocationSource`] produces one coarse fix from IP
//! geolocation.

use crate::events::Event;
use crate::models::Position;
use chrono::{DateTime, Utc};
use ipgeolocate::{Locator, Service};
use serde::Deserialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Terminal stream failures. Any of these ends the tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown,
}

impl LocationErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Location permission denied.",
            Self::PositionUnavailable => "Location information is unavailable.",
            Self::Timeout => "Timed out waiting for a location fix.",
            Self::Unknown => "An unknown location error occurred.",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LocationOptions {
    pub high_accuracy: bool,
    /// Oldest cached fix a new subscriber may receive.
    pub maximum_age: Duration,
    /// Longest wait for the next fix before giving up.
    pub timeout: Duration,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age: Duration::from_millis(3000),
            timeout: Duration::from_millis(10000),
        }
    }
}

/// Live subscription to a source. Dropping it unsubscribes.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub trait LocationSource: Send + Sync + 'static {
    fn subscribe(self: Arc<Self>, tx: UnboundedSender<Event>, options: LocationOptions) -> Subscription;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackRecord {
    pub elapsed_ms: u64,
    pub lat: f64,
    pub lon: f64,
    pub accuracy: Option<f64>,
    pub heading: Option<f64>,
}

/// Reads `elapsed_ms,lat,lon,accuracy,heading` rows; the last two may be empty.
pub fn parse_track<R: Read>(reader: R) -> Result<Vec<TrackRecord>, LocationErrorCode> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (i, result) in rdr.deserialize::<TrackRecord>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                error!("Malformed track row {}: {}", i + 1, e);
                return Err(error_code_for_csv(&e));
            }
        }
    }
    Ok(records)
}

fn error_code_for_io(e: &io::Error) -> LocationErrorCode {
    match e.kind() {
        io::ErrorKind::NotFound => LocationErrorCode::PositionUnavailable,
        io::ErrorKind::PermissionDenied => LocationErrorCode::PermissionDenied,
        _ => LocationErrorCode::Unknown,
    }
}

fn error_code_for_csv(e: &csv::Error) -> LocationErrorCode {
    match e.kind() {
        csv::ErrorKind::Io(io_err) => error_code_for_io(io_err),
        _ => LocationErrorCode::Unknown,
    }
}

#[derive(Default)]
struct ReplayState {
    next_row: usize,
    last_fix: Option<Position>,
}

pub struct TrackReplaySource {
    path: PathBuf,
    state: Mutex<ReplayState>,
}

impl TrackReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(ReplayState::default()),
        }
    }

    /// Last delivered fix, if it is no older than `maximum_age` at `now`.
    pub fn cached_fix(&self, maximum_age: Duration, now: DateTime<Utc>) -> Option<Position> {
        let state = self.state.lock().ok()?;
        let fix = state.last_fix.as_ref()?;
        let age = (now - fix.timestamp).to_std().unwrap_or(Duration::ZERO);
        (age <= maximum_age).then(|| fix.clone())
    }

    fn load(&self) -> Result<Vec<TrackRecord>, LocationErrorCode> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            warn!("Cannot open track {}: {}", self.path.display(), e);
            error_code_for_io(&e)
        })?;
        parse_track(io::BufReader::new(file))
    }

    fn remember(&self, row: usize, fix: &Position) {
        if let Ok(mut state) = self.state.lock() {
            state.next_row = row + 1;
            state.last_fix = Some(fix.clone());
        }
    }

    fn resume_row(&self) -> usize {
        self.state.lock().map(|s| s.next_row).unwrap_or(0)
    }

    async fn replay(self: Arc<Self>, tx: UnboundedSender<Event>, options: LocationOptions) {
        if let Some(fix) = self.cached_fix(options.maximum_age, Utc::now()) {
            if tx.send(Event::Position(fix)).is_err() {
                return;
            }
        }

        let records = match self.load() {
            Ok(r) => r,
            Err(code) => {
                let _ = tx.send(Event::LocationError(code));
                return;
            }
        };

        let start = self.resume_row();
        let mut prev_elapsed = start
            .checked_sub(1)
            .and_then(|i| records.get(i))
            .map(|r| r.elapsed_ms)
            .unwrap_or(0);

        for (row, record) in records.iter().enumerate().skip(start) {
            let wait = Duration::from_millis(record.elapsed_ms.saturating_sub(prev_elapsed));
            if wait > options.timeout {
                tokio::time::sleep(options.timeout).await;
                let _ = tx.send(Event::LocationError(LocationErrorCode::Timeout));
                return;
            }
            tokio::time::sleep(wait).await;

            let fix = Position::new(record.lat, record.lon, record.accuracy, record.heading, Utc::now());
            self.remember(row, &fix);
            if tx.send(Event::Position(fix)).is_err() {
                return;
            }
            prev_elapsed = record.elapsed_ms;
        }
        info!("Track replay finished after {} rows", records.len());
    }
}

impl LocationSource for TrackReplaySource {
    fn subscribe(self: Arc<Self>, tx: UnboundedSender<Event>, options: LocationOptions) -> Subscription {
        info!("Replaying track from {}", self.path.display());
        Subscription {
            handle: tokio::spawn(self.replay(tx, options)),
        }
    }
}

/// Coarse network location. Produces a single fix with a fixed, large
/// accuracy radius.
pub struct IpLocationSource {
    address: String,
    accuracy_m: f64,
}

impl IpLocationSource {
    pub fn new(address: &str, accuracy_m: f64) -> Self {
        Self {
            address: address.to_string(),
            accuracy_m,
        }
    }

    async fn locate(&self) -> Result<Position, LocationErrorCode> {
        let loc = Locator::get(&self.address, Service::IpApi).await.map_err(|e| {
            error!("Error using geolocation service: {}", e);
            LocationErrorCode::PositionUnavailable
        })?;
        let lat = loc.latitude.parse::<f64>();
        let lon = loc.longitude.parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => {
                info!("Geolocation successful - ({}, {})", lat, lon);
                Ok(Position::new(lat, lon, Some(self.accuracy_m), None, Utc::now()))
            }
            _ => {
                error!("Geolocation returned unparseable coordinates");
                Err(LocationErrorCode::PositionUnavailable)
            }
        }
    }
}

impl LocationSource for IpLocationSource {
    fn subscribe(self: Arc<Self>, tx: UnboundedSender<Event>, options: LocationOptions) -> Subscription {
        let handle = tokio::spawn(async move {
            let event = match tokio::time::timeout(options.timeout, self.locate()).await {
                Ok(Ok(fix)) => Event::Position(fix),
                Ok(Err(code)) => Event::LocationError(code),
                Err(_) => Event::LocationError(LocationErrorCode::Timeout),
            };
            let _ = tx.send(event);
        });
        Subscription { handle }
    }
}
