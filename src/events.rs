//! Event types and the main event loop driver.
//!
//! Every producer (terminal input, the location source, finished address
//! lookups) posts an [`Event`] into one unbounded channel. The main loop in
//! `main.rs` is the only consumer, so all tracker state is mutated from a
//! single task and each event is handled to completion before the next.

use crate::api::LookupError;
use crate::location::LocationErrorCode;
use crate::models::{AddressRecord, Position};
use crate::tracker::GeocodeRequest;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::error;

/// Events processed by the application event loop.
pub enum Event {
    /// Periodic tick used for UI refresh.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// A fix from the active location source.
    Position(Position),
    /// The location source failed; the session must stop.
    LocationError(LocationErrorCode),
    /// A reverse-geocode lookup finished (successfully or not).
    AddressResolved {
        request: GeocodeRequest,
        result: Result<AddressRecord, LookupError>,
    },
}

/// Multiplexes terminal input, ticks and background results into a single
/// event stream.
///
/// The sender ([`tx`](EventHandler::tx)) can be cloned and given to other
/// tasks (location sources, geocode lookups), while the receiver is consumed
/// by [`next`](EventHandler::next) in the main loop.
pub struct EventHandler {
    /// Sender for posting events from background tasks.
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// The spawned task polls crossterm with a timeout of `tick_rate_ms`;
    /// when a key is pressed it sends [`Event::Input`], and when the tick
    /// interval elapses it sends [`Event::Tick`]. If the terminal stops
    /// answering, the task logs the error and exits.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));
                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) => {
                            event_tx.send(Event::Input(key)).ok();
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            break;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        break;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// Receives the next event from the channel.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
