//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each link event as one line to the
//! logger (UART / USB-CDC on the ESP32, stderr or nothing on the host).

use log::{info, warn};

use crate::app::events::LinkEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`LinkEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::Started { role, state } => {
                info!("START | role={:?} | state={:?}", role, state);
            }
            LinkEvent::ConnectionChanged { from, to } => {
                info!("LINK  | {:?} -> {:?}", from, to);
            }
            LinkEvent::StateChanged(fields) => {
                info!("STATE | changed=[{}]", fields);
            }
            LinkEvent::PreferencesReceived(kind) => {
                info!("PREFS | received kind={:?}", kind);
            }
            LinkEvent::PreferencesStored(kind) => {
                info!("PREFS | stored kind={:?}", kind);
            }
            LinkEvent::Disconnected => {
                warn!("LINK  | peer lost, state is stale until resync");
            }
        }
    }
}
