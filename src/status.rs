//! Status document for the UI collaborator.
//!
//! A serde view over the mirrored state and link health, rendered to JSON
//! for whatever serves the web page.  Values are a copy taken at one poll;
//! `stale` is set whenever the link is not connected, since the mirrored
//! fields then hold the last known hub state.

use serde::Serialize;

use crate::link::{AccessoryLink, ConnectionState, LinkStats};
use crate::protocol::{PacketTransport, PreferenceKind};
use crate::state::SharedState;

/// Which preference kinds have arrived since the last (re)connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PreferenceFlags {
    pub hub: bool,
    pub accessory: bool,
    pub shared: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusReport {
    pub connection: ConnectionState,
    pub stale: bool,
    pub state: SharedState,
    /// Volts, from the hub's battery telemetry.
    pub pack_voltage: f32,
    /// Amps, from the wand's current telemetry.
    pub wand_amps: f32,
    /// First and last playable track.
    pub track_range: Option<(u16, u16)>,
    pub preferences: PreferenceFlags,
    pub stats: LinkStats,
}

impl StatusReport {
    pub fn new(
        connection: ConnectionState,
        state: &SharedState,
        preferences: PreferenceFlags,
        stats: LinkStats,
    ) -> Self {
        Self {
            connection,
            stale: connection != ConnectionState::Connected,
            state: *state,
            pack_voltage: state.pack_voltage(),
            wand_amps: state.wand_amps(),
            track_range: state.track_range(),
            preferences,
            stats,
        }
    }

    /// Capture the current view of an accessory link.
    pub fn capture<T: PacketTransport>(link: &AccessoryLink<T>) -> Self {
        let prefs = link.preferences();
        Self::new(
            link.connection_state(),
            link.state(),
            PreferenceFlags {
                hub: prefs.is_received(PreferenceKind::Hub),
                accessory: prefs.is_received(PreferenceKind::Accessory),
                shared: prefs.is_received(PreferenceKind::Shared),
            },
            link.stats(),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
