//! Port traits: the hexagonal boundary between the link and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AccessoryLink / HubLink (domain)
//! ```
//!
//! Driven adapters (event sinks, preference storage, the hub's own
//! firmware) implement these traits.  The links consume them via generics,
//! so the protocol core never touches hardware directly.

use super::commands::HubRequest;
use super::events::LinkEvent;
use crate::error::StorageError;
use crate::protocol::{PreferenceBlock, PreferenceKind};

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: link → logging / UI / animation)
// ───────────────────────────────────────────────────────────────

/// The link emits structured [`LinkEvent`]s through this port.
///
/// Implementations must not call back into the link synchronously.
pub trait EventSink {
    fn emit(&mut self, event: &LinkEvent);
}

/// Discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &LinkEvent) {}
}

/// Collects events in memory; used by tests and the status endpoint.
impl EventSink for Vec<LinkEvent> {
    fn emit(&mut self, event: &LinkEvent) {
        self.push(*event);
    }
}

// ───────────────────────────────────────────────────────────────
// Preference storage port (driven adapter: hub ↔ EEPROM / NVS)
// ───────────────────────────────────────────────────────────────

/// Persists preference blocks on the hub.
///
/// Implementations own integrity validation of their stored copy.  A block
/// that fails validation is reported as absent (or replaced by defaults);
/// the link accepts whatever it is given.
pub trait PreferenceStore {
    /// Load the stored block of `kind`, if one exists and validates.
    fn load(&self, kind: PreferenceKind) -> Option<PreferenceBlock>;

    /// Persist `block`, replacing any stored block of the same kind.
    fn store(&mut self, block: &PreferenceBlock) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Hub delegate (accessory requests → hub firmware)
// ───────────────────────────────────────────────────────────────

/// Receives requests the accessory makes of the hub (power, volume, music).
///
/// The hub firmware acts on them and reports resulting state changes back
/// through [`crate::link::hub::HubLink::broadcast`].
pub trait HubDelegate {
    fn on_request(&mut self, request: HubRequest);
}
