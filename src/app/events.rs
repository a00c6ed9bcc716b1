//! Outbound link events.
//!
//! The link emits these through the [`EventSink`](super::ports::EventSink)
//! port at the end of every poll.  Adapters on the other side decide what
//! to do with them: log to serial, publish on the notification bus, push to
//! a websocket.

use crate::link::ConnectionState;
use crate::protocol::{PreferenceKind, Role};
use crate::state::FieldSet;

/// Structured events emitted by a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link has started (carries role and initial state).
    Started { role: Role, state: ConnectionState },

    /// The connection state machine moved between states.
    ConnectionChanged {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// Mirrored state changed; carries every field that was reported.
    StateChanged(FieldSet),

    /// A preference block arrived that differs from the staged copy.
    PreferencesReceived(PreferenceKind),

    /// A pushed preference block was persisted (hub side).
    PreferencesStored(PreferenceKind),

    /// The disconnect watchdog fired.
    Disconnected,
}
