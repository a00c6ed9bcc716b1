//! Cross-task state notification bus.
//!
//! The protocol task is the only writer of [`SharedState`].  Other tasks
//! (animation, web UI) never read it directly; they subscribe here and
//! receive copies whenever a poll reports a change.
//!
//! ```text
//! ┌───────────────┐  StateChange  ┌────────────────┐
//! │ Protocol task │──────────────▶│ Animation task │
//! │ (publisher)   │──────┐        └────────────────┘
//! └───────────────┘      │        ┌────────────────┐
//!                        └───────▶│ Web UI task    │
//!                                 └────────────────┘
//! ```
//!
//! Publishing never blocks: a slow subscriber loses the oldest changes and
//! catches up from the next full copy.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Subscriber};

use crate::link::ConnectionState;
use crate::state::{FieldSet, SharedState};

/// Changes buffered per subscriber.
pub const BUS_DEPTH: usize = 8;

/// Maximum concurrent subscribers.
pub const BUS_SUBSCRIBERS: usize = 4;

/// One published change: what moved, plus a full copy to read it from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange {
    pub fields: FieldSet,
    pub connection: ConnectionState,
    pub state: SharedState,
}

type Channel = PubSubChannel<CriticalSectionRawMutex, StateChange, BUS_DEPTH, BUS_SUBSCRIBERS, 1>;

/// Subscriber handle returned by [`StateBus::subscribe`].
pub type StateSubscriber<'a> =
    Subscriber<'a, CriticalSectionRawMutex, StateChange, BUS_DEPTH, BUS_SUBSCRIBERS, 1>;

/// Single-publisher, multi-subscriber bus of [`StateChange`]s.
pub struct StateBus {
    channel: Channel,
}

impl StateBus {
    pub const fn new() -> Self {
        Self {
            channel: PubSubChannel::new(),
        }
    }

    /// Publish without waiting, displacing the oldest change if full.
    pub fn publish(&self, fields: FieldSet, connection: ConnectionState, state: &SharedState) {
        self.channel.immediate_publisher().publish_immediate(StateChange {
            fields,
            connection,
            state: *state,
        });
    }

    /// `None` once every subscriber slot is taken.
    pub fn subscribe(&self) -> Option<StateSubscriber<'_>> {
        self.channel.subscriber().ok()
    }
}

impl Default for StateBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide bus fed by the protocol task.
pub static STATE_BUS: StateBus = StateBus::new();
