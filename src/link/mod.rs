//! Connection lifecycle: a function-pointer state machine per link.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                       │
//! │  ┌───────────────┬──────────┬─────────┬─────────────┬──────────┐  │
//! │  │ State         │ on_enter │ on_exit │ on_packet   │ on_tick  │  │
//! │  ├───────────────┼──────────┼─────────┼─────────────┼──────────┤  │
//! │  │ AwaitingSync  │ fn(ctx)  │ fn(ctx) │ fn(ctx,pkt) │ fn(ctx)  │  │
//! │  │ SyncRequested │ fn(ctx)  │ fn(ctx) │ fn(ctx,pkt) │ fn(ctx)  │  │
//! │  │ Connected     │ fn(ctx)  │ fn(ctx) │ fn(ctx,pkt) │ fn(ctx)  │  │
//! │  └───────────────┴──────────┴─────────┴─────────────┴──────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every decoded inbound packet goes to the current state's `on_packet`;
//! every poll calls `on_tick` so cooperative timers can fire.  Either may
//! return `Some(next)`, after which the engine runs `on_exit` for the
//! current state, then `on_enter` for the next.
//!
//! The engine is generic over its context so the accessory and hub roles
//! share it with their own tables ([`accessory`], [`hub`]).

pub mod accessory;
pub mod hub;
pub mod timer;

use heapless::Deque;
use log::{info, warn};
use serde::Serialize;

use crate::app::events::LinkEvent;
use crate::app::ports::EventSink;
use crate::error::LinkError;
use crate::protocol::{Codec, Packet, PacketTransport};

pub use accessory::AccessoryLink;
pub use hub::HubLink;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Per-link connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ConnectionState {
    AwaitingSync = 0,
    SyncRequested = 1,
    Connected = 2,
}

impl ConnectionState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to a state.  Out-of-range falls back to
    /// `AwaitingSync`, the safe reset state.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            1 => Self::SyncRequested,
            2 => Self::Connected,
            _ => {
                debug_assert!(idx == 0, "invalid state index: {idx}");
                Self::AwaitingSync
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn<C> = fn(&mut C);

/// Per-packet handler.  Returns `Some(next)` to transition.
pub type PacketFn<C> = fn(&mut C, &Packet) -> Option<ConnectionState>;

/// Per-poll handler for timers.  Returns `Some(next)` to transition.
pub type TickFn<C> = fn(&mut C) -> Option<ConnectionState>;

/// Static descriptor for a single link state.
pub struct StateDescriptor<C> {
    pub id: ConnectionState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn<C>>,
    pub on_exit: Option<StateActionFn<C>>,
    pub on_packet: PacketFn<C>,
    pub on_tick: TickFn<C>,
}

/// Hook the engine calls on every transition.
pub trait LinkContext {
    fn on_transition(&mut self, from: ConnectionState, to: ConnectionState);
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The link state machine engine.
pub struct Fsm<C> {
    table: [StateDescriptor<C>; ConnectionState::COUNT],
    current: usize,
    transitions: u32,
}

impl<C: LinkContext> Fsm<C> {
    pub fn new(table: [StateDescriptor<C>; ConnectionState::COUNT], initial: ConnectionState) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut C) {
        info!("LINK starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Hand one decoded packet to the current state.
    pub fn handle_packet(&mut self, ctx: &mut C, packet: &Packet) {
        if let Some(next) = (self.table[self.current].on_packet)(ctx, packet) {
            self.transition(next, ctx);
        }
    }

    /// Give the current state a chance to act on its timers.
    pub fn tick(&mut self, ctx: &mut C) {
        if let Some(next) = (self.table[self.current].on_tick)(ctx) {
            self.transition(next, ctx);
        }
    }

    /// Force an immediate transition regardless of handlers.
    pub fn force_transition(&mut self, next: ConnectionState, ctx: &mut C) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> ConnectionState {
        self.table[self.current].id
    }

    /// Number of transitions since construction.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: ConnectionState, ctx: &mut C) {
        let next_idx = next as usize;
        let from = self.table[self.current].id;

        info!(
            "LINK transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.transitions = self.transitions.wrapping_add(1);
        ctx.on_transition(from, next);

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Outbox and event queue shared by both roles
// ---------------------------------------------------------------------------

/// Outbound packets waiting for the next flush.
pub const OUTBOX_DEPTH: usize = 8;

/// Events waiting for the next drain.
pub const EVENT_DEPTH: usize = 16;

/// Bounded queue of packets to send.
#[derive(Default)]
pub struct Outbox {
    queue: Deque<Packet, OUTBOX_DEPTH>,
}

impl Outbox {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Queue a packet.  A full outbox drops it.
    pub fn push(&mut self, packet: Packet) -> Result<(), LinkError> {
        self.queue.push_back(packet).map_err(|dropped| {
            warn!("LINK outbox full, dropping {:?}", dropped.kind());
            LinkError::OutboxFull
        })
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Encode and send everything queued.  Returns the number of packets
    /// handed to the transport.
    pub fn flush<T: PacketTransport>(&mut self, codec: &Codec, transport: &mut T) -> usize {
        let mut sent = 0;
        while let Some(packet) = self.queue.pop_front() {
            match codec.encode(&packet) {
                Ok(frame) => match transport.send(frame.kind, &frame.payload) {
                    Ok(()) => sent += 1,
                    Err(e) => warn!("LINK send failed: {:?}", e),
                },
                Err(e) => warn!("LINK encode failed: {}", e),
            }
        }
        sent
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.queue.iter()
    }
}

/// Bounded queue of events; the oldest is discarded on overflow.
#[derive(Default)]
pub struct EventQueue {
    queue: Deque<LinkEvent, EVENT_DEPTH>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    pub fn push(&mut self, event: LinkEvent) {
        if self.queue.is_full() {
            let _ = self.queue.pop_front();
        }
        let _ = self.queue.push_back(event);
    }

    pub fn drain_into(&mut self, sink: &mut impl EventSink) {
        while let Some(event) = self.queue.pop_front() {
            sink.emit(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Running counters for diagnostics and the status document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LinkStats {
    pub frames_received: u32,
    pub frames_dropped: u32,
    pub packets_sent: u32,
    pub disconnects: u32,
}
