//! Hub side of a link: owns the state of truth and serves syncs.
//!
//! The hub probes with a handshake every `hub_handshake_interval_ms`.  An
//! accessory answers a probe (or its own retry timer fires) with a
//! sync-start, and the hub replies with the full sync sequence:
//!
//! ```text
//!   hub                                  accessory
//!    │ ── Handshake ───────────────────▶ │
//!    │ ◀──────────────────── SyncStart ── │
//!    │ ── SyncStart ───────────────────▶ │
//!    │ ── Snapshot ────────────────────▶ │
//!    │ ── AlarmOn (if alarmed) ─────────▶ │
//!    │ ── SyncEnd ─────────────────────▶ │
//!    │ ◀────────────────────── SyncEnd ── │   connected
//! ```
//!
//! Until the accessory acknowledges, only sync-control opcodes are
//! accepted.  Requests the accessory makes while connected are parsed into
//! [`HubRequest`]s for the [`HubDelegate`]; preference traffic goes to the
//! [`PreferenceStore`].

use heapless::Deque;
use log::{debug, info, warn};

use super::timer::Countdown;
use super::{
    ConnectionState, EventQueue, Fsm, LinkContext, LinkStats, Outbox, StateDescriptor,
};
use crate::app::commands::{AccessoryCommand, HubRequest};
use crate::app::events::LinkEvent;
use crate::app::ports::{EventSink, HubDelegate, PreferenceStore};
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::protocol::{Codec, Opcode, Packet, PacketTransport, PreferenceBlock, PreferenceKind, Role};
use crate::state::{ChangeReport, SharedState, snapshot};

/// Requests held between packet handling and delegate dispatch.
pub const REQUEST_DEPTH: usize = 8;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything the hub state handlers read and write.
pub struct HubContext {
    pub config: LinkConfig,
    pub now_ms: u64,
    pub state: SharedState,

    pub handshake: Countdown,
    pub watchdog: Countdown,
    pub sync_window: Countdown,

    /// Changes made while unsynchronised that no sync has carried yet.
    pub dirty: bool,

    requests: Deque<HubRequest, REQUEST_DEPTH>,
    pref_requests: Deque<PreferenceKind, 3>,
    pushed: Deque<PreferenceBlock, 3>,
    outbox: Outbox,
    events: EventQueue,
    stats: LinkStats,
}

impl HubContext {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            now_ms: 0,
            state: SharedState::new(config.music_track_offset),
            handshake: Countdown::new(),
            watchdog: Countdown::new(),
            sync_window: Countdown::new(),
            dirty: false,
            requests: Deque::new(),
            pref_requests: Deque::new(),
            pushed: Deque::new(),
            outbox: Outbox::new(),
            events: EventQueue::new(),
            stats: LinkStats::default(),
        }
    }

    fn send(&mut self, packet: Packet) {
        let _ = self.outbox.push(packet);
    }

    fn send_command(&mut self, op: Opcode) {
        self.send(Packet::command(op, 0));
    }

    /// Queue the full sync sequence for the current state of truth.
    fn serve_sync(&mut self) {
        info!("LINK serving sync to accessory");
        self.dirty = false;
        self.send_command(Opcode::SyncStart);
        self.send(Packet::Snapshot(snapshot::capture(&self.state)));
        if self.state.alarm {
            self.send_command(Opcode::AlarmOn);
        }
        self.send_command(Opcode::SyncEnd);
    }

    /// Probe on schedule; runs in every state.
    fn probe(&mut self) {
        if self.handshake.just_finished(self.now_ms) {
            self.send_command(Opcode::Handshake);
            self.handshake
                .start(self.now_ms, self.config.hub_handshake_interval_ms);
        }
    }

    fn route_command(&mut self, opcode: Opcode, value: u16) {
        let pref = match opcode {
            Opcode::RequestPreferencesPack => Some(PreferenceKind::Hub),
            Opcode::RequestPreferencesWand => Some(PreferenceKind::Accessory),
            Opcode::RequestPreferencesSmoke => Some(PreferenceKind::Shared),
            _ => None,
        };
        if let Some(kind) = pref {
            if self.pref_requests.push_back(kind).is_err() {
                warn!("LINK preference request backlog full, dropping {:?}", kind);
            }
            return;
        }

        match AccessoryCommand::from_command(opcode, value) {
            Some(request) => {
                if self.requests.push_back(request).is_err() {
                    warn!("LINK request backlog full, dropping {:?}", request);
                }
            }
            None => debug!("LINK hub ignoring {:?} from accessory", opcode),
        }
    }
}

impl LinkContext for HubContext {
    fn on_transition(&mut self, from: ConnectionState, to: ConnectionState) {
        self.events.push(LinkEvent::ConnectionChanged { from, to });
    }
}

// ---------------------------------------------------------------------------
// State table
// ---------------------------------------------------------------------------

/// Build the hub state table, indexed by `ConnectionState as usize`.
pub fn build_state_table() -> [StateDescriptor<HubContext>; ConnectionState::COUNT] {
    [
        StateDescriptor {
            id: ConnectionState::AwaitingSync,
            name: "AwaitingSync",
            on_enter: Some(awaiting_enter),
            on_exit: None,
            on_packet: awaiting_packet,
            on_tick: awaiting_tick,
        },
        StateDescriptor {
            id: ConnectionState::SyncRequested,
            name: "SyncRequested",
            on_enter: Some(sync_enter),
            on_exit: None,
            on_packet: sync_packet,
            on_tick: sync_tick,
        },
        StateDescriptor {
            id: ConnectionState::Connected,
            name: "Connected",
            on_enter: Some(connected_enter),
            on_exit: None,
            on_packet: connected_packet,
            on_tick: connected_tick,
        },
    ]
}

// ── AwaitingSync ──────────────────────────────────────────────

fn awaiting_enter(ctx: &mut HubContext) {
    ctx.watchdog.stop();
    ctx.sync_window.stop();
    ctx.requests.clear();
    ctx.pref_requests.clear();
    if !ctx.handshake.is_running() {
        // Probe on the first tick.
        ctx.handshake.start(ctx.now_ms, 0);
    }
}

fn awaiting_packet(ctx: &mut HubContext, packet: &Packet) -> Option<ConnectionState> {
    match packet.command_opcode() {
        Some(Opcode::SyncStart) => {
            ctx.serve_sync();
            Some(ConnectionState::SyncRequested)
        }
        // An echo means the accessory still considers itself synced.  Its
        // view is stale if the hub changed state meanwhile.
        Some(Opcode::SyncEnd | Opcode::Handshake) if ctx.dirty => {
            ctx.serve_sync();
            Some(ConnectionState::SyncRequested)
        }
        Some(Opcode::SyncEnd | Opcode::Handshake) => Some(ConnectionState::Connected),
        _ => {
            debug!("LINK hub ignoring {:?} while unsynchronised", packet.kind());
            None
        }
    }
}

fn awaiting_tick(ctx: &mut HubContext) -> Option<ConnectionState> {
    ctx.probe();
    None
}

// ── SyncRequested ─────────────────────────────────────────────

fn sync_enter(ctx: &mut HubContext) {
    ctx.sync_window.start(ctx.now_ms, ctx.config.sync_window_ms);
}

fn sync_packet(ctx: &mut HubContext, packet: &Packet) -> Option<ConnectionState> {
    match packet.command_opcode() {
        Some(Opcode::SyncEnd) => Some(ConnectionState::Connected),
        Some(Opcode::SyncStart) => {
            ctx.serve_sync();
            ctx.sync_window.restart(ctx.now_ms);
            None
        }
        _ => {
            debug!("LINK hub ignoring {:?} while sync is open", packet.kind());
            None
        }
    }
}

fn sync_tick(ctx: &mut HubContext) -> Option<ConnectionState> {
    ctx.probe();
    if ctx.sync_window.just_finished(ctx.now_ms) {
        warn!("LINK accessory never acknowledged sync");
        return Some(ConnectionState::AwaitingSync);
    }
    None
}

// ── Connected ─────────────────────────────────────────────────

fn connected_enter(ctx: &mut HubContext) {
    ctx.sync_window.stop();
    ctx.watchdog
        .start(ctx.now_ms, ctx.config.disconnect_timeout_ms);
}

fn connected_packet(ctx: &mut HubContext, packet: &Packet) -> Option<ConnectionState> {
    ctx.watchdog.restart(ctx.now_ms);

    match packet {
        Packet::Command(c) => match Opcode::from_u8(c.opcode) {
            Some(Opcode::SyncStart) => {
                ctx.serve_sync();
                Some(ConnectionState::SyncRequested)
            }
            Some(Opcode::Handshake | Opcode::SyncEnd) => None,
            Some(op) => {
                ctx.route_command(op, c.value);
                None
            }
            None => {
                debug!("LINK hub ignoring unknown opcode {}", c.opcode);
                None
            }
        },
        Packet::Preferences(block) => {
            if ctx.pushed.push_back(block.clone()).is_err() {
                warn!("LINK preference push backlog full, dropping {:?}", block.kind());
            }
            None
        }
        Packet::Message(_) | Packet::Snapshot(_) => {
            debug!("LINK hub ignoring {:?} from accessory", packet.kind());
            None
        }
    }
}

fn connected_tick(ctx: &mut HubContext) -> Option<ConnectionState> {
    ctx.probe();
    if ctx.watchdog.just_finished(ctx.now_ms) {
        warn!(
            "LINK no traffic for {} ms, accessory considered disconnected",
            ctx.config.disconnect_timeout_ms
        );
        ctx.stats.disconnects = ctx.stats.disconnects.wrapping_add(1);
        ctx.events.push(LinkEvent::Disconnected);
        return Some(ConnectionState::AwaitingSync);
    }
    None
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// The hub end of one serial link.
pub struct HubLink<T: PacketTransport> {
    transport: T,
    codec: Codec,
    fsm: Fsm<HubContext>,
    ctx: HubContext,
    started: bool,
}

impl<T: PacketTransport> HubLink<T> {
    pub fn new(transport: T, config: LinkConfig) -> Self {
        Self {
            transport,
            codec: Codec::new(Role::Hub),
            fsm: Fsm::new(build_state_table(), ConnectionState::AwaitingSync),
            ctx: HubContext::new(config),
            started: false,
        }
    }

    /// Run one cooperative step at monotonic time `now_ms`.
    ///
    /// Accessory requests decoded during this step reach `delegate` before
    /// the call returns; preference requests and pushes are served from and
    /// written to `store`.
    pub fn poll(
        &mut self,
        now_ms: u64,
        sink: &mut impl EventSink,
        delegate: &mut impl HubDelegate,
        store: &mut impl PreferenceStore,
    ) {
        self.ctx.now_ms = now_ms;

        if !self.started {
            self.started = true;
            self.ctx.events.push(LinkEvent::Started {
                role: Role::Hub,
                state: self.fsm.current_state(),
            });
            self.fsm.start(&mut self.ctx);
        }

        let ready = self.transport.is_ready();
        if ready {
            if let Some(frame) = self.transport.poll() {
                self.ctx.stats.frames_received = self.ctx.stats.frames_received.wrapping_add(1);
                match self.codec.decode_frame(&frame) {
                    Ok(packet) => self.fsm.handle_packet(&mut self.ctx, &packet),
                    Err(e) => {
                        self.ctx.stats.frames_dropped =
                            self.ctx.stats.frames_dropped.wrapping_add(1);
                        debug!("LINK dropped frame: {}", e);
                    }
                }
            }
        }

        self.fsm.tick(&mut self.ctx);

        while let Some(request) = self.ctx.requests.pop_front() {
            debug!("LINK accessory request {:?}", request);
            delegate.on_request(request);
        }

        while let Some(kind) = self.ctx.pref_requests.pop_front() {
            match store.load(kind) {
                Some(block) => self.ctx.send(Packet::Preferences(block)),
                None => warn!("PREFS | no stored {:?} block to send", kind),
            }
        }

        while let Some(block) = self.ctx.pushed.pop_front() {
            let kind = block.kind();
            match store.store(&block) {
                Ok(()) => {
                    info!("PREFS | stored {:?} from accessory", kind);
                    self.ctx.events.push(LinkEvent::PreferencesStored(kind));
                }
                Err(e) => warn!("PREFS | storing {:?} failed: {}", kind, e),
            }
        }

        if ready {
            let sent = self.ctx.outbox.flush(&self.codec, &mut self.transport);
            self.ctx.stats.packets_sent = self.ctx.stats.packets_sent.wrapping_add(sent as u32);
        }

        self.ctx.events.drain_into(sink);
    }

    // ── State of truth ───────────────────────────────────────

    /// Apply a command to the hub's state and forward it to the accessory.
    ///
    /// While unsynchronised the change is held back and carried by the next
    /// sync instead.
    pub fn broadcast(&mut self, op: Opcode, value: u16) -> Result<ChangeReport, LinkError> {
        let report = self.ctx.state.apply_command(op.as_u8(), value);
        self.forward(Packet::command(op, value), report.changed())?;
        Ok(report)
    }

    /// Message counterpart of [`Self::broadcast`].
    pub fn broadcast_message(
        &mut self,
        op: Opcode,
        data: [u8; 3],
    ) -> Result<ChangeReport, LinkError> {
        let report = self.ctx.state.apply_message(op.as_u8(), data);
        self.forward(Packet::message(op, data), report.changed())?;
        Ok(report)
    }

    /// Push a fresh snapshot to a connected accessory.
    pub fn resync(&mut self) -> Result<(), LinkError> {
        if self.fsm.current_state() != ConnectionState::Connected {
            return Err(LinkError::NotConnected);
        }
        self.ctx.serve_sync();
        self.fsm
            .force_transition(ConnectionState::SyncRequested, &mut self.ctx);
        Ok(())
    }

    /// Deltas sent while a sync is open queue behind its `SyncEnd`, so the
    /// accessory applies them on top of the snapshot.
    fn forward(&mut self, packet: Packet, changed: bool) -> Result<(), LinkError> {
        match self.fsm.current_state() {
            ConnectionState::Connected | ConnectionState::SyncRequested => {
                self.ctx.outbox.push(packet)
            }
            ConnectionState::AwaitingSync => {
                self.ctx.dirty |= changed;
                Ok(())
            }
        }
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn state(&self) -> &SharedState {
        &self.ctx.state
    }

    /// Direct access for bulk hub-side edits.  They are not forwarded; they
    /// reach the accessory with the next sync.
    pub fn state_mut(&mut self) -> &mut SharedState {
        self.ctx.dirty = true;
        &mut self.ctx.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.fsm.current_state()
    }

    pub fn is_connected(&self) -> bool {
        self.fsm.current_state() == ConnectionState::Connected
    }

    pub fn config(&self) -> &LinkConfig {
        &self.ctx.config
    }

    pub fn stats(&self) -> LinkStats {
        self.ctx.stats
    }

    pub fn watchdog(&self) -> &Countdown {
        &self.ctx.watchdog
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::app::ports::NullSink;
    use crate::error::StorageError;
    use crate::protocol::RawFrame;

    #[derive(Default)]
    struct Wire {
        inbox: VecDeque<RawFrame>,
        sent: Vec<RawFrame>,
    }

    impl PacketTransport for Wire {
        type Error = ();

        fn poll(&mut self) -> Option<RawFrame> {
            self.inbox.pop_front()
        }

        fn send(&mut self, kind: u8, payload: &[u8]) -> Result<(), ()> {
            self.sent.push(RawFrame::new(kind, payload).ok_or(())?);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Requests(Vec<HubRequest>);

    impl HubDelegate for Requests {
        fn on_request(&mut self, request: HubRequest) {
            self.0.push(request);
        }
    }

    #[derive(Default)]
    struct Shelf(Vec<PreferenceBlock>);

    impl PreferenceStore for Shelf {
        fn load(&self, kind: PreferenceKind) -> Option<PreferenceBlock> {
            self.0.iter().find(|b| b.kind() == kind).cloned()
        }

        fn store(&mut self, block: &PreferenceBlock) -> Result<(), StorageError> {
            self.0.retain(|b| b.kind() != block.kind());
            self.0.push(block.clone());
            Ok(())
        }
    }

    const ACCESSORY: Codec = Codec::new(Role::Accessory);
    // Decodes what the hub sends.
    const READER: Codec = Codec::new(Role::Accessory);

    struct Rig {
        hub: HubLink<Wire>,
        delegate: Requests,
        store: Shelf,
        now: u64,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                hub: HubLink::new(Wire::default(), LinkConfig::default()),
                delegate: Requests::default(),
                store: Shelf::default(),
                now: 0,
            }
        }

        fn step(&mut self, now: u64) {
            self.now = now;
            self.hub
                .poll(now, &mut NullSink, &mut self.delegate, &mut self.store);
        }

        fn deliver(&mut self, packet: &Packet) {
            let frame = ACCESSORY.encode(packet).unwrap();
            self.hub.transport_mut().inbox.push_back(frame);
        }

        fn sent(&mut self) -> Vec<Packet> {
            core::mem::take(&mut self.hub.transport_mut().sent)
                .iter()
                .map(|f| READER.decode_frame(f).unwrap())
                .collect()
        }

        fn connect(&mut self) {
            self.step(0);
            self.deliver(&Packet::command(Opcode::SyncStart, 0));
            self.step(1);
            self.deliver(&Packet::command(Opcode::SyncEnd, 0));
            self.step(2);
            let _ = self.sent();
        }
    }

    #[test]
    fn probes_immediately_then_on_interval() {
        let mut rig = Rig::new();
        rig.step(0);
        let first = rig.sent();
        assert_eq!(first[0].command_opcode(), Some(Opcode::Handshake));
        rig.step(3999);
        assert!(rig.sent().is_empty());
        rig.step(4000);
        assert_eq!(rig.sent()[0].command_opcode(), Some(Opcode::Handshake));
    }

    #[test]
    fn sync_start_is_answered_with_full_sequence() {
        let mut rig = Rig::new();
        rig.step(0);
        let _ = rig.sent();
        rig.hub.state_mut().alarm = true;
        rig.deliver(&Packet::command(Opcode::SyncStart, 0));
        rig.step(1);
        let ops: Vec<_> = rig.sent().iter().map(Packet::kind).collect();
        assert_eq!(ops.len(), 4);
        assert_eq!(rig.hub.connection_state(), ConnectionState::SyncRequested);
    }

    #[test]
    fn sync_end_ack_connects() {
        let mut rig = Rig::new();
        rig.connect();
        assert!(rig.hub.is_connected());
        assert!(rig.hub.watchdog().is_running());
    }

    #[test]
    fn requests_gated_until_connected() {
        let mut rig = Rig::new();
        rig.step(0);
        rig.deliver(&Packet::command(Opcode::TurnPackOn, 0));
        rig.step(1);
        assert!(rig.delegate.0.is_empty());

        rig.connect();
        rig.deliver(&Packet::command(Opcode::MusicPlayTrack, 503));
        rig.step(10);
        assert_eq!(rig.delegate.0, vec![AccessoryCommand::MusicPlayTrack(503)]);
    }

    #[test]
    fn preference_request_served_from_store() {
        let mut rig = Rig::new();
        let block = PreferenceBlock::new(PreferenceKind::Shared, &[7; 21]).unwrap();
        rig.store.0.push(block.clone());
        rig.connect();
        rig.deliver(&Packet::command(Opcode::RequestPreferencesSmoke, 0));
        rig.step(10);
        assert_eq!(rig.sent(), vec![Packet::Preferences(block)]);
    }

    #[test]
    fn pushed_preferences_are_stored() {
        let mut rig = Rig::new();
        rig.connect();
        let block = PreferenceBlock::new(PreferenceKind::Accessory, &[3; 20]).unwrap();
        rig.deliver(&Packet::Preferences(block.clone()));
        let mut events: Vec<LinkEvent> = Vec::new();
        rig.hub
            .poll(10, &mut events, &mut rig.delegate, &mut rig.store);
        assert_eq!(rig.store.load(PreferenceKind::Accessory), Some(block));
        assert!(events.contains(&LinkEvent::PreferencesStored(PreferenceKind::Accessory)));
    }

    #[test]
    fn broadcast_held_back_until_synced() {
        let mut rig = Rig::new();
        rig.step(0);
        let _ = rig.sent();
        let r = rig.hub.broadcast(Opcode::PowerLevel4, 0).unwrap();
        assert!(r.changed());
        rig.step(1);
        assert!(rig.sent().is_empty());

        rig.connect();
        let _ = rig.hub.broadcast(Opcode::Firing, 0).unwrap();
        rig.step(10);
        assert_eq!(rig.sent(), vec![Packet::command(Opcode::Firing, 0)]);
    }

    #[test]
    fn broadcast_during_open_sync_follows_sync_end() {
        let mut rig = Rig::new();
        rig.connect();
        rig.hub.resync().unwrap();
        let _ = rig.hub.broadcast(Opcode::PowerLevel4, 0).unwrap();
        rig.step(10);

        let sent = rig.sent();
        let ops: Vec<_> = sent.iter().filter_map(Packet::command_opcode).collect();
        assert_eq!(
            ops,
            vec![Opcode::SyncStart, Opcode::SyncEnd, Opcode::PowerLevel4]
        );
        assert!(matches!(sent[1], Packet::Snapshot(_)));
    }

    #[test]
    fn echo_after_unsynced_change_resyncs() {
        let mut rig = Rig::new();
        rig.connect();
        rig.step(8002);
        assert_eq!(rig.hub.connection_state(), ConnectionState::AwaitingSync);
        let _ = rig.sent();

        let _ = rig.hub.broadcast(Opcode::SlimeMode, 0).unwrap();
        rig.deliver(&Packet::command(Opcode::Handshake, 0));
        rig.step(8003);

        assert_eq!(rig.hub.connection_state(), ConnectionState::SyncRequested);
        let sent = rig.sent();
        assert_eq!(sent[0].command_opcode(), Some(Opcode::SyncStart));
        match &sent[1] {
            Packet::Snapshot(frame) => assert_eq!(frame.stream_mode, 3),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn clean_echo_reconnects_without_resync() {
        let mut rig = Rig::new();
        rig.connect();
        rig.step(8002);
        let _ = rig.sent();

        rig.deliver(&Packet::command(Opcode::SyncEnd, 0));
        rig.step(8003);
        assert!(rig.hub.is_connected());
        assert!(rig.sent().iter().all(|p| p.command_opcode() != Some(Opcode::SyncStart)));
    }

    #[test]
    fn watchdog_disconnects_silent_accessory() {
        let mut rig = Rig::new();
        rig.connect();
        rig.step(8002);
        assert_eq!(rig.hub.connection_state(), ConnectionState::AwaitingSync);
        assert_eq!(rig.hub.stats().disconnects, 1);
    }

    #[test]
    fn resync_requires_connection() {
        let mut rig = Rig::new();
        assert_eq!(rig.hub.resync(), Err(LinkError::NotConnected));
        rig.connect();
        assert!(rig.hub.resync().is_ok());
        assert_eq!(rig.hub.connection_state(), ConnectionState::SyncRequested);
    }
}
