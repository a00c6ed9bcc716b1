//! Accessory side of a link: mirrors hub state.
//!
//! ```text
//!            boot / watchdog expiry / sync window elapsed
//!                          │
//!                          ▼
//!  ┌──────────────┐  handshake (→ sync-start)  ┌───────────────┐
//!  │ AwaitingSync │ ─────────────────────────▶ │ SyncRequested │
//!  │ retry 750 ms │  unsolicited sync-start    │ buffer snap + │
//!  └──────────────┘ ─────────────────────────▶ │ deltas        │
//!         ▲                                    └───────┬───────┘
//!         │ watchdog 8000 ms                           │ sync-end
//!         │                                            ▼ (apply, echo)
//!         │                                    ┌───────────────┐
//!         └────────────────────────────────────│   Connected   │
//!                                              └───────────────┘
//! ```
//!
//! While awaiting sync the accessory fires a sync-start every
//! `initial_retry_ms` so a hub that missed the first request still answers.

use heapless::Vec;
use log::{debug, info, warn};

use super::timer::Countdown;
use super::{
    ConnectionState, EventQueue, Fsm, LinkContext, LinkStats, Outbox, StateDescriptor,
};
use crate::app::commands::AccessoryCommand;
use crate::app::events::LinkEvent;
use crate::app::ports::EventSink;
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::prefs::PreferenceExchange;
use crate::protocol::{
    Codec, Opcode, Packet, PacketTransport, PreferenceBlock, PreferenceKind, Role, SnapshotFrame,
};
use crate::state::{ChangeReport, SharedState};

/// Deltas buffered while a sync is open.
pub const PENDING_DEPTH: usize = 8;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything the accessory state handlers read and write.
pub struct AccessoryContext {
    pub config: LinkConfig,
    /// Monotonic time of the current poll.
    pub now_ms: u64,
    pub state: SharedState,
    /// `true` only while `Connected`.
    pub synced: bool,

    pub retry: Countdown,
    pub watchdog: Countdown,
    pub sync_window: Countdown,

    pub prefs: PreferenceExchange,

    staged_snapshot: Option<SnapshotFrame>,
    pending: Vec<Packet, PENDING_DEPTH>,
    outbox: Outbox,
    events: EventQueue,
    poll_report: ChangeReport,
    stats: LinkStats,
}

impl AccessoryContext {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            now_ms: 0,
            state: SharedState::new(config.music_track_offset),
            synced: false,
            retry: Countdown::new(),
            watchdog: Countdown::new(),
            sync_window: Countdown::new(),
            prefs: PreferenceExchange::new(config.pref_push_debounce_ms),
            staged_snapshot: None,
            pending: Vec::new(),
            outbox: Outbox::new(),
            events: EventQueue::new(),
            poll_report: ChangeReport::NONE,
            stats: LinkStats::default(),
        }
    }

    fn send(&mut self, packet: Packet) {
        // Overflow is logged by the outbox; the protocol tolerates loss.
        let _ = self.outbox.push(packet);
    }

    fn send_command(&mut self, op: Opcode) {
        self.send(Packet::command(op, 0));
    }

    fn report(&mut self, report: ChangeReport) {
        if report.changed() {
            self.poll_report.merge(report);
            self.events.push(LinkEvent::StateChanged(report.fields()));
        }
    }

    fn receive_preferences(&mut self, block: &PreferenceBlock) {
        let kind = block.kind();
        if self.prefs.on_receive(block.clone()) {
            self.events.push(LinkEvent::PreferencesReceived(kind));
        }
    }

    fn clear_sync_buffers(&mut self) {
        self.staged_snapshot = None;
        self.pending.clear();
    }

    fn buffer(&mut self, packet: &Packet) {
        if self.pending.push(packet.clone()).is_err() {
            warn!("LINK sync buffer full, dropping {:?}", packet.kind());
        }
    }

    /// Apply the buffered snapshot, replay deltas received after it, and
    /// acknowledge with a sync-end echo.
    fn finish_sync(&mut self) {
        let mut report = ChangeReport::default();
        if let Some(frame) = self.staged_snapshot.take() {
            report.merge(self.state.apply_snapshot(&frame));
        }
        let pending = core::mem::take(&mut self.pending);
        for packet in &pending {
            report.merge(self.apply(packet));
        }
        self.report(report);
        self.send_command(Opcode::SyncEnd);
    }

    fn apply(&mut self, packet: &Packet) -> ChangeReport {
        match packet {
            Packet::Command(c) => self.state.apply_command(c.opcode, c.value),
            Packet::Message(m) => self.state.apply_message(m.opcode, m.data),
            Packet::Snapshot(frame) => self.state.apply_snapshot(frame),
            Packet::Preferences(block) => {
                self.receive_preferences(block);
                ChangeReport::NONE
            }
        }
    }
}

impl LinkContext for AccessoryContext {
    fn on_transition(&mut self, from: ConnectionState, to: ConnectionState) {
        self.events.push(LinkEvent::ConnectionChanged { from, to });
    }
}

// ---------------------------------------------------------------------------
// State table
// ---------------------------------------------------------------------------

/// Build the accessory state table, indexed by `ConnectionState as usize`.
pub fn build_state_table() -> [StateDescriptor<AccessoryContext>; ConnectionState::COUNT] {
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
            on_exit: Some(connected_exit),
            on_packet: connected_packet,
            on_tick: connected_tick,
        },
    ]
}

// ── AwaitingSync ──────────────────────────────────────────────

fn awaiting_enter(ctx: &mut AccessoryContext) {
    ctx.synced = false;
    ctx.watchdog.stop();
    ctx.sync_window.stop();
    ctx.clear_sync_buffers();
    ctx.retry.start(ctx.now_ms, ctx.config.initial_retry_ms);
}

fn awaiting_packet(ctx: &mut AccessoryContext, packet: &Packet) -> Option<ConnectionState> {
    match packet.command_opcode() {
        Some(Opcode::Handshake) => {
            ctx.send_command(Opcode::SyncStart);
            Some(ConnectionState::SyncRequested)
        }
        Some(Opcode::SyncStart) => Some(ConnectionState::SyncRequested),
        Some(Opcode::SyncEnd) => {
            ctx.finish_sync();
            Some(ConnectionState::Connected)
        }
        _ => {
            debug!("LINK ignoring {:?} while awaiting sync", packet.kind());
            None
        }
    }
}

fn awaiting_tick(ctx: &mut AccessoryContext) -> Option<ConnectionState> {
    if ctx.retry.just_finished(ctx.now_ms) {
        debug!("LINK requesting sync");
        ctx.send_command(Opcode::SyncStart);
        ctx.retry.start(ctx.now_ms, ctx.config.initial_retry_ms);
    }
    None
}

// ── SyncRequested ─────────────────────────────────────────────

fn sync_enter(ctx: &mut AccessoryContext) {
    ctx.retry.stop();
    ctx.clear_sync_buffers();
    ctx.sync_window.start(ctx.now_ms, ctx.config.sync_window_ms);
}

fn sync_packet(ctx: &mut AccessoryContext, packet: &Packet) -> Option<ConnectionState> {
    match packet {
        Packet::Snapshot(frame) => {
            // A later snapshot supersedes an earlier one and the deltas before it.
            ctx.staged_snapshot = Some(*frame);
            ctx.pending.clear();
            None
        }
        Packet::Preferences(block) => {
            ctx.receive_preferences(block);
            None
        }
        Packet::Message(_) => {
            ctx.buffer(packet);
            None
        }
        Packet::Command(c) => match Opcode::from_u8(c.opcode) {
            Some(Opcode::Handshake) => {
                ctx.send_command(Opcode::SyncStart);
                None
            }
            Some(Opcode::SyncStart) => {
                ctx.clear_sync_buffers();
                ctx.sync_window.restart(ctx.now_ms);
                None
            }
            Some(Opcode::SyncEnd) => {
                ctx.finish_sync();
                Some(ConnectionState::Connected)
            }
            _ => {
                ctx.buffer(packet);
                None
            }
        },
    }
}

fn sync_tick(ctx: &mut AccessoryContext) -> Option<ConnectionState> {
    if ctx.sync_window.just_finished(ctx.now_ms) {
        warn!(
            "LINK no sync-end within {} ms, restarting handshake",
            ctx.config.sync_window_ms
        );
        return Some(ConnectionState::AwaitingSync);
    }
    None
}

// ── Connected ─────────────────────────────────────────────────

fn connected_enter(ctx: &mut AccessoryContext) {
    ctx.synced = true;
    ctx.retry.stop();
    ctx.sync_window.stop();
    ctx.watchdog.start(ctx.now_ms, ctx.config.disconnect_timeout_ms);
}

fn connected_exit(ctx: &mut AccessoryContext) {
    ctx.synced = false;
}

fn connected_packet(ctx: &mut AccessoryContext, packet: &Packet) -> Option<ConnectionState> {
    ctx.watchdog.restart(ctx.now_ms);

    match packet {
        Packet::Command(c) => match Opcode::from_u8(c.opcode) {
            Some(Opcode::Handshake) => {
                ctx.send_command(Opcode::Handshake);
                None
            }
            Some(Opcode::SyncStart) => Some(ConnectionState::SyncRequested),
            Some(Opcode::SyncEnd) => {
                ctx.send_command(Opcode::SyncEnd);
                None
            }
            _ => {
                let report = ctx.state.apply_command(c.opcode, c.value);
                ctx.report(report);
                None
            }
        },
        _ => {
            let report = ctx.apply(packet);
            ctx.report(report);
            None
        }
    }
}

fn connected_tick(ctx: &mut AccessoryContext) -> Option<ConnectionState> {
    if ctx.watchdog.just_finished(ctx.now_ms) {
        warn!(
            "LINK no traffic for {} ms, hub considered disconnected",
            ctx.config.disconnect_timeout_ms
        );
        ctx.stats.disconnects = ctx.stats.disconnects.wrapping_add(1);
        ctx.prefs.mark_stale();
        ctx.events.push(LinkEvent::Disconnected);
        return Some(ConnectionState::AwaitingSync);
    }
    None
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// The accessory end of one serial link.
///
/// Owns the transport, the state machine and the mirrored [`SharedState`].
/// Call [`AccessoryLink::poll`] once per main-loop iteration; it never
/// blocks and handles at most one inbound frame per call.
pub struct AccessoryLink<T: PacketTransport> {
    transport: T,
    codec: Codec,
    fsm: Fsm<AccessoryContext>,
    ctx: AccessoryContext,
    started: bool,
}

impl<T: PacketTransport> AccessoryLink<T> {
    pub fn new(transport: T, config: LinkConfig) -> Self {
        Self {
            transport,
            codec: Codec::new(Role::Accessory),
            fsm: Fsm::new(build_state_table(), ConnectionState::AwaitingSync),
            ctx: AccessoryContext::new(config),
            started: false,
        }
    }

    /// Run one cooperative step at monotonic time `now_ms`.
    ///
    /// 1. Receive and dispatch at most one frame (skipped if the transport
    ///    is not ready).
    /// 2. Run the current state's timers.
    /// 3. Push any debounced preference edit.
    /// 4. Flush the outbox and drain events into `sink`.
    ///
    /// Returns the fields that changed during this step.
    pub fn poll(&mut self, now_ms: u64, sink: &mut impl EventSink) -> ChangeReport {
        self.ctx.now_ms = now_ms;
        self.ctx.poll_report = ChangeReport::NONE;

        if !self.started {
            self.started = true;
            self.ctx.events.push(LinkEvent::Started {
                role: Role::Accessory,
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

        if self.fsm.current_state() == ConnectionState::Connected {
            if let Some(block) = self.ctx.prefs.take_due(now_ms) {
                info!("PREFS | pushing {:?} to hub", block.kind());
                self.ctx.send(Packet::Preferences(block));
            }
        }

        if ready {
            let sent = self.ctx.outbox.flush(&self.codec, &mut self.transport);
            self.ctx.stats.packets_sent = self.ctx.stats.packets_sent.wrapping_add(sent as u32);
        }

        self.ctx.events.drain_into(sink);
        self.ctx.poll_report
    }

    // ── Outbound requests ────────────────────────────────────

    /// Queue a request to the hub.  Refused unless connected.
    pub fn send(&mut self, command: AccessoryCommand) -> Result<(), LinkError> {
        self.require_connected()?;
        self.ctx
            .outbox
            .push(Packet::command(command.opcode(), command.value()))
    }

    /// Ask the hub for its block of `kind`.
    pub fn request_preferences(&mut self, kind: PreferenceKind) -> Result<(), LinkError> {
        self.require_connected()?;
        self.ctx.outbox.push(PreferenceExchange::request(kind))
    }

    /// Stage an edited block; it is sent once edits settle.
    pub fn push_preferences(&mut self, block: PreferenceBlock) -> Result<(), LinkError> {
        self.require_connected()?;
        self.ctx.prefs.push(block, self.ctx.now_ms);
        Ok(())
    }

    /// Ask the hub to persist the settings a block of `kind` touches.
    pub fn commit_preferences(&mut self, kind: PreferenceKind) -> Result<(), LinkError> {
        self.require_connected()?;
        self.ctx.outbox.push(PreferenceExchange::commit(kind))
    }

    fn require_connected(&self) -> Result<(), LinkError> {
        if self.fsm.current_state() == ConnectionState::Connected {
            Ok(())
        } else {
            Err(LinkError::NotConnected)
        }
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn state(&self) -> &SharedState {
        &self.ctx.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.fsm.current_state()
    }

    pub fn is_synced(&self) -> bool {
        self.ctx.synced
    }

    pub fn preferences(&self) -> &PreferenceExchange {
        &self.ctx.prefs
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

    pub fn retry_timer(&self) -> &Countdown {
        &self.ctx.retry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
