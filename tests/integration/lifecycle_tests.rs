//! Accessory connection lifecycle against a hand-driven hub.

use packlink::app::commands::AccessoryCommand;
use packlink::app::events::LinkEvent;
use packlink::config::LinkConfig;
use packlink::error::LinkError;
use packlink::link::{AccessoryLink, ConnectionState};
use packlink::protocol::{Opcode, Packet, SnapshotFrame};
use packlink::state::{Field, PowerLevel, SharedState, StreamMode};

use crate::mock_link::{EventLog, Loopback, ScriptedPeer, accessory_with_script};

fn booted() -> (AccessoryLink<Loopback>, ScriptedPeer, EventLog) {
    let (mut acc, hub) = accessory_with_script(LinkConfig::default());
    let mut log = EventLog::default();
    let _ = acc.poll(0, &mut log);
    (acc, hub, log)
}

/// Boot, handshake and sync with `frame`; connected at t=30.
fn connected_with(frame: SnapshotFrame) -> (AccessoryLink<Loopback>, ScriptedPeer, EventLog) {
    let (mut acc, mut hub, mut log) = booted();
    hub.send(&Packet::command(Opcode::Handshake, 0));
    let _ = acc.poll(10, &mut log);
    hub.send(&Packet::Snapshot(frame));
    hub.send(&Packet::command(Opcode::SyncEnd, 0));
    let _ = acc.poll(20, &mut log);
    let _ = acc.poll(30, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::Connected);
    let _ = hub.received();
    (acc, hub, log)
}

fn connected() -> (AccessoryLink<Loopback>, ScriptedPeer, EventLog) {
    connected_with(SnapshotFrame::default())
}

// ── Protocol walkthroughs ─────────────────────────────────────────────────

#[test]
fn handshake_then_snapshot_connects() {
    let (mut acc, mut hub, mut log) = booted();
    assert_eq!(acc.connection_state(), ConnectionState::AwaitingSync);

    hub.send(&Packet::command(Opcode::Handshake, 0));
    let _ = acc.poll(10, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::SyncRequested);
    assert_eq!(hub.received(), vec![Packet::command(Opcode::SyncStart, 0)]);

    hub.send(&Packet::Snapshot(SnapshotFrame {
        power_level: 3,
        stream_mode: 2,
        ..SnapshotFrame::default()
    }));
    hub.send(&Packet::command(Opcode::SyncEnd, 0));
    let _ = acc.poll(20, &mut log);
    let _ = acc.poll(30, &mut log);

    assert_eq!(acc.connection_state(), ConnectionState::Connected);
    assert!(acc.is_synced());
    assert_eq!(acc.state().power_level, PowerLevel::Level3);
    assert_eq!(acc.state().stream_mode, StreamMode::Stasis);
    assert!(acc.watchdog().is_running());
    assert_eq!(acc.watchdog().period_ms(), 8000);
    assert_eq!(acc.watchdog().remaining(30), 8000);
    assert_eq!(hub.received(), vec![Packet::command(Opcode::SyncEnd, 0)]);
}

#[test]
fn firing_powers_whole_chain() {
    let (mut acc, mut hub, mut log) = connected();
    hub.send(&Packet::command(Opcode::Firing, 0));
    let report = acc.poll(40, &mut log);

    assert!(report.changed());
    assert!(report.fields().contains(Field::Firing));
    let s = acc.state();
    assert!(s.firing);
    assert!(s.pack_on);
    assert!(s.wand_on);
}

#[test]
fn volume_sync_message_sets_all_channels() {
    let (mut acc, mut hub, mut log) = connected();
    hub.send(&Packet::message(Opcode::VolumeSync, [50, 70, 90]));
    let report = acc.poll(40, &mut log);

    assert!(report.fields().contains(Field::Volumes));
    let v = acc.state().volumes;
    assert_eq!((v.master, v.effects, v.music), (50, 70, 90));
}

#[test]
fn silence_past_timeout_disconnects() {
    let (mut acc, _hub, mut log) = connected();

    let _ = acc.poll(30 + 7_999, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::Connected);

    let _ = acc.poll(30 + 8_001, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::AwaitingSync);
    assert!(!acc.is_synced());
    assert!(acc.retry_timer().is_running());
    assert_eq!(acc.retry_timer().period_ms(), 750);
    assert_eq!(acc.stats().disconnects, 1);
    assert_eq!(log.count(|e| *e == LinkEvent::Disconnected), 1);
}

// ── Full lifecycle ────────────────────────────────────────────

#[test]
fn lifecycle_round_trip() {
    let frame = SnapshotFrame {
        system_mode: 1,
        ion_arm_switch: 2,
        cyclotron_lid: 0,
        system_year: 1,
        pack_on: 1,
        power_level: 5,
        stream_mode: 4,
        wand_present: 1,
        barrel_extended: 1,
        speed_multiplier: 3,
        master_muted: 2,
        master_volume: 80,
        effects_volume: 60,
        music_volume: 40,
        music_playing: 1,
        track_looped: 2,
        current_track: 504,
        music_count: 12,
        pack_voltage: 1187,
        ..SnapshotFrame::default()
    };
    let (acc, _hub, _log) = connected_with(frame);

    let mut expected = SharedState::default();
    let _ = expected.apply_snapshot(&frame);
    assert_eq!(*acc.state(), expected);
    assert_eq!(acc.state().track_range(), Some((500, 511)));

    let mut acc = acc;
    let mut log = EventLog::default();
    let _ = acc.poll(30 + 8_000, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::AwaitingSync);
    // Mirrored values survive the disconnect.
    assert_eq!(*acc.state(), expected);
}

#[test]
fn unsolicited_sync_start_is_accepted() {
    let (mut acc, mut hub, mut log) = booted();
    hub.send(&Packet::command(Opcode::SyncStart, 0));
    let _ = acc.poll(5, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::SyncRequested);
    // No sync-start is echoed for a hub-initiated sync.
    assert!(hub.received().is_empty());
}

#[test]
fn retry_requests_sync_until_answered() {
    let (mut acc, mut hub, mut log) = booted();
    for t in (0..=3_000).step_by(50) {
        let _ = acc.poll(t, &mut log);
    }
    let sent = hub.received();
    assert_eq!(sent.len(), 4);
    assert!(sent.iter().all(|p| *p == Packet::command(Opcode::SyncStart, 0)));
}

#[test]
fn open_sync_times_out_back_to_awaiting() {
    let (mut acc, mut hub, mut log) = booted();
    hub.send(&Packet::command(Opcode::Handshake, 0));
    let _ = acc.poll(10, &mut log);
    hub.send(&Packet::Snapshot(SnapshotFrame {
        power_level: 4,
        ..SnapshotFrame::default()
    }));
    let _ = acc.poll(20, &mut log);

    let _ = acc.poll(10 + 2_000, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::AwaitingSync);
    // The staged snapshot was never applied.
    assert_eq!(acc.state().power_level, PowerLevel::Level1);
}

#[test]
fn deltas_before_sync_end_apply_after_snapshot() {
    let (mut acc, mut hub, mut log) = booted();
    hub.send(&Packet::command(Opcode::SyncStart, 0));
    hub.send(&Packet::Snapshot(SnapshotFrame::default()));
    hub.send(&Packet::command(Opcode::PowerLevel2, 0));
    hub.send(&Packet::command(Opcode::AlarmOn, 0));
    hub.send(&Packet::command(Opcode::SyncEnd, 0));
    for t in 1..=5 {
        let _ = acc.poll(t, &mut log);
    }
    assert_eq!(acc.connection_state(), ConnectionState::Connected);
    assert_eq!(acc.state().power_level, PowerLevel::Level2);
    assert!(acc.state().alarm);
}

// ── Gating ────────────────────────────────────────────────────

#[test]
fn state_packets_ignored_until_synced() {
    let (mut acc, mut hub, mut log) = booted();
    hub.send(&Packet::command(Opcode::Firing, 0));
    hub.send(&Packet::message(Opcode::VolumeSync, [10, 20, 30]));
    hub.send(&Packet::Snapshot(SnapshotFrame {
        power_level: 5,
        ..SnapshotFrame::default()
    }));
    for t in 1..=3 {
        let r = acc.poll(t, &mut log);
        assert!(!r.changed());
    }
    assert_eq!(*acc.state(), SharedState::default());
}

#[test]
fn handshake_while_connected_is_echoed() {
    let (mut acc, mut hub, mut log) = connected();
    hub.send(&Packet::command(Opcode::Handshake, 0));
    let _ = acc.poll(40, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::Connected);
    assert_eq!(hub.received(), vec![Packet::command(Opcode::Handshake, 0)]);
}

#[test]
fn traffic_keeps_link_alive() {
    let (mut acc, mut hub, mut log) = connected();
    for t in (1..=6).map(|n| n * 4_000) {
        hub.send(&Packet::command(Opcode::Handshake, 0));
        let _ = acc.poll(t, &mut log);
        assert_eq!(acc.connection_state(), ConnectionState::Connected);
    }
}

#[test]
fn bad_sentinel_does_not_feed_watchdog() {
    let (mut acc, mut hub, mut log) = connected();
    // Accessory-direction sentinels on a frame from the hub.
    hub.send_raw(1, &[0x01, Opcode::Handshake.as_u8(), 0, 0, 0x58]);
    let _ = acc.poll(5_000, &mut log);
    assert_eq!(acc.stats().frames_dropped, 1);
    assert!(hub.received().is_empty());

    let _ = acc.poll(30 + 8_000, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::AwaitingSync);
}

#[test]
fn unknown_opcode_is_harmless_but_counts_as_traffic() {
    let (mut acc, mut hub, mut log) = connected();
    hub.send_raw(1, &[0x01, 200, 7, 0, 0xA3]);
    let r = acc.poll(5_000, &mut log);
    assert!(!r.changed());
    assert_eq!(acc.stats().frames_dropped, 0);

    let _ = acc.poll(30 + 8_000, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::Connected);
}

#[test]
fn unavailable_transport_skips_io() {
    let (mut acc, mut hub, mut log) = booted();
    hub.send(&Packet::command(Opcode::Handshake, 0));
    hub.end().set_ready(false);
    let _ = acc.poll(10, &mut log);
    let _ = acc.poll(800, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::AwaitingSync);

    hub.end().set_ready(true);
    let _ = acc.poll(810, &mut log);
    assert_eq!(acc.connection_state(), ConnectionState::SyncRequested);
}

// ── Outbound requests ─────────────────────────────────────────

#[test]
fn commands_flow_only_while_connected() {
    let (mut acc, mut hub, mut log) = booted();
    assert_eq!(
        acc.send(AccessoryCommand::MusicPlayTrack(503)),
        Err(LinkError::NotConnected)
    );
    let _ = hub.received();

    let (mut acc, mut hub, _) = connected();
    acc.send(AccessoryCommand::MusicPlayTrack(503)).unwrap();
    acc.send(AccessoryCommand::ToggleMute).unwrap();
    let _ = acc.poll(40, &mut log);
    assert_eq!(
        hub.received(),
        vec![
            Packet::command(Opcode::MusicPlayTrack, 503),
            Packet::command(Opcode::ToggleMute, 0),
        ]
    );
}

#[test]
fn events_describe_the_connection() {
    let (_acc, _hub, log) = connected();
    assert!(matches!(log.events[0], LinkEvent::Started { .. }));
    assert_eq!(
        log.count(|e| matches!(e, LinkEvent::ConnectionChanged { .. })),
        2
    );
    assert!(log.events.contains(&LinkEvent::ConnectionChanged {
        from: ConnectionState::SyncRequested,
        to: ConnectionState::Connected,
    }));
}
