//! Hub and accessory links running against each other.

use packlink::app::commands::AccessoryCommand;
use packlink::app::events::LinkEvent;
use packlink::link::ConnectionState;
use packlink::protocol::Opcode;
use packlink::state::snapshot;
use packlink::state::{PowerLevel, StreamMode, SystemYear};

use crate::mock_link::Bench;

#[test]
fn cold_start_reaches_connected() {
    let mut bench = Bench::new();
    bench.connect(100);
    assert_eq!(bench.hub.connection_state(), ConnectionState::Connected);
    assert_eq!(bench.accessory.connection_state(), ConnectionState::Connected);
}

#[test]
fn accessory_mirrors_hub_after_sync() {
    let mut bench = Bench::new();
    {
        let s = bench.hub.state_mut();
        s.power_level = PowerLevel::Level4;
        s.stream_mode = StreamMode::Slime;
        s.system_year = SystemYear::Y1989;
        s.pack_on = true;
        s.volumes.master = 75;
        s.music.track_count = 20;
        s.music.current_track = 507;
        s.pack_voltage_centi = 1210;
    }
    bench.connect(100);

    assert_eq!(
        snapshot::capture(bench.accessory.state()),
        snapshot::capture(bench.hub.state())
    );
    assert_eq!(bench.accessory.state().track_range(), Some((500, 519)));
}

#[test]
fn active_alarm_survives_sync() {
    let mut bench = Bench::new();
    bench.hub.state_mut().alarm = true;
    bench.connect(100);
    bench.run(20, 1);
    assert!(bench.accessory.state().alarm);
}

#[test]
fn hub_broadcasts_reach_accessory() {
    let mut bench = Bench::new();
    bench.connect(100);

    bench.hub.broadcast(Opcode::Firing, 0).unwrap();
    bench.hub.broadcast_message(Opcode::VolumeSync, [30, 40, 50]).unwrap();
    bench.hub.broadcast(Opcode::BatteryVoltagePack, 1175).unwrap();
    bench.run(10, 1);

    let s = bench.accessory.state();
    assert!(s.firing && s.pack_on && s.wand_on);
    assert_eq!(s.volumes.music, 50);
    assert_eq!(s.pack_voltage_centi, 1175);
    assert_eq!(s.volumes.music, bench.hub.state().volumes.music);
}

#[test]
fn accessory_requests_reach_delegate() {
    let mut bench = Bench::new();
    bench.connect(100);

    bench.accessory.send(AccessoryCommand::TurnPackOn).unwrap();
    bench.accessory.send(AccessoryCommand::MusicPlayTrack(512)).unwrap();
    bench.run(10, 1);

    assert_eq!(
        bench.delegate.requests,
        vec![
            AccessoryCommand::TurnPackOn,
            AccessoryCommand::MusicPlayTrack(512)
        ]
    );
}

#[test]
fn probes_keep_both_ends_connected() {
    let mut bench = Bench::new();
    bench.connect(100);
    bench.run(40_000, 10);

    assert!(bench.hub.is_connected());
    assert!(bench.accessory.is_synced());
    assert_eq!(bench.hub.stats().disconnects, 0);
    assert_eq!(bench.accessory.stats().disconnects, 0);
}

#[test]
fn hub_outage_disconnects_then_recovers() {
    let mut bench = Bench::new();
    bench.connect(100);

    bench.hub_alive = false;
    bench.run(9_000, 10);
    assert_eq!(bench.accessory.connection_state(), ConnectionState::AwaitingSync);
    assert_eq!(
        bench
            .accessory_events
            .count(|e| *e == LinkEvent::Disconnected),
        1
    );

    // State changed on the hub while the accessory could not hear it.
    bench.hub.state_mut().power_level = PowerLevel::Level5;

    bench.hub_alive = true;
    bench.run(3_000, 5);
    assert!(bench.hub.is_connected());
    assert!(bench.accessory.is_synced());
    assert_eq!(bench.accessory.state().power_level, PowerLevel::Level5);
}

#[test]
fn accessory_outage_disconnects_hub() {
    let mut bench = Bench::new();
    bench.connect(100);

    bench.accessory.transport().set_ready(false);
    bench.run(8_100, 10);
    assert!(!bench.hub.is_connected());
    assert_eq!(bench.hub.stats().disconnects, 1);

    bench.accessory.transport().set_ready(true);
    bench.run(10_000, 10);
    assert!(bench.hub.is_connected());
    assert!(bench.accessory.is_synced());
}

#[test]
fn hub_resync_pushes_fresh_snapshot() {
    let mut bench = Bench::new();
    bench.connect(100);

    bench.hub.state_mut().stream_mode = StreamMode::Meson;
    bench.hub.resync().unwrap();
    bench.run(20, 1);

    assert!(bench.hub.is_connected());
    assert_eq!(bench.accessory.state().stream_mode, StreamMode::Meson);
}

#[test]
fn broadcast_while_sync_is_open_reaches_accessory() {
    let mut bench = Bench::new();
    bench.connect(100);

    bench.hub.resync().unwrap();
    bench.hub.broadcast(Opcode::PowerLevel4, 0).unwrap();
    bench.run(100, 1);

    assert!(bench.hub.is_connected());
    assert!(bench.accessory.is_synced());
    assert_eq!(bench.accessory.state().power_level, PowerLevel::Level4);
    assert_eq!(bench.hub.state().power_level, PowerLevel::Level4);
}

#[test]
fn broadcast_during_accessory_sync_request_reaches_accessory() {
    let mut bench = Bench::new();
    // Let the accessory's sync-start reach the hub, then change state before
    // the accessory has read the reply.
    while bench.hub.connection_state() != ConnectionState::SyncRequested {
        bench.now += 1;
        bench.tick();
        assert!(bench.now < 100);
    }
    bench.hub.broadcast(Opcode::MesonMode, 0).unwrap();
    bench.connect(100);
    bench.run(20, 1);

    assert_eq!(bench.accessory.state().stream_mode, StreamMode::Meson);
}
