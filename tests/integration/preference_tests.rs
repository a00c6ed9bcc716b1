//! Preference blocks travelling between a hub's store and the accessory.

use packlink::app::commands::AccessoryCommand;
use packlink::app::events::LinkEvent;
use packlink::app::ports::PreferenceStore;
use packlink::link::ConnectionState;
use packlink::prefs::AccessoryPrefs;
use packlink::protocol::{PreferenceBlock, PreferenceKind};

use crate::mock_link::Bench;

fn filled(kind: PreferenceKind, fill: u8) -> PreferenceBlock {
    PreferenceBlock::new(kind, &vec![fill; kind.len()]).unwrap()
}

fn connected_bench() -> Bench {
    let mut bench = Bench::new();
    bench.connect(100);
    bench
}

#[test]
fn request_is_served_from_hub_store() {
    let mut bench = connected_bench();
    let block = filled(PreferenceKind::Hub, 3);
    bench.store.store(&block).unwrap();

    bench
        .accessory
        .request_preferences(PreferenceKind::Hub)
        .unwrap();
    bench.run(20, 1);

    let prefs = bench.accessory.preferences();
    assert!(prefs.is_received(PreferenceKind::Hub));
    assert_eq!(prefs.staged(PreferenceKind::Hub), Some(&block));
    assert!(!prefs.is_received(PreferenceKind::Shared));
}

#[test]
fn repeat_delivery_reports_once() {
    let mut bench = connected_bench();
    bench.store.store(&filled(PreferenceKind::Shared, 9)).unwrap();

    for _ in 0..3 {
        bench
            .accessory
            .request_preferences(PreferenceKind::Shared)
            .unwrap();
        bench.run(20, 1);
    }

    let received = bench.accessory_events.count(|e| {
        *e == LinkEvent::PreferencesReceived(PreferenceKind::Shared)
    });
    assert_eq!(received, 1);
}

#[test]
fn typed_view_survives_the_trip() {
    let mut bench = connected_bench();
    let wand = AccessoryPrefs {
        led_count: 48,
        led_hue: 200,
        overheat_enabled: 1,
        ..AccessoryPrefs::default()
    };
    bench.store.store(&wand.to_block().unwrap()).unwrap();

    bench
        .accessory
        .request_preferences(PreferenceKind::Accessory)
        .unwrap();
    bench.run(20, 1);

    let staged = bench
        .accessory
        .preferences()
        .staged(PreferenceKind::Accessory)
        .expect("block staged");
    assert_eq!(AccessoryPrefs::from_block(staged), Some(wand));
}

#[test]
fn edits_are_pushed_after_debounce() {
    let mut bench = connected_bench();
    let debounce = u64::from(bench.accessory.config().pref_push_debounce_ms);

    bench
        .accessory
        .push_preferences(filled(PreferenceKind::Accessory, 1))
        .unwrap();
    bench.run(debounce / 2, 1);
    // A second edit restarts the window.
    let last = filled(PreferenceKind::Accessory, 2);
    bench.accessory.push_preferences(last.clone()).unwrap();
    bench.run(debounce - 10, 1);

    assert!(bench.store.load(PreferenceKind::Accessory).is_none());
    assert!(bench.accessory.preferences().is_pending(PreferenceKind::Accessory));

    bench.run(30, 1);
    assert_eq!(bench.store.load(PreferenceKind::Accessory), Some(last));
    assert!(!bench.accessory.preferences().is_pending(PreferenceKind::Accessory));
    assert_eq!(
        bench
            .hub_events
            .count(|e| *e == LinkEvent::PreferencesStored(PreferenceKind::Accessory)),
        1
    );
}

#[test]
fn corrupted_store_sends_nothing() {
    let mut bench = connected_bench();
    bench.store.store(&filled(PreferenceKind::Shared, 4)).unwrap();
    bench.store.corrupt(PreferenceKind::Shared);

    bench
        .accessory
        .request_preferences(PreferenceKind::Shared)
        .unwrap();
    bench.run(50, 1);

    assert!(!bench.accessory.preferences().is_received(PreferenceKind::Shared));
    assert_eq!(bench.accessory.connection_state(), ConnectionState::Connected);
}

#[test]
fn commits_reach_the_hub_as_save_requests() {
    let mut bench = connected_bench();

    bench
        .accessory
        .commit_preferences(PreferenceKind::Accessory)
        .unwrap();
    bench
        .accessory
        .commit_preferences(PreferenceKind::Shared)
        .unwrap();
    bench.run(10, 1);

    assert_eq!(
        bench.delegate.requests,
        vec![
            AccessoryCommand::SaveSettingsWand,
            AccessoryCommand::SaveSettingsPack
        ]
    );
}

#[test]
fn disconnect_marks_blocks_stale() {
    let mut bench = connected_bench();
    let block = filled(PreferenceKind::Hub, 5);
    bench.store.store(&block).unwrap();
    bench
        .accessory
        .request_preferences(PreferenceKind::Hub)
        .unwrap();
    bench.run(20, 1);

    bench.hub_alive = false;
    bench.run(8_100, 10);

    let prefs = bench.accessory.preferences();
    assert!(!prefs.is_received(PreferenceKind::Hub));
    assert_eq!(prefs.staged(PreferenceKind::Hub), Some(&block));
}

#[test]
fn preference_calls_need_a_connection() {
    let mut bench = Bench::new();
    assert!(bench.accessory.request_preferences(PreferenceKind::Hub).is_err());
    assert!(bench
        .accessory
        .push_preferences(filled(PreferenceKind::Hub, 0))
        .is_err());
    assert!(bench.accessory.commit_preferences(PreferenceKind::Hub).is_err());
}
