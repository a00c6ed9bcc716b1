//! Fuzz target: `Codec::decode`
//!
//! The first byte selects the packet kind; the rest is the raw payload.
//! Decoding must never panic, and anything accepted must re-encode to the
//! same bytes and apply to the shared state without panicking.
//!
//! cargo fuzz run fuzz_packet_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use packlink::protocol::{Codec, Packet, Role};
use packlink::state::SharedState;

fuzz_target!(|data: &[u8]| {
    let Some((&kind, raw)) = data.split_first() else {
        return;
    };

    for (listener, sender) in [(Role::Accessory, Role::Hub), (Role::Hub, Role::Accessory)] {
        let Ok(packet) = Codec::new(listener).decode(kind, raw) else {
            continue;
        };

        let frame = Codec::new(sender).encode(&packet).expect("decoded packet re-encodes");
        assert_eq!(frame.kind, kind);
        assert_eq!(&frame.payload[..], raw);

        let mut state = SharedState::default();
        let _ = match &packet {
            Packet::Command(c) => state.apply_command(c.opcode, c.value),
            Packet::Message(m) => state.apply_message(m.opcode, m.data),
            Packet::Snapshot(s) => state.apply_snapshot(s),
            Packet::Preferences(_) => continue,
        };
    }
});
